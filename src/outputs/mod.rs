//! Output writers for the pre-generated snapshot tree.
//!
//! The `snapshot` subcommand materializes the static fallback tree the
//! resolver's last-resort sources read back:
//!
//! ```text
//! output_dir/
//! ├── latest.json            # merged newest-first result set
//! ├── trending.json          # volume timeline (live or synthetic)
//! ├── index.json             # manifest of the generated tree
//! └── search/
//!     ├── technology.json    # slug-addressed per-query sets
//!     ├── russia_ru.json
//!     └── ...
//! ```
//!
//! Files are [`crate::models::ResultSet`] JSON, the same shape
//! [`crate::sources::snapshot`] deserializes.

pub mod json;
