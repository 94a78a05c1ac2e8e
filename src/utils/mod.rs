pub mod version;

pub use version::{compare_versions, version_at_least};
