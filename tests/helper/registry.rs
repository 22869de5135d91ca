//! Registry test utilities

use tempfile::TempDir;

use go_ecosystem::registry::Registry;

/// Create a registry with its schema in a temporary directory.
/// The directory must outlive the registry.
pub fn create_test_registry() -> (TempDir, Registry) {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::open(&temp_dir.path().join("db.sqlite")).unwrap();
    registry.create_schema().unwrap();
    (temp_dir, registry)
}
