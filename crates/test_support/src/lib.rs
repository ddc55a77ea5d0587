pub mod test_server;

use std::path::PathBuf;

/// Path of a config fixture shared by the workspace tests.
pub fn fixture_path(name: &str) -> PathBuf {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    root.join("../libconfig/tests/fixtures").join(name)
}
