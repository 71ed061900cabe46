//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software tree.
pub const SW_ROOT_ENV_VAR: &str = "CTRL_SW_ROOT";

/// Get the root directory of the software, which contains the `params`, `scripts` and
/// `sessions` directories.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Resolve a path relative to the software root. Absolute paths are returned unchanged.
pub fn resolve_from_root(path: &str) -> Result<PathBuf, env::VarError> {
    let path = PathBuf::from(path);

    if path.is_absolute() {
        Ok(path)
    }
    else {
        Ok(get_sw_root()?.join(path))
    }
}
