//! Default on-disk layout, rooted at the installer home.

use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Environment variable overriding the installer home.
pub const HOME_ENV: &str = "PGINSTALL_HOME";

/// Returns the installer home, or None if the user's home cannot be resolved.
///
/// `$PGINSTALL_HOME` wins; otherwise `~/.pginstall`.
pub fn try_pginstall_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(HOME_ENV) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".pginstall"))
}

/// Configuration file: `<home>/config.toml`
pub fn config_file(home: &Path) -> PathBuf {
    home.join("config.toml")
}

/// Where fetched archives are expected: `<home>/archives`
pub fn archive_dir(home: &Path) -> PathBuf {
    home.join("archives")
}

/// Where control files are extracted: `<home>/control`
pub fn control_dir(home: &Path) -> PathBuf {
    home.join("control")
}

/// Where extension payloads are extracted: `<home>/extensions`
pub fn extension_dir(home: &Path) -> PathBuf {
    home.join("extensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_home() {
        let home = Path::new("/srv/pginstall");
        assert_eq!(config_file(home), Path::new("/srv/pginstall/config.toml"));
        assert_eq!(archive_dir(home), Path::new("/srv/pginstall/archives"));
        assert_eq!(control_dir(home), Path::new("/srv/pginstall/control"));
        assert_eq!(extension_dir(home), Path::new("/srv/pginstall/extensions"));
    }
}
