use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "keydash";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Run history database under $HOME/.local/state/keydash, with a
    /// platform-specific fallback.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME);
            Some(state_dir.join("history.db"))
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("history.db"))
        }
    }

    /// Config file location; falls back to the working directory when no
    /// platform config dir can be resolved.
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            proj_dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("keydash_config.json")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_path_uses_home_state_dir() {
        if std::env::var("HOME").is_ok() {
            let path = AppDirs::db_path().unwrap();
            let s = path.to_string_lossy();
            assert!(s.contains(".local"));
            assert!(s.ends_with("history.db"));
        }
    }

    #[test]
    fn test_config_path_names_the_file() {
        let path = AppDirs::config_path();
        assert!(path.to_string_lossy().ends_with("config.json"));
    }
}
