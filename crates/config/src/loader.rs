use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::GateConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["wegate.toml", "wegate.yaml", "wegate.yml", "wegate.json"];

/// Load config from an explicit path (format selected by extension).
pub fn load_config(path: &Path) -> anyhow::Result<GateConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./wegate.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/wegate/wegate.{toml,yaml,yml,json}` (user-global)
///
/// Returns `GateConfig::default()` if no config file is found or the found
/// file fails to parse.
pub fn discover_and_load() -> GateConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            }
        }
    } else {
        debug!("no config file found, using defaults");
    }
    GateConfig::default()
}

/// Returns the user-global config directory (`~/.config/wegate/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "wegate").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<GateConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_toml() {
        let (_dir, path) = write_temp("wegate.toml", "channel_type = \"wework\"\ndebug = true\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.channel_type, "wework");
        assert!(cfg.debug);
    }

    #[test]
    fn loads_yaml() {
        let (_dir, path) = write_temp("wegate.yaml", "channel_type: wechatmp\naccept_friend: true\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.channel_type, "wechatmp");
        assert!(cfg.accept_friend);
    }

    #[test]
    fn loads_json() {
        let (_dir, path) = write_temp("wegate.json", r#"{"restart_time": "04:00"}"#);
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.restart_mark(), Some((4, 0)));
    }

    #[test]
    fn unknown_extension_errors() {
        let (_dir, path) = write_temp("wegate.ini", "channel_type = x");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn missing_file_errors() {
        assert!(load_config(Path::new("/nonexistent/wegate.toml")).is_err());
    }
}
