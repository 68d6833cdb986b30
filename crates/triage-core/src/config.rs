use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    #[tracing::instrument(skip(conf_override))]
    pub fn load(conf_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map
            .insert("data.location".to_string(), "~/.triage".to_string());
        cfg.map
            .insert("default.command".to_string(), "list".to_string());
        cfg.map.insert("color".to_string(), "on".to_string());
        cfg.map
            .insert("confirmation".to_string(), "on".to_string());

        let conf = resolve_conf_path(conf_override)?;
        if let Some(path) = conf {
            info!(conf = %path.display(), "loading config file");
            cfg.load_file(&path)?;
        } else {
            warn!("no config file found; using defaults");
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }
            if line.is_empty() {
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_conf_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(conf_env) = std::env::var("TRIAGERC") {
        if conf_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(conf_env)));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    let candidate = home.join(".triagerc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".triage"))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let mut conf = NamedTempFile::new().expect("temp conf");
        writeln!(conf, "# triage config").expect("write");
        writeln!(conf, "color = off  # no ansi").expect("write");
        writeln!(conf, "default.command=help").expect("write");

        let cfg = Config::load(Some(conf.path())).expect("load config");
        assert_eq!(cfg.get_bool("color"), Some(false));
        assert_eq!(cfg.get("default.command").as_deref(), Some("help"));
        assert_eq!(cfg.get("confirmation").as_deref(), Some("on"));
    }

    #[test]
    fn overrides_strip_the_rc_prefix_and_win() {
        let mut conf = NamedTempFile::new().expect("temp conf");
        writeln!(conf, "confirmation=on").expect("write");

        let mut cfg = Config::load(Some(conf.path())).expect("load config");
        cfg.apply_overrides(vec![
            ("rc.confirmation".to_string(), "off".to_string()),
            ("data.location".to_string(), "/tmp/triage".to_string()),
        ]);

        assert_eq!(cfg.get_bool("confirmation"), Some(false));
        assert_eq!(cfg.get("data.location").as_deref(), Some("/tmp/triage"));
    }

    #[test]
    fn malformed_lines_are_an_error() {
        let mut conf = NamedTempFile::new().expect("temp conf");
        writeln!(conf, "no equals sign here").expect("write");

        assert!(Config::load(Some(conf.path())).is_err());
    }
}
