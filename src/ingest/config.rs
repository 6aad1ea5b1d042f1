// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_PATH: &str = "KEMONO_CONFIG_PATH";
pub const ENV_ROOT: &str = "KEMONO_ROOT";

pub const DEFAULT_ROOT: &str = "https://kemono.party";

fn default_root() -> String {
    DEFAULT_ROOT.to_string()
}
fn default_user_agent() -> String {
    concat!("kemono-extractor/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Site root; API and file URLs are built from it.
    #[serde(default = "default_root")]
    pub root: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ExtractorConfig {
    /// Apply `$KEMONO_ROOT` and tidy up values.
    fn finish(mut self) -> Self {
        if let Ok(root) = std::env::var(ENV_ROOT) {
            if !root.trim().is_empty() {
                self.root = root.trim().to_string();
            }
        }
        self.root = self.root.trim_end_matches('/').to_string();
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<ExtractorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading extractor config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing extractor config {}", path.display()))?;
    Ok(cfg.finish())
}

/// Load config using env var + fallbacks:
/// 1) $KEMONO_CONFIG_PATH
/// 2) config/extractor.toml
/// 3) config/extractor.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<ExtractorConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/extractor.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/extractor.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(ExtractorConfig::default().finish())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ExtractorConfig> {
    match hint_ext {
        "json" => Ok(serde_json::from_str(s)?),
        "toml" => Ok(toml::from_str(s)?),
        _ => {
            if let Ok(v) = serde_json::from_str(s) {
                return Ok(v);
            }
            toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))
        }
    }
}
