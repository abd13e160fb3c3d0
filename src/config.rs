use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::export::ExportFormat;

/// Run configuration, read from YAML.
///
/// Every field except `export_format` is required; there are no built-in
/// defaults for limits, paths or pacing.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// YAML file holding the ordered location list.
    pub locations_file: PathBuf,
    pub search_terms: Vec<String>,
    pub max_cards_per_location: usize,
    pub scroll_rounds: u32,
    pub headless: bool,
    /// Cap on extraction attempts per location.
    pub max_details_per_location: usize,
    pub daily_limit: u64,
    pub chunk_size: usize,
    pub pause_seconds: f64,
    /// Upper bound of the multiplicative jitter applied to `pause_seconds`.
    pub pause_jitter: f64,
    pub smtp_verify: bool,
    pub resume: bool,
    pub output_base: PathBuf,
    pub log_dir: PathBuf,
    pub suppression_file: PathBuf,
    pub seen_emails_file: PathBuf,
    pub seen_urls_file: PathBuf,
    pub state_file: PathBuf,
    /// CSV seed file used by the default link discovery.
    pub links_file: PathBuf,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub export_format: ExportFormat,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: &Path) -> Result<LoadedConfig> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&bytes).with_context(|| format!("invalid config {}", path.display()))
}

pub fn parse_config(bytes: &[u8]) -> Result<LoadedConfig> {
    let config: Config = serde_yaml::from_slice(bytes)?;
    config.validate()?;
    let config_hash = hash_bytes(bytes);
    Ok(LoadedConfig { config, config_hash })
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if self.daily_limit == 0 {
            bail!("daily_limit must be greater than zero");
        }
        if self.max_details_per_location == 0 {
            bail!("max_details_per_location must be greater than zero");
        }
        if !self.pause_seconds.is_finite() || self.pause_seconds < 0.0 {
            bail!("pause_seconds must be a non-negative number");
        }
        if !self.pause_jitter.is_finite() || self.pause_jitter < 1.0 {
            bail!("pause_jitter must be at least 1.0");
        }
        Ok(())
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
locations_file: data/locations.yaml
search_terms: ["dentist", "clinic"]
max_cards_per_location: 40
scroll_rounds: 6
headless: true
max_details_per_location: 25
daily_limit: 500
chunk_size: 50
pause_seconds: 1.5
pause_jitter: 1.5
smtp_verify: false
resume: true
output_base: out
log_dir: logs
suppression_file: data/suppression.txt
seen_emails_file: data/seen_emails.txt
seen_urls_file: data/seen_urls.txt
state_file: data/state.json
links_file: data/links.csv
request_timeout_secs: 15
"#;

#[cfg(test)]
mod tests {
    use super::{SAMPLE_CONFIG, parse_config};
    use crate::export::ExportFormat;

    #[test]
    fn parses_sample_config() {
        let loaded = parse_config(SAMPLE_CONFIG.as_bytes()).expect("config");
        let cfg = loaded.config;
        assert_eq!(cfg.search_terms, vec!["dentist", "clinic"]);
        assert_eq!(cfg.chunk_size, 50);
        assert_eq!(cfg.daily_limit, 500);
        assert_eq!(cfg.export_format, ExportFormat::Csv);
        assert_eq!(loaded.config_hash.len(), 64);
    }

    #[test]
    fn missing_field_is_rejected() {
        let trimmed: String = SAMPLE_CONFIG
            .lines()
            .filter(|line| !line.starts_with("daily_limit"))
            .collect::<Vec<_>>()
            .join("\n");
        let err = parse_config(trimmed.as_bytes()).expect_err("missing daily_limit");
        assert!(err.to_string().contains("daily_limit"));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let text = SAMPLE_CONFIG.replace("chunk_size: 50", "chunk_size: 0");
        let err = parse_config(text.as_bytes()).expect_err("zero chunk size");
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn jitter_below_one_is_rejected() {
        let text = SAMPLE_CONFIG.replace("pause_jitter: 1.5", "pause_jitter: 0.5");
        assert!(parse_config(text.as_bytes()).is_err());
    }

    #[test]
    fn export_format_can_be_selected() {
        let text = format!("{SAMPLE_CONFIG}export_format: jsonl\n");
        let cfg = parse_config(text.as_bytes()).expect("config").config;
        assert_eq!(cfg.export_format, ExportFormat::Jsonl);
    }
}
