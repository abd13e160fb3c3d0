use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LocationFile {
    #[serde(default, alias = "cities")]
    locations: Vec<String>,
}

/// Ordered location list from a YAML file with a `locations:` (or `cities:`)
/// sequence. Blank entries are dropped; order and duplicates are kept.
pub fn load_locations(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read location file {}", path.display()))?;
    parse_locations(&bytes).with_context(|| format!("invalid location file {}", path.display()))
}

pub fn parse_locations(bytes: &[u8]) -> Result<Vec<String>> {
    let file: LocationFile = serde_yaml::from_slice(bytes)?;
    Ok(file
        .locations
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}
