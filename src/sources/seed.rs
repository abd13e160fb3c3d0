use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::sources::{DiscoveryRequest, LinkDiscovery, LinkRecord};

#[derive(Debug, Deserialize)]
struct SeedRow {
    location: String,
    #[serde(default)]
    name: String,
    url: String,
}

/// Link discovery backed by a CSV seed file with `location,name,url` columns.
///
/// Stands in for browser-driven map search: records come back in file order,
/// grouped by case-insensitive location name, truncated to `max_cards`.
#[derive(Debug, Default)]
pub struct SeedFileDiscovery {
    by_location: HashMap<String, Vec<LinkRecord>>,
}

fn location_key(location: &str) -> String {
    location.trim().to_lowercase()
}

impl SeedFileDiscovery {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open link seed file {}", path.display()))?;
        let mut discovery = Self::default();
        for (line, row) in reader.deserialize::<SeedRow>().enumerate() {
            let row = row.with_context(|| {
                format!("bad link seed record {} in {}", line + 2, path.display())
            })?;
            discovery.add(&row.location, LinkRecord::new(&row.url, &row.name));
        }
        Ok(discovery)
    }

    pub fn add(&mut self, location: &str, record: LinkRecord) {
        if record.url.trim().is_empty() {
            return;
        }
        self.by_location
            .entry(location_key(location))
            .or_default()
            .push(record);
    }
}

impl LinkDiscovery for SeedFileDiscovery {
    fn discover(&self, request: &DiscoveryRequest<'_>) -> Result<Vec<LinkRecord>> {
        debug!(
            "seed discovery location={} terms={:?} scroll_rounds={} headless={}",
            request.location, request.search_terms, request.scroll_rounds, request.headless
        );
        Ok(self
            .by_location
            .get(&location_key(request.location))
            .map(|records| records.iter().take(request.max_cards).cloned().collect())
            .unwrap_or_default())
    }
}
