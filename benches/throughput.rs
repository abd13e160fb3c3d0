use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use leadsweep::config::{self, Config};
use leadsweep::pacing::NoPacer;
use leadsweep::pipeline::{self, PipelineStats};
use leadsweep::seen_set::{SeenSet, SeenSets};
use leadsweep::shutdown::StopFlag;
use leadsweep::sources::{
    Collaborators, DiscoveryRequest, EmailExtractor, LinkDiscovery, LinkRecord, SyntaxValidator,
};

struct SyntheticDiscovery {
    links_per_location: usize,
}

impl LinkDiscovery for SyntheticDiscovery {
    fn discover(&self, request: &DiscoveryRequest<'_>) -> Result<Vec<LinkRecord>> {
        Ok((0..self.links_per_location)
            .map(|i| {
                LinkRecord::new(
                    &format!("https://{}.example.net/{i}", request.location),
                    &format!("Clinic {i}"),
                )
            })
            .collect())
    }
}

struct SyntheticExtractor;

impl EmailExtractor for SyntheticExtractor {
    fn extract_emails(&self, url: &str) -> Result<Vec<String>> {
        let host = url.trim_start_matches("https://").replace('/', "-");
        Ok(vec![
            format!("contato@{host}.com.br"),
            format!("Contato@{host}.com.br"),
            format!("agenda@{host}.com.br"),
        ])
    }
}

fn bench_config(root: &Path, chunk_size: usize) -> Config {
    let yaml = format!(
        r#"
locations_file: {root}/locations.yaml
search_terms: ["clinic"]
max_cards_per_location: 1000
scroll_rounds: 1
headless: true
max_details_per_location: 1000
daily_limit: 1000000
chunk_size: {chunk_size}
pause_seconds: 0
pause_jitter: 1.0
smtp_verify: false
resume: false
output_base: {root}/out
log_dir: {root}/logs
suppression_file: {root}/data/suppression.txt
seen_emails_file: {root}/data/seen_emails.txt
seen_urls_file: {root}/data/seen_urls.txt
state_file: {root}/data/state.json
links_file: {root}/links.csv
request_timeout_secs: 5
"#,
        root = root.display()
    );
    config::parse_config(yaml.as_bytes())
        .expect("config")
        .config
}

fn run_once(locations: usize, links: usize, chunk_size: usize) -> PipelineStats {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let cfg = bench_config(temp_dir.path(), chunk_size);
    let locations: Vec<String> = (0..locations).map(|i| format!("city{i}")).collect();
    let mut sets = SeenSets::load(
        &cfg.suppression_file,
        &cfg.seen_emails_file,
        &cfg.seen_urls_file,
    )
    .expect("sets");

    pipeline::run_pipeline(
        &cfg,
        &locations,
        Collaborators {
            discovery: &SyntheticDiscovery {
                links_per_location: links,
            },
            extractor: &SyntheticExtractor,
            validator: &SyntaxValidator,
        },
        &mut sets,
        &NoPacer,
        &StopFlag::new(),
        None,
    )
    .expect("pipeline")
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    for chunk_size in [10usize, 500] {
        group.bench_with_input(
            BenchmarkId::new("locations_x_links", chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| run_once(10, 20, chunk_size));
            },
        );
    }
    group.finish();
}

fn bench_seen_set_replay(c: &mut Criterion) {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let path = temp_dir.path().join("seen_emails.txt");
    let content: String = (0..50_000)
        .map(|i| format!("user{i}@clinic{}.com\n", i % 97))
        .collect();
    std::fs::write(&path, content).expect("write");

    c.bench_function("seen_set_replay_50k", |b| {
        b.iter(|| SeenSet::load(&path).expect("load").len());
    });
}

criterion_group!(benches, bench_pipeline, bench_seen_set_replay);
criterion_main!(benches);
