use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use leadsweep::{
    checkpoint,
    cli,
    config,
    locations,
    logging,
    pacing::JitterPacer,
    pipeline,
    seen_set::SeenSets,
    shutdown::{self, StopFlag},
    sources::{Collaborators, HttpEmailExtractor, SeedFileDiscovery, SyntaxValidator},
    util,
};

fn main() -> ExitCode {
    let cli_opts = cli::parse();
    match run(cli_opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logging::init_stdout_logging();
            error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli_opts: cli::CliOptions) -> Result<()> {
    let loaded = config::load_config(&cli_opts.config)?;
    let mut cfg = loaded.config;
    if let Some(batch) = &cli_opts.batch {
        cfg.locations_file = batch.clone();
    }
    if cli_opts.no_resume {
        cfg.resume = false;
    }
    if let Some(format) = cli_opts.format {
        cfg.export_format = format.into();
    }
    if let Some(smtp) = cli_opts.smtp_override() {
        cfg.smtp_verify = smtp;
    }

    util::ensure_run_dirs(&cfg)?;
    let log_path = logging::init_logging(&cfg.log_dir)?;
    info!(
        "starting leadsweep {} config={} config_hash={} log={}",
        env!("CARGO_PKG_VERSION"),
        cli_opts.config.display(),
        loaded.config_hash,
        log_path.display()
    );

    let locations = locations::load_locations(&cfg.locations_file)?;
    info!(
        "locations loaded: {} from {}",
        locations.len(),
        cfg.locations_file.display()
    );

    let mut sets = SeenSets::load(
        &cfg.suppression_file,
        &cfg.seen_emails_file,
        &cfg.seen_urls_file,
    )
    .context("failed to load seen sets")?;
    info!(
        "sets loaded suppression={} seen_emails={} seen_urls={}",
        sets.suppression.len(),
        sets.emails.len(),
        sets.urls.len()
    );

    let discovery = SeedFileDiscovery::load(&cfg.links_file)?;
    let extractor = HttpEmailExtractor::new(Duration::from_secs(cfg.request_timeout_secs))?;
    let validator = SyntaxValidator;
    let pacer = JitterPacer::new(cfg.pause_seconds, cfg.pause_jitter);

    let stop = StopFlag::new();
    shutdown::install_interrupt_handler(&stop)?;

    let resume = checkpoint::resume_state(&cfg.state_file, cfg.resume, &util::today_slug());

    let stats = pipeline::run_pipeline(
        &cfg,
        &locations,
        Collaborators {
            discovery: &discovery,
            extractor: &extractor,
            validator: &validator,
        },
        &mut sets,
        &pacer,
        &stop,
        resume,
    )?;

    info!(
        "leadsweep finished: {} valid emails captured ({})",
        stats.captured, stats.termination
    );
    Ok(())
}
