use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::export::ExportFormat;

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

impl From<OutputFormat> for ExportFormat {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Csv => ExportFormat::Csv,
            OutputFormat::Jsonl => ExportFormat::Jsonl,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Path to the run configuration (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Location batch file to run instead of `locations_file` from the config
    #[arg(long)]
    pub batch: Option<PathBuf>,

    /// Ignore any saved checkpoint and start from the first location
    #[arg(long)]
    pub no_resume: bool,

    /// Output format for chunk and partial files (overrides config)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Request SMTP verification from the validity check (overrides config)
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "no_smtp_verify")]
    pub smtp_verify: bool,

    /// Disable SMTP verification (overrides config)
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_smtp_verify: bool,
}

impl CliOptions {
    pub fn smtp_override(&self) -> Option<bool> {
        if self.smtp_verify {
            Some(true)
        } else if self.no_smtp_verify {
            Some(false)
        } else {
            None
        }
    }
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}
