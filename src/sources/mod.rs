//! # Collaborator Seams
//!
//! The pipeline talks to link discovery, email extraction and the validity
//! check only through these traits. An `Err` from any of them is treated as
//! an unexpected fault; "nothing found" must be an empty result instead.

pub mod http;
pub mod seed;
pub mod validate;

use anyhow::Result;

pub use http::HttpEmailExtractor;
pub use seed::SeedFileDiscovery;
pub use validate::SyntaxValidator;

/// A discovered candidate page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub url: String,
    pub display_name: String,
}

impl LinkRecord {
    pub fn new(url: &str, display_name: &str) -> Self {
        Self {
            url: url.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Parameters handed to discovery for one location.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest<'a> {
    pub location: &'a str,
    pub search_terms: &'a [String],
    pub max_cards: usize,
    pub scroll_rounds: u32,
    pub headless: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    pub valid: bool,
    pub status: String,
}

impl Validity {
    pub fn pass(status: &str) -> Self {
        Self {
            valid: true,
            status: status.to_string(),
        }
    }

    pub fn fail(status: &str) -> Self {
        Self {
            valid: false,
            status: status.to_string(),
        }
    }
}

pub trait LinkDiscovery {
    /// Candidate links for a location, in discovery order. May return fewer
    /// than `max_cards`.
    fn discover(&self, request: &DiscoveryRequest<'_>) -> Result<Vec<LinkRecord>>;
}

pub trait EmailExtractor {
    fn extract_emails(&self, url: &str) -> Result<Vec<String>>;
}

pub trait ValidityChecker {
    fn check(&self, email: &str, do_smtp_check: bool) -> Result<Validity>;
}

/// The three collaborators a run needs.
pub struct Collaborators<'a> {
    pub discovery: &'a dyn LinkDiscovery,
    pub extractor: &'a dyn EmailExtractor,
    pub validator: &'a dyn ValidityChecker,
}
