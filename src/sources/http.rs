use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use tracing::debug;

use crate::sources::EmailExtractor;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[a-z0-9._+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email regex")
});

static PERCENT_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[0-9A-Fa-f]{2}").expect("percent escape regex"));

/// Suffixes that look like an address but are asset file names
/// (`logo@2x.png`).
const ASSET_SUFFIXES: [&str; 7] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".css"];

/// URL-encoded `@` becomes `@`; any other escape becomes a space so that
/// `mailto:%20info@d.com` does not glue `20` onto the local part.
fn decode_percent_escapes(text: &str) -> std::borrow::Cow<'_, str> {
    PERCENT_ESCAPE_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        if caps[0].eq_ignore_ascii_case("%40") {
            "@"
        } else {
            " "
        }
    })
}

/// Email addresses in `text`, first occurrence order, without asset names.
pub fn scan_emails(text: &str) -> Vec<String> {
    let text = decode_percent_escapes(text);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in EMAIL_RE.find_iter(&text) {
        let candidate = m.as_str().trim_end_matches('.');
        let lower = candidate.to_lowercase();
        if ASSET_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            continue;
        }
        if seen.insert(lower) {
            out.push(candidate.to_string());
        }
    }
    out
}

/// Fetches a page over HTTP and scans the body for addresses.
///
/// Transport errors, non-success statuses and unreadable bodies all yield an
/// empty list; the pipeline does not distinguish them from "no emails".
pub struct HttpEmailExtractor {
    client: Client,
}

impl HttpEmailExtractor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("leadsweep/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl EmailExtractor for HttpEmailExtractor {
    fn extract_emails(&self, url: &str) -> Result<Vec<String>> {
        let response = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(err) => {
                debug!("fetch failed url={url}: {err}");
                return Ok(Vec::new());
            }
        };
        let status = response.status();
        if !status.is_success() {
            debug!("fetch status url={url} status={status}");
            return Ok(Vec::new());
        }
        match response.text() {
            Ok(body) => Ok(scan_emails(&body)),
            Err(err) => {
                debug!("body read failed url={url}: {err}");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::scan_emails;

    #[test]
    fn finds_addresses_in_markup() {
        let html = r#"<a href="mailto:Contato@Clinica.com.br">Contato@Clinica.com.br</a>
            <p>vendas@clinica.com.br.</p><img src="logo@2x.png">"#;
        assert_eq!(
            scan_emails(html),
            vec!["Contato@Clinica.com.br", "vendas@clinica.com.br"]
        );
    }

    #[test]
    fn url_encoded_text_does_not_leak_into_addresses() {
        let html = r#"<a href="mailto:%20info@d.com">x</a> <a href="mailto:vendas%40d.com.br">y</a>
            <a href="?to=%3Cadm@d.com%3E">z</a>"#;
        assert_eq!(
            scan_emails(html),
            vec!["info@d.com", "vendas@d.com.br", "adm@d.com"]
        );
    }

    #[test]
    fn nothing_found_is_empty() {
        assert!(scan_emails("no contact here @ all").is_empty());
    }
}
