use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::sources::{Validity, ValidityChecker};

static SYNTAX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9!#$&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$&'*+/=?^_`{|}~-]+)*@([a-z0-9]([a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$")
        .expect("syntax regex")
});

/// Domains that show up in templates and page builders, never real inboxes.
const PLACEHOLDER_DOMAINS: [&str; 6] = [
    "example.com",
    "example.org",
    "domain.com",
    "email.com",
    "yourdomain.com",
    "sentry.io",
];

pub const STATUS_SYNTAX_OK: &str = "syntax_ok";
pub const STATUS_SMTP_UNCHECKED: &str = "smtp_unchecked";
pub const STATUS_BAD_SYNTAX: &str = "bad_syntax";
pub const STATUS_PLACEHOLDER: &str = "placeholder_domain";

/// Syntax-level validity check.
///
/// Deliverability probing is not performed; with the SMTP toggle on, a
/// syntactically valid address is reported as `smtp_unchecked`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxValidator;

impl ValidityChecker for SyntaxValidator {
    fn check(&self, email: &str, do_smtp_check: bool) -> Result<Validity> {
        let email = email.trim().to_lowercase();
        let Some((local, domain)) = email.rsplit_once('@') else {
            return Ok(Validity::fail(STATUS_BAD_SYNTAX));
        };
        if email.len() > 254 || local.len() > 64 || !SYNTAX_RE.is_match(&email) {
            return Ok(Validity::fail(STATUS_BAD_SYNTAX));
        }
        if PLACEHOLDER_DOMAINS
            .iter()
            .any(|d| domain == *d || domain.ends_with(&format!(".{d}")))
        {
            return Ok(Validity::fail(STATUS_PLACEHOLDER));
        }
        if do_smtp_check {
            Ok(Validity::pass(STATUS_SMTP_UNCHECKED))
        } else {
            Ok(Validity::pass(STATUS_SYNTAX_OK))
        }
    }
}
