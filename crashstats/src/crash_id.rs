//! Crash id validation and extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// 8-4-4-4-12 hex, the last six characters being the `YYMMDD` submission date.
static CRASH_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{6}[0-9]{6}$")
        .expect("crash id pattern is valid")
});

const BREAKPAD_PREFIX: &str = "bp-";
const REPORT_PATH: &str = "/report/index";

pub fn is_crash_id_valid(crash_id: &str) -> bool {
    CRASH_ID_RE.is_match(crash_id)
}

/// Crash id from a bare id, a `bp-` prefixed id, or a report URL
/// (`http[s]://host[:port]/report/index/<id>`).
pub fn parse_crash_id(item: &str) -> Option<String> {
    let item = item.trim();
    if is_crash_id_valid(item) {
        return Some(item.to_string());
    }

    if let Some(rest) = item.strip_prefix(BREAKPAD_PREFIX) {
        if is_crash_id_valid(rest) {
            return Some(rest.to_string());
        }
    }

    if item.starts_with("http") {
        let url = url::Url::parse(item).ok()?;
        if url.path().starts_with(REPORT_PATH) {
            let crash_id = url.path().trim_end_matches('/').rsplit('/').next()?;
            if is_crash_id_valid(crash_id) {
                return Some(crash_id.to_string());
            }
        }
    }

    None
}

/// Like [`parse_crash_id`], failing with `InvalidArgument` for unparseable input.
pub fn require_crash_id(item: &str) -> Result<String> {
    parse_crash_id(item)
        .ok_or_else(|| Error::InvalidArgument(format!("{:?} is not a valid crash id", item)))
}

/// `YYYYMMDD` date directory for a crash id, taken from its last six digits.
pub fn crash_id_date(crash_id: &str) -> Option<String> {
    if !is_crash_id_valid(crash_id) {
        return None;
    }
    crash_id
        .get(crash_id.len() - 6..)
        .map(|yymmdd| format!("20{}", yymmdd))
}
