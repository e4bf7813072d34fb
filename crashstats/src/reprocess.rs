//! Batched reprocessing submissions.

use std::time::Duration;

use tracing::{info, warn};

use crate::client::{Transport, REPROCESSING_ENDPOINT};
use crate::crash_id::parse_crash_id;
use crate::error::{Error, Result};

/// Crash ids per request.
pub const CHUNK_SIZE: usize = 50;
/// Above this many crash ids the caller must opt in.
pub const ALLOW_MANY_THRESHOLD: usize = 10_000;
pub const DEFAULT_SLEEP_SECS: u64 = 1;

#[derive(Debug, Clone)]
pub struct ReprocessOptions {
    /// Pause between groups.
    pub sleep: Duration,
    /// Processor ruleset appended to every id as `id:ruleset`.
    pub ruleset: Option<String>,
    pub allow_many: bool,
}

impl Default for ReprocessOptions {
    fn default() -> Self {
        Self {
            sleep: Duration::from_secs(DEFAULT_SLEEP_SECS),
            ruleset: None,
            allow_many: false,
        }
    }
}

/// Result of submitting one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    /// 1-based group number.
    pub group: usize,
    pub total_groups: usize,
    pub last_crash_id: String,
    pub status: u16,
}

impl GroupOutcome {
    pub fn accepted(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReprocessSummary {
    pub crash_ids: usize,
    pub groups: usize,
    pub rejected_groups: usize,
}

/// Split input into recognized crash ids and unrecognized items.
pub fn collect_crash_ids<I, S>(items: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for item in items {
        let item = item.as_ref().trim();
        if item.is_empty() {
            continue;
        }
        match parse_crash_id(item) {
            Some(crash_id) => valid.push(crash_id),
            None => invalid.push(item.to_string()),
        }
    }
    (valid, invalid)
}

pub fn check_batch_size(count: usize, allow_many: bool) -> Result<()> {
    if count == 0 {
        return Err(Error::invalid_argument("No crashids specified."));
    }
    if count > ALLOW_MANY_THRESHOLD && !allow_many {
        return Err(Error::InvalidArgument(format!(
            "You are trying to reprocess more than {} crash reports at once. \
             Use --allow-many to reprocess.",
            ALLOW_MANY_THRESHOLD
        )));
    }
    Ok(())
}

fn form_for(group: &[String], ruleset: Option<&str>) -> Vec<(String, String)> {
    group
        .iter()
        .map(|crash_id| {
            let value = match ruleset {
                Some(ruleset) => format!("{}:{}", crash_id, ruleset),
                None => crash_id.clone(),
            };
            ("crash_ids".to_string(), value)
        })
        .collect()
}

/// Submit `crash_ids` in groups of [`CHUNK_SIZE`], sleeping between groups.
///
/// Non-200 responses are logged and skipped; `on_group` sees every outcome.
pub async fn reprocess<F>(
    transport: &dyn Transport,
    crash_ids: &[String],
    options: &ReprocessOptions,
    mut on_group: F,
) -> Result<ReprocessSummary>
where
    F: FnMut(&GroupOutcome),
{
    if !transport.has_token() {
        return Err(Error::BadCredential(
            "No api token provided. Set CRASHSTATS_API_TOKEN in the environment.".to_string(),
        ));
    }
    check_batch_size(crash_ids.len(), options.allow_many)?;

    let ruleset = options.ruleset.as_deref().filter(|r| !r.is_empty());
    let total_groups = crash_ids.len().div_ceil(CHUNK_SIZE);
    let mut summary = ReprocessSummary {
        crash_ids: crash_ids.len(),
        groups: total_groups,
        rejected_groups: 0,
    };

    for (i, group) in crash_ids.chunks(CHUNK_SIZE).enumerate() {
        if i > 0 {
            tokio::time::sleep(options.sleep).await;
        }

        let last_crash_id = group.last().cloned().unwrap_or_default();
        info!(
            "Processing group ending with {} ... ({}/{})",
            last_crash_id,
            i + 1,
            total_groups
        );

        let response = transport
            .post_form(REPROCESSING_ENDPOINT, &form_for(group, ruleset))
            .await?;
        let outcome = GroupOutcome {
            group: i + 1,
            total_groups,
            last_crash_id,
            status: response.status,
        };
        if !outcome.accepted() {
            warn!(
                status = response.status,
                body = %response.body,
                "Got back non-200 status code"
            );
            summary.rejected_groups += 1;
        }
        on_group(&outcome);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_crash_ids() {
        let (valid, invalid) = collect_crash_ids([
            "2ac9a763-83d2-4dca-89bb-091bd0220630\n",
            "bp-2ac9a763-83d2-4dca-89bb-091bd0220631",
            "",
            "nope",
        ]);
        assert_eq!(
            valid,
            vec![
                "2ac9a763-83d2-4dca-89bb-091bd0220630",
                "2ac9a763-83d2-4dca-89bb-091bd0220631"
            ]
        );
        assert_eq!(invalid, vec!["nope"]);
    }

    #[test]
    fn test_check_batch_size() {
        assert!(check_batch_size(0, true).is_err());
        assert!(check_batch_size(ALLOW_MANY_THRESHOLD, false).is_ok());
        assert!(check_batch_size(ALLOW_MANY_THRESHOLD + 1, false).is_err());
        assert!(check_batch_size(ALLOW_MANY_THRESHOLD + 1, true).is_ok());
    }

    #[test]
    fn test_form_with_ruleset() {
        let group = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            form_for(&group, Some("regenerate_signature")),
            vec![
                ("crash_ids".to_string(), "a:regenerate_signature".to_string()),
                ("crash_ids".to_string(), "b:regenerate_signature".to_string()),
            ]
        );
        assert_eq!(form_for(&group, None)[1].1, "b");
    }
}
