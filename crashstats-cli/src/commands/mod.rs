pub mod facet;
pub mod fetch_data;
pub mod reprocess;
pub mod supersearch;

pub use facet::{run_facet, FacetArgs};
pub use fetch_data::{run_fetch_data, FetchDataArgs};
pub use reprocess::{run_reprocess, ReprocessArgs};
pub use supersearch::{run_supersearch, SupersearchArgs};

use std::io::{self, BufRead, IsTerminal};

use anyhow::{Context, Result};
use crashstats::params::{extract_supersearch_params, parse_args};
use crashstats::SearchParams;

/// Params from `--supersearch-url` (minus `drop_prefixes`) overridden by the
/// command line field tokens.
fn build_params(
    supersearch_url: Option<&str>,
    drop_prefixes: &[&str],
    search_args: &[String],
) -> Result<SearchParams> {
    let base = match supersearch_url.filter(|url| !url.is_empty()) {
        Some(url) => extract_supersearch_params(url, drop_prefixes)
            .with_context(|| format!("Failed to parse Super Search url {}", url))?,
        None => SearchParams::new(),
    };
    Ok(base.merge(parse_args(search_args)?))
}

/// Positional crash ids, or one per stdin line when none were given and stdin
/// is not a terminal.
fn crash_ids_or_stdin(crash_ids: Vec<String>) -> Result<Vec<String>> {
    if !crash_ids.is_empty() || io::stdin().is_terminal() {
        return Ok(crash_ids);
    }
    io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .context("Failed to read crash ids from stdin")
}

fn print_output(output: &str) {
    if !output.is_empty() {
        println!("{}", output);
    }
}
