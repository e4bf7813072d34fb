//! Splits Super Search field overrides out of argv before clap sees them.
//!
//! `supersearch` and `supersearchfacet` accept arbitrary `--field=value`
//! tokens. clap rejects unknown long flags, so anything that is not a known
//! long flag of the root command or the chosen subcommand is set aside and
//! handed to the query parameter builder instead.

use std::collections::HashMap;

use clap::Command;

/// Subcommands that take free-form search fields.
const SEARCH_SUBCOMMANDS: &[&str] = &["supersearch", "supersearchfacet"];

/// Returns `(argv for clap, search field tokens)`.
pub fn split_search_args(command: &Command, argv: Vec<String>) -> (Vec<String>, Vec<String>) {
    let Some(subcommand) = argv
        .iter()
        .skip(1)
        .find_map(|token| command.find_subcommand(token.as_str()))
    else {
        return (argv, Vec::new());
    };
    if !SEARCH_SUBCOMMANDS.contains(&subcommand.get_name()) {
        return (argv, Vec::new());
    }

    // long flag -> takes a value
    let mut known: HashMap<String, bool> = HashMap::new();
    for arg in command.get_arguments().chain(subcommand.get_arguments()) {
        if let Some(long) = arg.get_long() {
            known.insert(long.to_string(), arg.get_action().takes_values());
        }
    }
    known.insert("help".to_string(), false);
    known.insert("version".to_string(), false);

    let mut kept = Vec::with_capacity(argv.len());
    let mut fields = Vec::new();
    let mut tokens = argv.into_iter();

    while let Some(token) = tokens.next() {
        if token == "--" {
            kept.push(token);
            kept.extend(tokens.by_ref());
            break;
        }
        let Some(flag) = token.strip_prefix("--") else {
            kept.push(token);
            continue;
        };

        let (name, inline_value) = match flag.split_once('=') {
            Some((name, _)) => (name.to_string(), true),
            None => (flag.to_string(), false),
        };
        let (target, takes_value) = match known.get(&name) {
            Some(takes_value) => (&mut kept, *takes_value),
            None => (&mut fields, true),
        };
        target.push(token);
        if takes_value && !inline_value {
            if let Some(value) = tokens.next() {
                target.push(value);
            }
        }
    }

    (kept, fields)
}
