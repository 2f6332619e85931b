//! Tracing setup shared by the workspace binaries.
//!
//! The layer renders only events emitted by the search crates, so noisy
//! dependencies (hyper, reqwest, h2) stay quiet unless `RUST_LOG` asks for them
//! through the global filter.

use std::io::{self, IsTerminal};

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Target prefixes of the workspace crates.
pub const TARGET_PREFIXES: &[&str] = &[
    "fashion_search",
    "ai_llm_service",
    "product_index",
    "product_retriever",
    "api",
];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let s = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

fn is_workspace_target(target: &str) -> bool {
    TARGET_PREFIXES.iter().any(|p| {
        target == *p
            || target
                .strip_prefix(p)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

/// Compact single-line fmt layer restricted to workspace targets.
///
/// ANSI colors are enabled only when stdout is a terminal.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();
    let only_workspace = filter::filter_fn(|meta| is_workspace_target(meta.target()));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_workspace)
}

/// Level directives for every workspace crate, e.g. `product_index=debug`.
pub fn level_directives(level: Level) -> Vec<Directive> {
    let lvl = level.as_str().to_lowercase();
    TARGET_PREFIXES
        .iter()
        .filter_map(|p| format!("{p}={lvl}").parse::<Directive>().ok())
        .collect()
}

/// `RUST_LOG` if set, otherwise `default`, plus per-crate directives at `level`.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if std::env::var("RUST_LOG").is_ok() {
        return base;
    }
    level_directives(level)
        .into_iter()
        .fold(base, |f, d| f.add_directive(d))
}

/// Installs the global subscriber. Safe to call more than once.
pub fn init(default: &str, level: Level) {
    let _ = tracing_subscriber::registry()
        .with(env_filter_with_level(default, level))
        .with(layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_matching_respects_module_boundaries() {
        assert!(is_workspace_target("product_index"));
        assert!(is_workspace_target("product_index::builder"));
        assert!(is_workspace_target("api::routes"));
        assert!(!is_workspace_target("apis"));
        assert!(!is_workspace_target("hyper::proto"));
    }

    #[test]
    fn one_directive_per_crate() {
        let d = level_directives(Level::DEBUG);
        assert_eq!(d.len(), TARGET_PREFIXES.len());
        assert_eq!(d[1].to_string(), "ai_llm_service=debug");
    }
}
