//! Tracing setup for the `eco` binary

use std::path::Path;

use anyhow::{Context, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// `RUST_LOG` if set, otherwise `debug` or `info`.
fn filter_directive(rust_log: Option<String>, debug: bool) -> String {
    match rust_log.filter(|d| !d.trim().is_empty()) {
        Some(directive) => directive,
        None if debug => "debug".to_string(),
        None => "info".to_string(),
    }
}

/// Installs the global subscriber: human-readable lines on stderr and, when
/// `log_file` is given, JSON lines appended to that file.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// until the process exits.
pub fn init_logging(log_file: Option<&Path>, debug: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), debug);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter {:?}", directive))?;

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("log path {:?} has no file name", path))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {:?}", dir))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, false, "info")]
    #[case(None, true, "debug")]
    #[case(Some("  "), true, "debug")]
    #[case(Some("go_ecosystem=trace"), false, "go_ecosystem=trace")]
    #[case(Some("warn"), true, "warn")]
    fn filter_directive_prefers_rust_log(
        #[case] rust_log: Option<&str>,
        #[case] debug: bool,
        #[case] expected: &str,
    ) {
        assert_eq!(filter_directive(rust_log.map(str::to_string), debug), expected);
    }
}
