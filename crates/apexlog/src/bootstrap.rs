use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use obslog_core::settings::RunConfig;

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name onto an [`EnvFilter`] directive.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr so stdout carries only the summary. Falls back to
/// `"info"` if the level string is not recognised.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

// ── Output paths ───────────────────────────────────────────────────────────────

/// Create the parent directory of an output file if it is missing.
pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Notice logged when the APEX account layout is assumed.
pub fn defaults_notice(config: &RunConfig) -> String {
    let mut parts = vec![format!(
        "obslogs in {}/*.{}",
        config.obslog_dir.display(),
        config.extension
    )];
    if let Some(cat) = &config.source_catalogue {
        parts.push(format!("sources from {}", cat.display()));
    }
    if let Some(lin) = &config.line_catalogue {
        parts.push(format!("lines from {}", lin.display()));
    }
    format!("Using APEX account defaults: {}", parts.join("; "))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use obslog_core::settings::Settings;
    use tempfile::TempDir;

    // ── level_directive ───────────────────────────────────────────────────────

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
    }

    // ── ensure_parent_dir ─────────────────────────────────────────────────────

    #[test]
    fn test_ensure_parent_dir_creates_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let target = tmp.path().join("plots").join("2019").join("apexlog.svg");

        ensure_parent_dir(&target).expect("ensure_parent_dir should succeed");

        assert!(tmp.path().join("plots").join("2019").is_dir());
        assert!(!target.exists(), "only the parent is created");
    }

    #[test]
    fn test_ensure_parent_dir_bare_file_name() {
        ensure_parent_dir(Path::new("apexlog.svg")).expect("bare name has no parent to create");
    }

    // ── defaults_notice ───────────────────────────────────────────────────────

    #[test]
    fn test_defaults_notice_uses_home() {
        let tmp = TempDir::new().expect("tempdir");

        // Override HOME so that dirs::home_dir() resolves to our temp dir.
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let config = Settings::parse_from(["apexlog"]).resolve();

        // Restore HOME.
        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        let config = config.expect("resolve should succeed");
        assert!(config.account_defaults);

        let notice = defaults_notice(&config);
        let obslogs = tmp.path().join("obslogs");
        assert!(notice.contains(&format!("{}/*.html", obslogs.display())));
        assert!(notice.contains(".cat"));
        assert!(notice.contains(".lin"));
    }
}
