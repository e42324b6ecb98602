#![warn(missing_docs)]

//! exprguard
//!
//! Validate a batch of survey expression scripts. Reads a JSON array of
//! `{"script": ..., "allowedVariables": [...]}` from a file or stdin and
//! writes one violation list per script to stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use guard_config::GuardConfig;
use guard_validator::audit::{AuditLogger, JsonLinesAuditLogger, TracingAuditLogger};
use guard_validator::batch::DEFAULT_MAX_CONCURRENT;
use guard_validator::{BatchRunner, ParseLimits, Validator, ValidatorConfig};
use tokio::io::AsyncRead;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: exprguard [--config <path>] [<batch.json> | -]

Reads a JSON batch from the given file, or from stdin when the path is
omitted or `-`, and prints the validation results as JSON.

Options:
  -c, --config <path>  Configuration file (default: $EXPRGUARD_CONFIG, ./exprguard.toml)
  -h, --help           Print this help
  -V, --version        Print the version";

/// Parsed command line.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
}

/// Parse arguments after the program name.
fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = iter
                    .next()
                    .with_context(|| format!("{arg} requires a path"))?;
                parsed.config = Some(PathBuf::from(path));
            }
            "-" => parsed.input = None,
            flag if flag.starts_with('-') => anyhow::bail!("unknown option '{flag}'\n\n{USAGE}"),
            path => {
                if parsed.input.is_some() {
                    anyhow::bail!("only one input file may be given");
                }
                parsed.input = Some(PathBuf::from(path));
            }
        }
    }
    Ok(parsed)
}

/// Locate the config file.
///
/// Search order:
/// 1. `--config` on the command line
/// 2. `EXPRGUARD_CONFIG` environment variable
/// 3. `./exprguard.toml` in the current directory
/// 4. None (defaults apply, not an error)
fn find_config_file(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    if let Ok(path) = std::env::var("EXPRGUARD_CONFIG") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    let cwd = PathBuf::from("exprguard.toml");
    if cwd.exists() {
        return Some(cwd);
    }

    None
}

/// Build the validator configuration from config overrides.
fn build_validator_config(overrides: &guard_config::ValidatorOverrides) -> ValidatorConfig {
    let mut limits = ParseLimits::default();
    if let Some(bytes) = overrides.max_script_bytes {
        limits.max_script_bytes = bytes;
    }
    if let Some(depth) = overrides.max_nesting_depth {
        limits.max_nesting_depth = depth;
    }
    ValidatorConfig { limits }
}

/// Pick the audit backend the config asks for, if any.
async fn build_audit_logger(
    overrides: &guard_config::BatchOverrides,
) -> Result<Option<Arc<dyn AuditLogger>>> {
    if let Some(path) = &overrides.audit_log {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open audit log {path}"))?;
        return Ok(Some(Arc::new(JsonLinesAuditLogger::new(file))));
    }
    if overrides.audit.unwrap_or(false) {
        return Ok(Some(Arc::new(TracingAuditLogger)));
    }
    Ok(None)
}

async fn open_input(input: Option<&PathBuf>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open batch {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --version / --help before anything else
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("exprguard {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        return Ok(());
    }
    let cli = parse_args(&args)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match find_config_file(cli.config) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            GuardConfig::from_file_with_env(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => {
            tracing::debug!("no config file found, using defaults");
            GuardConfig::default()
        }
    };

    let validator = Validator::new(build_validator_config(&config.validator));
    let max_concurrent = config.batch.max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT);
    let mut runner = BatchRunner::new(validator, max_concurrent);
    if let Some(logger) = build_audit_logger(&config.batch).await? {
        runner = runner.with_audit_logger(logger);
    }

    let input = open_input(cli.input.as_ref()).await?;
    match runner.run_reader(input).await {
        Ok(results) => {
            println!("{results}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(code = e.code(), error = %e, "batch failed");
            println!("{}", e.to_structured_error());
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_args_defaults_to_stdin() {
        assert_eq!(parse_args(&[]).unwrap(), CliArgs::default());
        assert_eq!(parse_args(&args(&["-"])).unwrap(), CliArgs::default());
    }

    #[test]
    fn parse_args_reads_config_and_input() {
        let cli = parse_args(&args(&["--config", "g.toml", "batch.json"])).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("g.toml")));
        assert_eq!(cli.input, Some(PathBuf::from("batch.json")));

        let cli = parse_args(&args(&["batch.json", "-c", "other.toml"])).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn parse_args_rejects_bad_input() {
        let err = parse_args(&args(&["--config"])).unwrap_err();
        assert!(err.to_string().contains("requires a path"), "{err}");

        let err = parse_args(&args(&["--fast"])).unwrap_err();
        assert!(err.to_string().contains("unknown option '--fast'"), "{err}");

        let err = parse_args(&args(&["a.json", "b.json"])).unwrap_err();
        assert!(err.to_string().contains("only one input"), "{err}");
    }

    #[test]
    fn validator_config_defaults_without_overrides() {
        let config = build_validator_config(&guard_config::ValidatorOverrides::default());
        assert_eq!(config, ValidatorConfig::default());
    }

    #[test]
    fn validator_config_applies_overrides() {
        let config = build_validator_config(&guard_config::ValidatorOverrides {
            max_script_bytes: Some(1024),
            max_nesting_depth: Some(16),
        });
        assert_eq!(config.limits.max_script_bytes, 1024);
        assert_eq!(config.limits.max_nesting_depth, 16);
    }

    #[test]
    #[serial]
    fn explicit_config_wins_over_environment() {
        std::env::set_var("EXPRGUARD_CONFIG", "/etc/hosts");
        let found = find_config_file(Some(PathBuf::from("mine.toml")));
        assert_eq!(found, Some(PathBuf::from("mine.toml")));
        std::env::remove_var("EXPRGUARD_CONFIG");
    }

    #[test]
    #[serial]
    fn environment_config_must_exist() {
        std::env::set_var("EXPRGUARD_CONFIG", "/nonexistent/exprguard.toml");
        let found = find_config_file(None);
        assert_ne!(found, Some(PathBuf::from("/nonexistent/exprguard.toml")));
        std::env::remove_var("EXPRGUARD_CONFIG");
    }

    #[tokio::test]
    async fn audit_logger_follows_config() {
        let none = build_audit_logger(&guard_config::BatchOverrides::default())
            .await
            .unwrap();
        assert!(none.is_none());

        let tracing_only = build_audit_logger(&guard_config::BatchOverrides {
            audit: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(tracing_only.is_some());

        let path = std::env::temp_dir().join(format!("exprguard-audit-{}.jsonl", std::process::id()));
        let file_backed = build_audit_logger(&guard_config::BatchOverrides {
            audit_log: Some(path.display().to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(file_backed.is_some());
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn missing_input_file_is_an_error() {
        let missing = PathBuf::from("/nonexistent/batch.json");
        let err = open_input(Some(&missing)).await.err().unwrap();
        assert!(err.to_string().contains("/nonexistent/batch.json"), "{err}");
    }

}
