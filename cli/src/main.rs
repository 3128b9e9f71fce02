use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use http_interface::openapi::generate_spec;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// har-openapi: generate an OpenAPI spec from HAR files
#[derive(Parser, Debug)]
#[command(name = "har-openapi", version, about = "Generate OpenAPI spec from HAR files")]
struct Cli {
    /// Directory containing HAR files
    har_directory: PathBuf,

    /// Only process HAR entries whose URL starts with this value
    /// (e.g. http://localhost:8080/api/v1)
    #[arg(long)]
    base_url: Option<String>,

    /// Omit JSON Schema constraints (minimum, maximum, minItems, etc.)
    #[arg(long)]
    no_constraints: bool,
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    debug!(
        directory = %cli.har_directory.display(),
        base_url = cli.base_url.as_deref().unwrap_or("<inferred>"),
        constraints = !cli.no_constraints,
        "generating OpenAPI spec"
    );
    generate_spec(
        &cli.har_directory,
        cli.base_url.as_deref(),
        !cli.no_constraints,
    )
    .with_context(|| format!("generating spec from '{}'", cli.har_directory.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let spec = run(&cli)?;
    print!("{spec}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::sync::{Arc, Mutex};

    const HAR: &str = r#"{
        "log": {
            "version": "1.2",
            "creator": {"name": "test", "version": "0"},
            "entries": [{
                "startedDateTime": "2024-01-01T00:00:00Z",
                "time": 3,
                "request": {"method": "GET", "url": "http://h/api/items?limit=5", "httpVersion": "HTTP/1.1"},
                "response": {
                    "status": 200,
                    "statusText": "OK",
                    "httpVersion": "HTTP/1.1",
                    "content": {"size": 9, "mimeType": "application/json", "text": "[1, 2, 3]"}
                }
            }]
        }
    }"#;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "har-openapi",
            "hars",
            "--base-url",
            "http://h/api",
            "--no-constraints",
        ]);
        assert_eq!(cli.har_directory, PathBuf::from("hars"));
        assert_eq!(cli.base_url.as_deref(), Some("http://h/api"));
        assert!(cli.no_constraints);
    }

    #[test]
    fn generates_yaml_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.har"), HAR).unwrap();

        let cli = Cli::parse_from(["har-openapi", dir.path().to_str().unwrap()]);
        let yaml = run(&cli).unwrap();
        assert!(yaml.contains("url: http://h/api"));
        assert!(yaml.contains("operationId: get_items"));
        assert!(yaml.contains("maxItems: 3"));

        let cli = Cli::parse_from([
            "har-openapi",
            dir.path().to_str().unwrap(),
            "--no-constraints",
        ]);
        assert!(!run(&cli).unwrap().contains("maxItems"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn run_logs_its_inputs_at_debug() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.har"), HAR).unwrap();
        let cli = Cli::parse_from(["har-openapi", dir.path().to_str().unwrap()]);
        tracing::subscriber::with_default(subscriber, || run(&cli).unwrap());

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("generating OpenAPI spec"), "{logs}");
        assert!(logs.contains("constraints=true"), "{logs}");
    }

    #[test]
    fn missing_directory_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let cli = Cli::parse_from(["har-openapi", missing.to_str().unwrap()]);

        let err = run(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("absent"));
    }
}
