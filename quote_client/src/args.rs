//! Command-line arguments for the quote client.
//!
//! Every option falls back to an environment variable, and `main` loads a `.env`
//! file first, so a token never has to appear on the command line.
use clap::Parser;
use quote_common::net::{DEFAULT_CONNECT_TIMEOUT_MS, Environment};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Environment whose base URL is used unless `--base-url` is given.
    #[clap(long, value_enum, env = "QUOTE_ENVIRONMENT", default_value_t = Environment::Simulation)]
    pub environment: Environment,

    /// Explicit base URL (e.g. `http://127.0.0.1:8080/v2`), overriding `--environment`.
    #[clap(long, env = "QUOTE_BASE_URL")]
    pub base_url: Option<String>,

    /// Comma-delimited symbols to subscribe to (fewer than 30).
    #[clap(long, env = "QUOTE_SYMBOLS", conflicts_with = "path")]
    pub symbols: Option<String>,

    /// Path to a text file with symbols, one per line or comma-separated.
    #[clap(long)]
    pub path: Option<String>,

    /// Access token passed to the stream endpoint.
    #[clap(long, env = "QUOTE_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Bound on establishing the stream, in milliseconds.
    #[clap(long, env = "QUOTE_CONNECT_TIMEOUT_MS", default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbols_and_defaults() {
        let args =
            Args::try_parse_from(["quote_client", "--symbols", "MSFT,GOOG", "--token", "t"])
                .unwrap();
        assert_eq!(args.symbols.as_deref(), Some("MSFT,GOOG"));
        assert_eq!(args.connect_timeout_ms, 6000);
    }

    #[test]
    fn symbols_and_path_conflict() {
        let result = Args::try_parse_from([
            "quote_client",
            "--symbols",
            "MSFT",
            "--path",
            "list.txt",
            "--token",
            "t",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn environment_value() {
        let args = Args::try_parse_from([
            "quote_client",
            "--environment",
            "production",
            "--symbols",
            "MSFT",
            "--token",
            "t",
        ])
        .unwrap();
        assert_eq!(args.environment, Environment::Production);
    }
}
