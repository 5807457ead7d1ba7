//! Endpoint environments and stream URL construction.

use clap::ValueEnum;
use strum_macros::{Display, EnumString};
use url::Url;

use crate::error::StreamError;
use crate::symbols::SymbolList;

/// Default bound on establishing a stream (connect, TLS handshake, response head).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 6000;
/// Fixed pause between two open attempts.
pub const RETRY_DELAY_MS: u64 = 250;
/// Total open attempts made by one `start` before giving up.
pub const MAX_OPEN_ATTEMPTS: u32 = 10;

/// Path segments, relative to the environment base, of the quote-change stream.
pub const QUOTE_CHANGES_PATH: [&str; 3] = ["stream", "quote", "changes"];
/// Query parameter carrying the access token.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

const SIMULATION_BASE_URL: &str = "https://sim-api.tradestation.com/v2";
const PRODUCTION_BASE_URL: &str = "https://api.tradestation.com/v2";

/// Network location the stream is opened against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Display, EnumString)]
#[clap(rename_all = "lower")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Environment {
    /// Paper-trading environment.
    #[default]
    Simulation,
    /// Live environment.
    Production,
}

impl Environment {
    /// Base URL for this environment.
    pub fn base_url(&self) -> Result<Url, StreamError> {
        let raw = match self {
            Environment::Simulation => SIMULATION_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        };
        Ok(Url::parse(raw)?)
    }
}

/// Builds `{base}/stream/quote/changes/{symbols}?access_token={token}`.
///
/// Symbols are joined with commas into a single path segment; the segment and
/// the token are percent-encoded by `url`.
pub fn quote_changes_url(
    base: &Url,
    symbols: &SymbolList,
    token: &str,
) -> Result<Url, StreamError> {
    match base.scheme() {
        "http" | "https" => {}
        other => {
            return Err(StreamError::InvalidArgument(format!(
                "unsupported URL scheme '{other}'"
            )));
        }
    }

    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            StreamError::InvalidArgument(format!("base URL '{base}' cannot carry a path"))
        })?;
        segments.pop_if_empty();
        segments.extend(QUOTE_CHANGES_PATH);
        segments.push(&symbols.to_path_segment());
    }
    url.set_query(None);
    url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
    Ok(url)
}
