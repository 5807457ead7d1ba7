//! Symbol lists and helpers shared between the streaming core and its consumers.
//!
//! A stream subscribes to a comma-delimited list of symbols. The list is kept in
//! the order the caller gave it; option symbols may contain inner spaces, so only
//! commas (and line breaks, when reading from a file) separate entries.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use crate::error::StreamError;

/// Exclusive upper bound on symbols per stream: a list must hold fewer than this.
pub const MAX_SYMBOLS: usize = 30;

/// Ordered list of symbols requested on one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolList(Vec<String>);

/// Trait providing file parsing for symbol lists.
pub trait SymbolParser {
    /// Parses symbols from a buffered reader.
    ///
    /// Each non-empty line may carry one symbol or a comma-delimited list.
    /// Lines starting with `#` are comments.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<SymbolList, StreamError>;
}

impl SymbolParser for SymbolList {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<SymbolList, StreamError> {
        let mut symbols = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(StreamError::Io)?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with('#') {
                continue;
            }
            symbols.extend(split_symbols(trimmed_line));
        }
        Ok(SymbolList(symbols))
    }
}

impl SymbolList {
    /// Builds a list from already separated symbols, trimming each and dropping blanks.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SymbolList(
            symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// Number of symbols in the list.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if the list holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the symbols in request order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Checks the list can be sent on one stream: non-empty and strictly fewer
    /// than `max_exclusive` entries.
    pub fn validate(&self, max_exclusive: usize) -> Result<(), StreamError> {
        if self.is_empty() {
            return Err(StreamError::InvalidArgument(
                "symbol list is empty".to_string(),
            ));
        }
        if self.len() >= max_exclusive {
            return Err(StreamError::InvalidArgument(format!(
                "{} symbols requested, a stream accepts fewer than {}",
                self.len(),
                max_exclusive
            )));
        }
        Ok(())
    }

    /// Comma-joined form used in the stream path.
    pub fn to_path_segment(&self) -> String {
        self.0.join(",")
    }
}

impl FromStr for SymbolList {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SymbolList(split_symbols(s).collect()))
    }
}

impl fmt::Display for SymbolList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path_segment())
    }
}

fn split_symbols(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_comma_delimited_list() {
        let list: SymbolList = " MSFT, GOOG,,AAPL ".parse().unwrap();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["MSFT", "GOOG", "AAPL"]);
        assert_eq!(list.to_path_segment(), "MSFT,GOOG,AAPL");
    }

    #[test]
    fn keeps_inner_spaces_of_option_symbols() {
        let list: SymbolList = "MSFT 200117C150,AAPL".parse().unwrap();
        assert_eq!(list.iter().next(), Some("MSFT 200117C150"));
    }

    #[test]
    fn file_parser_skips_comments_and_blank_lines() {
        let input = "# watchlist\nMSFT\n\nGOOG, AAPL\n";
        let list = SymbolList::parse_from_file(Cursor::new(input)).unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn validate_rejects_thirty_or_more() {
        let under = SymbolList::new((0..29).map(|i| format!("S{i}")));
        assert!(under.validate(MAX_SYMBOLS).is_ok());

        let at_cap = SymbolList::new((0..30).map(|i| format!("S{i}")));
        assert!(matches!(
            at_cap.validate(MAX_SYMBOLS),
            Err(StreamError::InvalidArgument(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_list() {
        assert!(matches!(
            SymbolList::default().validate(MAX_SYMBOLS),
            Err(StreamError::InvalidArgument(_))
        ));
    }
}
