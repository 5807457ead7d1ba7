//! Frame decoding: one stream line into one `QuoteFragment`.
//!
//! Decoding never fails outward. A line that is not a JSON object decodes to an
//! empty fragment; a known field with an unusable value is skipped on its own;
//! unknown keys are ignored.

use log::debug;
use quote_common::quote::{FieldUpdate, QuoteField, QuoteFragment};
use quote_common::StreamError;
use serde_json::{Map, Value};

/// Decodes a line, swallowing any decode failure into an empty fragment.
pub fn decode_fragment(line: &str) -> QuoteFragment {
    match try_decode(line) {
        Ok(fragment) => fragment,
        Err(e) => {
            debug!("Dropping undecodable frame ({}): {}", e, line);
            QuoteFragment::default()
        }
    }
}

fn try_decode(line: &str) -> Result<QuoteFragment, StreamError> {
    let object: Map<String, Value> =
        serde_json::from_str(line).map_err(|e| StreamError::Decode(e.to_string()))?;

    let mut fragment = QuoteFragment::default();
    for (key, value) in &object {
        let Ok(field) = key.parse::<QuoteField>() else {
            continue;
        };
        match FieldUpdate::decode(field, value) {
            Some(update) => fragment.push(update),
            None if value.is_null() => {}
            None => debug!("Skipping field {} with unusable value {}", field, value),
        }
    }
    Ok(fragment)
}
