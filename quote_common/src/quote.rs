//! Quote data model: the static field set, change fragments and full snapshots.
//!
//! A stream line carries a JSON object whose keys are quote field names. Only the
//! fields declared in `QuoteField` are understood; each has exactly one decode
//! rule (`FieldUpdate::decode`) and exactly one overlay arm
//! (`QuoteSnapshot::apply`). Unknown keys are ignored rather than attached.
//!
//! Value rules:
//! - text fields accept strings (numbers are stringified);
//! - price fields accept JSON numbers or numeric strings;
//! - size/volume fields accept non-negative integers or integer strings;
//! - flags accept booleans or `"true"`/`"false"`.
//!
//! JSON `null` means "not supplied": it never clears a known value.

use serde::Serialize;
use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Every field the stream protocol is known to carry, by wire name.
#[allow(missing_docs)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum QuoteField {
    Symbol,
    Description,
    Exchange,
    Currency,
    Last,
    Bid,
    Ask,
    BidSize,
    AskSize,
    Open,
    High,
    Low,
    Close,
    PreviousClose,
    NetChange,
    NetChangePct,
    Volume,
    PreviousVolume,
    High52Week,
    Low52Week,
    TradeTime,
    Halted,
    IsDelayed,
}

/// A single decoded field value, typed per field.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Symbol(String),
    Description(String),
    Exchange(String),
    Currency(String),
    Last(f64),
    Bid(f64),
    Ask(f64),
    BidSize(u64),
    AskSize(u64),
    Open(f64),
    High(f64),
    Low(f64),
    Close(f64),
    PreviousClose(f64),
    NetChange(f64),
    NetChangePct(f64),
    Volume(u64),
    PreviousVolume(u64),
    High52Week(f64),
    Low52Week(f64),
    TradeTime(String),
    Halted(bool),
    IsDelayed(bool),
}

impl FieldUpdate {
    /// Decodes `value` for `field`. Returns `None` when the value is `null` or of
    /// a shape the field does not accept.
    pub fn decode(field: QuoteField, value: &Value) -> Option<FieldUpdate> {
        use QuoteField as F;
        match field {
            F::Symbol => text(value).map(FieldUpdate::Symbol),
            F::Description => text(value).map(FieldUpdate::Description),
            F::Exchange => text(value).map(FieldUpdate::Exchange),
            F::Currency => text(value).map(FieldUpdate::Currency),
            F::Last => price(value).map(FieldUpdate::Last),
            F::Bid => price(value).map(FieldUpdate::Bid),
            F::Ask => price(value).map(FieldUpdate::Ask),
            F::BidSize => count(value).map(FieldUpdate::BidSize),
            F::AskSize => count(value).map(FieldUpdate::AskSize),
            F::Open => price(value).map(FieldUpdate::Open),
            F::High => price(value).map(FieldUpdate::High),
            F::Low => price(value).map(FieldUpdate::Low),
            F::Close => price(value).map(FieldUpdate::Close),
            F::PreviousClose => price(value).map(FieldUpdate::PreviousClose),
            F::NetChange => price(value).map(FieldUpdate::NetChange),
            F::NetChangePct => price(value).map(FieldUpdate::NetChangePct),
            F::Volume => count(value).map(FieldUpdate::Volume),
            F::PreviousVolume => count(value).map(FieldUpdate::PreviousVolume),
            F::High52Week => price(value).map(FieldUpdate::High52Week),
            F::Low52Week => price(value).map(FieldUpdate::Low52Week),
            F::TradeTime => text(value).map(FieldUpdate::TradeTime),
            F::Halted => flag(value).map(FieldUpdate::Halted),
            F::IsDelayed => flag(value).map(FieldUpdate::IsDelayed),
        }
    }

    /// The field this update targets.
    pub fn field(&self) -> QuoteField {
        match self {
            FieldUpdate::Symbol(_) => QuoteField::Symbol,
            FieldUpdate::Description(_) => QuoteField::Description,
            FieldUpdate::Exchange(_) => QuoteField::Exchange,
            FieldUpdate::Currency(_) => QuoteField::Currency,
            FieldUpdate::Last(_) => QuoteField::Last,
            FieldUpdate::Bid(_) => QuoteField::Bid,
            FieldUpdate::Ask(_) => QuoteField::Ask,
            FieldUpdate::BidSize(_) => QuoteField::BidSize,
            FieldUpdate::AskSize(_) => QuoteField::AskSize,
            FieldUpdate::Open(_) => QuoteField::Open,
            FieldUpdate::High(_) => QuoteField::High,
            FieldUpdate::Low(_) => QuoteField::Low,
            FieldUpdate::Close(_) => QuoteField::Close,
            FieldUpdate::PreviousClose(_) => QuoteField::PreviousClose,
            FieldUpdate::NetChange(_) => QuoteField::NetChange,
            FieldUpdate::NetChangePct(_) => QuoteField::NetChangePct,
            FieldUpdate::Volume(_) => QuoteField::Volume,
            FieldUpdate::PreviousVolume(_) => QuoteField::PreviousVolume,
            FieldUpdate::High52Week(_) => QuoteField::High52Week,
            FieldUpdate::Low52Week(_) => QuoteField::Low52Week,
            FieldUpdate::TradeTime(_) => QuoteField::TradeTime,
            FieldUpdate::Halted(_) => QuoteField::Halted,
            FieldUpdate::IsDelayed(_) => QuoteField::IsDelayed,
        }
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn price(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|p| p.is_finite())
}

fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// One decoded stream line: the fields it supplied.
///
/// An empty fragment is what a malformed line decodes to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteFragment {
    updates: Vec<FieldUpdate>,
}

impl QuoteFragment {
    /// Builds a fragment from already decoded updates.
    pub fn new(updates: Vec<FieldUpdate>) -> Self {
        QuoteFragment { updates }
    }

    /// Appends one decoded update.
    pub fn push(&mut self, update: FieldUpdate) {
        self.updates.push(update);
    }

    /// The symbol this fragment is keyed by, if it carried one.
    pub fn symbol(&self) -> Option<&str> {
        self.updates.iter().rev().find_map(|u| match u {
            FieldUpdate::Symbol(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// `true` if no field was supplied.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Number of supplied fields.
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Supplied updates, applied front to back.
    pub fn updates(&self) -> &[FieldUpdate] {
        &self.updates
    }
}

/// Most recent known state of one symbol.
///
/// Fields never supplied by the stream stay `None`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuoteSnapshot {
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_change_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_volume: Option<u64>,
    #[serde(rename = "High52Week", skip_serializing_if = "Option::is_none")]
    pub high_52_week: Option<f64>,
    #[serde(rename = "Low52Week", skip_serializing_if = "Option::is_none")]
    pub low_52_week: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_delayed: Option<bool>,
}

impl QuoteSnapshot {
    /// Takes a symbol's first fragment as its initial snapshot.
    ///
    /// Returns `None` when the fragment has no symbol to key it by.
    pub fn from_fragment(fragment: &QuoteFragment) -> Option<QuoteSnapshot> {
        let mut snapshot = QuoteSnapshot {
            symbol: fragment.symbol()?.to_string(),
            ..QuoteSnapshot::default()
        };
        snapshot.overlay(fragment);
        Some(snapshot)
    }

    /// Overlays every supplied field of `fragment`; unsupplied fields keep their values.
    pub fn overlay(&mut self, fragment: &QuoteFragment) {
        for update in fragment.updates() {
            self.apply(update);
        }
    }

    /// Writes one field.
    pub fn apply(&mut self, update: &FieldUpdate) {
        match update {
            // The snapshot is keyed by symbol; a fragment never re-keys it.
            FieldUpdate::Symbol(_) => {}
            FieldUpdate::Description(v) => self.description = Some(v.clone()),
            FieldUpdate::Exchange(v) => self.exchange = Some(v.clone()),
            FieldUpdate::Currency(v) => self.currency = Some(v.clone()),
            FieldUpdate::Last(v) => self.last = Some(*v),
            FieldUpdate::Bid(v) => self.bid = Some(*v),
            FieldUpdate::Ask(v) => self.ask = Some(*v),
            FieldUpdate::BidSize(v) => self.bid_size = Some(*v),
            FieldUpdate::AskSize(v) => self.ask_size = Some(*v),
            FieldUpdate::Open(v) => self.open = Some(*v),
            FieldUpdate::High(v) => self.high = Some(*v),
            FieldUpdate::Low(v) => self.low = Some(*v),
            FieldUpdate::Close(v) => self.close = Some(*v),
            FieldUpdate::PreviousClose(v) => self.previous_close = Some(*v),
            FieldUpdate::NetChange(v) => self.net_change = Some(*v),
            FieldUpdate::NetChangePct(v) => self.net_change_pct = Some(*v),
            FieldUpdate::Volume(v) => self.volume = Some(*v),
            FieldUpdate::PreviousVolume(v) => self.previous_volume = Some(*v),
            FieldUpdate::High52Week(v) => self.high_52_week = Some(*v),
            FieldUpdate::Low52Week(v) => self.low_52_week = Some(*v),
            FieldUpdate::TradeTime(v) => self.trade_time = Some(v.clone()),
            FieldUpdate::Halted(v) => self.halted = Some(*v),
            FieldUpdate::IsDelayed(v) => self.is_delayed = Some(*v),
        }
    }

    /// Encode the snapshot to JSON, omitting unknown fields.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    #[test]
    fn every_field_parses_from_its_wire_name() {
        for field in QuoteField::iter() {
            let name: &'static str = field.into();
            assert_eq!(name.parse::<QuoteField>().unwrap(), field);
        }
        assert!("bid".parse::<QuoteField>().is_err());
    }

    #[test]
    fn decoded_update_targets_its_field() {
        let samples = [
            (QuoteField::Symbol, json!("MSFT")),
            (QuoteField::Bid, json!(10.5)),
            (QuoteField::BidSize, json!(300)),
            (QuoteField::Halted, json!(false)),
        ];
        for (field, value) in samples {
            assert_eq!(FieldUpdate::decode(field, &value).unwrap().field(), field);
        }
    }

    #[test]
    fn prices_accept_numbers_and_numeric_strings() {
        assert_eq!(FieldUpdate::decode(QuoteField::Ask, &json!(11)), Some(FieldUpdate::Ask(11.0)));
        assert_eq!(
            FieldUpdate::decode(QuoteField::Ask, &json!(" 11.25 ")),
            Some(FieldUpdate::Ask(11.25))
        );
        assert_eq!(FieldUpdate::decode(QuoteField::Ask, &json!("n/a")), None);
    }

    #[test]
    fn null_is_not_supplied() {
        assert_eq!(FieldUpdate::decode(QuoteField::Last, &Value::Null), None);
        assert_eq!(FieldUpdate::decode(QuoteField::Description, &Value::Null), None);
    }

    #[test]
    fn counts_reject_negative_and_fractional_values() {
        assert_eq!(
            FieldUpdate::decode(QuoteField::Volume, &json!(1200.0)),
            Some(FieldUpdate::Volume(1200))
        );
        assert_eq!(FieldUpdate::decode(QuoteField::Volume, &json!(-5)), None);
        assert_eq!(FieldUpdate::decode(QuoteField::Volume, &json!(1.5)), None);
    }

    #[test]
    fn flags_accept_string_booleans() {
        assert_eq!(
            FieldUpdate::decode(QuoteField::IsDelayed, &json!("TRUE")),
            Some(FieldUpdate::IsDelayed(true))
        );
    }

    #[test]
    fn overlay_keeps_unsupplied_fields() {
        let first = QuoteFragment::new(vec![
            FieldUpdate::Symbol("MSFT".into()),
            FieldUpdate::Bid(10.0),
            FieldUpdate::Ask(10.5),
        ]);
        let mut snapshot = QuoteSnapshot::from_fragment(&first).unwrap();

        let change =
            QuoteFragment::new(vec![FieldUpdate::Symbol("MSFT".into()), FieldUpdate::Ask(11.0)]);
        snapshot.overlay(&change);

        assert_eq!(snapshot.symbol, "MSFT");
        assert_eq!(snapshot.bid, Some(10.0));
        assert_eq!(snapshot.ask, Some(11.0));
        assert_eq!(snapshot.last, None);
    }

    #[test]
    fn fragment_without_symbol_has_no_snapshot() {
        let fragment = QuoteFragment::new(vec![FieldUpdate::Bid(1.0)]);
        assert!(QuoteSnapshot::from_fragment(&fragment).is_none());
    }

    #[test]
    fn json_uses_wire_names_and_skips_unknown_fields() {
        let fragment = QuoteFragment::new(vec![
            FieldUpdate::Symbol("GOOG".into()),
            FieldUpdate::High52Week(700.0),
            FieldUpdate::BidSize(5),
        ]);
        let snapshot = QuoteSnapshot::from_fragment(&fragment).unwrap();
        let json = snapshot.to_json().unwrap();
        assert_eq!(json, r#"{"Symbol":"GOOG","BidSize":5,"High52Week":700.0}"#);
    }
}
