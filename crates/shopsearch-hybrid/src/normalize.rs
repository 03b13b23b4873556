//! Parse-and-validate step from a raw `_search` response to `SearchHit`s.
//!
//! Required per hit: `_id`, a finite numeric `_score`, `_source` with a
//! string `product_name`. Optional display fields map to
//! `DisplayValue::NotAvailable` when absent, null, blank or `nan`; a missing
//! or unparsable price becomes 0.0. Anything structurally off fails the whole
//! response with `BackendError::Malformed`. A response that timed out or lost
//! shards fails with `BackendError::Partial`.

use serde::Deserialize;
use serde_json::{Map, Value};

use shopsearch_core::error::BackendError;
use shopsearch_core::{DisplayValue, SearchHit};

use crate::request::{BRAND, CATEGORY, IMAGE_URL, PRICE, PRODUCT_NAME};

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    timed_out: bool,
    #[serde(default, rename = "_shards")]
    shards: Shards,
    hits: HitsEnvelope,
}

#[derive(Default, Deserialize)]
struct Shards {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    failed: u64,
}

#[derive(Deserialize)]
struct HitsEnvelope {
    hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: Option<Map<String, Value>>,
}

pub fn parse_hits(response: Value) -> Result<Vec<SearchHit>, BackendError> {
    let envelope: Envelope =
        serde_json::from_value(response).map_err(|e| BackendError::Malformed(format!("unexpected response shape: {e}")))?;
    if envelope.timed_out {
        return Err(BackendError::Partial("search timed out before all shards answered".to_string()));
    }
    if envelope.shards.failed > 0 {
        return Err(BackendError::Partial(format!(
            "{} of {} shards failed",
            envelope.shards.failed, envelope.shards.total
        )));
    }
    envelope
        .hits
        .hits
        .into_iter()
        .enumerate()
        .map(|(position, raw)| normalize_hit(position, raw))
        .collect()
}

fn normalize_hit(position: usize, raw: RawHit) -> Result<SearchHit, BackendError> {
    let malformed = |what: &str| BackendError::Malformed(format!("hit #{position}: {what}"));

    let id = raw.id.ok_or_else(|| malformed("missing _id"))?;
    let score = raw.score.filter(|s| s.is_finite()).ok_or_else(|| malformed("missing or non-finite _score"))?;
    let source = raw.source.ok_or_else(|| malformed("missing _source"))?;

    let name = match source.get(PRODUCT_NAME) {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(malformed("missing product_name")),
    };

    Ok(SearchHit {
        id,
        score,
        name,
        brand: text_field(&source, BRAND).map_err(|e| malformed(&e))?,
        price: price_field(&source).map_err(|e| malformed(&e))?,
        category: text_field(&source, CATEGORY).map_err(|e| malformed(&e))?,
        image: text_field(&source, IMAGE_URL).map_err(|e| malformed(&e))?,
    })
}

fn text_field(source: &Map<String, Value>, field: &str) -> Result<DisplayValue, String> {
    match source.get(field) {
        None | Some(Value::Null) => Ok(DisplayValue::NotAvailable),
        Some(Value::String(s)) => Ok(DisplayValue::from_text(Some(s))),
        Some(Value::Number(n)) => Ok(DisplayValue::Available(n.to_string())),
        Some(other) => Err(format!("{field} has unexpected type: {other}")),
    }
}

fn price_field(source: &Map<String, Value>) -> Result<f64, String> {
    let price = match source.get(PRICE) {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').replace(',', "").parse::<f64>().unwrap_or(0.0),
        Some(other) => return Err(format!("{PRICE} has unexpected type: {other}")),
    };
    Ok(if price.is_finite() { price } else { 0.0 })
}
