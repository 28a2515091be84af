//! Reference price lookup over HTTP.

use std::thread::{self, JoinHandle};

use cost_curve::{validate_price, CurveError, PriceSource};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

/// Fetches a JSON document and reads the price at a JSON pointer (e.g. `/price`
/// or `/items/0/xauPrice`).
#[derive(Clone, Debug)]
pub struct HttpPriceSource {
    url: String,
    pointer: String,
}

impl HttpPriceSource {
    pub fn new(url: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pointer: pointer.into(),
        }
    }
}

impl PriceSource for HttpPriceSource {
    fn fetch_price(&self) -> Result<f64, CurveError> {
        debug!("Requesting reference price from {}", self.url);
        let body = ureq::get(&self.url)
            .call()
            .map_err(|e| CurveError::PriceLookup(format!("requesting {}: {}", self.url, e)))?
            .into_string()
            .map_err(|e| CurveError::PriceLookup(format!("reading response: {}", e)))?;
        let json: JsonValue = serde_json::from_str(&body)
            .map_err(|e| CurveError::PriceLookup(format!("response is not JSON: {}", e)))?;
        extract_price(&json, &self.pointer)
    }
}

/// Read a positive price at `pointer`, accepting numbers and numeric strings.
pub fn extract_price(json: &JsonValue, pointer: &str) -> Result<f64, CurveError> {
    let value = json
        .pointer(pointer)
        .ok_or_else(|| CurveError::PriceLookup(format!("no value at '{}'", pointer)))?;
    let price = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| CurveError::PriceLookup(format!("value at '{}' is not numeric", pointer)))?;
    validate_price(price)
}

/// Start a lookup in the background; the caller joins it once the chart data is ready.
pub fn spawn_lookup<S>(source: S) -> JoinHandle<Result<f64, CurveError>>
where
    S: PriceSource + Send + 'static,
{
    thread::spawn(move || source.fetch_price())
}

/// Wait for a background lookup. Failures only cost the price overlay.
pub fn join_lookup(handle: JoinHandle<Result<f64, CurveError>>) -> Option<f64> {
    match handle.join() {
        Ok(Ok(price)) => {
            info!("Reference price: {:.2}", price);
            Some(price)
        }
        Ok(Err(err)) => {
            warn!("Skipping price overlay: {}", err);
            None
        }
        Err(_) => {
            warn!("Skipping price overlay: lookup thread panicked");
            None
        }
    }
}
