//! Core cost-curve chart computation: CSV parsing, cumulative layout and overlay statistics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod axis;
pub mod config;
pub mod layout;
pub mod parser;
pub mod stats;

pub use axis::{
    cost_ticks, production_ticks, AxisTick, COST_TICK_STEP, MAX_TICKS, PRODUCTION_TICK_STEP,
};
pub use config::{ChartColors, ChartConfig, Color};
pub use layout::{
    bar_at, bar_geometry, build_chart, cumulative_layout, Bar, ChartGeometry, CumulativeLayout,
    HorizontalLine, LayoutRecord, Overlays, PlotArea, MAX_SURFACE_SIDE,
};
pub use parser::{parse_csv, split_fields, ParseReport};
pub use stats::{
    chart_statistics, quartile_markers, quartiles, weighted_average_cost, ChartStatistics,
    QuartileMarker, Quartiles,
};

#[derive(Error, Debug)]
pub enum CurveError {
    #[error("invalid chart configuration: {0}")]
    Config(String),
    #[error("invalid color '{0}': expected #rrggbb")]
    Color(String),
    #[error("price lookup failed: {0}")]
    PriceLookup(String),
    #[error("plot area {width}x{height} leaves no room for the plot")]
    InvalidPlotArea { width: f64, height: f64 },
}

/// One producer row of the input table.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub name: String,
    /// Production volume in thousand ounces.
    pub production: f64,
    /// Per-unit cost.
    pub cost: f64,
    pub highlight: bool,
    /// Position of the row in the input, before filtering.
    pub sequence_id: usize,
}

/// Source of the reference price drawn as a horizontal overlay.
pub trait PriceSource {
    fn fetch_price(&self) -> Result<f64, CurveError>;
}

/// A price known up front, e.g. supplied on the command line.
#[derive(Clone, Copy, Debug)]
pub struct FixedPrice(pub f64);

impl PriceSource for FixedPrice {
    fn fetch_price(&self) -> Result<f64, CurveError> {
        validate_price(self.0)
    }
}

/// Accept only finite, positive prices.
pub fn validate_price(value: f64) -> Result<f64, CurveError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CurveError::PriceLookup(format!(
            "price must be a positive number, got {}",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_price_rejects_non_positive() {
        assert_eq!(FixedPrice(1925.5).fetch_price().unwrap(), 1925.5);
        assert!(FixedPrice(0.0).fetch_price().is_err());
        assert!(FixedPrice(f64::NAN).fetch_price().is_err());
        assert!(FixedPrice(f64::INFINITY).fetch_price().is_err());
    }
}
