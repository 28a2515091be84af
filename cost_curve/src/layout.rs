//! Cumulative bar layout and full chart assembly.
//!
//! Every function here is pure: the same records, plot area and configuration
//! always produce the same geometry. Degenerate inputs (no records, zero total
//! production, zero maximum cost) yield empty bar lists and suppressed overlays
//! rather than NaN coordinates.

use serde::{Deserialize, Serialize};

use crate::axis::{cost_ticks, production_ticks, AxisTick};
use crate::config::ChartConfig;
use crate::stats::{chart_statistics, quartile_markers, ChartStatistics, QuartileMarker};
use crate::{CurveError, Record};

/// Largest accepted surface side, in pixels.
pub const MAX_SURFACE_SIDE: f64 = 16_384.0;

/// Drawing surface size and the margins around the inner plot rectangle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotArea {
    pub width: f64,
    pub height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
}

impl Default for PlotArea {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 760.0,
            margin_top: 40.0,
            margin_right: 40.0,
            margin_bottom: 70.0,
            margin_left: 90.0,
        }
    }
}

impl PlotArea {
    /// A surface of the given size with the default margins.
    pub fn new(width: f64, height: f64) -> Result<Self, CurveError> {
        let area = Self {
            width,
            height,
            ..Self::default()
        };
        area.validate()?;
        Ok(area)
    }

    /// The inner plot must be non-empty and the surface no larger than
    /// [`MAX_SURFACE_SIDE`] on either side.
    pub fn validate(&self) -> Result<(), CurveError> {
        let ok = self.width <= MAX_SURFACE_SIDE
            && self.height <= MAX_SURFACE_SIDE
            && self.plot_width() > 0.0
            && self.plot_height() > 0.0
            && self.plot_width().is_finite()
            && self.plot_height().is_finite();
        if ok {
            Ok(())
        } else {
            Err(CurveError::InvalidPlotArea {
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn plot_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn plot_height(&self) -> f64 {
        self.height - self.margin_top - self.margin_bottom
    }

    /// y coordinate of the zero-cost baseline.
    pub fn plot_bottom(&self) -> f64 {
        self.height - self.margin_bottom
    }

    /// x coordinate of `production` on a scale where `total` spans the plot width.
    /// A non-positive total maps everything to the left edge.
    pub fn production_to_x(&self, production: f64, total: f64) -> f64 {
        if total <= 0.0 {
            return self.margin_left;
        }
        production / total * self.plot_width() + self.margin_left
    }

    /// y coordinate of `cost` on a scale where `max_cost` spans the plot height.
    /// A non-positive maximum maps everything to the baseline.
    pub fn cost_to_y(&self, cost: f64, max_cost: f64) -> f64 {
        if max_cost <= 0.0 {
            return self.plot_bottom();
        }
        self.plot_bottom() - cost / max_cost * self.plot_height()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LayoutRecord {
    #[serde(flatten)]
    pub record: Record,
    /// Production of all cheaper records.
    pub cumulative_production: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CumulativeLayout {
    pub records: Vec<LayoutRecord>,
    pub total_production: f64,
    pub max_cost: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    /// Index into the layout records.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct HorizontalLine {
    pub value: f64,
    pub y: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Overlays {
    pub quartiles: Vec<QuartileMarker>,
    pub weighted_average: Option<HorizontalLine>,
    pub price: Option<HorizontalLine>,
}

/// Everything a renderer needs, in drawing coordinates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartGeometry {
    pub area: PlotArea,
    pub records: Vec<LayoutRecord>,
    pub bars: Vec<Bar>,
    pub statistics: ChartStatistics,
    pub cost_ticks: Vec<AxisTick>,
    pub production_ticks: Vec<AxisTick>,
    pub overlays: Overlays,
}

/// Running production totals over cost-sorted records.
pub fn cumulative_layout(records: &[Record]) -> CumulativeLayout {
    let mut running = 0.0;
    let mut max_cost: f64 = 0.0;
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        out.push(LayoutRecord {
            record: record.clone(),
            cumulative_production: running,
        });
        running += record.production;
        max_cost = max_cost.max(record.cost);
    }
    CumulativeLayout {
        records: out,
        total_production: running,
        max_cost,
    }
}

/// One bar per layout record; empty when either scale is degenerate.
///
/// Widths keep a 1-unit gap to the next bar but never drop below 1 unit.
pub fn bar_geometry(layout: &CumulativeLayout, area: &PlotArea) -> Vec<Bar> {
    let total = layout.total_production;
    let max_cost = layout.max_cost;
    if !(total > 0.0 && max_cost > 0.0) {
        return Vec::new();
    }
    layout
        .records
        .iter()
        .enumerate()
        .map(|(index, lr)| {
            let height = lr.record.cost / max_cost * area.plot_height();
            Bar {
                index,
                x: area.production_to_x(lr.cumulative_production, total),
                y: area.plot_bottom() - height,
                width: (lr.record.production / total * area.plot_width() - 1.0).max(1.0),
                height,
            }
        })
        .collect()
}

/// Lay out the whole chart for `records` (cost-sorted, as produced by the parser).
///
/// `price` is the reference price, if one is known; it is drawn only when it is
/// finite and positive and the configuration enables it.
pub fn build_chart(
    records: &[Record],
    config: &ChartConfig,
    price: Option<f64>,
) -> Result<ChartGeometry, CurveError> {
    let area = config.area;
    area.validate()?;

    let layout = cumulative_layout(records);
    let bars = bar_geometry(&layout, &area);
    let statistics = chart_statistics(records);
    let max_cost = layout.max_cost;

    let horizontal = |value: f64| {
        (max_cost > 0.0 && value.is_finite()).then(|| HorizontalLine {
            value,
            y: area.cost_to_y(value, max_cost),
        })
    };

    let overlays = Overlays {
        quartiles: if config.show_quartiles {
            quartile_markers(&statistics.quartiles, &layout, &area)
        } else {
            Vec::new()
        },
        weighted_average: statistics
            .weighted_average_cost
            .filter(|_| config.show_weighted_average)
            .and_then(horizontal),
        price: price
            .filter(|p| config.show_price_line && *p > 0.0)
            .and_then(horizontal),
    };

    Ok(ChartGeometry {
        area,
        cost_ticks: cost_ticks(max_cost, &area),
        production_ticks: production_ticks(layout.total_production, &area),
        records: layout.records,
        bars,
        statistics,
        overlays,
    })
}

/// Index of the layout record whose bar contains the point, if any.
pub fn bar_at(geometry: &ChartGeometry, x: f64, y: f64) -> Option<usize> {
    geometry
        .bars
        .iter()
        .find(|bar| {
            x >= bar.x && x < bar.x + bar.width && y >= bar.y && y <= bar.y + bar.height
        })
        .map(|bar| bar.index)
}
