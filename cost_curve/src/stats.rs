//! Summary statistics and quartile overlays for a record set.

use serde::{Deserialize, Serialize};

use crate::layout::{CumulativeLayout, PlotArea};
use crate::Record;

const QUARTILE_LEVELS: [(&str, f64); 3] = [("Q1", 0.25), ("Median", 0.5), ("Q3", 0.75)];

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ChartStatistics {
    pub total_production: f64,
    pub max_cost: f64,
    pub quartiles: Quartiles,
    /// `None` when total production is zero.
    pub weighted_average_cost: Option<f64>,
}

/// A quartile cost projected onto the production axis.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuartileMarker {
    pub label: String,
    pub value: f64,
    pub cumulative_production: f64,
    pub x: f64,
}

pub fn chart_statistics(records: &[Record]) -> ChartStatistics {
    ChartStatistics {
        total_production: records.iter().map(|r| r.production).sum(),
        max_cost: records.iter().map(|r| r.cost).fold(0.0, f64::max),
        quartiles: quartiles(records),
        weighted_average_cost: weighted_average_cost(records),
    }
}

/// Order-statistic quartiles of the costs: element `floor(len * p)` of the
/// ascending costs, or 0 for an empty set. No interpolation.
pub fn quartiles(records: &[Record]) -> Quartiles {
    let mut costs: Vec<f64> = records.iter().map(|r| r.cost).collect();
    costs.sort_by(f64::total_cmp);
    let [q1, median, q3] = QUARTILE_LEVELS.map(|(_, p)| order_statistic(&costs, p));
    Quartiles { q1, median, q3 }
}

fn order_statistic(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (sorted.len() as f64 * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Production-weighted mean cost, Σ(cost·production) / Σ(production).
pub fn weighted_average_cost(records: &[Record]) -> Option<f64> {
    let total: f64 = records.iter().map(|r| r.production).sum();
    if total <= 0.0 {
        return None;
    }
    let weighted: f64 = records.iter().map(|r| r.cost * r.production).sum();
    let value = weighted / total;
    value.is_finite().then_some(value)
}

/// Map each quartile onto the x axis at the first record (in cost order) whose
/// cost reaches it. Quartiles with no such record are skipped.
pub fn quartile_markers(
    quartiles: &Quartiles,
    layout: &CumulativeLayout,
    area: &PlotArea,
) -> Vec<QuartileMarker> {
    if layout.total_production <= 0.0 {
        return Vec::new();
    }
    let values = [quartiles.q1, quartiles.median, quartiles.q3];
    QUARTILE_LEVELS
        .iter()
        .zip(values)
        .filter_map(|((label, _), value)| {
            let hit = layout.records.iter().find(|r| r.record.cost >= value)?;
            Some(QuartileMarker {
                label: label.to_string(),
                value,
                cumulative_production: hit.cumulative_production,
                x: area.production_to_x(hit.cumulative_production, layout.total_production),
            })
        })
        .collect()
}
