//! Gridline ticks for the cost (vertical) and production (horizontal) axes.

use serde::{Deserialize, Serialize};

use crate::layout::PlotArea;

/// Spacing of horizontal gridlines, in cost units.
pub const COST_TICK_STEP: f64 = 500.0;
/// Spacing of vertical gridlines, in production units.
pub const PRODUCTION_TICK_STEP: f64 = 10_000.0;
/// Gridlines per axis before the step is widened by powers of ten.
pub const MAX_TICKS: usize = 1_000;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AxisTick {
    pub value: f64,
    /// Drawing coordinate: y for cost ticks, x for production ticks.
    pub position: f64,
}

/// Widen `step` by factors of ten until `span` needs fewer than [`MAX_TICKS`] steps.
/// Non-finite or negative spans collapse to zero.
fn tick_span(span: f64, step: f64) -> (f64, f64) {
    let span = if span.is_finite() { span.max(0.0) } else { 0.0 };
    let mut step = step;
    while span / step >= MAX_TICKS as f64 {
        step *= 10.0;
    }
    (span, step)
}

/// Cost ticks from 0 through the first multiple of the step at or above `max_cost`,
/// so the top gridline is never below the tallest bar.
pub fn cost_ticks(max_cost: f64, area: &PlotArea) -> Vec<AxisTick> {
    let (span, step) = tick_span(max_cost, COST_TICK_STEP);
    let count = (span / step).ceil() as usize + 1;
    (0..count)
        .map(|i| {
            let value = i as f64 * step;
            AxisTick {
                value,
                position: area.cost_to_y(value, max_cost),
            }
        })
        .collect()
}

/// Production ticks from 0 through the last multiple of the step not exceeding
/// `total_production`.
pub fn production_ticks(total_production: f64, area: &PlotArea) -> Vec<AxisTick> {
    let (span, step) = tick_span(total_production, PRODUCTION_TICK_STEP);
    let count = (span / step).floor() as usize + 1;
    (0..count)
        .map(|i| {
            let value = i as f64 * step;
            AxisTick {
                value,
                position: area.production_to_x(value, total_production),
            }
        })
        .collect()
}
