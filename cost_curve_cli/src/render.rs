//! PNG/SVG export of a laid-out cost curve with plotters.
//!
//! The geometry already carries drawing coordinates, so everything is drawn
//! straight onto the root drawing area without a plotters chart context.

use std::panic;
use std::path::Path;

use anyhow::Result;
use cost_curve::{ChartConfig, ChartGeometry, Color as CurveColor};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontFamily, FontStyle, FontTransform};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Png,
    Svg,
}

/// Render under a panic guard; font or backend failures come back as `Err`.
pub fn render_chart_guard(
    geometry: &ChartGeometry,
    config: &ChartConfig,
    path: &Path,
    kind: ChartKind,
) -> Result<(), String> {
    let render = || {
        render_chart(geometry, config, path, kind).map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_chart(
    geometry: &ChartGeometry,
    config: &ChartConfig,
    path: &Path,
    kind: ChartKind,
) -> Result<()> {
    let size = (
        geometry.area.width.round().max(1.0) as u32,
        geometry.area.height.round().max(1.0) as u32,
    );
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_cost_curve(root, geometry, config)
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_cost_curve(root, geometry, config)
        }
    }
}

fn rgb(color: CurveColor) -> RGBColor {
    RGBColor(color.r, color.g, color.b)
}

fn px(v: f64) -> i32 {
    v.round() as i32
}

fn draw_cost_curve<DB>(
    root: DrawingArea<DB, Shift>,
    geometry: &ChartGeometry,
    config: &ChartConfig,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let area = &geometry.area;
    let colors = &config.colors;
    let text_color = rgb(colors.text);
    let left = area.margin_left;
    let right = area.margin_left + area.plot_width();
    let top = area.margin_top;
    let bottom = area.plot_bottom();

    let tick_font = FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal);
    let label_font = FontDesc::new(FontFamily::SansSerif, 13.0, FontStyle::Normal);
    let title_font = FontDesc::new(FontFamily::SansSerif, 22.0, FontStyle::Bold);
    let axis_font = FontDesc::new(FontFamily::SansSerif, 16.0, FontStyle::Normal);

    root.fill(&rgb(colors.background))?;

    let grid_style = ShapeStyle {
        color: rgb(colors.grid).to_rgba(),
        filled: false,
        stroke_width: 1,
    };
    for tick in &geometry.cost_ticks {
        // Ticks past the tallest bar can fall off the top of the surface.
        if tick.position < 0.0 {
            continue;
        }
        let y = px(tick.position);
        root.draw(&PathElement::new(vec![(px(left), y), (px(right), y)], grid_style))?;
        root.draw(&Text::new(
            group_thousands(tick.value),
            (px(left) - 8, y),
            tick_font
                .clone()
                .color(&text_color)
                .pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;
    }
    for tick in &geometry.production_ticks {
        let x = px(tick.position);
        root.draw(&PathElement::new(vec![(x, px(top)), (x, px(bottom))], grid_style))?;
        root.draw(&Text::new(
            group_thousands(tick.value),
            (x, px(bottom) + 8),
            tick_font
                .clone()
                .color(&text_color)
                .pos(Pos::new(HPos::Center, VPos::Top)),
        ))?;
    }

    for bar in &geometry.bars {
        let record = &geometry.records[bar.index].record;
        let fill = if record.highlight {
            rgb(colors.highlight)
        } else {
            rgb(colors.bar)
        };
        root.draw(&Rectangle::new(
            [
                (px(bar.x), px(bar.y)),
                (px(bar.x + bar.width), px(bar.y + bar.height)),
            ],
            fill.filled(),
        ))?;
        if config.show_labels && record.highlight {
            root.draw(&Text::new(
                record.name.clone(),
                (px(bar.x + bar.width / 2.0), px(bar.y) - 4),
                label_font
                    .clone()
                    .color(&text_color)
                    .pos(Pos::new(HPos::Center, VPos::Bottom)),
            ))?;
        }
    }

    let quartile_style = ShapeStyle {
        color: rgb(colors.quartile).to_rgba(),
        filled: false,
        stroke_width: 2,
    };
    for marker in &geometry.overlays.quartiles {
        let x = px(marker.x);
        root.draw(&PathElement::new(vec![(x, px(top)), (x, px(bottom))], quartile_style))?;
        root.draw(&Text::new(
            marker.label.clone(),
            (x + 4, px(top) + 2),
            label_font.clone().color(&rgb(colors.quartile)),
        ))?;
    }

    let overlay_lines = [
        (geometry.overlays.weighted_average, "Weighted avg", colors.weighted_average),
        (geometry.overlays.price, "Price", colors.price),
    ];
    for (line, label, color) in overlay_lines {
        let Some(line) = line else { continue };
        if line.y < 0.0 || line.y > area.height {
            continue;
        }
        let style = ShapeStyle {
            color: rgb(color).to_rgba(),
            filled: false,
            stroke_width: 2,
        };
        let y = px(line.y);
        root.draw(&PathElement::new(vec![(px(left), y), (px(right), y)], style))?;
        root.draw(&Text::new(
            format!("{} {}", label, group_thousands(line.value)),
            (px(right) - 4, y - 4),
            label_font
                .clone()
                .color(&rgb(color))
                .pos(Pos::new(HPos::Right, VPos::Bottom)),
        ))?;
    }

    let axis_style = ShapeStyle {
        color: text_color.to_rgba(),
        filled: false,
        stroke_width: 1,
    };
    root.draw(&PathElement::new(
        vec![(px(left), px(top)), (px(left), px(bottom)), (px(right), px(bottom))],
        axis_style,
    ))?;

    root.draw(&Text::new(
        config.title.clone(),
        (px(area.width / 2.0), px(top / 2.0)),
        title_font
            .color(&text_color)
            .pos(Pos::new(HPos::Center, VPos::Center)),
    ))?;
    root.draw(&Text::new(
        config.x_label.clone(),
        (px((left + right) / 2.0), px(area.height) - 12),
        axis_font
            .clone()
            .color(&text_color)
            .pos(Pos::new(HPos::Center, VPos::Bottom)),
    ))?;
    root.draw(&Text::new(
        config.y_label.clone(),
        (16, px((top + bottom) / 2.0)),
        axis_font
            .transform(FontTransform::Rotate270)
            .color(&text_color)
            .pos(Pos::new(HPos::Center, VPos::Top)),
    ))?;

    root.present()?;
    Ok(())
}

/// Format a value with no decimals and comma thousands separators.
pub fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0.0 && rounded != "0" {
        out.insert(0, '-');
    }
    out
}
