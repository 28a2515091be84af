//! Display configuration shared by the layout engine and renderers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::layout::PlotArea;
use crate::CurveError;

/// An opaque RGB color, written as `#rrggbb` in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = CurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CurveError::Color(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| CurveError::Color(s.to_string()))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = CurveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartColors {
    pub bar: Color,
    pub highlight: Color,
    pub quartile: Color,
    pub weighted_average: Color,
    pub price: Color,
    pub grid: Color,
    pub background: Color,
    pub text: Color,
}

impl Default for ChartColors {
    fn default() -> Self {
        Self {
            bar: Color::rgb(70, 130, 180),
            highlight: Color::rgb(212, 160, 23),
            quartile: Color::rgb(90, 90, 90),
            weighted_average: Color::rgb(200, 0, 100),
            price: Color::rgb(34, 139, 34),
            grid: Color::rgb(221, 221, 221),
            background: Color::rgb(255, 255, 255),
            text: Color::rgb(0, 0, 0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub show_quartiles: bool,
    pub show_weighted_average: bool,
    pub show_price_line: bool,
    /// Print names above highlighted bars.
    pub show_labels: bool,
    pub colors: ChartColors,
    pub area: PlotArea,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: "Cost curve".to_string(),
            x_label: "Cumulative production (koz)".to_string(),
            y_label: "Cost (US$/oz)".to_string(),
            show_quartiles: true,
            show_weighted_average: true,
            show_price_line: true,
            show_labels: true,
            colors: ChartColors::default(),
            area: PlotArea::default(),
        }
    }
}

impl ChartConfig {
    /// Parse a JSON configuration; absent fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, CurveError> {
        let config: ChartConfig =
            serde_json::from_str(text).map_err(|e| CurveError::Config(e.to_string()))?;
        config.area.validate()?;
        Ok(config)
    }
}
