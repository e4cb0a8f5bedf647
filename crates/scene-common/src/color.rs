//! sRGB byte colors and their configuration representations.

use serde::{Deserialize, Serialize};

/// Color value in RGBA format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let s = hex.trim_start_matches('#');
        if !s.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
        match s.len() {
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Color::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    /// Look up a CSS-like color name.
    pub fn named(name: &str) -> Option<Self> {
        let c = match name.to_lowercase().as_str() {
            "transparent" => Color::transparent(),
            "black" => Color::rgb(0, 0, 0),
            "white" => Color::rgb(255, 255, 255),
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 255, 0),
            "blue" => Color::rgb(0, 0, 255),
            "yellow" => Color::rgb(255, 255, 0),
            "cyan" => Color::rgb(0, 255, 255),
            "magenta" => Color::rgb(255, 0, 255),
            "orange" => Color::rgb(255, 165, 0),
            "purple" => Color::rgb(128, 0, 128),
            "gray" | "grey" => Color::rgb(128, 128, 128),
            _ => return None,
        };
        Some(c)
    }

    /// Linear interpolation between two colors, `t` clamped to [0, 1].
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let lerp_u8 = |a: u8, b: u8| -> u8 { ((a as f64) * (1.0 - t) + (b as f64) * t).round() as u8 };
        Color::new(
            lerp_u8(self.r, other.r),
            lerp_u8(self.g, other.g),
            lerp_u8(self.b, other.b),
            lerp_u8(self.a, other.a),
        )
    }
}

/// Color representation accepted in JSON configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    /// RGB array: [r, g, b] or [r, g, b, a]
    Array(Vec<u8>),

    /// Explicit RGBA
    Rgba { r: u8, g: u8, b: u8, a: u8 },

    /// Hex string ("#RRGGBB", "#RRGGBBAA") or a color name
    Text(String),
}

impl ColorSpec {
    /// Resolve to a concrete color, `None` if the text is neither hex nor a known name.
    pub fn to_color(&self) -> Option<Color> {
        match self {
            ColorSpec::Array(arr) => {
                if arr.len() < 3 {
                    return None;
                }
                Some(Color::new(arr[0], arr[1], arr[2], arr.get(3).copied().unwrap_or(255)))
            }
            ColorSpec::Rgba { r, g, b, a } => Some(Color::new(*r, *g, *b, *a)),
            ColorSpec::Text(s) if s.starts_with('#') => Color::from_hex(s),
            ColorSpec::Text(s) => Color::named(s).or_else(|| Color::from_hex(s)),
        }
    }
}

impl From<Color> for ColorSpec {
    fn from(c: Color) -> Self {
        ColorSpec::Rgba {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        }
    }
}
