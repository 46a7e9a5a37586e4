// THEORY:
// Background colors reach the renderer as strings typed into (or produced by) a
// color picker. This module normalizes every notation the picker can emit into one
// `ParsedColor`: an opaque `Rgb` plus a separate opacity scalar in `[0, 1]`.
//
// Recognized notations:
// - hex: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`
// - `rgb()` / `rgba()` with 0..255 or percentage channels
// - `hsl()` / `hsla()`
// - `hsb()` / `hsba()` (not CSS, but common in design tools)
// - the keywords `black`, `white` and `transparent`
//
// Arguments may be separated by commas, whitespace or a `/` before alpha. Hue accepts
// an optional `deg` suffix; saturation, lightness and brightness are percentages with
// or without the `%` sign.

use crate::core_modules::error::{DotImageError, Result};
use crate::core_modules::pixel::pixel::Rgb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedColor {
    pub rgb: Rgb,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
}

impl ParsedColor {
    pub fn opaque(rgb: Rgb) -> Self {
        Self { rgb, opacity: 1.0 }
    }

    pub fn to_hex(&self) -> String {
        self.rgb.to_hex()
    }
}

/// Parses any recognized color string.
pub fn parse_color(input: &str) -> Result<ParsedColor> {
    let normalized = input.trim().to_ascii_lowercase();
    let invalid = || DotImageError::InvalidColor(input.to_string());

    match normalized.as_str() {
        "black" => return Ok(ParsedColor::opaque(Rgb::BLACK)),
        "white" => return Ok(ParsedColor::opaque(Rgb::WHITE)),
        "transparent" => return Ok(ParsedColor { rgb: Rgb::BLACK, opacity: 0.0 }),
        _ => {}
    }

    if let Some(digits) = normalized.strip_prefix('#') {
        return parse_hex(digits).ok_or_else(invalid);
    }

    let (name, arguments) = split_function(&normalized).ok_or_else(invalid)?;
    let parsed = match name {
        "rgb" | "rgba" => parse_rgb_arguments(&arguments),
        "hsl" | "hsla" => parse_cylindrical_arguments(&arguments, hsl_to_rgb),
        "hsb" | "hsba" | "hsv" | "hsva" => parse_cylindrical_arguments(&arguments, hsb_to_rgb),
        _ => None,
    };
    parsed.ok_or_else(invalid)
}

/// Converts any recognized color string to six-digit hex, dropping opacity.
pub fn to_hex(input: &str) -> Result<String> {
    parse_color(input).map(|color| color.to_hex())
}

fn parse_hex(digits: &str) -> Option<ParsedColor> {
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

    let (rgb, alpha) = match digits.len() {
        3 => (Rgb::new(nibble(0)?, nibble(1)?, nibble(2)?), 255),
        4 => (Rgb::new(nibble(0)?, nibble(1)?, nibble(2)?), nibble(3)?),
        6 => (Rgb::new(byte(0)?, byte(2)?, byte(4)?), 255),
        8 => (Rgb::new(byte(0)?, byte(2)?, byte(4)?), byte(6)?),
        _ => return None,
    };
    Some(ParsedColor { rgb, opacity: alpha as f64 / 255.0 })
}

/// Splits `name(a, b, c)` into the name and its argument tokens.
fn split_function(input: &str) -> Option<(&str, Vec<&str>)> {
    let open = input.find('(')?;
    let inner = input[open + 1..].strip_suffix(')')?;
    let name = input[..open].trim();
    let arguments: Vec<&str> = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect();
    Some((name, arguments))
}

/// A number with an optional `%` suffix; percentages are returned as a fraction.
enum Component {
    Number(f64),
    Percent(f64),
}

fn parse_component(token: &str) -> Option<Component> {
    if let Some(percent) = token.strip_suffix('%') {
        return percent.trim().parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| Component::Percent(v / 100.0));
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite()).map(Component::Number)
}

fn parse_alpha(token: Option<&&str>) -> Option<f64> {
    let Some(token) = token else {
        return Some(1.0);
    };
    let alpha = match parse_component(token)? {
        Component::Number(value) | Component::Percent(value) => value,
    };
    Some(alpha.clamp(0.0, 1.0))
}

fn parse_rgb_arguments(arguments: &[&str]) -> Option<ParsedColor> {
    if arguments.len() != 3 && arguments.len() != 4 {
        return None;
    }
    let mut channels = [0u8; 3];
    for (slot, token) in channels.iter_mut().zip(arguments) {
        let value = match parse_component(token)? {
            Component::Number(value) => value,
            Component::Percent(fraction) => fraction * 255.0,
        };
        *slot = value.clamp(0.0, 255.0).round() as u8;
    }
    let opacity = parse_alpha(arguments.get(3))?;
    Some(ParsedColor { rgb: Rgb::new(channels[0], channels[1], channels[2]), opacity })
}

/// Shared argument handling for hue-based notations: `h, s, l|b [, a]`.
fn parse_cylindrical_arguments(arguments: &[&str], convert: fn(f64, f64, f64) -> Rgb) -> Option<ParsedColor> {
    if arguments.len() != 3 && arguments.len() != 4 {
        return None;
    }
    let hue_token = arguments[0].strip_suffix("deg").unwrap_or(arguments[0]);
    let hue = hue_token.parse::<f64>().ok().filter(|v| v.is_finite())?;
    let fraction = |token: &str| -> Option<f64> {
        let value = match parse_component(token)? {
            Component::Percent(fraction) => fraction,
            Component::Number(value) => value / 100.0,
        };
        Some(value.clamp(0.0, 1.0))
    };
    let saturation = fraction(arguments[1])?;
    let third = fraction(arguments[2])?;
    let opacity = parse_alpha(arguments.get(3))?;
    Some(ParsedColor { rgb: convert(hue, saturation, third), opacity })
}

/// Maps chroma `c`, the secondary component `x` and the hue sextant to (r, g, b) in `[0, 1]`.
///
/// | sextant | hue range   | (r, g, b)  |
/// |---------|-------------|------------|
/// | 0       | [0, 60)     | (c, x, 0)  |
/// | 1       | [60, 120)   | (x, c, 0)  |
/// | 2       | [120, 180)  | (0, c, x)  |
/// | 3       | [180, 240)  | (0, x, c)  |
/// | 4       | [240, 300)  | (x, 0, c)  |
/// | 5       | [300, 360)  | (c, 0, x)  |
fn hue_sector(hue: f64, chroma: f64) -> (f64, f64, f64) {
    // `h * 6` for h normalized to [0, 1), computed directly from degrees so whole
    // sextant boundaries stay exact.
    let scaled = hue.rem_euclid(360.0) / 60.0;
    let secondary = chroma * (1.0 - (scaled.rem_euclid(2.0) - 1.0).abs());
    match scaled.floor() as u8 {
        0 => (chroma, secondary, 0.0),
        1 => (secondary, chroma, 0.0),
        2 => (0.0, chroma, secondary),
        3 => (0.0, secondary, chroma),
        4 => (secondary, 0.0, chroma),
        _ => (chroma, 0.0, secondary),
    }
}

fn to_byte(value: f64) -> u8 {
    (value * 255.0).clamp(0.0, 255.0).round() as u8
}

/// HSL to RGB. `hue` in degrees, `saturation` and `lightness` in `[0, 1]`.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let (r, g, b) = hue_sector(hue, chroma);
    let m = lightness - chroma / 2.0;
    Rgb::new(to_byte(r + m), to_byte(g + m), to_byte(b + m))
}

/// HSB (HSV) to RGB. `hue` in degrees, `saturation` and `brightness` in `[0, 1]`.
pub fn hsb_to_rgb(hue: f64, saturation: f64, brightness: f64) -> Rgb {
    let chroma = brightness * saturation;
    let (r, g, b) = hue_sector(hue, chroma);
    let m = brightness - chroma;
    Rgb::new(to_byte(r + m), to_byte(g + m), to_byte(b + m))
}
