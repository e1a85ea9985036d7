//! Colours for the mood machine
//!
//! Parsing accepts any CSS colour string (hex fast path, everything else via
//! lightningcss) so the theme can be written the way a stylesheet would.
//! The [`Theme`] carries the fixed colours the renderer paints with.

use image::Rgba;
use lightningcss::traits::Parse;
use lightningcss::values::color::CssColor;
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3, 4, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// CSS parsing error from lightningcss
    #[error("CSS parse error: {0}")]
    CssParse(String),
}

/// Halo colour at mood 0
pub const ICE: Rgba<u8> = Rgba([61, 252, 255, 255]);
/// Halo colour at mood 1
pub const MINT: Rgba<u8> = Rgba([91, 255, 176, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
/// Page colour behind the canvas
pub const NIGHT: Rgba<u8> = Rgba([5, 7, 13, 255]);

/// The fixed colours used by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Halo colour at the bottom of the mood range
    pub halo_low: Rgba<u8>,
    /// Halo colour at the top of the mood range
    pub halo_high: Rgba<u8>,
    /// Beacon link colour
    pub link: Rgba<u8>,
    /// Bloom particle colour
    pub particle: Rgba<u8>,
}

impl Default for Theme {
    fn default() -> Self {
        Self { halo_low: ICE, halo_high: MINT, link: ICE, particle: MINT }
    }
}

impl Theme {
    /// Halo colour for a mood value (opaque)
    pub fn halo(&self, mood: f64) -> Rgba<u8> {
        lerp_rgb(self.halo_low, self.halo_high, mood)
    }
}

/// Linear RGB interpolation, rounded per channel. `t` is not clamped, matching
/// the way the halo colour follows the mood scalar directly.
pub fn lerp_rgb(from: Rgba<u8>, to: Rgba<u8>, t: f64) -> Rgba<u8> {
    let mix = |a: u8, b: u8| -> u8 {
        (a as f64 * (1.0 - t) + b as f64 * t).round().clamp(0.0, 255.0) as u8
    };
    Rgba([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2]), 255])
}

/// Replace the alpha channel with a fractional opacity in 0.0..=1.0.
pub fn with_alpha(color: Rgba<u8>, alpha: f64) -> Rgba<u8> {
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([color[0], color[1], color[2], a])
}

/// Parse a CSS color string into an RGBA color.
///
/// Hex (`#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`) is handled directly;
/// functional (`rgb()`, `hsl()`, ...) and named colours go through lightningcss.
///
/// # Examples
///
/// ```
/// use clawdbot::color::parse_color;
///
/// assert_eq!(parse_color("#3DFCFF").unwrap(), image::Rgba([61, 252, 255, 255]));
/// assert_eq!(parse_color("rgb(91, 255, 176)").unwrap(), image::Rgba([91, 255, 176, 255]));
/// assert_eq!(parse_color("black").unwrap(), image::Rgba([0, 0, 0, 255]));
/// ```
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex);
    }

    parse_css_color(s)
}

/// Parse the digits of a hex colour (without the leading `#`)
fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, ColorError> {
    let digits = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8).ok_or(ColorError::InvalidHex(c)))
        .collect::<Result<Vec<u8>, _>>()?;

    match digits.as_slice() {
        [r, g, b] => Ok(Rgba([r * 17, g * 17, b * 17, 255])),
        [r, g, b, a] => Ok(Rgba([r * 17, g * 17, b * 17, a * 17])),
        [r1, r2, g1, g2, b1, b2] => Ok(Rgba([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, 255])),
        [r1, r2, g1, g2, b1, b2, a1, a2] => {
            Ok(Rgba([r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2, a1 * 16 + a2]))
        }
        _ => Err(ColorError::InvalidLength(digits.len())),
    }
}

/// Parse a CSS color using lightningcss (rgb, hsl, hwb, oklch, named colors)
fn parse_css_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let css_color = CssColor::parse_string(s).map_err(|e| ColorError::CssParse(e.to_string()))?;
    css_color_to_rgba(css_color)
}

/// Convert a lightningcss CssColor to RGBA
fn css_color_to_rgba(color: CssColor) -> Result<Rgba<u8>, ColorError> {
    use lightningcss::values::color::FloatColor;

    let rgb_color = color
        .to_rgb()
        .map_err(|_| ColorError::CssParse("cannot convert color to RGB".to_string()))?;

    match rgb_color {
        CssColor::RGBA(rgba) => Ok(Rgba([rgba.red, rgba.green, rgba.blue, rgba.alpha])),
        CssColor::Float(float_color) => match float_color.as_ref() {
            FloatColor::RGB(rgb) => {
                let r = (rgb.r * 255.0).round() as u8;
                let g = (rgb.g * 255.0).round() as u8;
                let b = (rgb.b * 255.0).round() as u8;
                let a = (rgb.alpha * 255.0).round() as u8;
                Ok(Rgba([r, g, b, a]))
            }
            _ => Err(ColorError::CssParse("unexpected float color format".to_string())),
        },
        _ => Err(ColorError::CssParse("color conversion did not produce RGB".to_string())),
    }
}
