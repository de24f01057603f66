//! Typed tree produced by [`parse`](crate::parse) and consumed by [`emit`](crate::emit).

use std::collections::BTreeSet;
use std::fmt;

/// Font family every text leaf is set in.
pub const DEFAULT_FONT_FAMILY: &str = "Inter";
/// Frame width when `w` is omitted (matches the target runtime's own default).
pub const DEFAULT_FRAME_WIDTH: f64 = 100.0;
/// Frame height when `h` is omitted.
pub const DEFAULT_FRAME_HEIGHT: f64 = 100.0;
/// Frame name when `name` is omitted.
pub const DEFAULT_FRAME_NAME: &str = "Frame";
/// Text size when `size` is omitted.
pub const DEFAULT_TEXT_SIZE: f64 = 14.0;

/// 24-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color {
	pub const WHITE: Color = Color { r: 0xff, g: 0xff, b: 0xff };
	pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

	/// Parses `#rrggbb` or `rrggbb` (case-insensitive).
	pub fn parse_hex(input: &str) -> Option<Color> {
		let hex = input.trim();
		let hex = hex.strip_prefix('#').unwrap_or(hex);
		if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
			return None;
		}
		let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
		Some(Color {
			r: channel(0)?,
			g: channel(2)?,
			b: channel(4)?,
		})
	}

	/// Channels scaled to `[0, 1]`, the representation the target runtime expects.
	pub fn normalized(self) -> [f64; 3] {
		[self.r, self.g, self.b].map(|c| f64::from(c) / 255.0)
	}
}

/// Lower-case `rrggbb` without a leading `#`.
impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

/// Auto-layout direction of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutAxis {
	Horizontal,
	#[default]
	Vertical,
}

impl LayoutAxis {
	/// Value of the target runtime's `layoutMode` property.
	pub fn layout_mode(self) -> &'static str {
		match self {
			LayoutAxis::Horizontal => "HORIZONTAL",
			LayoutAxis::Vertical => "VERTICAL",
		}
	}
}

/// Inner spacing of a frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
	pub top: f64,
	pub right: f64,
	pub bottom: f64,
	pub left: f64,
}

impl Padding {
	pub fn uniform(value: f64) -> Self {
		Self {
			top: value,
			right: value,
			bottom: value,
			left: value,
		}
	}
}

/// Style half of a font name. Ordered so font-load emission is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FontStyle {
	#[default]
	Regular,
	Medium,
	Bold,
}

impl FontStyle {
	/// Maps a `weight` attribute. Unknown weights fall back to regular.
	pub fn from_weight(weight: &str) -> Self {
		match weight.trim() {
			"medium" => FontStyle::Medium,
			"bold" => FontStyle::Bold,
			_ => FontStyle::Regular,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			FontStyle::Regular => "Regular",
			FontStyle::Medium => "Medium",
			FontStyle::Bold => "Bold",
		}
	}
}

/// Root container.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
	pub name: String,
	pub width: f64,
	pub height: f64,
	pub x: f64,
	pub y: f64,
	pub fill: Color,
	pub corner_radius: f64,
	pub layout: LayoutAxis,
	pub gap: f64,
	pub padding: Padding,
	/// Leaves in source order.
	pub texts: Vec<Text>,
}

impl Default for Frame {
	fn default() -> Self {
		Self {
			name: DEFAULT_FRAME_NAME.to_string(),
			width: DEFAULT_FRAME_WIDTH,
			height: DEFAULT_FRAME_HEIGHT,
			x: 0.0,
			y: 0.0,
			fill: Color::WHITE,
			corner_radius: 0.0,
			layout: LayoutAxis::default(),
			gap: 0.0,
			padding: Padding::default(),
			texts: Vec::new(),
		}
	}
}

impl Frame {
	/// Distinct font styles used by the leaves, in a stable order.
	pub fn font_styles(&self) -> BTreeSet<FontStyle> {
		self.texts.iter().map(|t| t.style).collect()
	}
}

/// Text leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
	pub content: String,
	pub style: FontStyle,
	pub size: f64,
	pub color: Color,
	/// Stretch to the frame's width and grow vertically with content.
	pub fill_width: bool,
}

impl Default for Text {
	fn default() -> Self {
		Self {
			content: String::new(),
			style: FontStyle::Regular,
			size: DEFAULT_TEXT_SIZE,
			color: Color::BLACK,
			fill_width: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hex_with_and_without_hash() {
		assert_eq!(Color::parse_hex("#18181b"), Some(Color { r: 0x18, g: 0x18, b: 0x1b }));
		assert_eq!(Color::parse_hex("FFFFFF"), Some(Color::WHITE));
		assert_eq!(Color::parse_hex("#fff"), None);
		assert_eq!(Color::parse_hex("#gg0000"), None);
		assert_eq!(Color::parse_hex("#ff00ff00"), None);
	}

	#[test]
	fn normalized_channels_round_trip_every_byte() {
		for byte in 0..=255u8 {
			let [r, g, b] = Color { r: byte, g: byte, b: byte }.normalized();
			for channel in [r, g, b] {
				assert!((0.0..=1.0).contains(&channel));
				assert_eq!((channel * 255.0).round() as u8, byte);
			}
		}
		assert_eq!(Color::BLACK.normalized(), [0.0, 0.0, 0.0]);
		assert_eq!(Color::WHITE.normalized(), [1.0, 1.0, 1.0]);
	}

	#[test]
	fn displays_as_lowercase_hex() {
		assert_eq!(Color { r: 0xAB, g: 0x01, b: 0xFF }.to_string(), "ab01ff");
	}

	#[test]
	fn weight_mapping_recognizes_three_weights() {
		assert_eq!(FontStyle::from_weight("regular"), FontStyle::Regular);
		assert_eq!(FontStyle::from_weight("medium"), FontStyle::Medium);
		assert_eq!(FontStyle::from_weight("bold"), FontStyle::Bold);
		assert_eq!(FontStyle::from_weight("ultra"), FontStyle::Regular);
		assert_eq!(FontStyle::from_weight("Bold"), FontStyle::Regular);
	}
}
