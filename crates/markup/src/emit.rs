//! Script emission for a parsed [`Frame`].
//!
//! The emitted script is a single expression: an async arrow function invoked
//! in place. Statement order follows what the target runtime enforces:
//!
//! 1. every font the leaves need is loaded, concurrently, before any node exists
//! 2. the frame is created and styled
//! 3. each leaf is created, styled, filled with text and appended, in source order
//! 4. the promise resolves to `{ id, name }` of the frame

use crate::ast::{Color, DEFAULT_FONT_FAMILY, Frame, Text};

/// Script helper turning `rrggbb` into `{ r, g, b }` channels in `[0, 1]`.
///
/// Each channel is the exact byte value divided by 255.
pub const COLOR_HELPER: &str = "const rgb = (hex) => ({ r: parseInt(hex.slice(0, 2), 16) / 255, g: parseInt(hex.slice(2, 4), 16) / 255, b: parseInt(hex.slice(4, 6), 16) / 255 });";

const FRAME_VAR: &str = "frame";

/// Renders `frame` as an executable script.
pub fn emit(frame: &Frame) -> String {
	let mut script = Script::default();
	script.raw("(async () => {");
	script.line(COLOR_HELPER);

	let styles = frame.font_styles();
	if !styles.is_empty() {
		script.line("await Promise.all([");
		for style in &styles {
			script.line(format!(
				"  figma.loadFontAsync({{ family: {}, style: {} }}),",
				js_string(DEFAULT_FONT_FAMILY),
				js_string(style.as_str())
			));
		}
		script.line("]);");
	}

	emit_frame(&mut script, frame);
	for (index, text) in frame.texts.iter().enumerate() {
		emit_text(&mut script, &format!("text{index}"), text);
	}

	script.line(format!("return {{ id: {FRAME_VAR}.id, name: {FRAME_VAR}.name }};"));
	script.raw("})()");
	script.finish()
}

fn emit_frame(script: &mut Script, frame: &Frame) {
	let f = FRAME_VAR;
	script.line(format!("const {f} = figma.createFrame();"));
	script.line(format!("{f}.name = {};", js_string(&frame.name)));
	script.line(format!("{f}.resize({}, {});", frame.width, frame.height));
	script.line(format!("{f}.x = {};", frame.x));
	script.line(format!("{f}.y = {};", frame.y));
	script.line(format!("{f}.cornerRadius = {};", frame.corner_radius));
	script.line(format!("{f}.fills = [{}];", solid_paint(frame.fill)));
	script.line(format!("{f}.layoutMode = {};", js_string(frame.layout.layout_mode())));
	script.line(format!("{f}.itemSpacing = {};", frame.gap));
	script.line(format!("{f}.paddingTop = {};", frame.padding.top));
	script.line(format!("{f}.paddingRight = {};", frame.padding.right));
	script.line(format!("{f}.paddingBottom = {};", frame.padding.bottom));
	script.line(format!("{f}.paddingLeft = {};", frame.padding.left));
	script.line(format!("{f}.primaryAxisSizingMode = \"FIXED\";"));
	script.line(format!("{f}.counterAxisSizingMode = \"FIXED\";"));
	script.line(format!("{f}.clipsContent = true;"));
}

fn emit_text(script: &mut Script, var: &str, text: &Text) {
	script.line(format!("const {var} = figma.createText();"));
	script.line(format!(
		"{var}.fontName = {{ family: {}, style: {} }};",
		js_string(DEFAULT_FONT_FAMILY),
		js_string(text.style.as_str())
	));
	script.line(format!("{var}.fontSize = {};", text.size));
	script.line(format!("{var}.characters = {};", js_string(&text.content)));
	script.line(format!("{var}.fills = [{}];", solid_paint(text.color)));
	if text.fill_width {
		script.line(format!("{var}.textAutoResize = \"HEIGHT\";"));
	}
	script.line(format!("{FRAME_VAR}.appendChild({var});"));
	// Fill sizing is only accepted once the node sits inside an auto-layout frame.
	if text.fill_width {
		script.line(format!("{var}.layoutSizingHorizontal = \"FILL\";"));
	}
}

fn solid_paint(color: Color) -> String {
	format!("{{ type: \"SOLID\", color: rgb(\"{color}\") }}")
}

/// Quotes `value` as a script string literal.
fn js_string(value: &str) -> String {
	// JSON strings are valid script string literals; U+2028/9 are escaped for
	// older engines that treat them as line terminators.
	serde_json::Value::from(value)
		.to_string()
		.replace('\u{2028}', "\\u2028")
		.replace('\u{2029}', "\\u2029")
}

#[derive(Default)]
struct Script {
	out: String,
}

impl Script {
	fn raw(&mut self, line: &str) {
		self.out.push_str(line);
		self.out.push('\n');
	}

	fn line(&mut self, line: impl AsRef<str>) {
		self.out.push_str("  ");
		self.out.push_str(line.as_ref());
		self.out.push('\n');
	}

	fn finish(mut self) -> String {
		while self.out.ends_with('\n') {
			self.out.pop();
		}
		self.out
	}
}
