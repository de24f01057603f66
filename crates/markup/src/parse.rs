//! Markup parser.
//!
//! The accepted grammar is a small, JSX-flavoured subset of XML:
//!
//! ```text
//! document  := trivia frame trivia
//! frame     := "<Frame" attr* ( "/>" | ">" child* "</Frame>" )
//! child     := text | other-element | character-data | comment
//! text      := "<Text" attr* ( "/>" | ">" content "</Text>" )
//! attr      := name ( "=" ( '"' chars '"' | "'" chars "'" | "{" token "}" ) )?
//! ```
//!
//! Elements other than `<Text>` inside the frame are skipped together with
//! their content, and attributes the compiler does not know are ignored.

use crate::ast::{Color, FontStyle, Frame, LayoutAxis, Padding, Text};
use crate::error::{MarkupError, Result};

const FRAME_TAG: &str = "Frame";
const TEXT_TAG: &str = "Text";
/// Text `w` value that stretches the leaf to the frame's width.
const FILL_SENTINEL: &str = "fill";

/// Parses `markup` into a [`Frame`].
pub fn parse(markup: &str) -> Result<Frame> {
	let mut cursor = Cursor::new(markup);
	cursor.skip_trivia()?;

	let starts_element = cursor
		.rest()
		.strip_prefix('<')
		.and_then(|rest| rest.chars().next())
		.is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
	if !starts_element {
		return Err(MarkupError::MissingRoot { found: None });
	}
	let root = cursor.open_tag()?;
	if root.name != FRAME_TAG {
		return Err(MarkupError::MissingRoot {
			found: Some(root.name.to_string()),
		});
	}

	let mut frame = frame_from_attrs(&root.attrs)?;
	if !root.self_closing {
		parse_children(&mut cursor, &mut frame)?;
	}

	cursor.skip_trivia()?;
	if !cursor.eof() {
		return Err(MarkupError::malformed(cursor.pos, "unexpected content after </Frame>"));
	}
	Ok(frame)
}

fn parse_children(cursor: &mut Cursor<'_>, frame: &mut Frame) -> Result<()> {
	loop {
		cursor.skip_trivia()?;
		if cursor.eof() {
			return Err(MarkupError::malformed(cursor.pos, "missing </Frame>"));
		}

		if cursor.rest().starts_with("</") {
			let offset = cursor.pos;
			let name = cursor.close_tag()?;
			if name != FRAME_TAG {
				return Err(MarkupError::malformed(offset, format!("expected </Frame>, found </{name}>")));
			}
			return Ok(());
		}

		if cursor.rest().starts_with('<') {
			let tag = cursor.open_tag()?;
			if tag.name == TEXT_TAG {
				let content = if tag.self_closing { String::new() } else { cursor.text_content()? };
				frame.texts.push(text_from_attrs(&tag.attrs, content)?);
			} else if !tag.self_closing {
				cursor.skip_element(tag.name)?;
			}
			continue;
		}

		// Character data directly inside the frame has no meaning.
		match cursor.rest().find('<') {
			Some(idx) => cursor.pos += idx,
			None => cursor.pos = cursor.src.len(),
		}
	}
}

fn frame_from_attrs(attrs: &[Attr<'_>]) -> Result<Frame> {
	let mut frame = Frame::default();
	let mut padding = PaddingSpec::default();

	for attr in attrs {
		match attr.name {
			"name" => frame.name = attr.string(FRAME_TAG)?.to_string(),
			"w" | "width" => frame.width = attr.positive(FRAME_TAG)?,
			"h" | "height" => frame.height = attr.positive(FRAME_TAG)?,
			"x" => frame.x = attr.number(FRAME_TAG)?,
			"y" => frame.y = attr.number(FRAME_TAG)?,
			"bg" | "fill" => frame.fill = attr.color(FRAME_TAG)?,
			"rounded" | "radius" => frame.corner_radius = attr.number(FRAME_TAG)?,
			"flex" => {
				frame.layout = match attr.string(FRAME_TAG)? {
					"row" => LayoutAxis::Horizontal,
					"col" | "column" => LayoutAxis::Vertical,
					_ => return Err(attr.invalid(FRAME_TAG, "`row` or `col`")),
				}
			}
			"gap" => frame.gap = attr.number(FRAME_TAG)?,
			"p" | "padding" => padding.all = Some(attr.number(FRAME_TAG)?),
			"px" => padding.x = Some(attr.number(FRAME_TAG)?),
			"py" => padding.y = Some(attr.number(FRAME_TAG)?),
			"pt" => padding.top = Some(attr.number(FRAME_TAG)?),
			"pr" => padding.right = Some(attr.number(FRAME_TAG)?),
			"pb" => padding.bottom = Some(attr.number(FRAME_TAG)?),
			"pl" => padding.left = Some(attr.number(FRAME_TAG)?),
			_ => {}
		}
	}

	frame.padding = padding.resolve();
	Ok(frame)
}

fn text_from_attrs(attrs: &[Attr<'_>], content: String) -> Result<Text> {
	let mut text = Text {
		content,
		..Text::default()
	};

	for attr in attrs {
		match attr.name {
			"size" => text.size = attr.positive(TEXT_TAG)?,
			"weight" => text.style = FontStyle::from_weight(attr.value.raw().unwrap_or_default()),
			"color" => text.color = attr.color(TEXT_TAG)?,
			"w" => text.fill_width = attr.value.raw() == Some(FILL_SENTINEL),
			_ => {}
		}
	}
	Ok(text)
}

/// Padding attributes before resolution; the most specific one wins.
#[derive(Default)]
struct PaddingSpec {
	all: Option<f64>,
	x: Option<f64>,
	y: Option<f64>,
	top: Option<f64>,
	right: Option<f64>,
	bottom: Option<f64>,
	left: Option<f64>,
}

impl PaddingSpec {
	fn resolve(&self) -> Padding {
		let base = Padding::uniform(self.all.unwrap_or(0.0));
		let x = self.x.unwrap_or(base.left);
		let y = self.y.unwrap_or(base.top);
		Padding {
			top: self.top.unwrap_or(y),
			right: self.right.unwrap_or(x),
			bottom: self.bottom.unwrap_or(y),
			left: self.left.unwrap_or(x),
		}
	}
}

#[derive(Debug)]
struct Tag<'a> {
	name: &'a str,
	attrs: Vec<Attr<'a>>,
	self_closing: bool,
}

#[derive(Debug)]
struct Attr<'a> {
	name: &'a str,
	value: AttrValue<'a>,
}

#[derive(Debug)]
enum AttrValue<'a> {
	/// `name="..."`, `name='...'` or `name={"..."}`, entities decoded.
	Literal(String),
	/// `name={token}`.
	Expr(&'a str),
	/// Bare `name`.
	Flag,
}

impl AttrValue<'_> {
	fn raw(&self) -> Option<&str> {
		match self {
			AttrValue::Literal(s) => Some(s),
			AttrValue::Expr(s) => Some(s),
			AttrValue::Flag => None,
		}
	}
}

impl Attr<'_> {
	fn invalid(&self, element: &'static str, expected: &'static str) -> MarkupError {
		MarkupError::InvalidValue {
			element,
			attribute: self.name.to_string(),
			value: self.value.raw().unwrap_or_default().to_string(),
			expected,
		}
	}

	fn string(&self, element: &'static str) -> Result<&str> {
		self.value.raw().ok_or_else(|| self.invalid(element, "a value"))
	}

	fn number(&self, element: &'static str) -> Result<f64> {
		self.value
			.raw()
			.and_then(|raw| raw.trim().parse::<f64>().ok())
			.filter(|n| n.is_finite())
			.ok_or_else(|| self.invalid(element, "a number"))
	}

	fn positive(&self, element: &'static str) -> Result<f64> {
		match self.number(element) {
			Ok(n) if n > 0.0 => Ok(n),
			_ => Err(self.invalid(element, "a positive number")),
		}
	}

	fn color(&self, element: &'static str) -> Result<Color> {
		self.value
			.raw()
			.and_then(Color::parse_hex)
			.ok_or_else(|| self.invalid(element, "a 6-digit hex color"))
	}
}

struct Cursor<'a> {
	src: &'a str,
	pos: usize,
}

impl<'a> Cursor<'a> {
	fn new(src: &'a str) -> Self {
		Self { src, pos: 0 }
	}

	fn rest(&self) -> &'a str {
		&self.src[self.pos..]
	}

	fn eof(&self) -> bool {
		self.pos >= self.src.len()
	}

	fn eat(&mut self, token: &str) -> bool {
		if self.rest().starts_with(token) {
			self.pos += token.len();
			true
		} else {
			false
		}
	}

	fn skip_ws(&mut self) {
		let rest = self.rest();
		self.pos += rest.len() - rest.trim_start().len();
	}

	/// Skips whitespace and `<!-- -->` comments.
	fn skip_trivia(&mut self) -> Result<()> {
		loop {
			self.skip_ws();
			if !self.rest().starts_with("<!--") {
				return Ok(());
			}
			let start = self.pos;
			match self.rest().find("-->") {
				Some(end) => self.pos += end + 3,
				None => return Err(MarkupError::malformed(start, "unterminated comment")),
			}
		}
	}

	fn name(&mut self) -> Option<&'a str> {
		let rest = self.rest();
		let mut chars = rest.char_indices();
		match chars.next() {
			Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
			_ => return None,
		}
		let end = chars
			.find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
			.map(|(i, _)| i)
			.unwrap_or(rest.len());
		self.pos += end;
		Some(&rest[..end])
	}

	fn open_tag(&mut self) -> Result<Tag<'a>> {
		let offset = self.pos;
		self.eat("<");
		let name = self
			.name()
			.ok_or_else(|| MarkupError::malformed(offset, "expected an element name after `<`"))?;

		let mut attrs = Vec::new();
		loop {
			self.skip_ws();
			if self.eat("/>") {
				return Ok(Tag {
					name,
					attrs,
					self_closing: true,
				});
			}
			if self.eat(">") {
				return Ok(Tag {
					name,
					attrs,
					self_closing: false,
				});
			}
			if self.eof() {
				return Err(MarkupError::malformed(offset, format!("unterminated <{name}> tag")));
			}

			let at = self.pos;
			let attr_name = self.name().ok_or_else(|| {
				let found = self.rest().chars().next().unwrap_or_default();
				MarkupError::malformed(at, format!("unexpected {found:?} in <{name}> tag"))
			})?;
			self.skip_ws();
			let value = if self.eat("=") {
				self.skip_ws();
				self.attr_value(attr_name)?
			} else {
				AttrValue::Flag
			};
			attrs.push(Attr { name: attr_name, value });
		}
	}

	fn attr_value(&mut self, attr: &str) -> Result<AttrValue<'a>> {
		let start = self.pos;
		for quote in ["\"", "'"] {
			if self.eat(quote) {
				let raw = self.take_until(quote).ok_or_else(|| {
					MarkupError::malformed(start, format!("unterminated string for attribute `{attr}`"))
				})?;
				self.pos += quote.len();
				return Ok(AttrValue::Literal(decode_entities(raw)));
			}
		}
		if self.eat("{") {
			let raw = self.take_until("}").ok_or_else(|| {
				MarkupError::malformed(start, format!("unterminated {{...}} for attribute `{attr}`"))
			})?;
			self.pos += 1;
			let token = raw.trim();
			return Ok(match unquote(token) {
				Some(inner) => AttrValue::Literal(decode_entities(inner)),
				None => AttrValue::Expr(token),
			});
		}
		Err(MarkupError::malformed(
			start,
			format!("expected \"...\" or {{...}} after `{attr}=`"),
		))
	}

	fn close_tag(&mut self) -> Result<&'a str> {
		let offset = self.pos;
		self.eat("</");
		let name = self
			.name()
			.ok_or_else(|| MarkupError::malformed(offset, "expected an element name after `</`"))?;
		self.skip_ws();
		if !self.eat(">") {
			return Err(MarkupError::malformed(offset, format!("unterminated </{name}> tag")));
		}
		Ok(name)
	}

	/// Reads the character data of a `<Text>` element and its closing tag.
	fn text_content(&mut self) -> Result<String> {
		let start = self.pos;
		let raw = self
			.take_until("</")
			.ok_or_else(|| MarkupError::malformed(start, "missing </Text>"))?;
		if let Some(idx) = raw.find('<') {
			return Err(MarkupError::malformed(start + idx, "elements inside <Text> are not supported"));
		}
		let offset = self.pos;
		let name = self.close_tag()?;
		if name != TEXT_TAG {
			return Err(MarkupError::malformed(offset, format!("expected </Text>, found </{name}>")));
		}
		Ok(decode_entities(raw.trim()))
	}

	/// Skips an element whose open tag was just consumed, including nested
	/// elements of the same name.
	fn skip_element(&mut self, name: &str) -> Result<()> {
		let start = self.pos;
		let mut depth = 1usize;
		loop {
			self.take_until("<")
				.ok_or_else(|| MarkupError::malformed(start, format!("missing </{name}>")))?;
			if self.rest().starts_with("<!--") {
				self.skip_trivia()?;
			} else if self.rest().starts_with("</") {
				if self.close_tag()? == name {
					depth -= 1;
					if depth == 0 {
						return Ok(());
					}
				}
			} else {
				let tag = self.open_tag()?;
				if tag.name == name && !tag.self_closing {
					depth += 1;
				}
			}
		}
	}

	/// Advances to the next occurrence of `pattern`, returning the text before it.
	fn take_until(&mut self, pattern: &str) -> Option<&'a str> {
		let rest = self.rest();
		let idx = rest.find(pattern)?;
		self.pos += idx;
		Some(&rest[..idx])
	}
}

fn unquote(token: &str) -> Option<&str> {
	["\"", "'", "`"].iter().find_map(|q| {
		token
			.strip_prefix(q)
			.and_then(|t| t.strip_suffix(q))
			.filter(|_| token.len() >= 2)
	})
}

fn decode_entities(raw: &str) -> String {
	if !raw.contains('&') {
		return raw.to_string();
	}
	let mut out = String::with_capacity(raw.len());
	let mut rest = raw;
	while let Some(idx) = rest.find('&') {
		out.push_str(&rest[..idx]);
		rest = &rest[idx..];
		let decoded = [
			("&lt;", '<'),
			("&gt;", '>'),
			("&amp;", '&'),
			("&quot;", '"'),
			("&apos;", '\''),
		]
		.into_iter()
		.find(|(entity, _)| rest.starts_with(entity));
		match decoded {
			Some((entity, ch)) => {
				out.push(ch);
				rest = &rest[entity.len()..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}
