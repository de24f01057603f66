//! Declarative frame markup → Figma plugin-API script.
//!
//! ```text
//! <Frame name="Card" w={240} bg="#ffffff">
//!   <Text size={14} color="#18181b">Hi</Text>
//! </Frame>
//! ```
//!
//! compiles to an async script that loads the needed fonts, creates the frame
//! and its text leaves, and resolves to `{ id, name }` of the frame. The
//! compiler is pure: no I/O, and identical input yields identical output.
//!
//! Compilation is two passes, exposed separately: [`parse`] builds the
//! [`Frame`] tree and [`emit`] renders it.

pub mod ast;
mod emit;
mod error;
mod parse;

pub use ast::{Color, FontStyle, Frame, LayoutAxis, Padding, Text};
pub use emit::{COLOR_HELPER, emit};
pub use error::{MarkupError, Result};
pub use parse::parse;

/// Compiles one markup unit into a script.
pub fn compile(markup: &str) -> Result<String> {
	parse(markup).map(|frame| emit(&frame))
}

/// Compiles every unit, failing on the first invalid one.
///
/// Nothing is returned unless all units compile, so callers can validate a
/// whole batch before evaluating any of it.
pub fn compile_batch<S: AsRef<str>>(units: &[S]) -> Result<Vec<String>> {
	units
		.iter()
		.enumerate()
		.map(|(index, unit)| {
			compile(unit.as_ref()).map_err(|source| MarkupError::BatchUnit {
				index,
				source: Box::new(source),
			})
		})
		.collect()
}
