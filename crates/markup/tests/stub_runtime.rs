//! Runs compiled scripts against a stub `figma` object inside a JS engine.
//!
//! The stub enforces the two ordering rules of the real runtime: text content
//! may only be assigned once the node's font has finished loading, and fill
//! sizing is only accepted on nodes that already have an auto-layout parent.

use boa_engine::{Context, Source};
use figbridge_markup::{COLOR_HELPER, compile, compile_batch};
use serde_json::Value;

const STUB: &str = r#"
globalThis.__loaded = [];
globalThis.__frames = [];
globalThis.__nextId = 1;

const __accessor = (node, name, guard) => {
  Object.defineProperty(node, name, {
    enumerable: true,
    get() { return this["_" + name]; },
    set(value) { guard(this, value); this["_" + name] = value; },
  });
};

globalThis.figma = {
  loadFontAsync(font) {
    const key = font.family + "/" + font.style;
    return Promise.resolve().then(() => { __loaded.push(key); });
  },
  createFrame() {
    const frame = {
      id: (__nextId++) + ":1",
      type: "FRAME",
      children: [],
      resize(w, h) { this.width = w; this.height = h; },
      appendChild(child) { child.parent = this.id; this.children.push(child); },
    };
    __frames.push(frame);
    return frame;
  },
  createText() {
    const text = { id: (__nextId++) + ":1", type: "TEXT", parent: null };
    __accessor(text, "characters", (node) => {
      const key = node.fontName.family + "/" + node.fontName.style;
      if (!__loaded.includes(key)) {
        throw new Error("Cannot write to node with unloaded font \"" + key + "\"");
      }
    });
    __accessor(text, "layoutSizingHorizontal", (node, value) => {
      if (value === "FILL" && node.parent === null) {
        throw new Error("FILL can only be set on children of auto-layout frames");
      }
    });
    return text;
  },
};
"#;

fn engine() -> Context {
	let mut ctx = Context::default();
	ctx.eval(Source::from_bytes(STUB)).expect("stub should install");
	ctx
}

fn eval_json(ctx: &mut Context, expression: &str) -> Value {
	let value = ctx.eval(Source::from_bytes(expression)).expect("expression should evaluate");
	let text = value
		.to_string(ctx)
		.expect("value should stringify")
		.to_std_string_escaped();
	serde_json::from_str(&text).expect("engine output should be JSON")
}

/// Evaluates `script`, drains the job queue and returns the settled outcome
/// plus a snapshot of the stub's state.
fn run(ctx: &mut Context, script: &str) -> Value {
	let wrapped = format!(
		"globalThis.__outcome = null;\n({script}).then((value) => {{ globalThis.__outcome = {{ value }}; }}, (error) => {{ globalThis.__outcome = {{ error: String(error) }}; }});"
	);
	ctx.eval(Source::from_bytes(&wrapped)).expect("script should evaluate");
	let _ = ctx.run_jobs();
	eval_json(ctx, "JSON.stringify({ outcome: __outcome, frames: __frames, loaded: __loaded })")
}

fn channel(value: &Value) -> f64 {
	value.as_f64().expect("channel should be a number")
}

/// Asserts each channel maps back to exactly the given hex byte.
fn assert_color(color: &Value, expected: [u8; 3]) {
	for (key, want) in ["r", "g", "b"].into_iter().zip(expected) {
		let got = channel(&color[key]);
		assert!((0.0..=1.0).contains(&got), "{key}: {got} out of range");
		assert_eq!((got * 255.0).round() as u8, want, "{key}: got {got}");
	}
}

#[test]
fn card_example_creates_expected_nodes() {
	let script = compile(r##"<Frame name="Card" w={240} bg="#ffffff"><Text size={14} color="#18181b">Hi</Text></Frame>"##)
		.expect("markup should compile");
	let mut ctx = engine();
	let state = run(&mut ctx, &script);

	assert!(state["outcome"]["error"].is_null(), "script failed: {}", state["outcome"]["error"]);
	let frames = state["frames"].as_array().unwrap();
	assert_eq!(frames.len(), 1);

	let frame = &frames[0];
	assert_eq!(frame["name"], "Card");
	assert_eq!(frame["width"], 240);
	assert_color(&frame["fills"][0]["color"], [0xff, 0xff, 0xff]);

	let children = frame["children"].as_array().unwrap();
	assert_eq!(children.len(), 1);
	let text = &children[0];
	assert_eq!(text["characters"], "Hi");
	assert_eq!(text["fontSize"], 14);
	assert_eq!(text["fontName"]["style"], "Regular");
	assert_color(&text["fills"][0]["color"], [0x18, 0x18, 0x1b]);

	assert_eq!(state["outcome"]["value"]["name"], "Card");
	assert_eq!(state["outcome"]["value"]["id"], frame["id"]);
}

#[test]
fn fill_width_leaves_are_sized_after_append() {
	let script = compile(r#"<Frame><Text w="fill" weight="medium">Wide</Text></Frame>"#).unwrap();
	let mut ctx = engine();
	let state = run(&mut ctx, &script);

	assert!(state["outcome"]["error"].is_null(), "script failed: {}", state["outcome"]["error"]);
	let text = &state["frames"][0]["children"][0];
	assert_eq!(text["layoutSizingHorizontal"], "FILL");
	assert_eq!(text["textAutoResize"], "HEIGHT");
	assert_eq!(text["fontName"]["style"], "Medium");
}

#[test]
fn every_needed_font_is_loaded_once() {
	let script = compile(
		r#"<Frame><Text weight="bold">A</Text><Text weight="bold">B</Text><Text>C</Text></Frame>"#,
	)
	.unwrap();
	let mut ctx = engine();
	let state = run(&mut ctx, &script);

	assert!(state["outcome"]["error"].is_null(), "script failed: {}", state["outcome"]["error"]);
	let mut loaded: Vec<&str> = state["loaded"]
		.as_array()
		.unwrap()
		.iter()
		.map(|v| v.as_str().unwrap())
		.collect();
	loaded.sort_unstable();
	assert_eq!(loaded, ["Inter/Bold", "Inter/Regular"]);
}

#[test]
fn stub_rejects_text_on_unloaded_font() {
	let mut ctx = engine();
	let state = run(
		&mut ctx,
		r#"(async () => {
			const t = figma.createText();
			t.fontName = { family: "Inter", style: "Bold" };
			t.characters = "too early";
		})()"#,
	);
	let error = state["outcome"]["error"].as_str().unwrap();
	assert!(error.contains("unloaded font"), "{error}");
}

#[test]
fn batch_units_each_create_a_frame() {
	let scripts = compile_batch(&[
		r#"<Frame name="One"><Text>1</Text></Frame>"#,
		r#"<Frame name="Two"><Text weight="bold">2</Text></Frame>"#,
	])
	.unwrap();
	let mut ctx = engine();
	for script in &scripts {
		let state = run(&mut ctx, script);
		assert!(state["outcome"]["error"].is_null(), "script failed: {}", state["outcome"]["error"]);
	}
	let state = eval_json(&mut ctx, "JSON.stringify(__frames.map((f) => f.name))");
	assert_eq!(state, serde_json::json!(["One", "Two"]));
}

#[test]
fn color_helper_round_trips_every_byte() {
	let mut ctx = Context::default();
	let channels = eval_json(
		&mut ctx,
		&format!(
			"{COLOR_HELPER}\nJSON.stringify(Array.from({{ length: 256 }}, (_, i) => {{ const h = i.toString(16).padStart(2, '0'); const c = rgb(h + '00' + h); return [c.r, c.g, c.b]; }}))"
		),
	);
	let channels = channels.as_array().unwrap();
	assert_eq!(channels.len(), 256);
	for (byte, triple) in channels.iter().enumerate() {
		let r = channel(&triple[0]);
		let g = channel(&triple[1]);
		let b = channel(&triple[2]);
		assert_eq!((r * 255.0).round() as usize, byte);
		assert_eq!(g, 0.0);
		assert_eq!((b * 255.0).round() as usize, byte);
		assert!((0.0..=1.0).contains(&r));
	}
	assert_eq!(channels[0], serde_json::json!([0, 0, 0]));
	assert_eq!(channels[255], serde_json::json!([1, 0, 1]));
}
