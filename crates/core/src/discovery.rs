//! Finding the document to attach to and the context to evaluate in.

use std::time::Duration;

use figbridge_protocol::{
	EXECUTION_CONTEXT_CREATED, EXECUTION_CONTEXTS_CLEARED, EvaluateParams, Event, ExecutionContextCreated,
	ExecutionContextDescription, RUNTIME_ENABLE, TargetDescriptor,
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::EXISTENCE_PROBE;
use crate::connection::Connection;
use crate::error::{Error, Result};

/// Fetches the endpoint's directory of open targets.
///
/// Uses `/json/list`, falling back to `/json` on endpoints that only serve
/// the short form.
pub async fn list_targets(http: &reqwest::Client, endpoint: &str) -> Result<Vec<TargetDescriptor>> {
	let response = http.get(format!("{endpoint}/json/list")).send().await?;
	let response = if response.status() == StatusCode::NOT_FOUND {
		debug!(target = "figbridge.discovery", endpoint, "/json/list not served; trying /json");
		http.get(format!("{endpoint}/json")).send().await?
	} else {
		response
	};
	let targets: Vec<TargetDescriptor> = response.error_for_status()?.json().await?;
	debug!(target = "figbridge.discovery", count = targets.len(), "listed targets");
	Ok(targets)
}

/// Picks the document to attach to.
///
/// Eligible targets are pages whose URL contains one of `patterns`. Without a
/// selector the first eligible one wins; with one, the first whose id equals
/// it or whose title contains it (case-insensitive).
pub fn select_target<'a>(
	targets: &'a [TargetDescriptor],
	patterns: &[String],
	selector: Option<&str>,
) -> Result<&'a TargetDescriptor> {
	let eligible: Vec<&TargetDescriptor> = targets
		.iter()
		.filter(|t| t.kind.is_empty() || t.kind == "page")
		.filter(|t| patterns.iter().any(|p| t.url.contains(p.as_str())))
		.collect();

	if eligible.is_empty() {
		return Err(Error::NotFound(format!(
			"no open Figma document found (looked for URLs containing {})",
			patterns.join(", ")
		)));
	}

	let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) else {
		return Ok(eligible[0]);
	};
	let needle = selector.to_lowercase();
	eligible
		.iter()
		.copied()
		.find(|t| t.id == selector || t.title.to_lowercase().contains(&needle))
		.ok_or_else(|| {
			let titles: Vec<String> = eligible.iter().map(|t| format!("\"{}\"", t.title)).collect();
			Error::NotFound(format!(
				"no open Figma document matches \"{selector}\"; open documents: {}",
				titles.join(", ")
			))
		})
}

/// Finds the execution context that exposes the scripting root.
///
/// Enables runtime notifications, waits `settle` for context announcements
/// to arrive, then probes each announced context in order. Probe failures
/// are not errors; a context that fails its probe is simply skipped.
pub async fn discover_context(
	connection: &Connection,
	events: &mut mpsc::UnboundedReceiver<Event>,
	settle: Duration,
) -> Result<i64> {
	connection.send(RUNTIME_ENABLE, json!({})).await?;
	tokio::time::sleep(settle).await;

	let contexts = drain_contexts(events);
	debug!(target = "figbridge.discovery", count = contexts.len(), "probing execution contexts");

	for context in &contexts {
		let probe = EvaluateParams::new(EXISTENCE_PROBE, context.id).silent();
		match connection.evaluate(probe).await {
			Ok(Value::Bool(true)) => {
				info!(target = "figbridge.discovery", context_id = context.id, origin = %context.origin, "found scripting context");
				return Ok(context.id);
			}
			Ok(other) => {
				debug!(target = "figbridge.discovery", context_id = context.id, %other, "context lacks scripting root");
			}
			Err(err) => {
				debug!(target = "figbridge.discovery", context_id = context.id, error = %err, "probe failed");
			}
		}
	}
	Err(Error::ContextNotFound)
}

/// Live contexts announced so far, in announcement order.
fn drain_contexts(events: &mut mpsc::UnboundedReceiver<Event>) -> Vec<ExecutionContextDescription> {
	let mut contexts = Vec::new();
	while let Ok(event) = events.try_recv() {
		match event.method.as_str() {
			EXECUTION_CONTEXT_CREATED => match serde_json::from_value::<ExecutionContextCreated>(event.params) {
				Ok(created) => contexts.push(created.context),
				Err(err) => debug!(target = "figbridge.discovery", error = %err, "malformed context event"),
			},
			EXECUTION_CONTEXTS_CLEARED => contexts.clear(),
			_ => {}
		}
	}
	contexts
}
