use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use figbridge::{BridgeConfig, CdpConnector, Connector, Error, ExecError, RetryPolicy, SessionManager};
use figbridge_protocol::{ErrorBody, ExecRequest, ExecResponse, HealthResponse, ReconnectResponse};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::PidFile;

/// Everything `figbridge daemon` needs to run.
#[derive(Debug, Clone)]
pub struct DaemonSettings {
	pub port: u16,
	pub bridge: BridgeConfig,
	pub retry: RetryPolicy,
	pub pid_path: PathBuf,
}

/// Builds the request surface over `manager`. Handlers hold no state of
/// their own.
pub fn router<C: Connector>(manager: SessionManager<C>) -> Router {
	Router::new()
		.route("/health", get(health::<C>))
		.route("/reconnect", get(reconnect::<C>))
		.route("/exec", post(exec::<C>))
		.with_state(manager)
}

/// Serves the request surface until `shutdown` resolves, then closes the
/// current session.
pub async fn serve<C, F>(listener: TcpListener, manager: SessionManager<C>, shutdown: F) -> Result<()>
where
	C: Connector,
	F: Future<Output = ()> + Send + 'static,
{
	let served = axum::serve(listener, router(manager.clone()))
		.with_graceful_shutdown(shutdown)
		.await;
	manager.shutdown().await;
	served.context("Request surface error")
}

/// Runs the daemon in the foreground until SIGINT or SIGTERM.
pub async fn run(settings: DaemonSettings) -> Result<()> {
	let connector = CdpConnector::new(settings.bridge.clone())?;
	let manager = SessionManager::new(connector, settings.retry, settings.bridge.probe_timeout);

	let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, settings.port));
	let listener = TcpListener::bind(addr)
		.await
		.with_context(|| format!("Failed to bind request surface to {addr}"))?;
	let pid_file = PidFile::create(&settings.pid_path)?;
	info!(
		target = "figbridge.daemon",
		%addr,
		debug_endpoint = %settings.bridge.endpoint(),
		pid_file = %pid_file.path().display(),
		"daemon listening"
	);

	let eager = manager.clone();
	let warmup = tokio::spawn(async move {
		if let Err(err) = eager.ensure_session().await {
			warn!(target = "figbridge.daemon", kind = err.kind(), error = %err, "initial connect failed; will retry on first request");
		}
	});

	let signal = shutdown_signal()?;
	let shutdown = async move {
		signal.await;
		warmup.abort();
	};
	serve(listener, manager, shutdown).await?;

	drop(pid_file);
	info!(target = "figbridge.daemon", "daemon stopped");
	Ok(())
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
	let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

	Ok(async move {
		tokio::select! {
			_ = sigterm.recv() => info!(target = "figbridge.daemon", "received SIGTERM, shutting down"),
			_ = sigint.recv() => info!(target = "figbridge.daemon", "received SIGINT, shutting down"),
		}
	})
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static> {
	Ok(async {
		if tokio::signal::ctrl_c().await.is_ok() {
			info!(target = "figbridge.daemon", "received Ctrl+C, shutting down");
		}
	})
}

async fn health<C: Connector>(State(manager): State<SessionManager<C>>) -> Json<HealthResponse> {
	Json(manager.health().await.into())
}

async fn reconnect<C: Connector>(State(manager): State<SessionManager<C>>) -> (StatusCode, Json<ReconnectResponse>) {
	match manager.force_reconnect().await {
		Ok(_) => {
			info!(target = "figbridge.daemon", "reconnected on request");
			(StatusCode::OK, Json(ReconnectResponse::connected()))
		}
		Err(err) => {
			warn!(target = "figbridge.daemon", kind = err.kind(), error = %err, "reconnect failed");
			(status_for(&err), Json(ReconnectResponse::failed(error_body(&err))))
		}
	}
}

async fn exec<C: Connector>(
	State(manager): State<SessionManager<C>>,
	payload: Result<Json<ExecRequest>, JsonRejection>,
) -> (StatusCode, Json<ExecResponse>) {
	let request = match payload {
		Ok(Json(request)) => request,
		Err(rejection) => {
			debug!(target = "figbridge.daemon", error = %rejection, "rejected exec body");
			let body = ErrorBody::new("bad_request", rejection.body_text());
			return (StatusCode::BAD_REQUEST, Json(ExecResponse::failed(body)));
		}
	};

	match manager.execute(&request).await {
		Ok(result) => (StatusCode::OK, Json(ExecResponse::ok(result))),
		Err(ExecError { error, partial }) => {
			let body = error_body(&error);
			let response = match partial {
				Some(results) => ExecResponse::partial(Value::from(results), body),
				None => ExecResponse::failed(body),
			};
			(status_for(&error), Json(response))
		}
	}
}

fn error_body(err: &Error) -> ErrorBody {
	ErrorBody::new(err.kind(), err.to_string())
}

fn status_for(err: &Error) -> StatusCode {
	match err {
		Error::Markup(_) => StatusCode::BAD_REQUEST,
		Error::ExecutionTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
		_ => StatusCode::BAD_GATEWAY,
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn status_codes_follow_error_kind() {
		let markup = Error::from(figbridge_markup::MarkupError::MissingRoot { found: None });
		assert_eq!(status_for(&markup), StatusCode::BAD_REQUEST);
		assert_eq!(status_for(&Error::ExecutionTimeout(Duration::from_secs(30))), StatusCode::GATEWAY_TIMEOUT);
		assert_eq!(status_for(&Error::Evaluation("boom".into())), StatusCode::BAD_GATEWAY);
		assert_eq!(status_for(&Error::ContextNotFound), StatusCode::BAD_GATEWAY);
	}

	#[test]
	fn error_body_uses_innermost_message() {
		let body = error_body(&Error::Evaluation("ReferenceError: nope is not defined".into()));
		assert_eq!(body.kind, "evaluation");
		assert_eq!(body.message, "ReferenceError: nope is not defined");
	}
}
