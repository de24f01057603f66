use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use async_trait::async_trait;
use serde_json::json;

use super::*;

/// What the next non-probe evaluation does.
enum Step {
	Return(Value),
	Fail(Error),
	Hang,
}

#[derive(Default)]
struct Script {
	steps: Mutex<VecDeque<Step>>,
	/// Non-probe expressions, across all sessions.
	evaluated: Mutex<Vec<String>>,
}

impl Script {
	fn push(&self, step: Step) {
		self.steps.lock().push_back(step);
	}

	fn evaluations(&self) -> usize {
		self.evaluated.lock().len()
	}
}

struct MockSession {
	id: usize,
	open: AtomicBool,
	probe: Value,
	/// The existence probe never answers.
	check_hangs: bool,
	script: Arc<Script>,
}

#[async_trait]
impl RemoteSession for MockSession {
	fn is_open(&self) -> bool {
		self.open.load(Ordering::SeqCst)
	}

	async fn evaluate(&self, expression: &str) -> Result<Value> {
		if !self.is_open() {
			return Err(Error::NotConnected);
		}
		if expression == EXISTENCE_PROBE {
			if self.check_hangs {
				return std::future::pending().await;
			}
			return Ok(self.probe.clone());
		}
		self.script.evaluated.lock().push(expression.to_string());
		let step = self.script.steps.lock().pop_front();
		match step {
			Some(Step::Return(value)) => Ok(value),
			Some(Step::Fail(err)) => Err(err),
			Some(Step::Hang) => std::future::pending().await,
			None => Ok(json!("ok")),
		}
	}

	async fn close(&self) {
		self.open.store(false, Ordering::SeqCst);
	}
}

struct MockConnector {
	connects: AtomicUsize,
	connect_delay: Duration,
	/// Connect attempts that fail before one succeeds.
	failures: AtomicUsize,
	/// Sessions whose probe hangs, counted from the next connect.
	hanging_checks: AtomicUsize,
	probe: Mutex<Value>,
	script: Arc<Script>,
}

impl MockConnector {
	fn new() -> Self {
		Self {
			connects: AtomicUsize::new(0),
			connect_delay: Duration::from_millis(50),
			failures: AtomicUsize::new(0),
			hanging_checks: AtomicUsize::new(0),
			probe: Mutex::new(json!(true)),
			script: Arc::new(Script::default()),
		}
	}
}

#[async_trait]
impl Connector for MockConnector {
	type Session = MockSession;

	async fn connect(&self) -> Result<MockSession> {
		let id = self.connects.fetch_add(1, Ordering::SeqCst);
		tokio::time::sleep(self.connect_delay).await;
		if self
			.failures
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
			.is_ok()
		{
			return Err(Error::ContextNotFound);
		}
		Ok(MockSession {
			id,
			open: AtomicBool::new(true),
			probe: self.probe.lock().clone(),
			check_hangs: self
				.hanging_checks
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
				.is_ok(),
			script: Arc::clone(&self.script),
		})
	}
}

fn manager_with(connector: MockConnector) -> SessionManager<MockConnector> {
	SessionManager::new(connector, RetryPolicy::default(), Duration::from_secs(2))
}

fn manager() -> SessionManager<MockConnector> {
	manager_with(MockConnector::new())
}

fn script(manager: &SessionManager<MockConnector>) -> &Script {
	&manager.connector().script
}

#[tokio::test(start_paused = true)]
async fn concurrent_ensure_connects_once() {
	let manager = manager();

	let (a, b) = tokio::join!(manager.ensure_session(), manager.ensure_session());
	let (a, b) = (a.unwrap(), b.unwrap());

	assert!(Arc::ptr_eq(&a, &b));
	assert_eq!(manager.connector().connects.load(Ordering::SeqCst), 1);
	assert_eq!(manager.stats().connects, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_waiters_share_a_failed_attempt() {
	let connector = MockConnector::new();
	connector.failures.store(1, Ordering::SeqCst);
	let manager = manager_with(connector);

	let (a, b) = tokio::join!(manager.ensure_session(), manager.ensure_session());
	assert!(matches!(a, Err(Error::ContextNotFound)));
	assert!(matches!(b, Err(Error::ContextNotFound)));
	assert_eq!(manager.stats().connects, 1);

	// The failed attempt is not sticky.
	let session = manager.ensure_session().await.unwrap();
	assert_eq!(session.id, 1);
}

#[tokio::test(start_paused = true)]
async fn healthy_session_is_reused() {
	let manager = manager();
	let first = manager.ensure_session().await.unwrap();
	let second = manager.ensure_session().await.unwrap();
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(manager.stats().connects, 1);
}

#[tokio::test(start_paused = true)]
async fn unhealthy_session_is_closed_and_replaced() {
	let manager = manager();
	*manager.connector().probe.lock() = json!(false);
	let stale = manager.ensure_session().await.unwrap();

	*manager.connector().probe.lock() = json!(true);
	let fresh = manager.ensure_session().await.unwrap();

	assert!(!Arc::ptr_eq(&stale, &fresh));
	assert!(!stale.is_open());
	assert!(fresh.is_open());
	assert_eq!(manager.stats().connects, 2);
}

#[tokio::test(start_paused = true)]
async fn staggered_callers_on_a_hung_session_reconnect_once() {
	let connector = MockConnector::new();
	connector.hanging_checks.store(1, Ordering::SeqCst);
	let manager = manager_with(connector);
	let stale = manager.ensure_session().await.unwrap();

	// The first caller's health check times out at 2s and it reconnects; the second
	// caller's check of the same stale session only times out after that.
	let first = manager.clone();
	let a = tokio::spawn(async move { first.ensure_session().await });
	tokio::time::sleep(Duration::from_secs(1)).await;
	let second = manager.clone();
	let b = tokio::spawn(async move { second.ensure_session().await });

	let a = a.await.unwrap().unwrap();
	let b = b.await.unwrap().unwrap();

	assert!(Arc::ptr_eq(&a, &b));
	assert!(!stale.is_open());
	assert!(a.is_open());
	assert_eq!(manager.stats().connects, 2);
}

#[tokio::test(start_paused = true)]
async fn health_distinguishes_present_from_usable() {
	let manager = manager();
	assert_eq!(manager.health().await, Health::Disconnected);

	*manager.connector().probe.lock() = json!(false);
	let session = manager.ensure_session().await.unwrap();
	let health = manager.health().await;
	assert_eq!(health, Health::Unhealthy);
	let body = HealthResponse::from(health);
	assert!(body.connected);
	assert!(!body.healthy);

	session.close().await;
	assert_eq!(manager.health().await, Health::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn health_reports_healthy_session() {
	let manager = manager();
	manager.ensure_session().await.unwrap();
	let body = HealthResponse::from(manager.health().await);
	assert!(body.connected && body.healthy);
	assert_eq!(body.status, "ok");
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_after_two_failures() {
	let manager = manager();
	let script = script(&manager);
	script.push(Step::Fail(Error::Evaluation("attempt 0".into())));
	script.push(Step::Fail(Error::Transport("attempt 1".into())));
	script.push(Step::Return(json!(42)));

	let value = manager.eval("doWork()").await.unwrap();

	assert_eq!(value, json!(42));
	assert_eq!(manager.stats().forced_reconnects, 2);
	assert_eq!(manager.stats().connects, 3);
	assert_eq!(script.evaluations(), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_surfaces_last_error_after_three_attempts() {
	let manager = manager();
	let script = script(&manager);
	for attempt in 0..3 {
		script.push(Step::Fail(Error::Evaluation(format!("attempt {attempt}"))));
	}

	let err = manager.eval("doWork()").await.unwrap_err();

	assert_eq!(err.to_string(), "attempt 2");
	assert_eq!(script.evaluations(), 3);
	assert_eq!(manager.stats().forced_reconnects, 2);
}

#[tokio::test(start_paused = true)]
async fn retries_wait_between_attempts() {
	let manager = manager();
	let script = script(&manager);
	for _ in 0..3 {
		script.push(Step::Fail(Error::Evaluation("boom".into())));
	}

	let started = tokio::time::Instant::now();
	manager.eval("doWork()").await.unwrap_err();
	// Two retry pauses plus three connects.
	assert!(started.elapsed() >= Duration::from_millis(2 * 500 + 3 * 50));
}

#[tokio::test(start_paused = true)]
async fn markup_errors_fail_fast_without_connecting() {
	let manager = manager();

	let err = manager.render("<Text>Hi</Text>").await.unwrap_err();

	assert_eq!(err.kind(), "markup_syntax");
	assert_eq!(manager.stats().connects, 0);
	assert_eq!(manager.stats().forced_reconnects, 0);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_from_operation_is_not_retried() {
	let manager = manager();
	let err = manager
		.execute_with_retry(|_session| async { Err::<Value, _>(Error::from(figbridge_markup::MarkupError::MissingRoot { found: None })) })
		.await
		.unwrap_err();
	assert_eq!(err.kind(), "markup_syntax");
	assert_eq!(manager.stats().forced_reconnects, 0);
}

#[tokio::test(start_paused = true)]
async fn hung_evaluation_times_out() {
	let connector = MockConnector::new();
	let manager = SessionManager::new(
		connector,
		RetryPolicy {
			max_retries: 0,
			..RetryPolicy::default()
		},
		Duration::from_secs(2),
	);
	script(&manager).push(Step::Hang);

	let err = manager.eval("while (true) {}").await.unwrap_err();

	assert!(matches!(err, Error::ExecutionTimeout(d) if d == Duration::from_secs(30)));
	assert_eq!(err.kind(), "execution_timeout");
}

#[tokio::test(start_paused = true)]
async fn connect_failures_are_retried() {
	let connector = MockConnector::new();
	connector.failures.store(2, Ordering::SeqCst);
	let manager = manager_with(connector);

	let value = manager.eval("1 + 1").await.unwrap();

	assert_eq!(value, json!("ok"));
	assert_eq!(manager.stats().connects, 3);
}

#[tokio::test(start_paused = true)]
async fn render_evaluates_compiled_script() {
	let manager = manager();
	script(&manager).push(Step::Return(json!({"id": "1:2", "name": "Card"})));

	let value = manager.render(r#"<Frame name="Card"><Text>Hi</Text></Frame>"#).await.unwrap();

	assert_eq!(value["name"], "Card");
	let evaluated = script(&manager).evaluated.lock().clone();
	assert_eq!(evaluated.len(), 1);
	assert!(evaluated[0].contains("figma.createFrame()"));
}

#[tokio::test(start_paused = true)]
async fn batch_returns_partial_results_on_failure() {
	let manager = manager();
	let script = script(&manager);
	script.push(Step::Return(json!({"id": "1:1", "name": "One"})));
	for _ in 0..3 {
		script.push(Step::Fail(Error::Evaluation("Error: font unavailable".into())));
	}

	let request = ExecRequest::RenderBatch {
		jsx_array: vec![
			r#"<Frame name="One" />"#.to_string(),
			r#"<Frame name="Two" />"#.to_string(),
			r#"<Frame name="Three" />"#.to_string(),
		],
	};
	let failure = manager.execute(&request).await.unwrap_err();

	assert_eq!(failure.error.to_string(), "Error: font unavailable");
	assert_eq!(
		failure.partial.unwrap(),
		vec![json!({"id": "1:1", "name": "One"}), json!({"error": "Error: font unavailable"})]
	);
	// One success plus three attempts at the second unit; the third never ran.
	assert_eq!(script.evaluations(), 4);
}

#[tokio::test(start_paused = true)]
async fn batch_validates_every_unit_before_running_any() {
	let manager = manager();

	let failure = manager
		.render_batch(&[r#"<Frame name="One" />"#, "<Text>bad</Text>"])
		.await
		.unwrap_err();

	assert_eq!(failure.error.kind(), "markup_syntax");
	assert!(failure.partial.is_none());
	assert_eq!(script(&manager).evaluations(), 0);
	assert_eq!(manager.stats().connects, 0);
}

#[tokio::test(start_paused = true)]
async fn batch_success_returns_every_result() {
	let manager = manager();
	let request = ExecRequest::RenderBatch {
		jsx_array: vec!["<Frame />".to_string(), "<Frame />".to_string()],
	};
	let value = manager.execute(&request).await.unwrap();
	assert_eq!(value, json!(["ok", "ok"]));
}

#[tokio::test(start_paused = true)]
async fn force_reconnect_replaces_session() {
	let manager = manager();
	let first = manager.ensure_session().await.unwrap();
	let second = manager.force_reconnect().await.unwrap();

	assert!(!first.is_open());
	assert_ne!(first.id, second.id);
	assert_eq!(manager.stats().forced_reconnects, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_current_session() {
	let manager = manager();
	let session = manager.ensure_session().await.unwrap();
	manager.shutdown().await;
	manager.shutdown().await;

	assert!(!session.is_open());
	assert_eq!(manager.health().await, Health::Disconnected);
}
