use std::io::Read;
use std::path::Path;

use figbridge_protocol::{ExecRequest, ExecResponse};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::client::DaemonClient;
use crate::config::FileConfig;
use crate::daemon::{self, DaemonSettings};
use crate::error::{CliError, Result};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = FileConfig::load(cli.config.as_deref())?;
	let port = cli.port.unwrap_or(config.port);
	let client = DaemonClient::new(port);

	match cli.command {
		Commands::Daemon { debug_port, target } => {
			let mut bridge = config.bridge();
			if let Some(debug_port) = debug_port {
				bridge.debug_port = debug_port;
			}
			if let Some(target) = target {
				bridge = bridge.with_target(target);
			}
			let settings = DaemonSettings {
				port,
				bridge,
				retry: config.retry(),
				pid_path: daemon::pid_path(),
			};
			daemon::run(settings).await?;
		}
		Commands::Status => {
			let health = client.health().await?;
			let mut report = serde_json::to_value(&health)?;
			report["pid"] = json!(daemon::read_pid(&daemon::pid_path()));
			print_json(&report)?;
		}
		Commands::Reconnect => {
			let response = client.reconnect().await?;
			if let Some(error) = response.error {
				return Err(CliError::Remote(error));
			}
			print_json(&response)?;
		}
		Commands::Eval { code } => {
			let code = if code == "-" { read_stdin()? } else { code };
			let response = client.exec(&ExecRequest::Eval { code }).await?;
			finish_exec(response)?;
		}
		Commands::Render { file } => {
			let jsx = read_source(&file)?;
			let response = client.exec(&ExecRequest::Render { jsx }).await?;
			finish_exec(response)?;
		}
		Commands::RenderBatch { files } => {
			let jsx_array = files.iter().map(|file| read_source(file)).collect::<Result<Vec<_>>>()?;
			debug!(target = "figbridge.cli", units = jsx_array.len(), "sending batch");
			let response = client.exec(&ExecRequest::RenderBatch { jsx_array }).await?;
			finish_exec(response)?;
		}
		Commands::Compile { file } => {
			let markup = read_source(&file)?;
			println!("{}", figbridge_markup::compile(&markup)?);
		}
	}
	Ok(())
}

/// Prints the result of an exec call. A failed batch still prints the
/// results of the units that ran before the error is returned.
fn finish_exec(response: ExecResponse) -> Result<()> {
	let ExecResponse { result, error } = response;
	if let Some(result) = &result {
		print_json(&json!({ "result": result }))?;
	}
	match error {
		Some(error) => Err(CliError::Remote(error)),
		None => Ok(()),
	}
}

/// Reads a markup or script file; `-` reads stdin.
pub(crate) fn read_source(path: &Path) -> Result<String> {
	if path.as_os_str() == "-" {
		return read_stdin();
	}
	std::fs::read_to_string(path).map_err(|source| CliError::Read {
		path: path.to_path_buf(),
		source,
	})
}

fn read_stdin() -> Result<String> {
	let mut buf = String::new();
	std::io::stdin().read_to_string(&mut buf)?;
	Ok(buf)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
