use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "figbridge")]
#[command(about = "Drive a running Figma desktop app from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file to load instead of the default location
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Loopback port of the daemon's request surface
	#[arg(long, global = true, value_name = "PORT")]
	pub port: Option<u16>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run the daemon in the foreground
	Daemon {
		/// Debugging port of the Figma desktop app
		#[arg(long, value_name = "PORT")]
		debug_port: Option<u16>,

		/// Document to attach to, by target id or title
		#[arg(long, value_name = "SELECTOR")]
		target: Option<String>,
	},

	/// Report whether the daemon holds a healthy session
	Status,

	/// Drop the daemon's session and connect again
	Reconnect,

	/// Evaluate a script in the document ("-" reads stdin)
	Eval {
		#[arg(value_name = "CODE")]
		code: String,
	},

	/// Render one markup file ("-" reads stdin)
	Render {
		#[arg(value_name = "FILE")]
		file: PathBuf,
	},

	/// Render several markup files in order
	RenderBatch {
		#[arg(value_name = "FILE", required = true)]
		files: Vec<PathBuf>,
	},

	/// Print the script a markup file compiles to, without a daemon
	Compile {
		#[arg(value_name = "FILE")]
		file: PathBuf,
	},
}
