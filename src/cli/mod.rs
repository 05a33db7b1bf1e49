use crate::fetcher::RepoAction;
use crate::runner::Backend;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "literun")]
#[command(version, about = "Download LiteRT-LM assets and run the inference binary", long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Download the model repository and the inference binary
	Fetch {
		/// What to do when the model repository already exists locally.
		/// When omitted, you are asked interactively
		#[arg(long = "on_existing", value_enum)]
		on_existing: Option<RepoAction>,

		/// Re-download the inference binary even if it already exists
		/// (only used together with --on_existing)
		#[arg(long)]
		redownload: bool,
	},

	/// Download assets if needed, then run the inference binary
	Run {
		/// Skip the download step and use existing files
		#[arg(long = "skip_download")]
		skip_download: bool,

		/// Path to the inference binary. Defaults to the download location
		#[arg(long = "binary_path")]
		binary_path: Option<PathBuf>,

		/// Path to the model file. Defaults to the single model file
		/// found in the download location
		#[arg(long = "model_path")]
		model_path: Option<PathBuf>,

		/// Input prompt for the model. Ignored when benchmark_prefill_tokens > 0
		#[arg(long, default_value = "What is the capital of Japan?")]
		prompt: String,

		/// Backend to run on
		#[arg(long, value_enum, default_value_t = Backend::Cpu)]
		backend: Backend,

		/// Run in benchmark mode
		#[arg(long)]
		benchmark: bool,

		/// Number of prefill tokens for benchmarking. When > 0, async is
		/// forced to false
		#[arg(long = "benchmark_prefill_tokens", default_value_t = 0)]
		benchmark_prefill_tokens: u32,

		/// Number of decode tokens for benchmarking
		#[arg(long = "benchmark_decode_tokens", default_value_t = 0)]
		benchmark_decode_tokens: u32,

		/// Run the model asynchronously (true/false)
		#[arg(long = "async_mode", default_value_t = true, action = ArgAction::Set)]
		async_mode: bool,

		/// Always show stderr output from the model run. By default it is
		/// shown only when stdout is empty
		#[arg(long = "show_stderr")]
		show_stderr: bool,

		/// Print the run result as JSON
		#[arg(long)]
		json: bool,

		/// What to do when the model repository already exists locally.
		/// When omitted, you are asked interactively
		#[arg(long = "on_existing", value_enum)]
		on_existing: Option<RepoAction>,

		/// Re-download the inference binary even if it already exists
		/// (only used together with --on_existing)
		#[arg(long)]
		redownload: bool,
	},
}
