//! Child process execution.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::trace;

use crate::error::{CompileError, Result};

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
	/// Exit code, `None` when terminated by a signal.
	pub status: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl ExecOutput {
	pub fn success(&self) -> bool {
		self.status == Some(0)
	}

	/// Combined stderr and stdout, as a compiler diagnostic.
	pub fn diagnostics(&self) -> String {
		match (self.stderr.trim_end(), self.stdout.trim_end()) {
			("", out) => out.to_owned(),
			(err, "") => err.to_owned(),
			(err, out) => format!("{err}\n{out}"),
		}
	}
}

/// Runs `program` to completion, feeding it `stdin` when given.
pub async fn execute(
	program: &Path,
	args: &[String],
	env: &BTreeMap<String, String>,
	stdin: Option<&str>,
) -> Result<ExecOutput> {
	trace!(program = %program.display(), ?args, "compiler.exec.spawn");

	let mut child = Command::new(program)
		.args(args)
		.envs(env)
		.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true)
		.spawn()
		.map_err(|error| CompileError::Spawn {
			exe: program.to_path_buf(),
			error,
		})?;

	let input = child.stdin.take();
	let feed = async move {
		if let (Some(mut pipe), Some(text)) = (input, stdin) {
			// A child that exits early closes the pipe; its exit status reports that.
			let _ = pipe.write_all(text.as_bytes()).await;
			let _ = pipe.shutdown().await;
		}
	};

	let ((), output) = tokio::join!(feed, child.wait_with_output());
	let output = output.map_err(|error| CompileError::Spawn {
		exe: program.to_path_buf(),
		error,
	})?;

	Ok(ExecOutput {
		status: output.status.code(),
		stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
		stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
	})
}
