//! Backend indexer process lifecycle.

use std::ffi::OsStr;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::transport::{PipeTransport, TransportParts};

/// A running indexer process speaking the pipe protocol over its stdio.
///
/// The child is killed when this handle is dropped.
pub struct BackendProcess {
	child: Child,
	program: String,
}

impl BackendProcess {
	/// Spawns `program` with `args` and wires a [`PipeTransport`] to its stdin/stdout.
	///
	/// Stderr is inherited so backend diagnostics end up next to ours.
	pub fn spawn<I, S>(program: &str, args: I) -> Result<(Self, TransportParts)>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		let mut child = Command::new(program)
			.args(args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::ProcessLaunch(format!("{program}: {e}")))?;

		let stdin = child
			.stdin
			.take()
			.ok_or_else(|| Error::ProcessLaunch(format!("{program}: stdin not captured")))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| Error::ProcessLaunch(format!("{program}: stdout not captured")))?;

		info!(target = "lv.backend", program, pid = ?child.id(), "backend started");

		let parts = PipeTransport::new(stdin, stdout);
		Ok((
			Self {
				child,
				program: program.to_string(),
			},
			parts,
		))
	}

	/// OS process id, or `None` once the child has been reaped.
	pub fn pid(&self) -> Option<u32> {
		self.child.id()
	}

	/// Returns `true` while the child has not exited.
	pub fn is_alive(&mut self) -> bool {
		match self.child.try_wait() {
			Ok(None) => true,
			Ok(Some(status)) => {
				debug!(target = "lv.backend", program = %self.program, %status, "backend exited");
				false
			}
			Err(e) => {
				warn!(target = "lv.backend", program = %self.program, error = %e, "failed to poll backend");
				false
			}
		}
	}

	/// Kills the child and waits for it to exit.
	pub async fn kill(&mut self) -> Result<()> {
		if !self.is_alive() {
			return Ok(());
		}
		self.child.kill().await?;
		info!(target = "lv.backend", program = %self.program, "backend killed");
		Ok(())
	}
}
