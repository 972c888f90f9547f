use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::contract::{ProcessOutput, ProcessRunner, ToolInvocation};
use crate::error::RunError;

/// Runs tools with `tokio::process`, capturing both output streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: ToolInvocation) -> Result<ProcessOutput, RunError> {
        debug!(program = %invocation.program, args = invocation.args.len(), "Spawning process");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    error!(program = %invocation.program, "Executable not found");
                    RunError::NotFound {
                        program: invocation.program.clone(),
                    }
                } else {
                    error!(error = ?source, program = %invocation.program, "Failed to launch process");
                    RunError::Io {
                        program: invocation.program.clone(),
                        source,
                    }
                }
            })?;

        let result = ProcessOutput {
            status_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(program = %invocation.program, status = ?result.status_code, "Process exited");
        Ok(result)
    }
}
