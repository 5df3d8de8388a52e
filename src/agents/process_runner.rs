use crate::error::{DnupError, Result};
use crate::utils::args::tokenize;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

/// Minimal capability for executing an external program.
///
/// The contract is a single pass/fail outcome per run; callers never inspect
/// output beyond that. Tests substitute a recording implementation.
pub trait ProcessRunner {
    fn run(
        &self,
        working_dir: &Path,
        program: &str,
        args: &str,
        capture_output: bool,
    ) -> Result<()>;
}

/// ExternalProcessRunner executes commands with live output streaming
pub struct ExternalProcessRunner;

impl ProcessRunner for ExternalProcessRunner {
    fn run(
        &self,
        working_dir: &Path,
        program: &str,
        args: &str,
        capture_output: bool,
    ) -> Result<()> {
        println!("Executing: {} {}", program, args);

        let argv = tokenize(args);

        let mut command = Command::new(program);
        command.current_dir(working_dir).args(&argv);

        if capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = command
            .spawn()
            .map_err(|e| DnupError::ProcessExecution(format!("Failed to spawn process: {}", e)))?;

        // Stream stdout
        if capture_output {
            if let Some(stdout) = child.stdout.take() {
                let reader = BufReader::new(stdout);
                for line in reader.lines() {
                    if let Ok(line) = line {
                        println!("{}", line);
                    }
                }
            }
        }

        // Wait for completion
        let status = child
            .wait()
            .map_err(|e| DnupError::ProcessExecution(format!("Failed to wait for process: {}", e)))?;

        if !status.success() {
            return Err(DnupError::ProcessExecution(format!(
                "{} exited with code: {}",
                program,
                status.code().unwrap_or(-1)
            )));
        }

        Ok(())
    }
}
