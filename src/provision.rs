//! External provisioner invocation
//!
//! `create cluster` and `destroy cluster` hand off to user-configured
//! commands (typically a Terraform wrapper). Output is streamed line by line
//! into the debug log so `-vv` shows progress as it happens.

use crate::error::{ForgeError, ForgeResult};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Run `argv` inside `directory` and fail on a non-zero exit.
///
/// Returns the combined stdout and stderr lines. `env` is added to the
/// child's environment.
pub async fn run(argv: &[String], directory: &Path, env: &[(&str, String)]) -> ForgeResult<Vec<String>> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ForgeError::User("provisioner command is empty".to_string()))?;
    let command_line = argv.join(" ");

    info!("Running provisioner: {}", command_line);

    let mut child = Command::new(program)
        .args(args)
        .current_dir(directory)
        .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ForgeError::command_failed(command_line.clone(), e))?;

    let output = stream_child_output(&mut child, &|line| debug!("{}", line)).await?;

    let status = child
        .wait()
        .await
        .map_err(|e| ForgeError::command_failed(command_line.clone(), e))?;

    if !status.success() {
        return Err(ForgeError::ProvisionFailed {
            command: command_line,
            code: status.code().unwrap_or(-1),
        });
    }

    Ok(output)
}

/// Stream a child's stdout and stderr concurrently, passing each line to
/// `on_output` as it arrives.
async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: &(dyn Fn(String) + Send + Sync),
) -> ForgeResult<Vec<String>> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ForgeError::Internal("provisioner stderr not piped".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ForgeError::Internal("provisioner stdout not piped".to_string()))?;

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut all_output = Vec::new();
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        all_output.push(line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    Ok(all_output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn collects_both_streams() {
        let temp = TempDir::new().unwrap();
        let output = run(&sh("echo out; echo err >&2"), temp.path(), &[])
            .await
            .unwrap();

        assert_eq!(output.len(), 2);
        assert!(output.contains(&"out".to_string()));
        assert!(output.contains(&"err".to_string()));
    }

    #[tokio::test]
    async fn runs_in_directory_with_env() {
        let temp = TempDir::new().unwrap();
        run(
            &sh("echo \"$FORGE_CLUSTER\" > marker"),
            temp.path(),
            &[("FORGE_CLUSTER", "lab".to_string())],
        )
        .await
        .unwrap();

        let marker = std::fs::read_to_string(temp.path().join("marker")).unwrap();
        assert_eq!(marker.trim(), "lab");
    }

    #[tokio::test]
    async fn non_zero_exit_is_provision_failure() {
        let temp = TempDir::new().unwrap();
        let err = run(&sh("exit 3"), temp.path(), &[]).await.err().unwrap();

        match err {
            ForgeError::ProvisionFailed { command, code } => {
                assert_eq!(command, "sh -c exit 3");
                assert_eq!(code, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let temp = TempDir::new().unwrap();
        assert!(run(&[], temp.path(), &[]).await.is_err());
    }
}
