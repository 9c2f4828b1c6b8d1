// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Remote execution against a single target.
//!
//! Every operation goes through external transport executables (`ssh` and
//! `scp` by default). A running command is exposed as two channels: the
//! merged stdout/stderr text and the merged errors, where the process exit
//! status is the last possible error.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::mpsc;

use super::error::ExecError;
use super::merge::merge;
use super::naming::unique_remote_name;
use super::request::{profile_prefix, CopySpec, Request, RunPlan};
use super::stream::{collect_chunks, stream_to_channels};
use crate::target::Target;
use crate::utils::sanitize::{quote_double, quote_single};

/// The only remote directory copies may write to (and remove from).
pub const SAFE_REMOTE_DIR: &str = "/tmp/";

/// Environment variable holding the target host on the remote side.
pub const TARGET_ENV_VAR: &str = "SSHTOOL_TARGET";

const QUIET_OPTION: &str = "LogLevel=QUIET";

/// Transport executables and the options passed to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub ssh_command: String,
    pub scp_command: String,
    /// Raw arguments passed to both transports, e.g. `["-o", "ConnectTimeout=5"]`
    pub options: Vec<String>,
    /// Remote profile sourced before a staged script runs
    pub profile: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ssh_command: "ssh".to_string(),
            scp_command: "scp".to_string(),
            options: Vec::new(),
            profile: None,
        }
    }
}

/// Combined output and error channels of one remote operation.
#[derive(Debug)]
pub struct ExecutionChannels {
    pub output: mpsc::Receiver<String>,
    pub errors: mpsc::Receiver<ExecError>,
}

impl ExecutionChannels {
    /// Channels that are already closed, for operations without output.
    pub fn closed() -> Self {
        let (_, output) = mpsc::channel(1);
        let (_, errors) = mpsc::channel(1);
        Self { output, errors }
    }
}

/// Runs requests against targets through the configured transports.
#[derive(Debug, Clone, Default)]
pub struct RemoteExecutor {
    transport: Arc<TransportConfig>,
}

impl RemoteExecutor {
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Perform the whole plan for `target`.
    ///
    /// A failing copy step is returned as the error and the request is not
    /// started. A copy-only request yields closed channels on success.
    pub async fn launch(
        &self,
        target: &Target,
        plan: &RunPlan,
    ) -> Result<ExecutionChannels, ExecError> {
        if let Some(copy) = &plan.copy_first {
            self.copy_to(target, copy).await?;
        }

        match &plan.request {
            Request::Command(command) => self.execute(target, command),
            Request::Script { path, args } => self.run_script(target, path, args).await,
            Request::Copy(copy) => {
                self.copy_to(target, copy).await?;
                Ok(ExecutionChannels::closed())
            }
        }
    }

    /// Start `command` on `target`.
    ///
    /// Fails synchronously only when the transport cannot be started.
    pub fn execute(&self, target: &Target, command: &str) -> Result<ExecutionChannels, ExecError> {
        let remote_line = remote_command_line(target, command);
        let args = self.ssh_args(target, &remote_line);
        let program = &self.transport.ssh_command;

        tracing::info!("{}: {} {}", target, program, args.join(" "));

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| ExecError::Spawn {
            program: program.clone(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "stdout not captured"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ExecError::Spawn {
            program: program.clone(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "stderr not captured"),
        })?;

        let (stdout_data, stdout_errors) = stream_to_channels(stdout);
        let (stderr_data, stderr_errors) = stream_to_channels(stderr);

        let output = merge([stdout_data, stderr_data]);
        let read_errors = merge([stdout_errors, stderr_errors]);

        let (error_tx, error_rx) = mpsc::channel(1);
        let host = target.to_string();
        tokio::spawn(async move {
            let mut read_errors = read_errors;
            while let Some(e) = read_errors.recv().await {
                let _ = error_tx.send(ExecError::Read(e)).await;
            }

            // Both streams are at EOF (or failed); reap the process
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::debug!("{}: remote command finished", host);
                }
                Ok(status) => {
                    tracing::debug!("{}: remote command failed: {}", host, status);
                    let _ = error_tx.send(ExecError::NonZeroExit(status)).await;
                }
                Err(e) => {
                    let _ = error_tx.send(ExecError::Wait(e)).await;
                }
            }
        });

        Ok(ExecutionChannels {
            output,
            errors: error_rx,
        })
    }

    /// Stage the script at `path` in the safe remote directory and run it.
    ///
    /// The staged copy is removed on the same connection after it exits,
    /// and the script's exit status is preserved.
    pub async fn run_script(
        &self,
        target: &Target,
        path: &Path,
        args: &[String],
    ) -> Result<ExecutionChannels, ExecError> {
        let name = unique_remote_name(path);
        let staged = CopySpec::new(path, format!("{SAFE_REMOTE_DIR}{name}"));
        self.copy_to(target, &staged).await?;

        let command = script_command(&name, args, self.transport.profile.as_deref());
        self.execute(target, &command)
    }

    /// Copy a local file or directory to the target.
    ///
    /// Any existing object at the destination is removed first.
    pub async fn copy_to(&self, target: &Target, copy: &CopySpec) -> Result<(), ExecError> {
        check_safe_destination(&copy.destination)?;

        let remove = format!("rm -rf {}", quote_single(&copy.destination));
        self.run_to_completion(target, &remove)
            .await
            .map_err(|e| ExecError::RemoveFailed {
                destination: copy.destination.clone(),
                reason: e.to_string(),
            })?;

        let args = self.scp_args(target, copy);
        let program = &self.transport.scp_command;
        tracing::info!("{}: {} {}", target, program, args.join(" "));

        let output = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if stderr.trim().is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {}", output.status, stderr.trim_end())
            };
            return Err(ExecError::CopyFailed {
                source_path: copy.source_display(),
                destination: copy.destination.clone(),
                reason,
            });
        }

        tracing::debug!("{}: copied {} to {}", target, copy.source_display(), copy.destination);
        Ok(())
    }

    /// Run `command` and wait for it, returning its output text.
    ///
    /// The first error on the error channel becomes the result.
    pub async fn run_to_completion(&self, target: &Target, command: &str) -> Result<String, ExecError> {
        let ExecutionChannels { output, mut errors } = self.execute(target, command)?;

        let collect_errors = async move {
            let mut first = None;
            while let Some(e) = errors.recv().await {
                if first.is_none() {
                    first = Some(e);
                }
            }
            first
        };

        let (text, first_error) = tokio::join!(collect_chunks(output), collect_errors);
        match first_error {
            Some(e) => Err(e),
            None => Ok(text),
        }
    }

    /// Arguments for the shell transport, in invocation order.
    pub fn ssh_args(&self, target: &Target, remote_line: &str) -> Vec<String> {
        let mut args = vec!["-o".to_string(), QUIET_OPTION.to_string()];
        args.extend(self.transport.options.iter().cloned());
        args.push("-t".to_string());
        if let Some(port) = target.explicit_port() {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(target.host.clone());
        args.push(remote_line.to_string());
        args
    }

    /// Arguments for the copy transport, in invocation order.
    pub fn scp_args(&self, target: &Target, copy: &CopySpec) -> Vec<String> {
        let mut args = vec!["-r".to_string()];
        if let Some(port) = target.explicit_port() {
            args.push("-P".to_string());
            args.push(port.to_string());
        }
        args.extend(self.transport.options.iter().cloned());
        args.push(copy.source_display());
        args.push(format!("{}:{}", target.host, copy.destination));
        args
    }
}

/// Prefix `command` with the fixed remote environment.
pub fn remote_command_line(target: &Target, command: &str) -> String {
    format!(
        "export LC_ALL=C; export {TARGET_ENV_VAR}=\"{}\";{command}",
        target.host
    )
}

/// Remote command running a staged script and removing it afterwards.
pub fn script_command(name: &str, args: &[String], profile: Option<&str>) -> String {
    let quoted = quote_single(name);
    let mut invocation = quote_single(&format!("{SAFE_REMOTE_DIR}{name}"));
    for arg in args {
        invocation.push(' ');
        invocation.push_str(&quote_double(arg));
    }

    format!(
        "cd {SAFE_REMOTE_DIR};chmod +x {quoted};{}{invocation};EX=$?;rm -f {quoted};exit $EX",
        profile_prefix(profile)
    )
}

/// Refuse destinations outside the safe remote directory.
pub fn check_safe_destination(destination: &str) -> Result<(), ExecError> {
    let unsafe_destination = || ExecError::UnsafeDestination {
        destination: destination.to_string(),
        safe_dir: SAFE_REMOTE_DIR,
    };

    let Some(relative) = destination.strip_prefix(SAFE_REMOTE_DIR) else {
        return Err(unsafe_destination());
    };

    if relative.is_empty() || relative.split('/').any(|part| part == "..") {
        return Err(unsafe_destination());
    }

    Ok(())
}
