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

//! Resolution of command-line flags and configuration into run settings

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::{expand_tilde, Config};
use crate::executor::{
    join_commands, profile_prefix, CopySpec, ReportMode, Request, RunPlan, TransportConfig,
};
use crate::targets::TargetSource;
use crate::utils::sanitize_command;

/// Profile sourced on the targets unless configured otherwise.
pub const DEFAULT_PROFILE: &str = "~/.profile";

/// Everything a run needs besides the plan, after merging CLI and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub targets: TargetSource,
    pub transport: TransportConfig,
    pub mode: ReportMode,
}

impl Settings {
    /// Merge `cli` over `config`.
    ///
    /// Scalar values from the command line win; `-o` options are appended
    /// after the configured ones.
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        let defaults = &config.defaults;

        let targets = cli
            .targets
            .clone()
            .or_else(|| defaults.targets.clone())
            .map(TargetSource::Given)
            .unwrap_or_else(TargetSource::default_file);

        let mut options = Vec::new();
        for option in defaults.ssh_options.iter().chain(cli.options.iter()) {
            options.push("-o".to_string());
            options.push(option.clone());
        }

        let identity = cli
            .identity
            .clone()
            .or_else(|| defaults.identity_file.as_ref().map(PathBuf::from));
        if let Some(identity) = identity {
            options.push("-i".to_string());
            options.push(expand_tilde(&identity).display().to_string());
        }

        let profile = match defaults.profile.as_deref() {
            None => Some(DEFAULT_PROFILE.to_string()),
            Some("") => None,
            Some(profile) => Some(profile.to_string()),
        };

        let transport = TransportConfig {
            ssh_command: cli
                .ssh_command
                .clone()
                .or_else(|| defaults.ssh_command.clone())
                .unwrap_or_else(|| "ssh".to_string()),
            scp_command: cli
                .scp_command
                .clone()
                .or_else(|| defaults.scp_command.clone())
                .unwrap_or_else(|| "scp".to_string()),
            options,
            profile,
        };

        let replace = defaults.replace_target_in_summary.unwrap_or(true);
        let mode = ReportMode::from_verbatim(cli.verbatim || !replace);

        Self {
            targets,
            transport,
            mode,
        }
    }
}

/// Build the plan from the request flags.
///
/// A script (`-f`) takes the trailing arguments as its own; otherwise the
/// trailing arguments are commands. A copy (`-c`) runs before either, or is
/// the whole request when neither is given.
pub fn build_plan(cli: &Cli, profile: Option<&str>) -> Result<RunPlan> {
    let copy = match &cli.copy {
        Some(source) => {
            let source = expand_tilde(source);
            if !source.exists() {
                bail!("File or directory to copy not found: {}", source.display());
            }
            Some(CopySpec::to_safe_dir(source))
        }
        None => None,
    };

    let request = if let Some(script) = &cli.script {
        Request::Script {
            path: existing_script(script)?,
            args: cli.args.clone(),
        }
    } else if !cli.args.is_empty() {
        let command = format!("{}{}", profile_prefix(profile), join_commands(&cli.args));
        Request::Command(sanitize_command(&command)?)
    } else {
        return match copy {
            Some(copy) => Ok(RunPlan::new(Request::Copy(copy))),
            None => bail!(
                "Nothing to do: give a command, a script (-f) or a file or directory to copy (-c)"
            ),
        };
    };

    let plan = RunPlan::new(request);
    Ok(match copy {
        Some(copy) => plan.with_copy_first(copy),
        None => plan,
    })
}

fn existing_script(path: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path);
    if !expanded.is_file() {
        bail!("Script not found: {}", expanded.display());
    }
    Ok(expanded)
}
