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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
}

/// Global default settings.
///
/// Every field is optional; command-line flags take precedence.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Defaults {
    /// Target source used when `-t` is not given (file path or inline list).
    pub targets: Option<String>,
    /// Remote-shell transport executable.
    pub ssh_command: Option<String>,
    /// Remote-copy transport executable.
    pub scp_command: Option<String>,
    /// Transport options, each passed as `-o <value>`.
    #[serde(default)]
    pub ssh_options: Vec<String>,
    /// Identity file passed to both transports with `-i`.
    pub identity_file: Option<String>,
    /// Remote profile sourced before commands and scripts.
    /// An empty string disables profile sourcing.
    pub profile: Option<String>,
    /// Replace each target's host name in its output with `"$SSHTOOL_TARGET"`
    /// before grouping. Defaults to true.
    pub replace_target_in_summary: Option<bool>,
}
