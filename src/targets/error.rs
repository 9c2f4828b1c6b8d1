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

//! Error types for target list loading

use thiserror::Error;

/// Errors that can occur while loading a target list.
///
/// All of these are configuration errors: they are raised before any
/// target is contacted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetListError {
    /// A record with a field count other than one (host) or two (host, port)
    #[error(
        "error parsing the targets at line {line}: expected host or host:port but encountered {fields} fields instead: {record}"
    )]
    MalformedRecord {
        line: usize,
        fields: usize,
        record: String,
    },

    /// The port field of a two-field record is not a valid port number
    #[error("error parsing the targets at line {line}: invalid port '{value}'")]
    InvalidPort { line: usize, value: String },

    /// The targets file exists but could not be read
    #[error("failed to read targets file '{path}': {reason}")]
    FileReadError { path: String, reason: String },

    /// No target source was given and the default targets file does not exist
    #[error("no targets given and the default targets file '{path}' does not exist (use -t or set defaults.targets)")]
    MissingDefaultFile { path: String },

    /// The source yielded no targets at all
    #[error("no targets found in '{source_name}'")]
    Empty { source_name: String },
}
