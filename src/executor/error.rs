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

//! Per-target execution errors.
//!
//! Every variant is isolated to the target it was raised for; the
//! coordinator renders it into that target's error record.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The transport executable could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading one of the subprocess output streams failed
    #[error("error reading remote output: {0}")]
    Read(#[source] io::Error),

    /// Waiting for the subprocess to exit failed
    #[error("error waiting for remote process: {0}")]
    Wait(#[source] io::Error),

    /// The remote command (or the transport itself) exited unsuccessfully
    #[error("remote command failed: {0}")]
    NonZeroExit(ExitStatus),

    /// A copy destination outside the safe remote directory
    #[error(
        "SSHTOOL internal: cowardly refusing to remove and copy to anywhere but {safe_dir} (requested '{destination}')"
    )]
    UnsafeDestination {
        destination: String,
        safe_dir: &'static str,
    },

    /// Removing the previous copy destination failed
    #[error("failed to remove existing '{destination}' before copying: {reason}")]
    RemoveFailed { destination: String, reason: String },

    /// The remote-copy transport reported a failure
    #[error("failed to copy '{source_path}' to '{destination}': {reason}")]
    CopyFailed {
        source_path: String,
        destination: String,
        reason: String,
    },
}

impl ExecError {
    /// True for the refusal raised before anything is sent to the target.
    pub fn is_unsafe_destination(&self) -> bool {
        matches!(self, ExecError::UnsafeDestination { .. })
    }
}
