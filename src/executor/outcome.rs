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

//! Run outcomes and their process exit codes.

use std::fmt;

/// Which part of the local capture store could not be set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    TempDir,
    CaptureFile,
}

/// Final result of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every target finished without error text
    Success,
    /// At least one target reported errors
    PartialFailure,
    /// Invalid input detected before any target started
    ConfigError,
    SetupError(SetupStage),
    /// The capture directory could not be removed
    CleanupError,
    /// The operator confirmed an abort
    Aborted,
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::PartialFailure => 1,
            RunOutcome::ConfigError => 1,
            RunOutcome::SetupError(SetupStage::TempDir) => 10,
            RunOutcome::CleanupError => 20,
            RunOutcome::SetupError(SetupStage::CaptureFile) => 30,
            RunOutcome::Aborted => 100,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunOutcome::Success => "success",
            RunOutcome::PartialFailure => "one or more targets reported errors",
            RunOutcome::ConfigError => "configuration error",
            RunOutcome::SetupError(SetupStage::TempDir) => "failed to create capture directory",
            RunOutcome::SetupError(SetupStage::CaptureFile) => "failed to create capture file",
            RunOutcome::CleanupError => "failed to remove capture directory",
            RunOutcome::Aborted => "aborted by user",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Success.exit_code(), 0);
        assert_eq!(RunOutcome::PartialFailure.exit_code(), 1);
        assert_eq!(RunOutcome::ConfigError.exit_code(), 1);
        assert_eq!(RunOutcome::SetupError(SetupStage::TempDir).exit_code(), 10);
        assert_eq!(RunOutcome::CleanupError.exit_code(), 20);
        assert_eq!(
            RunOutcome::SetupError(SetupStage::CaptureFile).exit_code(),
            30
        );
        assert_eq!(RunOutcome::Aborted.exit_code(), 100);
    }
}
