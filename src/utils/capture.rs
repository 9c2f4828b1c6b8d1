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

//! Local capture store for raw per-target output.
//!
//! All capture files live in one temporary directory that is removed in a
//! single step once the run is over.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use thiserror::Error;

use super::sanitize::sanitize_file_component;
use crate::target::Target;

pub const CAPTURE_DIR_PREFIX: &str = "__sshtool_temp_";

#[derive(Debug, Error)]
#[error("failed to create capture file '{}': {source}", .path.display())]
pub struct CaptureFileError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Temporary directory holding one capture file per target.
#[derive(Debug)]
pub struct CaptureStore {
    dir: TempDir,
}

impl CaptureStore {
    pub fn create_in(parent: impl AsRef<Path>) -> io::Result<Self> {
        let dir = Builder::new().prefix(CAPTURE_DIR_PREFIX).tempdir_in(parent)?;
        tracing::debug!("Capture directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create the capture file of every target, in target order.
    pub async fn create_sinks(
        &self,
        targets: &[Target],
    ) -> Result<Vec<tokio::fs::File>, CaptureFileError> {
        let mut sinks = Vec::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            let path = self.path().join(sink_file_name(index, target));
            let file = tokio::fs::File::create(&path)
                .await
                .map_err(|source| CaptureFileError {
                    path: path.clone(),
                    source,
                })?;
            sinks.push(file);
        }
        Ok(sinks)
    }

    /// Remove the directory and everything in it.
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!("Removed capture directory {}", path.display());
        Ok(())
    }
}

/// `channel_<index>_<host>`.
pub fn sink_file_name(index: usize, target: &Target) -> String {
    format!("channel_{index}_{}", sanitize_file_component(&target.host))
}
