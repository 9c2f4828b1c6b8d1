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

//! Target list loading
//!
//! A target source is either a path to a targets file or an inline,
//! comma-separated list. The built-in default source must be an existing
//! file:
//!
//! ```rust
//! use sshtool::targets::parse_inline;
//!
//! let targets = parse_inline("as1-11,as1-12:2200").unwrap();
//! assert_eq!(targets.len(), 2);
//! assert_eq!(targets[1].port, 2200);
//! ```

mod error;
mod parser;

pub use error::TargetListError;
pub use parser::{parse_host_directives, parse_records, uses_host_directives};

use std::fmt;
use std::path::Path;

use crate::config::{expand_tilde, DEFAULT_TARGETS_PATH};
use crate::target::Target;

/// Where the target list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// The built-in targets file, used when nothing else names a source.
    /// Unlike a given source it is never read as an inline list.
    DefaultFile(String),
    /// A targets file path or an inline list from `-t` or the configuration
    Given(String),
}

impl TargetSource {
    pub fn default_file() -> Self {
        TargetSource::DefaultFile(DEFAULT_TARGETS_PATH.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            TargetSource::DefaultFile(source) | TargetSource::Given(source) => source,
        }
    }

    pub async fn load(&self) -> Result<Vec<Target>, TargetListError> {
        if let TargetSource::DefaultFile(path) = self {
            if !expand_tilde(Path::new(path)).is_file() {
                return Err(TargetListError::MissingDefaultFile { path: path.clone() });
            }
        }
        load_targets(self.as_str()).await
    }
}

impl fmt::Display for TargetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load targets from `source`, reading it as a file if such a file exists.
pub async fn load_targets(source: &str) -> Result<Vec<Target>, TargetListError> {
    let path = expand_tilde(Path::new(source));

    let targets = if path.is_file() {
        tracing::info!("Loading targets from file {}", path.display());
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            TargetListError::FileReadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        parse_file_content(&content)?
    } else {
        tracing::info!("Loading targets from list '{}'", source);
        parse_inline(source)?
    };

    if targets.is_empty() {
        return Err(TargetListError::Empty {
            source_name: source.to_string(),
        });
    }

    tracing::debug!("Loaded {} targets", targets.len());
    Ok(targets)
}

/// Parse an inline comma-separated target list.
pub fn parse_inline(list: &str) -> Result<Vec<Target>, TargetListError> {
    let records: Vec<&str> = list.split(',').collect();
    parse_records(&records)
}

/// Parse the content of a targets file in either supported shape.
pub fn parse_file_content(content: &str) -> Result<Vec<Target>, TargetListError> {
    let lines: Vec<&str> = content.lines().collect();
    if uses_host_directives(&lines) {
        Ok(parse_host_directives(&lines))
    } else {
        parse_records(&lines)
    }
}
