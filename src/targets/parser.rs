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

//! Parsers for the two target list shapes
//!
//! - Plain records: one `host`, `host port` or `host:port` record per line
//!   (or per comma-separated item for inline lists). Blank lines and lines
//!   starting with `#` are skipped.
//! - Transport-config style: `Host <name> [<name>...]` directives as found in
//!   an ssh client configuration. Every other line is ignored.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::TargetListError;
use crate::target::Target;

static HOST_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?i:host)\s+(.*)$").expect("host directive pattern is valid"));

/// Check whether the given content uses `Host` directives.
pub fn uses_host_directives<S: AsRef<str>>(lines: &[S]) -> bool {
    lines
        .iter()
        .any(|line| HOST_DIRECTIVE.is_match(line.as_ref()))
}

/// Parse plain target records.
///
/// Fields are separated by runs of whitespace or colons. Line numbers in
/// errors are 1-based positions in `records`.
pub fn parse_records<S: AsRef<str>>(records: &[S]) -> Result<Vec<Target>, TargetListError> {
    let mut targets = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let line = idx + 1;
        let record = record.as_ref();
        let trimmed = record.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed
            .split(|c: char| c.is_whitespace() || c == ':')
            .filter(|field| !field.is_empty())
            .collect();

        match fields.as_slice() {
            [host] => targets.push(Target::new(*host)),
            [host, port] => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| TargetListError::InvalidPort {
                        line,
                        value: port.to_string(),
                    })?;
                targets.push(Target::with_port(*host, port));
            }
            _ => {
                return Err(TargetListError::MalformedRecord {
                    line,
                    fields: fields.len(),
                    record: record.to_string(),
                })
            }
        }
    }

    Ok(targets)
}

/// Parse `Host` directives, one target per concrete name.
///
/// Wildcard and negated patterns (`*`, `?`, `!`) describe host groups rather
/// than hosts and are skipped.
pub fn parse_host_directives<S: AsRef<str>>(lines: &[S]) -> Vec<Target> {
    lines
        .iter()
        .filter_map(|line| HOST_DIRECTIVE.captures(line.as_ref()))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .flat_map(|names| {
            names
                .split_whitespace()
                .filter(|name| !name.contains(['*', '?', '!']))
                .map(Target::new)
                .collect::<Vec<_>>()
        })
        .collect()
}
