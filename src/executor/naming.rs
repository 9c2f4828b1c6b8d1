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

//! Unique names for staged remote scripts.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const REMOTE_NAME_PREFIX: &str = "__sshtool_";

/// Build `__sshtool_<token>_<basename>` for the script at `path`.
///
/// The token is a random UUID, or a nanosecond timestamp when no entropy
/// source is available.
pub fn unique_remote_name(path: &Path) -> String {
    let basename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    let token = random_token().unwrap_or_else(timestamp_token);

    let name = format!("{REMOTE_NAME_PREFIX}{token}_{basename}");
    tracing::debug!("Unique remote name for {}: {}", path.display(), name);
    name
}

/// Random hyphenated UUID token.
///
/// `Uuid::new_v4` panics if the OS entropy source fails, so that case is
/// caught and reported as `None`.
fn random_token() -> Option<String> {
    std::panic::catch_unwind(|| Uuid::new_v4().hyphenated().to_string()).ok()
}

fn timestamp_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    nanos.to_string()
}
