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

//! The unit of work applied to every target.

use std::path::PathBuf;

use super::remote::SAFE_REMOTE_DIR;

/// A single remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A shell command line run as-is on the target
    Command(String),
    /// A local script staged to the target and run with `args`
    Script { path: PathBuf, args: Vec<String> },
    /// A copy-only operation
    Copy(CopySpec),
}

/// Local source and remote destination of a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    pub source: PathBuf,
    pub destination: String,
}

impl CopySpec {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// Copy `source` to `/tmp/<basename>`.
    pub fn to_safe_dir(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let basename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = format!("{SAFE_REMOTE_DIR}{basename}");
        Self {
            source,
            destination,
        }
    }

    pub fn source_display(&self) -> String {
        self.source.display().to_string()
    }
}

/// Everything done on one target during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Copy performed before `request`; a failure skips `request`
    pub copy_first: Option<CopySpec>,
    pub request: Request,
}

impl RunPlan {
    pub fn new(request: Request) -> Self {
        Self {
            copy_first: None,
            request,
        }
    }

    pub fn with_copy_first(mut self, copy: CopySpec) -> Self {
        self.copy_first = Some(copy);
        self
    }
}

/// Snippet sourcing `profile` when it exists, or nothing.
pub fn profile_prefix(profile: Option<&str>) -> String {
    match profile {
        Some(profile) if !profile.is_empty() => format!("[ -f {profile} ] && . {profile};"),
        _ => String::new(),
    }
}

/// Join trailing command words into one remote command line.
pub fn join_commands(words: &[String]) -> String {
    words.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_to_safe_dir_uses_basename() {
        let copy = CopySpec::to_safe_dir("/home/user/build/artifacts");
        assert_eq!(copy.destination, "/tmp/artifacts");
        assert_eq!(copy.source_display(), "/home/user/build/artifacts");

        let copy = CopySpec::to_safe_dir("config.tar.gz");
        assert_eq!(copy.destination, "/tmp/config.tar.gz");
    }

    #[test]
    fn test_profile_prefix() {
        assert_eq!(
            profile_prefix(Some("~/.profile")),
            "[ -f ~/.profile ] && . ~/.profile;"
        );
        assert_eq!(profile_prefix(Some("")), "");
        assert_eq!(profile_prefix(None), "");
    }

    #[test]
    fn test_join_commands() {
        let words = vec!["uptime".to_string(), "df -h /".to_string()];
        assert_eq!(join_commands(&words), "uptime;df -h /");
        assert_eq!(join_commands(&[]), "");
    }

    #[test]
    fn test_run_plan_builder() {
        let plan = RunPlan::new(Request::Script {
            path: PathBuf::from("setup.sh"),
            args: vec!["--fast".to_string()],
        })
        .with_copy_first(CopySpec::to_safe_dir("data"));

        match &plan.request {
            Request::Script { path, args } => {
                assert_eq!(path, &PathBuf::from("setup.sh"));
                assert_eq!(args, &vec!["--fast".to_string()]);
            }
            other => panic!("unexpected request {other:?}"),
        }
        assert_eq!(plan.copy_first.unwrap().destination, "/tmp/data");
    }
}
