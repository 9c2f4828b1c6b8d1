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

//! Fake `ssh` and `scp` executables for driving the real executor locally.
//!
//! The fake ssh logs its arguments and runs the last one (the remote command
//! line) with `/bin/sh`. The fake scp logs its arguments and copies the
//! source to the destination with the `host:` prefix stripped.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sshtool::executor::{Confirm, RemoteExecutor, TransportConfig};
use sshtool::ui::OutputFormatter;
use tempfile::TempDir;

const FAKE_SSH: &str = r#"#!/bin/sh
echo "$@" >> "__LOG__"
for last; do :; done
exec /bin/sh -c "$last"
"#;

const FAKE_SCP: &str = r#"#!/bin/sh
echo "$@" >> "__LOG__"
n=$#
eval "src=\${$((n - 1))}"
eval "dst=\${$n}"
cp -r "$src" "${dst#*:}"
"#;

pub struct FakeTransport {
    dir: TempDir,
    pub ssh: PathBuf,
    pub scp: PathBuf,
    pub ssh_log: PathBuf,
    pub scp_log: PathBuf,
}

impl FakeTransport {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ssh_log = dir.path().join("ssh.log");
        let scp_log = dir.path().join("scp.log");
        let ssh = write_executable(dir.path(), "ssh", &FAKE_SSH.replace("__LOG__", ssh_log.to_str().unwrap()));
        let scp = write_executable(dir.path(), "scp", &FAKE_SCP.replace("__LOG__", scp_log.to_str().unwrap()));
        Self {
            dir,
            ssh,
            scp,
            ssh_log,
            scp_log,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            ssh_command: self.ssh.display().to_string(),
            scp_command: self.scp.display().to_string(),
            options: Vec::new(),
            profile: None,
        }
    }

    pub fn executor(&self) -> RemoteExecutor {
        RemoteExecutor::new(self.transport())
    }

    pub fn ssh_calls(&self) -> Vec<String> {
        read_lines(&self.ssh_log)
    }

    pub fn scp_calls(&self) -> Vec<String> {
        read_lines(&self.scp_log)
    }
}

fn write_executable(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn plain() -> OutputFormatter {
    OutputFormatter::new(false)
}

/// Always gives the same answer and counts how often it was asked.
pub struct FixedConfirm {
    pub answer: bool,
    pub asked: std::sync::atomic::AtomicUsize,
}

impl FixedConfirm {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: std::sync::atomic::AtomicUsize::new(0),
        })
    }
}

impl Confirm for FixedConfirm {
    fn confirm(&self, _question: &str) -> bool {
        self.asked.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.answer
    }
}
