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

use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// Check if stdout is a TTY
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Check if colors should be enabled
///
/// Colors are enabled when:
/// - Output is a TTY
/// - NO_COLOR environment variable is not set
/// - TERM is not "dumb"
pub fn should_use_colors() -> bool {
    if !is_tty() {
        return false;
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

/// Progress lines and headers printed around the summary blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormatter {
    colors: bool,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::detect()
    }
}

impl OutputFormatter {
    pub fn new(colors: bool) -> Self {
        Self { colors }
    }

    /// Colors according to the terminal and environment.
    pub fn detect() -> Self {
        Self::new(should_use_colors())
    }

    pub fn colors(&self) -> bool {
        self.colors
    }

    pub fn start_line(&self, total: usize) -> String {
        let line = format!("Start ssh for {total} machines");
        if self.colors {
            line.bold().to_string()
        } else {
            line
        }
    }

    pub fn started_line(&self, started: usize, total: usize) -> String {
        let line = format!("Started {started} / {total}");
        if self.colors {
            line.dimmed().to_string()
        } else {
            line
        }
    }

    pub fn done_line(&self, done: usize, total: usize, host: &str) -> String {
        if self.colors {
            format!(
                "    {} {done} / {total}        Machine {}",
                "Done".green(),
                host.bold()
            )
        } else {
            format!("    Done {done} / {total}        Machine {host}")
        }
    }

    pub fn errors_header(&self) -> String {
        let line = "----------- ERRORS ---------------------------------------------------------";
        if self.colors {
            line.red().to_string()
        } else {
            line.to_string()
        }
    }

    /// Last line of a completed run.
    pub fn finish_line(&self, has_errors: bool) -> String {
        match (has_errors, self.colors) {
            (true, true) => "Finished with errors".red().bold().to_string(),
            (true, false) => "Finished with errors".to_string(),
            (false, true) => "End!".green().to_string(),
            (false, false) => "End!".to_string(),
        }
    }
}
