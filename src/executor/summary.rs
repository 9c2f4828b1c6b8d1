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

//! Grouping of identical results into a compact report.
//!
//! Targets whose output (or error) text is byte-for-byte identical end up in
//! one [`SummaryGroup`], which is printed once together with the list of
//! hosts that produced it.

use std::collections::HashMap;
use std::fmt::Write;

use super::coordinator::RunContext;
use crate::ui::OutputFormatter;

const RULE: &str = "-----------------------------------------------";
const BEGIN: &str = "---- BEGIN -----------------------------------";
const END: &str = "---- END --------------------------------------";

/// How finished results are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportMode {
    /// Host names are substituted and identical texts share one block
    #[default]
    Summarized,
    /// Texts are reported as produced, one block per target
    Verbatim,
}

impl ReportMode {
    pub fn from_verbatim(verbatim: bool) -> Self {
        if verbatim {
            ReportMode::Verbatim
        } else {
            ReportMode::Summarized
        }
    }

    /// Whether each target's host is replaced in its own texts.
    pub fn substitutes_host(self) -> bool {
        self == ReportMode::Summarized
    }
}

/// One distinct text and the targets (by index) that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryGroup {
    pub text: String,
    pub members: Vec<usize>,
}

/// Partition of target indices by identical text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    groups: Vec<SummaryGroup>,
}

impl Summary {
    /// Group `entries` by exact text equality.
    ///
    /// Members of a group are sorted and groups are ordered by their lowest
    /// member, so the same input always gives the same report.
    pub fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let mut by_text: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (index, text) in entries {
            by_text.entry(text).or_default().push(index);
        }

        let mut groups: Vec<SummaryGroup> = by_text
            .into_iter()
            .map(|(text, mut members)| {
                members.sort_unstable();
                members.dedup();
                SummaryGroup {
                    text: text.to_string(),
                    members,
                }
            })
            .collect();
        groups.sort_by_key(|group| group.members[0]);

        Self { groups }
    }

    /// Like [`Summary::build`], leaving out entries with empty text.
    pub fn build_skipping_empty<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        Self::build(entries.into_iter().filter(|(_, text)| !text.is_empty()))
    }

    pub fn groups(&self) -> &[SummaryGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Render every group as a block, followed by a closing rule.
    ///
    /// `hosts` maps target indices to the names listed under each block.
    pub fn render(&self, heading: &str, hosts: &[&str], mode: ReportMode) -> String {
        let blocks: Vec<(&str, Vec<usize>)> = match mode {
            ReportMode::Summarized => self
                .groups
                .iter()
                .map(|group| (group.text.as_str(), group.members.clone()))
                .collect(),
            ReportMode::Verbatim => self
                .groups
                .iter()
                .flat_map(|group| {
                    group
                        .members
                        .iter()
                        .map(move |&member| (group.text.as_str(), vec![member]))
                })
                .collect(),
        };

        let total = blocks.len();
        let mut out = String::new();
        for (position, (text, members)) in blocks.iter().enumerate() {
            let names: Vec<&str> = members
                .iter()
                .map(|&i| hosts.get(i).copied().unwrap_or("?"))
                .collect();

            let _ = writeln!(out, "{RULE}");
            let _ = writeln!(out, "-- {heading} {} / {total} :", position + 1);
            let _ = writeln!(out, "{BEGIN}");
            out.push_str(text);
            if !text.is_empty() && !text.ends_with('\n') {
                out.push('\n');
            }
            let _ = writeln!(out, "{END}");
            let _ = writeln!(out, "For targets:");
            let _ = writeln!(out, "{}", names.join(" "));
        }
        let _ = writeln!(out, "{RULE}");
        out
    }
}

/// Output and error summaries over the finished targets of a run.
#[derive(Debug, Clone)]
pub struct Report {
    outputs: Summary,
    errors: Summary,
    hosts: Vec<String>,
}

impl Report {
    /// Summarize the targets of `ctx` that are done; unfinished ones are left out.
    pub fn from_context(ctx: &RunContext) -> Self {
        Self {
            outputs: Summary::build(ctx.finished_outputs()),
            errors: Summary::build_skipping_empty(ctx.finished_errors()),
            hosts: ctx.hosts().into_iter().map(str::to_string).collect(),
        }
    }

    pub fn outputs(&self) -> &Summary {
        &self.outputs
    }

    pub fn errors(&self) -> &Summary {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render the whole report.
    ///
    /// A `partial` report covers an aborted run and uses distinct headings.
    pub fn render(&self, mode: ReportMode, partial: bool, formatter: &OutputFormatter) -> String {
        let hosts: Vec<&str> = self.hosts.iter().map(String::as_str).collect();
        let (output_heading, error_heading) = if partial {
            ("Partial Output", "Partial ERROR")
        } else {
            ("Output", "ERROR")
        };

        let mut out = self.outputs.render(output_heading, &hosts, mode);
        if self.has_errors() {
            let _ = writeln!(out, "{}", formatter.errors_header());
            out.push_str(&self.errors.render(error_heading, &hosts, mode));
        }
        out
    }
}
