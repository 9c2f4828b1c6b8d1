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

//! Run state and the fan-out over all targets.
//!
//! [`RunContext`] holds one [`TargetSlot`] per target. A slot's texts are
//! published exactly once, by the task that drained that target, and only
//! then does the slot report [`TargetPhase::Done`]. Readers such as the
//! interrupt handler and the summarizer only look at done slots.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::remote::{ExecutionChannels, RemoteExecutor, TARGET_ENV_VAR};
use super::request::RunPlan;
use super::summary::ReportMode;
use crate::target::Target;
use crate::ui::OutputFormatter;

/// Per-target lifecycle: `Pending -> Started -> Draining -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TargetPhase {
    Pending = 0,
    Started = 1,
    Draining = 2,
    Done = 3,
}

impl TargetPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => TargetPhase::Started,
            2 => TargetPhase::Draining,
            3 => TargetPhase::Done,
            _ => TargetPhase::Pending,
        }
    }
}

#[derive(Debug)]
pub struct TargetSlot {
    target: Target,
    phase: AtomicU8,
    output: OnceLock<String>,
    error: OnceLock<String>,
}

impl TargetSlot {
    fn new(target: Target) -> Self {
        Self {
            target,
            phase: AtomicU8::new(TargetPhase::Pending as u8),
            output: OnceLock::new(),
            error: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn phase(&self) -> TargetPhase {
        TargetPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_done(&self) -> bool {
        self.phase() == TargetPhase::Done
    }

    /// Output text, once the target is done.
    pub fn output(&self) -> Option<&str> {
        if self.is_done() {
            self.output.get().map(String::as_str)
        } else {
            None
        }
    }

    /// Error text (possibly empty), once the target is done.
    pub fn error(&self) -> Option<&str> {
        if self.is_done() {
            self.error.get().map(String::as_str)
        } else {
            None
        }
    }
}

/// Shared state of one run over an ordered set of targets.
#[derive(Debug)]
pub struct RunContext {
    slots: Vec<TargetSlot>,
}

impl RunContext {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            slots: targets.into_iter().map(TargetSlot::new).collect(),
        }
    }

    pub fn slots(&self) -> &[TargetSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&TargetSlot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn hosts(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.target.host.as_str()).collect()
    }

    /// Indices of targets that are not done yet.
    pub fn pending(&self) -> Vec<usize> {
        self.indices_where(|slot| !slot.is_done())
    }

    /// Indices of targets that are done.
    pub fn finished(&self) -> Vec<usize> {
        self.indices_where(TargetSlot::is_done)
    }

    pub fn finished_outputs(&self) -> Vec<(usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.output().map(|text| (i, text)))
            .collect()
    }

    pub fn finished_errors(&self) -> Vec<(usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.error().map(|text| (i, text)))
            .collect()
    }

    /// Publish the final texts of target `index` and mark it done.
    ///
    /// Returns false (and changes nothing) if the target was already
    /// completed or does not exist.
    pub fn complete(&self, index: usize, output: String, error: String) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        if slot.output.set(output).is_err() {
            return false;
        }
        let _ = slot.error.set(error);
        slot.phase.store(TargetPhase::Done as u8, Ordering::Release);
        tracing::debug!("{}: done", slot.target);
        true
    }

    fn mark(&self, index: usize, phase: TargetPhase) {
        if let Some(slot) = self.slots.get(index) {
            tracing::debug!("{}: {:?}", slot.target, phase);
            slot.phase.store(phase as u8, Ordering::Release);
        }
    }

    fn indices_where(&self, predicate: impl Fn(&TargetSlot) -> bool) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| predicate(slot))
            .map(|(i, _)| i)
            .collect()
    }
}

/// How a run over all targets ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every target reported completion
    Completed,
    /// The cancellation token fired first
    Cancelled,
}

/// Starts the plan on every target and waits for all of them.
pub struct Coordinator {
    executor: RemoteExecutor,
    plan: Arc<RunPlan>,
    mode: ReportMode,
    formatter: OutputFormatter,
}

impl Coordinator {
    pub fn new(
        executor: RemoteExecutor,
        plan: RunPlan,
        mode: ReportMode,
        formatter: OutputFormatter,
    ) -> Self {
        Self {
            executor,
            plan: Arc::new(plan),
            mode,
            formatter,
        }
    }

    /// Run the plan against every target of `ctx`.
    ///
    /// `sinks[i]` receives the raw output of target `i`. Returns once every
    /// target is done, or as soon as `cancel` fires; started remote commands
    /// are not killed on cancellation.
    pub async fn run<W>(
        &self,
        ctx: Arc<RunContext>,
        sinks: Vec<W>,
        cancel: CancellationToken,
    ) -> RunStatus
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let total = ctx.len();
        debug_assert_eq!(sinks.len(), total);
        println!("{}", self.formatter.start_line(total));

        let (done_tx, mut done_rx) = mpsc::channel::<usize>(total.max(1));
        let started = Arc::new(AtomicUsize::new(0));

        for (index, sink) in sinks.into_iter().enumerate().take(total) {
            let job = TargetJob {
                index,
                total,
                ctx: Arc::clone(&ctx),
                executor: self.executor.clone(),
                plan: Arc::clone(&self.plan),
                substitute: self.mode.substitutes_host(),
                formatter: self.formatter,
                started: Arc::clone(&started),
            };
            let ctx = Arc::clone(&ctx);
            let done_tx = done_tx.clone();

            tokio::spawn(async move {
                let handle = tokio::spawn(job.drive(sink));
                if let Err(e) = handle.await {
                    tracing::error!("Task for target {} failed: {}", index, e);
                    ctx.complete(index, String::new(), format!("Task execution failed: {e}\n"));
                }
                let _ = done_tx.send(index).await;
            });
        }
        drop(done_tx);

        let mut finished = 0;
        while finished < total {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Run cancelled with {} of {} targets done", finished, total);
                    return RunStatus::Cancelled;
                }
                received = done_rx.recv() => {
                    let Some(index) = received else { break };
                    finished += 1;
                    let host = ctx.slot(index).map(|s| s.target().host.as_str()).unwrap_or("?");
                    println!("{}", self.formatter.done_line(finished, total, host));
                }
            }
        }

        RunStatus::Completed
    }
}

/// Everything one target's task needs.
struct TargetJob {
    index: usize,
    total: usize,
    ctx: Arc<RunContext>,
    executor: RemoteExecutor,
    plan: Arc<RunPlan>,
    substitute: bool,
    formatter: OutputFormatter,
    started: Arc<AtomicUsize>,
}

impl TargetJob {
    async fn drive<W: AsyncWrite + Unpin>(self, mut sink: W) {
        let Some(target) = self.ctx.slot(self.index).map(|s| s.target().clone()) else {
            return;
        };
        self.ctx.mark(self.index, TargetPhase::Started);

        let launched = self.executor.launch(&target, &self.plan).await;
        let k = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        println!("{}", self.formatter.started_line(k, self.total));

        let (output, error) = match launched {
            Ok(channels) => {
                self.ctx.mark(self.index, TargetPhase::Draining);
                drain(channels, &mut sink).await
            }
            Err(e) => {
                tracing::debug!("{}: launch failed: {}", target, e);
                (String::new(), format!("{e}\n"))
            }
        };

        let (output, error) = if self.substitute {
            (
                substitute_host(&output, &target.host),
                substitute_host(&error, &target.host),
            )
        } else {
            (output, error)
        };

        self.ctx.complete(self.index, output, error);
    }
}

/// Drain both channels of one target concurrently.
///
/// Every output chunk is mirrored to `sink`. A failed write is noted in the
/// returned output text and draining continues. Each error becomes one line
/// of the returned error text.
pub async fn drain<W>(channels: ExecutionChannels, sink: &mut W) -> (String, String)
where
    W: AsyncWrite + Unpin,
{
    let ExecutionChannels {
        mut output,
        mut errors,
    } = channels;

    let collect_output = async {
        let mut text = String::new();
        while let Some(chunk) = output.recv().await {
            text.push_str(&chunk);
            if let Err(e) = sink.write_all(chunk.as_bytes()).await {
                note_write_failure(&mut text, &e);
            }
        }
        if let Err(e) = sink.flush().await {
            note_write_failure(&mut text, &e);
        }
        text
    };

    let collect_errors = async {
        let mut text = String::new();
        while let Some(e) = errors.recv().await {
            text.push_str(&e.to_string());
            text.push('\n');
        }
        text
    };

    tokio::join!(collect_output, collect_errors)
}

fn note_write_failure(text: &mut String, e: &std::io::Error) {
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&format!("SSHTOOL: ERROR writing to capture file: {e}\n"));
}

/// Replace every occurrence of `host` with a reference to the remote
/// target variable.
pub fn substitute_host(text: &str, host: &str) -> String {
    if host.is_empty() {
        return text.to_string();
    }
    text.replace(host, &format!("\"${TARGET_ENV_VAR}\""))
}
