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

//! Interrupt handling during a run.
//!
//! On every interrupt the still-pending targets are listed and the operator
//! is asked whether to abort. Only a confirmed abort cancels the run; the
//! run loop then reports the targets finished so far.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::coordinator::RunContext;
use crate::target::Target;

pub const ABORT_QUESTION: &str = "Abort? (y/n) ";

/// Operator confirmation, asked from a blocking context.
pub trait Confirm: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Reads the answer from the process's standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        print!("{question}");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

/// Only an exact `y` confirms.
fn is_yes(answer: &str) -> bool {
    answer.trim_end_matches(['\n', '\r']) == "y"
}

/// What one interrupt found and decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptReport {
    pub pending: Vec<Target>,
    pub aborted: bool,
}

pub struct InterruptHandler {
    ctx: Arc<RunContext>,
    confirm: Arc<dyn Confirm>,
    cancel: CancellationToken,
}

impl InterruptHandler {
    pub fn new(ctx: Arc<RunContext>, confirm: Arc<dyn Confirm>, cancel: CancellationToken) -> Self {
        Self {
            ctx,
            confirm,
            cancel,
        }
    }

    /// Handle one interrupt: list pending targets, ask, cancel if confirmed.
    pub async fn handle(&self) -> InterruptReport {
        let pending: Vec<Target> = self
            .ctx
            .pending()
            .into_iter()
            .filter_map(|i| self.ctx.slot(i))
            .map(|slot| slot.target().clone())
            .collect();

        println!("\n{} pending jobs", pending.len());
        for target in &pending {
            println!("{}", target.host);
        }

        let confirm = Arc::clone(&self.confirm);
        let aborted = tokio::task::spawn_blocking(move || confirm.confirm(ABORT_QUESTION))
            .await
            .unwrap_or_else(|e| {
                warn!("Confirmation task failed: {}", e);
                false
            });

        if aborted {
            info!("Abort confirmed with {} pending targets", pending.len());
            self.cancel.cancel();
        } else {
            debug!("Abort declined, continuing");
        }

        InterruptReport { pending, aborted }
    }

    /// Handle every signal from `signals` until the run is cancelled or the
    /// signal source closes.
    pub async fn listen(self, mut signals: mpsc::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                signal = signals.recv() => match signal {
                    Some(()) => {
                        if self.handle().await.aborted {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }
}

/// A channel receiving one message per Ctrl-C.
pub fn ctrl_c_signals() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl-C: {}", e);
                break;
            }
            debug!("Received Ctrl-C");
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });
    rx
}
