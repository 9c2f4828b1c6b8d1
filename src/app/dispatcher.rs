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

//! Top-level run orchestration

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::initialization::{build_plan, Settings};
use crate::cli::Cli;
use crate::config::Config;
use crate::executor::{
    ctrl_c_signals, Confirm, Coordinator, InterruptHandler, RemoteExecutor, Report, ReportMode,
    RunContext, RunOutcome, RunPlan, RunStatus, SetupStage, StdinConfirm,
};
use crate::target::Target;
use crate::ui::OutputFormatter;
use crate::utils::CaptureStore;

/// Source of interrupts and the way an abort is confirmed.
pub struct Interrupts {
    pub signals: mpsc::Receiver<()>,
    pub confirm: Arc<dyn Confirm>,
}

impl Interrupts {
    /// Ctrl-C, confirmed on the terminal.
    pub fn from_terminal() -> Self {
        Self {
            signals: ctrl_c_signals(),
            confirm: Arc::new(StdinConfirm),
        }
    }

    /// No interrupts will ever arrive.
    pub fn none() -> Self {
        let (_, signals) = mpsc::channel(1);
        Self {
            signals,
            confirm: Arc::new(StdinConfirm),
        }
    }
}

/// One run of a plan over a target list.
pub struct Run {
    targets: Vec<Target>,
    executor: RemoteExecutor,
    plan: RunPlan,
    mode: ReportMode,
    formatter: OutputFormatter,
    capture_parent: PathBuf,
}

impl Run {
    pub fn new(targets: Vec<Target>, executor: RemoteExecutor, plan: RunPlan) -> Self {
        Self {
            targets,
            executor,
            plan,
            mode: ReportMode::default(),
            formatter: OutputFormatter::detect(),
            capture_parent: std::env::temp_dir(),
        }
    }

    pub fn with_mode(mut self, mode: ReportMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_formatter(mut self, formatter: OutputFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Directory in which the capture directory is created.
    pub fn with_capture_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.capture_parent = parent.into();
        self
    }

    /// Execute the run, print the report and return the outcome.
    pub async fn execute(self, interrupts: Interrupts) -> RunOutcome {
        let store = match CaptureStore::create_in(&self.capture_parent) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Error creating temp directory: {e}");
                return RunOutcome::SetupError(SetupStage::TempDir);
            }
        };

        let sinks = match store.create_sinks(&self.targets).await {
            Ok(sinks) => sinks,
            Err(e) => {
                eprintln!("Error: {e}");
                if let Err(e) = store.close() {
                    tracing::warn!("Failed to remove capture directory: {}", e);
                }
                return RunOutcome::SetupError(SetupStage::CaptureFile);
            }
        };

        let ctx = Arc::new(RunContext::new(self.targets));
        let cancel = CancellationToken::new();

        let handler = InterruptHandler::new(Arc::clone(&ctx), interrupts.confirm, cancel.clone());
        let listener = tokio::spawn(handler.listen(interrupts.signals));

        let coordinator = Coordinator::new(self.executor, self.plan, self.mode, self.formatter);
        let status = coordinator.run(Arc::clone(&ctx), sinks, cancel.clone()).await;

        // A prompt may still be waiting for an answer
        listener.abort();

        let report = Report::from_context(&ctx);
        let partial = status == RunStatus::Cancelled;
        print!("{}", report.render(self.mode, partial, &self.formatter));

        let cleanup_path = store.path().to_path_buf();
        if let Err(e) = store.close() {
            eprintln!(
                "Error removing temp directory {}: {e}",
                cleanup_path.display()
            );
            return RunOutcome::CleanupError;
        }

        if partial {
            return RunOutcome::Aborted;
        }

        println!("{}", self.formatter.finish_line(report.has_errors()));
        if report.has_errors() {
            RunOutcome::PartialFailure
        } else {
            RunOutcome::Success
        }
    }
}

/// Resolve everything from the command line and run it.
pub async fn run_cli(cli: Cli) -> RunOutcome {
    let config = match Config::load_with_priority(cli.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return RunOutcome::ConfigError;
        }
    };
    let settings = Settings::resolve(&cli, &config);

    let plan = match build_plan(&cli, settings.transport.profile.as_deref()) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return RunOutcome::ConfigError;
        }
    };

    let targets = match settings.targets.load().await {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("Error: {e}");
            return RunOutcome::ConfigError;
        }
    };

    tracing::info!("Running on {} targets", targets.len());
    Run::new(targets, RemoteExecutor::new(settings.transport), plan)
        .with_mode(settings.mode)
        .execute(Interrupts::from_terminal())
        .await
}
