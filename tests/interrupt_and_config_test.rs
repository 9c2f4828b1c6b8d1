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

//! Interrupts during a run and configuration errors before one.

#![cfg(unix)]

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use common::{plain, FakeTransport, FixedConfirm};
use serial_test::serial;
use sshtool::app::{run_cli, Interrupts, Run};
use sshtool::executor::{
    Coordinator, InterruptHandler, Report, ReportMode, Request, RunContext, RunOutcome, RunPlan,
    RunStatus,
};
use sshtool::{Cli, Target};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const SLOW_ON_SLOW_HOSTS: &str =
    r#"case "$SSHTOOL_TARGET" in slow*) sleep 10;; esac; echo ok"#;

fn mixed_targets() -> Vec<Target> {
    ["fast1", "slow1", "fast2", "slow2", "fast3"]
        .into_iter()
        .map(Target::new)
        .collect()
}

async fn wait_until_finished(ctx: &RunContext, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while ctx.finished().len() < count {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("fast targets should finish");
}

#[tokio::test]
#[serial]
async fn test_confirmed_interrupt_reports_pending_and_summarizes_finished() {
    let fake = FakeTransport::new();
    let ctx = Arc::new(RunContext::new(mixed_targets()));
    let cancel = CancellationToken::new();
    let coordinator = Coordinator::new(
        fake.executor(),
        RunPlan::new(Request::Command(SLOW_ON_SLOW_HOSTS.to_string())),
        ReportMode::Summarized,
        plain(),
    );

    let sinks: Vec<tokio::io::Sink> = (0..5).map(|_| tokio::io::sink()).collect();
    let run = tokio::spawn({
        let ctx = Arc::clone(&ctx);
        let cancel = cancel.clone();
        async move { coordinator.run(ctx, sinks, cancel).await }
    });

    wait_until_finished(&ctx, 3).await;

    let confirm = FixedConfirm::new(true);
    let handler = InterruptHandler::new(Arc::clone(&ctx), confirm.clone(), cancel.clone());
    let interrupt = handler.handle().await;

    let pending: Vec<_> = interrupt.pending.iter().map(|t| t.host.as_str()).collect();
    assert_eq!(pending, vec!["slow1", "slow2"]);
    assert!(interrupt.aborted);
    assert_eq!(run.await.unwrap(), RunStatus::Cancelled);

    let report = Report::from_context(&ctx);
    assert_eq!(report.outputs().len(), 1);
    assert_eq!(report.outputs().groups()[0].members, vec![0, 2, 4]);

    let rendered = report.render(ReportMode::Summarized, true, &plain());
    assert!(rendered.contains("-- Partial Output 1 / 1 :"));
    assert!(rendered.contains("fast1 fast2 fast3"));
    assert!(!rendered.contains("slow"));
}

#[tokio::test]
#[serial]
async fn test_declined_interrupt_lets_run_complete() {
    let fake = FakeTransport::new();
    let ctx = Arc::new(RunContext::new(vec![Target::new("h1"), Target::new("h2")]));
    let cancel = CancellationToken::new();
    let coordinator = Coordinator::new(
        fake.executor(),
        RunPlan::new(Request::Command("sleep 1; echo ok".to_string())),
        ReportMode::Summarized,
        plain(),
    );

    let sinks: Vec<tokio::io::Sink> = (0..2).map(|_| tokio::io::sink()).collect();
    let run = tokio::spawn({
        let ctx = Arc::clone(&ctx);
        let cancel = cancel.clone();
        async move { coordinator.run(ctx, sinks, cancel).await }
    });

    let handler = InterruptHandler::new(Arc::clone(&ctx), FixedConfirm::new(false), cancel.clone());
    let interrupt = handler.handle().await;
    assert!(!interrupt.aborted);

    assert_eq!(run.await.unwrap(), RunStatus::Completed);
    assert!(ctx.pending().is_empty());
}

#[tokio::test]
#[serial]
async fn test_aborted_run_exits_with_abort_outcome() {
    let fake = FakeTransport::new();
    let capture_parent = tempfile::tempdir().unwrap();
    let confirm = FixedConfirm::new(true);
    let (signal_tx, signals) = mpsc::channel(1);

    let run = tokio::spawn(
        Run::new(
            mixed_targets(),
            fake.executor(),
            RunPlan::new(Request::Command(SLOW_ON_SLOW_HOSTS.to_string())),
        )
        .with_formatter(plain())
        .with_capture_parent(capture_parent.path().to_path_buf())
        .execute(Interrupts {
            signals,
            confirm: confirm.clone(),
        }),
    );

    tokio::time::sleep(Duration::from_millis(1500)).await;
    signal_tx.send(()).await.unwrap();

    let outcome = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("abort should end the run")
        .unwrap();
    assert_eq!(outcome, RunOutcome::Aborted);
    assert_eq!(outcome.exit_code(), 100);
    assert_eq!(confirm.asked.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read_dir(capture_parent.path()).unwrap().count(), 0);
}

#[tokio::test]
#[serial]
async fn test_malformed_target_list_starts_nothing() {
    let fake = FakeTransport::new();
    let targets_file = fake.path().join("targets");
    std::fs::write(&targets_file, "h1\nh2 22 extra\nh3\n").unwrap();
    let config_file = fake.path().join("config.yaml");
    std::fs::write(&config_file, "").unwrap();

    let cli = Cli::try_parse_from([
        "sshtool",
        "--config",
        config_file.to_str().unwrap(),
        "--sshcommand",
        fake.ssh.to_str().unwrap(),
        "-t",
        targets_file.to_str().unwrap(),
        "echo",
        "ok",
    ])
    .unwrap();

    let outcome = run_cli(cli).await;
    assert_eq!(outcome, RunOutcome::ConfigError);
    assert!(fake.ssh_calls().is_empty());
}

#[tokio::test]
#[serial]
async fn test_missing_default_targets_file_starts_nothing() {
    let fake = FakeTransport::new();
    let config_file = fake.path().join("config.yaml");
    std::fs::write(&config_file, "").unwrap();
    let home = tempfile::tempdir().unwrap();

    let cli = Cli::try_parse_from([
        "sshtool",
        "--config",
        config_file.to_str().unwrap(),
        "--sshcommand",
        fake.ssh.to_str().unwrap(),
        "uptime",
    ])
    .unwrap();

    let original_home = std::env::var("HOME").ok();
    std::env::set_var("HOME", home.path());
    let outcome = run_cli(cli).await;
    if let Some(original) = original_home {
        std::env::set_var("HOME", original);
    } else {
        std::env::remove_var("HOME");
    }

    assert_eq!(outcome, RunOutcome::ConfigError);
    assert!(fake.ssh_calls().is_empty());
}

#[tokio::test]
#[serial]
async fn test_missing_explicit_config_is_config_error() {
    let fake = FakeTransport::new();
    let cli = Cli::try_parse_from([
        "sshtool",
        "--config",
        fake.path().join("missing.yaml").to_str().unwrap(),
        "--sshcommand",
        fake.ssh.to_str().unwrap(),
        "-t",
        "h1",
        "true",
    ])
    .unwrap();

    assert_eq!(run_cli(cli).await, RunOutcome::ConfigError);
    assert!(fake.ssh_calls().is_empty());
}

#[tokio::test]
#[serial]
async fn test_cli_run_with_config_file() {
    let fake = FakeTransport::new();
    let config_file = fake.path().join("config.yaml");
    std::fs::write(
        &config_file,
        format!(
            "defaults:\n  targets: \"h1,h2\"\n  ssh_command: {}\n  profile: \"\"\n",
            fake.ssh.display()
        ),
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "sshtool",
        "--config",
        config_file.to_str().unwrap(),
        "-o",
        "ConnectTimeout=5",
        "echo ok",
    ])
    .unwrap();

    assert_eq!(run_cli(cli).await, RunOutcome::Success);
    let calls = fake.ssh_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.contains("-o ConnectTimeout=5 -t")));
    assert!(calls.iter().all(|c| !c.contains(".profile")));
}
