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

//! End-to-end runs of the coordinator against fake transports.

#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::{plain, FakeTransport};
use serial_test::serial;
use sshtool::app::{Interrupts, Run};
use sshtool::executor::{
    Coordinator, CopySpec, Report, ReportMode, Request, RunContext, RunOutcome, RunPlan,
    RunStatus, SetupStage,
};
use sshtool::Target;
use tokio_util::sync::CancellationToken;

fn targets(hosts: &[&str]) -> Vec<Target> {
    hosts.iter().map(|h| Target::new(*h)).collect()
}

fn command(line: &str) -> RunPlan {
    RunPlan::new(Request::Command(line.to_string()))
}

async fn run_to_report(
    fake: &FakeTransport,
    hosts: &[&str],
    plan: RunPlan,
    mode: ReportMode,
) -> (Arc<RunContext>, Report) {
    let ctx = Arc::new(RunContext::new(targets(hosts)));
    let sinks: Vec<tokio::io::Sink> = hosts.iter().map(|_| tokio::io::sink()).collect();
    let coordinator = Coordinator::new(fake.executor(), plan, mode, plain());

    let status = coordinator
        .run(Arc::clone(&ctx), sinks, CancellationToken::new())
        .await;
    assert_eq!(status, RunStatus::Completed);

    let report = Report::from_context(&ctx);
    (ctx, report)
}

#[tokio::test]
#[serial]
async fn test_identical_output_collapses_into_one_group() {
    let fake = FakeTransport::new();
    let (ctx, report) = run_to_report(
        &fake,
        &["h1", "h2", "h3"],
        command("echo ok"),
        ReportMode::Summarized,
    )
    .await;

    assert!(ctx.pending().is_empty());
    assert_eq!(report.outputs().len(), 1);
    assert_eq!(report.outputs().groups()[0].text, "ok\n");
    assert_eq!(report.outputs().groups()[0].members, vec![0, 1, 2]);
    assert!(!report.has_errors());
}

#[tokio::test]
#[serial]
async fn test_failing_target_gets_its_own_groups() {
    let fake = FakeTransport::new();
    let line = r#"if [ "$SSHTOOL_TARGET" = h2 ]; then echo fail; exit 3; fi; echo ok"#;
    let (_, report) = run_to_report(&fake, &["h1", "h2"], command(line), ReportMode::Summarized).await;

    assert_eq!(report.outputs().len(), 2);
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors().groups()[0].members, vec![1]);

    let rendered = report.render(ReportMode::Summarized, false, &plain());
    assert!(rendered.contains("----------- ERRORS ---"));
}

#[tokio::test]
#[serial]
async fn test_stdout_and_stderr_are_combined() {
    let fake = FakeTransport::new();
    let (ctx, _) = run_to_report(&fake, &["h1"], command("echo out; echo err >&2"), ReportMode::Summarized).await;

    let output = ctx.slot(0).unwrap().output().unwrap();
    assert!(output.contains("out\n"));
    assert!(output.contains("err\n"));
    assert_eq!(ctx.slot(0).unwrap().error(), Some(""));
}

#[tokio::test]
#[serial]
async fn test_host_name_is_substituted_unless_verbatim() {
    let fake = FakeTransport::new();
    let line = r#"echo "hello from $SSHTOOL_TARGET""#;

    let (_, report) = run_to_report(&fake, &["h1", "h2"], command(line), ReportMode::Summarized).await;
    assert_eq!(report.outputs().len(), 1);
    assert_eq!(report.outputs().groups()[0].text, "hello from \"$SSHTOOL_TARGET\"\n");

    let (_, report) = run_to_report(&fake, &["h1", "h2"], command(line), ReportMode::Verbatim).await;
    assert_eq!(report.outputs().len(), 2);
    assert_eq!(report.outputs().groups()[0].text, "hello from h1\n");
}

#[tokio::test]
#[serial]
async fn test_explicit_port_reaches_transport() {
    let fake = FakeTransport::new();
    let ctx = Arc::new(RunContext::new(vec![Target::with_port("h1", 2222)]));
    let coordinator = Coordinator::new(fake.executor(), command("true"), ReportMode::Summarized, plain());
    coordinator
        .run(Arc::clone(&ctx), vec![tokio::io::sink()], CancellationToken::new())
        .await;

    let calls = fake.ssh_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("-o LogLevel=QUIET -t -p 2222 h1"));
}

#[tokio::test]
#[serial]
async fn test_unsafe_copy_destination_never_invokes_transports() {
    let fake = FakeTransport::new();
    let source = fake.path().join("payload.txt");
    std::fs::write(&source, "data").unwrap();

    let plan = RunPlan::new(Request::Copy(CopySpec::new(&source, "/etc/payload.txt")));
    let (_, report) = run_to_report(&fake, &["h1"], plan, ReportMode::Verbatim).await;

    assert!(report.has_errors());
    assert!(report.errors().groups()[0].text.contains("cowardly refusing"));
    assert!(fake.scp_calls().is_empty());
    assert!(fake.ssh_calls().is_empty());
}

#[tokio::test]
#[serial]
async fn test_copy_first_then_command() {
    let fake = FakeTransport::new();
    let bundle_root = tempfile::tempdir().unwrap();
    let bundle = bundle_root.path().join(format!("sshtool-bundle-{}", std::process::id()));
    std::fs::create_dir(&bundle).unwrap();
    std::fs::write(bundle.join("marker"), "copied\n").unwrap();

    let copy = CopySpec::to_safe_dir(&bundle);
    let destination = copy.destination.clone();
    let plan = command(&format!("cat {destination}/marker")).with_copy_first(copy);

    let (ctx, report) = run_to_report(&fake, &["h1"], plan, ReportMode::Verbatim).await;
    let _ = std::fs::remove_dir_all(&destination);

    assert!(!report.has_errors(), "{:?}", ctx.slot(0).unwrap().error());
    assert_eq!(ctx.slot(0).unwrap().output(), Some("copied\n"));
    assert_eq!(fake.scp_calls().len(), 1);
    // rm -rf before the copy, then the command itself
    assert_eq!(fake.ssh_calls().len(), 2);
    assert!(fake.ssh_calls()[0].contains("rm -rf"));
}

#[tokio::test]
#[serial]
async fn test_script_is_staged_run_and_removed() {
    let fake = FakeTransport::new();
    let script = fake.path().join("report-args.sh");
    std::fs::write(&script, "#!/bin/sh\necho \"args: $1|$2\"\nexit 0\n").unwrap();

    let plan = RunPlan::new(Request::Script {
        path: script,
        args: vec!["one".to_string(), "two words".to_string()],
    });
    let (ctx, report) = run_to_report(&fake, &["h1"], plan, ReportMode::Verbatim).await;

    assert!(!report.has_errors(), "{:?}", ctx.slot(0).unwrap().error());
    assert_eq!(ctx.slot(0).unwrap().output(), Some("args: one|two words\n"));

    let staged = fake.scp_calls()[0]
        .rsplit(':')
        .next()
        .unwrap()
        .to_string();
    assert!(staged.starts_with("/tmp/__sshtool_"));
    assert!(staged.ends_with("_report-args.sh"));
    assert!(!std::path::Path::new(&staged).exists());
}

#[tokio::test]
#[serial]
async fn test_script_name_with_shell_characters_runs_and_is_removed() {
    let fake = FakeTransport::new();
    let script = fake.path().join("my check.sh");
    std::fs::write(&script, "#!/bin/sh\necho \"checked $1\"\nexit 3\n").unwrap();

    let plan = RunPlan::new(Request::Script {
        path: script,
        args: vec!["disk".to_string()],
    });
    let (ctx, report) = run_to_report(&fake, &["h1"], plan, ReportMode::Verbatim).await;

    assert_eq!(ctx.slot(0).unwrap().output(), Some("checked disk\n"));
    assert_eq!(
        ctx.slot(0).unwrap().error(),
        Some("remote command failed: exit status: 3\n")
    );
    assert!(report.has_errors());

    let staged = fake.scp_calls()[0]
        .rsplit(':')
        .next()
        .unwrap()
        .to_string();
    assert!(staged.ends_with("_my check.sh"), "{staged}");
    assert!(!std::path::Path::new(&staged).exists());
}

#[tokio::test]
#[serial]
async fn test_script_exit_status_is_preserved() {
    let fake = FakeTransport::new();
    let script = fake.path().join("fails.sh");
    std::fs::write(&script, "#!/bin/sh\necho broken\nexit 4\n").unwrap();

    let plan = RunPlan::new(Request::Script {
        path: script,
        args: vec![],
    });
    let (_, report) = run_to_report(&fake, &["h1"], plan, ReportMode::Verbatim).await;

    assert!(report.has_errors());
    assert_eq!(report.outputs().groups()[0].text, "broken\n");
}

#[tokio::test]
#[serial]
async fn test_missing_transport_is_isolated_per_target() {
    let ctx = Arc::new(RunContext::new(targets(&["h1", "h2"])));
    let executor = sshtool::RemoteExecutor::new(sshtool::executor::TransportConfig {
        ssh_command: "/nonexistent/sshtool-ssh".to_string(),
        ..Default::default()
    });
    let coordinator = Coordinator::new(executor, command("true"), ReportMode::Summarized, plain());
    let status = coordinator
        .run(Arc::clone(&ctx), vec![tokio::io::sink(), tokio::io::sink()], CancellationToken::new())
        .await;
    assert_eq!(status, RunStatus::Completed);

    let report = Report::from_context(&ctx);
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors().groups()[0].members, vec![0, 1]);
    assert!(report.errors().groups()[0].text.contains("failed to start"));
}

#[tokio::test]
#[serial]
async fn test_run_outcomes() {
    let fake = FakeTransport::new();
    let capture_parent = tempfile::tempdir().unwrap();

    let outcome = Run::new(targets(&["h1", "h2"]), fake.executor(), command("echo ok"))
        .with_formatter(plain())
        .with_capture_parent(capture_parent.path())
        .execute(Interrupts::none())
        .await;
    assert_eq!(outcome, RunOutcome::Success);

    let line = r#"[ "$SSHTOOL_TARGET" = h2 ] && exit 1; echo ok"#;
    let outcome = Run::new(targets(&["h1", "h2"]), fake.executor(), command(line))
        .with_formatter(plain())
        .with_capture_parent(capture_parent.path())
        .execute(Interrupts::none())
        .await;
    assert_eq!(outcome, RunOutcome::PartialFailure);
    assert_eq!(outcome.exit_code(), 1);

    // Capture directories are gone after each run
    assert_eq!(std::fs::read_dir(capture_parent.path()).unwrap().count(), 0);
}

#[tokio::test]
#[serial]
async fn test_missing_capture_parent_is_setup_error() {
    let fake = FakeTransport::new();
    let outcome = Run::new(targets(&["h1"]), fake.executor(), command("echo ok"))
        .with_formatter(plain())
        .with_capture_parent(fake.path().join("no-such-dir"))
        .execute(Interrupts::none())
        .await;

    assert_eq!(outcome, RunOutcome::SetupError(SetupStage::TempDir));
    assert_eq!(outcome.exit_code(), 10);
    assert!(fake.ssh_calls().is_empty());
}
