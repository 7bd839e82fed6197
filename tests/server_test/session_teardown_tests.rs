//! Timeout, cancellation and transport-failure teardown.

use std::time::Duration;

use super::helpers::{
    TestContext, collect_progress, context, context_with, fs_server_params,
    wait_for_subscription, wait_until,
};
use chrono::Utc;
use eyre::{Result, ensure, eyre};
use rstest::rstest;
use skilder::server_test::{
    domain::{LifecycleEvent, TestStage},
    ports::{BusError, wire},
    services::{TestProgressError, TestSessionConfig},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn silent_worker_times_out_and_late_messages_are_ignored() -> Result<()> {
    let context = context_with(
        TestSessionConfig::default().with_timeout(Duration::from_millis(100)),
    );
    let handle = context.orchestrator.start_test(fs_server_params());
    let observer = context.orchestrator.observe_progress(&handle.session_id);

    let progress = collect_progress(observer).await?;
    let [Ok(timed_out)] = progress.as_slice() else {
        return Err(eyre!("expected a single TIMED_OUT event, got {progress:?}"));
    };
    ensure!(timed_out.stage() == TestStage::TimedOut);
    ensure!(!context.orchestrator.registry().contains(&handle.session_id));

    let subject = wire::lifecycle_subject(&handle.session_id);
    wait_until(|| Ok(context.bus.drained_subjects()?.contains(&subject))).await?;
    let delivered = context.bus.deliver_event(&LifecycleEvent::new(
        handle.session_id.clone(),
        TestStage::Completed,
        "too late",
        Utc::now(),
    ))?;
    ensure!(!delivered, "late message must find no subscription");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unobserved_session_still_releases_resources() -> Result<()> {
    let context = context_with(
        TestSessionConfig::default()
            .with_timeout(Duration::from_millis(50))
            .with_timeout_event(false),
    );
    let handle = context.orchestrator.start_test(fs_server_params());

    wait_until(|| Ok(context.orchestrator.active_sessions() == 0)).await?;
    wait_until(|| Ok(!context.bus.is_subscribed(&handle.session_id)?)).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transport_failure_reaches_every_observer(context: TestContext) -> Result<()> {
    let handle = context.orchestrator.start_test(fs_server_params());
    let first = context.orchestrator.observe_progress(&handle.session_id);
    let second = context.orchestrator.observe_progress(&handle.session_id);
    wait_for_subscription(&context.bus, &handle.session_id).await?;

    context
        .bus
        .deliver_failure(&handle.session_id, BusError::Closed)?;

    for observer in [first, second] {
        let progress = collect_progress(observer).await?;
        ensure!(
            matches!(progress.as_slice(), [Err(TestProgressError::Transport(_))]),
            "expected a transport error, got {progress:?}"
        );
    }
    wait_until(|| Ok(context.orchestrator.active_sessions() == 0)).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_session_closes_observers_cleanly(context: TestContext) -> Result<()> {
    let handle = context.orchestrator.start_test(fs_server_params());
    let observer = context.orchestrator.observe_progress(&handle.session_id);
    wait_for_subscription(&context.bus, &handle.session_id).await?;

    ensure!(context.orchestrator.cancel_test(&handle.session_id));
    ensure!(!context.orchestrator.cancel_test(&handle.session_id));

    let progress = collect_progress(observer).await?;
    ensure!(progress.is_empty());
    let late = collect_progress(context.orchestrator.observe_progress(&handle.session_id)).await?;
    ensure!(late.is_empty());
    wait_until(|| Ok(!context.bus.is_subscribed(&handle.session_id)?)).await
}
