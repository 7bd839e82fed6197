//! Start-to-completion flows through the public orchestrator API.

use super::helpers::{
    TestContext, collect_progress, context, fs_server_params, wait_for_subscription, wait_until,
};
use chrono::Utc;
use eyre::{Result, ensure, eyre};
use rstest::rstest;
use serde_json::json;
use skilder::server_test::domain::{
    LifecycleEvent, McpToolDescriptor, RuntimeId, TestFailure, TestStage, WorkspaceId,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn start_test_hands_back_distinct_pending_sessions(context: TestContext) -> Result<()> {
    let handles: Vec<_> = (0..10)
        .map(|_| context.orchestrator.start_test(fs_server_params()))
        .collect();

    for handle in &handles {
        ensure!(handle.stage == TestStage::Pending, "handle should be pending");
        ensure!(handle.tools.is_none() && handle.error.is_none());
        ensure!(!handle.session_id.as_str().is_empty());
    }
    let mut ids: Vec<_> = handles.iter().map(|handle| handle.session_id.clone()).collect();
    ids.sort_by(|left, right| left.as_str().cmp(right.as_str()));
    ids.dedup();
    ensure!(ids.len() == 10, "session ids must be unique");

    wait_until(|| Ok(context.bus.published_requests()?.len() == 10)).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completed_test_reports_discovered_tools(context: TestContext) -> Result<()> {
    context
        .directory
        .set_execution_runtime(WorkspaceId::new("ws-1"), RuntimeId::new("edge-runtime"))?;
    let handle = context.orchestrator.start_test(fs_server_params());
    let observer = context.orchestrator.observe_progress(&handle.session_id);
    wait_for_subscription(&context.bus, &handle.session_id).await?;

    let tool = McpToolDescriptor::new("test-tool", "A test tool", json!({"type": "object"}))?
        .with_annotations(json!({"title": "Test Tool"}));
    context.bus.deliver_event(&LifecycleEvent::new(
        handle.session_id.clone(),
        TestStage::Starting,
        "Starting MCP server",
        Utc::now(),
    ))?;
    context.bus.deliver_event(
        &LifecycleEvent::new(
            handle.session_id.clone(),
            TestStage::Completed,
            "Listed 1 tool",
            Utc::now(),
        )
        .with_tools(vec![tool]),
    )?;

    let progress = collect_progress(observer).await?;
    let events = progress.into_iter().collect::<Result<Vec<_>, _>>()?;
    let stages: Vec<_> = events.iter().map(LifecycleEvent::stage).collect();
    ensure!(
        stages == vec![TestStage::Starting, TestStage::Completed],
        "unexpected stages {stages:?}"
    );
    let tool_names: Vec<_> = events
        .last()
        .and_then(LifecycleEvent::tools)
        .ok_or_else(|| eyre!("completion should carry tools"))?
        .iter()
        .map(McpToolDescriptor::name)
        .collect();
    ensure!(tool_names == vec!["test-tool"]);

    let published = context.bus.published_requests()?;
    let request = published
        .first()
        .ok_or_else(|| eyre!("request should be published"))?;
    ensure!(request.runtime_id() == Some(&RuntimeId::new("edge-runtime")));

    wait_until(|| Ok(context.orchestrator.active_sessions() == 0)).await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_test_is_observed_then_cleaned_up(context: TestContext) -> Result<()> {
    let handle = context.orchestrator.start_test(fs_server_params());
    let observer = context.orchestrator.observe_progress(&handle.session_id);
    wait_for_subscription(&context.bus, &handle.session_id).await?;

    context.bus.deliver_event(
        &LifecycleEvent::new(
            handle.session_id.clone(),
            TestStage::Failed,
            "Server failed to start",
            Utc::now(),
        )
        .with_error(TestFailure::new("SERVER_START_FAILED", "Connection refused")),
    )?;

    let progress = collect_progress(observer).await?;
    let [Ok(failed)] = progress.as_slice() else {
        return Err(eyre!("expected a single FAILED event, got {progress:?}"));
    };
    ensure!(failed.stage() == TestStage::Failed);
    ensure!(failed.error().map(|error| error.code.as_str()) == Some("SERVER_START_FAILED"));
    ensure!(!context.orchestrator.registry().contains(&handle.session_id));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn independent_sessions_do_not_interfere(context: TestContext) -> Result<()> {
    let first = context.orchestrator.start_test(fs_server_params());
    let second = context.orchestrator.start_test(fs_server_params());
    let first_observer = context.orchestrator.observe_progress(&first.session_id);
    wait_for_subscription(&context.bus, &first.session_id).await?;
    wait_for_subscription(&context.bus, &second.session_id).await?;

    context.bus.deliver_event(&LifecycleEvent::new(
        first.session_id.clone(),
        TestStage::Completed,
        "done",
        Utc::now(),
    ))?;

    let progress = collect_progress(first_observer).await?;
    ensure!(progress.len() == 1);
    ensure!(context.orchestrator.registry().contains(&second.session_id));
    ensure!(context.orchestrator.cancel_test(&second.session_id));
    Ok(())
}
