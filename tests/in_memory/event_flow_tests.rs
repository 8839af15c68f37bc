//! In-memory integration tests for event publication through the service.

use super::helpers::{Tracker, tracker};
use async_trait::async_trait;
use eyre::ensure;
use rstest::rstest;
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use taskhub::{
    events::{
        ErrorHandler, Event, EventHandler, EventHandlerError, EventKind, FnEventHandler,
    },
    task::{
        domain::{TaskStatus, TaskUpdate},
        services::{CreateTaskRequest, LifecycleHook, TaskPlugin},
    },
};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: String) {
    log.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn labelled(name: &'static str, log: &Log) -> Arc<dyn EventHandler> {
    let sink = Arc::clone(log);
    Arc::new(FnEventHandler::new(name, move |event: &Event| {
        record(&sink, format!("{name}:{}", event.kind()));
        Ok(())
    }))
}

struct Rejecting;

struct FailureLog(Log);

#[async_trait]
impl ErrorHandler for FailureLog {
    async fn handle_error(
        &self,
        event: &Event,
        handler: &str,
        error: &EventHandlerError,
    ) -> Result<(), EventHandlerError> {
        record(&self.0, format!("{handler} failed on {}: {error}", event.kind()));
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Rejecting {
    fn name(&self) -> &str {
        "rejecting"
    }

    async fn handle(&self, _event: &Event) -> Result<(), EventHandlerError> {
        Err(EventHandlerError::failed("audit store offline"))
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn subscribers_run_by_priority_and_failures_stay_contained(
    tracker: Tracker,
) -> eyre::Result<()> {
    let log: Log = Arc::default();
    let bus = tracker.service.event_bus();
    bus.subscribe(EventKind::TaskCreated, labelled("low", &log), 0);
    bus.subscribe(EventKind::TaskCreated, Arc::new(Rejecting), 5);
    bus.subscribe(EventKind::TaskCreated, labelled("high", &log), 10);
    bus.subscribe(EventKind::TaskCreated, labelled("high-later", &log), 10);
    let failures: Log = Arc::default();
    bus.add_error_handler(Arc::new(FailureLog(Arc::clone(&failures))));

    let created = tracker
        .service
        .create_task(CreateTaskRequest::new("Audit me"))
        .await?;

    ensure!(
        entries(&log)
            == vec![
                "high:task.created".to_owned(),
                "high-later:task.created".to_owned(),
                "low:task.created".to_owned(),
            ]
    );
    ensure!(tracker.service.get_task(created.id()).await?.is_some());
    ensure!(entries(&failures).len() == 1);
    ensure!(
        entries(&failures)
            .first()
            .is_some_and(|line| line.starts_with("rejecting failed on task.created"))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn history_records_lifecycle_in_order(tracker: Tracker) -> eyre::Result<()> {
    let service = &tracker.service;
    let task = service
        .create_task(CreateTaskRequest::new("Chronicle"))
        .await?;
    let update = TaskUpdate {
        description: Some("Now with details".to_owned()),
        ..TaskUpdate::default()
    };
    service.update_task(task.id(), update, "pm").await?;
    service
        .transition_status(task.id(), TaskStatus::InProgress, "dev")
        .await?;
    service.delete_task(task.id()).await?;

    let kinds: Vec<EventKind> = service
        .event_bus()
        .get_history(None, 10)
        .iter()
        .map(Event::kind)
        .collect();
    ensure!(
        kinds
            == vec![
                EventKind::TaskCreated,
                EventKind::TaskUpdated,
                EventKind::TaskStatusChanged,
                EventKind::TaskDeleted,
            ]
    );

    let changes = service
        .event_bus()
        .get_history(Some(EventKind::TaskStatusChanged), 1);
    let metadata = changes.first().and_then(Event::metadata);
    ensure!(metadata.and_then(|m| m.get("from")) == Some(&json!("pending")));
    ensure!(metadata.and_then(|m| m.get("to")) == Some(&json!("in_progress")));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plugin_with_noop_hooks_subscribes_only_present_ones(
    tracker: Tracker,
) -> eyre::Result<()> {
    let log: Log = Arc::default();
    let plugin = TaskPlugin::new("audit")
        .on_created(LifecycleHook::NoOp)
        .on_updated(LifecycleHook::present(labelled("updated", &log)));

    tracker.service.register_plugin(&plugin);
    let task = tracker
        .service
        .create_task(CreateTaskRequest::new("Plugin target"))
        .await?;
    let update = TaskUpdate {
        title: Some("Renamed".to_owned()),
        ..TaskUpdate::default()
    };
    tracker.service.update_task(task.id(), update, "pm").await?;

    ensure!(entries(&log) == vec!["updated:task.updated".to_owned()]);
    ensure!(tracker.service.event_bus().subscriber_count(None) == 1);
    Ok(())
}
