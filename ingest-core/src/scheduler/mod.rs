//! Cron-driven task scheduler.
//!
//! Each registered task owns one `tokio` task that sleeps until its next
//! cron-computed fire time, runs the callback, records the outcome on its
//! [`ScheduledTaskRecord`], and loops. Callbacks never run concurrently with
//! themselves (the owning task is single-writer by construction) but
//! different tasks run fully independently — there is no cross-task
//! serialization.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{DomainError, Result};
use crate::types::entities::ScheduledTaskRecord;

/// A scheduled callback. Returns a boxed future so trait objects can be
/// stored without an extra generic parameter on [`Scheduler`].
pub type ScheduleCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Registration parameters for one cron task.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// 5-field minute-granularity cron expression.
    pub cron_expression: String,
    /// Human-readable description, surfaced in status reports.
    pub description: String,
    /// IANA timezone the expression is evaluated in. Defaults to `"UTC"`.
    pub timezone: Option<String>,
    /// Whether to run the callback once immediately on registration, in
    /// addition to its normal cron cadence.
    pub run_on_start: bool,
}

struct RunningTask {
    rule_name: String,
    handle: JoinHandle<()>,
}

/// Owns every registered cron task's lifecycle.
#[derive(Debug, Default)]
pub struct Scheduler {
    records: Arc<RwLock<HashMap<Uuid, ScheduledTaskRecord>>>,
    running: Arc<RwLock<HashMap<Uuid, RunningTaskHandle>>>,
}

/// Only the `JoinHandle` needs `!Debug` suppression; kept out of
/// `RunningTask` so the struct itself can stay simple.
struct RunningTaskHandle(RunningTask);

impl std::fmt::Debug for RunningTaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningTaskHandle")
            .field("rule_name", &self.0.rule_name)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Build an empty scheduler. Registration may begin immediately; there
    /// is no separate "not yet started" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a cron task, spawning its run loop.
    ///
    /// Returns the task's stable id, used later with
    /// [`Scheduler::unregister_schedule`].
    ///
    /// # Errors
    ///
    /// Returns an error if the cron expression or timezone fails to parse.
    #[instrument(skip(self, callback), fields(rule_name = %rule_name.as_ref()))]
    pub async fn register_schedule(
        &self,
        rule_name: impl AsRef<str>,
        config: ScheduleConfig,
        callback: ScheduleCallback,
    ) -> Result<Uuid> {
        let rule_name = rule_name.as_ref().to_string();
        let schedule = parse_cron(&config.cron_expression)?;
        let tz = parse_timezone(config.timezone.as_deref().unwrap_or("UTC"))?;

        let task_id = Uuid::new_v4();
        let record = ScheduledTaskRecord {
            id: task_id,
            rule_name: rule_name.clone(),
            cron_expression: config.cron_expression.clone(),
            timezone: config.timezone.clone().unwrap_or_else(|| "UTC".to_string()),
            description: config.description.clone(),
            registered_at: Utc::now(),
            last_execution_at: None,
            execution_count: 0,
            last_error: None,
        };
        self.records.write().await.insert(task_id, record);

        let records = Arc::clone(&self.records);
        let run_on_start = config.run_on_start;
        let handle = tokio::spawn(async move {
            if run_on_start {
                run_once(task_id, &records, &callback).await;
            }
            loop {
                let Some(next) = schedule.upcoming(tz).next() else {
                    warn!(task_id = %task_id, "cron schedule has no further fire times");
                    return;
                };
                let now = Utc::now().with_timezone(&tz);
                let delay = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
                tokio::time::sleep(delay).await;
                run_once(task_id, &records, &callback).await;
            }
        });

        self.running.write().await.insert(
            task_id,
            RunningTaskHandle(RunningTask { rule_name, handle }),
        );

        Ok(task_id)
    }

    /// Unregister one task. Idempotent: unregistering an unknown id is a
    /// no-op, not an error.
    pub async fn unregister_schedule(&self, task_id: Uuid) {
        if let Some(running) = self.running.write().await.remove(&task_id) {
            running.0.handle.abort();
        }
        self.records.write().await.remove(&task_id);
    }

    /// Unregister every task belonging to a rule. Idempotent.
    pub async fn unregister_all_for_rule(&self, rule_name: &str) {
        let ids: Vec<Uuid> = self
            .running
            .read()
            .await
            .iter()
            .filter(|(_, r)| r.0.rule_name == rule_name)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.unregister_schedule(id).await;
        }
    }

    /// Snapshot of a task's bookkeeping, for status reporting.
    pub async fn task(&self, task_id: Uuid) -> Option<ScheduledTaskRecord> {
        self.records.read().await.get(&task_id).cloned()
    }

    /// Snapshot of every registered task.
    pub async fn all_tasks(&self) -> Vec<ScheduledTaskRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Abort every running task and clear all bookkeeping.
    pub async fn shutdown(&self) {
        for (_, running) in self.running.write().await.drain() {
            running.0.handle.abort();
        }
        self.records.write().await.clear();
    }
}

async fn run_once(
    task_id: Uuid,
    records: &Arc<RwLock<HashMap<Uuid, ScheduledTaskRecord>>>,
    callback: &ScheduleCallback,
) {
    let start = Utc::now();
    let result = callback().await;
    let mut records = records.write().await;
    let Some(record) = records.get_mut(&task_id) else {
        return;
    };
    match result {
        Ok(()) => {
            info!(task_id = %task_id, rule_name = %record.rule_name, "scheduled task completed");
            record.record_success(start);
        }
        Err(e) => {
            error!(task_id = %task_id, rule_name = %record.rule_name, error = %e, "scheduled task failed");
            record.record_failure(start, e.to_string());
        }
    }
}

/// Parse a cron expression, accepting the standard 5-field
/// minute-granularity form (`min hour dom month dow`) used by every rule in
/// this codebase as well as the `cron` crate's native 6/7-field form with
/// seconds (and an optional trailing year).
fn parse_cron(expression: &str) -> Result<Schedule> {
    let field_count = expression.split_whitespace().count();
    let normalized = if field_count == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    };

    Schedule::from_str(&normalized).map_err(|e| {
        DomainError::InvalidCronExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn parse_timezone(name: &str) -> Result<Tz> {
    Tz::from_str(name).map_err(|e| {
        DomainError::InvalidValue {
            field: "timezone",
            reason: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_callback() -> (ScheduleCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let callback: ScheduleCallback = Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
        (callback, count)
    }

    #[tokio::test]
    async fn rejects_invalid_cron_expression() {
        let scheduler = Scheduler::new();
        let (callback, _count) = counting_callback();
        let result = scheduler
            .register_schedule(
                "bad-rule",
                ScheduleConfig {
                    cron_expression: "not a cron expression".into(),
                    description: "broken".into(),
                    timezone: None,
                    run_on_start: false,
                },
                callback,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_invalid_timezone() {
        let scheduler = Scheduler::new();
        let (callback, _count) = counting_callback();
        let result = scheduler
            .register_schedule(
                "bad-tz",
                ScheduleConfig {
                    cron_expression: "0 0 0 * * *".into(),
                    description: "broken tz".into(),
                    timezone: Some("Not/A/Zone".into()),
                    run_on_start: false,
                },
                callback,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_on_start_fires_immediately() {
        let scheduler = Scheduler::new();
        let (callback, count) = counting_callback();
        let task_id = scheduler
            .register_schedule(
                "run-on-start-rule",
                ScheduleConfig {
                    cron_expression: "0 0 0 1 1 * 2099".into(),
                    description: "far future".into(),
                    timezone: None,
                    run_on_start: true,
                },
                callback,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let record = scheduler.task(task_id).await.unwrap();
        assert_eq!(record.execution_count, 1);
        assert!(record.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_callback_records_error_without_unregistering() {
        let scheduler = Scheduler::new();
        let callback: ScheduleCallback = Arc::new(|| {
            Box::pin(async {
                Err(DomainError::Conflict("boom".to_string()).into())
            })
        });
        let task_id = scheduler
            .register_schedule(
                "failing-rule",
                ScheduleConfig {
                    cron_expression: "0 0 0 1 1 * 2099".into(),
                    description: "always fails".into(),
                    timezone: None,
                    run_on_start: true,
                },
                callback,
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let record = scheduler.task(task_id).await.unwrap();
        assert_eq!(record.execution_count, 1);
        assert_eq!(record.last_error.as_deref(), Some(DomainError::Conflict("boom".to_string()).to_string().as_str()));
    }

    #[tokio::test]
    async fn unregister_schedule_is_idempotent() {
        let scheduler = Scheduler::new();
        let (callback, _count) = counting_callback();
        let task_id = scheduler
            .register_schedule(
                "rule",
                ScheduleConfig {
                    cron_expression: "0 0 0 1 1 * 2099".into(),
                    description: "d".into(),
                    timezone: None,
                    run_on_start: false,
                },
                callback,
            )
            .await
            .unwrap();

        scheduler.unregister_schedule(task_id).await;
        assert!(scheduler.task(task_id).await.is_none());
        scheduler.unregister_schedule(task_id).await;
    }

    #[tokio::test]
    async fn unregister_all_for_rule_removes_every_matching_task() {
        let scheduler = Scheduler::new();
        let (callback_a, _) = counting_callback();
        let (callback_b, _) = counting_callback();
        let far_future = ScheduleConfig {
            cron_expression: "0 0 0 1 1 * 2099".into(),
            description: "d".into(),
            timezone: None,
            run_on_start: false,
        };

        scheduler
            .register_schedule("shared-rule", far_future.clone(), callback_a)
            .await
            .unwrap();
        scheduler
            .register_schedule("shared-rule", far_future, callback_b)
            .await
            .unwrap();

        assert_eq!(scheduler.all_tasks().await.len(), 2);
        scheduler.unregister_all_for_rule("shared-rule").await;
        assert!(scheduler.all_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn shutdown_clears_all_tasks() {
        let scheduler = Scheduler::new();
        let (callback, _count) = counting_callback();
        scheduler
            .register_schedule(
                "rule",
                ScheduleConfig {
                    cron_expression: "0 0 0 1 1 * 2099".into(),
                    description: "d".into(),
                    timezone: None,
                    run_on_start: false,
                },
                callback,
            )
            .await
            .unwrap();

        scheduler.shutdown().await;
        assert!(scheduler.all_tasks().await.is_empty());
    }
}
