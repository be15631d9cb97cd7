use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, Utc};
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;
pub type Task = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Runs immediately, then every period.
    Interval { every: Duration },
    /// Runs at the next occurrence of a wall-clock time in a fixed UTC
    /// offset, then every 24h from that anchor.
    DailyAt {
        hour: u8,
        minute: u8,
        utc_offset_hours: i8,
    },
}

struct JobHandle {
    trigger: Trigger,
    timer: JoinHandle<()>,
}

/// Named recurring jobs over independent tokio timers. Registration is
/// idempotent per name: starting a job that already exists replaces its
/// timers instead of stacking them.
#[derive(Default)]
pub struct Scheduler {
    jobs: RwLock<HashMap<String, JobHandle>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start_job(&self, name: &str, trigger: Trigger, task: Task) {
        // Cancel any prior timers under this name first
        self.stop_job(name).await;

        let timer = match trigger {
            Trigger::Interval { every } => Self::spawn_interval(name.to_string(), every, task),
            Trigger::DailyAt {
                hour,
                minute,
                utc_offset_hours,
            } => Self::spawn_daily(name.to_string(), hour, minute, utc_offset_hours, task),
        };

        let mut jobs = self.jobs.write().await;
        jobs.insert(name.to_string(), JobHandle { trigger, timer });
        tracing::info!(job = name, "Scheduled job");
    }

    /// Cancels the named job's timers. An invocation already in flight runs
    /// to completion; no further invocations occur.
    pub async fn stop_job(&self, name: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(handle) = jobs.remove(name) {
            handle.timer.abort();
            tracing::info!(job = name, "Stopped job");
        }
    }

    pub async fn stop_all(&self) {
        let mut jobs = self.jobs.write().await;
        for (name, handle) in jobs.drain() {
            handle.timer.abort();
            tracing::debug!(job = %name, "Stopped job");
        }
    }

    pub async fn is_scheduled(&self, name: &str) -> bool {
        self.jobs.read().await.contains_key(name)
    }

    pub async fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.jobs.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn trigger_for(&self, name: &str) -> Option<Trigger> {
        self.jobs.read().await.get(name).map(|j| j.trigger)
    }

    fn spawn_interval(name: String, every: Duration, task: Task) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately
                ticker.tick().await;
                Self::run_once(&name, &task).await;
            }
        })
    }

    fn spawn_daily(
        name: String,
        hour: u8,
        minute: u8,
        utc_offset_hours: i8,
        task: Task,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut next = next_daily_occurrence(Utc::now(), hour, minute, utc_offset_hours);
            loop {
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                Self::run_once(&name, &task).await;
                // Recurs every 24h from the anchor, not from completion
                next = next + ChronoDuration::hours(24);
            }
        })
    }

    /// One firing. The body executes in its own task so aborting the timer
    /// never kills an in-flight invocation; the timer awaits completion so
    /// at most one body runs per job at a time. Task errors are logged and
    /// never cancel the schedule.
    async fn run_once(name: &str, task: &Task) {
        let fut = task();
        let job = name.to_string();
        let invocation = tokio::spawn(async move {
            if let Err(e) = fut.await {
                tracing::error!(job = %job, "Job invocation failed: {}", e);
            }
        });
        let _ = invocation.await;
    }
}

/// Next firing of a daily anchor: the configured time-of-day in the fixed
/// UTC offset, today if still ahead, otherwise tomorrow.
fn next_daily_occurrence(
    now: DateTime<Utc>,
    hour: u8,
    minute: u8,
    utc_offset_hours: i8,
) -> DateTime<Utc> {
    let offset = FixedOffset::east_opt(utc_offset_hours as i32 * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let target = NaiveTime::from_hms_opt(hour as u32, minute as u32, 0).unwrap_or_default();

    let local_now = now.with_timezone(&offset);
    let mut candidate = match local_now.date_naive().and_time(target).and_local_timezone(offset) {
        chrono::LocalResult::Single(dt) => dt,
        // Fixed offsets have no gaps or folds; this arm is unreachable
        _ => local_now,
    };

    if candidate <= local_now {
        candidate = candidate + ChronoDuration::days(1);
    }

    candidate.with_timezone(&Utc)
}
