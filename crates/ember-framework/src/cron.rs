//! Interval and time-of-day job scheduling, driven by timer events.
//!
//! The scheduler owns no clock. Every [`Event::Timer`] carries the current
//! local timestamp, and [`CronScheduler::tick`] evaluates each registered
//! job's due condition against it:
//!
//! - **Interval** jobs are due when they never ran or when
//!   `now - last_run >= interval`.
//! - **Daily** jobs are due once `now`'s wall clock reaches the configured
//!   `HH:MM`, at most once per local calendar day; sub-minute tick
//!   resolution never double-fires them.
//!
//! Firing is "no earlier than due, on the first tick at or after due";
//! callers needing tighter precision run a tighter timer. Jobs due on the
//! same tick run sequentially in registration order, and a failing callback
//! is logged with the job's name without blocking the others. `last_run` is
//! stamped when a job is selected, so a failing daily job does not retry on
//! every later tick of the same day.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, error};

use ember_core::{ConfigError, HandlerResult};

/// Type of a scheduled job callback.
pub type JobCallback = Arc<dyn Fn() -> BoxFuture<'static, HandlerResult> + Send + Sync>;

// ============================================================================
// JobSpec
// ============================================================================

/// Raw schedule request: exactly one of the two fields must be set.
///
/// Kept as a pair of options (rather than an enum) so a malformed request
/// (both set, neither set, out-of-range wall clock) surfaces as a
/// [`ConfigError::InvalidJobSpec`] at registration time instead of being
/// unrepresentable-but-unreportable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSpec {
    /// Fire every `interval`, starting with the first tick after
    /// registration.
    pub interval: Option<Duration>,
    /// Fire once per day when the local wall clock reaches `(hour, minute)`.
    pub time_of_day: Option<(u32, u32)>,
}

impl JobSpec {
    /// An interval schedule.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Self::default()
        }
    }

    /// A daily schedule at the given local wall-clock minute.
    pub fn daily(hour: u32, minute: u32) -> Self {
        Self {
            time_of_day: Some((hour, minute)),
            ..Self::default()
        }
    }

    fn validate(&self, job: &str) -> Result<Schedule, ConfigError> {
        match (self.interval, self.time_of_day) {
            (Some(_), Some(_)) => Err(ConfigError::InvalidJobSpec {
                job: job.to_string(),
                reason: "both interval and time_of_day are set".into(),
            }),
            (None, None) => Err(ConfigError::InvalidJobSpec {
                job: job.to_string(),
                reason: "neither interval nor time_of_day is set".into(),
            }),
            (Some(interval), None) => {
                if interval.is_zero() {
                    return Err(ConfigError::InvalidJobSpec {
                        job: job.to_string(),
                        reason: "interval must be non-zero".into(),
                    });
                }
                Ok(Schedule::Every(interval))
            }
            (None, Some((hour, minute))) => {
                let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
                    ConfigError::InvalidJobSpec {
                        job: job.to_string(),
                        reason: format!("'{hour:02}:{minute:02}' is not a wall-clock time"),
                    }
                })?;
                Ok(Schedule::Daily(time))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Schedule {
    Every(Duration),
    Daily(NaiveTime),
}

struct CronJob {
    name: String,
    schedule: Schedule,
    last_run: Option<DateTime<Local>>,
    callback: JobCallback,
}

impl CronJob {
    fn is_due(&self, now: DateTime<Local>) -> bool {
        match self.schedule {
            Schedule::Every(interval) => match self.last_run {
                None => true,
                Some(last_run) => {
                    (now - last_run).to_std().map_or(false, |gap| gap >= interval)
                }
            },
            Schedule::Daily(time) => {
                let reached = now.time() >= time;
                let ran_today = self
                    .last_run
                    .is_some_and(|last_run| last_run.date_naive() == now.date_naive());
                reached && !ran_today
            }
        }
    }
}

// ============================================================================
// CronScheduler
// ============================================================================

/// Registry of scheduled jobs, evaluated on every timer tick.
#[derive(Default)]
pub struct CronScheduler {
    jobs: Mutex<Vec<CronJob>>,
}

impl CronScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `name` with the given schedule.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidJobSpec`] when `spec` sets both or neither
    /// schedule field, a zero interval, or an out-of-range wall-clock time.
    pub fn register_job(
        &self,
        name: impl Into<String>,
        spec: JobSpec,
        callback: JobCallback,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        let schedule = spec.validate(&name)?;
        debug!(job = %name, schedule = ?schedule, "Cron job registered");
        self.jobs.lock().push(CronJob {
            name,
            schedule,
            last_run: None,
            callback,
        });
        Ok(())
    }

    /// Number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Evaluates every job against `now` and runs the due ones sequentially
    /// in registration order.
    pub async fn tick(&self, now: DateTime<Local>) {
        // Select due jobs and stamp last_run under the lock, then run the
        // callbacks without it.
        let due: Vec<(String, JobCallback)> = {
            let mut jobs = self.jobs.lock();
            jobs.iter_mut()
                .filter(|job| job.is_due(now))
                .map(|job| {
                    job.last_run = Some(now);
                    (job.name.clone(), Arc::clone(&job.callback))
                })
                .collect()
        };

        for (name, callback) in due {
            debug!(job = %name, "Running cron job");
            if let Err(e) = callback().await {
                error!(job = %name, error = %e, "Cron job failed");
            }
        }
    }
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("jobs", &self.job_count())
            .finish()
    }
}
