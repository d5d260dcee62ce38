// lib/src/scheduler.rs
//! Reminder scans over upcoming appointments.
//!
//! Two loops run on their own tokio tasks: a daily scan at a fixed local hour
//! for appointments dated tomorrow, and an hourly scan for appointments
//! starting within the next 24 hours. Both only count and log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, NaiveTime, TimeZone, Timelike, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use clinic_models::schedule::slot_start;
use clinic_models::{Appointment, ValidationError};

use crate::errors::ServiceResult;
use crate::storage_engine::{AppointmentStorageEngine, ClinicStorage};

pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
pub const DEFAULT_DAILY_HOUR: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Offset of the clinic's local time from UTC, in minutes.
    pub utc_offset_minutes: i32,
    /// Local hour of the daily scan.
    pub daily_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig { utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES, daily_hour: DEFAULT_DAILY_HOUR }
    }
}

pub struct ReminderScheduler {
    storage: Arc<dyn ClinicStorage>,
    offset: FixedOffset,
    daily_hour: u32,
    started: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(storage: Arc<dyn ClinicStorage>, config: SchedulerConfig) -> ServiceResult<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or(ValidationError::OutOfRange {
            field: "scheduler UTC offset (minutes)",
            value: config.utc_offset_minutes as i64,
        })?;
        if config.daily_hour > 23 {
            return Err(ValidationError::OutOfRange { field: "daily reminder hour", value: config.daily_hour as i64 }.into());
        }
        Ok(ReminderScheduler {
            storage,
            offset,
            daily_hour: config.daily_hour,
            started: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the scan loops. Returns `false`, spawning nothing, if they are
    /// already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Reminder scheduler already started");
            return false;
        }
        let daily = {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                loop {
                    let wait = until_next_daily(Utc::now().with_timezone(&scheduler.offset), scheduler.daily_hour);
                    tokio::time::sleep(wait).await;
                    match scheduler.count_due_tomorrow(Utc::now()).await {
                        Ok(count) => info!("Found {} appointments for tomorrow (reminders are log-only)", count),
                        Err(e) => error!("Daily reminder scan failed: {}", e),
                    }
                }
            })
        };
        let hourly = {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(until_next_hour(Utc::now().with_timezone(&scheduler.offset))).await;
                    match scheduler.count_starting_within_day(Utc::now()).await {
                        Ok(count) => info!("Found {} appointments in the next 24 hours (reminders are log-only)", count),
                        Err(e) => error!("Hourly reminder scan failed: {}", e),
                    }
                }
            })
        };
        if let Ok(mut handles) = self.handles.lock() {
            handles.push(daily);
            handles.push(hourly);
        }
        info!("Reminder scheduler started (UTC{}, daily at {:02}:00)", self.offset, self.daily_hour);
        true
    }

    /// Aborts the scan loops. A stopped scheduler cannot be restarted.
    pub fn stop(&self) {
        if let Ok(mut handles) = self.handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Pending or confirmed appointments dated tomorrow in local time.
    pub async fn count_due_tomorrow(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        let tomorrow = now.with_timezone(&self.offset).date_naive() + ChronoDuration::days(1);
        let appointments = self.storage.list_appointments().await?;
        Ok(appointments
            .iter()
            .filter(|a| a.status.is_upcoming() && a.date == tomorrow)
            .count())
    }

    /// Pending or confirmed appointments starting in `[now, now + 24h]`.
    pub async fn count_starting_within_day(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        let horizon = now + ChronoDuration::hours(24);
        let appointments = self.storage.list_appointments().await?;
        Ok(appointments
            .iter()
            .filter(|a| a.status.is_upcoming())
            .filter(|a| {
                let start = self.start_instant(a);
                start >= now && start <= horizon
            })
            .count())
    }

    fn start_instant(&self, appointment: &Appointment) -> DateTime<Utc> {
        let local = slot_start(appointment.date, &appointment.time);
        // A fixed offset maps every local time to exactly one instant.
        match self.offset.from_local_datetime(&local).single() {
            Some(start) => start.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&local),
        }
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Time left until the next `hour:00` local, strictly in the future.
fn until_next_daily(now: DateTime<FixedOffset>, hour: u32) -> Duration {
    let target_time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut target = now.date_naive().and_time(target_time);
    if target <= now.naive_local() {
        target += ChronoDuration::days(1);
    }
    (target - now.naive_local()).to_std().unwrap_or(Duration::from_secs(60))
}

/// Time left until the top of the next local hour.
fn until_next_hour(now: DateTime<FixedOffset>) -> Duration {
    let into_hour = now.minute() as u64 * 60 + now.second() as u64;
    Duration::from_secs(3600 - into_hour)
}
