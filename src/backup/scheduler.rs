//! Scheduled backups
//!
//! Keeps the schedule in the `scheduledBackupSettings` slot and runs a backup
//! whenever one is due. Checks happen when the app comes to the foreground
//! and on a fixed interval while it stays there; nothing runs in the
//! background.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::manager::BackupManager;
use crate::error::{InoutError, InoutResult};
use crate::storage::kv::{get_json, keys, set_json, KeyValueStore};
use crate::transport::{AuthProvider, BackupTarget, TransportOutcome};

/// How often a backup should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl BackupFrequency {
    pub fn days(self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for BackupFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// Where scheduled backups go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMethod {
    #[default]
    #[serde(alias = "google-drive")]
    Cloud,
    #[serde(alias = "email")]
    Share,
    Both,
}

impl BackupMethod {
    pub fn uses_cloud(self) -> bool {
        matches!(self, Self::Cloud | Self::Both)
    }

    pub fn uses_share(self) -> bool {
        matches!(self, Self::Share | Self::Both)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cloud" => Some(Self::Cloud),
            "share" => Some(Self::Share),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

impl fmt::Display for BackupMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud => write!(f, "cloud"),
            Self::Share => write!(f, "share"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Persisted schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    pub enabled: bool,
    pub frequency: BackupFrequency,
    pub method: BackupMethod,
    pub last_backup_date: Option<DateTime<Utc>>,
    pub next_backup_date: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_date: Option<DateTime<Utc>>,
}

impl ScheduleSettings {
    /// Whether the most recent attempt failed outright
    fn failed_last(&self) -> bool {
        match (self.last_error_date, self.last_backup_date) {
            (Some(error_at), Some(backup_at)) => error_at > backup_at,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// A backup is due when enough time has passed since the last one, or when
/// there never was one. A disabled schedule is never due.
pub fn is_backup_due(settings: &ScheduleSettings, now: DateTime<Utc>) -> bool {
    if !settings.enabled {
        return false;
    }
    match settings.last_backup_date {
        None => true,
        Some(last) => now - last >= Duration::days(settings.frequency.days()),
    }
}

pub fn next_backup_date(frequency: BackupFrequency, from: DateTime<Utc>) -> DateTime<Utc> {
    from + Duration::days(frequency.days())
}

/// What the scheduler is doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Disabled,
    Idle,
    Due,
    Running,
    /// Last attempt failed; the schedule stays enabled
    Error(String),
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Idle => write!(f, "idle"),
            Self::Due => write!(f, "due"),
            Self::Running => write!(f, "running"),
            Self::Error(e) => write!(f, "error ({})", e),
        }
    }
}

/// Outcome of one scheduled run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledRun {
    /// Not due, or another run was in progress
    Skipped,
    /// At least one destination took the backup; `note` lists the others
    Completed { note: Option<String> },
    Failed(String),
}

/// Whether the app is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Foreground,
    Background,
}

/// Runs backups according to the persisted schedule
pub struct BackupScheduler {
    kv: Arc<dyn KeyValueStore>,
    backups: Arc<BackupManager>,
    cloud: Option<(Arc<dyn BackupTarget>, Arc<dyn AuthProvider>)>,
    share: Option<Arc<dyn BackupTarget>>,
    poll_interval: StdDuration,
    running: AtomicBool,
}

impl BackupScheduler {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        backups: Arc<BackupManager>,
        poll_interval: StdDuration,
    ) -> Self {
        Self {
            kv,
            backups,
            cloud: None,
            share: None,
            poll_interval,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_cloud(mut self, target: Arc<dyn BackupTarget>, auth: Arc<dyn AuthProvider>) -> Self {
        self.cloud = Some((target, auth));
        self
    }

    pub fn with_share(mut self, target: Arc<dyn BackupTarget>) -> Self {
        self.share = Some(target);
        self
    }

    pub async fn settings(&self) -> InoutResult<ScheduleSettings> {
        match get_json(self.kv.as_ref(), keys::SCHEDULED_BACKUP_SETTINGS).await {
            Ok(settings) => Ok(settings.unwrap_or_default()),
            Err(InoutError::Json(e)) => {
                warn!(error = %e, "unreadable schedule settings, using defaults");
                Ok(ScheduleSettings::default())
            }
            Err(e) => Err(e),
        }
    }

    async fn save_settings(&self, settings: &ScheduleSettings) -> InoutResult<()> {
        set_json(self.kv.as_ref(), keys::SCHEDULED_BACKUP_SETTINGS, settings).await
    }

    async fn cloud_signed_in(&self) -> bool {
        match &self.cloud {
            Some((_, auth)) => matches!(auth.current_user().await, Ok(Some(_))),
            None => false,
        }
    }

    /// Turn the schedule on
    ///
    /// Methods that include the cloud need a signed-in user.
    pub async fn enable(
        &self,
        frequency: BackupFrequency,
        method: BackupMethod,
        now: DateTime<Utc>,
    ) -> InoutResult<ScheduleSettings> {
        if method.uses_cloud() && !self.cloud_signed_in().await {
            return Err(InoutError::SignInRequired);
        }

        let mut settings = self.settings().await?;
        settings.enabled = true;
        settings.frequency = frequency;
        settings.method = method;
        settings.next_backup_date = Some(match settings.last_backup_date {
            Some(last) => next_backup_date(frequency, last),
            None => now,
        });
        self.save_settings(&settings).await?;
        info!(%frequency, %method, "scheduled backups enabled");
        Ok(settings)
    }

    pub async fn disable(&self) -> InoutResult<ScheduleSettings> {
        let mut settings = self.settings().await?;
        settings.enabled = false;
        settings.next_backup_date = None;
        self.save_settings(&settings).await?;
        info!("scheduled backups disabled");
        Ok(settings)
    }

    pub async fn update_frequency(
        &self,
        frequency: BackupFrequency,
        now: DateTime<Utc>,
    ) -> InoutResult<ScheduleSettings> {
        let mut settings = self.settings().await?;
        settings.frequency = frequency;
        if settings.enabled {
            settings.next_backup_date = Some(next_backup_date(
                frequency,
                settings.last_backup_date.unwrap_or(now),
            ));
        }
        self.save_settings(&settings).await?;
        Ok(settings)
    }

    pub async fn status(&self, now: DateTime<Utc>) -> InoutResult<SchedulerState> {
        let settings = self.settings().await?;
        if !settings.enabled {
            return Ok(SchedulerState::Disabled);
        }
        if self.running.load(Ordering::SeqCst) {
            return Ok(SchedulerState::Running);
        }
        if settings.failed_last() {
            if let Some(error) = settings.last_error {
                return Ok(SchedulerState::Error(error));
            }
        }
        if is_backup_due(&settings, now) {
            return Ok(SchedulerState::Due);
        }
        Ok(SchedulerState::Idle)
    }

    /// Back up now if due, or regardless when `force` is set
    pub async fn perform(&self, now: DateTime<Utc>, force: bool) -> InoutResult<ScheduledRun> {
        let settings = self.settings().await?;
        if !settings.enabled {
            return Err(InoutError::Config("Scheduled backup is not enabled".into()));
        }
        if !force && !is_backup_due(&settings, now) {
            debug!("backup not due yet");
            return Ok(ScheduledRun::Skipped);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("backup already running");
            return Ok(ScheduledRun::Skipped);
        }

        let run = self.run_backup(settings, now).await;
        self.running.store(false, Ordering::SeqCst);
        run
    }

    /// Back up immediately, due or not
    pub async fn trigger_manual(&self, now: DateTime<Utc>) -> InoutResult<ScheduledRun> {
        self.perform(now, true).await
    }

    async fn run_backup(
        &self,
        mut settings: ScheduleSettings,
        now: DateTime<Utc>,
    ) -> InoutResult<ScheduledRun> {
        let mut delivered = false;
        let mut errors = Vec::new();

        match self.backups.create_backup(now).await {
            Ok(file) => {
                // The cloud upload removes the local file, so share goes first
                if settings.method.uses_share() {
                    match &self.share {
                        Some(target) => {
                            record(target.name(), target.deliver(&file).await, &mut delivered, &mut errors)
                        }
                        None => errors.push("share: not configured".to_string()),
                    }
                }
                if settings.method.uses_cloud() {
                    let signed_in = self.cloud_signed_in().await;
                    match &self.cloud {
                        Some((target, _)) if signed_in => {
                            record(target.name(), target.deliver(&file).await, &mut delivered, &mut errors)
                        }
                        _ => errors.push("cloud: Not signed in".to_string()),
                    }
                }
            }
            Err(e) => errors.push(e.to_string()),
        }

        if delivered {
            settings.last_backup_date = Some(now);
            settings.next_backup_date = Some(next_backup_date(settings.frequency, now));
            let note = (!errors.is_empty())
                .then(|| format!("Partial success: {}", errors.join(", ")));
            if let Some(note) = &note {
                settings.last_error = Some(note.clone());
                settings.last_error_date = Some(now);
            }
            self.save_settings(&settings).await?;
            info!(next = ?settings.next_backup_date, "scheduled backup completed");
            Ok(ScheduledRun::Completed { note })
        } else {
            let error = if errors.is_empty() {
                "Backup failed".to_string()
            } else {
                errors.join(", ")
            };
            settings.last_error = Some(error.clone());
            settings.last_error_date = Some(now);
            self.save_settings(&settings).await?;
            warn!(%error, "scheduled backup failed");
            Ok(ScheduledRun::Failed(error))
        }
    }

    async fn check_due(&self) {
        match self.perform(Utc::now(), false).await {
            Ok(ScheduledRun::Skipped) => {}
            Ok(run) => debug!(?run, "scheduled check finished"),
            Err(e) => debug!(error = %e, "scheduled check skipped"),
        }
    }

    /// Drive the schedule until `shutdown` resolves
    ///
    /// Checks once at start if in the foreground, on every switch to the
    /// foreground, and on each poll tick while in the foreground.
    pub async fn run<F>(&self, mut lifecycle: watch::Receiver<AppLifecycle>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        if *lifecycle.borrow_and_update() == AppLifecycle::Foreground {
            self.check_due().await;
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = lifecycle.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *lifecycle.borrow_and_update();
                    if state == AppLifecycle::Foreground {
                        debug!("app in foreground, checking schedule");
                        self.check_due().await;
                    }
                }
                _ = ticker.tick() => {
                    if *lifecycle.borrow() == AppLifecycle::Foreground {
                        self.check_due().await;
                    }
                }
            }
        }
        debug!("scheduler stopped");
    }
}

fn record(name: &str, outcome: TransportOutcome, delivered: &mut bool, errors: &mut Vec<String>) {
    match outcome {
        TransportOutcome::Succeeded => *delivered = true,
        TransportOutcome::Cancelled => errors.push(format!("{}: cancelled", name)),
        TransportOutcome::Failed(reason) => errors.push(format!("{}: {}", name, reason)),
    }
}
