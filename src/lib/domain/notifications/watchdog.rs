//! Password expiry watchdog
//!
//! Relay accounts have their password expire 180 days after it was set. The
//! watchdog wakes up once per check interval and, once the warning date has
//! passed, reminds the administrators that the password is about to expire.

use std::{sync::Arc, time::Duration};

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::mock;

use super::NotificationService;

/// Days after the baseline date at which reminders start
pub const WARNING_AFTER_DAYS: i64 = 165;

/// Default time between two checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const REMINDER_SUBJECT: &str = "Mail account password expiring";

/// Source of the current local time
pub trait Clock: Send + Sync + 'static {
    /// The current local date and time
    fn now(&self) -> NaiveDateTime;
}

#[cfg(test)]
mock! {
    pub Clock {}

    impl Clock for Clock {
        fn now(&self) -> NaiveDateTime;
    }
}

/// The system's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// How often a reminder may be sent once the warning date has passed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReminderPolicy {
    /// Remind on every check for as long as the process runs
    #[default]
    Repeat,

    /// Remind at most this many times
    Limited(u32),
}

/// Periodically checks whether the relay password is about to expire
#[derive(Debug)]
pub struct ExpiryWatchdog<N, C>
where
    N: NotificationService,
    C: Clock,
{
    notifier: Arc<N>,
    clock: C,
    account: String,
    warn_at: NaiveDateTime,
    interval: Duration,
    policy: ReminderPolicy,
    sent: u32,
}

impl<N, C> ExpiryWatchdog<N, C>
where
    N: NotificationService,
    C: Clock,
{
    /// Creates a watchdog for `account`, whose password was set on `baseline`.
    pub fn new(notifier: Arc<N>, clock: C, account: &str, baseline: NaiveDate) -> Self {
        let warn_at =
            (baseline + TimeDelta::days(WARNING_AFTER_DAYS)).and_time(NaiveTime::default());

        Self {
            notifier,
            clock,
            account: account.to_string(),
            warn_at,
            interval: DEFAULT_CHECK_INTERVAL,
            policy: ReminderPolicy::default(),
            sent: 0,
        }
    }

    /// Sets the time between two checks
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets how often the reminder may be repeated
    pub fn with_policy(mut self, policy: ReminderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The moment after which reminders are sent
    pub fn warn_at(&self) -> NaiveDateTime {
        self.warn_at
    }

    /// The number of reminders sent so far
    #[cfg(test)]
    pub(crate) fn reminders_sent(&self) -> u32 {
        self.sent
    }

    fn exhausted(&self) -> bool {
        match self.policy {
            ReminderPolicy::Repeat => false,
            ReminderPolicy::Limited(max) => self.sent >= max,
        }
    }

    /// Runs a single check, sending a reminder if the warning date has passed.
    ///
    /// Returns `true` if a reminder was sent.
    pub async fn check(&mut self) -> bool {
        if self.exhausted() || self.clock.now() <= self.warn_at {
            return false;
        }

        let content = format!("{} password will expire within 15 days!", self.account);

        match self
            .notifier
            .send_to_admins(&content, REMINDER_SUBJECT)
            .await
        {
            Ok(()) => {
                self.sent += 1;
                info!(reminders = self.sent, "password expiry reminder sent");
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to send password expiry reminder");
                false
            }
        }
    }

    /// Starts the watchdog on the current tokio runtime.
    ///
    /// The first check happens one interval after the call.
    pub fn spawn(self) -> WatchdogHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(token.clone()));

        WatchdogHandle {
            token,
            task: Some(task),
        }
    }

    async fn run(mut self, token: CancellationToken) {
        info!(
            "expiry watchdog started (warning after {}, check interval: {} seconds)",
            self.warn_at,
            self.interval.as_secs()
        );

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("expiry watchdog cancelled");
                    break;
                }
                _ = timer.tick() => {
                    self.check().await;

                    if self.exhausted() {
                        info!("reminder limit reached, stopping expiry watchdog");
                        break;
                    }
                }
            }
        }
    }
}

/// Owns a running [`ExpiryWatchdog`]; dropping it stops the watchdog
#[derive(Debug)]
pub struct WatchdogHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchdogHandle {
    /// Whether the watchdog task has ended
    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the watchdog and waits for it to finish
    pub async fn shutdown(mut self) {
        self.token.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "expiry watchdog ended abnormally");
            }
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::domain::{
        communication::mailer::MailerError,
        notifications::{tests::MockNotificationService, NotifierError},
    };

    use super::*;

    fn baseline() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, 0, 0).unwrap()
    }

    fn fixed_clock(now: NaiveDateTime) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || now);
        clock
    }

    /// A clock that starts at `start` and moves one day forward on every read.
    fn daily_clock(start: NaiveDateTime) -> MockClock {
        let mut now = start;
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || {
            let current = now;
            now += TimeDelta::days(1);
            current
        });
        clock
    }

    #[test]
    fn test_warning_date_is_165_days_after_baseline() {
        let watchdog = ExpiryWatchdog::new(
            Arc::new(MockNotificationService::new()),
            fixed_clock(at(baseline(), 0)),
            "relay",
            baseline(),
        );

        assert_eq!(
            watchdog.warn_at(),
            at(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), 0)
        );
    }

    #[tokio::test]
    async fn test_no_reminder_before_warning_date() {
        let mut notifier = MockNotificationService::new();

        notifier.expect_send_to_admins().times(0);

        let day_before = baseline() + TimeDelta::days(WARNING_AFTER_DAYS - 1);

        let mut watchdog = ExpiryWatchdog::new(
            Arc::new(notifier),
            fixed_clock(at(day_before, 23)),
            "relay",
            baseline(),
        );

        assert!(!watchdog.check().await);
        assert_eq!(watchdog.reminders_sent(), 0);
    }

    #[tokio::test]
    async fn test_reminder_after_warning_date() {
        let mut notifier = MockNotificationService::new();

        notifier
            .expect_send_to_admins()
            .times(1)
            .withf(|content, subject| {
                content == "relay password will expire within 15 days!"
                    && subject == REMINDER_SUBJECT
            })
            .returning(|_, _| Ok(()));

        let warning_day = baseline() + TimeDelta::days(WARNING_AFTER_DAYS);

        let mut watchdog = ExpiryWatchdog::new(
            Arc::new(notifier),
            fixed_clock(at(warning_day, 9)),
            "relay",
            baseline(),
        );

        assert!(watchdog.check().await);
        assert_eq!(watchdog.reminders_sent(), 1);
    }

    #[tokio::test]
    async fn test_repeat_policy_reminds_on_every_check() {
        let mut notifier = MockNotificationService::new();

        notifier
            .expect_send_to_admins()
            .times(5)
            .returning(|_, _| Ok(()));

        let mut watchdog = ExpiryWatchdog::new(
            Arc::new(notifier),
            daily_clock(at(baseline() + TimeDelta::days(WARNING_AFTER_DAYS - 2), 12)),
            "relay",
            baseline(),
        );

        let mut fired = Vec::new();
        for _ in 0..7 {
            fired.push(watchdog.check().await);
        }

        assert_eq!(fired, vec![false, false, true, true, true, true, true]);
    }

    #[tokio::test]
    async fn test_limited_policy_caps_reminders() {
        let mut notifier = MockNotificationService::new();

        notifier
            .expect_send_to_admins()
            .times(2)
            .returning(|_, _| Ok(()));

        let mut watchdog = ExpiryWatchdog::new(
            Arc::new(notifier),
            fixed_clock(at(baseline() + TimeDelta::days(200), 0)),
            "relay",
            baseline(),
        )
        .with_policy(ReminderPolicy::Limited(2));

        for _ in 0..4 {
            watchdog.check().await;
        }

        assert_eq!(watchdog.reminders_sent(), 2);
    }

    #[tokio::test]
    async fn test_failed_reminder_is_not_counted() {
        let mut notifier = MockNotificationService::new();

        notifier.expect_send_to_admins().times(1).returning(|_, _| {
            Err(NotifierError::Delivery(MailerError::Auth(
                "535 authentication failed".to_string(),
            )))
        });

        let mut watchdog = ExpiryWatchdog::new(
            Arc::new(notifier),
            fixed_clock(at(baseline() + TimeDelta::days(200), 0)),
            "relay",
            baseline(),
        )
        .with_policy(ReminderPolicy::Limited(1));

        assert!(!watchdog.check().await);
        assert_eq!(watchdog.reminders_sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_watchdog_reminds_once_per_tick() {
        let reminders = Arc::new(AtomicU32::new(0));
        let counter = reminders.clone();

        let mut notifier = MockNotificationService::new();

        notifier.expect_send_to_admins().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        // first tick reads the day before the warning date
        let handle = ExpiryWatchdog::new(
            Arc::new(notifier),
            daily_clock(at(baseline() + TimeDelta::days(WARNING_AFTER_DAYS - 1), 12)),
            "relay",
            baseline(),
        )
        .spawn();

        tokio::time::sleep(DEFAULT_CHECK_INTERVAL / 2).await;
        assert_eq!(reminders.load(Ordering::SeqCst), 0);

        tokio::time::sleep(DEFAULT_CHECK_INTERVAL).await;
        assert_eq!(reminders.load(Ordering::SeqCst), 0);

        tokio::time::sleep(DEFAULT_CHECK_INTERVAL * 3).await;
        assert_eq!(reminders.load(Ordering::SeqCst), 3);

        assert!(!handle.is_finished());

        handle.shutdown().await;

        tokio::time::sleep(DEFAULT_CHECK_INTERVAL * 2).await;
        assert_eq!(reminders.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_watchdog_stops_when_limit_reached() {
        let mut notifier = MockNotificationService::new();

        notifier
            .expect_send_to_admins()
            .times(1)
            .returning(|_, _| Ok(()));

        let handle = ExpiryWatchdog::new(
            Arc::new(notifier),
            fixed_clock(at(baseline() + TimeDelta::days(300), 0)),
            "relay",
            baseline(),
        )
        .with_interval(Duration::from_secs(60))
        .with_policy(ReminderPolicy::Limited(1));

        let handle = handle.spawn();

        tokio::time::sleep(Duration::from_secs(181)).await;

        assert!(handle.is_finished());
    }
}
