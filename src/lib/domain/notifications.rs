//! Notifications module.

mod config;
mod errors;
mod notifier;
mod service;
mod watchdog;

pub use config::NotifierConfig;
pub use errors::NotifierError;
pub use notifier::Notifier;
pub use service::{MailDispatcher, NotificationService, DEFAULT_ADMIN_SUBJECT};
pub use watchdog::{
    Clock, ExpiryWatchdog, ReminderPolicy, SystemClock, WatchdogHandle, DEFAULT_CHECK_INTERVAL,
    WARNING_AFTER_DAYS,
};
