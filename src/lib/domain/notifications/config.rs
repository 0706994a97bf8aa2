//! Notifier configuration

use std::time::Duration;

use clap::{ArgAction, Parser};

use super::ReminderPolicy;

/// Notifier configuration
#[derive(Clone, Debug, Parser)]
pub struct NotifierConfig {
    /// Administrator addresses, comma separated
    #[arg(long = "admin", env = "NOTIFY_ADMINS", value_delimiter = ',')]
    pub admins: Vec<String>,

    /// The date the relay password was set, as YYYY-MM-DD
    #[arg(long, env = "NOTIFY_BASELINE_DATE")]
    pub baseline_date: String,

    /// Redirect every outgoing message to the administrators
    #[arg(long, env = "NOTIFY_DEBUG", default_value_t = false, action = ArgAction::Set)]
    pub debug: bool,

    /// The sender address; derived from the account when absent
    #[arg(long, env = "SMTP_SENDER")]
    pub sender: Option<String>,

    /// Domain appended to addresses without an `@`
    #[arg(long, env = "NOTIFY_DEFAULT_DOMAIN")]
    pub default_domain: Option<String>,

    /// Seconds between two password expiry checks
    #[arg(long, env = "NOTIFY_CHECK_INTERVAL_SECS", default_value_t = 86_400)]
    pub check_interval_secs: u64,

    /// Stop reminding after this many expiry notifications
    #[arg(long, env = "NOTIFY_MAX_REMINDERS")]
    pub max_reminders: Option<u32>,
}

impl NotifierConfig {
    /// The interval between two expiry checks
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    /// How often the expiry reminder may be repeated
    pub fn reminder_policy(&self) -> ReminderPolicy {
        match self.max_reminders {
            Some(max) => ReminderPolicy::Limited(max),
            None => ReminderPolicy::Repeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_args() {
        let config = NotifierConfig::parse_from([
            "notifier",
            "--admin",
            "a@example.com, b@example.com",
            "--baseline-date",
            "2024-01-31",
            "--max-reminders",
            "1",
        ]);

        assert_eq!(config.admins, vec!["a@example.com", " b@example.com"]);
        assert_eq!(config.baseline_date, "2024-01-31");
        assert!(!config.debug);
        assert_eq!(config.check_interval(), Duration::from_secs(86_400));
        assert_eq!(config.reminder_policy(), ReminderPolicy::Limited(1));
    }

    #[test]
    fn test_reminders_repeat_by_default() {
        let config = NotifierConfig::parse_from([
            "notifier",
            "--admin",
            "a@example.com",
            "--baseline-date",
            "2024-01-31",
            "--debug",
            "true",
        ]);

        assert!(config.debug);
        assert_eq!(config.reminder_policy(), ReminderPolicy::Repeat);
    }
}
