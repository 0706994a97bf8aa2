//! Notifier bound to a relay

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::domain::communication::{
    email_addresses::{normalize_addresses, EmailAddress, EmailAddressError},
    mailer::{ContentType, Mailer},
};

use super::{
    Clock, ExpiryWatchdog, MailDispatcher, NotificationService, NotifierConfig, NotifierError,
    SystemClock, WatchdogHandle,
};

lazy_static! {
    static ref DATE_REGEX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

/// Sends notifications through a relay and watches its password expiry.
///
/// A notifier only exists once the relay accepted the credentials. Dropping
/// it stops the expiry watchdog.
#[derive(Debug)]
pub struct Notifier<M>
where
    M: Mailer,
{
    dispatcher: Arc<MailDispatcher<M>>,
    baseline: NaiveDate,
    watchdog: WatchdogHandle,
}

impl<M> Notifier<M>
where
    M: Mailer,
{
    /// Validates `config`, probes the relay and starts the expiry watchdog.
    ///
    /// # Arguments
    /// * `config` - The [`NotifierConfig`].
    /// * `account` - The relay account the credentials belong to.
    /// * `mailer` - The [`Mailer`] to deliver through.
    ///
    /// # Returns
    /// The connected [`Notifier`], or a [`NotifierError::Configuration`] /
    /// [`NotifierError::Connectivity`] describing why it could not be created.
    pub async fn connect(
        config: &NotifierConfig,
        account: &str,
        mailer: M,
    ) -> Result<Self, NotifierError> {
        Self::connect_with_clock(config, account, mailer, SystemClock).await
    }

    /// Same as [`Notifier::connect`], reading the time from `clock`.
    pub async fn connect_with_clock<C: Clock>(
        config: &NotifierConfig,
        account: &str,
        mailer: M,
        clock: C,
    ) -> Result<Self, NotifierError> {
        let baseline = parse_baseline(&config.baseline_date)?;

        let admins = normalize_addresses(&config.admins, config.default_domain.as_deref())
            .map_err(|e| {
                NotifierError::Configuration(format!("invalid administrator address: {e}"))
            })?;

        if admins.is_empty() {
            return Err(NotifierError::Configuration(
                "no administrators configured".to_string(),
            ));
        }

        let sender = resolve_sender(
            config.sender.as_deref(),
            account,
            config.default_domain.as_deref(),
        )?;

        mailer.probe().await.map_err(NotifierError::Connectivity)?;

        info!("connected to the mail relay as {account}, sending from {sender}");

        let dispatcher = Arc::new(MailDispatcher::new(
            Arc::new(mailer),
            sender,
            admins,
            config.default_domain.clone(),
            config.debug,
        ));

        let watchdog = ExpiryWatchdog::new(dispatcher.clone(), clock, account, baseline)
            .with_interval(config.check_interval())
            .with_policy(config.reminder_policy())
            .spawn();

        Ok(Self {
            dispatcher,
            baseline,
            watchdog,
        })
    }

    /// The normalized administrator list
    pub fn admins(&self) -> &[EmailAddress] {
        self.dispatcher.admins()
    }

    /// The address messages are sent from
    pub fn sender(&self) -> &EmailAddress {
        self.dispatcher.sender()
    }

    /// Whether outgoing mail is redirected to the administrators
    pub fn is_debug(&self) -> bool {
        self.dispatcher.is_debug()
    }

    /// The date the relay password was set
    pub fn baseline(&self) -> NaiveDate {
        self.baseline
    }

    /// Stops the expiry watchdog and waits for it to finish
    pub async fn shutdown(self) {
        self.watchdog.shutdown().await;
    }
}

#[async_trait]
impl<M> NotificationService for Notifier<M>
where
    M: Mailer,
{
    async fn send_to_admins(&self, content: &str, subject: &str) -> Result<(), NotifierError> {
        self.dispatcher.send_to_admins(content, subject).await
    }

    async fn send_to_recipients(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
        content_type: ContentType,
    ) -> Result<(), NotifierError> {
        self.dispatcher
            .send_to_recipients(recipients, subject, body, content_type)
            .await
    }
}

fn parse_baseline(raw: &str) -> Result<NaiveDate, NotifierError> {
    let invalid = || {
        NotifierError::Configuration(format!(
            "mail account baseline date `{raw}` must look like 2006-01-02 (YYYY-MM-DD)"
        ))
    };

    if !DATE_REGEX.is_match(raw) {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())
}

/// Picks the sender: the configured one, else the account itself, else the
/// account completed with the default domain.
fn resolve_sender(
    sender: Option<&str>,
    account: &str,
    default_domain: Option<&str>,
) -> Result<EmailAddress, NotifierError> {
    let account = account.trim();

    let sender = match sender.map(str::trim).filter(|sender| !sender.is_empty()) {
        Some(sender) => EmailAddress::new(sender),
        None => normalize_addresses(&[account], default_domain).and_then(|mut addresses| {
            addresses
                .pop()
                .ok_or(EmailAddressError::EmptyEmailAddress)
        }),
    }
    .map_err(|e| NotifierError::Configuration(format!("cannot determine the sender: {e}")))?;

    if account.contains('@') {
        let account_domain = EmailAddress::new(account)
            .map_err(|e| NotifierError::Configuration(format!("invalid account: {e}")))?
            .domain()
            .map(str::to_ascii_lowercase);

        let sender_domain = sender.domain().map(str::to_ascii_lowercase);

        if account_domain != sender_domain {
            return Err(NotifierError::Configuration(format!(
                "sender {sender} is not in the domain of account {account}"
            )));
        }
    }

    Ok(sender)
}
