#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Command-line front end for the relay notifier

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_notifier::{
    domain::{
        communication::mailer::ContentType,
        notifications::{NotificationService, Notifier, NotifierConfig, DEFAULT_ADMIN_SUBJECT},
    },
    infrastructure::email::smtp::{SMTPConfig, SMTPMailer},
};
use tokio::signal;
use tracing::{debug, info};

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// The relay configuration
    #[clap(flatten)]
    pub smtp: SMTPConfig,

    /// The notifier configuration
    #[clap(flatten)]
    pub notifier: NotifierConfig,

    /// What to do once connected
    #[command(subcommand)]
    pub command: Command,
}

/// Actions
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a message to users
    Send {
        /// Recipients, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        to: Vec<String>,

        /// The subject line
        #[arg(long)]
        subject: String,

        /// The message body
        #[arg(long)]
        body: String,

        /// text/plain or text/html
        #[arg(long, default_value = "text/plain")]
        content_type: ContentType,
    },

    /// Send a notification to the administrators
    Admin {
        /// The subject line
        #[arg(long, default_value = DEFAULT_ADMIN_SUBJECT)]
        subject: String,

        /// The notification text
        content: String,
    },

    /// Keep running and remind the administrators before the password expires
    Watch,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mailer = SMTPMailer::new(args.smtp);
    let account = mailer.account().to_string();

    let notifier = Notifier::connect(&args.notifier, &account, mailer).await?;

    match args.command {
        Command::Send {
            to,
            subject,
            body,
            content_type,
        } => {
            notifier
                .send_to_recipients(&to, &subject, &body, content_type)
                .await?;
        }
        Command::Admin { subject, content } => {
            notifier.send_to_admins(&content, &subject).await?;
        }
        Command::Watch => {
            info!("watching password expiry for {account}");

            shutdown_signal().await;
        }
    }

    notifier.shutdown().await;

    Ok(())
}

#[mutants::skip]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    debug!("shutting down gracefully");
}
