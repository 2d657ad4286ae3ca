//! Command-line surface: argument parsing, command execution, exit status.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::ExchangeError;
use tracing::{error, info};

use crate::crypto::CipherEngine;
use crate::{
    record, Config, EnvelopeCodec, ExchangeClient, HttpTransport, RecordKind, RouteTable,
    StatusNotice,
};

#[derive(Debug, Parser)]
#[command(name = "intake-client", version, about = "Encrypted intake form exchange")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encrypt and submit one questionnaire page.
    Submit {
        /// Page tag selecting the endpoint and envelope format.
        #[arg(long)]
        page: u8,

        #[arg(long)]
        user_id: String,

        /// JSON file holding the page's question/answer object.
        #[arg(long)]
        questions: PathBuf,

        /// Bearer token; only sent to authenticated routes.
        #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Leave the `date` field out of the record.
        #[arg(long)]
        no_date: bool,
    },
    /// Fetch and decrypt a stored record.
    Retrieve {
        /// `impression` or `prescription`.
        kind: RecordKind,

        #[arg(long)]
        user_id: String,

        #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

/// Execute one command against the configured backend.
///
/// A retrieved record is printed to stdout as pretty JSON.
///
/// # Errors
///
/// Returns the first failure; [`ExchangeError`]s stay downcastable.
pub async fn run(command: Command, cfg: &Config) -> Result<StatusNotice> {
    let engine = CipherEngine::new(cfg.secret()?);
    let transport = HttpTransport::new(cfg.base_url.clone(), cfg.request_timeout())?;
    let client = ExchangeClient::new(EnvelopeCodec::new(engine), transport, RouteTable::default());

    match command {
        Command::Submit {
            page,
            user_id,
            questions,
            token,
            no_date,
        } => {
            let raw = tokio::fs::read(&questions)
                .await
                .with_context(|| format!("failed to read {}", questions.display()))?;
            let document = serde_json::from_slice(&raw)
                .map_err(|e| ExchangeError::Serialization(e.to_string()))?;
            let mut submission =
                record::new_record(user_id, page, record::questions_from_value(document)?);
            if !no_date {
                submission = record::stamp(submission);
            }

            let receipt = client.submit(&submission, token.as_deref()).await?;
            Ok(StatusNotice::success(
                receipt
                    .message
                    .unwrap_or_else(|| "Data saved successfully".into()),
            ))
        }
        Command::Retrieve {
            kind,
            user_id,
            token,
        } => {
            let value = client.retrieve(kind, &user_id, token.as_deref()).await?;
            let rendered = serde_json::to_string_pretty(&value)
                .map_err(|e| ExchangeError::Serialization(e.to_string()))?;
            println!("{rendered}");
            Ok(StatusNotice::success(format!("{kind} retrieved")))
        }
    }
}

/// The status notice a finished command leaves behind.
pub fn notice(outcome: &Result<StatusNotice>) -> StatusNotice {
    match outcome {
        Ok(notice) => notice.clone(),
        Err(e) => match e.downcast_ref::<ExchangeError>() {
            Some(err) => StatusNotice::from_error(err),
            None => StatusNotice::error("Something went wrong"),
        },
    }
}

/// `0` on success, `1` on any failure.
pub fn exit_status(outcome: &Result<StatusNotice>) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Log the outcome and map it to the process exit code.
pub fn report(outcome: &Result<StatusNotice>) -> ExitCode {
    let notice = notice(outcome);
    match outcome {
        Ok(_) => info!(status = %notice.message, "done"),
        Err(e) => error!(error = %e, status = %notice.message, "request failed"),
    }
    ExitCode::from(exit_status(outcome))
}
