//! Transaction record and its transition function.

use alloy::primitives::TxHash;
use serde::Serialize;
use thiserror::Error;

/// Lifecycle status of the current write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Idle => "idle",
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Error)
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which entry point produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxAction {
    Approve,
    Transfer,
    TransferFrom,
}

/// The single observable transaction record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    /// Set once the transport accepted the write.
    pub hash: Option<TxHash>,
    pub status: TxStatus,
    pub error: Option<String>,
    pub action: Option<TxAction>,
    /// Incremented per submission; events carrying an older value are stale.
    pub submission: u64,
}

/// Inputs to [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    /// A validated write is about to be submitted.
    Submit { action: TxAction },
    /// Validation refused the intent; status is left alone.
    Invalid { message: String },
    /// The transport accepted the write.
    Accepted { submission: u64, hash: TxHash },
    /// The write settled successfully.
    Confirmed { submission: u64 },
    /// Submission was rejected or confirmation failed.
    Failed { submission: u64, message: String },
    /// Back to `Idle`; anything still in flight becomes stale.
    Reset,
}

impl TxEvent {
    fn submission(&self) -> Option<u64> {
        match self {
            TxEvent::Accepted { submission, .. }
            | TxEvent::Confirmed { submission }
            | TxEvent::Failed { submission, .. } => Some(*submission),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TxEvent::Submit { .. } => "submit",
            TxEvent::Invalid { .. } => "invalid",
            TxEvent::Accepted { .. } => "accepted",
            TxEvent::Confirmed { .. } => "confirmed",
            TxEvent::Failed { .. } => "failed",
            TxEvent::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transition: {event} while {status}")]
pub struct IllegalTransition {
    pub status: TxStatus,
    pub event: &'static str,
}

/// Applies `event` to `record`.
///
/// Returns `Ok(true)` when the record changed, `Ok(false)` when the event
/// was stale or a no-op. The record is untouched on error.
pub fn apply(record: &mut TransactionRecord, event: TxEvent) -> Result<bool, IllegalTransition> {
    if let Some(submission) = event.submission() {
        if submission != record.submission {
            return Ok(false);
        }
    }

    let illegal = IllegalTransition {
        status: record.status,
        event: event.name(),
    };

    match (record.status, event) {
        (TxStatus::Idle, TxEvent::Submit { action }) => {
            record.submission += 1;
            record.status = TxStatus::Pending;
            record.action = Some(action);
            record.hash = None;
            record.error = None;
            Ok(true)
        }
        (status, TxEvent::Invalid { message }) if status != TxStatus::Pending => {
            let changed = record.error.as_deref() != Some(message.as_str());
            record.error = Some(message);
            Ok(changed)
        }
        (TxStatus::Pending, TxEvent::Accepted { hash, .. }) => {
            let changed = record.hash != Some(hash);
            record.hash = Some(hash);
            Ok(changed)
        }
        (TxStatus::Pending, TxEvent::Confirmed { .. }) => {
            record.status = TxStatus::Success;
            Ok(true)
        }
        (TxStatus::Pending, TxEvent::Failed { message, .. }) => {
            record.status = TxStatus::Error;
            record.error = Some(message);
            Ok(true)
        }
        (status, TxEvent::Reset) => {
            if status == TxStatus::Pending {
                record.submission += 1;
            }
            let reset = TransactionRecord {
                submission: record.submission,
                ..Default::default()
            };
            let changed = *record != reset;
            *record = reset;
            Ok(changed)
        }
        _ => Err(illegal),
    }
}
