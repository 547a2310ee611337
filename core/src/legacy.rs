//! Mapping to the legacy display vocabulary.
//!
//! Older screens and exports use title-case statuses (`"Submitted"`,
//! `"IT Approved"`, `"Rejected"`) and different field names. The canonical
//! model is the source of truth; this module only translates at the edge.

use crate::types::{RequestRecord, RequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors translating legacy values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LegacyError {
    /// The status exists in the legacy vocabulary but has no canonical state.
    #[error("Legacy status '{0}' has no canonical counterpart")]
    UnsupportedLegacyStatus(LegacyStatus),

    /// The string is not a legacy status at all.
    #[error("Unknown legacy status '{0}'")]
    UnknownLegacyStatus(String),
}

/// Status as older screens display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegacyStatus {
    /// Waiting on staff
    #[serde(rename = "Submitted")]
    Submitted,
    /// Finalized
    #[serde(rename = "IT Approved")]
    ItApproved,
    /// Refused (never produced by the canonical workflow)
    #[serde(rename = "Rejected")]
    Rejected,
}

impl LegacyStatus {
    /// Display string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::ItApproved => "IT Approved",
            Self::Rejected => "Rejected",
        }
    }

    /// Canonical status for this legacy value.
    ///
    /// # Errors
    ///
    /// Returns [`LegacyError::UnsupportedLegacyStatus`] for `Rejected`.
    pub fn to_canonical(self) -> Result<RequestStatus, LegacyError> {
        match self {
            Self::Submitted => Ok(RequestStatus::Submitted),
            Self::ItApproved => Ok(RequestStatus::ItApproved),
            Self::Rejected => Err(LegacyError::UnsupportedLegacyStatus(self)),
        }
    }
}

impl From<RequestStatus> for LegacyStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Submitted | RequestStatus::PendingIt => Self::Submitted,
            RequestStatus::ItApproved => Self::ItApproved,
        }
    }
}

impl TryFrom<LegacyStatus> for RequestStatus {
    type Error = LegacyError;

    fn try_from(status: LegacyStatus) -> Result<Self, Self::Error> {
        status.to_canonical()
    }
}

impl fmt::Display for LegacyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegacyStatus {
    type Err = LegacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Submitted" => Ok(Self::Submitted),
            "IT Approved" => Ok(Self::ItApproved),
            "Rejected" => Ok(Self::Rejected),
            other => Err(LegacyError::UnknownLegacyStatus(other.to_string())),
        }
    }
}

/// Request in the legacy export shape.
///
/// Optional fields become empty strings, and `updatedAt` falls back to the
/// creation time, as older consumers expect every key to be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct LegacyRemovalRequest {
    pub id: String,
    pub parent_name: String,
    pub phone1: String,
    pub phone2: String,
    pub email: String,
    pub student_name: String,
    pub class_room: String,
    pub device_serial: String,
    pub device_model: String,
    pub reason: String,
    pub status: LegacyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&RequestRecord> for LegacyRemovalRequest {
    fn from(record: &RequestRecord) -> Self {
        Self {
            id: record.id.to_string(),
            parent_name: record.parent_name.clone(),
            phone1: record.phone.clone(),
            phone2: record.phone2.clone().unwrap_or_default(),
            email: record.email.clone().unwrap_or_default(),
            student_name: record.student_name.clone(),
            class_room: record.class_room.clone(),
            device_serial: record.serial.clone(),
            device_model: record.device_model.clone().unwrap_or_default(),
            reason: record.reason.clone(),
            status: record.status.into(),
            created_at: record.submitted_at,
            updated_at: record.updated_at.unwrap_or(record.submitted_at),
        }
    }
}
