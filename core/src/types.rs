//! Core types for device-removal requests.

use crate::error::{RequestError, Result};
use crate::guard::normalize_serial;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

/// Fixed-width, zero-padded request identifier (`"000007"`).
///
/// Ids compare lexicographically. Because every id produced by the allocator
/// has the same width, lexicographic order is numeric order, so "newest first"
/// listings sort on the string directly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Width of a formatted id.
    pub const WIDTH: usize = 6;

    /// Largest value that fits in [`Self::WIDTH`] digits.
    pub const MAX: u64 = 999_999;

    /// Format a counter value as an id. `value` must not exceed [`Self::MAX`].
    #[must_use]
    pub fn from_counter(value: u64) -> Self {
        Self(format!("{value:0width$}", width = Self::WIDTH))
    }

    /// The id allocated after `counter`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Storage`] once the id space is exhausted.
    pub fn after(counter: u64) -> Result<Self> {
        match counter.checked_add(1) {
            Some(next) if next <= Self::MAX => Ok(Self::from_counter(next)),
            _ => Err(RequestError::Storage(format!(
                "request id space exhausted at {counter}"
            ))),
        }
    }

    /// Parse a caller-supplied id.
    ///
    /// Accepts any decimal number from 1 to [`Self::MAX`] and re-pads it, so
    /// `"50"` and `"000050"` name the same request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] if the input is not a decimal
    /// number in that range.
    pub fn parse(raw: &str) -> Result<Self> {
        let digits = raw.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RequestError::validation(
                "id",
                format!("'{raw}' is not a numeric request id"),
            ));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| RequestError::validation("id", format!("'{raw}' is out of range")))?;
        if value == 0 {
            return Err(RequestError::validation("id", "must be greater than zero"));
        }
        if value > Self::MAX {
            return Err(RequestError::validation(
                "id",
                format!("'{raw}' exceeds {}", Self::MAX),
            ));
        }
        Ok(Self::from_counter(value))
    }

    /// Numeric value of the id.
    #[must_use]
    pub fn value(&self) -> u64 {
        // Construction guarantees a decimal string.
        self.0.parse().unwrap_or(0)
    }

    /// Borrow the formatted id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RequestId {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RequestId {
    type Error = RequestError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

/// Optional id field where `null`, `""` and whitespace all mean none.
pub(crate) fn blank_request_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<RequestId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => RequestId::parse(s).map(Some).map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Status
// ============================================================================

/// Lifecycle status of a request.
///
/// ```text
/// submitted ──registrar──▶ pending_it ──it──▶ it_approved
/// ```
///
/// Forward-only, no skipping. `submitted` and `pending_it` form the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Submitted by a parent, waiting for the registrar
    Submitted,
    /// Forwarded by the registrar, waiting for IT
    PendingIt,
    /// Finalized by IT (terminal)
    ItApproved,
}

impl RequestStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 3] = [Self::Submitted, Self::PendingIt, Self::ItApproved];

    /// Statuses that count as in-flight for the duplicate guard.
    pub const ACTIVE: [Self; 2] = [Self::Submitted, Self::PendingIt];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::PendingIt => "pending_it",
            Self::ItApproved => "it_approved",
        }
    }

    /// Whether a request in this status blocks a new one for the same device.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Submitted | Self::PendingIt)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "submitted" => Ok(Self::Submitted),
            "pending_it" => Ok(Self::PendingIt),
            "it_approved" => Ok(Self::ItApproved),
            other => Err(RequestError::validation(
                "status",
                format!("unknown status '{other}'"),
            )),
        }
    }
}

// ============================================================================
// Actors
// ============================================================================

/// Role of the acting identity, as asserted by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submitter of requests
    Parent,
    /// Staff: forwards submitted requests to IT
    Registrar,
    /// Staff: finalizes forwarded requests
    It,
    /// Anything the session layer sent that we do not recognize
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Map a free-form role label; unrecognized labels become [`Role::Unknown`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "parent" => Self::Parent,
            "registrar" => Self::Registrar,
            "it" => Self::It,
            _ => Self::Unknown,
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Registrar => "registrar",
            Self::It => "it",
            Self::Unknown => "unknown",
        }
    }

    /// Registrar or IT.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Registrar | Self::It)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (role, identity) pair on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Asserted role
    pub role: Role,
    /// Stable identity of the user (session user key)
    pub user_key: String,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub fn new(role: Role, user_key: impl Into<String>) -> Self {
        Self {
            role,
            user_key: user_key.into(),
        }
    }

    /// Name recorded in audit entries: the user key, or the role when blank.
    #[must_use]
    pub fn audit_user(&self) -> String {
        let key = self.user_key.trim();
        if key.is_empty() {
            self.role.as_str().to_string()
        } else {
            key.to_string()
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A stored device-removal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// Immutable id
    pub id: RequestId,
    /// Identity of the submitter
    pub owner_key: String,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Parent or guardian name
    pub parent_name: String,
    /// Primary phone number
    pub phone: String,
    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Secondary phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    /// Student the device belongs to
    pub student_name: String,
    /// Student's class
    pub class_room: String,
    /// Device serial as entered
    pub serial: String,
    /// Device model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    /// Why the device should be removed
    pub reason: String,
    /// Staff note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the request was created
    pub submitted_at: DateTime<Utc>,
    /// Last mutation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    /// Serial in the form used for duplicate detection.
    #[must_use]
    pub fn normalized_serial(&self) -> String {
        normalize_serial(&self.serial)
    }

    /// Whether this record is in the active set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Trim an optional field; blank values and the `"-"` display placeholder are absent.
fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "-")
        .map(ToString::to_string)
}

/// Submission payload for a new request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDraft {
    /// Explicit id (imports); normally allocated. Blank means allocate.
    #[serde(
        deserialize_with = "blank_request_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<RequestId>,
    /// Identity of the submitter
    pub owner_key: String,
    /// Parent or guardian name
    pub parent_name: String,
    /// Primary phone number
    pub phone: String,
    /// Contact email
    pub email: Option<String>,
    /// Secondary phone number
    pub phone2: Option<String>,
    /// Student the device belongs to
    pub student_name: String,
    /// Student's class
    pub class_room: String,
    /// Device serial
    pub serial: String,
    /// Device model
    pub device_model: Option<String>,
    /// Why the device should be removed
    pub reason: String,
    /// Initial note
    pub note: Option<String>,
}

impl RequestDraft {
    /// Draft with the fields a submission cannot do without.
    #[must_use]
    pub fn new(
        owner_key: impl Into<String>,
        serial: impl Into<String>,
        student_name: impl Into<String>,
        class_room: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            owner_key: owner_key.into(),
            serial: serial.into(),
            student_name: student_name.into(),
            class_room: class_room.into(),
            reason: reason.into(),
            ..Self::default()
        }
    }

    /// Set the parent contact.
    #[must_use]
    pub fn with_parent(mut self, name: impl Into<String>, phone: impl Into<String>) -> Self {
        self.parent_name = name.into();
        self.phone = phone.into();
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the device model.
    #[must_use]
    pub fn with_device_model(mut self, model: impl Into<String>) -> Self {
        self.device_model = Some(model.into());
        self
    }

    /// Request a specific id instead of allocating one.
    #[must_use]
    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    /// Check the fields a submission must carry.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] naming the first blank field and
    /// listing all of them.
    pub fn validate(&self) -> Result<()> {
        let required: [(&'static str, &str); 5] = [
            ("ownerKey", &self.owner_key),
            ("serial", &self.serial),
            ("studentName", &self.student_name),
            ("classRoom", &self.class_room),
            ("reason", &self.reason),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();

        match missing.first() {
            None => Ok(()),
            Some(first) => Err(RequestError::validation(
                *first,
                format!("missing required fields: {}", missing.join(", ")),
            )),
        }
    }

    /// Build the stored record. Status starts at `submitted`.
    #[must_use]
    pub fn into_record(self, id: RequestId, now: DateTime<Utc>) -> RequestRecord {
        RequestRecord {
            id,
            owner_key: self.owner_key.trim().to_string(),
            status: RequestStatus::Submitted,
            parent_name: self.parent_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: clean_optional(self.email.as_deref()),
            phone2: clean_optional(self.phone2.as_deref()),
            student_name: self.student_name.trim().to_string(),
            class_room: self.class_room.trim().to_string(),
            serial: self.serial.trim().to_string(),
            device_model: clean_optional(self.device_model.as_deref()),
            reason: self.reason.trim().to_string(),
            note: clean_optional(self.note.as_deref()),
            submitted_at: now,
            updated_at: None,
        }
    }
}

/// Partial update of business fields.
///
/// `id`, `ownerKey` and `status` are not patchable; unknown JSON keys
/// (including `status`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestPatch {
    /// New parent name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    /// New primary phone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// New email (blank or `"-"` clears)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New secondary phone (blank or `"-"` clears)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone2: Option<String>,
    /// New student name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    /// New class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_room: Option<String>,
    /// New serial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// New device model (blank or `"-"` clears)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    /// New reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// New note (blank clears)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl RequestPatch {
    /// Patch that only sets the staff note.
    #[must_use]
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::default()
        }
    }

    /// Whether the patch carries no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.parent_name.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.phone2.is_none()
            && self.student_name.is_none()
            && self.class_room.is_none()
            && self.serial.is_none()
            && self.device_model.is_none()
            && self.reason.is_none()
            && self.note.is_none()
    }

    /// Merge into `record`. Validates everything before touching the record.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] if the patch would blank a field
    /// that a submission requires.
    pub fn apply(&self, record: &mut RequestRecord) -> Result<()> {
        let required: [(&'static str, Option<&String>); 4] = [
            ("serial", self.serial.as_ref()),
            ("studentName", self.student_name.as_ref()),
            ("classRoom", self.class_room.as_ref()),
            ("reason", self.reason.as_ref()),
        ];
        for (field, value) in required {
            if value.is_some_and(|v| v.trim().is_empty()) {
                return Err(RequestError::validation(field, "cannot be blank"));
            }
        }

        if let Some(v) = &self.parent_name {
            record.parent_name = v.trim().to_string();
        }
        if let Some(v) = &self.phone {
            record.phone = v.trim().to_string();
        }
        if let Some(v) = &self.email {
            record.email = clean_optional(Some(v));
        }
        if let Some(v) = &self.phone2 {
            record.phone2 = clean_optional(Some(v));
        }
        if let Some(v) = &self.student_name {
            record.student_name = v.trim().to_string();
        }
        if let Some(v) = &self.class_room {
            record.class_room = v.trim().to_string();
        }
        if let Some(v) = &self.serial {
            record.serial = v.trim().to_string();
        }
        if let Some(v) = &self.device_model {
            record.device_model = clean_optional(Some(v));
        }
        if let Some(v) = &self.reason {
            record.reason = v.trim().to_string();
        }
        if let Some(v) = &self.note {
            record.note = clean_optional(Some(v));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    }

    #[test]
    fn test_request_id_padding_and_order() {
        assert_eq!(RequestId::from_counter(7).as_str(), "000007");
        assert_eq!(RequestId::parse("50").unwrap(), RequestId::from_counter(50));
        assert!(RequestId::from_counter(9) < RequestId::from_counter(10));
        assert_eq!(RequestId::parse(" 000123 ").unwrap().value(), 123);
    }

    #[test]
    fn test_request_id_rejects_non_numeric() {
        assert!(RequestId::parse("REQ-1").is_err());
        assert!(RequestId::parse("").is_err());
        assert!(RequestId::parse("000000").is_err());
        assert!(serde_json::from_str::<RequestId>("\"abc\"").is_err());
    }

    #[test]
    fn test_request_id_stays_six_digits() {
        assert_eq!(RequestId::parse("999999").unwrap().as_str(), "999999");
        assert!(matches!(
            RequestId::parse("1000000"),
            Err(RequestError::Validation { field: "id", .. })
        ));
        assert!(serde_json::from_str::<RequestId>("\"1000000\"").is_err());

        assert_eq!(RequestId::after(41).unwrap().as_str(), "000042");
        assert!(matches!(
            RequestId::after(RequestId::MAX),
            Err(RequestError::Storage(_))
        ));
    }

    #[test]
    fn test_draft_blank_id_means_allocate() {
        let draft: RequestDraft = serde_json::from_str(r#"{"id":"","serial":"AB-01"}"#).unwrap();
        assert_eq!(draft.id, None);

        let draft: RequestDraft = serde_json::from_str(r#"{"id":"  "}"#).unwrap();
        assert_eq!(draft.id, None);

        let draft: RequestDraft = serde_json::from_str(r#"{"id":"50"}"#).unwrap();
        assert_eq!(draft.id, Some(RequestId::from_counter(50)));

        assert!(serde_json::from_str::<RequestDraft>(r#"{"id":"1000000"}"#).is_err());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&RequestStatus::PendingIt).unwrap(),
            "\"pending_it\""
        );
        assert_eq!(
            "it_approved".parse::<RequestStatus>().unwrap(),
            RequestStatus::ItApproved
        );
        assert!("IT Approved".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_unknown_role_deserializes() {
        let role: Role = serde_json::from_str("\"principal\"").unwrap();
        assert_eq!(role, Role::Unknown);
        assert_eq!(Role::from_label(" IT "), Role::It);
        assert!(!Role::Parent.is_staff());
    }

    #[test]
    fn test_draft_validation_lists_missing_fields() {
        let draft = RequestDraft::new("p1", "  ", "S", "", "lost");
        let err = draft.validate().unwrap_err();
        assert_eq!(
            err,
            RequestError::validation("serial", "missing required fields: serial, classRoom")
        );
    }

    #[test]
    fn test_draft_cleans_optional_fields() {
        let record = RequestDraft::new(" p1 ", " AB-01 ", "S", "C1", "lost")
            .with_email("-")
            .with_device_model("  Chromebook ")
            .into_record(RequestId::from_counter(1), now());

        assert_eq!(record.owner_key, "p1");
        assert_eq!(record.serial, "AB-01");
        assert_eq!(record.email, None);
        assert_eq!(record.device_model.as_deref(), Some("Chromebook"));
        assert_eq!(record.status, RequestStatus::Submitted);
        assert_eq!(record.updated_at, None);
    }

    #[test]
    fn test_record_json_is_camel_case() {
        let record = RequestDraft::new("p1", "AB-01", "S", "C1", "lost")
            .into_record(RequestId::from_counter(1), now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ownerKey"], "p1");
        assert_eq!(json["classRoom"], "C1");
        assert_eq!(json["status"], "submitted");
        assert_eq!(json["id"], "000001");
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_patch_rejects_blank_required_without_partial_write() {
        let mut record = RequestDraft::new("p1", "AB-01", "S", "C1", "lost")
            .into_record(RequestId::from_counter(1), now());
        let patch = RequestPatch {
            note: Some("checked".to_string()),
            reason: Some(" ".to_string()),
            ..RequestPatch::default()
        };

        assert!(patch.apply(&mut record).is_err());
        assert_eq!(record.note, None);
        assert_eq!(record.reason, "lost");
    }

    #[test]
    fn test_patch_ignores_status_key() {
        let patch: RequestPatch =
            serde_json::from_str(r#"{"status":"it_approved","note":"ok"}"#).unwrap();
        assert_eq!(patch, RequestPatch::note("ok"));
        assert!(!patch.is_empty());
        assert!(RequestPatch::default().is_empty());
    }
}
