//! # Removal Desk Core
//!
//! Lifecycle engine for device-removal requests.
//!
//! A parent submits a request to have a device released from school
//! management. The registrar forwards it to IT, and IT approves it:
//!
//! ```text
//! submitted ──registrar──▶ pending_it ──it──▶ it_approved
//! ```
//!
//! ## Components
//!
//! - **Types**: [`RequestRecord`], [`RequestDraft`], [`RequestPatch`], [`RequestStatus`], [`Role`]
//! - **ID allocator**: sequential six-digit ids ([`id::IdAllocator`])
//! - **Duplicate guard**: one active request per owner and device ([`guard`])
//! - **Transition policy**: who may move what where ([`policy`])
//! - **Audit log**: append-only record of every mutation ([`audit`])
//! - **Repository**: storage seam with an in-process backend ([`repository`], [`memory`])
//! - **Store**: the facade callers use ([`RequestStore`])
//! - **Legacy mapping**: translation to the older display vocabulary ([`legacy`])
//!
//! Backends implement [`RequestRepository`] and [`AuditLog`]; the Postgres
//! backend lives in `removal-desk-postgres`.

pub mod audit;
pub mod environment;
pub mod error;
pub mod guard;
pub mod id;
pub mod legacy;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod store;
pub mod types;

pub use audit::{AuditEntry, AuditFilter, AuditLog, InMemoryAuditLog, NewAuditEntry};
pub use environment::{Clock, SystemClock};
pub use error::{AuditError, RequestError, Result};
pub use legacy::{LegacyError, LegacyRemovalRequest, LegacyStatus};
pub use memory::InMemoryRequestRepository;
pub use repository::{RequestMutation, RequestRepository};
pub use store::{RequestStore, StoreSnapshot};
pub use types::{
    Actor, RequestDraft, RequestId, RequestPatch, RequestRecord, RequestStatus, Role,
};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
