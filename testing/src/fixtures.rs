//! Draft and actor fixtures.

use removal_desk_core::{Actor, RequestDraft, Role};

/// Minimal valid draft for `owner` and `serial`.
#[must_use]
pub fn draft(owner: &str, serial: &str) -> RequestDraft {
    RequestDraft::new(owner, serial, "Noa Levi", "7B", "Device returned to family")
}

/// Draft with every optional field filled in.
#[must_use]
pub fn full_draft(owner: &str, serial: &str) -> RequestDraft {
    let mut draft = draft(owner, serial)
        .with_parent("Dana Levi", "050-1234567")
        .with_email("dana@example.com")
        .with_device_model("Chromebook 11");
    draft.phone2 = Some("03-7654321".to_string());
    draft.note = Some("Charger included".to_string());
    draft
}

/// The registrar.
#[must_use]
pub fn registrar() -> Actor {
    Actor::new(Role::Registrar, "registrar")
}

/// IT staff.
#[must_use]
pub fn it_staff() -> Actor {
    Actor::new(Role::It, "it")
}

/// A parent identified by `key`.
#[must_use]
pub fn parent(key: &str) -> Actor {
    Actor::new(Role::Parent, key)
}
