//! Transition authorizer.
//!
//! A lookup table over (role, from, to). It never looks at anything but the
//! status.
//!
//! | role      | allowed                         |
//! |-----------|---------------------------------|
//! | registrar | `submitted` → `pending_it`      |
//! | it        | `pending_it` → `it_approved`    |
//! | staff     | `s` → `s` (idempotent re-save)  |
//! | parent    | nothing                         |
//! | unknown   | nothing                         |

use crate::error::{RequestError, Result};
use crate::types::{RequestStatus, Role};

/// Whether `role` may move a request from `from` to `to`.
///
/// ```
/// use removal_desk_core::policy::can_transition;
/// use removal_desk_core::{RequestStatus, Role};
///
/// assert!(can_transition(Role::Registrar, RequestStatus::Submitted, RequestStatus::PendingIt));
/// assert!(!can_transition(Role::Registrar, RequestStatus::PendingIt, RequestStatus::ItApproved));
/// ```
#[must_use]
pub fn can_transition(role: Role, from: RequestStatus, to: RequestStatus) -> bool {
    use RequestStatus::{ItApproved, PendingIt, Submitted};

    match (role, from, to) {
        (Role::Registrar, Submitted, PendingIt) | (Role::It, PendingIt, ItApproved) => true,
        (Role::Registrar | Role::It, from, to) => from == to,
        (Role::Parent | Role::Unknown, _, _) => false,
    }
}

/// Check a transition and explain a denial.
///
/// Roles without any transition rights get [`RequestError::AccessDenied`];
/// staff asking for a step their rights do not cover get
/// [`RequestError::InvalidTransition`].
///
/// # Errors
///
/// See above.
pub fn authorize(role: Role, from: RequestStatus, to: RequestStatus) -> Result<()> {
    if can_transition(role, from, to) {
        return Ok(());
    }
    if role.is_staff() {
        Err(RequestError::InvalidTransition { role, from, to })
    } else {
        Err(RequestError::AccessDenied { role, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::{ItApproved, PendingIt, Submitted};

    #[test]
    fn test_forward_steps() {
        assert!(can_transition(Role::Registrar, Submitted, PendingIt));
        assert!(can_transition(Role::It, PendingIt, ItApproved));
    }

    #[test]
    fn test_cross_role_steps_denied() {
        assert!(!can_transition(Role::Registrar, PendingIt, ItApproved));
        assert!(!can_transition(Role::It, Submitted, PendingIt));
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        for role in [Role::Registrar, Role::It] {
            assert!(!can_transition(role, Submitted, ItApproved));
            assert!(!can_transition(role, ItApproved, PendingIt));
            assert!(!can_transition(role, PendingIt, Submitted));
        }
    }

    #[test]
    fn test_staff_noop_allowed_for_every_status() {
        for role in [Role::Registrar, Role::It] {
            for status in RequestStatus::ALL {
                assert!(can_transition(role, status, status), "{role} {status}");
            }
        }
    }

    #[test]
    fn test_parent_and_unknown_can_do_nothing() {
        for role in [Role::Parent, Role::Unknown] {
            for from in RequestStatus::ALL {
                for to in RequestStatus::ALL {
                    assert!(!can_transition(role, from, to));
                }
            }
        }
    }

    #[test]
    fn test_authorize_distinguishes_denials() {
        assert_eq!(
            authorize(Role::Parent, Submitted, PendingIt),
            Err(RequestError::AccessDenied {
                role: Role::Parent,
                to: PendingIt
            })
        );
        assert_eq!(
            authorize(Role::Registrar, PendingIt, ItApproved),
            Err(RequestError::InvalidTransition {
                role: Role::Registrar,
                from: PendingIt,
                to: ItApproved
            })
        );
        assert_eq!(authorize(Role::It, PendingIt, ItApproved), Ok(()));
    }
}
