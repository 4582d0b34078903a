use chrono::{DateTime, Utc};

use crate::models::Paste;

/// Outcome of a read-access check. `NotFound` is decided earlier, at lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Expired,
    Forbidden,
}

/// Decide whether `requester` (a user id, if authenticated) may read `paste`
/// at time `now`.
///
/// Expiry is checked at read time rather than enforced by a cleanup job, so
/// an expired paste is unreadable even though the row still exists. Private
/// pastes are only readable by their owner; a private paste without an owner
/// is readable by no one.
pub fn evaluate(paste: &Paste, requester: Option<&str>, now: DateTime<Utc>) -> Access {
    if paste.expires_at.map_or(false, |at| at <= now) {
        return Access::Expired;
    }

    if !paste.is_public {
        match (requester, paste.user_id.as_deref()) {
            (Some(user), Some(owner)) if user == owner => {}
            _ => return Access::Forbidden,
        }
    }

    Access::Allow
}
