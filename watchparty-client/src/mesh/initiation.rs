//! Who offers to whom, as a pure function of the join-ordered member list.

use watchparty_core::{Member, SessionId};

/// Only the last member in join order initiates.
pub fn should_initiate(local: SessionId, members: &[Member]) -> bool {
    members.last().is_some_and(|m| m.id == local)
}

/// Everyone this side must offer to under `members`; empty unless `local` is last.
pub fn initiation_targets(local: SessionId, members: &[Member]) -> Vec<SessionId> {
    if !should_initiate(local, members) {
        return Vec::new();
    }
    members
        .iter()
        .map(|m| m.id)
        .filter(|id| *id != local)
        .collect()
}

/// The side of a pair that initiates: whichever joined later.
pub fn pair_initiator(a: SessionId, b: SessionId, members: &[Member]) -> Option<SessionId> {
    let pos_a = members.iter().position(|m| m.id == a)?;
    let pos_b = members.iter().position(|m| m.id == b)?;
    Some(if pos_a > pos_b { a } else { b })
}

/// Glare tie-break: the smaller session id becomes responder.
pub fn yields_on_glare(local: SessionId, remote: SessionId) -> bool {
    local < remote
}
