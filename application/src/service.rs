mod handover;
mod rental;

pub use self::{handover::*, rental::*};

/// Attempts per optimistic-concurrency retry loop before the conflict is
/// surfaced to the caller.
pub(crate) const CAS_RETRY_LIMIT: usize = 3;
