mod handover;
mod rental;

pub use self::{handover::*, rental::*};
