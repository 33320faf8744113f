mod common;
mod handover;
mod item;
mod rental;
mod user;

pub use self::{common::*, handover::*, item::*, rental::*, user::*};
