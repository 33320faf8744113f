use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Lifecycle position of a [`Rental`](super::Rental).
///
/// The legal transitions form a single forward path; `Declined` and
/// `Closed` are terminal.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalState {
    Offer,
    Accepted,
    Declined,
    Paid,
    PickedUp,
    PickUpConfirmed,
    Returned,
    ReturnConfirmed,
    Rated,
    Closed,
}

impl RentalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalState::Declined | RentalState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RentalState::Offer => "OFFER",
            RentalState::Accepted => "ACCEPTED",
            RentalState::Declined => "DECLINED",
            RentalState::Paid => "PAID",
            RentalState::PickedUp => "PICKED_UP",
            RentalState::PickUpConfirmed => "PICK_UP_CONFIRMED",
            RentalState::Returned => "RETURNED",
            RentalState::ReturnConfirmed => "RETURN_CONFIRMED",
            RentalState::Rated => "RATED",
            RentalState::Closed => "CLOSED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "OFFER" => Some(RentalState::Offer),
            "ACCEPTED" => Some(RentalState::Accepted),
            "DECLINED" => Some(RentalState::Declined),
            "PAID" => Some(RentalState::Paid),
            "PICKED_UP" => Some(RentalState::PickedUp),
            "PICK_UP_CONFIRMED" => Some(RentalState::PickUpConfirmed),
            "RETURNED" => Some(RentalState::Returned),
            "RETURN_CONFIRMED" => Some(RentalState::ReturnConfirmed),
            "RATED" => Some(RentalState::Rated),
            "CLOSED" => Some(RentalState::Closed),
            _ => None,
        }
    }
}

impl Display for RentalState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
