/// Which parties must have completed their ratings before a rental moves
/// from `RETURN_CONFIRMED` to `RATED`.
///
/// The trigger is a deployment decision, so it is configuration rather
/// than a hard-coded rule.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RatingPolicy {
    BothParties,
    EitherParty,
}

impl RatingPolicy {
    pub fn satisfied(&self, renter_complete: bool, lender_complete: bool) -> bool {
        match self {
            RatingPolicy::BothParties => renter_complete && lender_complete,
            RatingPolicy::EitherParty => renter_complete || lender_complete,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BOTH_PARTIES" => Some(RatingPolicy::BothParties),
            "EITHER_PARTY" => Some(RatingPolicy::EitherParty),
            _ => None,
        }
    }
}

impl Default for RatingPolicy {
    fn default() -> Self {
        RatingPolicy::BothParties
    }
}
