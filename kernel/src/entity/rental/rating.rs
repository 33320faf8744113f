use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// What a submitted rating is about.
///
/// The renter rates the item and the lender; the lender rates the renter.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingTarget {
    Item,
    Lender,
    Renter,
}

impl RatingTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingTarget::Item => "ITEM",
            RatingTarget::Lender => "LENDER",
            RatingTarget::Renter => "RENTER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ITEM" => Some(RatingTarget::Item),
            "LENDER" => Some(RatingTarget::Lender),
            "RENTER" => Some(RatingTarget::Renter),
            _ => None,
        }
    }
}

impl Display for RatingTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
