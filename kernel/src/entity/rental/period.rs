use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, References)]
pub struct RentalPeriod {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl RentalPeriod {
    pub fn new(start: impl Into<OffsetDateTime>, end: impl Into<OffsetDateTime>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}
