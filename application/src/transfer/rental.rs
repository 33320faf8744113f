use time::OffsetDateTime;
use uuid::Uuid;

use kernel::prelude::entity::{DestructRental, InsuranceType, RatingTarget, Rental, RentalState};
use kernel::prelude::policy::RatingPolicy;

#[derive(Debug, Clone)]
pub struct RentalDto {
    pub id: Uuid,
    pub renter_id: Uuid,
    pub lender_id: Uuid,
    pub item_id: Uuid,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub price: i64,
    pub insurance_price: i64,
    pub insurance_type: InsuranceType,
    pub state: RentalState,
    pub pickup_handover: Option<Uuid>,
    pub return_handover: Option<Uuid>,
    pub version: i64,
}

impl From<Rental> for RentalDto {
    fn from(value: Rental) -> Self {
        let DestructRental {
            id,
            renter_id,
            lender_id,
            item_id,
            period,
            price,
            insurance_price,
            insurance_type,
            state,
            pickup_handover,
            return_handover,
            version,
            ..
        } = value.into_destruct();
        Self {
            id: id.into(),
            renter_id: renter_id.into(),
            lender_id: lender_id.into(),
            item_id: item_id.into(),
            start: *period.start(),
            end: *period.end(),
            price: price.into(),
            insurance_price: insurance_price.into(),
            insurance_type,
            state,
            pickup_handover: pickup_handover.map(Into::into),
            return_handover: return_handover.map(Into::into),
            version: *version.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateRentalDto {
    pub acting_user: Uuid,
    pub lender_id: Uuid,
    pub item_id: Uuid,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub price: i64,
    pub insurance_price: i64,
    pub insurance_type: InsuranceType,
}

#[derive(Debug, Clone)]
pub struct GetRentalDto {
    pub id: Uuid,
}

#[derive(Debug, Clone)]
pub struct GetParticipantRentalsDto {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct OfferDecisionDto {
    pub rental_id: Uuid,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmedDto {
    pub rental_id: Uuid,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone)]
pub struct SubmitRatingDto {
    pub rental_id: Uuid,
    pub acting_user: Uuid,
    pub target: RatingTarget,
    pub policy: RatingPolicy,
}

#[derive(Debug, Clone)]
pub struct CloseRentalDto {
    pub rental_id: Uuid,
    pub acting_user: Uuid,
}
