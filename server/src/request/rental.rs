use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use application::transfer::{
    CloseRentalDto, CreateRentalDto, GetParticipantRentalsDto, GetRentalDto, OfferDecisionDto,
    PaymentConfirmedDto, SubmitRatingDto,
};
use kernel::prelude::entity::{InsuranceType, RatingTarget};
use kernel::prelude::policy::RatingPolicy;

use crate::controller::Intake;

#[derive(Debug, Deserialize)]
pub struct CreateRentalRequest {
    user_id: Uuid,
    lender_id: Uuid,
    item_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
    price: i64,
    insurance_price: i64,
    insurance_type: InsuranceType,
}

#[derive(Debug, Deserialize)]
pub struct OfferDecisionRequest {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    user_id: Uuid,
    target: RatingTarget,
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    user_id: Uuid,
}

#[derive(Debug)]
pub struct GetRentalRequest {
    id: Uuid,
}

impl GetRentalRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct GetUserRentalsRequest {
    id: Uuid,
}

impl GetUserRentalsRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

pub struct RentalTransformer;

impl Intake<CreateRentalRequest> for RentalTransformer {
    type To = CreateRentalDto;
    fn emit(&self, input: CreateRentalRequest) -> Self::To {
        CreateRentalDto {
            acting_user: input.user_id,
            lender_id: input.lender_id,
            item_id: input.item_id,
            start: input.start,
            end: input.end,
            price: input.price,
            insurance_price: input.insurance_price,
            insurance_type: input.insurance_type,
        }
    }
}

impl Intake<GetRentalRequest> for RentalTransformer {
    type To = GetRentalDto;
    fn emit(&self, input: GetRentalRequest) -> Self::To {
        GetRentalDto { id: input.id }
    }
}

impl Intake<GetUserRentalsRequest> for RentalTransformer {
    type To = GetParticipantRentalsDto;
    fn emit(&self, input: GetUserRentalsRequest) -> Self::To {
        GetParticipantRentalsDto { user_id: input.id }
    }
}

impl Intake<(Uuid, OfferDecisionRequest)> for RentalTransformer {
    type To = OfferDecisionDto;
    fn emit(&self, (rental_id, request): (Uuid, OfferDecisionRequest)) -> Self::To {
        OfferDecisionDto {
            rental_id,
            acting_user: request.user_id,
        }
    }
}

impl Intake<(Uuid, PaymentRequest)> for RentalTransformer {
    type To = PaymentConfirmedDto;
    fn emit(&self, (rental_id, request): (Uuid, PaymentRequest)) -> Self::To {
        PaymentConfirmedDto {
            rental_id,
            acting_user: request.user_id,
        }
    }
}

impl Intake<(Uuid, RatingPolicy, RateRequest)> for RentalTransformer {
    type To = SubmitRatingDto;
    fn emit(&self, (rental_id, policy, request): (Uuid, RatingPolicy, RateRequest)) -> Self::To {
        SubmitRatingDto {
            rental_id,
            acting_user: request.user_id,
            target: request.target,
            policy,
        }
    }
}

impl Intake<(Uuid, CloseRequest)> for RentalTransformer {
    type To = CloseRentalDto;
    fn emit(&self, (rental_id, request): (Uuid, CloseRequest)) -> Self::To {
        CloseRentalDto {
            rental_id,
            acting_user: request.user_id,
        }
    }
}
