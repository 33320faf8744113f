use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use application::transfer::RentalDto;
use kernel::prelude::entity::{InsuranceType, RentalState};

use crate::controller::Exhaust;

#[derive(Debug, Serialize)]
pub struct RentalResponse {
    id: Uuid,
    renter_id: Uuid,
    lender_id: Uuid,
    item_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
    price: i64,
    insurance_price: i64,
    insurance_type: InsuranceType,
    state: RentalState,
    pickup_handover: Option<Uuid>,
    return_handover: Option<Uuid>,
    version: i64,
}

impl From<RentalDto> for RentalResponse {
    fn from(dto: RentalDto) -> Self {
        Self {
            id: dto.id,
            renter_id: dto.renter_id,
            lender_id: dto.lender_id,
            item_id: dto.item_id,
            start: dto.start,
            end: dto.end,
            price: dto.price,
            insurance_price: dto.insurance_price,
            insurance_type: dto.insurance_type,
            state: dto.state,
            pickup_handover: dto.pickup_handover,
            return_handover: dto.return_handover,
            version: dto.version,
        }
    }
}

impl IntoResponse for RentalResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, axum::Json(self)).into_response()
    }
}

pub struct RentalPresenter;

impl Exhaust<RentalDto> for RentalPresenter {
    type To = RentalResponse;
    fn emit(&self, input: RentalDto) -> Self::To {
        RentalResponse::from(input)
    }
}

impl Exhaust<Option<RentalDto>> for RentalPresenter {
    type To = Response;
    fn emit(&self, input: Option<RentalDto>) -> Self::To {
        input
            .map(|dto| RentalResponse::from(dto).into_response())
            .unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
    }
}

impl Exhaust<Vec<RentalDto>> for RentalPresenter {
    type To = axum::Json<Vec<RentalResponse>>;
    fn emit(&self, input: Vec<RentalDto>) -> Self::To {
        axum::Json(input.into_iter().map(RentalResponse::from).collect())
    }
}
