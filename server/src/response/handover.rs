use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use application::transfer::HandoverDto;
use kernel::prelude::entity::HandoverKind;

use crate::controller::Exhaust;

#[derive(Debug, Serialize)]
pub struct HandoverResponse {
    id: Uuid,
    #[serde(rename = "type")]
    kind: HandoverKind,
    pictures: Vec<String>,
    comment: String,
    agreed_renter: Option<OffsetDateTime>,
    agreed_lender: Option<OffsetDateTime>,
    version: i64,
}

impl From<HandoverDto> for HandoverResponse {
    fn from(dto: HandoverDto) -> Self {
        Self {
            id: dto.id,
            kind: dto.kind,
            pictures: dto.pictures,
            comment: dto.comment,
            agreed_renter: dto.agreed_renter,
            agreed_lender: dto.agreed_lender,
            version: dto.version,
        }
    }
}

impl IntoResponse for HandoverResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, axum::Json(self)).into_response()
    }
}

pub struct HandoverPresenter;

impl Exhaust<HandoverDto> for HandoverPresenter {
    type To = HandoverResponse;
    fn emit(&self, input: HandoverDto) -> Self::To {
        HandoverResponse::from(input)
    }
}

impl Exhaust<Option<HandoverDto>> for HandoverPresenter {
    type To = Response;
    fn emit(&self, input: Option<HandoverDto>) -> Self::To {
        input
            .map(|dto| HandoverResponse::from(dto).into_response())
            .unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
    }
}
