use serde::Deserialize;
use uuid::Uuid;

use application::transfer::{CreateHandoverDto, GetHandoverDto, HandoverActionDto};
use kernel::prelude::entity::HandoverKind;

use crate::controller::Intake;

#[derive(Debug, Deserialize)]
pub struct CreateHandoverRequest {
    user_id: Uuid,
    #[serde(rename = "type")]
    kind: HandoverKind,
    pictures: Vec<String>,
    comment: String,
}

#[derive(Debug, Deserialize)]
pub struct HandoverDecisionRequest {
    user_id: Uuid,
}

pub struct HandoverTransformer;

impl Intake<(Uuid, CreateHandoverRequest)> for HandoverTransformer {
    type To = CreateHandoverDto;
    fn emit(&self, (rental_id, request): (Uuid, CreateHandoverRequest)) -> Self::To {
        CreateHandoverDto {
            rental_id,
            acting_user: request.user_id,
            kind: request.kind,
            pictures: request.pictures,
            comment: request.comment,
        }
    }
}

impl Intake<((Uuid, Uuid), HandoverDecisionRequest)> for HandoverTransformer {
    type To = HandoverActionDto;
    fn emit(
        &self,
        ((rental_id, handover_id), request): ((Uuid, Uuid), HandoverDecisionRequest),
    ) -> Self::To {
        HandoverActionDto {
            rental_id,
            handover_id,
            acting_user: request.user_id,
        }
    }
}

impl Intake<(Uuid, Uuid)> for HandoverTransformer {
    type To = GetHandoverDto;
    fn emit(&self, (rental_id, handover_id): (Uuid, Uuid)) -> Self::To {
        GetHandoverDto {
            rental_id,
            handover_id,
        }
    }
}
