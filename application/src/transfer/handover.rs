use time::OffsetDateTime;
use uuid::Uuid;

use kernel::prelude::entity::{DestructHandover, Handover, HandoverKind};

#[derive(Debug, Clone)]
pub struct HandoverDto {
    pub id: Uuid,
    pub kind: HandoverKind,
    pub pictures: Vec<String>,
    pub comment: String,
    pub agreed_renter: Option<OffsetDateTime>,
    pub agreed_lender: Option<OffsetDateTime>,
    pub version: i64,
}

impl From<Handover> for HandoverDto {
    fn from(value: Handover) -> Self {
        let DestructHandover {
            id,
            kind,
            pictures,
            comment,
            agreed_renter,
            agreed_lender,
            version,
        } = value.into_destruct();
        Self {
            id: id.into(),
            kind,
            pictures: pictures.into_iter().map(Into::into).collect(),
            comment: comment.into(),
            agreed_renter: agreed_renter.map(|at| *at.as_ref()),
            agreed_lender: agreed_lender.map(|at| *at.as_ref()),
            version: *version.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateHandoverDto {
    pub rental_id: Uuid,
    pub acting_user: Uuid,
    pub kind: HandoverKind,
    pub pictures: Vec<String>,
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct HandoverActionDto {
    pub rental_id: Uuid,
    pub handover_id: Uuid,
    pub acting_user: Uuid,
}

#[derive(Debug, Clone)]
pub struct GetHandoverDto {
    pub rental_id: Uuid,
    pub handover_id: Uuid,
}
