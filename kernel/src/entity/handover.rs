mod content;
mod id;
mod kind;

pub use self::{content::*, id::*, kind::*};
use crate::entity::common::{AgreedAt, EventVersion};
use destructure::Destructure;
use vodca::References;

/// A physical handover of the rented item, confirmed by both parties.
///
/// The record is created once per rental per kind and never deleted: a
/// decline clears the agreement stamps and the content in place so the
/// handover can be re-submitted.
#[derive(Debug, Clone, Eq, PartialEq, References, Destructure)]
pub struct Handover {
    id: HandoverId,
    kind: HandoverKind,
    pictures: Vec<PictureUrl>,
    comment: HandoverComment,
    agreed_renter: Option<AgreedAt>,
    agreed_lender: Option<AgreedAt>,
    version: EventVersion<Handover>,
}

impl Handover {
    pub(crate) fn with_renter_agreement(mut self, at: AgreedAt) -> Self {
        self.agreed_renter = Some(at);
        self
    }

    /// The image of this handover after a successful conditional write:
    /// the same fields, version incremented.
    pub fn with_next_version(mut self) -> Self {
        self.version = self.version.next();
        self
    }

    pub(crate) fn with_lender_agreement(mut self, at: AgreedAt) -> Self {
        self.agreed_lender = Some(at);
        self
    }

    pub(crate) fn cleared(mut self) -> Self {
        self.agreed_renter = None;
        self.agreed_lender = None;
        self.pictures = Vec::new();
        self.comment = HandoverComment::new("");
        self
    }

    pub(crate) fn refilled(mut self, pictures: Vec<PictureUrl>, comment: HandoverComment) -> Self {
        self.pictures = pictures;
        self.comment = comment;
        self
    }

    pub fn new(
        id: HandoverId,
        kind: HandoverKind,
        pictures: Vec<PictureUrl>,
        comment: HandoverComment,
        agreed_renter: Option<AgreedAt>,
        agreed_lender: Option<AgreedAt>,
        version: EventVersion<Handover>,
    ) -> Self {
        Self {
            id,
            kind,
            pictures,
            comment,
            agreed_renter,
            agreed_lender,
            version,
        }
    }
}
