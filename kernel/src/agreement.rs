use error_stack::Report;

use crate::entity::{
    AgreedAt, EventVersion, Handover, HandoverComment, HandoverId, HandoverKind, PictureUrl,
};
use crate::role::Role;
use crate::KernelError;

fn conflict(message: String) -> Report<KernelError> {
    Report::new(KernelError::Conflict).attach_printable(message)
}

fn validate_content(
    id: &HandoverId,
    pictures: &[PictureUrl],
    comment: &HandoverComment,
) -> error_stack::Result<(), KernelError> {
    if pictures.is_empty() {
        return Err(conflict(format!(
            "handover {} requires at least one picture",
            id.as_ref()
        )));
    }
    if comment.as_ref().is_empty() {
        return Err(conflict(format!(
            "handover {} requires a non-empty comment",
            id.as_ref()
        )));
    }
    Ok(())
}

impl Handover {
    /// Creates a handover from the submitting party.
    ///
    /// Creation is an implicit self-agreement: the creator's stamp is set
    /// immediately, the counter-party's stays unset.
    pub fn submit(
        id: HandoverId,
        kind: HandoverKind,
        pictures: Vec<PictureUrl>,
        comment: HandoverComment,
        creator: &Role,
        at: AgreedAt,
    ) -> error_stack::Result<Self, KernelError> {
        validate_content(&id, &pictures, &comment)?;
        let (agreed_renter, agreed_lender) = match creator {
            Role::Renter => (Some(at), None),
            Role::Lender => (None, Some(at)),
        };
        Ok(Self::new(
            id,
            kind,
            pictures,
            comment,
            agreed_renter,
            agreed_lender,
            EventVersion::new(0),
        ))
    }

    /// Refills a handover that was reopened by a decline.
    ///
    /// The record keeps its identity; content is replaced and the
    /// submitting party is self-agreed again.
    pub fn resubmit(
        self,
        pictures: Vec<PictureUrl>,
        comment: HandoverComment,
        creator: &Role,
        at: AgreedAt,
    ) -> error_stack::Result<Self, KernelError> {
        if !self.is_reopened() {
            return Err(conflict(format!(
                "handover {} has already been submitted and awaits agreement",
                self.id().as_ref()
            )));
        }
        validate_content(self.id(), &pictures, &comment)?;
        let refilled = self.refilled(pictures, comment);
        Ok(match creator {
            Role::Renter => refilled.with_renter_agreement(at),
            Role::Lender => refilled.with_lender_agreement(at),
        })
    }

    /// Records the caller's agreement.
    ///
    /// The returned flag is `false` when the caller's stamp was already
    /// present: a repeated accept is a no-op rather than an error.
    pub fn agree(
        self,
        role: &Role,
        at: AgreedAt,
    ) -> error_stack::Result<(Self, bool), KernelError> {
        if self.is_reopened() {
            return Err(conflict(format!(
                "handover {} was declined and must be re-submitted before it can be agreed",
                self.id().as_ref()
            )));
        }
        if self.agreed_by(role) {
            return Ok((self, false));
        }
        let agreed = match role {
            Role::Renter => self.with_renter_agreement(at),
            Role::Lender => self.with_lender_agreement(at),
        };
        Ok((agreed, true))
    }

    /// Reopens the handover: both agreement stamps and the content are
    /// cleared in place so the record can be re-submitted.
    ///
    /// The returned flag is `false` when the handover was already
    /// reopened. Declining a fully agreed handover is a conflict; the
    /// rental has already moved past it.
    pub fn decline(self) -> error_stack::Result<(Self, bool), KernelError> {
        if self.fully_agreed() {
            return Err(conflict(format!(
                "handover {} is already fully agreed and can no longer be declined",
                self.id().as_ref()
            )));
        }
        if self.is_reopened() {
            return Ok((self, false));
        }
        Ok((self.cleared(), true))
    }

    /// A handover is complete once both parties have agreed.
    pub fn fully_agreed(&self) -> bool {
        self.agreed_renter().is_some() && self.agreed_lender().is_some()
    }

    pub fn agreed_by(&self, role: &Role) -> bool {
        match role {
            Role::Renter => self.agreed_renter().is_some(),
            Role::Lender => self.agreed_lender().is_some(),
        }
    }

    /// True after a decline cleared the record, until it is re-submitted.
    pub fn is_reopened(&self) -> bool {
        self.agreed_renter().is_none() && self.agreed_lender().is_none() && self.pictures().is_empty()
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use crate::entity::{AgreedAt, Handover, HandoverComment, HandoverId, HandoverKind, PictureUrl};
    use crate::role::Role;
    use crate::KernelError;

    fn agreed_at() -> AgreedAt {
        AgreedAt::new(time::OffsetDateTime::from_unix_timestamp(1_700_100_000).unwrap())
    }

    fn pictures() -> Vec<PictureUrl> {
        vec![PictureUrl::new("https://storage.example/pic-1.jpg")]
    }

    fn submitted(creator: &Role) -> Handover {
        Handover::submit(
            HandoverId::new(Uuid::new_v4()),
            HandoverKind::PickUp,
            pictures(),
            HandoverComment::new("scratch on the left side"),
            creator,
            agreed_at(),
        )
        .unwrap()
    }

    fn is_conflict(report: &error_stack::Report<KernelError>) -> bool {
        matches!(report.current_context(), KernelError::Conflict)
    }

    #[test]
    fn creation_self_agrees_the_creator_only() {
        let handover = submitted(&Role::Renter);
        assert!(handover.agreed_by(&Role::Renter));
        assert!(!handover.agreed_by(&Role::Lender));
        assert!(!handover.fully_agreed());
    }

    #[test]
    fn creation_requires_pictures_and_comment() {
        let empty_pictures = Handover::submit(
            HandoverId::new(Uuid::new_v4()),
            HandoverKind::PickUp,
            Vec::new(),
            HandoverComment::new("fine"),
            &Role::Renter,
            agreed_at(),
        );
        assert!(is_conflict(&empty_pictures.unwrap_err()));

        let empty_comment = Handover::submit(
            HandoverId::new(Uuid::new_v4()),
            HandoverKind::PickUp,
            pictures(),
            HandoverComment::new(""),
            &Role::Renter,
            agreed_at(),
        );
        assert!(is_conflict(&empty_comment.unwrap_err()));
    }

    #[test]
    fn counter_party_agreement_completes_the_handover() {
        let handover = submitted(&Role::Renter);
        let (agreed, changed) = handover.agree(&Role::Lender, agreed_at()).unwrap();
        assert!(changed);
        assert!(agreed.fully_agreed());
    }

    #[test]
    fn repeated_agreement_is_a_no_op() {
        let handover = submitted(&Role::Renter);
        let (same, changed) = handover.agree(&Role::Renter, agreed_at()).unwrap();
        assert!(!changed);
        assert!(same.agreed_by(&Role::Renter));
        assert!(!same.fully_agreed());
    }

    #[test]
    fn decline_clears_stamps_and_content() {
        let handover = submitted(&Role::Renter);
        let (reopened, changed) = handover.decline().unwrap();
        assert!(changed);
        assert!(reopened.is_reopened());
        assert!(!reopened.agreed_by(&Role::Renter));
        assert!(!reopened.agreed_by(&Role::Lender));
        assert!(reopened.pictures().is_empty());
        assert!(reopened.comment().as_ref().is_empty());
    }

    #[test]
    fn declined_handover_can_be_resubmitted() {
        let (reopened, _) = submitted(&Role::Renter).decline().unwrap();
        let resubmitted = reopened
            .resubmit(
                pictures(),
                HandoverComment::new("replaced the strap"),
                &Role::Renter,
                agreed_at(),
            )
            .unwrap();
        assert!(resubmitted.agreed_by(&Role::Renter));
        assert!(!resubmitted.fully_agreed());
    }

    #[test]
    fn resubmit_requires_a_reopened_record() {
        let report = submitted(&Role::Renter)
            .resubmit(
                pictures(),
                HandoverComment::new("again"),
                &Role::Renter,
                agreed_at(),
            )
            .unwrap_err();
        assert!(is_conflict(&report));
    }

    #[test]
    fn fully_agreed_handover_cannot_be_declined() {
        let handover = submitted(&Role::Renter);
        let (agreed, _) = handover.agree(&Role::Lender, agreed_at()).unwrap();
        let report = agreed.decline().unwrap_err();
        assert!(is_conflict(&report));
    }

    #[test]
    fn reopened_handover_cannot_be_agreed() {
        let (reopened, _) = submitted(&Role::Lender).decline().unwrap();
        let report = reopened.agree(&Role::Renter, agreed_at()).unwrap_err();
        assert!(is_conflict(&report));
    }
}
