use error_stack::Report;

use crate::entity::{
    EventVersion, HandoverId, HandoverKind, InsurancePrice, InsuranceType, ItemId, Price, RatedAt,
    Rental, RentalId, RentalPeriod, RentalState, RatingTarget, UserId,
};
use crate::policy::RatingPolicy;
use crate::role::Role;
use crate::KernelError;

impl HandoverKind {
    /// State the rental must hold before a handover of this kind may be
    /// created.
    pub fn required_state(&self) -> RentalState {
        match self {
            HandoverKind::PickUp => RentalState::Paid,
            HandoverKind::Return => RentalState::PickUpConfirmed,
        }
    }

    /// State the rental enters when the handover is created.
    pub fn created_state(&self) -> RentalState {
        match self {
            HandoverKind::PickUp => RentalState::PickedUp,
            HandoverKind::Return => RentalState::Returned,
        }
    }

    /// State the rental enters once the handover is fully agreed.
    pub fn confirmed_state(&self) -> RentalState {
        match self {
            HandoverKind::PickUp => RentalState::PickUpConfirmed,
            HandoverKind::Return => RentalState::ReturnConfirmed,
        }
    }
}

fn conflict(message: String) -> Report<KernelError> {
    Report::new(KernelError::Conflict).attach_printable(message)
}

fn forbidden(message: String) -> Report<KernelError> {
    Report::new(KernelError::Forbidden).attach_printable(message)
}

impl Rental {
    /// Creates a new rental in the `OFFER` state.
    pub fn offer(
        id: RentalId,
        renter_id: UserId,
        lender_id: UserId,
        item_id: ItemId,
        period: RentalPeriod,
        price: Price,
        insurance_price: InsurancePrice,
        insurance_type: InsuranceType,
    ) -> error_stack::Result<Self, KernelError> {
        if renter_id == lender_id {
            return Err(conflict(format!(
                "rental {} cannot be offered: renter and lender must be different users",
                id.as_ref()
            )));
        }
        if period.end() <= period.start() {
            return Err(conflict(format!(
                "rental {} cannot be offered: the period must end after it starts",
                id.as_ref()
            )));
        }
        Ok(Self::new(
            id,
            renter_id,
            lender_id,
            item_id,
            period,
            price,
            insurance_price,
            insurance_type,
            RentalState::Offer,
            None,
            None,
            None,
            None,
            None,
            EventVersion::new(0),
        ))
    }

    /// `OFFER -> ACCEPTED`, lender only.
    pub fn accept_offer(self, role: &Role) -> error_stack::Result<Self, KernelError> {
        if role != &Role::Lender {
            return Err(forbidden(format!(
                "only the lender may accept the offer for rental {}",
                self.id().as_ref()
            )));
        }
        self.require_state(&RentalState::Offer, "the offer can be accepted")?;
        Ok(self.with_state(RentalState::Accepted))
    }

    /// `OFFER -> DECLINED`, lender only. `DECLINED` is terminal.
    pub fn decline_offer(self, role: &Role) -> error_stack::Result<Self, KernelError> {
        if role != &Role::Lender {
            return Err(forbidden(format!(
                "only the lender may decline the offer for rental {}",
                self.id().as_ref()
            )));
        }
        self.require_state(&RentalState::Offer, "the offer can be declined")?;
        Ok(self.with_state(RentalState::Declined))
    }

    /// `ACCEPTED -> PAID`, driven by the payment gateway's success signal
    /// for the renter.
    ///
    /// Returns `None` when the signal is a duplicate (the rental is already
    /// at or past `PAID`), so repeated delivery applies the transition
    /// exactly once.
    pub fn confirm_payment(self, role: &Role) -> error_stack::Result<Option<Self>, KernelError> {
        if role != &Role::Renter {
            return Err(forbidden(format!(
                "only the renter may confirm payment for rental {}",
                self.id().as_ref()
            )));
        }
        match self.state().clone() {
            RentalState::Accepted => Ok(Some(self.with_state(RentalState::Paid))),
            RentalState::Paid
            | RentalState::PickedUp
            | RentalState::PickUpConfirmed
            | RentalState::Returned
            | RentalState::ReturnConfirmed
            | RentalState::Rated
            | RentalState::Closed => Ok(None),
            state => Err(conflict(format!(
                "rental {} is {}, must be {} before payment can be confirmed",
                self.id().as_ref(),
                state,
                RentalState::Accepted
            ))),
        }
    }

    /// `PAID -> PICKED_UP` / `PICK_UP_CONFIRMED -> RETURNED`: records the
    /// freshly created handover and advances the rental past the creation
    /// checkpoint.
    pub fn attach_handover(
        self,
        kind: &HandoverKind,
        handover: HandoverId,
    ) -> error_stack::Result<Self, KernelError> {
        let required = kind.required_state();
        if self.state() != &required {
            return Err(conflict(format!(
                "rental {} is {}, must be {} before a {} handover may be created",
                self.id().as_ref(),
                self.state(),
                required,
                kind
            )));
        }
        let created = kind.created_state();
        let attached = match kind {
            HandoverKind::PickUp => self.with_pickup_handover(handover),
            HandoverKind::Return => self.with_return_handover(handover),
        };
        Ok(attached.with_state(created))
    }

    /// `PICKED_UP -> PICK_UP_CONFIRMED` / `RETURNED -> RETURN_CONFIRMED`:
    /// consumed when the handover of the given kind became fully agreed.
    pub fn confirm_handover(self, kind: &HandoverKind) -> error_stack::Result<Self, KernelError> {
        let created = kind.created_state();
        if self.state() != &created {
            return Err(conflict(format!(
                "rental {} is {}, must be {} for the {} handover to be confirmed",
                self.id().as_ref(),
                self.state(),
                created,
                kind
            )));
        }
        Ok(self.with_state(kind.confirmed_state()))
    }

    /// The handover reference recorded for the given kind.
    pub fn handover_reference(&self, kind: &HandoverKind) -> Option<&HandoverId> {
        match kind {
            HandoverKind::PickUp => self.pickup_handover().as_ref(),
            HandoverKind::Return => self.return_handover().as_ref(),
        }
    }

    /// Consumes a "rating submitted" event.
    ///
    /// The renter rates the item and the lender; the lender rates the
    /// renter. Each slot is stamped once; a repeated submission returns
    /// `None`. When the configured policy is satisfied the rental advances
    /// `RETURN_CONFIRMED -> RATED`.
    pub fn submit_rating(
        self,
        role: &Role,
        target: &RatingTarget,
        policy: &RatingPolicy,
        at: RatedAt,
    ) -> error_stack::Result<Option<Self>, KernelError> {
        match self.state() {
            RentalState::ReturnConfirmed | RentalState::Rated => (),
            state => {
                return Err(conflict(format!(
                    "rental {} is {}, must be {} before ratings may be submitted",
                    self.id().as_ref(),
                    state,
                    RentalState::ReturnConfirmed
                )))
            }
        }

        let already_stamped = match (role, target) {
            (Role::Renter, RatingTarget::Item) => self.renter_rated_item().is_some(),
            (Role::Renter, RatingTarget::Lender) => self.renter_rated_lender().is_some(),
            (Role::Lender, RatingTarget::Renter) => self.lender_rated_renter().is_some(),
            (role, target) => {
                return Err(forbidden(format!(
                    "the {} may not rate the {} on rental {}",
                    role,
                    target,
                    self.id().as_ref()
                )))
            }
        };
        if already_stamped {
            return Ok(None);
        }

        let stamped = match (role, target) {
            (Role::Renter, RatingTarget::Item) => self.with_renter_rated_item(at),
            (Role::Renter, RatingTarget::Lender) => self.with_renter_rated_lender(at),
            _ => self.with_lender_rated_renter(at),
        };

        let renter_complete =
            stamped.renter_rated_item().is_some() && stamped.renter_rated_lender().is_some();
        let lender_complete = stamped.lender_rated_renter().is_some();
        if stamped.state() == &RentalState::ReturnConfirmed
            && policy.satisfied(renter_complete, lender_complete)
        {
            return Ok(Some(stamped.with_state(RentalState::Rated)));
        }
        Ok(Some(stamped))
    }

    /// `RATED -> CLOSED`, the system-driven final transition. `CLOSED` is
    /// terminal.
    pub fn close(self) -> error_stack::Result<Self, KernelError> {
        self.require_state(&RentalState::Rated, "the rental can be closed")?;
        Ok(self.with_state(RentalState::Closed))
    }

    fn require_state(
        &self,
        required: &RentalState,
        action: &str,
    ) -> error_stack::Result<(), KernelError> {
        if self.state() == required {
            Ok(())
        } else {
            Err(conflict(format!(
                "rental {} is {}, must be {} before {}",
                self.id().as_ref(),
                self.state(),
                required,
                action
            )))
        }
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use crate::entity::{
        HandoverId, HandoverKind, InsurancePrice, InsuranceType, ItemId, Price, RatedAt, Rental,
        RentalId, RentalPeriod, RentalState, RatingTarget, UserId,
    };
    use crate::policy::RatingPolicy;
    use crate::role::Role;
    use crate::KernelError;

    fn period() -> RentalPeriod {
        let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        RentalPeriod::new(start, start + time::Duration::days(3))
    }

    fn offer() -> Rental {
        Rental::offer(
            RentalId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            ItemId::new(Uuid::new_v4()),
            period(),
            Price::new(2500),
            InsurancePrice::new(500),
            InsuranceType::Basic,
        )
        .unwrap()
    }

    fn rated_at() -> RatedAt {
        RatedAt::new(time::OffsetDateTime::from_unix_timestamp(1_700_500_000).unwrap())
    }

    fn at_state(state: RentalState) -> Rental {
        offer().with_state(state)
    }

    fn is_conflict(report: &error_stack::Report<KernelError>) -> bool {
        matches!(report.current_context(), KernelError::Conflict)
    }

    #[test]
    fn offer_rejects_identical_parties() {
        let user = UserId::new(Uuid::new_v4());
        let result = Rental::offer(
            RentalId::new(Uuid::new_v4()),
            user.clone(),
            user,
            ItemId::new(Uuid::new_v4()),
            period(),
            Price::new(100),
            InsurancePrice::new(0),
            InsuranceType::None,
        );
        assert!(is_conflict(&result.unwrap_err()));
    }

    #[test]
    fn offer_rejects_inverted_period() {
        let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let result = Rental::offer(
            RentalId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            ItemId::new(Uuid::new_v4()),
            RentalPeriod::new(start, start - time::Duration::hours(1)),
            Price::new(100),
            InsurancePrice::new(0),
            InsuranceType::None,
        );
        assert!(is_conflict(&result.unwrap_err()));
    }

    #[test]
    fn lender_accepts_offer() {
        let accepted = offer().accept_offer(&Role::Lender).unwrap();
        assert_eq!(accepted.state(), &RentalState::Accepted);
    }

    #[test]
    fn renter_cannot_accept_offer() {
        let report = offer().accept_offer(&Role::Renter).unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Forbidden));
    }

    #[test]
    fn lender_declines_offer_terminally() {
        let declined = offer().decline_offer(&Role::Lender).unwrap();
        assert_eq!(declined.state(), &RentalState::Declined);
        assert!(declined.state().is_terminal());

        let report = declined.accept_offer(&Role::Lender).unwrap_err();
        assert!(is_conflict(&report));
    }

    #[test]
    fn payment_confirms_once_then_is_idempotent() {
        let accepted = offer().accept_offer(&Role::Lender).unwrap();
        let paid = accepted.confirm_payment(&Role::Renter).unwrap().unwrap();
        assert_eq!(paid.state(), &RentalState::Paid);

        let duplicate = paid.confirm_payment(&Role::Renter).unwrap();
        assert!(duplicate.is_none());
    }

    #[test]
    fn payment_requires_renter() {
        let accepted = offer().accept_offer(&Role::Lender).unwrap();
        let report = accepted.confirm_payment(&Role::Lender).unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Forbidden));
    }

    #[test]
    fn payment_before_acceptance_is_conflict() {
        let report = offer().confirm_payment(&Role::Renter).unwrap_err();
        assert!(is_conflict(&report));
    }

    #[test]
    fn pickup_handover_attaches_only_from_paid() {
        let handover = HandoverId::new(Uuid::new_v4());
        let picked_up = at_state(RentalState::Paid)
            .attach_handover(&HandoverKind::PickUp, handover.clone())
            .unwrap();
        assert_eq!(picked_up.state(), &RentalState::PickedUp);
        assert_eq!(picked_up.pickup_handover(), &Some(handover));
    }

    #[test]
    fn return_handover_before_pickup_confirmation_names_required_state() {
        let report = at_state(RentalState::Paid)
            .attach_handover(&HandoverKind::Return, HandoverId::new(Uuid::new_v4()))
            .unwrap_err();
        assert!(is_conflict(&report));
        let printable = format!("{report:?}");
        assert!(printable.contains("PICK_UP_CONFIRMED"));
    }

    #[test]
    fn handover_confirmation_advances_and_is_guarded() {
        let confirmed = at_state(RentalState::PickedUp)
            .confirm_handover(&HandoverKind::PickUp)
            .unwrap();
        assert_eq!(confirmed.state(), &RentalState::PickUpConfirmed);

        let report = at_state(RentalState::Paid)
            .confirm_handover(&HandoverKind::PickUp)
            .unwrap_err();
        assert!(is_conflict(&report));

        let returned = at_state(RentalState::Returned)
            .confirm_handover(&HandoverKind::Return)
            .unwrap();
        assert_eq!(returned.state(), &RentalState::ReturnConfirmed);
    }

    #[test]
    fn ratings_complete_per_role_and_policy() {
        let rental = at_state(RentalState::ReturnConfirmed);
        let policy = RatingPolicy::BothParties;

        let rental = rental
            .submit_rating(&Role::Renter, &RatingTarget::Item, &policy, rated_at())
            .unwrap()
            .unwrap();
        assert_eq!(rental.state(), &RentalState::ReturnConfirmed);

        let rental = rental
            .submit_rating(&Role::Renter, &RatingTarget::Lender, &policy, rated_at())
            .unwrap()
            .unwrap();
        // Renter is complete but the lender has not rated yet.
        assert_eq!(rental.state(), &RentalState::ReturnConfirmed);

        let rental = rental
            .submit_rating(&Role::Lender, &RatingTarget::Renter, &policy, rated_at())
            .unwrap()
            .unwrap();
        assert_eq!(rental.state(), &RentalState::Rated);
    }

    #[test]
    fn either_party_policy_advances_on_first_complete_actor() {
        let policy = RatingPolicy::EitherParty;
        let rental = at_state(RentalState::ReturnConfirmed)
            .submit_rating(&Role::Lender, &RatingTarget::Renter, &policy, rated_at())
            .unwrap()
            .unwrap();
        assert_eq!(rental.state(), &RentalState::Rated);
    }

    #[test]
    fn repeated_rating_is_a_no_op() {
        let policy = RatingPolicy::BothParties;
        let rental = at_state(RentalState::ReturnConfirmed)
            .submit_rating(&Role::Renter, &RatingTarget::Item, &policy, rated_at())
            .unwrap()
            .unwrap();
        let duplicate = rental
            .submit_rating(&Role::Renter, &RatingTarget::Item, &policy, rated_at())
            .unwrap();
        assert!(duplicate.is_none());
    }

    #[test]
    fn cross_role_rating_is_forbidden() {
        let policy = RatingPolicy::BothParties;
        let report = at_state(RentalState::ReturnConfirmed)
            .submit_rating(&Role::Lender, &RatingTarget::Item, &policy, rated_at())
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Forbidden));
    }

    #[test]
    fn rating_before_return_confirmation_is_conflict() {
        let policy = RatingPolicy::BothParties;
        let report = at_state(RentalState::PickedUp)
            .submit_rating(&Role::Renter, &RatingTarget::Item, &policy, rated_at())
            .unwrap_err();
        assert!(is_conflict(&report));
    }

    #[test]
    fn close_requires_rated_and_is_terminal() {
        let closed = at_state(RentalState::Rated).close().unwrap();
        assert_eq!(closed.state(), &RentalState::Closed);
        assert!(closed.state().is_terminal());

        let report = closed.close().unwrap_err();
        assert!(is_conflict(&report));
    }
}
