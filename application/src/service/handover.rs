use error_stack::Report;
use uuid::Uuid;

use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{
    DependOnHandoverQuery, DependOnRentalQuery, HandoverQuery, RentalQuery,
};
use kernel::interface::update::{
    DependOnHandoverModifier, DependOnRentalModifier, HandoverModifier, RentalModifier,
};
use kernel::prelude::entity::{
    AgreedAt, Handover, HandoverComment, HandoverId, PictureUrl, Rental, RentalId, UserId,
};
use kernel::prelude::role::Role;
use kernel::KernelError;

use crate::service::rental::rental_not_found;
use crate::service::CAS_RETRY_LIMIT;
use crate::transfer::{CreateHandoverDto, GetHandoverDto, HandoverActionDto, HandoverDto};

fn handover_not_found(rental: &RentalId, handover: &HandoverId) -> Report<KernelError> {
    Report::new(KernelError::NotFound).attach_printable(format!(
        "handover {} does not belong to rental {}",
        handover.as_ref(),
        rental.as_ref()
    ))
}

/// Looks the handover up and verifies it is the one attached to the rental
/// for its kind.
fn attached_handover(
    rental: &Rental,
    handover: Handover,
    handover_id: &HandoverId,
) -> error_stack::Result<Handover, KernelError> {
    if rental.handover_reference(handover.kind()) != Some(handover_id) {
        return Err(handover_not_found(rental.id(), handover_id));
    }
    Ok(handover)
}

#[async_trait::async_trait]
pub trait CreateHandoverService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnRentalModifier<Connection>
    + DependOnHandoverQuery<Connection>
    + DependOnHandoverModifier<Connection>
{
    /// Creates a handover, or re-submits the attached one after a decline.
    ///
    /// The submitting party is self-agreed at creation. A fresh creation
    /// advances the rental past the checkpoint (`PAID -> PICKED_UP`,
    /// `PICK_UP_CONFIRMED -> RETURNED`) in the same transaction.
    async fn create_handover(
        &self,
        dto: CreateHandoverDto,
    ) -> error_stack::Result<HandoverDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let actor = UserId::new(dto.acting_user);
        let kind = dto.kind.clone();
        let pictures: Vec<PictureUrl> = dto.pictures.iter().cloned().map(PictureUrl::new).collect();
        let comment = HandoverComment::new(dto.comment.clone());
        let at = AgreedAt::now();
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            let role = Role::require(&actor, &rental)?;

            if rental.state() == &kind.created_state() {
                // A handover of this kind exists; only a declined one may
                // be re-submitted.
                let handover_id = rental.handover_reference(&kind).cloned().ok_or_else(|| {
                    Report::new(KernelError::Internal).attach_printable(format!(
                        "rental {} is {} but has no {} handover attached",
                        rental_id.as_ref(),
                        rental.state(),
                        kind
                    ))
                })?;
                let handover = self
                    .handover_query()
                    .find_by_id(&mut connection, &handover_id)
                    .await?
                    .ok_or_else(|| handover_not_found(&rental_id, &handover_id))?;
                let resubmitted =
                    handover.resubmit(pictures.clone(), comment.clone(), &role, at.clone())?;
                match self
                    .handover_modifier()
                    .update(&mut connection, &resubmitted)
                    .await
                {
                    Ok(()) => {
                        connection.commit().await?;
                        tracing::info!(
                            rental = %rental_id.as_ref(),
                            handover = %handover_id.as_ref(),
                            "handover re-submitted"
                        );
                        return Ok(HandoverDto::from(resubmitted.with_next_version()));
                    }
                    Err(report) if matches!(report.current_context(), KernelError::Concurrency) => {
                        connection.roll_back().await?;
                        attempt += 1;
                        if attempt >= CAS_RETRY_LIMIT {
                            return Err(report.change_context(KernelError::Conflict));
                        }
                        tracing::warn!(rental = %rental_id.as_ref(), attempt, "concurrent update, retrying");
                    }
                    Err(report) => return Err(report),
                }
                continue;
            }

            let handover = Handover::submit(
                HandoverId::new(Uuid::new_v4()),
                kind.clone(),
                pictures.clone(),
                comment.clone(),
                &role,
                at.clone(),
            )?;
            // Validates the checkpoint and names the required state on a
            // wrong-kind or premature request.
            let attached = rental.attach_handover(&kind, handover.id().clone())?;
            self.handover_modifier()
                .create(&mut connection, &handover)
                .await?;
            match self
                .rental_modifier()
                .update(&mut connection, &attached)
                .await
            {
                Ok(()) => {
                    connection.commit().await?;
                    tracing::info!(
                        rental = %rental_id.as_ref(),
                        handover = %handover.id().as_ref(),
                        kind = %kind,
                        "handover created"
                    );
                    return Ok(HandoverDto::from(handover));
                }
                Err(report) if matches!(report.current_context(), KernelError::Concurrency) => {
                    connection.roll_back().await?;
                    attempt += 1;
                    if attempt >= CAS_RETRY_LIMIT {
                        return Err(report.change_context(KernelError::Conflict));
                    }
                    tracing::warn!(rental = %rental_id.as_ref(), attempt, "concurrent update, retrying");
                }
                Err(report) => return Err(report),
            }
        }
    }
}

impl<Connection: Transaction + Send, T> CreateHandoverService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnRentalModifier<Connection>
        + DependOnHandoverQuery<Connection>
        + DependOnHandoverModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait AcceptHandoverService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnRentalModifier<Connection>
    + DependOnHandoverQuery<Connection>
    + DependOnHandoverModifier<Connection>
{
    /// Records the caller's agreement; when this completes the pair, the
    /// rental is promoted in the same transaction, so the two racing
    /// accepts cannot double-advance or lose the promotion.
    async fn accept_handover(
        &self,
        dto: HandoverActionDto,
    ) -> error_stack::Result<HandoverDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let handover_id = HandoverId::new(dto.handover_id);
        let actor = UserId::new(dto.acting_user);
        let at = AgreedAt::now();
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            let role = Role::require(&actor, &rental)?;
            let handover = self
                .handover_query()
                .find_by_id(&mut connection, &handover_id)
                .await?
                .ok_or_else(|| handover_not_found(&rental_id, &handover_id))?;
            let handover = attached_handover(&rental, handover, &handover_id)?;

            let kind = handover.kind().clone();
            let (agreed, changed) = handover.agree(&role, at.clone())?;
            let fully_agreed = agreed.fully_agreed();

            if changed {
                match self
                    .handover_modifier()
                    .update(&mut connection, &agreed)
                    .await
                {
                    Ok(()) => (),
                    Err(report) if matches!(report.current_context(), KernelError::Concurrency) => {
                        connection.roll_back().await?;
                        attempt += 1;
                        if attempt >= CAS_RETRY_LIMIT {
                            return Err(report.change_context(KernelError::Conflict));
                        }
                        tracing::warn!(rental = %rental_id.as_ref(), attempt, "concurrent update, retrying");
                        continue;
                    }
                    Err(report) => return Err(report),
                }
            }

            if fully_agreed && rental.state() == &kind.created_state() {
                let promoted = rental.confirm_handover(&kind)?;
                match self
                    .rental_modifier()
                    .update(&mut connection, &promoted)
                    .await
                {
                    Ok(()) => {
                        tracing::info!(
                            rental = %rental_id.as_ref(),
                            handover = %handover_id.as_ref(),
                            "handover fully agreed, rental advanced"
                        );
                    }
                    Err(report) if matches!(report.current_context(), KernelError::Concurrency) => {
                        connection.roll_back().await?;
                        attempt += 1;
                        if attempt >= CAS_RETRY_LIMIT {
                            return Err(report.change_context(KernelError::Conflict));
                        }
                        tracing::warn!(rental = %rental_id.as_ref(), attempt, "concurrent update, retrying");
                        continue;
                    }
                    Err(report) => return Err(report),
                }
            }

            connection.commit().await?;
            let result = if changed {
                agreed.with_next_version()
            } else {
                agreed
            };
            return Ok(HandoverDto::from(result));
        }
    }
}

impl<Connection: Transaction + Send, T> AcceptHandoverService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnRentalModifier<Connection>
        + DependOnHandoverQuery<Connection>
        + DependOnHandoverModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait DeclineHandoverService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnHandoverQuery<Connection>
    + DependOnHandoverModifier<Connection>
{
    /// Reopens a not-yet-fully-agreed handover. The rental stays at the
    /// created checkpoint so the handover can be re-submitted.
    async fn decline_handover(
        &self,
        dto: HandoverActionDto,
    ) -> error_stack::Result<HandoverDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let handover_id = HandoverId::new(dto.handover_id);
        let actor = UserId::new(dto.acting_user);
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            Role::require(&actor, &rental)?;
            let handover = self
                .handover_query()
                .find_by_id(&mut connection, &handover_id)
                .await?
                .ok_or_else(|| handover_not_found(&rental_id, &handover_id))?;
            let handover = attached_handover(&rental, handover, &handover_id)?;

            let (declined, changed) = handover.decline()?;
            if changed {
                match self
                    .handover_modifier()
                    .update(&mut connection, &declined)
                    .await
                {
                    Ok(()) => (),
                    Err(report) if matches!(report.current_context(), KernelError::Concurrency) => {
                        connection.roll_back().await?;
                        attempt += 1;
                        if attempt >= CAS_RETRY_LIMIT {
                            return Err(report.change_context(KernelError::Conflict));
                        }
                        tracing::warn!(rental = %rental_id.as_ref(), attempt, "concurrent update, retrying");
                        continue;
                    }
                    Err(report) => return Err(report),
                }
            }

            connection.commit().await?;
            tracing::info!(
                rental = %rental_id.as_ref(),
                handover = %handover_id.as_ref(),
                "handover declined and reopened"
            );
            let result = if changed {
                declined.with_next_version()
            } else {
                declined
            };
            return Ok(HandoverDto::from(result));
        }
    }
}

impl<Connection: Transaction + Send, T> DeclineHandoverService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnHandoverQuery<Connection>
        + DependOnHandoverModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait GetHandoverService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnHandoverQuery<Connection>
{
    async fn get_handover(
        &self,
        dto: GetHandoverDto,
    ) -> error_stack::Result<Option<HandoverDto>, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let handover_id = HandoverId::new(dto.handover_id);
        let mut connection = self.database_connection().transact().await?;
        let rental = self
            .rental_query()
            .find_by_id(&mut connection, &rental_id)
            .await?
            .ok_or_else(|| rental_not_found(&rental_id))?;
        let handover = self
            .handover_query()
            .find_by_id(&mut connection, &handover_id)
            .await?;
        connection.commit().await?;
        match handover {
            Some(handover) if rental.handover_reference(handover.kind()) == Some(&handover_id) => {
                Ok(Some(HandoverDto::from(handover)))
            }
            _ => Ok(None),
        }
    }
}

impl<Connection: Transaction + Send, T> GetHandoverService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnHandoverQuery<Connection>
{
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use driver::database::MemoryDatabase;
    use kernel::prelude::entity::{HandoverKind, InsuranceType, RatingTarget, RentalState};
    use kernel::prelude::policy::RatingPolicy;
    use kernel::KernelError;

    use crate::service::{
        AcceptHandoverService, AcceptOfferService, CloseRentalService, ConfirmPaymentService,
        CreateHandoverService, CreateRentalService, DeclineHandoverService, GetRentalService,
        SubmitRatingService,
    };
    use crate::transfer::{
        CloseRentalDto, CreateHandoverDto, CreateRentalDto, GetRentalDto, HandoverActionDto,
        OfferDecisionDto, PaymentConfirmedDto, SubmitRatingDto,
    };

    struct Fixture {
        db: MemoryDatabase,
        rental_id: Uuid,
        renter: Uuid,
        lender: Uuid,
    }

    /// Drives a fresh rental to `PAID`.
    async fn paid_rental() -> error_stack::Result<Fixture, KernelError> {
        let db = MemoryDatabase::new();
        let renter = Uuid::new_v4();
        let lender = Uuid::new_v4();
        let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let offered = db
            .create_rental(CreateRentalDto {
                acting_user: renter,
                lender_id: lender,
                item_id: Uuid::new_v4(),
                start,
                end: start + time::Duration::days(7),
                price: 3500,
                insurance_price: 500,
                insurance_type: InsuranceType::Basic,
            })
            .await?;
        db.accept_offer(OfferDecisionDto {
            rental_id: offered.id,
            acting_user: lender,
        })
        .await?;
        db.confirm_payment(PaymentConfirmedDto {
            rental_id: offered.id,
            acting_user: renter,
        })
        .await?;
        Ok(Fixture {
            db,
            rental_id: offered.id,
            renter,
            lender,
        })
    }

    fn pickup_dto(fixture: &Fixture, acting_user: Uuid) -> CreateHandoverDto {
        CreateHandoverDto {
            rental_id: fixture.rental_id,
            acting_user,
            kind: HandoverKind::PickUp,
            pictures: vec!["https://storage.example/pickup-1.jpg".to_string()],
            comment: "small dent on the frame".to_string(),
        }
    }

    async fn rental_state(fixture: &Fixture) -> RentalState {
        fixture
            .db
            .get_rental(GetRentalDto {
                id: fixture.rental_id,
            })
            .await
            .unwrap()
            .expect("rental exists")
            .state
    }

    #[tokio::test]
    async fn creation_self_agrees_and_advances_the_rental(
    ) -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        let handover = fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;

        assert!(handover.agreed_renter.is_some());
        assert!(handover.agreed_lender.is_none());
        assert_eq!(rental_state(&fixture).await, RentalState::PickedUp);
        Ok(())
    }

    #[tokio::test]
    async fn counter_party_accept_confirms_the_pickup() -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        let handover = fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;

        let agreed = fixture
            .db
            .accept_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: handover.id,
                acting_user: fixture.lender,
            })
            .await?;
        assert!(agreed.agreed_renter.is_some());
        assert!(agreed.agreed_lender.is_some());
        assert_eq!(rental_state(&fixture).await, RentalState::PickUpConfirmed);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_accept_is_idempotent() -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        let handover = fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;

        let first = fixture
            .db
            .accept_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: handover.id,
                acting_user: fixture.renter,
            })
            .await?;
        let second = fixture
            .db
            .accept_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: handover.id,
                acting_user: fixture.renter,
            })
            .await?;
        assert_eq!(first.agreed_renter, second.agreed_renter);
        assert!(second.agreed_lender.is_none());
        assert_eq!(rental_state(&fixture).await, RentalState::PickedUp);
        Ok(())
    }

    #[tokio::test]
    async fn decline_reopens_for_resubmission() -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        let handover = fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;

        let declined = fixture
            .db
            .decline_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: handover.id,
                acting_user: fixture.lender,
            })
            .await?;
        assert!(declined.agreed_renter.is_none());
        assert!(declined.agreed_lender.is_none());
        assert!(declined.pictures.is_empty());
        assert!(declined.comment.is_empty());
        assert_eq!(rental_state(&fixture).await, RentalState::PickedUp);

        // The renter submits the pickup again, into the same record.
        let resubmitted = fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;
        assert_eq!(resubmitted.id, handover.id);
        assert!(resubmitted.agreed_renter.is_some());
        assert!(resubmitted.agreed_lender.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn return_handover_before_pickup_confirmation_names_required_state(
    ) -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        let report = fixture
            .db
            .create_handover(CreateHandoverDto {
                rental_id: fixture.rental_id,
                acting_user: fixture.renter,
                kind: HandoverKind::Return,
                pictures: vec!["https://storage.example/return-1.jpg".to_string()],
                comment: "as received".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Conflict));
        assert!(format!("{report:?}").contains("PICK_UP_CONFIRMED"));
        Ok(())
    }

    #[tokio::test]
    async fn stranger_actions_are_forbidden() -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        let handover = fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;

        let report = fixture
            .db
            .accept_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: handover.id,
                acting_user: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Forbidden));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_handover_is_not_found() -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;

        let report = fixture
            .db
            .accept_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: Uuid::new_v4(),
                acting_user: fixture.lender,
            })
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::NotFound));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_accepts_promote_exactly_once() -> error_stack::Result<(), KernelError> {
        for _ in 0..20 {
            let fixture = paid_rental().await?;
            let handover = fixture
                .db
                .create_handover(pickup_dto(&fixture, fixture.renter))
                .await?;

            let renter_db = fixture.db.clone();
            let renter_dto = HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: handover.id,
                acting_user: fixture.renter,
            };
            let lender_db = fixture.db.clone();
            let lender_dto = HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: handover.id,
                acting_user: fixture.lender,
            };

            let renter_task =
                tokio::spawn(async move { renter_db.accept_handover(renter_dto).await });
            let lender_task =
                tokio::spawn(async move { lender_db.accept_handover(lender_dto).await });

            renter_task.await.expect("renter task panicked")?;
            lender_task.await.expect("lender task panicked")?;

            let rental = fixture
                .db
                .get_rental(GetRentalDto {
                    id: fixture.rental_id,
                })
                .await?
                .expect("rental exists");
            assert_eq!(rental.state, RentalState::PickUpConfirmed);
            // create 0 -> accept 1 -> pay 2 -> handover 3 -> exactly one
            // promotion 4.
            assert_eq!(rental.version, 4);
        }
        Ok(())
    }

    #[tokio::test]
    async fn full_lifecycle_reaches_closed() -> error_stack::Result<(), KernelError> {
        let fixture = paid_rental().await?;
        let pickup = fixture
            .db
            .create_handover(pickup_dto(&fixture, fixture.renter))
            .await?;
        fixture
            .db
            .accept_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: pickup.id,
                acting_user: fixture.lender,
            })
            .await?;

        let ret = fixture
            .db
            .create_handover(CreateHandoverDto {
                rental_id: fixture.rental_id,
                acting_user: fixture.lender,
                kind: HandoverKind::Return,
                pictures: vec!["https://storage.example/return-1.jpg".to_string()],
                comment: "returned in good shape".to_string(),
            })
            .await?;
        assert_eq!(rental_state(&fixture).await, RentalState::Returned);
        fixture
            .db
            .accept_handover(HandoverActionDto {
                rental_id: fixture.rental_id,
                handover_id: ret.id,
                acting_user: fixture.renter,
            })
            .await?;
        assert_eq!(rental_state(&fixture).await, RentalState::ReturnConfirmed);

        let policy = RatingPolicy::BothParties;
        for (actor, target) in [
            (fixture.renter, RatingTarget::Item),
            (fixture.renter, RatingTarget::Lender),
            (fixture.lender, RatingTarget::Renter),
        ] {
            fixture
                .db
                .submit_rating(SubmitRatingDto {
                    rental_id: fixture.rental_id,
                    acting_user: actor,
                    target,
                    policy: policy.clone(),
                })
                .await?;
        }
        assert_eq!(rental_state(&fixture).await, RentalState::Rated);

        let closed = fixture
            .db
            .close_rental(CloseRentalDto {
                rental_id: fixture.rental_id,
                acting_user: fixture.renter,
            })
            .await?;
        assert_eq!(closed.state, RentalState::Closed);
        Ok(())
    }
}
