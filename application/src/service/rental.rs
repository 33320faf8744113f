use error_stack::Report;
use uuid::Uuid;

use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{DependOnRentalQuery, RentalQuery};
use kernel::interface::update::{DependOnRentalModifier, RentalModifier};
use kernel::prelude::entity::{
    InsurancePrice, ItemId, Price, RatedAt, Rental, RentalId, RentalPeriod, UserId,
};
use kernel::prelude::role::Role;
use kernel::KernelError;

use crate::service::CAS_RETRY_LIMIT;
use crate::transfer::{
    CloseRentalDto, CreateRentalDto, GetParticipantRentalsDto, GetRentalDto, OfferDecisionDto,
    PaymentConfirmedDto, RentalDto, SubmitRatingDto,
};

pub(in crate::service) fn rental_not_found(id: &RentalId) -> Report<KernelError> {
    Report::new(KernelError::NotFound)
        .attach_printable(format!("rental {} does not exist", id.as_ref()))
}

#[async_trait::async_trait]
pub trait CreateRentalService<Connection: Transaction + Send>:
    'static + Sync + Send + DependOnDatabaseConnection<Connection> + DependOnRentalModifier<Connection>
{
    async fn create_rental(
        &self,
        dto: CreateRentalDto,
    ) -> error_stack::Result<RentalDto, KernelError> {
        let mut connection = self.database_connection().transact().await?;

        let id = RentalId::new(Uuid::new_v4());
        let rental = Rental::offer(
            id,
            UserId::new(dto.acting_user),
            UserId::new(dto.lender_id),
            ItemId::new(dto.item_id),
            RentalPeriod::new(dto.start, dto.end),
            Price::new(dto.price),
            InsurancePrice::new(dto.insurance_price),
            dto.insurance_type,
        )?;
        self.rental_modifier().create(&mut connection, &rental).await?;
        connection.commit().await?;

        tracing::info!(rental = %rental.id().as_ref(), "rental offered");
        Ok(RentalDto::from(rental))
    }
}

impl<Connection: Transaction + Send, T> CreateRentalService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnRentalModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait GetRentalService<Connection: Transaction + Send>:
    'static + Sync + Send + DependOnDatabaseConnection<Connection> + DependOnRentalQuery<Connection>
{
    async fn get_rental(
        &self,
        dto: GetRentalDto,
    ) -> error_stack::Result<Option<RentalDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let rental = self
            .rental_query()
            .find_by_id(&mut connection, &RentalId::new(dto.id))
            .await?;
        connection.commit().await?;
        Ok(rental.map(RentalDto::from))
    }

    async fn get_participant_rentals(
        &self,
        dto: GetParticipantRentalsDto,
    ) -> error_stack::Result<Vec<RentalDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let rentals = self
            .rental_query()
            .find_by_participant(&mut connection, &UserId::new(dto.user_id))
            .await?;
        connection.commit().await?;
        Ok(rentals.into_iter().map(RentalDto::from).collect())
    }
}

impl<Connection: Transaction + Send, T> GetRentalService<Connection> for T where
    T: DependOnDatabaseConnection<Connection> + DependOnRentalQuery<Connection>
{
}

#[async_trait::async_trait]
pub trait AcceptOfferService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnRentalModifier<Connection>
{
    async fn accept_offer(
        &self,
        dto: OfferDecisionDto,
    ) -> error_stack::Result<RentalDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let actor = UserId::new(dto.acting_user);
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            let role = Role::require(&actor, &rental)?;
            let accepted = rental.accept_offer(&role)?;
            match self
                .rental_modifier()
                .update(&mut connection, &accepted)
                .await
            {
                Ok(()) => {
                    connection.commit().await?;
                    tracing::info!(rental = %rental_id.as_ref(), "offer accepted");
                    return Ok(RentalDto::from(accepted.with_next_version()));
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

    async fn decline_offer(
        &self,
        dto: OfferDecisionDto,
    ) -> error_stack::Result<RentalDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let actor = UserId::new(dto.acting_user);
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            let role = Role::require(&actor, &rental)?;
            let declined = rental.decline_offer(&role)?;
            match self
                .rental_modifier()
                .update(&mut connection, &declined)
                .await
            {
                Ok(()) => {
                    connection.commit().await?;
                    tracing::info!(rental = %rental_id.as_ref(), "offer declined");
                    return Ok(RentalDto::from(declined.with_next_version()));
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

impl<Connection: Transaction + Send, T> AcceptOfferService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnRentalModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait ConfirmPaymentService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnRentalModifier<Connection>
{
    /// Consumes the payment gateway's success signal. Duplicate delivery
    /// leaves the rental untouched and succeeds.
    async fn confirm_payment(
        &self,
        dto: PaymentConfirmedDto,
    ) -> error_stack::Result<RentalDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let actor = UserId::new(dto.acting_user);
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            let role = Role::require(&actor, &rental)?;
            let current = rental.clone();
            let paid = match rental.confirm_payment(&role)? {
                Some(paid) => paid,
                None => {
                    // Duplicate signal: the rental is already at or past PAID.
                    connection.commit().await?;
                    return Ok(RentalDto::from(current));
                }
            };
            match self.rental_modifier().update(&mut connection, &paid).await {
                Ok(()) => {
                    connection.commit().await?;
                    tracing::info!(rental = %rental_id.as_ref(), "payment confirmed");
                    return Ok(RentalDto::from(paid.with_next_version()));
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

impl<Connection: Transaction + Send, T> ConfirmPaymentService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnRentalModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait SubmitRatingService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnRentalModifier<Connection>
{
    /// Consumes a "rating submitted" event from the rating subsystem.
    async fn submit_rating(
        &self,
        dto: SubmitRatingDto,
    ) -> error_stack::Result<RentalDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let actor = UserId::new(dto.acting_user);
        let at = RatedAt::now();
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            let role = Role::require(&actor, &rental)?;
            let current = rental.clone();
            let rated = match rental.submit_rating(&role, &dto.target, &dto.policy, at.clone())? {
                Some(rated) => rated,
                None => {
                    // The slot was already stamped; nothing to write.
                    connection.commit().await?;
                    return Ok(RentalDto::from(current));
                }
            };
            match self.rental_modifier().update(&mut connection, &rated).await {
                Ok(()) => {
                    connection.commit().await?;
                    tracing::info!(
                        rental = %rental_id.as_ref(),
                        rating = %dto.target,
                        "rating recorded"
                    );
                    return Ok(RentalDto::from(rated.with_next_version()));
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

impl<Connection: Transaction + Send, T> SubmitRatingService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnRentalModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait CloseRentalService<Connection: Transaction + Send>:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection<Connection>
    + DependOnRentalQuery<Connection>
    + DependOnRentalModifier<Connection>
{
    async fn close_rental(
        &self,
        dto: CloseRentalDto,
    ) -> error_stack::Result<RentalDto, KernelError> {
        let rental_id = RentalId::new(dto.rental_id);
        let actor = UserId::new(dto.acting_user);
        let mut attempt = 0;
        loop {
            let mut connection = self.database_connection().transact().await?;
            let rental = self
                .rental_query()
                .find_by_id(&mut connection, &rental_id)
                .await?
                .ok_or_else(|| rental_not_found(&rental_id))?;
            // Either participant may close a rated rental.
            Role::require(&actor, &rental)?;
            let closed = rental.close()?;
            match self
                .rental_modifier()
                .update(&mut connection, &closed)
                .await
            {
                Ok(()) => {
                    connection.commit().await?;
                    tracing::info!(rental = %rental_id.as_ref(), "rental closed");
                    return Ok(RentalDto::from(closed.with_next_version()));
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

impl<Connection: Transaction + Send, T> CloseRentalService<Connection> for T where
    T: DependOnDatabaseConnection<Connection>
        + DependOnRentalQuery<Connection>
        + DependOnRentalModifier<Connection>
{
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use driver::database::MemoryDatabase;
    use kernel::prelude::entity::{InsuranceType, RentalState};
    use kernel::KernelError;

    use crate::service::{AcceptOfferService, ConfirmPaymentService, CreateRentalService};
    use crate::transfer::{CreateRentalDto, OfferDecisionDto, PaymentConfirmedDto};

    fn create_dto(renter: Uuid, lender: Uuid) -> CreateRentalDto {
        let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        CreateRentalDto {
            acting_user: renter,
            lender_id: lender,
            item_id: Uuid::new_v4(),
            start,
            end: start + time::Duration::days(7),
            price: 3500,
            insurance_price: 500,
            insurance_type: InsuranceType::Basic,
        }
    }

    #[tokio::test]
    async fn lender_accepts_offer_then_renter_may_not() -> error_stack::Result<(), KernelError> {
        let db = MemoryDatabase::new();
        let renter = Uuid::new_v4();
        let lender = Uuid::new_v4();
        let offered = db.create_rental(create_dto(renter, lender)).await?;
        assert_eq!(offered.state, RentalState::Offer);

        let accepted = db
            .accept_offer(OfferDecisionDto {
                rental_id: offered.id,
                acting_user: lender,
            })
            .await?;
        assert_eq!(accepted.state, RentalState::Accepted);

        let report = db
            .accept_offer(OfferDecisionDto {
                rental_id: offered.id,
                acting_user: renter,
            })
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Forbidden));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_payment_signal_is_idempotent() -> error_stack::Result<(), KernelError> {
        let db = MemoryDatabase::new();
        let renter = Uuid::new_v4();
        let lender = Uuid::new_v4();
        let offered = db.create_rental(create_dto(renter, lender)).await?;
        db.accept_offer(OfferDecisionDto {
            rental_id: offered.id,
            acting_user: lender,
        })
        .await?;

        let paid = db
            .confirm_payment(PaymentConfirmedDto {
                rental_id: offered.id,
                acting_user: renter,
            })
            .await?;
        assert_eq!(paid.state, RentalState::Paid);
        let paid_version = paid.version;

        let duplicate = db
            .confirm_payment(PaymentConfirmedDto {
                rental_id: offered.id,
                acting_user: renter,
            })
            .await?;
        assert_eq!(duplicate.state, RentalState::Paid);
        assert_eq!(duplicate.version, paid_version);
        Ok(())
    }

    #[tokio::test]
    async fn payment_by_the_lender_is_forbidden() -> error_stack::Result<(), KernelError> {
        let db = MemoryDatabase::new();
        let renter = Uuid::new_v4();
        let lender = Uuid::new_v4();
        let offered = db.create_rental(create_dto(renter, lender)).await?;
        db.accept_offer(OfferDecisionDto {
            rental_id: offered.id,
            acting_user: lender,
        })
        .await?;

        let report = db
            .confirm_payment(PaymentConfirmedDto {
                rental_id: offered.id,
                acting_user: lender,
            })
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Forbidden));
        Ok(())
    }

    #[tokio::test]
    async fn declined_offer_is_terminal() -> error_stack::Result<(), KernelError> {
        let db = MemoryDatabase::new();
        let renter = Uuid::new_v4();
        let lender = Uuid::new_v4();
        let offered = db.create_rental(create_dto(renter, lender)).await?;

        let declined = db
            .decline_offer(OfferDecisionDto {
                rental_id: offered.id,
                acting_user: lender,
            })
            .await?;
        assert_eq!(declined.state, RentalState::Declined);

        let report = db
            .accept_offer(OfferDecisionDto {
                rental_id: offered.id,
                acting_user: lender,
            })
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Conflict));
        Ok(())
    }

    #[tokio::test]
    async fn actions_on_unknown_rentals_are_not_found() {
        let db = MemoryDatabase::new();
        let report = db
            .accept_offer(OfferDecisionDto {
                rental_id: Uuid::new_v4(),
                acting_user: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::NotFound));
    }
}
