use error_stack::Report;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::query::RentalQuery;
use kernel::interface::update::RentalModifier;
use kernel::prelude::entity::{
    EventVersion, HandoverId, InsurancePrice, InsuranceType, ItemId, Price, RatedAt, Rental,
    RentalId, RentalPeriod, RentalState, UserId,
};
use kernel::KernelError;

use crate::database::postgres::PgTransaction;
use crate::error::{ConvertError, DriverError};

pub struct PostgresRentalRepository;

#[async_trait::async_trait]
impl RentalQuery<PgTransaction> for PostgresRentalRepository {
    async fn find_by_id(
        &self,
        con: &mut PgTransaction,
        id: &RentalId,
    ) -> error_stack::Result<Option<Rental>, KernelError> {
        PgRentalInternal::find_by_id(&mut **con, id)
            .await
            .convert_error()
    }

    async fn find_by_participant(
        &self,
        con: &mut PgTransaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Rental>, KernelError> {
        PgRentalInternal::find_by_participant(&mut **con, user_id)
            .await
            .convert_error()
    }
}

#[async_trait::async_trait]
impl RentalModifier<PgTransaction> for PostgresRentalRepository {
    async fn create(
        &self,
        con: &mut PgTransaction,
        rental: &Rental,
    ) -> error_stack::Result<(), KernelError> {
        PgRentalInternal::create(&mut **con, rental)
            .await
            .convert_error()
    }

    async fn update(
        &self,
        con: &mut PgTransaction,
        rental: &Rental,
    ) -> error_stack::Result<(), KernelError> {
        let applied = PgRentalInternal::update(&mut **con, rental)
            .await
            .convert_error()?;
        if applied {
            Ok(())
        } else {
            Err(
                Report::new(KernelError::Concurrency).attach_printable(format!(
                    "rental {} was modified concurrently",
                    rental.id().as_ref()
                )),
            )
        }
    }
}

#[derive(sqlx::FromRow)]
struct RentalRow {
    id: Uuid,
    renter_id: Uuid,
    lender_id: Uuid,
    item_id: Uuid,
    period_start: OffsetDateTime,
    period_end: OffsetDateTime,
    price: i64,
    insurance_price: i64,
    insurance_type: String,
    state: String,
    pickup_handover: Option<Uuid>,
    return_handover: Option<Uuid>,
    renter_rated_item: Option<OffsetDateTime>,
    renter_rated_lender: Option<OffsetDateTime>,
    lender_rated_renter: Option<OffsetDateTime>,
    version: i64,
}

impl TryFrom<RentalRow> for Rental {
    type Error = DriverError;

    fn try_from(row: RentalRow) -> Result<Self, Self::Error> {
        let state = RentalState::from_name(&row.state)
            .ok_or_else(|| DriverError::Conversion(anyhow::anyhow!("unknown rental state {}", row.state)))?;
        let insurance_type = InsuranceType::from_name(&row.insurance_type).ok_or_else(|| {
            DriverError::Conversion(anyhow::anyhow!("unknown insurance type {}", row.insurance_type))
        })?;
        Ok(Rental::new(
            RentalId::new(row.id),
            UserId::new(row.renter_id),
            UserId::new(row.lender_id),
            ItemId::new(row.item_id),
            RentalPeriod::new(row.period_start, row.period_end),
            Price::new(row.price),
            InsurancePrice::new(row.insurance_price),
            insurance_type,
            state,
            row.pickup_handover.map(HandoverId::new),
            row.return_handover.map(HandoverId::new),
            row.renter_rated_item.map(RatedAt::new),
            row.renter_rated_lender.map(RatedAt::new),
            row.lender_rated_renter.map(RatedAt::new),
            EventVersion::new(row.version),
        ))
    }
}

pub(in crate::database) struct PgRentalInternal;

impl PgRentalInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        id: &RentalId,
    ) -> Result<Option<Rental>, DriverError> {
        let row = sqlx::query_as::<_, RentalRow>(
            // language=postgresql
            r#"
            SELECT
                id, renter_id, lender_id, item_id,
                period_start, period_end,
                price, insurance_price, insurance_type,
                state, pickup_handover, return_handover,
                renter_rated_item, renter_rated_lender, lender_rated_renter,
                version
            FROM
                rentals
            WHERE
                id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await?;
        row.map(Rental::try_from).transpose()
    }

    async fn find_by_participant(
        con: &mut PgConnection,
        user_id: &UserId,
    ) -> Result<Vec<Rental>, DriverError> {
        let rows = sqlx::query_as::<_, RentalRow>(
            // language=postgresql
            r#"
            SELECT
                id, renter_id, lender_id, item_id,
                period_start, period_end,
                price, insurance_price, insurance_type,
                state, pickup_handover, return_handover,
                renter_rated_item, renter_rated_lender, lender_rated_renter,
                version
            FROM
                rentals
            WHERE
                renter_id = $1 OR lender_id = $1
            ORDER BY
                period_start
            "#,
        )
        .bind(user_id.as_ref())
        .fetch_all(con)
        .await?;
        rows.into_iter().map(Rental::try_from).collect()
    }

    async fn create(con: &mut PgConnection, rental: &Rental) -> Result<(), DriverError> {
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO rentals (
                id, renter_id, lender_id, item_id,
                period_start, period_end,
                price, insurance_price, insurance_type,
                state, pickup_handover, return_handover,
                renter_rated_item, renter_rated_lender, lender_rated_renter,
                version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(rental.id().as_ref())
        .bind(rental.renter_id().as_ref())
        .bind(rental.lender_id().as_ref())
        .bind(rental.item_id().as_ref())
        .bind(rental.period().start())
        .bind(rental.period().end())
        .bind(rental.price().as_ref())
        .bind(rental.insurance_price().as_ref())
        .bind(rental.insurance_type().as_str())
        .bind(rental.state().as_str())
        .bind(rental.pickup_handover().as_ref().map(|id| *id.as_ref()))
        .bind(rental.return_handover().as_ref().map(|id| *id.as_ref()))
        .bind(rental.renter_rated_item().as_ref().map(|at| *at.as_ref()))
        .bind(rental.renter_rated_lender().as_ref().map(|at| *at.as_ref()))
        .bind(rental.lender_rated_renter().as_ref().map(|at| *at.as_ref()))
        .bind(rental.version().as_ref())
        .execute(con)
        .await?;
        Ok(())
    }

    async fn update(con: &mut PgConnection, rental: &Rental) -> Result<bool, DriverError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE rentals
            SET
                state = $2,
                pickup_handover = $3,
                return_handover = $4,
                renter_rated_item = $5,
                renter_rated_lender = $6,
                lender_rated_renter = $7,
                version = version + 1
            WHERE
                id = $1 AND version = $8
            "#,
        )
        .bind(rental.id().as_ref())
        .bind(rental.state().as_str())
        .bind(rental.pickup_handover().as_ref().map(|id| *id.as_ref()))
        .bind(rental.return_handover().as_ref().map(|id| *id.as_ref()))
        .bind(rental.renter_rated_item().as_ref().map(|at| *at.as_ref()))
        .bind(rental.renter_rated_lender().as_ref().map(|at| *at.as_ref()))
        .bind(rental.lender_rated_renter().as_ref().map(|at| *at.as_ref()))
        .bind(rental.version().as_ref())
        .execute(con)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::query::RentalQuery;
    use kernel::interface::update::RentalModifier;
    use kernel::prelude::entity::{
        InsurancePrice, InsuranceType, ItemId, Price, Rental, RentalId, RentalPeriod, UserId,
    };
    use kernel::prelude::role::Role;
    use kernel::KernelError;

    use crate::database::postgres::{PostgresDatabase, PostgresRentalRepository};

    fn offer() -> Rental {
        // Whole seconds survive the timestamptz roundtrip exactly.
        let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        Rental::offer(
            RentalId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            ItemId::new(Uuid::new_v4()),
            RentalPeriod::new(start, start + time::Duration::days(2)),
            Price::new(4200),
            InsurancePrice::new(700),
            InsuranceType::Premium,
        )
        .unwrap()
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn rental_roundtrip_and_conditional_update() -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;

        let rental = offer();
        PostgresRentalRepository.create(&mut con, &rental).await?;

        let found = PostgresRentalRepository
            .find_by_id(&mut con, rental.id())
            .await?;
        assert_eq!(found, Some(rental.clone()));

        let accepted = rental.clone().accept_offer(&Role::Lender)?;
        PostgresRentalRepository.update(&mut con, &accepted).await?;

        // The stale version must no longer match.
        let stale = rental.accept_offer(&Role::Lender)?;
        let report = PostgresRentalRepository
            .update(&mut con, &stale)
            .await
            .unwrap_err();
        assert!(matches!(
            report.current_context(),
            KernelError::Concurrency
        ));

        con.roll_back().await?;
        Ok(())
    }
}
