use error_stack::Report;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use kernel::interface::query::HandoverQuery;
use kernel::interface::update::HandoverModifier;
use kernel::prelude::entity::{
    AgreedAt, EventVersion, Handover, HandoverComment, HandoverId, HandoverKind, PictureUrl,
};
use kernel::KernelError;

use crate::database::postgres::PgTransaction;
use crate::error::{ConvertError, DriverError};

pub struct PostgresHandoverRepository;

#[async_trait::async_trait]
impl HandoverQuery<PgTransaction> for PostgresHandoverRepository {
    async fn find_by_id(
        &self,
        con: &mut PgTransaction,
        id: &HandoverId,
    ) -> error_stack::Result<Option<Handover>, KernelError> {
        PgHandoverInternal::find_by_id(&mut **con, id)
            .await
            .convert_error()
    }
}

#[async_trait::async_trait]
impl HandoverModifier<PgTransaction> for PostgresHandoverRepository {
    async fn create(
        &self,
        con: &mut PgTransaction,
        handover: &Handover,
    ) -> error_stack::Result<(), KernelError> {
        PgHandoverInternal::create(&mut **con, handover)
            .await
            .convert_error()
    }

    async fn update(
        &self,
        con: &mut PgTransaction,
        handover: &Handover,
    ) -> error_stack::Result<(), KernelError> {
        let applied = PgHandoverInternal::update(&mut **con, handover)
            .await
            .convert_error()?;
        if applied {
            Ok(())
        } else {
            Err(
                Report::new(KernelError::Concurrency).attach_printable(format!(
                    "handover {} was modified concurrently",
                    handover.id().as_ref()
                )),
            )
        }
    }
}

#[derive(sqlx::FromRow)]
struct HandoverRow {
    id: Uuid,
    kind: String,
    pictures: Vec<String>,
    comment: String,
    agreed_renter: Option<OffsetDateTime>,
    agreed_lender: Option<OffsetDateTime>,
    version: i64,
}

impl TryFrom<HandoverRow> for Handover {
    type Error = DriverError;

    fn try_from(row: HandoverRow) -> Result<Self, Self::Error> {
        let kind = HandoverKind::from_name(&row.kind).ok_or_else(|| {
            DriverError::Conversion(anyhow::anyhow!("unknown handover kind {}", row.kind))
        })?;
        Ok(Handover::new(
            HandoverId::new(row.id),
            kind,
            row.pictures.into_iter().map(PictureUrl::new).collect(),
            HandoverComment::new(row.comment),
            row.agreed_renter.map(AgreedAt::new),
            row.agreed_lender.map(AgreedAt::new),
            EventVersion::new(row.version),
        ))
    }
}

pub(in crate::database) struct PgHandoverInternal;

impl PgHandoverInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        id: &HandoverId,
    ) -> Result<Option<Handover>, DriverError> {
        let row = sqlx::query_as::<_, HandoverRow>(
            // language=postgresql
            r#"
            SELECT
                id, kind, pictures, comment, agreed_renter, agreed_lender, version
            FROM
                handovers
            WHERE
                id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await?;
        row.map(Handover::try_from).transpose()
    }

    async fn create(con: &mut PgConnection, handover: &Handover) -> Result<(), DriverError> {
        sqlx::query(
            // language=postgresql
            r#"
            INSERT INTO handovers (id, kind, pictures, comment, agreed_renter, agreed_lender, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(handover.id().as_ref())
        .bind(handover.kind().as_str())
        .bind(
            handover
                .pictures()
                .iter()
                .map(|url| url.as_ref().clone())
                .collect::<Vec<String>>(),
        )
        .bind(handover.comment().as_ref())
        .bind(handover.agreed_renter().as_ref().map(|at| *at.as_ref()))
        .bind(handover.agreed_lender().as_ref().map(|at| *at.as_ref()))
        .bind(handover.version().as_ref())
        .execute(con)
        .await?;
        Ok(())
    }

    async fn update(con: &mut PgConnection, handover: &Handover) -> Result<bool, DriverError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            UPDATE handovers
            SET
                pictures = $2,
                comment = $3,
                agreed_renter = $4,
                agreed_lender = $5,
                version = version + 1
            WHERE
                id = $1 AND version = $6
            "#,
        )
        .bind(handover.id().as_ref())
        .bind(
            handover
                .pictures()
                .iter()
                .map(|url| url.as_ref().clone())
                .collect::<Vec<String>>(),
        )
        .bind(handover.comment().as_ref())
        .bind(handover.agreed_renter().as_ref().map(|at| *at.as_ref()))
        .bind(handover.agreed_lender().as_ref().map(|at| *at.as_ref()))
        .bind(handover.version().as_ref())
        .execute(con)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::query::HandoverQuery;
    use kernel::interface::update::HandoverModifier;
    use kernel::prelude::entity::{AgreedAt, Handover, HandoverComment, HandoverId, HandoverKind, PictureUrl};
    use kernel::prelude::role::Role;
    use kernel::KernelError;

    use crate::database::postgres::{PostgresDatabase, PostgresHandoverRepository};

    fn agreed_at() -> AgreedAt {
        // Whole seconds survive the timestamptz roundtrip exactly.
        AgreedAt::new(time::OffsetDateTime::from_unix_timestamp(1_700_100_000).unwrap())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn handover_roundtrip_and_agreement_update() -> error_stack::Result<(), KernelError> {
        let db = PostgresDatabase::new().await?;
        let mut con = db.transact().await?;

        let handover = Handover::submit(
            HandoverId::new(Uuid::new_v4()),
            HandoverKind::PickUp,
            vec![PictureUrl::new("https://storage.example/pic-1.jpg")],
            HandoverComment::new("front wheel slightly worn"),
            &Role::Renter,
            agreed_at(),
        )?;
        PostgresHandoverRepository.create(&mut con, &handover).await?;

        let found = PostgresHandoverRepository
            .find_by_id(&mut con, handover.id())
            .await?;
        assert_eq!(found, Some(handover.clone()));

        let (agreed, changed) = handover.agree(&Role::Lender, agreed_at())?;
        assert!(changed);
        PostgresHandoverRepository.update(&mut con, &agreed).await?;
        assert!(agreed.fully_agreed());

        con.roll_back().await?;
        Ok(())
    }
}
