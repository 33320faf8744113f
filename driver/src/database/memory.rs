use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use error_stack::Report;
use uuid::Uuid;

use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::interface::query::{
    DependOnHandoverQuery, DependOnRentalQuery, HandoverQuery, RentalQuery,
};
use kernel::interface::update::{
    DependOnHandoverModifier, DependOnRentalModifier, HandoverModifier, RentalModifier,
};
use kernel::prelude::entity::{Handover, HandoverId, Rental, RentalId, UserId};
use kernel::KernelError;

/// In-process backend with the same conditional-update contract as the
/// Postgres driver. Writes are applied immediately under a mutex; the
/// per-record version check is what the services rely on, so `commit` and
/// `roll_back` are no-ops.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    rentals: Arc<Mutex<HashMap<Uuid, Rental>>>,
    handovers: Arc<Mutex<HashMap<Uuid, Handover>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTransaction {
    rentals: Arc<Mutex<HashMap<Uuid, Rental>>>,
    handovers: Arc<Mutex<HashMap<Uuid, Handover>>>,
}

#[async_trait::async_trait]
impl DatabaseConnection<MemoryTransaction> for MemoryDatabase {
    async fn transact(&self) -> error_stack::Result<MemoryTransaction, KernelError> {
        Ok(MemoryTransaction {
            rentals: Arc::clone(&self.rentals),
            handovers: Arc::clone(&self.handovers),
        })
    }
}

#[async_trait::async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }
}

fn poisoned() -> Report<KernelError> {
    Report::new(KernelError::Internal).attach_printable("memory store mutex poisoned")
}

pub struct MemoryRentalRepository;

#[async_trait::async_trait]
impl RentalQuery<MemoryTransaction> for MemoryRentalRepository {
    async fn find_by_id(
        &self,
        con: &mut MemoryTransaction,
        id: &RentalId,
    ) -> error_stack::Result<Option<Rental>, KernelError> {
        let rentals = con.rentals.lock().map_err(|_| poisoned())?;
        Ok(rentals.get(id.as_ref()).cloned())
    }

    async fn find_by_participant(
        &self,
        con: &mut MemoryTransaction,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Rental>, KernelError> {
        let rentals = con.rentals.lock().map_err(|_| poisoned())?;
        Ok(rentals
            .values()
            .filter(|rental| rental.renter_id() == user_id || rental.lender_id() == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl RentalModifier<MemoryTransaction> for MemoryRentalRepository {
    async fn create(
        &self,
        con: &mut MemoryTransaction,
        rental: &Rental,
    ) -> error_stack::Result<(), KernelError> {
        let mut rentals = con.rentals.lock().map_err(|_| poisoned())?;
        rentals.insert(*rental.id().as_ref(), rental.clone());
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MemoryTransaction,
        rental: &Rental,
    ) -> error_stack::Result<(), KernelError> {
        let mut rentals = con.rentals.lock().map_err(|_| poisoned())?;
        let stored = rentals.get(rental.id().as_ref()).ok_or_else(|| {
            Report::new(KernelError::NotFound)
                .attach_printable(format!("rental {} does not exist", rental.id().as_ref()))
        })?;
        if stored.version() != rental.version() {
            return Err(
                Report::new(KernelError::Concurrency).attach_printable(format!(
                    "rental {} was modified concurrently",
                    rental.id().as_ref()
                )),
            );
        }
        rentals.insert(*rental.id().as_ref(), rental.clone().with_next_version());
        Ok(())
    }
}

pub struct MemoryHandoverRepository;

#[async_trait::async_trait]
impl HandoverQuery<MemoryTransaction> for MemoryHandoverRepository {
    async fn find_by_id(
        &self,
        con: &mut MemoryTransaction,
        id: &HandoverId,
    ) -> error_stack::Result<Option<Handover>, KernelError> {
        let handovers = con.handovers.lock().map_err(|_| poisoned())?;
        Ok(handovers.get(id.as_ref()).cloned())
    }
}

#[async_trait::async_trait]
impl HandoverModifier<MemoryTransaction> for MemoryHandoverRepository {
    async fn create(
        &self,
        con: &mut MemoryTransaction,
        handover: &Handover,
    ) -> error_stack::Result<(), KernelError> {
        let mut handovers = con.handovers.lock().map_err(|_| poisoned())?;
        handovers.insert(*handover.id().as_ref(), handover.clone());
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MemoryTransaction,
        handover: &Handover,
    ) -> error_stack::Result<(), KernelError> {
        let mut handovers = con.handovers.lock().map_err(|_| poisoned())?;
        let stored = handovers.get(handover.id().as_ref()).ok_or_else(|| {
            Report::new(KernelError::NotFound)
                .attach_printable(format!("handover {} does not exist", handover.id().as_ref()))
        })?;
        if stored.version() != handover.version() {
            return Err(
                Report::new(KernelError::Concurrency).attach_printable(format!(
                    "handover {} was modified concurrently",
                    handover.id().as_ref()
                )),
            );
        }
        handovers.insert(*handover.id().as_ref(), handover.clone().with_next_version());
        Ok(())
    }
}

impl DependOnRentalQuery<MemoryTransaction> for MemoryDatabase {
    type RentalQuery = MemoryRentalRepository;
    fn rental_query(&self) -> &Self::RentalQuery {
        &MemoryRentalRepository
    }
}

impl DependOnRentalModifier<MemoryTransaction> for MemoryDatabase {
    type RentalModifier = MemoryRentalRepository;
    fn rental_modifier(&self) -> &Self::RentalModifier {
        &MemoryRentalRepository
    }
}

impl DependOnHandoverQuery<MemoryTransaction> for MemoryDatabase {
    type HandoverQuery = MemoryHandoverRepository;
    fn handover_query(&self) -> &Self::HandoverQuery {
        &MemoryHandoverRepository
    }
}

impl DependOnHandoverModifier<MemoryTransaction> for MemoryDatabase {
    type HandoverModifier = MemoryHandoverRepository;
    fn handover_modifier(&self) -> &Self::HandoverModifier {
        &MemoryHandoverRepository
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use kernel::interface::database::DatabaseConnection;
    use kernel::interface::query::RentalQuery;
    use kernel::interface::update::RentalModifier;
    use kernel::prelude::entity::{
        InsurancePrice, InsuranceType, ItemId, Price, Rental, RentalId, RentalPeriod, RentalState,
        UserId,
    };
    use kernel::prelude::role::Role;
    use kernel::KernelError;

    use crate::database::memory::{MemoryDatabase, MemoryRentalRepository};

    fn offer() -> Rental {
        let start = time::OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        Rental::offer(
            RentalId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            ItemId::new(Uuid::new_v4()),
            RentalPeriod::new(start, start + time::Duration::days(1)),
            Price::new(900),
            InsurancePrice::new(0),
            InsuranceType::None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stale_version_is_rejected() -> error_stack::Result<(), KernelError> {
        let db = MemoryDatabase::new();
        let mut con = db.transact().await?;

        let rental = offer();
        MemoryRentalRepository.create(&mut con, &rental).await?;

        let accepted = rental.clone().accept_offer(&Role::Lender)?;
        MemoryRentalRepository.update(&mut con, &accepted).await?;

        let found = MemoryRentalRepository
            .find_by_id(&mut con, rental.id())
            .await?
            .expect("rental was created");
        assert_eq!(found.state(), &RentalState::Accepted);
        assert_eq!(found.version(), &accepted.version().next());

        // A writer still holding the original version must lose.
        let stale = rental.accept_offer(&Role::Lender)?;
        let report = MemoryRentalRepository
            .update(&mut con, &stale)
            .await
            .unwrap_err();
        assert!(matches!(report.current_context(), KernelError::Concurrency));
        Ok(())
    }
}
