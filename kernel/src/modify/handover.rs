use crate::database::Transaction;
use crate::entity::Handover;
use crate::KernelError;

#[async_trait::async_trait]
pub trait HandoverModifier<Connection: Transaction>: 'static + Sync + Send {
    async fn create(
        &self,
        con: &mut Connection,
        handover: &Handover,
    ) -> error_stack::Result<(), KernelError>;

    /// Conditional write with the same version contract as
    /// [`RentalModifier::update`](crate::modify::RentalModifier::update).
    async fn update(
        &self,
        con: &mut Connection,
        handover: &Handover,
    ) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnHandoverModifier<Connection: Transaction>: 'static + Sync + Send {
    type HandoverModifier: HandoverModifier<Connection>;
    fn handover_modifier(&self) -> &Self::HandoverModifier;
}
