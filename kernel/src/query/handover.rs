use crate::database::Transaction;
use crate::entity::{Handover, HandoverId};
use crate::KernelError;

#[async_trait::async_trait]
pub trait HandoverQuery<Connection: Transaction>: 'static + Sync + Send {
    async fn find_by_id(
        &self,
        con: &mut Connection,
        id: &HandoverId,
    ) -> error_stack::Result<Option<Handover>, KernelError>;
}

pub trait DependOnHandoverQuery<Connection: Transaction>: 'static + Sync + Send {
    type HandoverQuery: HandoverQuery<Connection>;
    fn handover_query(&self) -> &Self::HandoverQuery;
}
