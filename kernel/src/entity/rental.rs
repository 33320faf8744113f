mod id;
mod insurance;
mod period;
mod price;
mod rating;
mod state;

pub use self::{id::*, insurance::*, period::*, price::*, rating::*, state::*};
use crate::entity::common::{EventVersion, RatedAt};
use crate::entity::handover::HandoverId;
use crate::entity::item::ItemId;
use crate::entity::user::UserId;
use destructure::Destructure;
use vodca::References;

/// A rental between two users of the marketplace.
///
/// `renter_id`, `lender_id`, `item_id`, the period and the monetary terms
/// are fixed when the offer is created; only `state`, the handover
/// references and the rating stamps change afterwards. `state` is the
/// single source of truth for where the rental is in its lifecycle.
#[derive(Debug, Clone, Eq, PartialEq, References, Destructure)]
pub struct Rental {
    id: RentalId,
    renter_id: UserId,
    lender_id: UserId,
    item_id: ItemId,
    period: RentalPeriod,
    price: Price,
    insurance_price: InsurancePrice,
    insurance_type: InsuranceType,
    state: RentalState,
    pickup_handover: Option<HandoverId>,
    return_handover: Option<HandoverId>,
    renter_rated_item: Option<RatedAt>,
    renter_rated_lender: Option<RatedAt>,
    lender_rated_renter: Option<RatedAt>,
    version: EventVersion<Rental>,
}

impl Rental {
    pub(crate) fn with_state(mut self, state: RentalState) -> Self {
        self.state = state;
        self
    }

    /// The image of this rental after a successful conditional write: the
    /// same fields, version incremented.
    pub fn with_next_version(mut self) -> Self {
        self.version = self.version.next();
        self
    }

    pub(crate) fn with_pickup_handover(mut self, handover: HandoverId) -> Self {
        self.pickup_handover = Some(handover);
        self
    }

    pub(crate) fn with_return_handover(mut self, handover: HandoverId) -> Self {
        self.return_handover = Some(handover);
        self
    }

    pub(crate) fn with_renter_rated_item(mut self, at: RatedAt) -> Self {
        self.renter_rated_item = Some(at);
        self
    }

    pub(crate) fn with_renter_rated_lender(mut self, at: RatedAt) -> Self {
        self.renter_rated_lender = Some(at);
        self
    }

    pub(crate) fn with_lender_rated_renter(mut self, at: RatedAt) -> Self {
        self.lender_rated_renter = Some(at);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RentalId,
        renter_id: UserId,
        lender_id: UserId,
        item_id: ItemId,
        period: RentalPeriod,
        price: Price,
        insurance_price: InsurancePrice,
        insurance_type: InsuranceType,
        state: RentalState,
        pickup_handover: Option<HandoverId>,
        return_handover: Option<HandoverId>,
        renter_rated_item: Option<RatedAt>,
        renter_rated_lender: Option<RatedAt>,
        lender_rated_renter: Option<RatedAt>,
        version: EventVersion<Rental>,
    ) -> Self {
        Self {
            id,
            renter_id,
            lender_id,
            item_id,
            period,
            price,
            insurance_price,
            insurance_type,
            state,
            pickup_handover,
            return_handover,
            renter_rated_item,
            renter_rated_lender,
            lender_rated_renter,
            version,
        }
    }
}
