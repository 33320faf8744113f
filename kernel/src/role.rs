use std::fmt::{Display, Formatter};

use error_stack::Report;

use crate::entity::{Rental, UserId};
use crate::KernelError;

/// Side of the rental an acting user is on. Derived per request, never
/// stored.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Role {
    Renter,
    Lender,
}

impl Role {
    /// Maps an acting user to its role on the rental, `None` when the user
    /// is neither the renter nor the lender.
    pub fn resolve(user_id: &UserId, rental: &Rental) -> Option<Role> {
        if rental.renter_id() == user_id {
            Some(Role::Renter)
        } else if rental.lender_id() == user_id {
            Some(Role::Lender)
        } else {
            None
        }
    }

    /// [`Role::resolve`], rejecting unrelated users with `Forbidden`.
    pub fn require(user_id: &UserId, rental: &Rental) -> error_stack::Result<Role, KernelError> {
        Self::resolve(user_id, rental).ok_or_else(|| {
            Report::new(KernelError::Forbidden).attach_printable(format!(
                "user {} is neither renter nor lender of rental {}",
                user_id.as_ref(),
                rental.id().as_ref()
            ))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Renter => "RENTER",
            Role::Lender => "LENDER",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
