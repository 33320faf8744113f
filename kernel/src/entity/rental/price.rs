use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

/// Rental price in the smallest currency unit.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Fromln, AsRefln)]
pub struct Price(i64);

impl Price {
    pub fn new(price: impl Into<i64>) -> Self {
        Self(price.into())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Fromln, AsRefln)]
pub struct InsurancePrice(i64);

impl InsurancePrice {
    pub fn new(price: impl Into<i64>) -> Self {
        Self(price.into())
    }
}
