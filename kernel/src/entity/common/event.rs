use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventVersion<T> {
    /*
     * Nothing means that the record has never been persisted
     */
    Nothing,
    /*
     * Exact means the version the record carried when it was read
     */
    Exact(i64, PhantomData<T>),
}

impl<T> EventVersion<T> {
    pub fn new(version: i64) -> Self {
        if version < 0 {
            Self::Nothing
        } else {
            Self::Exact(version, PhantomData)
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Nothing => Self::new(0),
            Self::Exact(version, _) => Self::new(version + 1),
        }
    }
}

impl<T> From<i64> for EventVersion<T> {
    fn from(version: i64) -> Self {
        Self::new(version)
    }
}

impl<T> AsRef<i64> for EventVersion<T> {
    fn as_ref(&self) -> &i64 {
        match self {
            Self::Nothing => &-1,
            Self::Exact(version, _) => version,
        }
    }
}
