use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

/// Reference to a picture already uploaded to object storage.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Fromln, AsRefln)]
pub struct PictureUrl(String);

impl PictureUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Fromln, AsRefln)]
pub struct HandoverComment(String);

impl HandoverComment {
    pub fn new(comment: impl Into<String>) -> Self {
        Self(comment.into())
    }
}
