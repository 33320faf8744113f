use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum HandoverKind {
    #[serde(rename = "PICKUP")]
    PickUp,
    #[serde(rename = "RETURN")]
    Return,
}

impl HandoverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoverKind::PickUp => "PICKUP",
            HandoverKind::Return => "RETURN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PICKUP" => Some(HandoverKind::PickUp),
            "RETURN" => Some(HandoverKind::Return),
            _ => None,
        }
    }
}

impl Display for HandoverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
