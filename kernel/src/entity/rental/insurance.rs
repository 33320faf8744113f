use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsuranceType {
    None,
    Basic,
    Premium,
}

impl InsuranceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsuranceType::None => "NONE",
            InsuranceType::Basic => "BASIC",
            InsuranceType::Premium => "PREMIUM",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NONE" => Some(InsuranceType::None),
            "BASIC" => Some(InsuranceType::Basic),
            "PREMIUM" => Some(InsuranceType::Premium),
            _ => None,
        }
    }
}

impl Display for InsuranceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
