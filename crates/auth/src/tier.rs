//! Team tiers and the hierarchy between them.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use teamgate_core::DomainError;

/// Organizational tier of a team.
///
/// Ordered `Customer < Maintenance < Super`. A higher tier may satisfy a lower
/// tier's requirement when the requirement permits hierarchy override.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Customer,
    Maintenance,
    Super,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Customer, Tier::Maintenance, Tier::Super];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Customer => "customer",
            Tier::Maintenance => "maintenance",
            Tier::Super => "super",
        }
    }
}

impl core::fmt::Display for Tier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Tier::Customer),
            "maintenance" => Ok(Tier::Maintenance),
            "super" => Ok(Tier::Super),
            other => Err(DomainError::validation(format!("unknown tier '{other}'"))),
        }
    }
}
