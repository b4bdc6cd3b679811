use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Permission granted when sharing a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Private,
    Public,
    #[default]
    Shared,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Private => "private",
            AccessType::Public => "public",
            AccessType::Shared => "shared",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(AccessType::Private),
            "public" => Ok(AccessType::Public),
            "shared" => Ok(AccessType::Shared),
            other => Err(format!("unknown access type: {}", other)),
        }
    }
}
