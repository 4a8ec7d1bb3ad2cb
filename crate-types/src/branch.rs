use core::fmt;

use serde::{Deserialize, Serialize};

/// an identifier partitioning which branch's inbox is queried
// the deployment hands these out; they aren't validated client side
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BranchName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
