//! Trust types

use serde::{Deserialize, Serialize};

/// Delegation credential letting a trustee act with a subset of the
/// trustor's roles on one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trust {
    pub id: String,
    pub trustor: String,
    pub trustee: String,
    pub project: String,
    pub roles: Vec<String>,
}
