use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of identity a username refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    User,
    Group,
    Role,
    Agent,
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentityType::User => "user",
            IdentityType::Group => "group",
            IdentityType::Role => "role",
            IdentityType::Agent => "agent",
        };
        f.write_str(name)
    }
}

/// Confirmation that an identity exists.
///
/// Says nothing about whether the identity has authenticated sufficiently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifiedIdentity {
    pub username: String,
    pub identity_type: IdentityType,
}

impl IdentifiedIdentity {
    pub fn new(username: impl Into<String>, identity_type: IdentityType) -> Self {
        Self {
            username: username.into(),
            identity_type,
        }
    }
}

impl fmt::Display for IdentifiedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity_type, self.username)
    }
}
