//! Access-control policies attached to hierarchy nodes

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The access-control policy of a single node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Policy {
    /// Create a policy from a list of bindings
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }
}

/// Attaches a role to a set of members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub role: String,
    /// Raw member strings, encoded as `type:identifier`
    #[serde(default)]
    pub members: Vec<String>,
}

impl Binding {
    /// Create a binding of `role` to the given member strings
    pub fn new<I, S>(role: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: role.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse each member string of this binding in order
    pub fn parsed_members(&self) -> impl Iterator<Item = Result<Member, MalformedMember>> + '_ {
        self.members.iter().map(|member| member.parse())
    }
}

/// A member string that does not follow the `type:identifier` grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Member {0:?} is not of the form `type:identifier`")]
pub struct MalformedMember(pub String);

impl MalformedMember {
    /// Principals the IAM API itself emits without a single `type:identifier`
    /// pair: `allUsers`, `allAuthenticatedUsers` and `deleted:…` members.
    pub fn is_known_principal(&self) -> bool {
        matches!(self.0.as_str(), "allUsers" | "allAuthenticatedUsers")
            || self.0.starts_with("deleted:")
    }
}

/// A type-tagged principal, e.g. `user:alice@example.com`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    /// Principal type (`user`, `group`, `serviceAccount`, `domain`, ...)
    pub member_type: String,
    /// Principal identifier within its type
    pub id: String,
}

impl FromStr for Member {
    type Err = MalformedMember;

    /// Exactly one `:` is accepted, with a non-empty type and identifier on
    /// either side of it.
    fn from_str(member: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedMember(member.to_string());

        let (member_type, id) = member.split_once(':').ok_or_else(malformed)?;

        if member_type.is_empty() || id.is_empty() || id.contains(':') {
            return Err(malformed());
        }

        Ok(Self {
            member_type: member_type.to_string(),
            id: id.to_string(),
        })
    }
}

impl Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.member_type, self.id)
    }
}
