//! Role checks against a user record.

use authgate_api::{RoleId, User};

/// Roles a caller asks for.
///
/// A collection matches when any one of its roles is held.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RoleQuery {
    /// No particular role: any signed-in user with a role list matches.
    #[default]
    Any,
    One(RoleId),
    AnyOf(Vec<RoleId>),
}

impl RoleQuery {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        RoleQuery::AnyOf(roles.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RoleQuery::Any => true,
            RoleQuery::One(_) => false,
            RoleQuery::AnyOf(roles) => roles.is_empty(),
        }
    }

    /// True if `held` satisfies this query.
    pub fn matches(&self, held: &[RoleId]) -> bool {
        match self {
            RoleQuery::Any => true,
            RoleQuery::One(role) => held.contains(role),
            RoleQuery::AnyOf(roles) => {
                roles.is_empty() || roles.iter().any(|role| held.contains(role))
            }
        }
    }
}

impl From<&str> for RoleQuery {
    fn from(role: &str) -> Self {
        RoleQuery::One(role.to_string())
    }
}

impl From<String> for RoleQuery {
    fn from(role: String) -> Self {
        RoleQuery::One(role)
    }
}

impl From<Vec<RoleId>> for RoleQuery {
    fn from(roles: Vec<RoleId>) -> Self {
        RoleQuery::AnyOf(roles)
    }
}

impl From<&[&str]> for RoleQuery {
    fn from(roles: &[&str]) -> Self {
        RoleQuery::any_of(roles.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for RoleQuery {
    fn from(roles: [&str; N]) -> Self {
        RoleQuery::any_of(roles)
    }
}

impl<T: Into<RoleQuery>> From<Option<T>> for RoleQuery {
    fn from(roles: Option<T>) -> Self {
        roles.map_or(RoleQuery::Any, Into::into)
    }
}

/// Whether `user` holds the roles in `query`.
///
/// - no user, or a user without a `roles` field: false
/// - empty query: true
/// - otherwise: at least one requested role is held
pub fn has_role(user: Option<&User>, query: &RoleQuery) -> bool {
    let Some(held) = user.and_then(User::roles) else {
        return false;
    };
    query.matches(held)
}
