use std::fmt;

use crate::model::ids::UserId;

/// Authenticated session handed explicitly to services that act on behalf
/// of a user.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: Option<String>,
    pub access_token: String,
}

impl AuthSession {
    #[must_use]
    pub fn new(user_id: UserId, email: Option<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            email,
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Public profile row of a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn debug_hides_access_token() {
        let session = AuthSession::new(UserId::new(Uuid::nil()), None, "secret-token");
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("user_id"));
    }
}
