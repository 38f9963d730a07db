use std::sync::Arc;

use storage::repository::{AuthGateway, SignUpRecord};
use study_core::model::{AuthSession, Profile, UserId};
use tracing::info;

use crate::error::AuthError;

/// What a sign-up produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// The account exists but has no session until the email is confirmed.
    ConfirmationRequired { user_id: Option<UserId> },
}

/// Account access: credentials in, `AuthSession` out.
#[derive(Clone)]
pub struct AuthService {
    auth: Arc<dyn AuthGateway>,
}

fn credentials<'a>(email: &'a str, password: &'a str) -> Result<(&'a str, &'a str), AuthError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok((email, password))
}

impl AuthService {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthGateway>) -> Self {
        Self { auth }
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input,
    /// `AuthError::InvalidCredentials` if the backend rejects them.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let (email, password) = credentials(email, password)?;
        let session = self.auth.sign_in(email, password).await?;
        info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` for blank input,
    /// `AuthError::AlreadyRegistered` if the email is taken.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let (email, password) = credentials(email, password)?;
        let outcome = match self.auth.sign_up(email, password).await? {
            SignUpRecord::SignedIn(session) => SignUpOutcome::SignedIn(session),
            SignUpRecord::PendingConfirmation { user_id } => {
                SignUpOutcome::ConfirmationRequired { user_id }
            }
        };
        info!(
            confirmation_required = matches!(outcome, SignUpOutcome::ConfirmationRequired { .. }),
            "signed up"
        );
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the backend refuses.
    pub async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError> {
        self.auth.sign_out(session).await?;
        info!(user_id = %session.user_id, "signed out");
        Ok(())
    }

    /// Profile of the signed-in user; empty when none was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the backend request fails.
    pub async fn profile(&self, session: &AuthSession) -> Result<Profile, AuthError> {
        Ok(self.auth.get_profile(session).await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `AuthError` if the backend request fails.
    pub async fn update_profile(
        &self,
        session: &AuthSession,
        profile: &Profile,
    ) -> Result<Profile, AuthError> {
        Ok(self.auth.update_profile(session, profile).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credentials_are_rejected() {
        assert!(matches!(credentials(" ", "pw"), Err(AuthError::MissingCredentials)));
        assert!(matches!(credentials("a@b.c", ""), Err(AuthError::MissingCredentials)));
        assert_eq!(credentials(" a@b.c ", "pw").unwrap(), ("a@b.c", "pw"));
    }
}
