use async_trait::async_trait;
use study_core::model::{AuthSession, Profile};

use super::SupabaseClient;
use super::rows::{Credentials, ProfileRow, SignUpResponse, TokenResponse};
use crate::repository::{AuthGateway, SignUpRecord, StorageError};

#[async_trait]
impl AuthGateway for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StorageError> {
        let token: TokenResponse = self
            .send_json(
                self.http
                    .post(self.endpoint("auth/v1/token"))
                    .query(&[("grant_type", "password")])
                    .json(&Credentials { email, password }),
            )
            .await
            .map_err(|err| match err {
                // GoTrue answers bad credentials with 400.
                StorageError::Backend { status: 400, .. } => StorageError::Unauthorized,
                other => other,
            })?;
        Ok(token.into())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpRecord, StorageError> {
        let response: SignUpResponse = self
            .send_json(
                self.http
                    .post(self.endpoint("auth/v1/signup"))
                    .json(&Credentials { email, password }),
            )
            .await?;
        Ok(response.into_record())
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<(), StorageError> {
        self.with_session(session)
            .send_empty(self.http.post(self.endpoint("auth/v1/logout")))
            .await
    }

    async fn get_profile(&self, session: &AuthSession) -> Result<Option<Profile>, StorageError> {
        let scoped = self.with_session(session);
        let rows: Vec<ProfileRow> = scoped
            .send_json(self.http.get(self.rest("profiles")).query(&[
                ("select", "*".to_owned()),
                ("id", format!("eq.{}", session.user_id)),
            ]))
            .await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    async fn update_profile(
        &self,
        session: &AuthSession,
        profile: &Profile,
    ) -> Result<Profile, StorageError> {
        let scoped = self.with_session(session);
        let rows: Vec<ProfileRow> = scoped
            .send_json(
                self.http
                    .patch(self.rest("profiles"))
                    .header("Prefer", "return=representation")
                    .query(&[("id", format!("eq.{}", session.user_id))])
                    .json(&ProfileRow::from(profile)),
            )
            .await?;
        rows.into_iter()
            .next()
            .map(Profile::from)
            .ok_or(StorageError::NotFound)
    }
}
