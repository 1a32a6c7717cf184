//! Auth API: password sign-in, token exchange, sign-out, password updates

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{BackendClient, Surface};
use crate::error::{BackendError, BackendResult};
use crate::models::{Access, AdminUserUpdate, AuthIdentity, AuthSession, PasswordGrantRequest};

/// Operations against the hosted auth service
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange an email/password pair for a session
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> BackendResult<AuthSession>;

    /// Resolve a session token to the identity it belongs to
    async fn get_user(&self, access_token: &str) -> BackendResult<AuthIdentity>;

    /// Invalidate a session token
    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    /// Set a user's password (privileged)
    async fn update_password(&self, user_id: Uuid, new_password: &str) -> BackendResult<()>;

    /// Check if the auth service is reachable
    async fn health_check(&self) -> BackendResult<bool>;
}

#[async_trait]
impl AuthProvider for BackendClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let url = format!("{}/token", self.config.auth_url());

        let response = self
            .http_client
            .post(&url)
            .query(&[("grant_type", "password")])
            .headers(self.anon_headers()?)
            .json(&PasswordGrantRequest { email, password })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        // The grant endpoint answers bad credentials with 400.
        if response.status().as_u16() == 400 {
            debug!("Password grant rejected");
            return Err(BackendError::InvalidCredentials);
        }

        let response = self.check(response, Surface::Auth, "token").await?;
        let session: AuthSession = response.json().await?;
        Ok(session)
    }

    async fn get_user(&self, access_token: &str) -> BackendResult<AuthIdentity> {
        let url = format!("{}/user", self.config.auth_url());

        let response = self
            .http_client
            .get(&url)
            .headers(self.access_headers(&Access::User(access_token.to_string()))?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = self.check(response, Surface::Auth, "user").await?;
        let identity: AuthIdentity = response.json().await?;
        Ok(identity)
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let url = format!("{}/logout", self.config.auth_url());

        let response = self
            .http_client
            .post(&url)
            .query(&[("scope", "local")])
            .headers(self.access_headers(&Access::User(access_token.to_string()))?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match self.check(response, Surface::Auth, "logout").await {
            Ok(_) => Ok(()),
            // Already gone: signing out again is not an error.
            Err(BackendError::Unauthorized) | Err(BackendError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn update_password(&self, user_id: Uuid, new_password: &str) -> BackendResult<()> {
        let url = format!("{}/admin/users/{}", self.config.auth_url(), user_id);

        let response = self
            .http_client
            .put(&url)
            .headers(self.access_headers(&Access::Service)?)
            .json(&AdminUserUpdate {
                password: new_password,
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.check(response, Surface::Auth, "admin user").await?;
        Ok(())
    }

    async fn health_check(&self) -> BackendResult<bool> {
        let url = format!("{}/health", self.config.auth_url());

        match self
            .http_client
            .get(&url)
            .headers(self.anon_headers()?)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) if e.is_connect() => {
                warn!(url = %url, "Auth service unreachable");
                Err(BackendError::ConnectionRefused(self.config.url.clone()))
            }
            Err(e) => Err(BackendError::HttpError(e)),
        }
    }
}
