// Authentication, registration and profile store.

use std::sync::Arc;

use tracing::{error, info, warn};

use serde_json::json;

use estimo_core::models::{PasswordChange, ProfileUpdate, RegisterRequest, TokenResponse, User};
use estimo_core::storage::{LocalStorage, TOKEN_KEY};

use crate::client::ApiClient;
use crate::error::{ApiError, AuthError};
use crate::transport::{ApiRequest, Method};

pub struct AuthStore {
    api: Arc<ApiClient>,
    storage: Arc<LocalStorage>,
    pub token: Option<String>,
    pub user: Option<User>,
    /// E-mail awaiting a verification code (after register or an inactive
    /// login).
    pub pending_email: Option<String>,
}

impl AuthStore {
    /// Build the store, picking up a token persisted by a previous session.
    pub fn new(api: Arc<ApiClient>, storage: Arc<LocalStorage>) -> Result<Self, AuthError> {
        let token = storage.get_item(TOKEN_KEY).map_err(AuthError::storage)?;
        if let Some(t) = &token {
            api.set_token(t);
        }
        Ok(Self {
            api,
            storage,
            token,
            user: None,
            pending_email: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Log in with a login or e-mail and a password.
    ///
    /// An account that has not been verified yet fails with
    /// [`ApiError::AccountInactive`] and leaves its e-mail in
    /// `pending_email` so the caller can continue with [`Self::verify_code`].
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<(), AuthError> {
        let fields = vec![
            ("username".to_string(), identifier.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        let token: TokenResponse = match self.api.post_form("/auth/login", fields).await {
            Ok(token) => token,
            Err(ApiError::AccountInactive { email }) => {
                info!("login refused: account awaiting verification");
                self.pending_email = email.clone();
                return Err(ApiError::AccountInactive { email }.into());
            }
            Err(e) => return Err(e.into()),
        };

        self.accept_token(&token.access_token)?;
        self.fetch_user().await?;
        info!(user = self.user.as_ref().map(|u| u.login.as_str()), "logged in");
        Ok(())
    }

    pub async fn register(&mut self, request: &RegisterRequest) -> Result<(), AuthError> {
        self.api.post_unit("/auth/register", request).await?;
        self.pending_email = Some(request.email.clone());
        Ok(())
    }

    /// Submit the e-mailed code. On success the returned token starts a
    /// session exactly like a login.
    pub async fn verify_code(&mut self, email: &str, code: &str) -> Result<(), AuthError> {
        let token: TokenResponse = self
            .api
            .post("/auth/verify", &json!({ "email": email, "code": code }))
            .await?;
        self.accept_token(&token.access_token)?;
        self.fetch_user().await?;
        self.pending_email = None;
        info!("account verified");
        Ok(())
    }

    pub async fn resend_code(&self, email: &str) -> Result<(), ApiError> {
        self.api
            .post_unit("/auth/resend", &json!({ "email": email }))
            .await
    }

    /// Load the current user with the store's own token.
    pub async fn fetch_user(&mut self) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::Get, "/users/me").bearer(self.token.clone());
        let user: User = self.api.send_json(request).await?;
        self.user = Some(user);
        if let Some(t) = &self.token {
            self.api.set_token(t);
        }
        Ok(())
    }

    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<(), ApiError> {
        self.api.put_unit("/users/me", update).await?;
        self.fetch_user().await
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let result = self.api.put_unit("/users/me/password", change).await;
        if let Err(e) = &result {
            error!("password change failed: {e}");
        }
        result
    }

    /// Forget the session locally. Never calls the server.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.token = None;
        self.user = None;
        self.api.clear_token();
        self.storage
            .remove_item(TOKEN_KEY)
            .map_err(AuthError::storage)?;
        info!("logged out");
        Ok(())
    }

    /// Re-validate a persisted token by loading the user. Returns `Ok(true)`
    /// when a session was restored; a rejected token is dropped via
    /// [`Self::logout`] and yields `Ok(false)`.
    pub async fn restore_session(&mut self) -> Result<bool, AuthError> {
        if self.token.is_none() {
            return Ok(false);
        }
        match self.fetch_user().await {
            Ok(()) => {
                info!("session restored");
                Ok(true)
            }
            Err(e) => {
                warn!("stored session rejected: {e}");
                self.logout()?;
                Ok(false)
            }
        }
    }

    fn accept_token(&mut self, token: &str) -> Result<(), AuthError> {
        self.token = Some(token.to_string());
        self.api.set_token(token);
        self.storage
            .set_item(TOKEN_KEY, token)
            .map_err(AuthError::storage)
    }
}
