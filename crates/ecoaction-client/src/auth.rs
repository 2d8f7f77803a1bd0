use tracing::info;

use ecoaction_types::api::{
    Ack, AuthResponse, ForgotPasswordRequest, LoginRequest, MeResponse, RegisterRequest,
    ResetPasswordRequest,
};

use crate::error::{ClientError, Result};
use crate::http::ApiClient;
use crate::session::Credential;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;

/// `/auth/*` endpoints. Stateless: callers own the resulting token.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn register(&self, full_name: &str, email: &str, password: &str) -> Result<AuthResponse> {
        validate_email(email)?;
        validate_password(password)?;

        let resp: AuthResponse = self
            .api
            .post_json(
                "/auth/register",
                &RegisterRequest {
                    full_name: full_name.trim(),
                    email: email.trim(),
                    password,
                },
                None,
            )
            .await?;
        info!(user_id = resp.user.id, "registered new account");
        Ok(resp)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation("Email and password are required".into()));
        }

        self.api
            .post_json(
                "/auth/login",
                &LoginRequest {
                    email: email.trim(),
                    password,
                },
                None,
            )
            .await
    }

    pub async fn me(&self, credential: &Credential) -> Result<MeResponse> {
        self.api.get("/auth/me", Some(credential)).await
    }

    /// Ask the backend to email a reset link. The response is the same
    /// whether or not the address has an account.
    pub async fn forgot_password(&self, email: &str) -> Result<Ack> {
        validate_email(email)?;
        self.api
            .post_json(
                "/auth/forgot-password",
                &ForgotPasswordRequest { email: email.trim() },
                None,
            )
            .await
    }

    pub async fn reset_password(&self, reset_token: &str, password: &str) -> Result<Ack> {
        if reset_token.is_empty() {
            return Err(ClientError::Validation("Invalid reset token".into()));
        }
        validate_password(password)?;
        self.api
            .post_json(
                "/auth/reset-password",
                &ResetPasswordRequest {
                    token: reset_token,
                    password,
                },
                None,
            )
            .await
    }
}

/// Shape check only; the backend does the real validation.
pub(crate) fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid && !email.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(ClientError::Validation("Invalid email address".into()))
    }
}

fn validate_password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "Password must be between {} and {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )))
    }
}
