use crate::medusa::MedusaError;
use crate::medusa::config::{MedusaConfig, WriteCredentials};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAuth(String);

impl AdminAuth {
    pub fn header_value(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
struct EmailPassBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

// Basic with an empty password.
pub fn secret_key_auth(key: &str) -> AdminAuth {
    AdminAuth(format!("Basic {}", BASE64.encode(format!("{key}:"))))
}

pub async fn resolve_admin_auth(
    http: &Client,
    config: &MedusaConfig,
    credentials: &WriteCredentials,
) -> Result<AdminAuth, MedusaError> {
    match credentials {
        WriteCredentials::SecretKey(key) => Ok(secret_key_auth(key)),
        WriteCredentials::EmailPassword { email, password } => {
            let token = exchange_credentials(http, config, email, password).await?;
            Ok(AdminAuth(format!("Bearer {token}")))
        }
    }
}

async fn exchange_credentials(
    http: &Client,
    config: &MedusaConfig,
    email: &str,
    password: &str,
) -> Result<String, MedusaError> {
    let response = http
        .post(config.url("/auth/user/emailpass"))
        .json(&EmailPassBody { email, password })
        .send()
        .await
        .map_err(|err| MedusaError::Auth(err.to_string()))?;

    if !response.status().is_success() {
        return Err(MedusaError::Auth(format!("HTTP {}", response.status())));
    }

    let payload: TokenResponse = response
        .json()
        .await
        .map_err(|err| MedusaError::Auth(err.to_string()))?;
    Ok(payload.token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_key_is_basic_encoded_with_empty_password() {
        let auth = secret_key_auth("sk_test");
        assert_eq!(auth.header_value(), "Basic c2tfdGVzdDo=");
    }
}
