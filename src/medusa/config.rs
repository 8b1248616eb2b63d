use crate::config::{ConfigError, env_string};

pub const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

#[derive(Debug, Clone, Default)]
pub struct MedusaConfig {
    pub base_url: String,
    pub publishable_key: Option<String>,
    pub secret_api_key: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCredentials {
    SecretKey(String),
    EmailPassword { email: String, password: String },
}

impl MedusaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_string("MEDUSA_BACKEND_URL")
            .ok_or(ConfigError::MissingVar("MEDUSA_BACKEND_URL"))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            publishable_key: env_string("MEDUSA_PUBLISHABLE_KEY"),
            secret_api_key: env_string("MEDUSA_SECRET_API_KEY")
                .or_else(|| env_string("MEDUSA_ADMIN_API_KEY")),
            admin_email: env_string("MEDUSA_ADMIN_EMAIL"),
            admin_password: env_string("MEDUSA_ADMIN_PASSWORD"),
        })
    }

    pub fn read_key(&self) -> Result<&str, ConfigError> {
        self.publishable_key
            .as_deref()
            .ok_or(ConfigError::MissingVar("MEDUSA_PUBLISHABLE_KEY"))
    }

    // A secret key wins over an email/password pair.
    pub fn write_credentials(&self) -> Result<WriteCredentials, ConfigError> {
        if let Some(key) = &self.secret_api_key {
            return Ok(WriteCredentials::SecretKey(key.clone()));
        }
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Ok(WriteCredentials::EmailPassword {
                email: email.clone(),
                password: password.clone(),
            }),
            (None, _) => Err(ConfigError::MissingVar("MEDUSA_ADMIN_EMAIL")),
            (Some(_), None) => Err(ConfigError::MissingVar("MEDUSA_ADMIN_PASSWORD")),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
