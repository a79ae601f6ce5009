use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use buddy_crypto::CredentialConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Token signing settings.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub expiration: Duration,
    /// Admin tokens live shorter than regular ones.
    pub admin_expiration: Duration,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// `None` logs outgoing mail instead of sending it.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub from: String,
    /// Base URL of the web app, used in links inside emails.
    pub app_url: String,
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: TokenConfig,
    pub credentials: CredentialConfig,
    pub email_code_expiration: Duration,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub notify_interval: Duration,
    pub mail: MailConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("BUDDY_JWT_SECRET").unwrap_or_default();
        if secret.is_empty() || PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
            bail!("BUDDY_JWT_SECRET is unset or still a placeholder");
        }

        let token = TokenConfig {
            secret,
            expiration: Duration::from_secs(env_or("BUDDY_JWT_EXPIRATION_SECS", 7 * 24 * 3600)?),
            admin_expiration: Duration::from_secs(env_or("BUDDY_JWT_ADMIN_EXPIRATION_SECS", 3600)?),
        };
        if token.admin_expiration >= token.expiration {
            bail!("BUDDY_JWT_ADMIN_EXPIRATION_SECS must be shorter than BUDDY_JWT_EXPIRATION_SECS");
        }

        let defaults = CredentialConfig::default();
        let credentials = CredentialConfig {
            iterations: env_or("BUDDY_HASH_ITERATIONS", defaults.iterations)?,
            memory_kib: env_or("BUDDY_HASH_MEMORY_KIB", defaults.memory_kib)?,
        };

        let mail = MailConfig {
            smtp_host: std::env::var("BUDDY_SMTP_HOST").ok().filter(|h| !h.is_empty()),
            smtp_port: env_or("BUDDY_SMTP_PORT", 25)?,
            from: env_or("BUDDY_MAIL_FROM", "info@buddybrno.cz".to_string())?,
            app_url: env_or("BUDDY_APP_URL", "http://localhost:8080".to_string())?,
        };

        Ok(Self {
            token,
            credentials,
            email_code_expiration: Duration::from_secs(env_or("BUDDY_EMAIL_CODE_EXPIRE_SECS", 2 * 3600)?),
            db_path: env_or("BUDDY_DB_PATH", "buddy.db".to_string())?.into(),
            host: env_or("BUDDY_HOST", "0.0.0.0".to_string())?,
            port: env_or("BUDDY_PORT", 3000)?,
            notify_interval: Duration::from_secs(env_or("BUDDY_NOTIFY_INTERVAL_SECS", 300)?),
            mail,
        })
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("Invalid value for {key}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_falls_back_to_default() {
        let port: u16 = env_or("BUDDY_TEST_SURELY_UNSET_PORT", 3000).unwrap();
        assert_eq!(port, 3000);
    }
}
