//! Deployment configuration.

use std::fmt;

/// Environment variable holding the access key id.
pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding comma separated notification topic ARNs.
pub const NOTIFICATION_ARNS_ENV: &str = "AWS_NOTIFICATION_ARNS";

/// AWS access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Settings applied to every stack operation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployConfig {
    /// Explicit credentials; `None` defers to the CLI's own credential chain
    pub credentials: Option<Credentials>,
    /// Target region; `None` uses the CLI default
    pub region: Option<String>,
    /// SNS topics notified of stack events
    pub notification_arns: Vec<String>,
    /// Acknowledged capabilities
    pub capabilities: Vec<String>,
    /// Keep failed resources instead of rolling back
    pub disable_rollback: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            region: None,
            notification_arns: Vec::new(),
            capabilities: vec!["CAPABILITY_IAM".to_string()],
            disable_rollback: true,
        }
    }
}

impl DeployConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read credentials and notification ARNs from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DeployConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let (Some(id), Some(secret)) = (lookup(ACCESS_KEY_ENV), lookup(SECRET_KEY_ENV)) {
            config.credentials = Some(Credentials::new(id, secret));
        }
        if let Some(arns) = lookup(NOTIFICATION_ARNS_ENV) {
            config.notification_arns = parse_arns(&arns);
        }
        config
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn notification_arns(mut self, arns: Vec<String>) -> Self {
        self.notification_arns = arns;
        self
    }

    pub fn capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn disable_rollback(mut self, disable: bool) -> Self {
        self.disable_rollback = disable;
        self
    }
}

/// Split a comma separated ARN list, dropping blanks.
pub fn parse_arns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|arn| !arn.is_empty())
        .map(String::from)
        .collect()
}
