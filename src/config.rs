use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, time::Duration};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
pub const FALLBACK_SENDER: &str = "no-reply@example.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read environment variables: {0}")]
    Env(#[from] envy::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("no RESEND_API_KEY and incomplete SMTP credentials (SMTP_USER, SMTP_PASSWORD)")]
    NoTransport,

    #[error("failed to initialize {transport} transport: {reason}")]
    Transport {
        transport: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

/// Credentials for both transports. Which one is used is decided by
/// [`crate::mail::TransportKind::select`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub resend: ResendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default = "default_resend_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: DEFAULT_SMTP_PORT,
            user: None,
            password: None,
            timeout: default_timeout(),
        }
    }
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            from: None,
            endpoint: default_resend_endpoint(),
            timeout: default_timeout(),
        }
    }
}

impl MailConfig {
    /// Sender address: `RESEND_FROM`, then the SMTP user, then a placeholder.
    pub fn sender(&self) -> String {
        non_empty(self.resend.from.as_deref())
            .or_else(|| non_empty(self.smtp.user.as_deref()))
            .unwrap_or(FALLBACK_SENDER)
            .to_string()
    }
}

/// Treats unset and empty settings the same way.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

const fn default_http_port() -> u16 {
    8000
}

const fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

const fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_resend_endpoint() -> String {
    DEFAULT_RESEND_ENDPOINT.to_string()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Flat view of the process environment, as read by `envy`.
#[derive(Debug, Default, Deserialize)]
struct EnvVars {
    port: Option<u16>,
    max_upload_bytes: Option<usize>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_user: Option<String>,
    smtp_password: Option<String>,
    resend_api_key: Option<String>,
    resend_from: Option<String>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
}

fn owned(value: Option<&str>) -> Option<String> {
    non_empty(value).map(ToString::to_string)
}

impl EnvVars {
    fn mail(&self) -> MailConfig {
        let smtp = SmtpConfig {
            host: owned(self.smtp_host.as_deref()).unwrap_or_else(default_smtp_host),
            port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            user: owned(self.smtp_user.as_deref()),
            password: owned(self.smtp_password.as_deref()),
            timeout: default_timeout(),
        };

        let resend = ResendConfig {
            api_key: owned(self.resend_api_key.as_deref()),
            from: owned(self.resend_from.as_deref()),
            ..ResendConfig::default()
        };

        MailConfig { smtp, resend }
    }
}

impl TryFrom<EnvVars> for Config {
    type Error = ConfigError;

    fn try_from(vars: EnvVars) -> Result<Self, Self::Error> {
        let supabase = SupabaseConfig {
            url: owned(vars.supabase_url.as_deref()).ok_or(ConfigError::Missing("SUPABASE_URL"))?,
            anon_key: owned(vars.supabase_anon_key.as_deref())
                .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
        };

        Ok(Self {
            port: vars.port.unwrap_or_else(default_http_port),
            max_upload_bytes: vars
                .max_upload_bytes
                .unwrap_or_else(default_max_upload_bytes),
            supabase,
            mail: vars.mail(),
        })
    }
}

/// The `mail` section of a config file, other sections are ignored.
#[derive(Debug, Deserialize)]
struct MailSection {
    #[serde(default)]
    mail: MailConfig,
}

fn read_file(path: &str) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })
}

pub fn parse_yaml(contents: &str) -> Result<Config, ConfigError> {
    serde_yaml::from_str(contents).map_err(Into::into)
}

pub fn parse_mail_yaml(contents: &str) -> Result<MailConfig, ConfigError> {
    let section: MailSection = serde_yaml::from_str(contents)?;
    Ok(section.mail)
}

/// Reads settings from `(NAME, value)` pairs such as `std::env::vars()`.
pub fn config_from_vars(
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<Config, ConfigError> {
    let vars: EnvVars = envy::from_iter(vars)?;
    Config::try_from(vars)
}

pub fn mail_config_from_vars(
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<MailConfig, ConfigError> {
    let vars: EnvVars = envy::from_iter(vars)?;
    Ok(vars.mail())
}

fn load_dotenv() {
    // A missing .env file is fine, the variables may already be exported.
    if let Ok(path) = dotenvy::dotenv() {
        tracing::info!("Loaded environment from {}", path.display());
    }
}

fn load_from_env() -> Result<Config, ConfigError> {
    load_dotenv();
    config_from_vars(env::vars())
}

/// Picks the YAML file to load, or `None` when settings come from the environment.
fn config_file() -> Option<String> {
    // Retrieve env variable
    let config_path =
        env::var("MAIL_GROUPS_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        return Some(config_path);
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.example.yaml'\
             \n This file should not be used and should be replaced with actual data",
            config_path
        );
        return Some("config.example.yaml".to_string());
    }

    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    None
}

pub fn load_config() -> Result<Config, ConfigError> {
    if let Some(path) = config_file() {
        return parse_yaml(&read_file(&path)?);
    }

    let config = load_from_env()?;
    tracing::info!("Successfully loaded configuration from environment variables");
    Ok(config)
}

/// Loads only the mail settings, from the same sources as [`load_config`].
///
/// Store settings are not required.
pub fn load_mail_config() -> Result<MailConfig, ConfigError> {
    if let Some(path) = config_file() {
        return parse_mail_yaml(&read_file(&path)?);
    }

    load_dotenv();
    mail_config_from_vars(env::vars())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_vars() -> EnvVars {
        EnvVars {
            supabase_url: Some("https://project.supabase.co".into()),
            supabase_anon_key: Some("anon".into()),
            ..EnvVars::default()
        }
    }

    #[test]
    fn env_defaults_match_gmail_ssl() {
        let config = Config::try_from(env_vars()).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.mail.smtp.host, "smtp.gmail.com");
        assert_eq!(config.mail.smtp.port, 465);
        assert_eq!(config.mail.resend.endpoint, DEFAULT_RESEND_ENDPOINT);
        assert!(config.mail.smtp.user.is_none());
    }

    #[test]
    fn empty_env_values_count_as_unset() {
        let vars = EnvVars {
            smtp_user: Some(String::new()),
            resend_api_key: Some("   ".into()),
            ..env_vars()
        };
        let config = Config::try_from(vars).unwrap();

        assert!(config.mail.smtp.user.is_none());
        assert!(config.mail.resend.api_key.is_none());
    }

    #[test]
    fn supabase_settings_are_required() {
        let vars = EnvVars {
            supabase_anon_key: None,
            ..env_vars()
        };

        assert!(matches!(
            Config::try_from(vars),
            Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
        ));
    }

    #[test]
    fn sender_prefers_resend_from_then_smtp_user() {
        let mut mail = MailConfig::default();
        assert_eq!(mail.sender(), FALLBACK_SENDER);

        mail.smtp.user = Some("ops@example.org".into());
        assert_eq!(mail.sender(), "ops@example.org");

        mail.resend.from = Some("News <news@example.org>".into());
        assert_eq!(mail.sender(), "News <news@example.org>");
    }

    #[test]
    fn yaml_config_with_durations() {
        let yaml = r"
port: 9000
supabase:
  url: https://project.supabase.co
  anon_key: anon
mail:
  smtp:
    host: smtp.example.org
    port: 587
    user: ops@example.org
    password: secret
    timeout: 10s
";
        let config = parse_yaml(yaml).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.mail.smtp.port, 587);
        assert_eq!(config.mail.smtp.timeout, Duration::from_secs(10));
        assert_eq!(config.mail.resend.timeout, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn environment_variables_are_read() {
        let config = config_from_vars(vars(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SMTP_PORT", "587"),
            ("SMTP_USER", "ops@example.org"),
            ("SMTP_PASSWORD", "secret"),
            ("RESEND_FROM", ""),
            ("PORT", "9090"),
            ("PATH", "/usr/bin"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.supabase.anon_key, "anon");
        assert_eq!(config.mail.smtp.port, 587);
        assert_eq!(config.mail.smtp.user.as_deref(), Some("ops@example.org"));
        assert!(config.mail.resend.from.is_none());
    }

    #[test]
    fn malformed_environment_value_is_an_env_error() {
        let result = config_from_vars(vars(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SMTP_PORT", "not-a-port"),
        ]));

        assert!(matches!(result, Err(ConfigError::Env(_))));
    }

    #[test]
    fn mail_settings_do_not_need_the_store() {
        let mail = mail_config_from_vars(vars(&[
            ("SMTP_USER", "ops@example.org"),
            ("SMTP_PASSWORD", "secret"),
        ]))
        .unwrap();
        assert_eq!(mail.smtp.host, DEFAULT_SMTP_HOST);
        assert_eq!(mail.smtp.password.as_deref(), Some("secret"));

        let mail = parse_mail_yaml(
            r"
mail:
  smtp:
    host: smtp.example.org
    port: 587
",
        )
        .unwrap();
        assert_eq!(mail.smtp.host, "smtp.example.org");
        assert_eq!(mail.smtp.port, 587);
    }
}
