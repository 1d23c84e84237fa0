use std::env;
use std::fmt;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Policy for restarting an on-hold application.
///
/// `Manual` requires the caller to request the retry explicitly;
/// `Automatic` lets the orchestrator re-invoke the start stage on its own
/// backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Manual,
    Automatic,
}

impl RetryPolicy {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "auto" | "automatic" => Ok(Self::Automatic),
            other => Err(ConfigError::InvalidRetryPolicy {
                value: other.to_string(),
            }),
        }
    }
}

/// Top-level configuration for the processing core.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub storage: StorageConfig,
    pub reports: ReportsConfig,
    pub retry_policy: RetryPolicy,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let applications_table =
            env::var("APP_APPLICATIONS_TABLE").unwrap_or_else(|_| "applications".to_string());
        let evaluations_table =
            env::var("APP_EVALUATIONS_TABLE").unwrap_or_else(|_| "evaluations".to_string());

        let bucket = env::var("APP_REPORTS_BUCKET").unwrap_or_else(|_| "admissions-reports".to_string());
        let prefix = env::var("APP_REPORTS_PREFIX").unwrap_or_else(|_| "reports".to_string());

        let retry_policy = RetryPolicy::from_str(
            &env::var("APP_RETRY_POLICY").unwrap_or_else(|_| "manual".to_string()),
        )?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            storage: StorageConfig {
                applications_table,
                evaluations_table,
            },
            reports: ReportsConfig { bucket, prefix },
            retry_policy,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Table names for the backing key-value document store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub applications_table: String,
    pub evaluations_table: String,
}

/// Where report artifacts land in object storage.
#[derive(Debug, Clone)]
pub struct ReportsConfig {
    pub bucket: String,
    pub prefix: String,
}

impl ReportsConfig {
    /// Object key for one application's comparison report.
    pub fn report_key(&self, application_id: &str) -> String {
        format!("{}/{}/report.json", self.prefix, application_id)
    }

    /// Locator recorded on the evaluation once the artifact is uploaded.
    pub fn report_locator(&self, application_id: &str) -> String {
        format!("store://{}/{}", self.bucket, self.report_key(application_id))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidRetryPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidRetryPolicy { value } => {
                write!(f, "APP_RETRY_POLICY must be 'manual' or 'automatic', got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_APPLICATIONS_TABLE");
        env::remove_var("APP_EVALUATIONS_TABLE");
        env::remove_var("APP_REPORTS_BUCKET");
        env::remove_var("APP_REPORTS_PREFIX");
        env::remove_var("APP_RETRY_POLICY");
        env::remove_var("APP_LOG_LEVEL");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.storage.applications_table, "applications");
        assert_eq!(config.storage.evaluations_table, "evaluations");
        assert_eq!(config.retry_policy, RetryPolicy::Manual);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn rejects_unknown_retry_policy() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RETRY_POLICY", "thrice");
        let result = AppConfig::load();
        env::remove_var("APP_RETRY_POLICY");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidRetryPolicy { .. })
        ));
    }

    #[test]
    fn report_locator_includes_bucket_and_prefix() {
        let reports = ReportsConfig {
            bucket: "admissions-reports".to_string(),
            prefix: "reports".to_string(),
        };
        assert_eq!(
            reports.report_locator("app-000042"),
            "store://admissions-reports/reports/app-000042/report.json"
        );
    }
}
