use crate::config::{today, MAX_GRACE_DAYS};
use crate::core::ConfigProvider;
use crate::domain::model::DataSource;
use crate::utils::error::{BillingError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub billing: BillingConfig,
    pub source: DataSource,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    pub gym_id: String,
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub grace_days: u32,
    #[serde(default)]
    pub only_overdue: bool,
    #[serde(default = "default_actor")]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    #[serde(default)]
    pub json_logs: bool,
}

fn default_actor() -> String {
    "system".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["csv".to_string(), "json".to_string()]
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BillingError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BACKEND_API_KEY})，找不到的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BillingError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.json_logs).unwrap_or(false)
    }

    fn reject_placeholder(field: &str, value: &str) -> Result<()> {
        if value.contains("${") {
            return Err(BillingError::MissingConfigError {
                field: format!("{} (unresolved variable in '{}')", field, value),
            });
        }
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn gym_id(&self) -> &str {
        &self.billing.gym_id
    }

    fn data_source(&self) -> DataSource {
        self.source.clone()
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn as_of(&self) -> NaiveDate {
        self.billing.as_of.unwrap_or_else(today)
    }

    fn grace_days(&self) -> u32 {
        self.billing.grace_days
    }

    fn only_overdue(&self) -> bool {
        self.billing.only_overdue
    }

    fn actor(&self) -> &str {
        &self.billing.actor
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_gym_id("billing.gym_id", &self.billing.gym_id)?;
        validation::validate_range(
            "billing.grace_days",
            self.billing.grace_days,
            0,
            MAX_GRACE_DAYS,
        )?;
        validation::validate_non_empty_string("billing.actor", &self.billing.actor)?;
        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_output_formats("output.formats", &self.output.formats)?;

        match &self.source {
            DataSource::Local { dir } => validation::validate_path("source.dir", dir)?,
            DataSource::Api { endpoint, api_key } => {
                Self::reject_placeholder("source.endpoint", endpoint)?;
                validation::validate_url("source.endpoint", endpoint)?;
                let api_key = validation::validate_required_field("source.api_key", api_key)?;
                validation::validate_non_empty_string("source.api_key", api_key)?;
                Self::reject_placeholder("source.api_key", api_key)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOCAL_CONFIG: &str = r#"
[billing]
gym_id = "gym-a"
as_of = "2024-03-10"
grace_days = 3

[source]
type = "local"
dir = "./exports"

[output]
path = "./reports"
"#;

    #[test]
    fn test_parse_local_config() {
        let config = TomlConfig::from_toml_str(LOCAL_CONFIG).unwrap();

        assert_eq!(config.gym_id(), "gym-a");
        assert_eq!(config.grace_days(), 3);
        assert_eq!(config.actor(), "system");
        assert_eq!(config.output_formats(), ["csv".to_string(), "json".to_string()]);
        assert_eq!(config.as_of(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GYM_BILLING_TEST_KEY", "service-key");

        let toml_content = r#"
[billing]
gym_id = "gym-a"

[source]
type = "api"
endpoint = "https://db.example.com/rest/v1"
api_key = "${GYM_BILLING_TEST_KEY}"

[output]
path = "./output"
formats = ["json"]

[monitoring]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.source,
            DataSource::Api {
                endpoint: "https://db.example.com/rest/v1".to_string(),
                api_key: Some("service-key".to_string()),
            }
        );
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());

        std::env::remove_var("GYM_BILLING_TEST_KEY");
    }

    #[test]
    fn test_unresolved_variable_fails_validation() {
        let toml_content = r#"
[billing]
gym_id = "gym-a"

[source]
type = "api"
endpoint = "https://db.example.com/rest/v1"
api_key = "${GYM_BILLING_UNSET_VARIABLE}"

[output]
path = "./output"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(BillingError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = LOCAL_CONFIG.replace("grace_days = 3", "grace_days = 400");
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_source_type_is_rejected() {
        let toml_content = LOCAL_CONFIG.replace("type = \"local\"", "type = \"ftp\"");
        assert!(TomlConfig::from_toml_str(&toml_content).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(LOCAL_CONFIG.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.billing.gym_id, "gym-a");
    }
}
