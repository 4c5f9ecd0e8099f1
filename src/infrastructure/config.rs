use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;

pub const MODEL_ENV: &str = "OPENAI_MODEL";
pub const TIMEZONE_ENV: &str = "WEEKPLAN_TIMEZONE";
pub const DEFAULT_MODEL: &str = "gpt-5";

/// Backend model override and the timezone the weekly grid is read in.
/// The API credential itself lives in the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerSettings {
    pub model: String,
    pub timezone: Tz,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timezone: Tz::UTC,
        }
    }
}

impl PlannerSettings {
    pub fn from_env() -> Result<Self, InfraError> {
        Self::from_values(
            std::env::var(MODEL_ENV).ok().as_deref(),
            std::env::var(TIMEZONE_ENV).ok().as_deref(),
        )
    }

    fn from_values(model: Option<&str>, timezone: Option<&str>) -> Result<Self, InfraError> {
        let model = model
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string();

        let timezone = match timezone.map(str::trim).filter(|value| !value.is_empty()) {
            Some(name) => name.parse::<Tz>().map_err(|error| {
                InfraError::InvalidConfig(format!("unknown timezone '{name}': {error}"))
            })?,
            None => Tz::UTC,
        };

        Ok(Self { model, timezone })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}
