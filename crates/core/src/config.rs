use crate::error::{AppError, Result};
use dotenvy::dotenv;
use std::env;

const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub analysis_model: String,
    pub image_model: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AppError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let analysis_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_ANALYSIS_MODEL.to_string());

        let image_model =
            env::var("GEMINI_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());

        Self::builder()
            .with_api_key(&api_key)
            .with_analysis_model(&analysis_model)
            .with_image_model(&image_model)
            .build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for programmatic configuration (CLI overrides, tests).
///
/// The API key is validated at build time so that a missing credential is
/// reported before any request is attempted.
#[derive(Default)]
pub struct ConfigBuilder {
    api_key: Option<String>,
    analysis_model: Option<String>,
    image_model: Option<String>,
}

impl ConfigBuilder {
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_analysis_model(mut self, model: &str) -> Self {
        self.analysis_model = Some(model.to_string());
        self
    }

    pub fn with_image_model(mut self, model: &str) -> Self {
        self.image_model = Some(model.to_string());
        self
    }

    pub fn build(self) -> Result<Config> {
        let api_key = self.api_key.unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(AppError::config(
                "GEMINI_API_KEY must be set in environment or .env file",
            ));
        }

        Ok(Config {
            gemini_api_key: api_key,
            analysis_model: self
                .analysis_model
                .unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
            image_model: self
                .image_model
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_missing_api_key() {
        let result = Config::builder().with_analysis_model("gemini-2.5-flash").build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn builder_rejects_blank_api_key() {
        let result = Config::builder().with_api_key("   ").build();
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn builder_applies_model_defaults() {
        let config = Config::builder().with_api_key("test-key").build().unwrap();
        assert_eq!(config.analysis_model, DEFAULT_ANALYSIS_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn builder_honors_overrides() {
        let config = Config::builder()
            .with_api_key("test-key")
            .with_analysis_model("gemini-2.5-pro")
            .with_image_model("imagen-latest")
            .build()
            .unwrap();
        assert_eq!(config.analysis_model, "gemini-2.5-pro");
        assert_eq!(config.image_model, "imagen-latest");
    }
}
