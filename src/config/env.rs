use super::ServerConfig;
use super::merge::merge_config;
use super::validation::validate_config;

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with sensible defaults.
    /// Also loads from .env file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if:
    /// - `OPENAI_API_KEY` is missing
    /// - Numeric environment variables are malformed
    /// - Configuration validation fails
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = merge_config(None)?;
        validate_config(&config)?;

        Ok(config)
    }
}
