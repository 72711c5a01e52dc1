use crate::error::{Error, Result};
use crate::template_validator::TemplateValidator;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "RedditPersonaScript/0.1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 800;
const DEFAULT_LIMIT: usize = 100;
const DEFAULT_OUTPUT_DIR: &str = "output";

pub(crate) const DEFAULT_REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub(crate) const DEFAULT_REDDIT_API_URL: &str = "https://oauth.reddit.com";
pub(crate) const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Environment variable holding the Reddit application client id.
pub const ENV_REDDIT_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
/// Environment variable holding the Reddit application client secret.
pub const ENV_REDDIT_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
/// Environment variable holding the Reddit user agent.
pub const ENV_REDDIT_USER_AGENT: &str = "REDDIT_USER_AGENT";
/// Environment variable holding the text-generation API key.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the chat model.
pub const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";

/// Configuration for a persona run.
///
/// Built once at startup, then handed by reference to the stages that need
/// it. Credentials are carried as-is and only checked where they are used.
///
/// Use [`Config::builder()`] or [`ConfigBuilder::from_env()`] to construct one.
#[derive(Clone)]
#[non_exhaustive]
pub struct Config {
    /// Reddit application client id
    pub reddit_client_id: Option<String>,

    /// Reddit application client secret
    pub reddit_client_secret: Option<String>,

    /// User agent sent with every Reddit request
    pub reddit_user_agent: String,

    /// Text-generation API key
    pub openai_api_key: Option<String>,

    /// Chat model name
    pub openai_model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens the model may produce
    pub max_output_tokens: u32,

    /// Maximum posts, and separately maximum comments, to fetch
    pub limit: usize,

    /// Directory that receives `<username>_persona.txt`
    pub output_dir: PathBuf,

    /// Optional Tera template overriding the built-in prompt
    pub template_path: Option<PathBuf>,

    /// Reddit OAuth token endpoint
    pub reddit_auth_url: String,

    /// Reddit OAuth API root
    pub reddit_api_url: String,

    /// Chat completions endpoint
    pub openai_url: String,

    /// Per-request timeout; `None` blocks until the server answers
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(value: Option<&String>) -> &'static str {
            if value.is_some() { "<set>" } else { "<unset>" }
        }

        f.debug_struct("Config")
            .field("reddit_client_id", &redact(self.reddit_client_id.as_ref()))
            .field(
                "reddit_client_secret",
                &redact(self.reddit_client_secret.as_ref()),
            )
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("openai_api_key", &redact(self.openai_api_key.as_ref()))
            .field("openai_model", &self.openai_model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("limit", &self.limit)
            .field("output_dir", &self.output_dir)
            .field("template_path", &self.template_path)
            .field("reddit_auth_url", &self.reddit_auth_url)
            .field("reddit_api_url", &self.reddit_api_url)
            .field("openai_url", &self.openai_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use reddit_persona::Config;
    ///
    /// let config = Config::builder()
    ///     .limit(25)
    ///     .output_dir("./personas")
    ///     .build()
    ///     .expect("valid configuration");
    /// assert_eq!(config.limit, 25);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Builds a configuration from the process environment with defaults
    /// for everything else.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn from_env() -> Result<Self> {
        ConfigBuilder::from_env().build()
    }

    /// Validates the configuration.
    ///
    /// Credentials are deliberately left out: a missing Reddit credential
    /// surfaces when authenticating and a missing API key when generating.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Temperature is outside `0.0..=2.0`
    /// - `max_output_tokens` is zero
    /// - User agent or model name is blank
    /// - The custom template is missing or invalid
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.temperature
            )));
        }

        if self.max_output_tokens == 0 {
            return Err(Error::config("max_output_tokens must be greater than 0"));
        }

        if self.reddit_user_agent.trim().is_empty() {
            return Err(Error::config("Reddit user agent must not be empty"));
        }

        if self.openai_model.trim().is_empty() {
            return Err(Error::config("Model name must not be empty"));
        }

        if let Some(ref template_path) = self.template_path {
            TemplateValidator::validate_template(template_path)?;
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reddit_client_id: None,
            reddit_client_secret: None,
            reddit_user_agent: DEFAULT_USER_AGENT.to_string(),
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            limit: DEFAULT_LIMIT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            template_path: None,
            reddit_auth_url: DEFAULT_REDDIT_AUTH_URL.to_string(),
            reddit_api_url: DEFAULT_REDDIT_API_URL.to_string(),
            openai_url: DEFAULT_OPENAI_URL.to_string(),
            request_timeout: None,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    reddit_client_id: Option<String>,
    reddit_client_secret: Option<String>,
    reddit_user_agent: Option<String>,
    openai_api_key: Option<String>,
    openai_model: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
    limit: Option<usize>,
    output_dir: Option<PathBuf>,
    template_path: Option<PathBuf>,
    reddit_auth_url: Option<String>,
    reddit_api_url: Option<String>,
    openai_url: Option<String>,
    request_timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Seeds a builder from the process environment.
    ///
    /// Reads `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`, `REDDIT_USER_AGENT`,
    /// `OPENAI_API_KEY` and `OPENAI_MODEL`. Unset or empty variables are left
    /// to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Seeds a builder from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            reddit_client_id: read(ENV_REDDIT_CLIENT_ID),
            reddit_client_secret: read(ENV_REDDIT_CLIENT_SECRET),
            reddit_user_agent: read(ENV_REDDIT_USER_AGENT),
            openai_api_key: read(ENV_OPENAI_API_KEY),
            openai_model: read(ENV_OPENAI_MODEL),
            ..Self::default()
        }
    }

    /// Sets the Reddit client id.
    #[must_use]
    pub fn reddit_client_id(mut self, id: impl Into<String>) -> Self {
        self.reddit_client_id = Some(id.into());
        self
    }

    /// Sets the Reddit client secret.
    #[must_use]
    pub fn reddit_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.reddit_client_secret = Some(secret.into());
        self
    }

    /// Sets the Reddit user agent.
    #[must_use]
    pub fn reddit_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.reddit_user_agent = Some(agent.into());
        self
    }

    /// Sets the text-generation API key.
    #[must_use]
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum number of generated tokens.
    #[must_use]
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets how many posts and how many comments to fetch.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the path to an external prompt template.
    ///
    /// The template must exist, compile under Tera and reference
    /// `username`, `posts` and `comments`.
    #[must_use]
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    /// Overrides the Reddit OAuth token endpoint.
    #[must_use]
    pub fn reddit_auth_url(mut self, url: impl Into<String>) -> Self {
        self.reddit_auth_url = Some(url.into());
        self
    }

    /// Overrides the Reddit OAuth API root.
    #[must_use]
    pub fn reddit_api_url(mut self, url: impl Into<String>) -> Self {
        self.reddit_api_url = Some(url.into());
        self
    }

    /// Overrides the chat completions endpoint.
    #[must_use]
    pub fn openai_url(mut self, url: impl Into<String>) -> Self {
        self.openai_url = Some(url.into());
        self
    }

    /// Sets a per-request timeout for both external services.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();

        let config = Config {
            reddit_client_id: self.reddit_client_id,
            reddit_client_secret: self.reddit_client_secret,
            reddit_user_agent: self
                .reddit_user_agent
                .unwrap_or(defaults.reddit_user_agent),
            openai_api_key: self.openai_api_key,
            openai_model: self.openai_model.unwrap_or(defaults.openai_model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_output_tokens: self
                .max_output_tokens
                .unwrap_or(defaults.max_output_tokens),
            limit: self.limit.unwrap_or(defaults.limit),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            template_path: self.template_path,
            reddit_auth_url: self.reddit_auth_url.unwrap_or(defaults.reddit_auth_url),
            reddit_api_url: self.reddit_api_url.unwrap_or(defaults.reddit_api_url),
            openai_url: self.openai_url.unwrap_or(defaults.openai_url),
            request_timeout: self.request_timeout,
        };

        config.validate()?;
        Ok(config)
    }
}
