//! # reddit-persona
//!
//! Builds a cited user persona from a Reddit profile's newest posts and
//! comments with a chat-completion model.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reddit_persona::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! Pipeline::new(config)?.run("https://www.reddit.com/user/kojied/")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! One linear pipeline, each stage executed once:
//! 1. **Parser**: Extracts the username from the profile URL
//! 2. **Fetcher**: Pulls the newest posts and comments through a [`ContentSource`]
//! 3. **Generator**: Renders the prompt and calls a [`TextGenerator`]
//! 4. **Writer**: Saves `<username>_persona.txt`
//!
//! Both external services sit behind those two traits, so tests and other
//! front-ends can swap them out. There is no retry, no backoff and no prompt
//! trimming anywhere in the flow.

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod content;
mod error;
mod generator;
mod openai;
mod pipeline;
mod profile;
mod reddit;
mod source;
mod template;
mod template_validator;
mod token;
mod writer;

pub mod api;

pub use config::{
    Config, ConfigBuilder, ENV_OPENAI_API_KEY, ENV_OPENAI_MODEL, ENV_REDDIT_CLIENT_ID,
    ENV_REDDIT_CLIENT_SECRET, ENV_REDDIT_USER_AGENT,
};
pub use content::{Comment, Post, UserContent, absolute_permalink};
pub use error::{Error, Result};
pub use generator::{CompletionRequest, PersonaDocument, PersonaGenerator, TextGenerator};
pub use openai::OpenAiClient;
pub use pipeline::{Pipeline, PipelineStats};
pub use profile::ProfileReference;
pub use reddit::{MAX_PAGE_SIZE, RedditClient};
pub use source::{ContentFetcher, ContentSource};
pub use token::{ProseTokenizer, TokenEstimator};

/// Builds the persona for `profile_url` with the given configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The URL has no `reddit.com/user/<name>` segment
/// - A credential is missing or rejected
/// - Reddit or the text-generation API fails
/// - The output file cannot be written
///
/// # Examples
///
/// ```no_run
/// use reddit_persona::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder().limit(50).build()?;
/// run(config, "https://www.reddit.com/user/kojied/")?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config, profile_url: &str) -> Result<PipelineStats> {
    Pipeline::new(config)?.run(profile_url)
}
