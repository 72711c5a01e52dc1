//! # Quick Start API
//!
//! One-call entry point for library users who just want a persona file.
//! Credentials come from the environment; everything else can be tweaked
//! fluently.
//!
//! ```no_run
//! use reddit_persona::api::Persona;
//!
//! // Defaults: 100 posts + 100 comments, written to ./output
//! Persona::profile("https://www.reddit.com/user/kojied/").run()?;
//!
//! // Tuned
//! Persona::profile("https://www.reddit.com/user/kojied/")
//!     .limit(25)
//!     .output("./personas")
//!     .model("gpt-4o-mini")
//!     .run()?;
//! # Ok::<(), reddit_persona::Error>(())
//! ```

use crate::{ConfigBuilder, Pipeline, PipelineStats, Result};
use std::path::PathBuf;

/// Fluent builder for a single persona run.
#[derive(Debug, Clone)]
#[must_use = "call .run() to build the persona"]
pub struct Persona {
    url: String,
    limit: Option<usize>,
    output: Option<PathBuf>,
    model: Option<String>,
    template: Option<PathBuf>,
}

impl Persona {
    /// Starts a run for the given profile URL.
    pub fn profile(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            limit: None,
            output: None,
            model: None,
            template: None,
        }
    }

    /// Fetch at most `limit` posts and at most `limit` comments.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Write the persona into `dir` instead of `./output`.
    pub fn output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = Some(dir.into());
        self
    }

    /// Use a different chat model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Render the prompt with a custom Tera template.
    pub fn template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    fn into_config_builder(self) -> (String, ConfigBuilder) {
        let mut builder = ConfigBuilder::from_env();

        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }
        if let Some(output) = self.output {
            builder = builder.output_dir(output);
        }
        if let Some(model) = self.model {
            builder = builder.openai_model(model);
        }
        if let Some(template) = self.template {
            builder = builder.template_path(template);
        }

        (self.url, builder)
    }

    /// Runs the pipeline against Reddit and the OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by configuration or any stage.
    pub fn run(self) -> Result<PipelineStats> {
        let (url, builder) = self.into_config_builder();
        Pipeline::new(builder.build()?)?.run(&url)
    }
}
