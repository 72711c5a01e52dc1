use crate::{
    config::Config,
    error::{Error, Result},
    generator::{PersonaGenerator, TextGenerator},
    openai::OpenAiClient,
    profile::ProfileReference,
    reddit::RedditClient,
    source::{ContentFetcher, ContentSource},
    writer::Writer,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Statistics collected during a persona run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Username the persona was built for
    pub username: String,

    /// Number of posts fetched
    pub posts: usize,

    /// Number of comments fetched
    pub comments: usize,

    /// Estimated prompt size in tokens
    pub prompt_tokens: usize,

    /// Fetched items whose permalink appears in the persona
    pub cited_items: usize,

    /// Where the persona was written
    pub output_path: PathBuf,

    /// Time spent fetching from Reddit
    pub fetch_duration: Duration,

    /// Time spent generating the persona
    pub generate_duration: Duration,

    /// Time spent writing the output file
    pub write_duration: Duration,

    /// Total execution time
    pub duration: Duration,
}

/// The persona pipeline: parse, fetch, generate, write.
///
/// Each stage runs once, in order, and the first error ends the run. Nothing
/// is written unless generation succeeded.
pub struct Pipeline<S, G> {
    fetcher: ContentFetcher<S>,
    generator: PersonaGenerator<G>,
    writer: Writer,
}

impl Pipeline<RedditClient, OpenAiClient> {
    /// Creates a pipeline talking to Reddit and the OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - An HTTP client cannot be constructed
    /// - The prompt template cannot be loaded
    pub fn new(config: Config) -> Result<Self> {
        let source = RedditClient::new(&config)?;
        let generator = OpenAiClient::new(&config)?;
        Self::with_clients(config, source, generator)
    }
}

impl<S: ContentSource, G: TextGenerator> Pipeline<S, G> {
    /// Creates a pipeline with caller-supplied clients.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails or the prompt
    /// template cannot be loaded.
    pub fn with_clients(config: Config, source: S, generator: G) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            fetcher: ContentFetcher::new(&config, source),
            generator: PersonaGenerator::new(&config, generator)?,
            writer: Writer::new(&config),
        })
    }

    /// Runs the pipeline, reporting progress on stdout.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use reddit_persona::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::from_env()?;
    /// let stats = Pipeline::new(config)?.run("https://www.reddit.com/user/kojied/")?;
    /// println!("{} items cited", stats.cited_items);
    /// # Ok(())
    /// # }
    /// ```
    pub fn run(self, profile_url: &str) -> Result<PipelineStats> {
        let stdout = io::stdout();
        let mut console = stdout.lock();
        self.run_with_console(profile_url, &mut console)
    }

    /// Runs the pipeline, reporting progress to `console`.
    ///
    /// # Process
    ///
    /// 1. **Parse**: Extracts the username; malformed URLs fail before any
    ///    network traffic
    /// 2. **Fetch**: Pulls the newest posts and comments
    /// 3. **Generate**: Renders the prompt and calls the text generator
    /// 4. **Write**: Saves `<username>_persona.txt`
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage.
    #[instrument(skip(self, console))]
    pub fn run_with_console(
        self,
        profile_url: &str,
        console: &mut dyn Write,
    ) -> Result<PipelineStats> {
        let start_time = Instant::now();

        let profile = ProfileReference::from_url(profile_url)?;
        say(console, &format!("Fetching data for Reddit user: {profile}"))?;

        // Stage 1: Fetching
        info!("Stage 1/3: Fetching posts and comments...");
        let fetch_start = Instant::now();
        let content = self.fetcher.fetch(&profile)?;
        let fetch_duration = fetch_start.elapsed();

        say(
            console,
            &format!(
                "Fetched {} posts and {} comments.",
                content.posts.len(),
                content.comments.len()
            ),
        )?;
        info!("✓ Fetched content in {:.2}s", fetch_duration.as_secs_f64());

        // Stage 2: Generating
        info!("Stage 2/3: Generating persona...");
        let generate_start = Instant::now();
        let persona = self.generator.generate(&profile, &content)?;
        let generate_duration = generate_start.elapsed();

        let cited_items = persona.cited_permalinks(&content).len();
        info!(
            "✓ Generated persona in {:.2}s, citing {} of {} items",
            generate_duration.as_secs_f64(),
            cited_items,
            content.posts.len() + content.comments.len()
        );

        // Stage 3: Writing
        info!("Stage 3/3: Writing persona...");
        let write_start = Instant::now();
        let output_path = self.writer.write(&profile, &persona.text)?;
        let write_duration = write_start.elapsed();

        say(console, &format!("Persona saved to {}", output_path.display()))?;

        let duration = start_time.elapsed();
        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            duration.as_secs_f64()
        );

        Ok(PipelineStats {
            username: profile.username().to_string(),
            posts: content.posts.len(),
            comments: content.comments.len(),
            prompt_tokens: persona.prompt_tokens,
            cited_items,
            output_path,
            fetch_duration,
            generate_duration,
            write_duration,
            duration,
        })
    }
}

fn say(console: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(console, "{line}").map_err(|e| Error::io("<console>", e))
}
