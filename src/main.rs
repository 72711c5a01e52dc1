use anyhow::Context;
use clap::Parser;
use reddit_persona::{ConfigBuilder, Pipeline};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "reddit-persona",
    version,
    author,
    about = "Build a cited user persona from a Reddit profile",
    long_about = "Build a cited user persona from a Reddit profile.\n\n\
    Fetches the user's newest posts and comments, asks a chat model to describe \
    the user with a source URL for every trait, and saves the answer to \
    <output>/<username>_persona.txt.\n\n\
    Credentials are read from the environment (or a .env file):\n  \
      REDDIT_CLIENT_ID, REDDIT_CLIENT_SECRET, REDDIT_USER_AGENT, OPENAI_API_KEY\n\n\
    USAGE EXAMPLES:\n  \
      reddit-persona https://www.reddit.com/user/kojied/\n\n  \
      reddit-persona https://www.reddit.com/user/kojied/ --limit 25 --out ./personas"
)]
struct Cli {
    /// Reddit user profile URL, e.g. https://www.reddit.com/user/kojied/
    #[arg(value_name = "URL")]
    url: String,

    /// Output directory for the persona file
    #[arg(short, long, default_value = "output", value_name = "PATH")]
    out: PathBuf,

    /// Max posts, and separately max comments, to fetch
    #[arg(short, long, default_value_t = 100)]
    limit: usize,

    /// Chat model (defaults to OPENAI_MODEL or gpt-3.5-turbo)
    #[arg(short, long)]
    model: Option<String>,

    /// Path to a custom Tera prompt template
    ///
    /// The template receives `username`, `posts` (title, body, url,
    /// permalink, created_utc), `comments` (body, permalink, created_utc),
    /// `post_count` and `comment_count`. Every title, body and permalink
    /// must end up in the rendered prompt, or the run is rejected.
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the real environment still applies
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let mut builder = ConfigBuilder::from_env()
        .output_dir(cli.out)
        .limit(cli.limit);

    if let Some(model) = cli.model {
        builder = builder.openai_model(model);
    }

    if let Some(template_path) = cli.template {
        builder = builder.template_path(template_path);
    }

    let config = builder.build().context("Failed to build configuration")?;

    Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run(&cli.url)
        .context("Persona generation failed")?;

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("reddit_persona=warn"),
        1 => EnvFilter::new("reddit_persona=info"),
        2 => EnvFilter::new("reddit_persona=debug"),
        _ => EnvFilter::new("reddit_persona=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
