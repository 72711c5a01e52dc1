use crate::{
    config::Config,
    content::UserContent,
    error::{Error, Result},
    profile::ProfileReference,
};
use serde::Serialize;
use std::fs;
use tera::{Context, Tera};
use tracing::debug;

const BUILTIN_TEMPLATE: &str = "persona_prompt";
const CUSTOM_TEMPLATE: &str = "custom";

#[derive(Serialize)]
struct PromptContext<'a> {
    username: &'a str,
    posts: Vec<PostView<'a>>,
    comments: Vec<CommentView<'a>>,
    post_count: usize,
    comment_count: usize,
}

#[derive(Serialize)]
struct PostView<'a> {
    title: &'a str,
    body: &'a str,
    url: &'a str,
    permalink: &'a str,
    created_utc: f64,
}

#[derive(Serialize)]
struct CommentView<'a> {
    body: &'a str,
    permalink: &'a str,
    created_utc: f64,
}

/// Renders the persona prompt from fetched content.
///
/// Every post and comment is rendered verbatim. Nothing is truncated, so an
/// oversized history produces an oversized prompt.
pub(crate) struct TemplateEngine {
    tera: Tera,
    template_name: &'static str,
}

impl TemplateEngine {
    /// Creates a new template engine from configuration.
    ///
    /// Uses the external template when `config.template_path` is set and the
    /// built-in prompt otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be read or compiled.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_template(
            BUILTIN_TEMPLATE,
            include_str!("../templates/persona_prompt.tera"),
        )
        .map_err(|e| Error::template(BUILTIN_TEMPLATE, e))?;

        let template_name = match config.template_path {
            Some(ref path) => {
                let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
                tera.add_raw_template(CUSTOM_TEMPLATE, &source)
                    .map_err(|e| Error::template(path.display().to_string(), e))?;
                debug!("Using custom prompt template {}", path.display());
                CUSTOM_TEMPLATE
            }
            None => BUILTIN_TEMPLATE,
        };

        Ok(Self {
            tera,
            template_name,
        })
    }

    /// Renders the prompt for `profile` and its content.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails, or if the rendered prompt
    /// leaves out the title, body or permalink of any fetched item.
    pub(crate) fn render(
        &self,
        profile: &ProfileReference,
        content: &UserContent,
    ) -> Result<String> {
        let view = PromptContext {
            username: profile.username(),
            posts: content
                .posts
                .iter()
                .map(|p| PostView {
                    title: &p.title,
                    body: &p.body,
                    url: &p.url,
                    permalink: &p.permalink,
                    created_utc: p.created_utc,
                })
                .collect(),
            comments: content
                .comments
                .iter()
                .map(|c| CommentView {
                    body: &c.body,
                    permalink: &c.permalink,
                    created_utc: c.created_utc,
                })
                .collect(),
            post_count: content.posts.len(),
            comment_count: content.comments.len(),
        };

        let context = Context::from_serialize(&view)
            .map_err(|e| Error::template(self.template_name, e))?;

        let prompt = self
            .tera
            .render(self.template_name, &context)
            .map_err(|e| Error::template(self.template_name, e))?;

        self.check_verbatim(&prompt, content)?;
        Ok(prompt)
    }

    /// Custom templates can loop over `posts` and still drop fields, so the
    /// rendered text is checked item by item.
    fn check_verbatim(&self, prompt: &str, content: &UserContent) -> Result<()> {
        let post_fields = content
            .posts
            .iter()
            .flat_map(|p| [p.title.as_str(), p.body.as_str(), p.permalink.as_str()]);
        let comment_fields = content
            .comments
            .iter()
            .flat_map(|c| [c.body.as_str(), c.permalink.as_str()]);

        match post_fields.chain(comment_fields).find(|field| !prompt.contains(field)) {
            Some(field) => {
                let excerpt: String = field.chars().take(60).collect();
                Err(Error::template_validation(
                    self.template_name,
                    format!("Rendered prompt leaves out fetched content: {excerpt:?}"),
                ))
            }
            None => Ok(()),
        }
    }
}
