use crate::{
    config::Config,
    content::UserContent,
    error::{Error, Result},
    profile::ProfileReference,
    template::TemplateEngine,
    token::{ProseTokenizer, TokenEstimator, is_large_prompt},
};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// A single-turn completion call.
#[derive(Clone, Copy, PartialEq)]
pub struct CompletionRequest<'a> {
    /// Credential for the text-generation API
    pub api_key: &'a str,

    /// Model name
    pub model: &'a str,

    /// The full prompt, sent as one user message
    pub prompt: &'a str,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl fmt::Debug for CompletionRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("model", &self.model)
            .field("prompt_bytes", &self.prompt.len())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

/// Something that turns a prompt into text.
pub trait TextGenerator {
    /// Runs one completion and returns the generated text verbatim.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or yields no text.
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<String> {
        (**self).generate(request)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<String> {
        (**self).generate(request)
    }
}

/// Generated persona text with the citations it embeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaDocument {
    /// The model's response, untouched
    pub text: String,

    /// Estimated size of the prompt it was generated from
    pub prompt_tokens: usize,
}

impl PersonaDocument {
    /// Permalinks from `content` that the persona actually cites.
    #[must_use]
    pub fn cited_permalinks<'a>(&self, content: &'a UserContent) -> Vec<&'a str> {
        content
            .posts
            .iter()
            .map(|p| p.permalink.as_str())
            .chain(content.comments.iter().map(|c| c.permalink.as_str()))
            .filter(|url| cites(&self.text, url))
            .collect()
    }
}

/// True if `url` occurs in `text` as a whole link, not as the prefix of a
/// longer one such as a comment under the cited post.
fn cites(text: &str, url: &str) -> bool {
    text.match_indices(url).any(|(start, _)| {
        text[start + url.len()..]
            .chars()
            .next()
            .is_none_or(|next| !is_url_char(next))
    })
}

// Trailing punctuation like `.`, `,` or `)` ends a link in prose.
const fn is_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '_' | '~' | '%' | '/' | '?' | '#' | '=' | '&' | '+')
}

/// Builds the persona prompt and submits it to a [`TextGenerator`].
pub struct PersonaGenerator<G> {
    generator: G,
    templates: TemplateEngine,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl<G: TextGenerator> PersonaGenerator<G> {
    /// Creates a generator from configuration.
    ///
    /// A missing API key is not an error yet; it is reported by
    /// [`PersonaGenerator::generate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt template cannot be loaded.
    pub fn new(config: &Config, generator: G) -> Result<Self> {
        Ok(Self {
            generator,
            templates: TemplateEngine::new(config)?,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_output_tokens,
        })
    }

    /// Renders the prompt without calling the API.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn build_prompt(
        &self,
        profile: &ProfileReference,
        content: &UserContent,
    ) -> Result<String> {
        self.templates.render(profile, content)
    }

    /// Generates the persona for `profile`.
    ///
    /// The API key is checked before anything else, so a missing key never
    /// reaches the generator. The prompt is sent whole.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is missing and
    /// propagates any generator failure unchanged.
    #[instrument(skip(self, content), fields(user = %profile, model = %self.model))]
    pub fn generate(
        &self,
        profile: &ProfileReference,
        content: &UserContent,
    ) -> Result<PersonaDocument> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::config("OpenAI API key not set in environment (OPENAI_API_KEY)")
        })?;

        let prompt = self.build_prompt(profile, content)?;
        let prompt_tokens = ProseTokenizer.estimate(&prompt);

        info!("Prompt is ~{} tokens ({} bytes)", prompt_tokens, prompt.len());
        if is_large_prompt(prompt_tokens) {
            warn!(
                "Prompt of ~{} tokens may exceed the model's context window; it is sent untrimmed",
                prompt_tokens
            );
        }

        let request = CompletionRequest {
            api_key,
            model: &self.model,
            prompt: &prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let text = self.generator.generate(&request)?;
        debug!("Received {} bytes of persona text", text.len());

        Ok(PersonaDocument {
            text,
            prompt_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Comment, Post};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingGenerator {
        calls: RefCell<Vec<(String, String, f32, u32)>>,
    }

    impl TextGenerator for RecordingGenerator {
        fn generate(&self, request: &CompletionRequest<'_>) -> Result<String> {
            self.calls.borrow_mut().push((
                request.model.to_string(),
                request.prompt.to_string(),
                request.temperature,
                request.max_tokens,
            ));
            Ok("Persona: cites https://www.reddit.com/r/a/comments/1/x/".to_string())
        }
    }

    fn profile() -> ProfileReference {
        ProfileReference::from_url("https://www.reddit.com/user/tester/").unwrap()
    }

    fn content() -> UserContent {
        UserContent {
            posts: vec![Post {
                title: "First post".to_string(),
                body: "Body text".to_string(),
                url: "https://example.com/".to_string(),
                permalink: "https://www.reddit.com/r/a/comments/1/x/".to_string(),
                created_utc: 1.0,
            }],
            comments: vec![Comment {
                body: "A comment".to_string(),
                permalink: "https://www.reddit.com/r/a/comments/1/x/c/".to_string(),
                created_utc: 2.0,
            }],
        }
    }

    #[test]
    fn test_missing_api_key_makes_no_call() {
        let recorder = RecordingGenerator::default();
        let generator = PersonaGenerator::new(&Config::default(), &recorder).unwrap();

        let err = generator.generate(&profile(), &content()).unwrap_err();

        assert!(err.is_config());
        assert!(recorder.calls.borrow().is_empty());
    }

    #[test]
    fn test_fixed_parameters_and_full_prompt() {
        let config = Config::builder().openai_api_key("sk-test").build().unwrap();
        let recorder = RecordingGenerator::default();
        let generator = PersonaGenerator::new(&config, &recorder).unwrap();

        let persona = generator.generate(&profile(), &content()).unwrap();

        let calls = recorder.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (model, prompt, temperature, max_tokens) = &calls[0];
        assert_eq!(model, "gpt-3.5-turbo");
        assert_eq!(*temperature, 0.7);
        assert_eq!(*max_tokens, 800);
        assert!(prompt.contains("Reddit Username: tester"));
        assert!(prompt.contains("First post"));
        assert!(prompt.contains("Body text"));
        assert!(prompt.contains("A comment"));
        assert!(prompt.contains("https://www.reddit.com/r/a/comments/1/x/c/"));
        assert!(persona.prompt_tokens > 0);
    }

    #[test]
    fn test_text_returned_verbatim() {
        let config = Config::builder().openai_api_key("sk-test").build().unwrap();
        let generator = PersonaGenerator::new(&config, RecordingGenerator::default()).unwrap();

        let persona = generator.generate(&profile(), &content()).unwrap();
        assert_eq!(persona.text, "Persona: cites https://www.reddit.com/r/a/comments/1/x/");
    }

    #[test]
    fn test_cited_permalinks() {
        let persona = PersonaDocument {
            text: "Likes hiking (https://www.reddit.com/r/a/comments/1/x/c/)".to_string(),
            prompt_tokens: 10,
        };

        let content = content();
        let cited = persona.cited_permalinks(&content);
        assert_eq!(cited, vec!["https://www.reddit.com/r/a/comments/1/x/c/"]);
    }

    #[test]
    fn test_cited_permalinks_at_link_boundaries() {
        let persona = PersonaDocument {
            text: "Bakes bread, see https://www.reddit.com/r/a/comments/1/x/. \
                   Also https://www.reddit.com/r/a/comments/1/x/c/"
                .to_string(),
            prompt_tokens: 10,
        };

        let content = content();
        assert_eq!(persona.cited_permalinks(&content).len(), 2);

        let uncited = PersonaDocument {
            text: "Nothing here: https://www.reddit.com/r/a/comments/1/x/other/".to_string(),
            prompt_tokens: 10,
        };
        assert!(uncited.cited_permalinks(&content).is_empty());
    }

    #[test]
    fn test_generator_error_propagates() {
        struct Failing;
        impl TextGenerator for Failing {
            fn generate(&self, _: &CompletionRequest<'_>) -> Result<String> {
                Err(Error::api("openai", Some(429), "Rate limit reached"))
            }
        }

        let config = Config::builder().openai_api_key("sk-test").build().unwrap();
        let generator = PersonaGenerator::new(&config, Failing).unwrap();
        let err = generator.generate(&profile(), &content()).unwrap_err();
        assert!(err.is_external());
    }

    #[test]
    fn test_request_debug_omits_key() {
        let request = CompletionRequest {
            api_key: "sk-secret",
            model: "gpt-3.5-turbo",
            prompt: "hi",
            temperature: 0.7,
            max_tokens: 800,
        };
        let debug = format!("{request:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-3.5-turbo"));
    }
}
