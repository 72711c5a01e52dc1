use crate::{
    config::Config,
    content::{Comment, Post, UserContent},
    error::Result,
    profile::ProfileReference,
};
use tracing::{debug, info, instrument, warn};

/// Read access to a user's newest posts and comments on a content platform.
///
/// Implementations return items newest first and never more than `limit`.
pub trait ContentSource {
    /// Fetches up to `limit` of the user's newest submissions.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the platform request fails.
    fn newest_posts(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Post>>;

    /// Fetches up to `limit` of the user's newest comments.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication or the platform request fails.
    fn newest_comments(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Comment>>;
}

impl<T: ContentSource + ?Sized> ContentSource for &T {
    fn newest_posts(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Post>> {
        (**self).newest_posts(profile, limit)
    }

    fn newest_comments(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Comment>> {
        (**self).newest_comments(profile, limit)
    }
}

impl<T: ContentSource + ?Sized> ContentSource for Box<T> {
    fn newest_posts(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Post>> {
        (**self).newest_posts(profile, limit)
    }

    fn newest_comments(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Comment>> {
        (**self).newest_comments(profile, limit)
    }
}

/// Pulls a bounded slice of a user's history from a [`ContentSource`].
pub struct ContentFetcher<S> {
    source: S,
    limit: usize,
}

impl<S: ContentSource> ContentFetcher<S> {
    /// Creates a fetcher using the configured item limit.
    pub fn new(config: &Config, source: S) -> Self {
        Self {
            source,
            limit: config.limit,
        }
    }

    /// Fetches the newest posts, then the newest comments.
    ///
    /// Each sequence keeps the source's order and is capped at the limit even
    /// if the source over-delivers.
    ///
    /// # Errors
    ///
    /// Propagates the first source failure unchanged; nothing is retried.
    #[instrument(skip(self), fields(user = %profile, limit = self.limit))]
    pub fn fetch(&self, profile: &ProfileReference) -> Result<UserContent> {
        let mut posts = self.source.newest_posts(profile, self.limit)?;
        if posts.len() > self.limit {
            warn!(
                "Source returned {} posts for limit {}, truncating",
                posts.len(),
                self.limit
            );
            posts.truncate(self.limit);
        }
        debug!("Fetched {} posts", posts.len());

        let mut comments = self.source.newest_comments(profile, self.limit)?;
        if comments.len() > self.limit {
            warn!(
                "Source returned {} comments for limit {}, truncating",
                comments.len(),
                self.limit
            );
            comments.truncate(self.limit);
        }
        debug!("Fetched {} comments", comments.len());

        let content = UserContent { posts, comments };

        if let Some((oldest, newest)) = content.time_span() {
            info!(
                "Content spans {} to {}",
                oldest.format("%Y-%m-%d"),
                newest.format("%Y-%m-%d")
            );
        }

        Ok(content)
    }
}
