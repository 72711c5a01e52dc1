use chrono::{DateTime, Utc};
use serde::Serialize;

/// Reddit's public web origin, prefixed onto API permalinks.
const REDDIT_ORIGIN: &str = "https://www.reddit.com";

/// A submission authored by the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    /// Submission title
    pub title: String,

    /// Self-text body; empty for link posts
    pub body: String,

    /// External link the post points at (equals the permalink for self posts)
    pub url: String,

    /// Absolute permalink on reddit.com
    pub permalink: String,

    /// Creation time in epoch seconds (UTC)
    pub created_utc: f64,
}

/// A comment authored by the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    /// Comment body
    pub body: String,

    /// Absolute permalink on reddit.com
    pub permalink: String,

    /// Creation time in epoch seconds (UTC)
    pub created_utc: f64,
}

impl Post {
    /// Creation time as a UTC timestamp, if representable.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        epoch_to_datetime(self.created_utc)
    }
}

impl Comment {
    /// Creation time as a UTC timestamp, if representable.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        epoch_to_datetime(self.created_utc)
    }
}

/// Everything fetched for one user, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserContent {
    /// Newest submissions first
    pub posts: Vec<Post>,

    /// Newest comments first
    pub comments: Vec<Comment>,
}

impl UserContent {
    /// Returns true when neither posts nor comments were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.comments.is_empty()
    }

    /// Time span covered by the fetched items, oldest to newest.
    #[must_use]
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let stamps = self
            .posts
            .iter()
            .map(|p| p.created_utc)
            .chain(self.comments.iter().map(|c| c.created_utc));

        let (min, max) = stamps.fold(None, |acc: Option<(f64, f64)>, t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })?;

        Some((epoch_to_datetime(min)?, epoch_to_datetime(max)?))
    }
}

/// Turns an API-relative permalink (`/r/...`) into an absolute URL.
///
/// Already absolute links are returned unchanged.
#[must_use]
pub fn absolute_permalink(path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{REDDIT_ORIGIN}{path}")
    }
}

#[allow(clippy::cast_possible_truncation)]
fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs.trunc() as i64, 0)
}
