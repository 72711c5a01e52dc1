use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static PROFILE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"reddit\.com/user/([\w-]+)/?").expect("profile URL pattern is valid")
});

/// A Reddit username extracted from a profile URL.
///
/// Holds only word characters and hyphens, which is what Reddit allows in
/// usernames.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileReference(String);

impl ProfileReference {
    /// Extracts the username from a profile URL such as
    /// `https://www.reddit.com/user/spez/`.
    ///
    /// There is no fallback: anything without a `reddit.com/user/<name>`
    /// segment is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProfileUrl`] when the pattern is not found.
    ///
    /// # Examples
    ///
    /// ```
    /// use reddit_persona::ProfileReference;
    ///
    /// let profile = ProfileReference::from_url("https://www.reddit.com/user/kojied/").unwrap();
    /// assert_eq!(profile.username(), "kojied");
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        PROFILE_URL
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|name| Self(name.as_str().to_string()))
            .ok_or_else(|| Error::invalid_profile_url(url))
    }

    /// The bare username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProfileReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_url(s)
    }
}

impl fmt::Display for ProfileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProfileReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
