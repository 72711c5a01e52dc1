//! Reddit OAuth client.
//!
//! Authenticates with the application-only `client_credentials` grant and
//! reads `/user/<name>/submitted` and `/user/<name>/comments` sorted by new.
//! There is no retry and no backoff: the first failure ends the run.

use crate::{
    config::Config,
    content::{Comment, Post, absolute_permalink},
    error::{Error, Result},
    profile::ProfileReference,
    source::ContentSource,
};
use once_cell::unsync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, trace};

const SERVICE: &str = "reddit";

/// Reddit never returns more than this many items per listing page.
pub const MAX_PAGE_SIZE: usize = 100;

/// Blocking Reddit API client.
///
/// The access token is requested on first use and reused for the lifetime of
/// the client.
pub struct RedditClient {
    http: Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_url: String,
    api_url: String,
    token: OnceCell<String>,
}

impl RedditClient {
    /// Creates a client from configuration. No network traffic happens here.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.reddit_user_agent.clone())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::http(SERVICE, &e))?;

        Ok(Self {
            http,
            client_id: config.reddit_client_id.clone(),
            client_secret: config.reddit_client_secret.clone(),
            auth_url: config.reddit_auth_url.clone(),
            api_url: config.reddit_api_url.trim_end_matches('/').to_string(),
            token: OnceCell::new(),
        })
    }

    fn access_token(&self) -> Result<&str> {
        self.token
            .get_or_try_init(|| self.authenticate())
            .map(String::as_str)
    }

    #[instrument(skip(self))]
    fn authenticate(&self) -> Result<String> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| Error::config("REDDIT_CLIENT_ID is not set"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| Error::config("REDDIT_CLIENT_SECRET is not set"))?;

        debug!("Requesting application access token");

        let response = self
            .http
            .post(&self.auth_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|e| Error::http(SERVICE, &e))?;

        let status = response.status();
        let body = read_body(response)?;

        let token = token_from_response(status, &body)?;
        info!("Authenticated with Reddit");
        Ok(token)
    }

    fn listing<T: DeserializeOwned>(
        &self,
        profile: &ProfileReference,
        kind: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let url = format!("{}/user/{}/{}", self.api_url, profile.username(), kind);

        collect_pages(limit, |page_size, after| {
            let token = self.access_token()?;
            let page_size = page_size.to_string();
            let mut query = vec![
                ("sort", "new"),
                ("limit", page_size.as_str()),
                ("raw_json", "1"),
            ];
            if let Some(cursor) = after {
                query.push(("after", cursor));
            }

            trace!("GET {} {:?}", url, query);

            let response = self
                .http
                .get(&url)
                .bearer_auth(token)
                .query(&query)
                .send()
                .map_err(|e| Error::http(SERVICE, &e))?;

            let status = response.status();
            let body = read_body(response)?;
            if !status.is_success() {
                return Err(map_http_error(status, &body));
            }

            parse_page(&body)
        })
    }
}

impl ContentSource for RedditClient {
    #[instrument(skip(self), fields(user = %profile))]
    fn newest_posts(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Post>> {
        let raw: Vec<RawSubmission> = self.listing(profile, "submitted", limit)?;
        Ok(raw.into_iter().map(Post::from).collect())
    }

    #[instrument(skip(self), fields(user = %profile))]
    fn newest_comments(&self, profile: &ProfileReference, limit: usize) -> Result<Vec<Comment>> {
        let raw: Vec<RawComment> = self.listing(profile, "comments", limit)?;
        Ok(raw.into_iter().map(Comment::from).collect())
    }
}

/// One page of a listing plus the cursor for the next one.
#[derive(Debug)]
pub(crate) struct Page<T> {
    items: Vec<T>,
    after: Option<String>,
}

/// Walks a paginated listing until `limit` items are collected or the
/// listing runs out. `fetch_page` receives the page size to request and the
/// cursor from the previous page. A zero limit makes no request.
pub(crate) fn collect_pages<T, F>(limit: usize, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize, Option<&str>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut after: Option<String> = None;

    while items.len() < limit {
        let page_size = (limit - items.len()).min(MAX_PAGE_SIZE);
        let page = fetch_page(page_size, after.as_deref())?;
        let fetched = page.items.len();

        items.extend(page.items);
        after = page.after;

        if fetched == 0 || after.is_none() {
            break;
        }
    }

    items.truncate(limit);
    Ok(items)
}

fn read_body(response: Response) -> Result<String> {
    response.text().map_err(|e| Error::http(SERVICE, &e))
}

fn parse_page<T: DeserializeOwned>(body: &str) -> Result<Page<T>> {
    let listing: Listing<T> = serde_json::from_str(body)
        .map_err(|e| Error::api(SERVICE, None, format!("Malformed listing: {e}")))?;

    Ok(Page {
        items: listing.data.children.into_iter().map(|t| t.data).collect(),
        after: listing.data.after,
    })
}

/// Rejected credentials are a configuration problem; any other failure
/// belongs to Reddit.
fn token_from_response(status: StatusCode, body: &str) -> Result<String> {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(Error::config(format!(
            "Reddit rejected the client credentials (HTTP {})",
            status.as_u16()
        )));
    }
    if !status.is_success() {
        return Err(map_http_error(status, body));
    }

    parse_token(body)
}

fn parse_token(body: &str) -> Result<String> {
    let token: TokenResponse = serde_json::from_str(body)
        .map_err(|e| Error::api(SERVICE, None, format!("Malformed token response: {e}")))?;

    match (token.access_token, token.error) {
        (Some(access_token), _) => Ok(access_token),
        (None, Some(error)) => Err(Error::config(format!(
            "Reddit refused to issue a token: {error}"
        ))),
        (None, None) => Err(Error::api(SERVICE, None, "Token response carried no access_token")),
    }
}

fn map_http_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.message.or(e.reason))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });

    Error::api(SERVICE, Some(status.as_u16()), message)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    reason: Option<String>,
}

#[derive(Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Deserialize)]
struct ListingData<T> {
    children: Vec<Thing<T>>,
    after: Option<String>,
}

#[derive(Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RawSubmission {
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: String,
    permalink: String,
    created_utc: f64,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    #[serde(default)]
    body: String,
    permalink: String,
    created_utc: f64,
}

impl From<RawSubmission> for Post {
    fn from(raw: RawSubmission) -> Self {
        Self {
            title: raw.title,
            body: raw.selftext,
            url: raw.url,
            permalink: absolute_permalink(&raw.permalink),
            created_utc: raw.created_utc,
        }
    }
}

impl From<RawComment> for Comment {
    fn from(raw: RawComment) -> Self {
        Self {
            body: raw.body,
            permalink: absolute_permalink(&raw.permalink),
            created_utc: raw.created_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSIONS: &str = r#"{
        "kind": "Listing",
        "data": {
            "after": "t3_second",
            "children": [
                {"kind": "t3", "data": {
                    "title": "Rust 2024 is out",
                    "selftext": "Finally upgraded my crates.",
                    "url": "https://blog.rust-lang.org/",
                    "permalink": "/r/rust/comments/first/rust_2024_is_out/",
                    "created_utc": 1735689600.0,
                    "score": 42
                }},
                {"kind": "t3", "data": {
                    "title": "Link only",
                    "url": "https://example.com/",
                    "permalink": "/r/pics/comments/second/link_only/",
                    "created_utc": 1735603200.0
                }}
            ]
        }
    }"#;

    const COMMENTS: &str = r#"{
        "kind": "Listing",
        "data": {
            "after": null,
            "children": [
                {"kind": "t1", "data": {
                    "body": "I agree with this.",
                    "permalink": "/r/rust/comments/first/rust_2024_is_out/c1/",
                    "created_utc": 1735700000
                }}
            ]
        }
    }"#;

    fn page(n: usize, after: Option<&str>) -> Page<usize> {
        Page {
            items: (0..n).collect(),
            after: after.map(ToString::to_string),
        }
    }

    #[test]
    fn test_parse_submissions() {
        let page: Page<RawSubmission> = parse_page(SUBMISSIONS).unwrap();
        assert_eq!(page.after.as_deref(), Some("t3_second"));

        let posts: Vec<Post> = page.items.into_iter().map(Post::from).collect();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "Rust 2024 is out");
        assert_eq!(posts[0].body, "Finally upgraded my crates.");
        assert_eq!(posts[0].url, "https://blog.rust-lang.org/");
        assert_eq!(
            posts[0].permalink,
            "https://www.reddit.com/r/rust/comments/first/rust_2024_is_out/"
        );
        assert_eq!(posts[1].body, "");
    }

    #[test]
    fn test_parse_comments() {
        let page: Page<RawComment> = parse_page(COMMENTS).unwrap();
        assert!(page.after.is_none());

        let comments: Vec<Comment> = page.items.into_iter().map(Comment::from).collect();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "I agree with this.");
        assert_eq!(comments[0].created_utc, 1_735_700_000.0);
        assert!(comments[0].permalink.starts_with("https://www.reddit.com/r/rust/"));
    }

    #[test]
    fn test_malformed_listing() {
        let err = parse_page::<RawComment>("<html>rate limited</html>").unwrap_err();
        assert!(err.is_external());
        assert!(err.to_string().contains("Malformed listing"));
    }

    #[test]
    fn test_zero_limit_makes_no_request() {
        let mut calls = 0;
        let items = collect_pages::<usize, _>(0, |_, _| {
            calls += 1;
            Ok(page(5, Some("next")))
        })
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_pages_until_limit() {
        let mut requested = Vec::new();
        let items = collect_pages(250, |size, after| {
            requested.push((size, after.map(ToString::to_string)));
            Ok(page(size, Some("cursor")))
        })
        .unwrap();

        assert_eq!(items.len(), 250);
        assert_eq!(
            requested,
            vec![
                (100, None),
                (100, Some("cursor".to_string())),
                (50, Some("cursor".to_string())),
            ]
        );
    }

    #[test]
    fn test_stops_when_listing_ends() {
        let mut calls = 0;
        let items = collect_pages(100, |_, _| {
            calls += 1;
            Ok(page(7, None))
        })
        .unwrap();

        assert_eq!(items.len(), 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_stops_on_empty_page() {
        let mut calls = 0;
        let items = collect_pages::<usize, _>(100, |_, _| {
            calls += 1;
            Ok(page(0, Some("cursor")))
        })
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_page_error_propagates() {
        let result = collect_pages::<usize, _>(10, |_, _| {
            Err(Error::api(SERVICE, Some(429), "Too Many Requests"))
        });
        assert!(result.unwrap_err().is_external());
    }

    #[test]
    fn test_parse_token() {
        assert_eq!(
            parse_token(r#"{"access_token": "abc", "token_type": "bearer", "expires_in": 86400}"#)
                .unwrap(),
            "abc"
        );

        let err = parse_token(r#"{"error": "invalid_grant"}"#).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_rejected_credentials_are_config_errors() {
        let body = r#"{"message": "Unauthorized", "error": 401}"#;

        let err = token_from_response(StatusCode::UNAUTHORIZED, body).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("HTTP 401"));

        let err = token_from_response(StatusCode::FORBIDDEN, "").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("HTTP 403"));
    }

    #[test]
    fn test_token_server_failure_is_external() {
        let err = token_from_response(StatusCode::INTERNAL_SERVER_ERROR, "").unwrap_err();
        assert!(err.is_external());
        assert_eq!(err.to_string(), "reddit API error (HTTP 500): Internal Server Error");
    }

    #[test]
    fn test_token_from_successful_response() {
        let token = token_from_response(StatusCode::OK, r#"{"access_token": "abc"}"#);
        assert_eq!(token.unwrap(), "abc");
    }

    #[test]
    fn test_map_http_error() {
        let err = map_http_error(
            StatusCode::NOT_FOUND,
            r#"{"message": "Not Found", "error": 404}"#,
        );
        assert_eq!(err.to_string(), "reddit API error (HTTP 404): Not Found");

        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.to_string(), "reddit API error (HTTP 429): Too Many Requests");
    }

    #[test]
    fn test_missing_credentials_fail_as_config_before_network() {
        let config = Config::builder()
            .reddit_auth_url("http://127.0.0.1:9/unreachable")
            .build()
            .unwrap();
        let client = RedditClient::new(&config).unwrap();
        let profile = ProfileReference::from_url("https://www.reddit.com/user/tester").unwrap();

        let err = client.newest_posts(&profile, 5).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("REDDIT_CLIENT_ID"));
    }
}
