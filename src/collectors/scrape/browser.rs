use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use tracing::debug;

/// Desktop user agents rotated per session.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{action} timed out after {}s", .after.as_secs())]
    Timeout { action: String, after: Duration },

    #[error("no element matches `{0}`")]
    SelectorMissing(String),

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("no page has been loaded")]
    NoPage,

    #[error("session is closed")]
    Closed,
}

/// Starts browser sessions. One session is used per scrape run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A single page-holding browser session.
#[async_trait]
pub trait BrowserSession: Send {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// HTML of the current page.
    async fn content(&mut self) -> Result<String, BrowserError>;

    async fn close(&mut self);
}

/// Plain HTTP "browser": fetches pages with reqwest and evaluates selectors
/// against the returned document. No script execution.
#[derive(Debug, Clone, Default)]
pub struct HttpBrowser;

impl HttpBrowser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserLauncher for HttpBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let user_agent = random_user_agent();

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-IN,en-US;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        debug!(user_agent, "browser session launched");
        Ok(Box::new(HttpSession {
            client,
            page: None,
            closed: false,
        }))
    }
}

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

struct HttpSession {
    client: reqwest::Client,
    page: Option<String>,
    closed: bool,
}

impl HttpSession {
    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            Err(BrowserError::Closed)
        } else {
            Ok(())
        }
    }

    async fn fetch(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.ensure_open()?;
        self.page = None;

        let html = tokio::time::timeout(timeout, self.fetch(url))
            .await
            .map_err(|_| BrowserError::Timeout {
                action: format!("navigation to {url}"),
                after: timeout,
            })?
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        self.page = Some(html);
        Ok(())
    }

    // A fetched document never changes, so the wait is a single check.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let html = self.page.as_deref().ok_or(BrowserError::NoPage)?;
        if matches_any(html, selector)? {
            Ok(())
        } else {
            Err(BrowserError::SelectorMissing(selector.to_string()))
        }
    }

    async fn content(&mut self) -> Result<String, BrowserError> {
        self.ensure_open()?;
        self.page.clone().ok_or(BrowserError::NoPage)
    }

    async fn close(&mut self) {
        self.page = None;
        self.closed = true;
    }
}

fn matches_any(html: &str, selector: &str) -> Result<bool, BrowserError> {
    let selector =
        Selector::parse(selector).map_err(|_| BrowserError::InvalidSelector(selector.to_string()))?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn fetches_page_and_checks_selector() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/jobs")
            .match_header("accept-language", "en-IN,en-US;q=0.9")
            .with_status(200)
            .with_body(r#"<html><body><article class="job">Rust</article></body></html>"#)
            .create_async()
            .await;

        let mut session = HttpBrowser::new().launch().await.unwrap();
        session
            .goto(&format!("{}/jobs", server.url()), TIMEOUT)
            .await
            .unwrap();
        session.wait_for_selector("article", TIMEOUT).await.unwrap();

        let err = session
            .wait_for_selector("li.result", TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::SelectorMissing(_)));

        let html = session.content().await.unwrap();
        assert!(html.contains("Rust"));

        session.close().await;
        assert!(matches!(session.content().await, Err(BrowserError::Closed)));
    }

    #[tokio::test]
    async fn http_errors_fail_navigation() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/blocked")
            .with_status(403)
            .create_async()
            .await;

        let mut session = HttpBrowser::new().launch().await.unwrap();
        let err = session
            .goto(&format!("{}/blocked", server.url()), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Navigation { .. }));
        assert!(matches!(session.content().await, Err(BrowserError::NoPage)));
    }

    #[tokio::test]
    async fn invalid_selector_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_body("<p>hi</p>")
            .create_async()
            .await;

        let mut session = HttpBrowser::new().launch().await.unwrap();
        session.goto(&server.url(), TIMEOUT).await.unwrap();
        let err = session.wait_for_selector("div[", TIMEOUT).await.unwrap_err();
        assert!(matches!(err, BrowserError::InvalidSelector(_)));
    }

    #[test]
    fn user_agents_rotate_from_desktop_list() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }
}
