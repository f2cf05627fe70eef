use crate::browser::dispatch::{dispatch, Dispatch};
use crate::browser::http::HttpTransport;
use crate::browser::rate_limit::RateLimiter;
use crate::core::{BrowserConfig, Transport};
use crate::dom::{Document, FormSubmission, Resolver};
use crate::errors::{BrowserError, Result};
use crate::types::Request;
use chrono::{DateTime, Utc};
use ego_tree::NodeId;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// The last successfully loaded response, parsed and raw.
#[derive(Debug, Clone)]
pub struct Page {
    pub document: Document,
    pub raw: String,
    pub status: u16,
    pub fetched_at: DateTime<Utc>,
}

impl Page {
    fn blank(location: Url) -> Self {
        Self {
            document: Document::parse("", location),
            raw: String::new(),
            status: 0,
            fetched_at: Utc::now(),
        }
    }
}

/// One browsing sequence: current page, cookie jar, referrer and pacing.
///
/// Operations take `&mut self`; a session is driven by one caller at a
/// time. Separate sessions share nothing.
pub struct BrowserSession<T: Transport = HttpTransport> {
    transport: T,
    config: BrowserConfig,
    session_id: String,
    pub(crate) page: Page,
    cookies: BTreeMap<String, String>,
    referrer: Option<String>,
    pub(crate) limiter: RateLimiter,
}

impl BrowserSession<HttpTransport> {
    /// Open a session over HTTP and load `url`.
    pub async fn connect(config: BrowserConfig, url: &str) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Self::new(transport, config, url).await
    }
}

impl<T: Transport> BrowserSession<T> {
    /// Create a session and perform the initial navigation to `url`.
    pub async fn new(transport: T, config: BrowserConfig, url: &str) -> Result<Self> {
        let location = Url::parse(url).map_err(|e| BrowserError::invalid_url(url, e))?;
        let referrer = Some(config.initial_referrer.clone()).filter(|r| !r.is_empty());
        let limiter = RateLimiter::new(config.minimum_timeout());

        let mut session = Self {
            transport,
            config,
            session_id: uuid::Uuid::new_v4().to_string(),
            page: Page::blank(location),
            cookies: BTreeMap::new(),
            referrer,
            limiter,
        };
        info!(session = %session.session_id, url, "starting session");
        session.navigate(url).await?;
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.page.document
    }

    pub fn url(&self) -> &Url {
        self.page.document.location()
    }

    pub fn status(&self) -> u16 {
        self.page.status
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.page.fetched_at
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn minimum_timeout(&self) -> Duration {
        self.limiter.minimum()
    }

    /// Minimum spacing between request-issuing operations. Zero disables it.
    pub fn set_minimum_timeout(&mut self, timeout: Duration) {
        self.limiter.set_minimum(timeout);
    }

    /// The raw body of the last response.
    pub fn page_content(&self) -> &str {
        &self.page.raw
    }

    /// Whether the page contains `text`, either as text (case-insensitive)
    /// or as something `text` selects when read as a CSS selector.
    pub fn contains(&self, text: &str) -> bool {
        let document = &self.page.document;
        document.contains_text(text) || !document.select(text).is_empty()
    }

    /// Load `url` (absolute, or relative to the current page). Not rate
    /// limited.
    pub async fn navigate(&mut self, url: &str) -> Result<()> {
        let url = self.page.document.resolve_url(url)?;
        self.perform(Request::get(url)).await
    }

    /// Click whatever `target` names: an id, a `name`, visible text, or a
    /// CSS selector, tried in that order.
    ///
    /// Returns `Ok(false)` when nothing matches or the match is not
    /// clickable.
    pub async fn click(&mut self, target: &str, exact: bool) -> Result<bool> {
        self.limiter.await_turn().await;

        let Some(found) = Resolver::new(&self.page.document).resolve(target, exact) else {
            return Ok(false);
        };
        self.activate(found.node).await
    }

    /// Follow the first link whose text matches `target`, or failing that,
    /// the first element `target` selects.
    pub async fn click_link(&mut self, target: &str, exact: bool) -> Result<bool> {
        self.limiter.await_turn().await;

        let Some(url) = self.link_url(target, exact)? else {
            return Ok(false);
        };
        self.perform(Request::get(url)).await?;
        Ok(true)
    }

    /// Where following `target` leads: the nearest `href` at or above the
    /// first link match.
    fn link_url(&self, target: &str, exact: bool) -> Result<Option<Url>> {
        let document = &self.page.document;
        let Some(&first) = Resolver::new(document).resolve_link(target, exact).first() else {
            debug!(query = target, "no link found");
            return Ok(None);
        };
        let href = std::iter::successors(Some(first), |&node| document.parent(node))
            .find_map(|node| document.attr(node, "href"));
        match href {
            Some(href) => document.resolve_url(href).map(Some),
            None => {
                debug!(
                    query = target,
                    element = %document.describe(first),
                    "match carries no href"
                );
                Ok(None)
            }
        }
    }

    async fn activate(&mut self, node: NodeId) -> Result<bool> {
        let action = dispatch(&mut self.page.document, node)?;
        match action {
            Dispatch::Submit { form, submitter } => {
                self.submit_form(form, submitter).await?;
                Ok(true)
            }
            Dispatch::Navigate(url) => {
                self.perform(Request::get(url)).await?;
                Ok(true)
            }
            Dispatch::Toggled {
                node,
                attribute,
                present,
            } => {
                debug!(
                    element = %self.page.document.describe(node),
                    attribute,
                    present,
                    "toggled"
                );
                Ok(true)
            }
            Dispatch::Unclickable => Ok(false),
        }
    }

    pub(crate) async fn submit_form(
        &mut self,
        form: NodeId,
        submitter: Option<NodeId>,
    ) -> Result<()> {
        let submission = FormSubmission::from_form(&self.page.document, form, submitter)?;
        info!(
            session = %self.session_id,
            method = submission.method.as_str(),
            action = %submission.action,
            fields = submission.fields.len(),
            "submitting form"
        );
        self.perform(submission.into_request()).await
    }

    /// Send `request` with the configured redirect policy.
    pub(crate) async fn perform(&mut self, request: Request) -> Result<()> {
        let follow = self.config.follow_redirects;
        self.perform_with(request, follow).await
    }

    /// Send `request` with this session's cookies, user agent and referrer,
    /// then adopt the response as the current page.
    ///
    /// Cookies are merged, never removed. On error nothing changes.
    pub async fn perform_with(
        &mut self,
        mut request: Request,
        follow_redirects: bool,
    ) -> Result<()> {
        request.user_agent = Some(self.config.user_agent.clone());
        request.referrer = self.referrer.clone();
        request.cookies = self
            .cookies
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        request.follow_redirects = follow_redirects;
        request.ignore_http_errors = true;
        request.ignore_content_type = true;
        request.timeout = None;

        debug!(
            session = %self.session_id,
            method = request.method.as_str(),
            url = %request.url,
            "sending request"
        );
        let response = self.transport.execute(request).await?;
        info!(
            session = %self.session_id,
            status = response.status,
            url = %response.url,
            "page loaded"
        );

        let document = Document::parse(&response.body, response.url.clone());
        self.cookies.extend(response.cookies);
        self.referrer = Some(response.url.to_string());
        self.page = Page {
            document,
            raw: response.body,
            status: response.status,
            fetched_at: Utc::now(),
        };
        Ok(())
    }

    /// Release transport resources.
    pub async fn shutdown(self) -> Result<()> {
        info!(session = %self.session_id, "shutting down");
        self.transport.shutdown().await
    }
}
