//! In-memory [`Transport`] for exercising sessions without a network.

use crate::core::Transport;
use crate::errors::{BrowserError, Result};
use crate::types::{upsert_pair, Method, Request, Response};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const MAX_HOPS: usize = 20;

/// What a mocked route answers with.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
    pub cookies: Vec<(String, String)>,
    pub location: Option<String>,
}

impl MockResponse {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "text/html; charset=utf-8".to_string(),
            cookies: Vec::new(),
            location: None,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            location: Some(location.into()),
            ..Self::html("")
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }
}

type Handler = Arc<dyn Fn(&Request) -> MockResponse + Send + Sync>;

#[derive(Default)]
struct MockState {
    routes: HashMap<String, Handler>,
    failing: HashSet<String>,
    requests: Vec<Request>,
    shutdowns: usize,
}

/// Routes requests by URL path to canned or computed responses and records
/// every request it receives. Clones share state, so a test can keep one
/// handle while the session owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn route<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> MockResponse + Send + Sync + 'static,
    {
        self.lock().routes.insert(path.to_string(), Arc::new(handler));
        self
    }

    pub fn page(self, path: &str, html: &str) -> Self {
        let html = html.to_string();
        self.route(path, move |_| MockResponse::html(html.clone()))
    }

    /// Answers with a page listing what was received, one `key=value` per
    /// line inside `<pre id="echo">`: the method, form and query pairs,
    /// `cookie:` entries, `referer:` and `user-agent:`.
    pub fn echo(self, path: &str) -> Self {
        self.route(path, |request| MockResponse::html(echo_page(request)))
    }

    /// Requests to `path` fail as if the connection broke.
    pub fn fail(self, path: &str) -> Self {
        self.lock().failing.insert(path.to_string());
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.lock().requests.last().cloned()
    }

    pub fn shutdowns(&self) -> usize {
        self.lock().shutdowns
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let (routes, failing) = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            (state.routes.clone(), state.failing.clone())
        };

        let mut current = request;
        let mut received = Vec::new();
        for _ in 0..=MAX_HOPS {
            let path = current.url.path().to_string();
            if failing.contains(&path) {
                return Err(BrowserError::ConnectionReset(current.url.to_string()));
            }
            let reply = match routes.get(&path) {
                Some(handler) => handler(&current),
                None => MockResponse::html("<h1>Not Found</h1>").with_status(404),
            };
            for cookie in &reply.cookies {
                upsert_pair(&mut current.cookies, cookie.clone());
                upsert_pair(&mut received, cookie.clone());
            }

            if current.follow_redirects && (300..400).contains(&reply.status) {
                if let Some(location) = &reply.location {
                    current.url = current
                        .url
                        .join(location)
                        .map_err(|e| BrowserError::invalid_url(location.as_str(), e))?;
                    if reply.status != 307 && reply.status != 308 {
                        current.method = Method::Get;
                        current.form.clear();
                    }
                    continue;
                }
            }

            if !current.ignore_http_errors && reply.status >= 400 {
                return Err(BrowserError::HttpStatus {
                    status: reply.status,
                    url: current.url.to_string(),
                });
            }
            if !current.ignore_content_type && !reply.content_type.starts_with("text/") {
                return Err(BrowserError::UnsupportedContentType {
                    content_type: reply.content_type,
                    url: current.url.to_string(),
                });
            }
            return Ok(Response {
                url: current.url,
                status: reply.status,
                headers: vec![("content-type".to_string(), reply.content_type)],
                cookies: received,
                body: reply.body,
            });
        }
        Err(BrowserError::TooManyRedirects(current.url.to_string()))
    }

    async fn shutdown(&self) -> Result<()> {
        self.lock().shutdowns += 1;
        Ok(())
    }
}

fn echo_page(request: &Request) -> String {
    let mut lines = vec![format!("method={}", request.method.as_str())];
    lines.extend(
        request
            .url
            .query_pairs()
            .map(|(name, value)| format!("{}={}", name, value)),
    );
    lines.extend(request.form.iter().map(|(name, value)| format!("{}={}", name, value)));
    lines.extend(
        request
            .cookies
            .iter()
            .map(|(name, value)| format!("cookie:{}={}", name, value)),
    );
    if let Some(referrer) = &request.referrer {
        lines.push(format!("referer:{}", referrer));
    }
    if let Some(user_agent) = &request.user_agent {
        lines.push(format!("user-agent:{}", user_agent));
    }
    format!(
        "<html><body><h1>Echo</h1><pre id=\"echo\">{}</pre></body></html>",
        escape(&lines.join("\n"))
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
