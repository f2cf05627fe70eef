use crate::core::{BrowserConfig, Transport};
use crate::errors::{BrowserError, Result};
use crate::types::{upsert_pair, Method, Request, Response};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, REFERER, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// [`Transport`] over a `reqwest` client.
///
/// Redirects are followed here rather than by reqwest so that every hop
/// sends the cookies collected so far and cookies set by intermediate
/// responses are reported back.
pub struct HttpTransport {
    client: Client,
    max_redirects: usize,
}

impl HttpTransport {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    fn build(&self, request: &Request, hop: &Hop) -> reqwest::RequestBuilder {
        let mut builder = match hop.method {
            Method::Get => self.client.get(hop.url.clone()),
            Method::Post => self.client.post(hop.url.clone()).form(&hop.form),
        };
        if let Some(user_agent) = &request.user_agent {
            builder = builder.header(USER_AGENT, user_agent);
        }
        if let Some(referrer) = &request.referrer {
            builder = builder.header(REFERER, referrer);
        }
        if !hop.cookies.is_empty() {
            builder = builder.header(COOKIE, cookie_header(&hop.cookies));
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response> {
        let mut hop = Hop {
            method: request.method,
            url: request.url.clone(),
            form: request.form.clone(),
            cookies: request.cookies.clone(),
        };
        let mut received: Vec<(String, String)> = Vec::new();

        for _ in 0..=self.max_redirects {
            let response = self.build(&request, &hop).send().await?;
            let status = response.status();

            for cookie in response.cookies() {
                let pair = (cookie.name().to_string(), cookie.value().to_string());
                upsert_pair(&mut hop.cookies, pair.clone());
                upsert_pair(&mut received, pair);
            }

            if request.follow_redirects && status.is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                {
                    let next = hop
                        .url
                        .join(location)
                        .map_err(|e| BrowserError::invalid_url(location, e))?;
                    debug!(
                        status = status.as_u16(),
                        from = %hop.url,
                        to = %next,
                        "following redirect"
                    );
                    if status != StatusCode::TEMPORARY_REDIRECT
                        && status != StatusCode::PERMANENT_REDIRECT
                    {
                        hop.method = Method::Get;
                        hop.form.clear();
                    }
                    hop.url = next;
                    continue;
                }
            }

            let final_url = response.url().clone();
            if !request.ignore_http_errors
                && (status.is_client_error() || status.is_server_error())
            {
                return Err(BrowserError::HttpStatus {
                    status: status.as_u16(),
                    url: final_url.to_string(),
                });
            }
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if !request.ignore_content_type && !is_markup(&content_type) {
                return Err(BrowserError::UnsupportedContentType {
                    content_type,
                    url: final_url.to_string(),
                });
            }

            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response.text().await?;

            return Ok(Response {
                url: final_url,
                status: status.as_u16(),
                headers,
                cookies: received,
                body,
            });
        }

        Err(BrowserError::TooManyRedirects(hop.url.to_string()))
    }
}

/// Per-hop state of a redirect chain.
struct Hop {
    method: Method,
    url: url::Url,
    form: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Empty content types are accepted, as browsers sniff those.
fn is_markup(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.is_empty()
        || essence.starts_with("text/")
        || essence == "application/xhtml+xml"
        || essence.ends_with("+xml")
        || essence == "application/xml"
}
