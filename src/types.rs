use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A fully described HTTP exchange, ready to hand to a [`crate::core::Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// Urlencoded body pairs. Always empty for GET.
    pub form: Vec<(String, String)>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub cookies: Vec<(String, String)>,
    pub follow_redirects: bool,
    pub ignore_http_errors: bool,
    pub ignore_content_type: bool,
    /// `None` means the transport must not time out on its own.
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            form: Vec::new(),
            user_agent: None,
            referrer: None,
            cookies: Vec::new(),
            follow_redirects: true,
            ignore_http_errors: false,
            ignore_content_type: false,
            timeout: None,
        }
    }

    /// GET folds the pairs into the query string, POST keeps them as the body.
    pub fn with_form(mut self, method: Method, pairs: Vec<(String, String)>) -> Self {
        self.method = method;
        match method {
            Method::Get => {
                if !pairs.is_empty() {
                    self.url.query_pairs_mut().extend_pairs(pairs.iter());
                }
                self.form.clear();
            }
            Method::Post => self.form = pairs,
        }
        self
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Cookies set anywhere along the redirect chain, in arrival order.
    pub cookies: Vec<(String, String)>,
    pub body: String,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Replace the value of an existing `name`, or append the pair.
pub(crate) fn upsert_pair(pairs: &mut Vec<(String, String)>, (name, value): (String, String)) {
    match pairs.iter_mut().find(|(existing, _)| *existing == name) {
        Some(slot) => slot.1 = value,
        None => pairs.push((name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_overwrites_in_place() {
        let mut pairs = vec![("a".to_string(), "1".to_string())];
        upsert_pair(&mut pairs, ("a".to_string(), "2".to_string()));
        upsert_pair(&mut pairs, ("b".to_string(), "3".to_string()));
        assert_eq!(
            pairs,
            vec![("a".to_string(), "2".to_string()), ("b".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn get_form_lands_in_query() {
        let url = Url::parse("http://localhost/search?lang=en").unwrap();
        let request = Request::get(url).with_form(
            Method::Get,
            vec![("q".to_string(), "rust lang".to_string())],
        );
        assert_eq!(request.url.as_str(), "http://localhost/search?lang=en&q=rust+lang");
        assert!(request.form.is_empty());
    }

    #[test]
    fn post_form_stays_in_body() {
        let url = Url::parse("http://localhost/x").unwrap();
        let request = Request::get(url).with_form(
            Method::Post,
            vec![("q".to_string(), "v".to_string())],
        );
        assert_eq!(request.url.query(), None);
        assert_eq!(request.form_value("q"), Some("v"));
    }
}
