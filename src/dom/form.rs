use crate::dom::Document;
use crate::errors::Result;
use crate::types::{Method, Request};
use ego_tree::NodeId;
use url::Url;

/// A form turned into the data a browser would send for it.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub method: Method,
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    /// Materialize `form` as it currently stands in `document`.
    ///
    /// `submitter` is the button or submit input that triggered the
    /// submission; it is the only submit control whose name/value is sent.
    pub fn from_form(
        document: &Document,
        form: NodeId,
        submitter: Option<NodeId>,
    ) -> Result<Self> {
        let method = match document.attr(form, "method") {
            Some(method) if method.trim().eq_ignore_ascii_case("post") => Method::Post,
            _ => Method::Get,
        };
        let action = match document.attr(form, "action").map(str::trim) {
            Some(action) if !action.is_empty() => document.resolve_url(action)?,
            _ => document.location().clone(),
        };

        let mut fields = Vec::new();
        for node in document.descendants(form) {
            collect_control(document, node, submitter, &mut fields);
        }

        Ok(Self {
            method,
            action,
            fields,
        })
    }

    pub fn into_request(self) -> Request {
        Request::get(self.action).with_form(self.method, self.fields)
    }
}

fn collect_control(
    document: &Document,
    node: NodeId,
    submitter: Option<NodeId>,
    fields: &mut Vec<(String, String)>,
) {
    let Some(tag) = document.tag(node) else {
        return;
    };
    if !matches!(tag, "input" | "select" | "textarea" | "button") {
        return;
    }
    if document.has_attr(node, "disabled") {
        return;
    }
    let name = match document.attr(node, "name") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return,
    };
    let kind = document
        .attr(node, "type")
        .unwrap_or_default()
        .to_ascii_lowercase();

    match tag {
        "button" => {
            if submitter == Some(node) {
                fields.push((name, document.value(node)));
            }
        }
        "select" => {
            let options: Vec<NodeId> = document
                .descendants(node)
                .filter(|&n| document.tag(n) == Some("option"))
                .collect();
            let mut selected = options
                .iter()
                .copied()
                .filter(|&n| document.has_attr(n, "selected"))
                .peekable();
            if selected.peek().is_some() {
                for option in selected {
                    fields.push((name.clone(), document.value(option)));
                }
            } else if let Some(&first) = options.first() {
                fields.push((name, document.value(first)));
            }
        }
        "textarea" => fields.push((name, document.value(node))),
        _ => match kind.as_str() {
            "submit" => {
                if submitter == Some(node) {
                    fields.push((name, document.value(node)));
                }
            }
            "image" | "button" | "reset" => {}
            "checkbox" | "radio" => {
                if document.has_attr(node, "checked") {
                    let value = document.value(node);
                    let value = if value.is_empty() { "on".to_string() } else { value };
                    fields.push((name, value));
                }
            }
            _ => fields.push((name, document.value(node))),
        },
    }
}
