use crate::dom::Document;
use crate::errors::{BrowserError, Result};
use ego_tree::NodeId;
use url::Url;

/// Tags where the search for something clickable gives up.
const ROOT_TAGS: [&str; 3] = ["html", "head", "body"];

/// Guard against pathological nesting depth.
const MAX_ASCENT: usize = 256;

/// What clicking an element amounts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Submit {
        form: NodeId,
        submitter: Option<NodeId>,
    },
    Navigate(Url),
    /// A marker attribute was flipped in place; no request is needed.
    Toggled {
        node: NodeId,
        attribute: &'static str,
        present: bool,
    },
    Unclickable,
}

/// Interpret a click on `start`, walking up to the nearest clickable
/// ancestor. Checkbox and option toggles are applied to `document` here.
pub fn dispatch(document: &mut Document, start: NodeId) -> Result<Dispatch> {
    let mut current = start;

    for _ in 0..MAX_ASCENT {
        let Some(tag) = document.tag(current).map(str::to_string) else {
            return Ok(Dispatch::Unclickable);
        };
        if ROOT_TAGS.contains(&tag.as_str()) {
            return Ok(Dispatch::Unclickable);
        }
        let kind = document
            .attr(current, "type")
            .map(|kind| kind.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if tag == "button" || (tag == "input" && kind == "submit") {
            let form = document
                .closest(current, "form")
                .ok_or_else(|| BrowserError::OrphanSubmit(document.describe(current)))?;
            return Ok(Dispatch::Submit {
                form,
                submitter: Some(current),
            });
        }
        if tag == "form" {
            return Ok(Dispatch::Submit {
                form: current,
                submitter: None,
            });
        }
        if tag == "input" && kind == "checkbox" {
            let present = document.toggle_attr(current, "checked");
            return Ok(Dispatch::Toggled {
                node: current,
                attribute: "checked",
                present,
            });
        }
        if tag == "option" {
            let present = document.toggle_attr(current, "selected");
            return Ok(Dispatch::Toggled {
                node: current,
                attribute: "selected",
                present,
            });
        }
        if let Some(href) = document.attr(current, "href") {
            return Ok(Dispatch::Navigate(document.resolve_url(href)?));
        }

        match document.parent(current) {
            Some(parent) => current = parent,
            None => return Ok(Dispatch::Unclickable),
        }
    }

    Ok(Dispatch::Unclickable)
}
