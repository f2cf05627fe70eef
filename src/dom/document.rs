use crate::errors::{BrowserError, Result};
use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashMap};
use url::Url;

/// Edits applied on top of the parsed tree.
///
/// `None` in `attrs` marks an attribute as removed.
#[derive(Debug, Clone, Default)]
struct Patch {
    attrs: BTreeMap<String, Option<String>>,
    text: Option<String>,
}

/// A parsed page that can be queried and edited in place.
///
/// Node handles are [`NodeId`]s; they stay valid for the lifetime of the
/// document and of every clone taken from it.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    location: Url,
    base: Url,
    patches: HashMap<NodeId, Patch>,
}

impl Document {
    pub fn parse(body: &str, location: Url) -> Self {
        let html = Html::parse_document(body);
        let base = base_href(&html)
            .and_then(|href| location.join(href).ok())
            .unwrap_or_else(|| location.clone());

        Self {
            html,
            location,
            base,
            patches: HashMap::new(),
        }
    }

    /// The URL this document was loaded from.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// The URL relative references resolve against (`<base href>` aware).
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn resolve_url(&self, reference: &str) -> Result<Url> {
        self.base
            .join(reference.trim())
            .map_err(|e| BrowserError::invalid_url(reference, e))
    }

    fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(node).and_then(ElementRef::wrap)
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(|element| element.id())
    }

    /// Element descendants of `node`, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.html
            .tree
            .get(node)
            .into_iter()
            .flat_map(|node| node.descendants().skip(1))
            .filter_map(ElementRef::wrap)
            .map(|element| element.id())
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.value().name())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        if let Some(edit) = self.patches.get(&node).and_then(|p| p.attrs.get(name)) {
            return edit.as_deref();
        }
        self.element(node)?.value().attr(name)
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        self.patches
            .entry(node)
            .or_default()
            .attrs
            .insert(name.to_string(), Some(value.into()));
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        self.patches
            .entry(node)
            .or_default()
            .attrs
            .insert(name.to_string(), None);
    }

    /// Adds the attribute when absent, removes it when present.
    /// Returns whether it is present afterwards.
    pub fn toggle_attr(&mut self, node: NodeId, name: &str) -> bool {
        if self.has_attr(node, name) {
            self.remove_attr(node, name);
            false
        } else {
            self.set_attr(node, name, name);
            true
        }
    }

    fn raw_own_text(&self, node: NodeId) -> String {
        if let Some(text) = self.patches.get(&node).and_then(|p| p.text.as_ref()) {
            return text.clone();
        }
        match self.html.tree.get(node) {
            Some(node) => node
                .children()
                .filter_map(|child| child.value().as_text())
                .map(|text| &**text)
                .collect(),
            None => String::new(),
        }
    }

    /// Text of the direct text children, whitespace-normalized.
    pub fn own_text(&self, node: NodeId) -> String {
        normalize_whitespace(&self.raw_own_text(node))
    }

    /// Text of the whole subtree, whitespace-normalized.
    pub fn text(&self, node: NodeId) -> String {
        self.element(node)
            .map(|element| normalize_whitespace(&element.text().collect::<String>()))
            .unwrap_or_default()
    }

    /// Replaces the element's own text (used for `textarea` values).
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        self.patches.entry(node).or_default().text = Some(text.into());
    }

    /// The control value a form submission would carry for this element.
    pub fn value(&self, node: NodeId) -> String {
        match self.tag(node) {
            Some("textarea") => match self.patches.get(&node).and_then(|p| p.text.as_ref()) {
                Some(text) => text.clone(),
                None => self.own_text(node),
            },
            Some("option") => self
                .attr(node, "value")
                .map(str::to_string)
                .unwrap_or_else(|| self.own_text(node)),
            _ => self.attr(node, "value").unwrap_or_default().to_string(),
        }
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        let tag = self.tag(node).map(str::to_string);
        match tag.as_deref() {
            Some("textarea") => self.set_text(node, value),
            Some("select") => {
                let options: Vec<NodeId> = self
                    .descendants(node)
                    .filter(|&n| self.tag(n) == Some("option"))
                    .collect();
                for option in options {
                    if self.value(option) == value {
                        self.set_attr(option, "selected", "selected");
                    } else {
                        self.remove_attr(option, "selected");
                    }
                }
            }
            _ => self.set_attr(node, "value", value),
        }
    }

    /// First element whose `id` equals `id`.
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.elements().find(|&n| self.attr(n, "id") == Some(id))
    }

    /// First element whose attribute `name` equals `value`.
    pub fn by_attr_value(&self, name: &str, value: &str) -> Option<NodeId> {
        self.elements().find(|&n| self.attr(n, name) == Some(value))
    }

    /// Elements whose own text contains `needle`, ignoring case.
    pub fn containing_own_text(&self, needle: &str) -> Vec<NodeId> {
        let needle = needle.to_lowercase();
        self.elements()
            .filter(|&n| self.own_text(n).to_lowercase().contains(&needle))
            .collect()
    }

    /// Elements whose own text matches `pattern`.
    pub fn matching_own_text(&self, pattern: &Regex) -> Vec<NodeId> {
        self.elements()
            .filter(|&n| pattern.is_match(&self.own_text(n)))
            .collect()
    }

    /// Whether any element's text contains `needle`, ignoring case.
    pub fn contains_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.elements()
            .any(|n| self.text(n).to_lowercase().contains(&needle))
    }

    /// Elements matching `query` as a CSS selector. An unparsable query
    /// matches nothing.
    pub fn select(&self, query: &str) -> Vec<NodeId> {
        match parse_selector(query) {
            Some(selector) => self.html.select(&selector).map(|e| e.id()).collect(),
            None => Vec::new(),
        }
    }

    /// Like [`Document::select`], restricted to descendants of `scope`.
    pub fn select_within(&self, scope: NodeId, query: &str) -> Vec<NodeId> {
        match (parse_selector(query), self.element(scope)) {
            (Some(selector), Some(scope)) => scope.select(&selector).map(|e| e.id()).collect(),
            _ => Vec::new(),
        }
    }

    /// The parent, if it is an element.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.html
            .tree
            .get(node)?
            .parent()
            .and_then(ElementRef::wrap)
            .map(|element| element.id())
    }

    /// Nearest ancestor (excluding `node`) with the given tag.
    pub fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.html
            .tree
            .get(node)?
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == tag)
            .map(|element| element.id())
    }

    pub fn forms(&self) -> Vec<NodeId> {
        self.elements()
            .filter(|&n| self.tag(n) == Some("form"))
            .collect()
    }

    /// Short human-readable label for logs, e.g. `input#email[name=user]`.
    pub fn describe(&self, node: NodeId) -> String {
        let mut label = self.tag(node).unwrap_or("#node").to_string();
        if let Some(id) = self.attr(node, "id") {
            label.push('#');
            label.push_str(id);
        }
        if let Some(name) = self.attr(node, "name") {
            label.push_str(&format!("[name={}]", name));
        }
        label
    }
}

fn parse_selector(query: &str) -> Option<Selector> {
    match Selector::parse(query) {
        Ok(selector) => Some(selector),
        Err(err) => {
            tracing::trace!(query, error = ?err, "not a selector");
            None
        }
    }
}

fn base_href(html: &Html) -> Option<&str> {
    html.tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "base" && element.value().attr("href").is_some())
        .and_then(|element| element.value().attr("href"))
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
