use crate::dom::Document;
use ego_tree::NodeId;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Which lookup produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Id,
    Name,
    Text,
    Selector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub node: NodeId,
    pub strategy: Strategy,
}

impl Resolution {
    fn new(node: NodeId, strategy: Strategy) -> Self {
        Self { node, strategy }
    }
}

/// Turns loosely specified targets into concrete elements of one document.
pub struct Resolver<'a> {
    document: &'a Document,
}

impl<'a> Resolver<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Id, then `name`, then own text, then CSS selector; first hit wins.
    ///
    /// With `exact`, the text step requires the whole own text to equal
    /// `target` instead of containing it.
    pub fn resolve(&self, target: &str, exact: bool) -> Option<Resolution> {
        let doc = self.document;

        let found = doc
            .by_id(target)
            .map(|node| Resolution::new(node, Strategy::Id))
            .or_else(|| {
                doc.by_attr_value("name", target)
                    .map(|node| Resolution::new(node, Strategy::Name))
            })
            .or_else(|| {
                self.text_matches(target, exact)
                    .into_iter()
                    .next()
                    .map(|node| Resolution::new(node, Strategy::Text))
            })
            .or_else(|| {
                doc.select(target)
                    .into_iter()
                    .next()
                    .map(|node| Resolution::new(node, Strategy::Selector))
            });

        match found {
            Some(resolution) => debug!(
                query = target,
                strategy = ?resolution.strategy,
                element = %doc.describe(resolution.node),
                "resolved target"
            ),
            None => debug!(query = target, "target not found"),
        }
        found
    }

    /// Every element whose text matches `target`, in document order. Falls
    /// back to selector matches only when no text matches.
    pub fn resolve_link(&self, target: &str, exact: bool) -> Vec<NodeId> {
        let matches = self.text_matches(target, exact);
        if !matches.is_empty() {
            return matches;
        }
        self.document.select(target)
    }

    fn text_matches(&self, target: &str, exact: bool) -> Vec<NodeId> {
        if !exact {
            return self.document.containing_own_text(target);
        }
        match Regex::new(&format!("^{}$", regex::escape(target))) {
            Ok(pattern) => self.document.matching_own_text(&pattern),
            Err(_) => Vec::new(),
        }
    }

    /// Resolve a form field by `name` among `candidates`, requiring a single
    /// match per strategy: id, `name` attribute, own text, then a selector
    /// scoped to `form`. An ambiguous strategy falls through to the next one.
    pub fn resolve_field(
        &self,
        form: NodeId,
        candidates: &[NodeId],
        name: &str,
    ) -> Option<Resolution> {
        let doc = self.document;
        let among = |predicate: &dyn Fn(NodeId) -> bool| {
            single(candidates.iter().copied().filter(|&node| predicate(node)))
        };

        among(&|node: NodeId| doc.attr(node, "id") == Some(name))
            .map(|node| Resolution::new(node, Strategy::Id))
            .or_else(|| {
                among(&|node: NodeId| doc.attr(node, "name") == Some(name))
                    .map(|node| Resolution::new(node, Strategy::Name))
            })
            .or_else(|| {
                among(&|node: NodeId| doc.own_text(node).contains(name))
                    .map(|node| Resolution::new(node, Strategy::Text))
            })
            .or_else(|| {
                single(doc.select_within(form, name).into_iter())
                    .map(|node| Resolution::new(node, Strategy::Selector))
            })
    }
}

/// Fields a form binding may target: `input` and `textarea` descendants,
/// then any descendant carrying a `role` attribute (custom widgets that
/// mirror into hidden inputs). Each element appears once.
pub fn field_candidates(document: &Document, form: NodeId) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    let passes: [&dyn Fn(NodeId) -> bool; 3] = [
        &|node: NodeId| document.tag(node) == Some("input"),
        &|node: NodeId| document.tag(node) == Some("textarea"),
        &|node: NodeId| document.has_attr(node, "role"),
    ];
    for pass in passes {
        for node in document.descendants(form).filter(|&node| pass(node)) {
            if seen.insert(node) {
                fields.push(node);
            }
        }
    }
    fields
}

/// The only item of `iter`, or `None` when it has zero or several.
pub fn single<T>(mut iter: impl Iterator<Item = T>) -> Option<T> {
    let first = iter.next()?;
    match iter.next() {
        Some(_) => None,
        None => Some(first),
    }
}
