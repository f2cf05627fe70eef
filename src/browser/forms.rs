use crate::browser::BrowserSession;
use crate::core::Transport;
use crate::dom::{field_candidates, Document, Resolver};
use crate::errors::Result;
use ego_tree::NodeId;
use tracing::debug;

/// A form and the field each binding resolved to.
#[derive(Debug)]
struct FormPlan {
    form: NodeId,
    fields: Vec<(NodeId, String)>,
}

impl<T: Transport> BrowserSession<T> {
    /// Fill and submit the first form that has a distinct field for every
    /// `(name, value)` binding.
    ///
    /// Fields are looked up by id, `name`, text, then as a selector inside
    /// the form; each lookup must be unambiguous. Nothing is written to a
    /// form unless all bindings resolve in it. Returns `Ok(false)` when no
    /// form fits.
    pub async fn execute_form(&mut self, bindings: &[(&str, &str)]) -> Result<bool> {
        self.limiter.await_turn().await;

        let Some(plan) = plan_form(&self.page.document, bindings) else {
            debug!(bindings = bindings.len(), "no form accepts all bindings");
            return Ok(false);
        };
        for (node, value) in &plan.fields {
            self.page.document.set_value(*node, value);
        }
        self.submit_form(plan.form, None).await?;
        Ok(true)
    }
}

fn plan_form(document: &Document, bindings: &[(&str, &str)]) -> Option<FormPlan> {
    let resolver = Resolver::new(document);

    'forms: for form in document.forms() {
        let candidates = field_candidates(document, form);
        if candidates.len() < bindings.len() {
            debug!(
                form = %document.describe(form),
                candidates = candidates.len(),
                "too few fields"
            );
            continue;
        }

        let mut fields = Vec::with_capacity(bindings.len());
        for &(name, value) in bindings {
            match resolver.resolve_field(form, &candidates, name) {
                Some(found) => fields.push((found.node, value.to_string())),
                None => {
                    debug!(form = %document.describe(form), field = name, "field not found");
                    continue 'forms;
                }
            }
        }
        return Some(FormPlan { form, fields });
    }
    None
}
