use crate::browser::BrowserSession;
use crate::core::Transport;
use crate::dom::resolver::single;
use crate::dom::Document;
use crate::errors::Result;
use crate::utils::is_valid_email;
use ego_tree::NodeId;
use tracing::{debug, info, warn};

impl<T: Transport> BrowserSession<T> {
    /// Log in by trying each form that looks like a login form, in document
    /// order, until `validator` accepts the resulting page.
    ///
    /// A form qualifies when it has one username field (an email input if
    /// `username` is an email address, otherwise a text input) and one
    /// password input. After a rejected attempt the page is restored to
    /// what it was before that submission; cookies and referrer picked up
    /// by the attempt are kept.
    pub async fn login<F>(
        &mut self,
        username: &str,
        password: &str,
        mut validator: F,
    ) -> Result<bool>
    where
        F: FnMut(&Self) -> bool,
    {
        self.limiter.await_turn().await;

        let prefer_email = is_valid_email(username);
        let forms = self.page.document.forms();

        for (attempt, form) in forms.into_iter().enumerate() {
            let Some((user_field, password_field)) =
                credential_fields(&self.page.document, form, prefer_email)
            else {
                debug!(attempt, "not a login form");
                continue;
            };

            self.page.document.set_value(user_field, username);
            self.page.document.set_value(password_field, password);
            let snapshot = self.page.clone();

            self.submit_form(form, None).await?;

            if validator(&*self) {
                info!(attempt, url = %self.url(), "login accepted");
                return Ok(true);
            }

            // Cookies and referrer from the rejected attempt stay in place.
            warn!(
                attempt,
                rejected_url = %self.url(),
                "login rejected, restoring previous page"
            );
            self.page = snapshot;
        }

        Ok(false)
    }
}

fn credential_fields(
    document: &Document,
    form: NodeId,
    prefer_email: bool,
) -> Option<(NodeId, NodeId)> {
    let inputs: Vec<NodeId> = document
        .descendants(form)
        .filter(|&node| document.tag(node) == Some("input"))
        .collect();
    let of_type = |kind: &str| {
        single(
            inputs
                .iter()
                .copied()
                .filter(|&node| input_type(document, node) == kind),
        )
    };

    let username = prefer_email
        .then(|| of_type("email"))
        .flatten()
        .or_else(|| of_type("text"))?;
    let password = of_type("password")?;
    Some((username, password))
}

/// A missing `type` means `text`.
fn input_type(document: &Document, node: NodeId) -> String {
    document
        .attr(node, "type")
        .map(|kind| kind.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "text".to_string())
}
