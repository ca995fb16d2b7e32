//! Admin page.

use crate::auth::CurrentPrincipal;
use axum::response::Html;

/// Admin-scoped page. The gate has already checked the administrator claim.
pub async fn admin_page(CurrentPrincipal(principal): CurrentPrincipal) -> Html<String> {
    tracing::debug!(uid = %principal.uid(), "rendering admin page");
    super::shell(
        "Administration",
        &format!(
            "<main class=\"admin-page\"><h1>Administration</h1>\
             <p>Signed in as {}</p></main>",
            super::escape(principal.uid().as_str())
        ),
    )
}
