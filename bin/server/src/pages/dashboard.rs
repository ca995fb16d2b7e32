//! Resident dashboard.

use crate::auth::CurrentPrincipal;
use axum::response::Html;

/// Privileged page for any signed-in resident.
pub async fn resident_dashboard(CurrentPrincipal(principal): CurrentPrincipal) -> Html<String> {
    let greeting = principal.email().unwrap_or(principal.uid().as_str());
    super::shell(
        "Resident dashboard",
        &format!(
            "<main class=\"dashboard-page\"><h1>Welcome back, {}</h1></main>",
            super::escape(greeting)
        ),
    )
}
