//! Login page.

use axum::{extract::Query, response::Html};
use serde::Deserialize;

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

/// Login page. The client-side identity SDK signs the user in, the session
/// bridge creates the cookie, and the page then navigates to `next`.
pub async fn login_page(Query(query): Query<LoginQuery>) -> Html<String> {
    let next = return_target(query.next.as_deref());
    super::shell(
        "Log in",
        &format!(
            "<main class=\"login-page\" data-next=\"{}\"><h1>Log in to hearthside</h1>\
             <div id=\"sign-in\"></div></main>",
            urlencoding::encode(next)
        ),
    )
}

/// Returns `next` if it is a path on this origin, otherwise the root.
pub fn return_target(next: Option<&str>) -> &str {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next.starts_with("//")
                && !next.contains('\\')
                && !next.chars().any(char::is_control) =>
        {
            next
        }
        _ => "/",
    }
}
