//! Home page.

use axum::response::Html;

/// Public landing page.
pub async fn home_page() -> Html<String> {
    super::shell(
        "Home",
        "<main class=\"home-page\"><h1>Welcome to hearthside</h1>\
         <p><a href=\"/dashboard/resident\">Resident dashboard</a></p></main>",
    )
}
