//! Placeholder pages for the application.
//!
//! Rendering is deliberately minimal. Privileged pages only ever run after
//! the authorization gate has allowed the request.

pub mod admin;
pub mod dashboard;
pub mod home;
pub mod login;

pub use admin::admin_page;
pub use dashboard::resident_dashboard;
pub use home::home_page;
pub use login::login_page;

use axum::response::Html;

/// Wraps page content in the shared document shell.
fn shell(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"/>\
         <title>{} | hearthside</title></head>\n<body>{body}</body>\n</html>\n",
        escape(title)
    ))
}

/// Escapes text for inclusion in HTML.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }
}
