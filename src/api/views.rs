//! Minimal HTML pages, unstyled and script-free.

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{name}</title>
  </head>
  <body>
    <header><span>{name}</span> <small>private link shortener</small></header>
    <main>
{body}
    </main>
  </body>
</html>
"#,
        name = env!("CARGO_PKG_NAME"),
    )
}

#[must_use]
pub fn login() -> String {
    layout(r#"      <a href="/oauth2" class="button">Login</a>"#)
}

#[must_use]
pub fn dashboard(email: &str, base_url: &str) -> String {
    layout(&format!(
        r#"      <p class="whoami">{email}</p>
      <form method="post" action="/create" id="create-form">
        <span>{base}/</span>
        <input type="text" id="name" name="name" pattern="[a-zA-Z0-9_\-]+" placeholder="optional">
        <input type="url" id="destination" name="destination" required placeholder="Destination URL">
        <button type="submit">Create</button>
      </form>"#,
        email = escape(email),
        base = escape(base_url.trim_end_matches('/')),
    ))
}

#[must_use]
pub fn manage(short_url: &str, clicks: i64) -> String {
    layout(&format!(
        r#"      <input type="text" readonly id="url-input" value="{short_url}">
      <p><span id="click-count">{clicks}</span> clicks</p>"#,
        short_url = escape(short_url),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_metacharacters() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn login_links_to_oauth() {
        assert!(login().contains(r#"href="/oauth2""#));
    }

    #[test]
    fn dashboard_posts_to_create() {
        let page = dashboard("<ada>@example.org", "https://lnk.example.org/");
        assert!(page.contains(r#"action="/create""#));
        assert!(page.contains("https://lnk.example.org/</span>"));
        assert!(page.contains("&lt;ada&gt;@example.org"));
    }

    #[test]
    fn manage_shows_short_url_and_clicks() {
        let page = manage("https://lnk.example.org/abc", 7);
        assert!(page.contains(r#"value="https://lnk.example.org/abc""#));
        assert!(page.contains(r#"<span id="click-count">7</span>"#));
    }
}
