//! Synthetic bundle written in place of a failed build.
//!
//! Loading the artifact in a browser replaces the document body with the
//! diagnostic and logs it to the console, so a broken edit is visible without
//! leaving the page.

use std::path::Path;

const PRE_STYLE: &str = "width: 100%; margin: 20px; padding: 20px; font-size: 12px; \
background-color: white; color: #121212; border: 1px solid #d9534f; border-radius: 1px;";

/// Make `message` safe to embed in a JS template literal.
///
/// ANSI styling is stripped, backslashes, backticks and `${` are escaped, and
/// every occurrence of `cwd` is shortened to `.`.
pub fn escape_message(message: &str, cwd: &Path) -> String {
    let plain = console::strip_ansi_codes(message);

    let mut escaped = plain
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${");

    let cwd = cwd.to_string_lossy();
    if !cwd.is_empty() {
        // The cwd is matched after escaping so Windows separators line up.
        let cwd_escaped = cwd.replace('\\', "\\\\");
        escaped = escaped.replace(cwd_escaped.as_str(), ".");
    }

    escaped
}

/// Render the artifact source for an already-escaped message.
pub fn render(escaped: &str) -> String {
    let html = html_escape(escaped);
    format!(
        "\ndocument.body.innerHTML = `<pre style=\"{PRE_STYLE}\"><code>{html}</code></pre>`;\n\
         console.log(`{escaped}`);\n"
    )
}

/// Escape and render in one step.
pub fn error_artifact(message: &str, cwd: &Path) -> String {
    render(&escape_message(message, cwd))
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
