//! Plain text to e-mail friendly HTML.

use askama::{Html, MarkupDisplay, Template};

use super::MailError;

const PARAGRAPH_OPEN: &str = "<p style=\"margin:0 0 12px 0;\">";
const EMPTY_PARAGRAPH: &str = "<p></p>";

/// Renders user text as paragraphs.
///
/// Blank lines separate paragraphs, single newlines become `<br>`. All text is
/// escaped. The result is never empty so the surrounding layout stays valid.
pub fn to_html_paragraphs(text: &str) -> String {
    let normalized = normalize_newlines(text);

    let html: String = normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| MarkupDisplay::new_unsafe(p, Html).to_string())
        .map(|p| format!("{PARAGRAPH_OPEN}{}</p>", p.replace('\n', "<br>")))
        .collect();

    if html.is_empty() {
        EMPTY_PARAGRAPH.to_string()
    } else {
        html
    }
}

pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[derive(Template)]
#[template(path = "message.html")]
struct MessageDocument<'a> {
    title: &'a str,
    preheader: &'a str,
    main_html: &'a str,
}

/// Wraps rendered content in the table based layout mail clients expect.
///
/// `title` and `preheader` are escaped, `main_html` is inserted verbatim.
pub fn render_document(title: &str, main_html: &str, preheader: &str) -> Result<String, MailError> {
    MessageDocument {
        title,
        preheader,
        main_html,
    }
    .render()
    .map_err(|e| MailError::Build(e.to_string()))
}
