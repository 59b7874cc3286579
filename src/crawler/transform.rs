//! Transform capability: rendered HTML to normalized text
//!
//! The normalized text is both what gets saved and what gets hashed, so two
//! renders of the same content must produce byte-identical output.

use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};

/// Pure HTML to text conversion
pub trait Transform: Send + Sync {
    fn to_normalized_text(&self, html: &str) -> String;
}

impl<F> Transform for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn to_normalized_text(&self, html: &str) -> String {
        self(html)
    }
}

/// Hex-encoded SHA-256 of normalized text
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Markdown-flavoured text extraction
///
/// Takes the first of `main`, `article` or `body` as the content root and
/// drops page chrome (`script`, `style`, `nav`, `header`, `footer` and
/// similar). Headings become `#` lines, list items `- ` lines, and `pre`
/// blocks fenced code.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextTransform;

const SKIPPED: &[&str] = &[
    "script", "style", "nav", "header", "footer", "noscript", "template", "svg", "iframe", "form",
    "button",
];

const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "main", "aside", "table", "tr", "blockquote", "dl", "dt",
    "dd", "ul", "ol", "figure", "figcaption", "hr",
];

const FENCE: &str = "```";

impl Transform for TextTransform {
    fn to_normalized_text(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let root = ["main", "article", "body"].iter().find_map(|name| {
            Selector::parse(name)
                .ok()
                .and_then(|selector| document.select(&selector).next())
        });

        let mut out = String::new();
        match root {
            Some(root) => walk(root, &mut out),
            None => walk(document.root_element(), &mut out),
        }

        tidy(&out)
    }
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            push_inline(out, text);
        } else if let Some(child) = ElementRef::wrap(child) {
            render_element(child, out);
        }
    }
}

fn render_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();

    if SKIPPED.contains(&name) {
        return;
    }

    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = collapse(&element.text().collect::<String>());
            if !text.is_empty() {
                out.push_str("\n\n");
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        "pre" => {
            let code: String = element.text().collect();
            out.push_str("\n\n");
            out.push_str(FENCE);
            out.push('\n');
            out.push_str(code.trim_end_matches('\n'));
            out.push('\n');
            out.push_str(FENCE);
            out.push_str("\n\n");
        }
        "li" => {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("- ");
            walk(element, out);
            out.push('\n');
        }
        "br" => out.push('\n'),
        "code" => {
            let text = collapse(&element.text().collect::<String>());
            if !text.is_empty() {
                push_inline(out, &format!("`{}`", text));
            }
        }
        name if BLOCKS.contains(&name) => {
            out.push_str("\n\n");
            walk(element, out);
            out.push_str("\n\n");
        }
        _ => walk(element, out),
    }
}

/// Appends inline text, collapsing whitespace runs to one space
fn push_inline(out: &mut String, text: &str) {
    let starts_with_space = text.starts_with(char::is_whitespace);
    let ends_with_space = text.ends_with(char::is_whitespace);
    let collapsed = collapse(text);

    if collapsed.is_empty() {
        if starts_with_space && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        return;
    }

    if starts_with_space && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&collapsed);
    if ends_with_space {
        out.push(' ');
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trims lines and squeezes blank runs, leaving fenced code untouched
fn tidy(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in raw.lines() {
        if in_fence {
            let line = line.trim_end();
            if line == FENCE {
                in_fence = false;
            }
            lines.push(line.to_string());
            continue;
        }

        let line = line.trim();
        if line == FENCE {
            in_fence = true;
        }
        if line.is_empty() && lines.last().map(|l| l.is_empty()).unwrap_or(true) {
            continue;
        }
        lines.push(line.to_string());
    }

    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}
