//! Bracket and HTML rendering of combined highlight elements

use super::element::HighlightElement;
use crate::log_debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Notation {
    /// `{N:` ... `}` with `{`, `}` and `\` backslash-escaped in text
    #[default]
    Brackets,
    /// `<mark class="class-N level-L">` ... `</mark>` with entity-escaped text
    Html,
}

fn escape_brackets(text: &str, out: &mut String) {
    for c in text.chars() {
        if matches!(c, '{' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// Render elements; spans still open at the end are closed so the output stays well-formed
pub fn render(elements: &[HighlightElement], notation: Notation) -> String {
    let mut out = String::new();
    let mut depth = 0usize;

    for element in elements {
        match (element, notation) {
            (HighlightElement::Text(text), Notation::Brackets) => escape_brackets(text, &mut out),
            (HighlightElement::Text(text), Notation::Html) => escape_html(text, &mut out),
            (HighlightElement::Open(number), Notation::Brackets) => {
                out.push_str(&format!("{{{}:", number));
                depth += 1;
            }
            (HighlightElement::Open(number), Notation::Html) => {
                out.push_str(&format!(
                    "<mark class=\"class-{} level-{}\">",
                    number, depth
                ));
                depth += 1;
            }
            (HighlightElement::Close { .. }, _) if depth == 0 => {}
            (HighlightElement::Close { .. }, notation) => {
                out.push_str(closing(notation));
                depth -= 1;
            }
        }
    }

    if depth > 0 {
        log_debug!("Closing spans left open at end of highlight", "open" => depth);
    }
    for _ in 0..depth {
        out.push_str(closing(notation));
    }

    out
}

fn closing(notation: Notation) -> &'static str {
    match notation {
        Notation::Brackets => "}",
        Notation::Html => "</mark>",
    }
}
