use std::fmt;

/// One unit of combinator output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightElement {
    Text(String),
    Open(u32),
    /// `terminal` is false for a close forced by an overlapping span; the
    /// class is reopened right after
    Close { number: u32, terminal: bool },
}

impl HighlightElement {
    pub fn is_open(&self, class: u32) -> bool {
        matches!(self, HighlightElement::Open(number) if *number == class)
    }

    pub fn class_number(&self) -> Option<u32> {
        match self {
            HighlightElement::Open(number) | HighlightElement::Close { number, .. } => {
                Some(*number)
            }
            HighlightElement::Text(_) => None,
        }
    }
}

impl fmt::Display for HighlightElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightElement::Text(text) => write!(f, "Text({})", text),
            HighlightElement::Open(number) => write!(f, "Open({})", number),
            HighlightElement::Close { number, .. } => write!(f, "Close({})", number),
        }
    }
}
