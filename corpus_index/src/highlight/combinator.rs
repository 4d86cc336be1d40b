//! Rebalancing of overlapping highlight spans into a nested sequence

use super::element::HighlightElement;
use super::render::{render, Notation};
use crate::config::compile_time::highlight::MAX_BALANCE_DEPTH;
use crate::config::HighlightPreferences;
use crate::logging::codes;
use crate::{log_success, log_warning};
use std::collections::HashMap;

/// Turns open/close/text events into a properly nested element list.
///
/// When a class is closed while other classes opened after it are still
/// open, those classes are force-closed first and reopened after the close,
/// so an overlapping span ends up split into nested fragments. Spans that
/// would enclose nothing are dropped instead of emitted as empty pairs.
#[derive(Debug, Clone)]
pub struct HighlightCombinator {
    combine: Vec<HighlightElement>,
    balance_stack: Vec<u32>,
    reopen: Vec<u32>,
    /// Opens dropped at the depth limit, per class; their closes are swallowed
    ignored_opens: HashMap<u32, usize>,
    imbalance_count: usize,
    log_imbalance: bool,
}

impl HighlightCombinator {
    pub fn new() -> Self {
        Self {
            combine: Vec::new(),
            balance_stack: Vec::new(),
            reopen: Vec::new(),
            ignored_opens: HashMap::new(),
            imbalance_count: 0,
            log_imbalance: true,
        }
    }

    pub fn with_preferences(preferences: &HighlightPreferences) -> Self {
        Self {
            log_imbalance: preferences.log_imbalance,
            ..Self::new()
        }
    }

    /// Append literal text; empty text is ignored
    pub fn add_string(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.combine.push(HighlightElement::Text(text));
        }
        self
    }

    pub fn add_open(&mut self, class: u32) -> &mut Self {
        if self.balance_stack.len() >= MAX_BALANCE_DEPTH {
            self.imbalance_count += 1;
            *self.ignored_opens.entry(class).or_insert(0) += 1;
            if self.log_imbalance {
                log_warning!(codes::highlight::BALANCE_DEPTH_EXCEEDED, "Highlight open ignored",
                    "class" => class,
                    "depth" => self.balance_stack.len()
                );
            }
            return self;
        }
        self.combine.push(HighlightElement::Open(class));
        self.balance_stack.push(class);
        self
    }

    /// Close the innermost open span of `class`.
    ///
    /// Closing a class that is not open is a counted, logged no-op. The
    /// close of an open dropped at the depth limit is consumed silently.
    pub fn add_close(&mut self, class: u32) -> &mut Self {
        if let Some(ignored) = self.ignored_opens.get_mut(&class) {
            *ignored -= 1;
            if *ignored == 0 {
                self.ignored_opens.remove(&class);
            }
            return self;
        }

        if !self.balance_stack.contains(&class) {
            self.imbalance_count += 1;
            if self.log_imbalance {
                log_warning!(codes::highlight::UNMATCHED_CLOSE, "Close without open highlight",
                    "class" => class,
                    "open" => format!("{:?}", self.balance_stack)
                );
            }
            return self;
        }

        self.reopen.clear();

        while let Some(current) = self.balance_stack.pop() {
            if current == class {
                break;
            }
            self.close_or_collapse(current, false);
            self.reopen.push(current);
        }

        self.close_or_collapse(class, true);

        for index in 0..self.reopen.len() {
            let current = self.reopen[index];
            self.combine.push(HighlightElement::Open(current));
            self.balance_stack.push(current);
        }

        self
    }

    /// Drop a trailing empty `Open(class)` or append the matching close
    fn close_or_collapse(&mut self, class: u32, terminal: bool) {
        if self.combine.last().is_some_and(|last| last.is_open(class)) {
            self.combine.pop();
        } else {
            self.combine.push(HighlightElement::Close {
                number: class,
                terminal,
            });
        }
    }

    /// Close every span still open, innermost first
    pub fn close_all(&mut self) -> &mut Self {
        self.ignored_opens.clear();
        while let Some(&class) = self.balance_stack.last() {
            self.add_close(class);
        }
        log_success!(codes::success::HIGHLIGHT_COMBINED, "Highlight spans combined",
            "elements" => self.combine.len(),
            "imbalances" => self.imbalance_count
        );
        self
    }

    pub fn elements(&self) -> &[HighlightElement] {
        &self.combine
    }

    pub fn into_elements(self) -> Vec<HighlightElement> {
        self.combine
    }

    /// Open classes, innermost last
    pub fn balance_stack(&self) -> &[u32] {
        &self.balance_stack
    }

    pub fn is_balanced(&self) -> bool {
        self.balance_stack.is_empty()
    }

    /// Number of closes and opens that had to be ignored
    pub fn imbalance_count(&self) -> usize {
        self.imbalance_count
    }

    pub fn render(&self, notation: Notation) -> String {
        render(&self.combine, notation)
    }
}

impl Default for HighlightCombinator {
    fn default() -> Self {
        Self::new()
    }
}
