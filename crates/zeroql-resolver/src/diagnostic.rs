use crate::syntax::{Expr, Location, NodeId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DiagnosticKind {
    /// A construct the translation does not support.
    Untranslatable,
    /// A selector that returns its root unchanged.
    OpenSelector,
    /// An outer root used inside a nested selection.
    OutOfScope,
    /// An argument drawn from instance or static state.
    NonStatic,
    /// A member or call without field-selector or fragment metadata.
    MissingFieldSelector,
    /// A fragment with neither a declaration nor a template in scope.
    FragmentUnavailable,
    Cancelled,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::Untranslatable => "ZQ0001",
            DiagnosticKind::OpenSelector => "ZQ0002",
            DiagnosticKind::OutOfScope => "ZQ0003",
            DiagnosticKind::NonStatic => "ZQ0004",
            DiagnosticKind::MissingFieldSelector => "ZQ0005",
            DiagnosticKind::FragmentUnavailable => "ZQ0006",
            DiagnosticKind::Cancelled => "ZQ0007",
        }
    }
}

/// The first problem found while resolving a selection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip)]
    pub node: Option<NodeId>,
    pub location: Location,
    pub text: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, node: &Expr) -> Self {
        let message = match kind {
            DiagnosticKind::Untranslatable => {
                format!("Failed to convert to graphql query: {}", node.text)
            }
            DiagnosticKind::OpenSelector => "Open selectors like `|o| o` are not allowed. \
                 Select fields explicitly, for example `|o| (o.id, o.name.clone())`"
                .to_string(),
            DiagnosticKind::OutOfScope => format!(
                "`{}` is out of scope and can't be used in the child selection",
                node.text
            ),
            DiagnosticKind::NonStatic => format!(
                "`{}` is not a local variable or a variables-object property. \
                 Copy it into a local before passing it as an argument",
                node.text
            ),
            DiagnosticKind::MissingFieldSelector => format!(
                "Only field selectors and fragments are allowed: `{}`",
                node.text
            ),
            DiagnosticKind::FragmentUnavailable => format!(
                "Fragment `{}` has neither a declaration nor a precompiled template in scope",
                node.text
            ),
            DiagnosticKind::Cancelled => "Resolution was cancelled".to_string(),
        };
        Self {
            kind,
            node: Some(node.id),
            location: node.location,
            text: node.text.clone(),
            message,
        }
    }

    /// A helper or fragment reached again while it is being expanded.
    pub fn recursive(name: &str, call: &Expr) -> Self {
        Self {
            message: format!(
                "`{name}` selects from itself through `{}`; recursive selections can't be converted to a graphql query",
                call.text
            ),
            ..Self::new(DiagnosticKind::Untranslatable, call)
        }
    }

    /// A resolution that stopped without producing a result.
    pub fn unfinished(selection: &Expr) -> Self {
        Self {
            message: "Resolution of this selection did not complete".to_string(),
            ..Self::new(DiagnosticKind::Untranslatable, selection)
        }
    }

    pub fn cancelled(node: &Expr) -> Self {
        Self::new(DiagnosticKind::Cancelled, node)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == DiagnosticKind::Cancelled
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.location, self.kind.code(), self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_expr;

    #[test]
    fn display_includes_location_and_code() {
        let node = parse_expr("o.name").unwrap();
        let diagnostic = Diagnostic::new(DiagnosticKind::MissingFieldSelector, &node);
        let rendered = diagnostic.to_string();
        assert!(rendered.starts_with("1:1 [ZQ0005]"));
        assert!(rendered.contains("`o.name`"));
    }
}
