use crate::diagnostic::Diagnostic;
use crate::symbols::SymbolResolver;
use crate::syntax::Expr;
use crate::variable::{GraphQLQueryVariable, VariableSet};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;
use tokio_util::sync::CancellationToken;

/// State threaded through one resolution.
///
/// Contexts are cheap to derive: nested selections rebind the root and
/// fragments replace the predefined map, while the variable accumulator
/// is shared by every context of the same selection.
#[derive(Clone)]
pub struct SelectionContext<'a> {
    /// Identifier that stands for the current selection root.
    pub root: String,
    /// Expression text to already-bound variable.
    pub predefined: Rc<IndexMap<String, GraphQLQueryVariable>>,
    pub variables: &'a RefCell<VariableSet>,
    /// Helpers and fragments being expanded, outermost first.
    pub active: Rc<Vec<String>>,
    pub symbols: &'a dyn SymbolResolver,
    pub cancel: &'a CancellationToken,
}

impl<'a> SelectionContext<'a> {
    pub fn new(
        root: impl Into<String>,
        variables: &'a RefCell<VariableSet>,
        symbols: &'a dyn SymbolResolver,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            root: root.into(),
            predefined: Rc::default(),
            variables,
            active: Rc::default(),
            symbols,
            cancel,
        }
    }

    pub fn with_root(&self, root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            ..self.clone()
        }
    }

    pub fn with_predefined(&self, predefined: IndexMap<String, GraphQLQueryVariable>) -> Self {
        Self {
            predefined: Rc::new(predefined),
            ..self.clone()
        }
    }

    /// Context for expanding the helper or fragment `name`, called at
    /// `call`. Expanding a function from inside itself has no finite query.
    pub fn enter(&self, name: &str, call: &Expr) -> Result<Self, Diagnostic> {
        if self.active.iter().any(|active| active == name) {
            return Err(Diagnostic::recursive(name, call));
        }
        let mut active = Vec::clone(&self.active);
        active.push(name.to_string());
        Ok(Self {
            active: Rc::new(active),
            ..self.clone()
        })
    }

    pub fn predefined(&self, text: &str) -> Option<&GraphQLQueryVariable> {
        self.predefined.get(text)
    }

    /// Register an operation variable and return the text to emit for it.
    pub fn register(&self, variable: GraphQLQueryVariable) -> String {
        self.variables
            .borrow_mut()
            .insert(variable)
            .graphql_value()
            .to_string()
    }

    pub fn check_cancelled(&self, node: &Expr) -> Result<(), Diagnostic> {
        if self.cancel.is_cancelled() {
            return Err(Diagnostic::cancelled(node));
        }
        Ok(())
    }
}
