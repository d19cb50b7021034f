//! Fragment inlining.
//!
//! A fragment is a function whose first parameter is the selection root and
//! whose remaining parameters are fragment-local arguments. When its
//! declaration is in scope it is walked directly with the caller's argument
//! values bound to its parameters; otherwise its precompiled body template
//! is filled in textually. Both routes produce the same body.

use crate::context::SelectionContext;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::resolver::{resolve_argument, resolve_selector_body};
use crate::symbols::{template, ParameterSymbol, Tag};
use crate::syntax::{Expr, FnDecl};
use crate::variable::GraphQLQueryVariable;
use indexmap::IndexMap;

/// Something that can produce the inlined body of a fragment call.
pub trait FragmentSource {
    fn name(&self) -> &str;

    /// Produce the braced body for a call with `arguments` bound, in order,
    /// to `parameters` (the fragment parameters after the root).
    fn inline(
        &self,
        ctx: &SelectionContext<'_>,
        call: &Expr,
        arguments: &[Expr],
        parameters: &[ParameterSymbol],
    ) -> Result<String, Diagnostic>;
}

/// A fragment declared in the same unit as the call.
pub struct LiveFragment<'a> {
    decl: &'a FnDecl,
}

impl FragmentSource for LiveFragment<'_> {
    fn name(&self) -> &str {
        &self.decl.name
    }

    fn inline(
        &self,
        ctx: &SelectionContext<'_>,
        call: &Expr,
        arguments: &[Expr],
        parameters: &[ParameterSymbol],
    ) -> Result<String, Diagnostic> {
        let Some((root, params)) = self.decl.params.split_first() else {
            return Err(Diagnostic::new(DiagnosticKind::Untranslatable, call));
        };
        if params.len() != arguments.len() {
            return Err(Diagnostic::new(DiagnosticKind::Untranslatable, call));
        }

        let mut predefined = IndexMap::new();
        for ((param, arg), symbol) in params.iter().zip(arguments).zip(parameters) {
            let value = resolve_argument(ctx, arg, symbol)?;
            predefined.insert(
                param.name.clone(),
                GraphQLQueryVariable::constant(&param.name, value),
            );
        }

        let inner = ctx
            .enter(&self.decl.name, call)?
            .with_root(&root.name)
            .with_predefined(predefined);
        resolve_selector_body(&inner, &self.decl.body)
    }
}

/// A fragment from another unit, available only as a body template with
/// `{{param}}` placeholders.
pub struct TemplateFragment<'a> {
    name: &'a str,
    template: &'a str,
}

impl FragmentSource for TemplateFragment<'_> {
    fn name(&self) -> &str {
        self.name
    }

    fn inline(
        &self,
        ctx: &SelectionContext<'_>,
        call: &Expr,
        arguments: &[Expr],
        parameters: &[ParameterSymbol],
    ) -> Result<String, Diagnostic> {
        if parameters.len() != arguments.len() {
            return Err(Diagnostic::new(DiagnosticKind::Untranslatable, call));
        }
        let mut body = self.template.to_string();
        for (parameter, arg) in parameters.iter().zip(arguments) {
            let value = resolve_argument(ctx, arg, parameter)?;
            body = body.replace(&placeholder(&parameter.name), &value);
        }
        Ok(format!("{{ {body} }}"))
    }
}

pub fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Pick how to inline a fragment: its declaration when available, else its
/// template.
pub fn source<'a>(
    name: &'a str,
    tags: &'a [Tag],
    declaration: Option<&'a FnDecl>,
) -> Option<Box<dyn FragmentSource + 'a>> {
    if let Some(decl) = declaration {
        return Some(Box::new(LiveFragment { decl }));
    }
    template(tags).map(|template| {
        Box::new(TemplateFragment { name, template }) as Box<dyn FragmentSource + 'a>
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders() {
        assert_eq!(placeholder("size"), "{{size}}");
    }

    #[test]
    fn declaration_wins_over_template() {
        let decl = crate::syntax::parse_fn("fn f(p: &Person) -> i32 { p.id }").unwrap();
        let tags = vec![Tag::FragmentTemplate("{ id }".to_string())];
        let chosen = source("f", &tags, Some(&decl)).unwrap();
        assert_eq!(chosen.name(), "f");
        assert!(source("f", &[], None).is_none());
        assert!(source("f", &tags, None).is_some());
    }
}
