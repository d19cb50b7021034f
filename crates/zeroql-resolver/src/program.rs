//! Whole-program compilation.
//!
//! A [`Program`] is a set of source units. Compiling it first turns every
//! fragment into a body template, so that units can use each other's
//! fragments, then resolves all selections concurrently. Identical
//! operations are emitted once.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::host::{fragment_parameters, fragment_root_type, FragmentTemplate, Scope, SemanticModel};
use crate::invocation::{Invocation, OperationKind, RequestArgs};
use crate::resolver::{resolve, resolve_fragment_template, resolve_request, ResolvedQuery};
use crate::syntax::{Expr, FnDecl, Location, Lowering, TypeExpr};
use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use syn::visit::{self, Visit};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use zeroql_schema::Surface;

/// One `query!` or `mutation!` site, or the selection of a request struct.
#[derive(Debug, Clone)]
pub struct SelectionSite {
    pub operation: OperationKind,
    pub selection: Expr,
    pub location: Location,
    pub request: Option<RequestStruct>,
}

/// A struct carrying `#[request(..)]`. Its named fields are the operation
/// variables.
#[derive(Debug, Clone)]
pub struct RequestStruct {
    pub name: String,
    pub fields: Vec<(String, TypeExpr)>,
}

/// One source file, as far as compilation is concerned.
#[derive(Debug, Clone, Default)]
pub struct Unit {
    pub name: String,
    pub functions: Vec<Arc<FnDecl>>,
    pub structs: Vec<(String, Vec<(String, TypeExpr)>)>,
    pub selections: Vec<SelectionSite>,
}

impl Unit {
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, syn::Error> {
        let file = syn::parse_file(source)?;
        Ok(Self::from_file(name, &file))
    }

    pub fn from_file(name: impl Into<String>, file: &syn::File) -> Self {
        let mut discover = Discover {
            unit: Unit {
                name: name.into(),
                ..Unit::default()
            },
            lowering: Lowering::default(),
        };
        discover.visit_file(file);
        discover.unit
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Arc<FnDecl>> {
        self.functions.iter().filter(|f| f.is_fragment)
    }

    /// Scope seen by selections of this unit: its own functions and
    /// structs, plus templates of fragments declared elsewhere.
    pub fn scope<'t>(&self, templates: impl IntoIterator<Item = &'t Arc<FragmentTemplate>>) -> Scope {
        let mut scope = Scope::new();
        for decl in &self.functions {
            scope.add_function(decl.clone());
        }
        for (name, fields) in &self.structs {
            scope.add_struct(name.clone(), fields.clone());
        }
        for template in templates {
            scope.add_template(template.clone());
        }
        scope
    }
}

struct Discover {
    unit: Unit,
    lowering: Lowering,
}

impl<'ast> Visit<'ast> for Discover {
    fn visit_item_fn(&mut self, item: &'ast syn::ItemFn) {
        let decl = self.lowering.lower_fn(item);
        self.unit.functions.push(Arc::new(decl));
        visit::visit_item_fn(self, item);
    }

    fn visit_item_struct(&mut self, item: &'ast syn::ItemStruct) {
        let fields: Vec<(String, TypeExpr)> = match &item.fields {
            syn::Fields::Named(named) => named
                .named
                .iter()
                .filter_map(|f| {
                    let name = f.ident.as_ref()?.to_string();
                    Some((name, crate::syntax::type_expr(&f.ty)))
                })
                .collect(),
            syn::Fields::Unit => Vec::new(),
            syn::Fields::Unnamed(_) => {
                visit::visit_item_struct(self, item);
                return;
            }
        };

        let request = item
            .attrs
            .iter()
            .find(|a| a.path().segments.last().is_some_and(|s| s.ident == "request"));
        if let Some(attr) = request {
            match attr.parse_args::<RequestArgs>() {
                Ok(args) => {
                    let selection = self
                        .lowering
                        .lower(&syn::Expr::Closure(args.selection));
                    self.unit.selections.push(SelectionSite {
                        operation: args.operation,
                        location: selection.location,
                        selection,
                        request: Some(RequestStruct {
                            name: item.ident.to_string(),
                            fields: fields.clone(),
                        }),
                    });
                }
                Err(e) => tracing::warn!(unit = %self.unit.name, request = %item.ident, "skipping request: {}", e),
            }
        }
        self.unit.structs.push((item.ident.to_string(), fields));
        visit::visit_item_struct(self, item);
    }

    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        let operation = mac
            .path
            .segments
            .last()
            .and_then(|s| OperationKind::from_macro(&s.ident.to_string()));
        if let Some(operation) = operation {
            match mac.parse_body::<Invocation>() {
                Ok(invocation) => {
                    let selection = self
                        .lowering
                        .lower(&syn::Expr::Closure(invocation.selection));
                    self.unit.selections.push(SelectionSite {
                        operation,
                        location: selection.location,
                        selection,
                        request: None,
                    });
                }
                Err(e) => tracing::warn!(unit = %self.unit.name, "skipping macro: {}", e),
            }
        }
        visit::visit_macro(self, mac);
    }
}

/// A compiled operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Hex SHA-256 of the operation text; identical operations share it.
    pub key: String,
    pub unit: String,
    pub location: Location,
    pub operation: OperationKind,
    /// Name of the request struct the operation belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    /// Full operation text, `query (vars) { body }`.
    pub text: String,
    #[serde(flatten)]
    pub resolved: ResolvedQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitDiagnostic {
    pub unit: String,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompileOutput {
    pub templates: Vec<Arc<FragmentTemplate>>,
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<UnitDiagnostic>,
}

impl CompileOutput {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub fn operation_key(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

pub struct Program {
    surface: Arc<Surface>,
    units: Vec<Arc<Unit>>,
}

impl Program {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface: Arc::new(surface),
            units: Vec::new(),
        }
    }

    pub fn add_unit(&mut self, unit: Unit) {
        self.units.push(Arc::new(unit));
    }

    pub fn units(&self) -> &[Arc<Unit>] {
        &self.units
    }

    /// Compile every selection of every unit.
    ///
    /// Cancelling `cancel` stops outstanding resolutions; they are reported
    /// as cancelled rather than as translation failures.
    #[tracing::instrument(skip_all, fields(units = self.units.len()))]
    pub async fn compile(&self, cancel: &CancellationToken) -> CompileOutput {
        let mut output = CompileOutput::default();

        let templates = self.extract_templates(cancel, &mut output.diagnostics);
        output.templates = templates.values().cloned().collect();

        let mut tasks = JoinSet::new();
        let mut slots: Vec<(Arc<Unit>, usize)> = Vec::new();
        for unit in &self.units {
            let foreign: Vec<Arc<FragmentTemplate>> = templates
                .iter()
                .filter(|((owner, _), _)| owner != &unit.name)
                .map(|(_, t)| t.clone())
                .collect();
            let scope = Arc::new(unit.scope(&foreign));

            for site in 0..unit.selections.len() {
                let surface = self.surface.clone();
                let unit = unit.clone();
                let scope = scope.clone();
                let token = cancel.child_token();
                let slot = slots.len();
                slots.push((unit.clone(), site));
                tasks.spawn_blocking(move || {
                    let result = compile_site(&surface, &scope, &unit.selections[site], &token);
                    (slot, result)
                });
            }
        }

        let mut finished = vec![None; slots.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => finished[slot] = Some(result),
                Err(e) => tracing::error!("selection task failed: {}", e),
            }
        }

        let mut seen = HashSet::new();
        for ((unit, site), result) in settle(&slots, finished) {
            let (operation, location, request) = {
                let site = &unit.selections[site];
                let request = site.request.as_ref().map(|r| r.name.clone());
                (site.operation, site.location, request)
            };
            match result {
                Ok(resolved) => {
                    let text = format!("{} {}", operation.keyword(), resolved.query);
                    let key = operation_key(&text);
                    if !seen.insert(key.clone()) {
                        tracing::debug!(%key, unit = %unit.name, "duplicate operation");
                        continue;
                    }
                    output.artifacts.push(Artifact {
                        key,
                        unit: unit.name.clone(),
                        location,
                        operation,
                        request,
                        text,
                        resolved,
                    });
                }
                Err(diagnostic) => output.diagnostics.push(UnitDiagnostic {
                    unit: unit.name.clone(),
                    diagnostic,
                }),
            }
        }

        tracing::info!(
            artifacts = output.artifacts.len(),
            diagnostics = output.diagnostics.len(),
            "compiled program"
        );
        output
    }

    /// Templates for every fragment, keyed by owning unit and name.
    ///
    /// A fragment may call fragments of other units, so extraction repeats
    /// until a pass adds nothing, each pass seeing the templates found so
    /// far. Whatever still fails after that is reported.
    fn extract_templates(
        &self,
        cancel: &CancellationToken,
        diagnostics: &mut Vec<UnitDiagnostic>,
    ) -> IndexMap<(String, String), Arc<FragmentTemplate>> {
        let mut templates: IndexMap<(String, String), Arc<FragmentTemplate>> = IndexMap::new();
        let mut failures = IndexMap::new();
        loop {
            let mut progressed = false;
            failures.clear();
            for unit in &self.units {
                let foreign: Vec<Arc<FragmentTemplate>> = templates
                    .iter()
                    .filter(|((owner, _), _)| owner != &unit.name)
                    .map(|(_, t)| t.clone())
                    .collect();
                let scope = unit.scope(&foreign);
                for decl in unit.fragments() {
                    let key = (unit.name.clone(), decl.name.clone());
                    if templates.contains_key(&key) {
                        continue;
                    }
                    match extract_template(&self.surface, &scope, decl, cancel) {
                        Ok(template) => {
                            templates.insert(key, Arc::new(template));
                            progressed = true;
                        }
                        Err(diagnostic) => {
                            failures.insert(key, diagnostic);
                        }
                    }
                }
            }
            if !progressed || failures.is_empty() {
                break;
            }
        }
        for ((unit, _), diagnostic) in failures {
            diagnostics.push(UnitDiagnostic { unit, diagnostic });
        }
        templates
    }
}

/// Pair every selection slot with its outcome. A slot whose task never
/// reported back (it panicked or was aborted) becomes a diagnostic at the
/// selection, so every selection ends up as an artifact or a diagnostic.
fn settle(
    slots: &[(Arc<Unit>, usize)],
    finished: Vec<Option<Result<ResolvedQuery, Diagnostic>>>,
) -> Vec<((Arc<Unit>, usize), Result<ResolvedQuery, Diagnostic>)> {
    slots
        .iter()
        .cloned()
        .zip(finished)
        .map(|((unit, site), result)| {
            let result = result.unwrap_or_else(|| {
                Err(Diagnostic::unfinished(&unit.selections[site].selection))
            });
            ((unit, site), result)
        })
        .collect()
}

fn compile_site(
    surface: &Surface,
    scope: &Scope,
    site: &SelectionSite,
    cancel: &CancellationToken,
) -> Result<ResolvedQuery, Diagnostic> {
    let root_type = match site.operation {
        OperationKind::Query => surface.query_type(),
        OperationKind::Mutation => surface.mutation_type(),
    };
    let Some(root_type) = root_type else {
        return Err(Diagnostic::new(DiagnosticKind::MissingFieldSelector, &site.selection));
    };
    let model = SemanticModel::bind(surface, scope, root_type, &site.selection);
    match &site.request {
        Some(request) => resolve_request(&site.selection, &request.fields, &model, cancel),
        None => resolve(&site.selection, &model, cancel),
    }
}

/// Compile one fragment declaration into a template.
pub fn extract_template(
    surface: &Surface,
    scope: &Scope,
    decl: &FnDecl,
    cancel: &CancellationToken,
) -> Result<FragmentTemplate, Diagnostic> {
    let (Some(root_type), Some(model)) = (
        fragment_root_type(surface, decl),
        SemanticModel::bind_fragment(surface, scope, decl),
    ) else {
        return Err(Diagnostic::new(DiagnosticKind::Untranslatable, &decl.body));
    };
    let body = resolve_fragment_template(decl, &model, cancel)?;
    let template = body
        .strip_prefix("{ ")
        .and_then(|b| b.strip_suffix(" }"))
        .unwrap_or(&body)
        .to_string();
    Ok(FragmentTemplate {
        name: decl.name.clone(),
        root_type,
        parameters: fragment_parameters(decl),
        template,
    })
}
