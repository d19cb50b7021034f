//! Where a macro invocation finds its schema and fragments.
//!
//! Defaults come from the invoking crate's manifest:
//!
//! ```toml
//! [package.metadata.zeroql]
//! schema = "schema.graphql"
//! fragments = ["src/fragments.rs"]
//! ```
//!
//! Options given in the invocation itself take precedence.

use proc_macro2::Span;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use syn::LitStr;
use zeroql_resolver::{Invocation, Scope, Unit};
use zeroql_schema::Surface;

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    package: Package,
}

#[derive(Debug, Default, Deserialize)]
struct Package {
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    zeroql: Settings,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub schema: Option<String>,
    #[serde(default)]
    pub fragments: Vec<String>,
}

impl Settings {
    /// Read `[package.metadata.zeroql]` from `manifest_dir/Cargo.toml`. A
    /// missing manifest or table yields empty settings.
    pub fn load(manifest_dir: &Path) -> syn::Result<Self> {
        let path = manifest_dir.join("Cargo.toml");
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Ok(Self::default());
        };
        let manifest: Manifest = toml::from_str(&text).map_err(|e| {
            syn::Error::new(
                Span::call_site(),
                format!("invalid {}: {}", path.display(), e),
            )
        })?;
        Ok(manifest.package.metadata.zeroql)
    }
}

/// Inputs of one invocation, with paths made absolute.
pub struct Resolved {
    pub schema: PathBuf,
    pub fragments: Vec<PathBuf>,
}

impl Resolved {
    pub fn new(manifest_dir: &Path, invocation: &Invocation) -> syn::Result<Self> {
        Self::with_options(manifest_dir, invocation.schema.as_ref(), &invocation.fragments)
    }

    /// Options given at the call site win over `[package.metadata.zeroql]`.
    pub fn with_options(
        manifest_dir: &Path,
        schema: Option<&LitStr>,
        fragments: &[LitStr],
    ) -> syn::Result<Self> {
        let settings = Settings::load(manifest_dir)?;

        let schema = match (schema, settings.schema) {
            (Some(lit), _) => manifest_dir.join(lit.value()),
            (None, Some(schema)) => manifest_dir.join(schema),
            (None, None) => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "no schema configured: pass `schema = \"...\"` or set \
                     `schema` under [package.metadata.zeroql] in Cargo.toml",
                ))
            }
        };

        let fragments = if fragments.is_empty() {
            settings
                .fragments
                .iter()
                .map(|f| manifest_dir.join(f))
                .collect()
        } else {
            fragments
                .iter()
                .map(|lit| manifest_dir.join(lit.value()))
                .collect()
        };

        Ok(Self { schema, fragments })
    }

    /// Files whose contents the expansion depends on.
    pub fn tracked(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.schema.as_path()).chain(self.fragments.iter().map(PathBuf::as_path))
    }

    pub fn surface(&self) -> syn::Result<Arc<Surface>> {
        let text = read(&self.schema)?;
        load_surface(&self.schema, text)
    }

    pub fn scope(&self) -> syn::Result<Scope> {
        let mut scope = Scope::new();
        for path in &self.fragments {
            let text = read(path)?;
            let unit = Unit::parse(path.display().to_string(), &text).map_err(|e| {
                syn::Error::new(
                    Span::call_site(),
                    format!("cannot parse {}: {}", path.display(), e),
                )
            })?;
            for decl in unit.functions {
                scope.add_function(decl);
            }
            for (name, fields) in unit.structs {
                scope.add_struct(name, fields);
            }
        }
        Ok(scope)
    }
}

fn read(path: &Path) -> syn::Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        syn::Error::new(
            Span::call_site(),
            format!("cannot read {}: {}", path.display(), e),
        )
    })
}

type SurfaceCache = Mutex<HashMap<PathBuf, (String, Arc<Surface>)>>;

/// Parsed surfaces, reused across invocations in one compiler process as
/// long as the schema text is unchanged.
fn load_surface(path: &Path, text: String) -> syn::Result<Arc<Surface>> {
    static CACHE: OnceLock<SurfaceCache> = OnceLock::new();
    let cache = CACHE.get_or_init(Default::default);

    if let Ok(cache) = cache.lock() {
        if let Some((cached, surface)) = cache.get(path) {
            if *cached == text {
                return Ok(surface.clone());
            }
        }
    }

    let schema = zeroql_schema::parse(&text).map_err(|e| {
        syn::Error::new(Span::call_site(), format!("{}: {}", path.display(), e))
    })?;
    let surface = Arc::new(Surface::from_schema(&schema));
    if let Ok(mut cache) = cache.lock() {
        cache.insert(path.to_path_buf(), (text, surface.clone()));
    }
    Ok(surface)
}
