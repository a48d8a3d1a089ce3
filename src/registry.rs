//! The function registry.
//!
//! A [`Registry`] keeps functions in registration order and indexes them by
//! path. Functions arrive singly, as lists, or as a [`Namespace`] tree whose
//! keys are joined into paths.
//!
//! # Example
//!
//! ```ignore
//! use funcset::{Function, Namespace, Registry};
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     Namespace::new()
//!         .namespace("users", Namespace::new().function("create", create_user)),
//! )?;
//! assert!(registry.lookup("/users/create").is_some());
//! ```

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{Config, DuplicatePolicy, RegistrySettings};
use crate::function::Function;
use crate::http::{self, Dispatch, Request};
use crate::invoke::{Context, Fault, Outcome};
use crate::loader::{self, Resolve};
use crate::response::HttpResponse;
use crate::table::Table;
use crate::validate::{JsonSchema, Validator};
use crate::{Error, Result, openapi};

/// A node of a namespace tree.
#[derive(Debug, Clone)]
pub enum Node {
    Function(Function),
    Namespace(Namespace),
}

/// Ordered mapping of names to functions or nested namespaces.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    entries: Vec<(String, Node)>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any node already under `name`.
    pub fn insert(&mut self, name: impl Into<String>, node: Node) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = node,
            None => self.entries.push((name, node)),
        }
    }

    pub fn function(mut self, name: impl Into<String>, function: Function) -> Self {
        self.insert(name, Node::Function(function));
        self
    }

    pub fn namespace(mut self, name: impl Into<String>, namespace: Namespace) -> Self {
        self.insert(name, Node::Namespace(namespace));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Depth-first flatten into `(path, function)` pairs, where each path is
    /// `base` followed by every traversed key prefixed with `separator`.
    pub fn flatten(self, base: &str, separator: &str) -> Vec<(String, Function)> {
        let mut out = Vec::new();
        self.flatten_into(base, separator, &mut out);
        out
    }

    fn flatten_into(self, base: &str, separator: &str, out: &mut Vec<(String, Function)>) {
        for (name, node) in self.entries {
            let path = format!("{base}{separator}{name}");
            match node {
                Node::Function(f) => out.push((path, f)),
                Node::Namespace(ns) => ns.flatten_into(&path, separator, out),
            }
        }
    }
}

/// Anything that can be handed to [`Registry::register`].
#[derive(Debug, Clone)]
pub enum Registrable {
    Single(Function),
    List(Vec<Registrable>),
    Namespace(Namespace),
}

impl From<Function> for Registrable {
    fn from(f: Function) -> Self {
        Registrable::Single(f)
    }
}

impl From<Vec<Function>> for Registrable {
    fn from(list: Vec<Function>) -> Self {
        Registrable::List(list.into_iter().map(Registrable::Single).collect())
    }
}

impl From<Vec<Registrable>> for Registrable {
    fn from(list: Vec<Registrable>) -> Self {
        Registrable::List(list)
    }
}

impl From<Namespace> for Registrable {
    fn from(ns: Namespace) -> Self {
        Registrable::Namespace(ns)
    }
}

/// Ordered, path-indexed collection of functions.
pub struct Registry {
    functions: Vec<Function>,
    index: HashMap<String, usize>,
    settings: RegistrySettings,
    extensions: Vec<String>,
    validator: Arc<dyn Validator>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.functions)
            .field("settings", &self.settings)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry with default settings.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Create an empty registry using the registry and loader settings of `config`.
    pub fn with_config(config: &Config) -> Self {
        Self {
            functions: Vec::new(),
            index: HashMap::new(),
            settings: config.registry.clone(),
            extensions: config.loader.extensions.clone(),
            validator: Arc::new(JsonSchema),
        }
    }

    /// Replace the argument validator used by dispatch and direct invocation.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Register a function, a list, or a namespace tree.
    ///
    /// Under [`DuplicatePolicy::Reject`] the batch is checked as a whole
    /// first: on a duplicate path nothing is registered.
    pub fn register(&mut self, x: impl Into<Registrable>) -> Result<&mut Self> {
        let mut batch = Vec::new();
        self.collect(x.into(), &mut batch);

        if matches!(self.settings.duplicates, DuplicatePolicy::Reject) {
            let mut seen = HashSet::new();
            for path in batch.iter().filter_map(Function::path) {
                if self.index.contains_key(path) || !seen.insert(path) {
                    return Err(Error::DuplicatePath(path.to_string()));
                }
            }
        }

        for f in batch {
            self.insert(f);
        }
        Ok(self)
    }

    fn collect(&self, x: Registrable, out: &mut Vec<Function>) {
        match x {
            Registrable::Single(f) => out.push(f),
            Registrable::List(list) => {
                for item in list {
                    self.collect(item, out);
                }
            }
            Registrable::Namespace(ns) => {
                for (path, mut f) in ns.flatten("", &self.settings.separator) {
                    f.set_path(path);
                    out.push(f);
                }
            }
        }
    }

    /// Load a namespace tree from `root` and register it.
    pub fn register_path(&mut self, root: &Path, resolver: &dyn Resolve) -> Result<&mut Self> {
        let tree = loader::load_tree(root, &self.extensions, resolver)?;
        self.register(tree)
    }

    fn insert(&mut self, f: Function) {
        let Some(path) = f.path().map(str::to_string) else {
            debug!("Registered function {} without a path", f.name());
            self.functions.push(f);
            return;
        };

        match self.index.get(&path).copied() {
            Some(pos) => {
                debug!("Replaced function at {path} with {}", f.name());
                self.functions[pos] = f;
            }
            None => {
                debug!("Registered function {} at {path}", f.name());
                self.index.insert(path, self.functions.len());
                self.functions.push(f);
            }
        }
    }

    /// Remove a function by identity.
    pub fn unregister(&mut self, f: &Function) -> Result<&mut Self> {
        let pos = self
            .functions
            .iter()
            .position(|g| g.id() == f.id())
            .ok_or_else(|| Error::NotRegistered(f.name().to_string()))?;
        let removed = self.functions.remove(pos);
        debug!("Unregistered function {}", removed.name());
        self.reindex();
        Ok(self)
    }

    fn reindex(&mut self) {
        self.index = self
            .functions
            .iter()
            .enumerate()
            .filter_map(|(pos, f)| f.path().map(|p| (p.to_string(), pos)))
            .collect();
    }

    /// Find the function registered at exactly `path`.
    pub fn lookup(&self, path: &str) -> Option<&Function> {
        self.index.get(path).map(|&pos| &self.functions[pos])
    }

    /// Functions in registration order.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Invoke the function at `path` directly.
    ///
    /// An unknown path yields [`Fault::Routing`].
    pub async fn invoke(&self, path: &str, ctx: Context, args: Vec<Value>) -> Outcome {
        let Some(f) = self.lookup(path) else {
            return Err(Fault::Routing(path.to_string()));
        };
        f.invoke_with(self.validator.as_ref(), ctx, args).await
    }

    /// Route `req` by path to its function's dispatch, or pass it through.
    pub async fn handle(&self, req: Request) -> Dispatch {
        match self.lookup(&req.path) {
            Some(f) => http::dispatch(f, self.validator.as_ref(), req).await,
            None => {
                tracing::trace!("No function at {}, passing through", req.path);
                Dispatch::PassThrough(req)
            }
        }
    }

    /// Like [`handle`](Self::handle), running `next` for requests that pass through.
    pub async fn http_handler<N, Fut>(&self, req: Request, next: N) -> HttpResponse
    where
        N: FnOnce(Request) -> Fut,
        Fut: Future<Output = HttpResponse>,
    {
        match self.handle(req).await {
            Dispatch::Handled(response) => response,
            Dispatch::PassThrough(req) => next(req).await,
        }
    }

    /// Documentation path items of every routable function, merged in
    /// registration order. Functions without a path are left out.
    pub fn paths(&self) -> Map<String, Value> {
        let mut paths = Map::new();
        for f in self.functions.iter().filter(|f| f.path().is_some()) {
            let (key, item) = openapi::path_item(f);
            paths.insert(key, item);
        }
        paths
    }

    /// Console listing of the registered functions.
    pub fn table(&self) -> Table<'_> {
        Table::new(&self.functions)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
