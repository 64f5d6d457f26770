//! Turns type expressions and named declarations into validators.
//!
//! One [`Manager`] owns the validator cache and the text of every file it
//! has read. Resolution is a recursive descent over the expression text:
//! each step classifies the expression, then builds the matching validator,
//! resolving operands, elements, fields and parents through the manager
//! again.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{ResolveError, ResolveResult};
use crate::scan::import::normalize_path;
use crate::scan::{extract_alias, extract_record, find_import, resolve_module_path, ScanError};
use crate::source::{DiskSource, SourceLoader};
use crate::text::{strip_comments, trim_brackets};
use crate::validator::array::element_type;
use crate::validator::logic::top_level_operators;
use crate::validator::record::is_record_def;
use crate::validator::{ArrayValidator, BasicValidator, DeferredValidator, LogicValidator, RecordValidator, Validator};

static PARTIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Partial\s*<\s*([\w$]+)\s*>$").unwrap());
static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap());

// ------------------------------- Options ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Optional fields reject an explicit `null`.
    pub strict_null_checks: bool,
    /// Suffixes tried, in order, when an import specifier names no existing
    /// file as written.
    pub extensions: Vec<String>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            strict_null_checks: false,
            extensions: vec![".ts".into(), ".tsx".into(), ".d.ts".into()],
        }
    }
}

// --------------------------------- Cache ---------------------------------- //

/// A declaration, identified by its name in the file that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: String,
    pub file: PathBuf,
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.file.display())
    }
}

/// A declaration whose build is on the stack.
struct InProgress {
    key: CacheKey,
    /// Structural depth when the build started. Re-entering at a greater
    /// depth is guarded by a record field or array element.
    depth: usize,
    /// Filled once the build finishes; shared by every deferred reference.
    slot: Option<Arc<OnceLock<Validator>>>,
}

/// How an expression is built, decided from its text alone.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape<'a> {
    Logic,
    Array(&'a str),
    Basic(BasicValidator),
    Partial(&'a str),
    Record,
    Reference,
}

// -------------------------------- Manager --------------------------------- //

pub struct Manager {
    options: ManagerOptions,
    loader: Box<dyn SourceLoader>,
    cache: IndexMap<CacheKey, Validator>,
    sources: HashMap<PathBuf, Arc<str>>,
    in_progress: Vec<InProgress>,
    depth: usize,
    /// Declaration to build on its own before retrying a failed resolution.
    prerequisite: Option<CacheKey>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// Reads declarations from disk with default options.
    pub fn new() -> Self {
        Self::with_loader(DiskSource, ManagerOptions::default())
    }

    pub fn with_options(options: ManagerOptions) -> Self {
        Self::with_loader(DiskSource, options)
    }

    pub fn with_loader(loader: impl SourceLoader + 'static, options: ManagerOptions) -> Self {
        Self {
            options,
            loader: Box::new(loader),
            cache: IndexMap::new(),
            sources: HashMap::new(),
            in_progress: Vec::new(),
            depth: 0,
            prerequisite: None,
        }
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    pub fn strict_null_checks(&self) -> bool {
        self.options.strict_null_checks
    }

    /// Records are built with the flag baked in, so changing it drops every
    /// cached validator.
    pub fn set_strict_null_checks(&mut self, strict: bool) {
        if self.options.strict_null_checks != strict {
            debug!(strict, "strictNullChecks changed; clearing validator cache");
            self.options.strict_null_checks = strict;
            self.cache.clear();
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cached_keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.cache.keys()
    }

    /// Forget every validator and every file read so far.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.sources.clear();
    }

    /// The validator for declaration `name` as seen from `file`.
    pub fn resolve_named(&mut self, name: &str, file: impl AsRef<Path>) -> ResolveResult<Validator> {
        self.resolve(name, Some(file.as_ref()))
    }

    /// The validator for a type expression. `file` is where bare names in
    /// the expression are looked up; it may be omitted when the expression
    /// names no declaration.
    pub fn resolve(&mut self, expr: &str, file: Option<&Path>) -> ResolveResult<Validator> {
        self.prerequisite = None;
        self.build_in_order(&mut Vec::new(), &mut |m: &mut Manager| m.resolve_expr(expr, file))
    }

    /// Run `build`; when it fails because a declaration had to be finished
    /// before one of its own fields could use it, build that declaration
    /// first and run `build` again.
    fn build_in_order(
        &mut self,
        tried: &mut Vec<CacheKey>,
        build: &mut dyn FnMut(&mut Manager) -> ResolveResult<Validator>,
    ) -> ResolveResult<Validator> {
        loop {
            let err = match build(self) {
                Ok(validator) => return Ok(validator),
                Err(err) => err,
            };
            let Some(key) = self.prerequisite.take() else {
                return Err(err);
            };
            if tried.contains(&key) {
                return Err(err);
            }
            debug!(%key, "building prerequisite first");
            tried.push(key.clone());
            self.build_in_order(tried, &mut |m: &mut Manager| m.resolve_key(key.clone()))?;
        }
    }

    pub(crate) fn resolve_expr(&mut self, expr: &str, file: Option<&Path>) -> ResolveResult<Validator> {
        let cleaned = strip_comments(expr);
        let def = normalize_expr(&cleaned);
        let shape = classify(def)?;
        trace!(expr = def, ?shape, "classified");
        match shape {
            Shape::Logic => Ok(Validator::Logic(Arc::new(LogicValidator::build(def, self, file)?))),
            Shape::Array(element) => Ok(Validator::Array(Arc::new(ArrayValidator::build(element, self, file)?))),
            Shape::Basic(basic) => Ok(Validator::Basic(basic)),
            Shape::Partial(name) => match self.resolve_built(name, file)? {
                Validator::Record(record) => Ok(Validator::Record(Arc::new(record.partial()))),
                _ => Err(ResolveError::PartialTarget { name: name.to_string() }),
            },
            Shape::Record => Ok(Validator::Record(Arc::new(RecordValidator::build(def, self, file)?))),
            Shape::Reference => self.resolve_reference(def, file),
        }
    }

    /// Resolve a record field, index signature or array element. References
    /// back to a declaration under construction are only allowed from here.
    pub(crate) fn resolve_nested(&mut self, expr: &str, file: Option<&Path>) -> ResolveResult<Validator> {
        self.depth += 1;
        let result = self.resolve_expr(expr, file);
        self.depth -= 1;
        result
    }

    /// Resolve a name whose built validator is needed right away: an
    /// `extends` parent or a `Partial<..>` target. A deferred reference
    /// cannot serve here. If the target is in progress only because the
    /// enclosing declaration was reached through one of its fields, that
    /// enclosing declaration is marked to be built first.
    pub(crate) fn resolve_built(&mut self, name: &str, file: Option<&Path>) -> ResolveResult<Validator> {
        let deferred = match self.resolve_expr(name, file)? {
            Validator::Deferred(deferred) => deferred,
            built => return Ok(built),
        };
        let target = self
            .in_progress
            .iter()
            .find(|p| p.slot.as_ref().is_some_and(|slot| deferred.shares_cell(slot)))
            .map(|p| p.key.clone());
        let enclosing = self.in_progress.last().map(|p| p.key.clone());
        if let (Some(target), Some(enclosing)) = (target, enclosing) {
            if target != enclosing {
                trace!(%target, %enclosing, "needs a finished declaration");
                self.prerequisite = Some(enclosing);
            }
        }
        Err(ResolveError::RecursiveAlias { name: deferred.name().to_string() })
    }

    // --------------------------- References ------------------------------- //

    fn resolve_reference(&mut self, name: &str, file: Option<&Path>) -> ResolveResult<Validator> {
        let file = file.ok_or_else(|| ResolveError::MissingFileHint { name: name.to_string() })?;
        let key = self.locate(name, &normalize_path(file))?;
        self.resolve_key(key)
    }

    fn resolve_key(&mut self, key: CacheKey) -> ResolveResult<Validator> {
        if let Some(cached) = self.cache.get(&key) {
            trace!(%key, "cache hit");
            return Ok(cached.clone());
        }

        let depth = self.depth;
        if let Some(entry) = self.in_progress.iter_mut().rev().find(|p| p.key == key) {
            if depth <= entry.depth {
                return Err(ResolveError::RecursiveAlias { name: key.name });
            }
            let slot = entry.slot.get_or_insert_with(|| Arc::new(OnceLock::new())).clone();
            debug!(%key, "deferring recursive reference");
            return Ok(Validator::Deferred(DeferredValidator::new(key.name, slot)));
        }

        debug!(%key, "building declaration");
        let cache_mark = self.cache.len();
        self.in_progress.push(InProgress { key: key.clone(), depth, slot: None });
        let built = self.build_declaration(&key);
        let slot = self.in_progress.pop().and_then(|entry| entry.slot);
        match built {
            Ok(validator) => {
                if let Some(slot) = slot {
                    let _ = slot.set(validator.clone());
                }
                self.cache.insert(key, validator.clone());
                Ok(validator)
            }
            Err(err) => {
                // anything cached since the build started may hold an
                // unfilled slot
                self.cache.truncate(cache_mark);
                Err(err)
            }
        }
    }

    /// Follow an import of `name` out of `file`, if there is one.
    fn locate(&mut self, name: &str, file: &Path) -> ResolveResult<CacheKey> {
        let text = self.source(file)?;
        match find_import(&text, name) {
            Some(import) => {
                let target = resolve_module_path(&*self.loader, file, &import.specifier, &self.options.extensions)?;
                debug!(name, from = %file.display(), to = %target.display(), "followed import");
                Ok(CacheKey { name: import.exported, file: target })
            }
            None => Ok(CacheKey { name: name.to_string(), file: file.to_path_buf() }),
        }
    }

    /// Interfaces shadow aliases of the same name.
    fn build_declaration(&mut self, key: &CacheKey) -> ResolveResult<Validator> {
        let text = self.source(&key.file)?;
        let scan_err = |err: ScanError| match err {
            ScanError::Unterminated => ResolveError::UnterminatedDeclaration {
                name: key.name.clone(),
                file: key.file.clone(),
            },
            ScanError::Unbalanced => ResolveError::UnbalancedBraces {
                context: format!("`{}` in {}", key.name, key.file.display()),
            },
        };
        let def = match extract_record(&text, &key.name).map_err(scan_err)? {
            Some(def) => def,
            None => extract_alias(&text, &key.name)
                .map_err(scan_err)?
                .ok_or_else(|| ResolveError::DeclarationNotFound {
                    name: key.name.clone(),
                    file: key.file.clone(),
                })?,
        };
        self.resolve_expr(&def, Some(&key.file))
    }

    /// Comment-stripped text of `path`, read at most once.
    fn source(&mut self, path: &Path) -> ResolveResult<Arc<str>> {
        if let Some(text) = self.sources.get(path) {
            return Ok(text.clone());
        }
        if !self.loader.is_file(path) {
            return Err(ResolveError::FileNotFound { path: path.to_path_buf() });
        }
        let raw = self.loader.read(path).map_err(|source| ResolveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = raw.len(), "read declarations");
        let text: Arc<str> = Arc::from(strip_comments(&raw));
        self.sources.insert(path.to_path_buf(), text.clone());
        Ok(text)
    }
}

// ---------------------------- Classification ------------------------------ //

/// Trim, drop redundant outer parentheses and a leading `|`/`&` operator.
fn normalize_expr(expr: &str) -> &str {
    let mut def = trim_brackets(expr.trim());
    while let Some(rest) = def.strip_prefix(['|', '&']) {
        def = trim_brackets(rest.trim());
    }
    def
}

fn classify(def: &str) -> ResolveResult<Shape<'_>> {
    if def.is_empty() {
        return Err(ResolveError::InvalidExpression { expr: def.to_string() });
    }
    let operators = top_level_operators(def).ok_or_else(|| ResolveError::UnbalancedBraces {
        context: def.to_string(),
    })?;
    if !operators.is_empty() {
        return Ok(Shape::Logic);
    }
    if let Some(element) = element_type(def) {
        return Ok(Shape::Array(element));
    }
    if let Some(basic) = BasicValidator::parse(def) {
        return Ok(Shape::Basic(basic));
    }
    if let Some(caps) = PARTIAL.captures(def) {
        if let Some(name) = caps.get(1) {
            return Ok(Shape::Partial(name.as_str()));
        }
    }
    if is_record_def(def) {
        return Ok(Shape::Record);
    }
    if REFERENCE.is_match(def) {
        return Ok(Shape::Reference);
    }
    Err(ResolveError::InvalidExpression { expr: def.to_string() })
}

// ------------------------------- Tests ------------------------------------ //
