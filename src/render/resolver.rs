//! Recursive fragment expansion with cycle detection.
//!
//! The [`FragmentResolver`] owns everything one render needs: the
//! [`PromptContext`] for locating slugs, a parsed-fragment cache keyed by
//! canonical path, and the resolution stack that makes cycles detectable.
//! The host engine calls back into [`FragmentResolver::resolve_reference`]
//! through the reserved `include_fragment` function; each call runs the
//! sequence LOCATE → CHECK_CYCLE → LOAD → BIND_ARGS → PUSH → EVALUATE →
//! POP, and the first failure terminates the whole render.
//!
//! Scopes are created fresh per call from the arguments and the fragment's
//! declared defaults; nothing is inherited from the caller, so a fragment
//! is a pure function of its declared arguments.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use tera::{Context as TeraContext, Tera, Value};

use crate::constants::{INCLUDE_FUNCTION, TOP_FRAME_SLUG};
use crate::context::PromptContext;
use crate::core::error::{PrompyError, Result};
use crate::fragment::PromptFile;
use crate::render::renderer::{self, EvalSite};

/// One in-flight fragment expansion.
#[derive(Debug, Clone)]
pub struct ResolutionFrame {
    /// Slug being resolved; [`TOP_FRAME_SLUG`] for the synthetic top frame.
    pub slug: String,
    /// File the body came from, if any.
    pub path: Option<PathBuf>,
    /// Line in the caller where the reference appeared (0 for the top).
    pub call_line: usize,
    /// Frontmatter line count of the file, for diagnostics inside the body.
    pub body_line_offset: usize,
}

/// Orchestrates one render: locates, loads, and expands fragments.
///
/// Interior mutability keeps the public surface `&self` so the resolver can
/// be shared with the host engine's function callback; the engine is still
/// strictly single-threaded and all side effects happen in source order.
pub struct FragmentResolver {
    context: PromptContext,
    cache: Mutex<HashMap<PathBuf, Arc<PromptFile>>>,
    stack: Mutex<Vec<ResolutionFrame>>,
    failure: Mutex<Option<PrompyError>>,
    /// Handle to ourselves, cloned into the host engine's function
    /// callback on every evaluation.
    self_ref: Weak<FragmentResolver>,
}

impl FragmentResolver {
    pub fn new(context: PromptContext) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            context,
            cache: Mutex::new(HashMap::new()),
            stack: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    pub fn context(&self) -> &PromptContext {
        &self.context
    }

    /// Render a top-level body that has no backing file.
    pub fn render(&self, body: &str, scope: &HashMap<String, String>) -> Result<String> {
        self.render_with_origin(body, scope, None, 0)
    }

    /// Render a loaded prompt file, seeding the scope with its argument
    /// defaults.
    pub fn render_file(&self, file: &PromptFile) -> Result<String> {
        let (body, leading_lines) = trimmed_body(&file.body);
        self.render_with_origin(
            body,
            &file.default_scope(),
            Some(file.path.clone()),
            file.body_line_offset + leading_lines,
        )
    }

    /// Render a body attributed to `origin` for diagnostics.
    pub fn render_with_origin(
        &self,
        body: &str,
        scope: &HashMap<String, String>,
        origin: Option<PathBuf>,
        line_offset: usize,
    ) -> Result<String> {
        {
            let mut stack = self.stack.lock().expect("resolution stack lock");
            debug_assert!(stack.is_empty(), "render started with a non-empty stack");
            stack.push(ResolutionFrame {
                slug: TOP_FRAME_SLUG.to_string(),
                path: origin,
                call_line: 0,
                body_line_offset: line_offset,
            });
        }
        self.failure.lock().expect("failure slot lock").take();

        let mut context = TeraContext::new();
        for (name, value) in scope {
            context.insert(name, value);
        }

        let result = self.evaluate(body, &context);
        self.stack.lock().expect("resolution stack lock").pop();
        result
    }

    /// Expand one reference and return its rendered text.
    ///
    /// `ref_line` is the body-relative line of the reference in the caller;
    /// `indent` is the whitespace prefix of that line, applied to every
    /// line after the first of a multi-line expansion.
    pub fn resolve_reference(
        &self,
        slug: &str,
        positional: &[Value],
        keywords: &[(String, Value)],
        ref_line: usize,
        indent: &str,
    ) -> Result<String> {
        let (caller_file, caller_line, top_file) = {
            let stack = self.stack.lock().expect("resolution stack lock");
            let top = stack.last().expect("stack holds the top frame during a render");
            (
                top.path.clone(),
                top.body_line_offset + ref_line,
                stack.first().and_then(|frame| frame.path.clone()),
            )
        };

        PromptContext::validate_slug(slug)?;

        let path = self
            .context
            .locate(slug)
            .map_err(|searched| PrompyError::MissingFragment {
                slug: slug.to_string(),
                file: caller_file.clone(),
                line: caller_line,
                searched,
            })?;

        {
            let stack = self.stack.lock().expect("resolution stack lock");
            if stack.iter().any(|frame| frame.slug == slug) {
                let mut chain: Vec<String> =
                    stack.iter().map(|frame| frame.slug.clone()).collect();
                chain.push(slug.to_string());
                return Err(PrompyError::Cycle {
                    chain,
                    file: top_file,
                    line: caller_line,
                });
            }
        }

        let fragment = self.load_cached(&path, slug)?;

        let scope =
            self.bind_arguments(&fragment, positional, keywords, &caller_file, caller_line)?;

        let (body, leading_lines) = trimmed_body(&fragment.body);
        self.stack
            .lock()
            .expect("resolution stack lock")
            .push(ResolutionFrame {
                slug: slug.to_string(),
                path: Some(fragment.path.clone()),
                call_line: caller_line,
                body_line_offset: fragment.body_line_offset + leading_lines,
            });

        let result = self.evaluate(body, &scope);
        self.stack.lock().expect("resolution stack lock").pop();

        Ok(apply_indent(&result?, indent))
    }

    /// Evaluate a body with the reserved function registered.
    ///
    /// Error attribution uses the frame on top of the stack, which the
    /// caller has already pushed.
    fn evaluate(&self, body: &str, context: &TeraContext) -> Result<String> {
        let site = {
            let stack = self.stack.lock().expect("resolution stack lock");
            let top = stack.last().expect("stack holds a frame during evaluation");
            EvalSite {
                file: top.path.clone(),
                line_offset: top.body_line_offset,
            }
        };

        let mut tera = Tera::default();
        let resolver = self
            .self_ref
            .upgrade()
            .expect("resolver outlives its renders");
        tera.register_function(
            INCLUDE_FUNCTION,
            move |args: &HashMap<String, Value>| resolver.include_fragment(args),
        );

        renderer::render_template(&mut tera, body, context, &site).map_err(|err| {
            // An error raised inside a nested resolution was captured in
            // structured form before the host engine wrapped it in text.
            match self.failure.lock().expect("failure slot lock").take() {
                Some(captured) => captured,
                None => err,
            }
        })
    }

    /// The reserved template function: unpacks the call and delegates to
    /// [`Self::resolve_reference`].
    fn include_fragment(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let slug = match args.get("__slug").and_then(Value::as_str) {
            Some(slug) => slug,
            None => return Err(tera::Error::msg("include_fragment called without __slug")),
        };
        let ref_line = args
            .get("__line")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let indent = args
            .get("__indent")
            .and_then(Value::as_str)
            .unwrap_or("");

        let mut positional = Vec::new();
        while let Some(value) = args.get(&format!("__pos{}", positional.len())) {
            positional.push(value.clone());
        }
        let mut keywords: Vec<(String, Value)> = args
            .iter()
            .filter(|(name, _)| !name.starts_with("__"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        keywords.sort_by(|a, b| a.0.cmp(&b.0));

        match self.resolve_reference(slug, &positional, &keywords, ref_line, indent) {
            Ok(rendered) => Ok(Value::String(rendered)),
            Err(err) => {
                let message = err.to_string();
                let mut slot = self.failure.lock().expect("failure slot lock");
                if slot.is_none() {
                    *slot = Some(err);
                }
                Err(tera::Error::msg(message))
            }
        }
    }

    /// Load a fragment through the per-render cache.
    fn load_cached(&self, path: &std::path::Path, slug: &str) -> Result<Arc<PromptFile>> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut cache = self.cache.lock().expect("fragment cache lock");
        if let Some(cached) = cache.get(&key) {
            return Ok(Arc::clone(cached));
        }
        let loaded = Arc::new(PromptFile::load(path, Some(slug))?);
        cache.insert(key, Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Build the callee's scope from the call arguments.
    ///
    /// Positional arguments bind to declared names in declaration order and
    /// may not exceed the declared count. Keyword arguments bind by name
    /// and override positionals; undeclared keywords pass through silently.
    /// Remaining declared arguments take their defaults, and a required
    /// argument left unbound fails the render.
    fn bind_arguments(
        &self,
        fragment: &PromptFile,
        positional: &[Value],
        keywords: &[(String, Value)],
        caller_file: &Option<PathBuf>,
        caller_line: usize,
    ) -> Result<TeraContext> {
        let declared = &fragment.arguments;
        if positional.len() > declared.len() {
            return Err(PrompyError::TooManyArguments {
                slug: fragment.slug.clone(),
                declared: declared.len(),
                given: positional.len(),
                file: caller_file.clone(),
                line: caller_line,
            });
        }

        let mut bound: HashMap<String, String> = HashMap::new();
        for (index, value) in positional.iter().enumerate() {
            bound.insert(declared[index].0.clone(), stringify(value));
        }
        for (name, value) in keywords {
            bound.insert(name.clone(), stringify(value));
        }
        for (name, default) in declared {
            if bound.contains_key(name) {
                continue;
            }
            match default {
                Some(value) => {
                    bound.insert(name.clone(), value.clone());
                }
                None => {
                    return Err(PrompyError::MissingArgument {
                        name: name.clone(),
                        slug: fragment.slug.clone(),
                        file: caller_file.clone(),
                        line: caller_line,
                    });
                }
            }
        }

        let mut context = TeraContext::new();
        for (name, value) in &bound {
            context.insert(name, value);
        }
        Ok(context)
    }
}

/// Trim a fragment body for evaluation, reporting how many leading lines
/// were dropped so diagnostics keep pointing at the right file lines.
fn trimmed_body(body: &str) -> (&str, usize) {
    let without_leading = body.trim_start();
    let leading_lines = body[..body.len() - without_leading.len()]
        .matches('\n')
        .count();
    (without_leading.trim_end(), leading_lines)
}

/// Argument values and expansions are strings in fragment scopes.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Indent every line after the first with the reference's line prefix.
fn apply_indent(text: &str, indent: &str) -> String {
    if indent.is_empty() || !text.contains('\n') {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let mut out = String::with_capacity(text.len() + indent.len() * 4);
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
        }
        out.push_str(line);
    }
    out
}
