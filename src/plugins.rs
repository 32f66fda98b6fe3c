//! Plugin hooks: four ordered extension points around the conversion pipeline.
//!
//! A [`Plugin`] is a name plus up to four optional hooks. Absent hooks are
//! identity/no-op. Hooks of one category run in list order, each receiving the
//! previous hook's output, and a category finishes before the next begins:
//!
//! ```text
//! pre_parse(markdown) ─▶ post_parse(tree) ─▶ pre_render(html) ─▶ post_render(pdf)
//! ```
//!
//! Hook errors are not recovered: the first failing hook aborts the conversion.
//!
//! # Example
//! ```rust
//! use md2pdf::Plugin;
//!
//! let shout = Plugin::new("shout")
//!     .pre_parse(|markdown, ctx| {
//!         ctx.logger.info("upper-casing input");
//!         Ok(markdown.to_uppercase())
//!     });
//! assert!(shout.hooks.pre_parse.is_some());
//! ```

use crate::assets::{resolve_asset, AssetPolicy};
use crate::error::Md2PdfError;
use comrak::nodes::AstNode;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Error type plugin hooks return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type PreParseHook = Arc<dyn Fn(String, &PluginContext) -> Result<String, HookError> + Send + Sync>;
pub type PostParseHook =
    Arc<dyn for<'a> Fn(&'a AstNode<'a>, &PluginContext) -> Result<(), HookError> + Send + Sync>;
pub type PreRenderHook = Arc<dyn Fn(String, &PluginContext) -> Result<String, HookError> + Send + Sync>;
pub type PostRenderHook = Arc<dyn Fn(Vec<u8>, &PluginContext) -> Result<Vec<u8>, HookError> + Send + Sync>;

/// The optional hook set of a plugin.
#[derive(Clone, Default)]
pub struct PluginHooks {
    /// Mutates raw Markdown before front matter is split off.
    pub pre_parse: Option<PreParseHook>,
    /// Inspects or mutates the document tree once it is fully built.
    pub post_parse: Option<PostParseHook>,
    /// Mutates the assembled HTML document.
    pub pre_render: Option<PreRenderHook>,
    /// Mutates the rendered PDF bytes.
    pub post_render: Option<PostRenderHook>,
}

/// A named set of hooks.
#[derive(Clone)]
pub struct Plugin {
    pub name: String,
    pub hooks: PluginHooks,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("pre_parse", &self.hooks.pre_parse.is_some())
            .field("post_parse", &self.hooks.post_parse.is_some())
            .field("pre_render", &self.hooks.pre_render.is_some())
            .field("post_render", &self.hooks.post_render.is_some())
            .finish()
    }
}

impl Plugin {
    /// A plugin with no hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: PluginHooks::default(),
        }
    }

    pub fn pre_parse<F>(mut self, f: F) -> Self
    where
        F: Fn(String, &PluginContext) -> Result<String, HookError> + Send + Sync + 'static,
    {
        self.hooks.pre_parse = Some(Arc::new(f));
        self
    }

    pub fn post_parse<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a AstNode<'a>, &PluginContext) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.post_parse = Some(Arc::new(f));
        self
    }

    pub fn pre_render<F>(mut self, f: F) -> Self
    where
        F: Fn(String, &PluginContext) -> Result<String, HookError> + Send + Sync + 'static,
    {
        self.hooks.pre_render = Some(Arc::new(f));
        self
    }

    pub fn post_render<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<u8>, &PluginContext) -> Result<Vec<u8>, HookError> + Send + Sync + 'static,
    {
        self.hooks.post_render = Some(Arc::new(f));
        self
    }
}

/// Three-level logger handed to plugins; forwards to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct PluginLogger {
    plugin: String,
    verbose: bool,
}

impl PluginLogger {
    pub fn info(&self, msg: &str) {
        if self.verbose {
            info!(plugin = %self.plugin, "{}", msg);
        } else {
            debug!(plugin = %self.plugin, "{}", msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        warn!(plugin = %self.plugin, "{}", msg);
    }

    pub fn error(&self, msg: &str) {
        error!(plugin = %self.plugin, "{}", msg);
    }
}

/// What a hook can see of the running conversion.
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Process working directory.
    pub cwd: PathBuf,
    /// Cache directory reserved for plugin use; exists on disk.
    pub cache_dir: PathBuf,
    pub logger: PluginLogger,
    assets: AssetPolicy,
}

impl PluginContext {
    pub fn new(cwd: PathBuf, cache_dir: PathBuf, assets: AssetPolicy, verbose: bool) -> Self {
        Self {
            cwd,
            cache_dir,
            logger: PluginLogger {
                plugin: String::new(),
                verbose,
            },
            assets,
        }
    }

    /// Resolve an asset URL against the document's base directory and remote policy.
    pub fn resolve_asset(&self, url: &str) -> Result<String, Md2PdfError> {
        resolve_asset(url, &self.assets)
    }

    fn scoped(&self, plugin: &str) -> PluginContext {
        let mut ctx = self.clone();
        ctx.logger.plugin = plugin.to_string();
        ctx
    }
}

fn hook_error(plugin: &Plugin, hook: &'static str, err: HookError) -> Md2PdfError {
    Md2PdfError::Plugin {
        plugin: plugin.name.clone(),
        hook,
        message: err.to_string(),
    }
}

/// Fold `pre_parse` hooks over the raw Markdown.
pub fn run_pre_parse(markdown: String, plugins: &[Plugin], ctx: &PluginContext) -> Result<String, Md2PdfError> {
    let mut current = markdown;
    for plugin in plugins {
        if let Some(ref hook) = plugin.hooks.pre_parse {
            debug!("pre_parse: {}", plugin.name);
            current = hook(current, &ctx.scoped(&plugin.name)).map_err(|e| hook_error(plugin, "pre_parse", e))?;
        }
    }
    Ok(current)
}

/// Run `post_parse` hooks against the document tree.
pub fn run_post_parse<'a>(root: &'a AstNode<'a>, plugins: &[Plugin], ctx: &PluginContext) -> Result<(), Md2PdfError> {
    for plugin in plugins {
        if let Some(ref hook) = plugin.hooks.post_parse {
            debug!("post_parse: {}", plugin.name);
            hook(root, &ctx.scoped(&plugin.name)).map_err(|e| hook_error(plugin, "post_parse", e))?;
        }
    }
    Ok(())
}

/// Fold `pre_render` hooks over the assembled HTML document.
pub fn run_pre_render(html: String, plugins: &[Plugin], ctx: &PluginContext) -> Result<String, Md2PdfError> {
    let mut current = html;
    for plugin in plugins {
        if let Some(ref hook) = plugin.hooks.pre_render {
            debug!("pre_render: {}", plugin.name);
            current = hook(current, &ctx.scoped(&plugin.name)).map_err(|e| hook_error(plugin, "pre_render", e))?;
        }
    }
    Ok(current)
}

/// Fold `post_render` hooks over the PDF bytes.
pub fn run_post_render(pdf: Vec<u8>, plugins: &[Plugin], ctx: &PluginContext) -> Result<Vec<u8>, Md2PdfError> {
    let mut current = pdf;
    for plugin in plugins {
        if let Some(ref hook) = plugin.hooks.post_render {
            debug!("post_render: {}", plugin.name);
            current = hook(current, &ctx.scoped(&plugin.name)).map_err(|e| hook_error(plugin, "post_render", e))?;
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comrak::nodes::NodeValue;
    use comrak::{parse_document, Arena, Options};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx() -> PluginContext {
        PluginContext::new(
            PathBuf::from("."),
            PathBuf::from(".md2pdf-cache"),
            AssetPolicy::new(".", false),
            false,
        )
    }

    #[test]
    fn pre_parse_folds_in_list_order() {
        let plugins = vec![
            Plugin::new("a").pre_parse(|s, _| Ok(format!("{s}a"))),
            Plugin::new("none"),
            Plugin::new("b").pre_parse(|s, _| Ok(format!("{s}b"))),
        ];
        let out = run_pre_parse("x".into(), &plugins, &ctx()).unwrap();
        assert_eq!(out, "xab");
    }

    #[test]
    fn failing_hook_aborts_and_names_plugin() {
        let plugins = vec![
            Plugin::new("bad").pre_render(|_, _| Err("nope".into())),
            Plugin::new("never").pre_render(|_, _| panic!("must not run")),
        ];
        let err = run_pre_render("<html>".into(), &plugins, &ctx()).unwrap_err();
        assert!(matches!(err, Md2PdfError::Plugin { ref plugin, hook: "pre_render", .. } if plugin == "bad"));
    }

    #[test]
    fn post_render_sees_previous_output() {
        let plugins = vec![
            Plugin::new("one").post_render(|mut pdf, _| {
                pdf.push(1);
                Ok(pdf)
            }),
            Plugin::new("two").post_render(|mut pdf, _| {
                pdf.push(2);
                Ok(pdf)
            }),
        ];
        assert_eq!(run_post_render(vec![0], &plugins, &ctx()).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn post_parse_receives_tree() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let plugins = vec![Plugin::new("count").post_parse(move |root, _| {
            let headings = root
                .descendants()
                .filter(|n| matches!(n.data.borrow().value, NodeValue::Heading(_)))
                .count();
            counter.store(headings, Ordering::SeqCst);
            Ok(())
        })];

        let arena = Arena::new();
        let root = parse_document(&arena, "# One\n\n## Two\n", &Options::default());
        run_post_parse(root, &plugins, &ctx()).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn context_resolves_assets_with_policy() {
        let err = ctx().resolve_asset("https://example.com/x.css").unwrap_err();
        assert!(matches!(err, Md2PdfError::RemoteDisabled { .. }));
    }
}
