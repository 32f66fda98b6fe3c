//! Code formatter registry used by the code-formatting document transform.
//!
//! Formatting is best effort. A formatter returns `None` when it cannot
//! handle the input (parse error, tool not installed, non-zero exit) and the
//! caller leaves the block untouched. External tools get a bounded wait
//! ([`FORMATTER_TIMEOUT`] by default) and are killed when they overrun.
//!
//! | Language | Formatter |
//! |----------|-----------|
//! | `json`   | in-process, tab indent |
//! | `rust`, `rs` | `rustfmt` on `PATH` |
//! | `js`, `ts`, `jsx`, `tsx`, `css`, `scss`, `html`, `md`, `markdown`, `yaml`, `graphql` | `prettier` on `PATH` |

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// How long an external formatter may run before it is killed.
pub const FORMATTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalise a fenced-code info string to a language key.
///
/// Lower-cased first whitespace-delimited token, with the usual short
/// aliases applied. Returns `None` for an empty info string.
pub fn normalize_language(info: &str) -> Option<String> {
    let lang = info.split_whitespace().next()?.to_lowercase();
    let lang = match lang.as_str() {
        "javascript" => "js".to_string(),
        "typescript" => "ts".to_string(),
        "yml" => "yaml".to_string(),
        _ => lang,
    };
    Some(lang)
}

/// A formatter for one language.
pub trait CodeFormatter: Send + Sync {
    /// Formatted code, or `None` to leave the input as it is.
    fn format(&self, code: &str) -> Option<String>;
}

/// In-process JSON pretty printer.
#[derive(Debug, Default)]
pub struct JsonFormatter;

impl CodeFormatter for JsonFormatter {
    fn format(&self, code: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(code).ok()?;
        let mut out = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, fmt);
        value.serialize(&mut ser).ok()?;
        let mut text = String::from_utf8(out).ok()?;
        text.push('\n');
        Some(text)
    }
}

/// Pipes code through an external tool's stdin/stdout.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandFormatter {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout: FORMATTER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn prettier(parser: &str) -> Self {
        Self::new("prettier", &["--parser", parser])
    }
}

impl CodeFormatter for CommandFormatter {
    fn format(&self, code: &str) -> Option<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| debug!("{} unavailable: {}", self.program, e))
            .ok()?;

        // Feed stdin and drain stdout off-thread so a chatty tool cannot
        // block on a full pipe while we wait on it.
        let stdin = child.stdin.take();
        let input = code.to_owned();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                let _ = stdin.write_all(input.as_bytes());
            }
        });
        let stdout = child.stdout.take();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stdout) = stdout {
                let _ = stdout.read_to_end(&mut buf);
            }
            buf
        });

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!("{} still running after {:?}, killing it", self.program, self.timeout);
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Err(e) => {
                debug!("waiting on {} failed: {}", self.program, e);
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        };

        let _ = writer.join();
        let stdout = reader.join().ok()?;
        if !status.success() {
            debug!("{} exited with {}", self.program, status);
            return None;
        }
        String::from_utf8(stdout).ok()
    }
}

/// Language key → formatter.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Arc<dyn CodeFormatter>>,
}

impl FormatterRegistry {
    /// Registry with the built-in formatters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register("json", Arc::new(JsonFormatter));

        let rustfmt: Arc<dyn CodeFormatter> = Arc::new(CommandFormatter::new("rustfmt", &["--edition", "2021"]));
        registry.register("rust", Arc::clone(&rustfmt));
        registry.register("rs", rustfmt);

        for (lang, parser) in [
            ("js", "babel"),
            ("jsx", "babel"),
            ("ts", "typescript"),
            ("tsx", "typescript"),
            ("css", "css"),
            ("scss", "scss"),
            ("html", "html"),
            ("md", "markdown"),
            ("markdown", "markdown"),
            ("yaml", "yaml"),
            ("graphql", "graphql"),
        ] {
            registry.register(lang, Arc::new(CommandFormatter::prettier(parser)));
        }
        registry
    }

    pub fn register(&mut self, language: &str, formatter: Arc<dyn CodeFormatter>) {
        self.formatters.insert(language.to_string(), formatter);
    }

    /// Format `code` as `language`; `None` when no formatter applies or it failed.
    pub fn format(&self, language: &str, code: &str) -> Option<String> {
        self.formatters.get(language)?.format(code)
    }
}

/// Built-in registry shared by all conversions.
pub static DEFAULT_FORMATTERS: Lazy<FormatterRegistry> = Lazy::new(FormatterRegistry::with_defaults);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn language_normalisation() {
        assert_eq!(normalize_language("JavaScript").as_deref(), Some("js"));
        assert_eq!(normalize_language("typescript {title=x}").as_deref(), Some("ts"));
        assert_eq!(normalize_language("yml").as_deref(), Some("yaml"));
        assert_eq!(normalize_language("Rust").as_deref(), Some("rust"));
        assert_eq!(normalize_language("   "), None);
    }

    #[test]
    fn json_formats_with_tabs_and_keeps_key_order() {
        let out = JsonFormatter.format(r#"{"b":1,"a":[1,2]}"#).unwrap();
        assert_eq!(out, "{\n\t\"b\": 1,\n\t\"a\": [\n\t\t1,\n\t\t2\n\t]\n}\n");
    }

    #[test]
    fn json_formatting_is_idempotent() {
        let once = JsonFormatter.format(r#"{"name": "md2pdf", "tags": ["a"]}"#).unwrap();
        let twice = JsonFormatter.format(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn invalid_json_is_left_alone() {
        assert_eq!(JsonFormatter.format("{not json"), None);
    }

    #[test]
    fn missing_tool_yields_none() {
        let f = CommandFormatter::new("md2pdf-definitely-not-a-formatter", &[]);
        assert_eq!(f.format("x"), None);
    }

    #[cfg(unix)]
    #[test]
    fn hung_tool_is_killed_after_timeout() {
        let f = CommandFormatter::new("sleep", &["30"]).with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        assert_eq!(f.format("x"), None);
        assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn large_input_streams_through_without_deadlock() {
        let code = "x".repeat(1 << 20);
        let out = CommandFormatter::new("cat", &[]).format(&code).unwrap();
        assert_eq!(out.len(), code.len());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_yields_none() {
        assert_eq!(CommandFormatter::new("false", &[]).format("x"), None);
    }

    #[test]
    fn unknown_language_yields_none() {
        assert_eq!(DEFAULT_FORMATTERS.format("cobol", "DISPLAY 'HI'."), None);
    }
}
