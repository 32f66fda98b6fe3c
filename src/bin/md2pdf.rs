//! CLI binary for md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionOptions` / `PublishOptions` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use md2pdf::{
    convert_to_file, publish_book, ConversionOptions, ConversionRequest, ConversionStats,
    FallbackRenderer, HeaderFooterOptions, PublishOptions, RendererKind,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert next to the input (notes.pdf)
  md2pdf convert notes.md

  # Explicit output, table of contents, US Letter
  md2pdf convert report.md -o out/report.pdf --toc --page-size Letter

  # Math and diagrams, remote assets allowed
  md2pdf convert paper.md --math --mermaid --allow-remote

  # No browser available: text-only output
  md2pdf convert notes.md --renderer lite

  # Publish a book from its manifest
  md2pdf book book.yaml --profile book-6x9

  # Machine-readable conversion stats
  md2pdf --json convert notes.md

RENDERERS:
  chromium  (default) headless Chrome/Chromium; full CSS, header/footer, diagrams
  lite      built-in text layout; no browser needed

  When chromium fails the conversion falls back to lite unless
  --fallback none or --require-chromium is given.

ENVIRONMENT VARIABLES:
  CHROME_PATH          Browser binary tried when the default launch fails
  GOOGLE_CHROME_PATH   Same, checked after CHROME_PATH
  RUST_LOG             Override log filtering (e.g. md2pdf=debug)
"#;

/// Convert Markdown documents and books to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown documents and multi-chapter books to PDF",
    long_about = "Convert Markdown (CommonMark + GFM, footnotes, math, diagrams, front matter) \
to print-ready PDF through a headless browser, with a browser-free fallback renderer. \
Books are assembled from a YAML manifest listing chapters and appendices.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print conversion stats as JSON on stdout.
    #[arg(long, global = true, env = "MD2PDF_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one Markdown file.
    Convert(ConvertArgs),
    /// Publish a book from a YAML manifest.
    Book(BookArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Markdown file to convert.
    input: PathBuf,

    /// Write the PDF here. Default: the input path with a `.pdf` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Page size: A4, Letter, Legal, ... or explicit `8in x 10in`.
    #[arg(long, env = "MD2PDF_PAGE_SIZE", default_value = "A4")]
    page_size: String,

    /// CSS margin shorthand, 1 to 4 values (e.g. `1in` or `20mm,15mm`).
    #[arg(long, env = "MD2PDF_MARGIN", default_value = "1in,1in,1in,1in")]
    margin: String,

    /// Built-in theme name.
    #[arg(long, env = "MD2PDF_THEME", default_value = "default")]
    theme: String,

    /// Standalone CSS file used as the theme.
    #[arg(long)]
    theme_file: Option<PathBuf>,

    /// Theme directory (theme.css plus optional templates).
    #[arg(long)]
    theme_dir: Option<PathBuf>,

    /// Theme variable override, `key=value`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    overrides: Vec<(String, String)>,

    /// Markdown file rendered as the cover page.
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Title shown in the page header.
    #[arg(long)]
    header_title: Option<String>,

    /// Omit page numbers from the footer.
    #[arg(long)]
    no_page_numbers: bool,

    /// Insert a table of contents under a "Contents" or "TOC" heading.
    #[arg(long)]
    toc: bool,

    /// Disable footnote syntax.
    #[arg(long)]
    no_footnotes: bool,

    /// Render `$...$` and `$$...$$` math.
    #[arg(long)]
    math: bool,

    /// Render ```mermaid blocks as diagrams.
    #[arg(long)]
    mermaid: bool,

    /// Treat a leading `---` block as ordinary Markdown instead of front matter.
    #[arg(long)]
    no_frontmatter: bool,

    /// Allow remote images and stylesheets.
    #[arg(long, env = "MD2PDF_ALLOW_REMOTE")]
    allow_remote: bool,

    /// Run code blocks through their language formatter.
    #[arg(long)]
    format_code: bool,

    /// Syntax highlighting theme.
    #[arg(long, default_value = md2pdf::config::DEFAULT_CODE_THEME)]
    code_theme: String,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug)]
struct BookArgs {
    /// Book manifest (YAML).
    manifest: PathBuf,

    /// Write the PDF here. Default: `<manifest dir>/<title>.pdf`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print profile: a4, letter, book-6x9.
    #[arg(long)]
    profile: Option<String>,

    /// Page size; overrides the manifest and profile.
    #[arg(long)]
    page_size: Option<String>,

    /// Margins; overrides the manifest and profile.
    #[arg(long)]
    margin: Option<String>,

    #[command(flatten)]
    render: RenderArgs,
}

/// Renderer selection shared by both subcommands.
#[derive(Args, Debug)]
struct RenderArgs {
    /// Page renderer.
    #[arg(long, env = "MD2PDF_RENDERER", value_enum)]
    renderer: Option<RendererArg>,

    /// Renderer used when the primary one fails.
    #[arg(long, value_enum, default_value = "lite")]
    fallback: FallbackArg,

    /// Fail instead of falling back when the browser renderer fails.
    #[arg(long)]
    require_chromium: bool,

    /// Browser executable to launch.
    #[arg(long, env = "MD2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Local diagram runtime script, inlined into the document.
    #[arg(long)]
    mermaid_script: Option<PathBuf>,

    /// Render timeout in seconds.
    #[arg(long, env = "MD2PDF_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Cache directory for plugins. Default: `.md2pdf-cache` in the working directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RendererArg {
    Chromium,
    Lite,
}

impl From<RendererArg> for RendererKind {
    fn from(v: RendererArg) -> Self {
        match v {
            RendererArg::Chromium => RendererKind::Chromium,
            RendererArg::Lite => RendererKind::Lite,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FallbackArg {
    Lite,
    None,
}

impl From<FallbackArg> for FallbackRenderer {
    fn from(v: FallbackArg) -> Self {
        match v {
            FallbackArg::Lite => FallbackRenderer::Lite,
            FallbackArg::None => FallbackRenderer::None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let spinner = show_progress.then(new_spinner);

    // ── Run conversion ───────────────────────────────────────────────────
    let (stats, output_path) = match cli.command {
        Command::Convert(ref args) => {
            if let Some(ref bar) = spinner {
                bar.set_message(format!("Converting {}", args.input.display()));
            }
            let output_path = args
                .output
                .clone()
                .unwrap_or_else(|| args.input.with_extension("pdf"));
            let options = build_options(args, cli.verbose)?;
            let stats = convert_to_file(ConversionRequest::file(&args.input), &output_path, &options)
                .await
                .with_context(|| format!("Failed to convert {}", args.input.display()));
            (stats, output_path)
        }
        Command::Book(ref args) => {
            if let Some(ref bar) = spinner {
                bar.set_message(format!("Publishing {}", args.manifest.display()));
            }
            let publish = build_publish_options(args)?;
            let result = publish_book(&args.manifest, &publish)
                .await
                .with_context(|| format!("Failed to publish {}", args.manifest.display()));
            match result {
                Ok(output) => {
                    let path = output.path().map(Path::to_path_buf).unwrap_or_default();
                    (Ok(output.stats), path)
                }
                Err(e) => (Err(e), PathBuf::new()),
            }
        }
    };

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let stats = stats?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        print_summary(&stats, &output_path);
    }

    Ok(())
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_summary(stats: &ConversionStats, output_path: &Path) {
    let mark = if stats.fallback_reason.is_some() {
        cyan("⚠")
    } else {
        green("✔")
    };
    eprintln!(
        "{}  {}  {}ms  →  {}",
        mark,
        dim(&format!("{} bytes via {}", stats.pdf_bytes, stats.renderer)),
        stats.total_duration_ms,
        bold(&output_path.display().to_string()),
    );
    if let Some(ref reason) = stats.fallback_reason {
        eprintln!("   {} {}", cyan("fell back to lite:"), dim(reason));
    }
}

/// Map `convert` args to `ConversionOptions`.
fn build_options(args: &ConvertArgs, verbose: bool) -> Result<ConversionOptions> {
    let mut builder = ConversionOptions::builder()
        .page_size(&args.page_size)
        .margin(&args.margin)
        .theme(&args.theme)
        .toc(args.toc)
        .footnotes(!args.no_footnotes)
        .math(args.math)
        .mermaid(args.mermaid)
        .frontmatter(!args.no_frontmatter)
        .allow_remote(args.allow_remote)
        .format_code(args.format_code)
        .code_theme(&args.code_theme)
        .debug(verbose);

    if let Some(ref path) = args.theme_file {
        builder = builder.theme_file(path);
    }
    if let Some(ref path) = args.theme_dir {
        builder = builder.theme_dir(path);
    }
    for (key, value) in &args.overrides {
        builder = builder.theme_override(key, value);
    }
    if let Some(ref path) = args.cover {
        builder = builder.cover_path(path);
    }
    if args.header_title.is_some() {
        builder = builder.header(HeaderFooterOptions {
            title: args.header_title.clone(),
            ..Default::default()
        });
    }
    if args.no_page_numbers {
        builder = builder.footer(HeaderFooterOptions {
            page_numbers: Some(false),
            ..Default::default()
        });
    }

    apply_render_args(builder, &args.render)
        .build()
        .context("Invalid configuration")
}

/// Map `book` args to `PublishOptions`.
fn build_publish_options(args: &BookArgs) -> Result<PublishOptions> {
    let base = apply_render_args(ConversionOptions::builder(), &args.render)
        .build()
        .context("Invalid configuration")?;
    Ok(PublishOptions {
        output_path: args.output.clone(),
        profile: args.profile.clone(),
        page_size: args.page_size.clone(),
        margin: args.margin.clone(),
        renderer: args.render.renderer.map(Into::into),
        require_chromium: args.render.require_chromium.then_some(true),
        base,
    })
}

fn apply_render_args(
    mut builder: md2pdf::ConversionOptionsBuilder,
    render: &RenderArgs,
) -> md2pdf::ConversionOptionsBuilder {
    builder = builder
        .fallback_renderer(render.fallback.into())
        .require_chromium(render.require_chromium)
        .timeout_ms(render.timeout.saturating_mul(1000));
    if let Some(kind) = render.renderer {
        builder = builder.renderer(kind.into());
    }
    if let Some(ref path) = render.chrome {
        builder = builder.chrome_executable(path);
    }
    if let Some(ref path) = render.mermaid_script {
        builder = builder.mermaid_script(path);
    }
    if let Some(ref dir) = render.cache_dir {
        builder = builder.cache_dir(dir);
    }
    builder
}

/// Parse `key=value` for `--set`.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
