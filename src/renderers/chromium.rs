//! Headless browser renderer over the Chrome DevTools Protocol.
//!
//! Each call launches its own browser with a throwaway profile directory and
//! closes it before returning, on success and on failure alike.
//!
//! ```text
//! launch ─▶ new page ─▶ [intercept http(s)] ─▶ load file:// document
//!        ─▶ print media ─▶ fonts ready ─▶ [diagram runtime ─▶ fonts ready]
//!        ─▶ printToPDF ─▶ any request blocked? ─▶ Err(RemoteBlocked) | Ok(bytes)
//! ```
//!
//! Every protocol operation is bounded by the request timeout.

use super::{RenderRequest, Renderer};
use crate::assets::{is_remote, to_file_url};
use crate::error::Md2PdfError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetEmulatedMediaParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::ErrorReason;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const NAME: &str = "chromium";

const FONTS_READY: &str = "document.fonts ? document.fonts.ready.then(() => true) : true";

const RUN_MERMAID: &str = r#"(async () => {
  const mermaid = window.mermaid;
  if (!mermaid) return false;
  mermaid.initialize({ startOnLoad: false, theme: "neutral", securityLevel: "strict", deterministicIds: true });
  await mermaid.run({ querySelector: ".mermaid" });
  return true;
})()"#;

const LAUNCH_ARGS: [&str; 4] = [
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-crash-reporter",
    "--disable-features=Crashpad",
];

/// Browser-engine renderer.
#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    /// `executable` pins the browser binary; `None` discovers one.
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

impl Renderer for ChromiumRenderer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn render(&self, request: RenderRequest) -> BoxFuture<'_, Result<Vec<u8>, Md2PdfError>> {
        Box::pin(self.render_pdf(request))
    }
}

/// A running browser plus its event-loop task.
struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: tempfile::TempDir,
}

impl Session {
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("browser close: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

impl ChromiumRenderer {
    async fn render_pdf(&self, request: RenderRequest) -> Result<Vec<u8>, Md2PdfError> {
        let session = self.launch(request.timeout).await?;
        let blocked = Arc::new(Mutex::new(Vec::new()));
        let result = print_page(&session.browser, &request, Arc::clone(&blocked)).await;
        session.close().await;

        let pdf = result?;
        let first_blocked = blocked.lock().ok().and_then(|b| b.first().cloned());
        if let Some(url) = first_blocked {
            return Err(Md2PdfError::RemoteBlocked { url });
        }
        Ok(pdf)
    }

    async fn launch(&self, timeout: Duration) -> Result<Session, Md2PdfError> {
        if let Some(ref exe) = self.executable {
            return launch_with(Some(exe), timeout).await;
        }
        match launch_with(None, timeout).await {
            Ok(session) => Ok(session),
            Err(e) => match system_browser() {
                Some(exe) => {
                    warn!("Browser launch failed ({}), retrying with {}", e, exe.display());
                    launch_with(Some(&exe), timeout).await
                }
                None => Err(e),
            },
        }
    }
}

async fn launch_with(executable: Option<&Path>, timeout: Duration) -> Result<Session, Md2PdfError> {
    let profile = tempfile::Builder::new()
        .prefix("md2pdf-profile-")
        .tempdir()
        .map_err(|e| Md2PdfError::BrowserLaunch(format!("profile directory: {e}")))?;

    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .user_data_dir(profile.path())
        .request_timeout(timeout)
        .args(LAUNCH_ARGS);
    if let Some(exe) = executable {
        builder = builder.chrome_executable(exe);
    }
    let config = builder.build().map_err(Md2PdfError::BrowserLaunch)?;

    let (browser, mut handler) = match tokio::time::timeout(timeout, Browser::launch(config)).await {
        Ok(launched) => launched.map_err(|e| Md2PdfError::BrowserLaunch(e.to_string()))?,
        Err(_) => return Err(timed_out(timeout)),
    };
    let handler = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });
    debug!("browser launched");

    Ok(Session {
        browser,
        handler,
        _profile: profile,
    })
}

/// First existing browser from the environment or common install paths.
pub fn system_browser() -> Option<PathBuf> {
    let from_env = ["CHROME_PATH", "GOOGLE_CHROME_PATH"]
        .into_iter()
        .filter_map(|var| std::env::var_os(var))
        .map(PathBuf::from);
    let common = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .into_iter()
    .map(PathBuf::from);

    from_env.chain(common).find(|p| p.is_file())
}

async fn print_page(
    browser: &Browser,
    request: &RenderRequest,
    blocked: Arc<Mutex<Vec<String>>>,
) -> Result<Vec<u8>, Md2PdfError> {
    let timeout = request.timeout;
    let page = bounded(timeout, browser.new_page("about:blank")).await?;

    let interceptor = if request.allow_remote {
        None
    } else {
        Some(block_remote(&page, timeout, blocked).await?)
    };

    let result = async {
        let document = write_document(&request.html, &request.base_dir).await?;
        let url = to_file_url(document.path())?;
        bounded(timeout, page.goto(url)).await?;

        bounded(
            timeout,
            page.execute(SetEmulatedMediaParams::builder().media("print").build()),
        )
        .await?;
        evaluate(&page, timeout, FONTS_READY).await?;

        if request.mermaid {
            evaluate(&page, timeout, RUN_MERMAID).await?;
            evaluate(&page, timeout, FONTS_READY).await?;
        }

        bounded(timeout, page.pdf(pdf_params(request))).await
    }
    .await;

    if let Some(task) = interceptor {
        task.abort();
    }
    result
}

/// Fail every `http(s)` request, recording its URL; let everything else through.
async fn block_remote(
    page: &Page,
    timeout: Duration,
    blocked: Arc<Mutex<Vec<String>>>,
) -> Result<JoinHandle<()>, Md2PdfError> {
    let mut paused = bounded(timeout, page.event_listener::<EventRequestPaused>()).await?;
    let pattern = RequestPattern::builder().url_pattern("*").build();
    bounded(timeout, page.execute(EnableParams::builder().pattern(pattern).build())).await?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let url = event.request.url.clone();
            let outcome = if is_remote(&url) {
                warn!("Blocked remote request: {}", url);
                if let Ok(mut list) = blocked.lock() {
                    list.push(url);
                }
                page.execute(FailRequestParams::new(
                    event.request_id.clone(),
                    ErrorReason::BlockedByClient,
                ))
                .await
                .map(|_| ())
            } else {
                page.execute(ContinueRequestParams::new(event.request_id.clone()))
                    .await
                    .map(|_| ())
            };
            if let Err(e) = outcome {
                debug!("request interception: {}", e);
            }
        }
    }))
}

/// Write the document to a temporary `.html` file with a `<base>` pointing at `base_dir`.
async fn write_document(html: &str, base_dir: &Path) -> Result<tempfile::NamedTempFile, Md2PdfError> {
    let file = tempfile::Builder::new()
        .prefix("md2pdf-")
        .suffix(".html")
        .tempfile()
        .map_err(|e| render_failed(format!("temporary document: {e}")))?;
    let base = format!("{}/", to_file_url(base_dir)?.trim_end_matches('/'));
    tokio::fs::write(file.path(), inject_base(html, &base))
        .await
        .map_err(|e| render_failed(format!("temporary document: {e}")))?;
    Ok(file)
}

/// Insert `<base href>` right after `<head>`, or at the front when there is none.
pub(crate) fn inject_base(html: &str, href: &str) -> String {
    let tag = format!("<base href=\"{}\">", href.replace('"', "%22"));
    match html.find("<head>") {
        Some(i) => {
            let at = i + "<head>".len();
            format!("{}\n  {}{}", &html[..at], tag, &html[at..])
        }
        None => format!("{tag}{html}"),
    }
}

fn pdf_params(request: &RenderRequest) -> PrintToPdfParams {
    let (width, height) = request.geometry.size.inches();
    let [top, right, bottom, left] = request.geometry.margins.inches();
    let hf = &request.header_footer;
    PrintToPdfParams {
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(top),
        margin_right: Some(right),
        margin_bottom: Some(bottom),
        margin_left: Some(left),
        print_background: Some(true),
        display_header_footer: Some(hf.display),
        header_template: hf.display.then(|| hf.header_template.clone()),
        footer_template: hf.display.then(|| hf.footer_template.clone()),
        ..Default::default()
    }
}

async fn evaluate(page: &Page, timeout: Duration, expression: &str) -> Result<(), Md2PdfError> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .await_promise(true)
        .build()
        .map_err(render_failed)?;
    bounded(timeout, page.evaluate_expression(params)).await.map(|_| ())
}

/// Run one protocol operation under the timeout.
async fn bounded<T>(timeout: Duration, op: impl Future<Output = Result<T, CdpError>>) -> Result<T, Md2PdfError> {
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result.map_err(|e| render_failed(e.to_string())),
        Err(_) => Err(timed_out(timeout)),
    }
}

fn render_failed(reason: impl Into<String>) -> Md2PdfError {
    Md2PdfError::RenderFailed {
        renderer: NAME.into(),
        reason: reason.into(),
    }
}

fn timed_out(timeout: Duration) -> Md2PdfError {
    Md2PdfError::RenderTimeout {
        renderer: NAME.into(),
        millis: timeout.as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::request;
    use super::*;
    use crate::pipeline::header_footer::HeaderFooter;

    #[test]
    fn base_goes_inside_head() {
        let html = "<!doctype html>\n<html>\n<head>\n  <meta charset=\"utf-8\" />\n</head><body></body></html>";
        let out = inject_base(html, "file:///docs/");
        assert!(out.contains("<head>\n  <base href=\"file:///docs/\">\n  <meta"), "got: {out}");
    }

    #[test]
    fn base_prepended_without_head() {
        assert_eq!(inject_base("<p>x</p>", "file:///d/"), "<base href=\"file:///d/\"><p>x</p>");
    }

    #[test]
    fn print_params_from_geometry() {
        let mut req = request("<p>x</p>");
        req.geometry = super::super::geometry::PageGeometry::parse("6in x 9in", "1in,0.5in");
        let params = pdf_params(&req);
        assert_eq!(params.paper_width, Some(6.0));
        assert_eq!(params.paper_height, Some(9.0));
        assert_eq!(params.margin_top, Some(1.0));
        assert_eq!(params.margin_right, Some(0.5));
        assert_eq!(params.margin_bottom, Some(1.0));
        assert_eq!(params.margin_left, Some(0.5));
        assert_eq!(params.display_header_footer, Some(false));
        assert!(params.header_template.is_none());
    }

    #[test]
    fn templates_only_sent_when_displayed() {
        let mut req = request("<p>x</p>");
        req.header_footer = HeaderFooter {
            header_template: "<div>h</div>".into(),
            footer_template: String::new(),
            display: true,
        };
        let params = pdf_params(&req);
        assert_eq!(params.header_template.as_deref(), Some("<div>h</div>"));
        assert_eq!(params.footer_template.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_failure() {
        let renderer = ChromiumRenderer::new(Some(PathBuf::from("/nonexistent/chrome-md2pdf")));
        let err = renderer.render(request("<p>x</p>")).await.unwrap_err();
        assert!(err.is_renderer_failure(), "got: {err:?}");
    }
}
