//! Page renderers: one contract, two implementations, and the fallback policy.
//!
//! ```text
//! render_with_fallback(primary, fallback)
//!   ├─ primary.render(req) ── Ok ──────────────────────────▶ bytes
//!   └─ Err(renderer failure) ─▶ warn ─▶ fallback.render(req) ─▶ bytes | Err
//! ```
//!
//! Only renderer failures (launch, timeout, blocked resource, render error)
//! trigger the fallback; every other error propagates unchanged.

pub mod chromium;
pub mod geometry;
pub mod lite;

use crate::config::RendererKind;
use crate::error::Md2PdfError;
use crate::pipeline::header_footer::HeaderFooter;
use futures::future::BoxFuture;
use geometry::PageGeometry;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub use chromium::ChromiumRenderer;
pub use lite::LiteRenderer;

/// Everything a renderer needs for one call. Not retained past the call.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// The complete HTML document.
    pub html: String,
    /// Directory relative resources resolve against.
    pub base_dir: PathBuf,
    pub geometry: PageGeometry,
    pub header_footer: HeaderFooter,
    pub allow_remote: bool,
    /// Bound on each individual renderer operation.
    pub timeout: Duration,
    /// Run the diagram runtime before printing.
    pub mermaid: bool,
}

/// A page renderer.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, request: RenderRequest) -> BoxFuture<'_, Result<Vec<u8>, Md2PdfError>>;
}

/// Build the renderer for `kind`.
pub fn renderer_for(kind: RendererKind, chrome_executable: Option<PathBuf>) -> Box<dyn Renderer> {
    match kind {
        RendererKind::Chromium => Box::new(ChromiumRenderer::new(chrome_executable)),
        RendererKind::Lite => Box::new(LiteRenderer),
    }
}

/// Result of a render, with the renderer that actually produced it.
#[derive(Debug)]
pub struct RenderOutcome {
    pub pdf: Vec<u8>,
    pub renderer: &'static str,
    /// The primary renderer's error when the fallback produced the PDF.
    pub fallback_reason: Option<String>,
}

/// Render with `primary`, retrying once with `fallback` on renderer failure.
pub async fn render_with_fallback(
    primary: &dyn Renderer,
    fallback: Option<&dyn Renderer>,
    request: RenderRequest,
) -> Result<RenderOutcome, Md2PdfError> {
    let retry = fallback.map(|_| request.clone());
    match primary.render(request).await {
        Ok(pdf) => {
            info!("Rendered {} bytes with {}", pdf.len(), primary.name());
            Ok(RenderOutcome {
                pdf,
                renderer: primary.name(),
                fallback_reason: None,
            })
        }
        Err(e) if e.is_renderer_failure() => match (fallback, retry) {
            (Some(fallback), Some(request)) => {
                warn!(
                    "Renderer '{}' failed ({}), falling back to '{}'",
                    primary.name(),
                    e,
                    fallback.name()
                );
                let pdf = fallback.render(request).await?;
                info!("Rendered {} bytes with {}", pdf.len(), fallback.name());
                Ok(RenderOutcome {
                    pdf,
                    renderer: fallback.name(),
                    fallback_reason: Some(e.to_string()),
                })
            }
            _ => Err(e),
        },
        Err(e) => Err(e),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn failing_primary_falls_back_to_lite() {
        let outcome = render_with_fallback(&Broken, Some(&LiteRenderer), request("<p>hello</p>"))
            .await
            .unwrap();
        assert_eq!(outcome.renderer, "lite");
        assert!(outcome.pdf.starts_with(b"%PDF"));
        assert!(outcome.fallback_reason.unwrap().contains("no browser here"));
    }

    #[tokio::test]
    async fn without_fallback_original_error_propagates() {
        let err = render_with_fallback(&Broken, None, request("<p>hello</p>"))
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::BrowserLaunch(ref m) if m == "no browser here"));
    }

    struct Misconfigured;

    impl Renderer for Misconfigured {
        fn name(&self) -> &'static str {
            "misconfigured"
        }

        fn render(&self, _request: RenderRequest) -> BoxFuture<'_, Result<Vec<u8>, Md2PdfError>> {
            Box::pin(async { Err(Md2PdfError::InvalidConfig("bad".into())) })
        }
    }

    #[tokio::test]
    async fn non_renderer_errors_skip_fallback() {
        let err = render_with_fallback(&Misconfigured, Some(&LiteRenderer), request("<p>x</p>"))
            .await
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn renderer_for_selects_by_kind() {
        assert_eq!(renderer_for(RendererKind::Lite, None).name(), "lite");
        assert_eq!(renderer_for(RendererKind::Chromium, None).name(), "chromium");
    }
}
