//! `<img src>` resolution.
//!
//! Local paths are rewritten to absolute `file://` URLs against the base
//! directory after percent-decoding, so `my%20image.png` names the file
//! `my image.png`. Remote sources pass through unchanged only when remote access
//! is allowed; otherwise the whole conversion fails naming the URL.

use super::dom;
use crate::assets::{is_passthrough, is_remote, resolve_from, to_file_url, AssetPolicy};
use crate::error::Md2PdfError;
use markup5ever_rcdom::Handle;
use percent_encoding::percent_decode_str;

pub fn apply(body: &Handle, policy: &AssetPolicy) -> Result<(), Md2PdfError> {
    for img in dom::find_all(body, |n| dom::is_element(n, "img")) {
        let Some(src) = dom::get_attr(&img, "src") else {
            continue;
        };

        if is_remote(&src) {
            if !policy.allow_remote {
                return Err(Md2PdfError::RemoteDisabled { url: src });
            }
            continue;
        }
        if is_passthrough(&src) {
            continue;
        }

        // Missing local images are left for the renderer to report.
        let path = percent_decode_str(&src).decode_utf8_lossy();
        let url = to_file_url(&resolve_from(&policy.base_dir, &path))?;
        dom::set_attr(&img, "src", &url);
    }
    Ok(())
}
