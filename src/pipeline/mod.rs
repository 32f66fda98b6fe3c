//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements one transformation step. The orchestrator in
//! [`crate::convert`] drives them in order; renderers live in
//! [`crate::renderers`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ frontmatter ──▶ markdown ──────────────────────▶ template ──▶ header_footer
//! (path/text)  (YAML split)  (document chain, markup chain)  (HTML doc)   (print templates)
//! ```
//!
//! 1. [`input`]       : resolve a file or text request to Markdown plus a base directory
//! 2. [`frontmatter`] : split leading YAML into template data
//! 3. [`markdown`]    : parse, run the [`document`] and [`markup`] chains, serialise;
//!    runs in `spawn_blocking`
//! 4. [`template`]    : assemble the standalone HTML document
//! 5. [`header_footer`] : resolve print header/footer templates

pub mod document;
pub mod frontmatter;
pub mod header_footer;
pub mod input;
pub mod markdown;
pub mod markup;
pub mod slug;
pub mod template;
