//! Core library for Surat.
//!
//! Contains the DOCX package reader/writer, the placeholder tag scanner, the
//! template renderer, the placeholder namespace filter, and the services the
//! HTTP layer drives: template upload/render/listing and user registration.
//! Persistence goes through the `surat-storage` backend trait; this crate
//! knows nothing about HTTP.

pub mod blob;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod namespace;
pub mod package;
mod part;
pub mod renderer;
pub mod scanner;
mod syntax;
pub mod templates;
pub mod users;

/// Field values a template is rendered with, keyed by placeholder name.
pub type Mapping = serde_json::Map<String, serde_json::Value>;

pub use package::{DOCX_MEDIA_TYPE, Package};
pub use syntax::TAG_PATTERN;
