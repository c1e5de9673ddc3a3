//! Rendering and annotation engine for an interactive, multi-page PDF viewer.
//!
//! [`session::ViewerSession`] owns every component for one open document:
//! the view transform, page virtualization, per-page drawing surfaces, the
//! tool state machine, the text index with cross-page search, and
//! text-anchored annotations. Page decoding is delegated to a
//! [`backend::PageDecoder`]; the default one is backed by `hayro`.

pub mod annotations;
pub mod backend;
pub mod config;
pub mod deeplink;
pub mod drawing;
pub mod error;
pub mod page;
pub mod pages;
pub mod render;
pub mod search;
pub mod session;
pub mod text;
pub mod tool;
pub mod view;

#[cfg(test)]
mod test_support;
