//! Concrete rendering engine for the folio session, backed by pdfium.

mod filter;
#[cfg(feature = "pdf")]
mod pdfium;
mod source;

pub use filter::apply_theme;
#[cfg(feature = "pdf")]
pub use pdfium::{PdfiumEngine, LIBRARY_PATH_ENV};
pub use source::{resolve, SourceData};
