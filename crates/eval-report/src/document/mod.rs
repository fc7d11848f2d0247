//! PDF report documents.

pub mod composer;
pub mod pdf;
pub mod text;

pub use composer::{ComposedPage, ComposedReport, DocumentComposer, PageKind, plan_pages};
pub use pdf::{PAGE_HEIGHT, PAGE_WIDTH, PdfCanvas, encode_win_ansi};
pub use text::{fit_image, truncate, wrap_text};
