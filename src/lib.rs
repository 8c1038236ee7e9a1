//! A virtualized PDF viewer component for Yew.
//!
//! [`PdfViewer`] opens a document through pdf.js, reads the size of every
//! page up front and then shows the pages in a [`VariableSizeList`], which
//! only mounts the pages near the visible part of the list. Because every
//! row height is known before layout, scrolling never jumps.
//!
//! The pieces are usable on their own: [`load_viewports`] and
//! [`PageLayoutState`] do not touch the DOM, [`page_height`] is a pure
//! function.

mod error;
mod geometry;
mod list;
mod loader;
mod pdfjs;
mod resize_observer;
mod scrollbar;
mod state;
mod viewer;

pub use error::{LayoutError, LoadError};
pub use geometry::{page_height, DisplayGeometry, PageViewport, DEFAULT_BORDER, DEFAULT_WIDTH};
pub use list::{ListRow, RowLayout, VariableSizeList, VariableSizeListProps, Window, DEFAULT_OVERSCAN};
pub use loader::{load_viewports, PageGeometry};
pub use pdfjs::{open_document, DocumentOptions, LoadProgress, PdfDocument};
pub use scrollbar::ScrollbarSize;
pub use state::{DocumentKey, LoadTicket, PageLayoutState, Phase};
pub use viewer::{PdfPage, PdfPageProps, PdfViewer, PdfViewerProps};
