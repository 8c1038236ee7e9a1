//! Error types for document loading and page layout.

use wasm_bindgen::JsValue;

/// Failure while opening a document or reading its page geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    /// pdf.js rejected the request.
    #[error("pdf.js: {0}")]
    Js(String),

    /// A single page could not be fetched; the whole load fails with it.
    #[error("page {page}: {message}")]
    PageFetch { page: u32, message: String },

    /// A page reported a size that cannot be laid out.
    #[error("page {page} has unusable size {width}x{height}")]
    DegenerateGeometry { page: u32, width: f64, height: f64 },
}

impl LoadError {
    pub(crate) fn page_fetch(page: u32, err: JsValue) -> Self {
        Self::PageFetch {
            page,
            message: describe(&err),
        }
    }
}

impl From<JsValue> for LoadError {
    fn from(err: JsValue) -> Self {
        Self::Js(describe(&err))
    }
}

/// Misuse of the height calculator. These indicate a control-flow bug.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("page height requested before page viewports were loaded")]
    NotReady,

    #[error("page index {index} out of range for {len} pages")]
    PageOutOfRange { index: usize, len: usize },

    #[error("effective width {0} is not a positive size")]
    DegenerateWidth(f64),
}

fn describe(err: &JsValue) -> String {
    if let Some(s) = err.as_string() {
        return s;
    }
    // Error objects carry a message property
    js_sys::Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}
