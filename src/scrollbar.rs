//! Measures how much room the browser's scrollbars take.

use std::cell::OnceCell;

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

/// Space taken by the vertical and horizontal scrollbar, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollbarSize {
    pub vertical_width: f64,
    pub horizontal_height: f64,
}

thread_local! {
    static MEASURED: OnceCell<ScrollbarSize> = OnceCell::new();
}

impl ScrollbarSize {
    pub const ZERO: Self = Self {
        vertical_width: 0.0,
        horizontal_height: 0.0,
    };

    /// Scrollbar size of the current browser. Measured on first call, cached
    /// afterwards. Falls back to [`ScrollbarSize::ZERO`] when the DOM is not
    /// available.
    pub fn probe() -> Self {
        MEASURED.with(|cell| {
            *cell.get_or_init(|| {
                let size = measure().unwrap_or_else(|| {
                    log::warn!("scrollbar size could not be measured, assuming overlay scrollbars");
                    Self::ZERO
                });
                log::debug!("measured scrollbar size {size:?}");
                size
            })
        })
    }
}

fn create(document: &Document, tag: &str) -> Option<HtmlElement> {
    document.create_element(tag).ok()?.dyn_into().ok()
}

// A hidden box is measured once with overflow hidden and once with forced
// scrollbars; the difference is the scrollbar footprint.
fn measure() -> Option<ScrollbarSize> {
    let document = web_sys::window()?.document()?;
    let body = document.body()?;

    let inner = create(&document, "p")?;
    let inner_style = inner.style();
    inner_style.set_property("width", "100%").ok()?;
    inner_style.set_property("height", "100%").ok()?;

    let outer = create(&document, "div")?;
    let outer_style = outer.style();
    for (name, value) in [
        ("position", "absolute"),
        ("top", "0px"),
        ("left", "0px"),
        ("visibility", "hidden"),
        ("width", "100px"),
        ("height", "100px"),
        ("overflow", "hidden"),
    ] {
        outer_style.set_property(name, value).ok()?;
    }
    outer.append_child(&inner).ok()?;
    body.append_child(&outer).ok()?;

    let w1 = inner.offset_width();
    let h1 = inner.offset_height();
    let forced = outer_style.set_property("overflow", "scroll");
    let mut w2 = inner.offset_width();
    let mut h2 = inner.offset_height();
    if w1 == w2 {
        w2 = outer.client_width();
    }
    if h1 == h2 {
        h2 = outer.client_height();
    }
    // the probe must leave the document as it found it
    let removed = body.remove_child(&outer);
    forced.ok()?;
    removed.ok()?;

    Some(ScrollbarSize {
        vertical_width: f64::from((w1 - w2).max(0)),
        horizontal_height: f64::from((h1 - h2).max(0)),
    })
}
