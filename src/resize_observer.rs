use wasm_bindgen::prelude::Closure;
use web_sys::Element;

mod raw {
    use wasm_bindgen::{
        prelude::{wasm_bindgen, Closure},
        JsValue,
    };
    use web_sys::{DomRectReadOnly, Element};

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub type ResizeObserver;
        #[wasm_bindgen(constructor, catch)]
        pub fn new(callback: &ResizeCallback) -> Result<ResizeObserver, JsValue>;
        #[wasm_bindgen(method, catch)]
        pub fn disconnect(this: &ResizeObserver) -> Result<(), JsValue>;
        #[wasm_bindgen(method, catch)]
        pub fn observe(this: &ResizeObserver, element: &Element) -> Result<(), JsValue>;
        #[wasm_bindgen(method, catch)]
        pub fn unobserve(this: &ResizeObserver, element: &Element) -> Result<(), JsValue>;

        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub type ResizeObserverEntry;
        #[wasm_bindgen(structural, method, getter, js_name = contentRect)]
        pub fn content_rect(this: &ResizeObserverEntry) -> DomRectReadOnly;
    }
    pub type ResizeFn = dyn FnMut(Box<[ResizeObserverEntry]>, ResizeObserver);
    pub type ResizeCallback = Closure<ResizeFn>;
}

/// Content box size reported for an observed element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedSize {
    pub width: f64,
    pub height: f64,
}

/// Reports size changes of the elements it observes.
///
/// Browsers without `ResizeObserver` get an inert observer; sizes then stay
/// at whatever was read on mount.
pub struct ResizeObserver {
    closure: Option<raw::ResizeCallback>,
    observer: Option<raw::ResizeObserver>,
}

pub struct ObservedElement {
    observer: Option<raw::ResizeObserver>,
    element: Element,
}

impl ResizeObserver {
    pub fn new<F>(mut callback: F) -> ResizeObserver
    where
        F: 'static + FnMut(ObservedSize),
    {
        let closure = Closure::wrap(Box::new(
            move |entries: Box<[raw::ResizeObserverEntry]>, _this: raw::ResizeObserver| {
                // only the latest size matters
                if let Some(entry) = entries.last() {
                    let rect = entry.content_rect();
                    callback(ObservedSize {
                        width: rect.width(),
                        height: rect.height(),
                    });
                }
            },
        ) as Box<raw::ResizeFn>);
        match raw::ResizeObserver::new(&closure) {
            Ok(observer) => Self {
                closure: Some(closure),
                observer: Some(observer),
            },
            Err(err) => {
                log::warn!("ResizeObserver unavailable: {err:?}");
                Self {
                    closure: None,
                    observer: None,
                }
            }
        }
    }

    pub fn observe(&self, element: Element) -> ObservedElement {
        let observer = self.observer.as_ref().and_then(|observer| {
            match observer.observe(&element) {
                Ok(()) => Some(observer.clone()),
                Err(err) => {
                    log::warn!("could not observe element size: {err:?}");
                    None
                }
            }
        });
        ObservedElement { observer, element }
    }
}

impl ObservedElement {
    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Drop for ResizeObserver {
    fn drop(&mut self) {
        if let (Some(_cb), Some(observer)) = (self.closure.take(), self.observer.take()) {
            if let Err(err) = observer.disconnect() {
                log::warn!("failed to disconnect ResizeObserver: {err:?}");
            }
        }
    }
}

impl Drop for ObservedElement {
    fn drop(&mut self) {
        if let Some(this) = self.observer.take() {
            if let Err(err) = this.unobserve(&self.element) {
                log::warn!("failed to unobserve element: {err:?}");
            }
        }
    }
}
