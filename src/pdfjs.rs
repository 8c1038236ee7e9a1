//! Bindings to the global `pdfjsLib` of pdf.js.
//!
//! pdf.js has to be loaded by the host page (for example with a `<script>`
//! tag for `pdf.min.js`) and its worker source configured before a document
//! is opened.

use std::{cell::Cell, fmt, rc::Rc};

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use js_sys::{Object, Reflect};
use wasm_bindgen::{prelude::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};
use yew::Callback;

use crate::error::LoadError;
use crate::geometry::PageViewport;
use crate::loader::PageGeometry;
use crate::state::DocumentKey;

mod raw {
    use js_sys::{Function, Object, Promise};
    use wasm_bindgen::{prelude::wasm_bindgen, JsValue};

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone)]
        pub type PdfLoadingTask;
        #[wasm_bindgen(catch, js_namespace = pdfjsLib, js_name = getDocument)]
        pub fn get_document(params: &Object) -> Result<PdfLoadingTask, JsValue>;
        #[wasm_bindgen(structural, method, getter)]
        pub fn promise(this: &PdfLoadingTask) -> Promise;
        #[wasm_bindgen(structural, method, setter, js_name = onProgress)]
        pub fn set_on_progress(this: &PdfLoadingTask, callback: &Function);

        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone)]
        pub type PdfDocumentProxy;
        #[wasm_bindgen(structural, method, getter, js_name = numPages)]
        pub fn num_pages(this: &PdfDocumentProxy) -> u32;
        #[wasm_bindgen(method, js_name = getPage)]
        pub fn get_page(this: &PdfDocumentProxy, page_number: u32) -> Promise;
        #[wasm_bindgen(method, catch)]
        pub fn destroy(this: &PdfDocumentProxy) -> Result<Promise, JsValue>;

        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone)]
        pub type PdfPageProxy;
        #[wasm_bindgen(structural, method, getter, js_name = pageNumber)]
        pub fn page_number(this: &PdfPageProxy) -> u32;
        #[wasm_bindgen(method, js_name = getViewport)]
        pub fn get_viewport(this: &PdfPageProxy, params: &Object) -> PdfPageViewport;
        #[wasm_bindgen(method, catch)]
        pub fn render(this: &PdfPageProxy, params: &Object) -> Result<PdfRenderTask, JsValue>;

        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone)]
        pub type PdfPageViewport;
        #[wasm_bindgen(structural, method, getter)]
        pub fn width(this: &PdfPageViewport) -> f64;
        #[wasm_bindgen(structural, method, getter)]
        pub fn height(this: &PdfPageViewport) -> f64;

        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone)]
        pub type PdfRenderTask;
        #[wasm_bindgen(structural, method, getter)]
        pub fn promise(this: &PdfRenderTask) -> Promise;
    }
}

/// Where pdf.js finds the resources some documents need.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOptions {
    pub cmap_url: String,
    pub cmap_packed: bool,
    pub standard_font_data_url: String,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            cmap_url: "/cmaps/".into(),
            cmap_packed: true,
            standard_font_data_url: "/standard_fonts/".into(),
        }
    }
}

/// Bytes fetched so far while opening a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress {
    pub loaded: f64,
    pub total: f64,
}

impl LoadProgress {
    /// Rounded percentage, `None` while the total size is unknown.
    pub fn percent(&self) -> Option<u32> {
        if self.total > 0.0 {
            Some((self.loaded / self.total * 100.0).round().clamp(0.0, 100.0) as u32)
        } else {
            None
        }
    }
}

thread_local! {
    static NEXT_KEY: Cell<u64> = Cell::new(1);
}

fn next_key() -> DocumentKey {
    NEXT_KEY.with(|next| {
        let key = next.get();
        next.set(key + 1);
        DocumentKey(key)
    })
}

/// Forwards the progress events of a loading task.
///
/// pdf.js keeps reporting range fetches after the document has opened, so the
/// listener unhooks itself from the task before its closure is freed.
struct ProgressListener {
    task: raw::PdfLoadingTask,
    _closure: Closure<dyn FnMut(JsValue)>,
}

impl ProgressListener {
    fn attach(task: &raw::PdfLoadingTask, callback: Callback<LoadProgress>) -> Self {
        let closure = Closure::wrap(Box::new(move |data: JsValue| {
            callback.emit(LoadProgress {
                loaded: number(&data, "loaded"),
                total: number(&data, "total"),
            });
        }) as Box<dyn FnMut(JsValue)>);
        task.set_on_progress(closure.as_ref().unchecked_ref());
        Self {
            task: task.clone(),
            _closure: closure,
        }
    }
}

impl fmt::Debug for ProgressListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressListener").finish_non_exhaustive()
    }
}

impl Drop for ProgressListener {
    fn drop(&mut self) {
        if let Err(err) = Reflect::set(&self.task, &JsValue::from_str("onProgress"), &JsValue::NULL) {
            log::warn!("failed to detach progress listener: {err:?}");
        }
    }
}

/// An opened document.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    key: DocumentKey,
    proxy: raw::PdfDocumentProxy,
    _progress: Option<Rc<ProgressListener>>,
}

impl PartialEq for PdfDocument {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

fn set(target: &Object, name: &str, value: &JsValue) -> Result<(), LoadError> {
    Reflect::set(target, &JsValue::from_str(name), value)?;
    Ok(())
}

fn scale_params(scale: f64) -> Result<Object, LoadError> {
    let params = Object::new();
    set(&params, "scale", &JsValue::from_f64(scale))?;
    Ok(params)
}

fn number(value: &JsValue, name: &str) -> f64 {
    Reflect::get(value, &JsValue::from_str(name))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or_default()
}

/// Opens the document at `url`.
///
/// `on_progress` is called zero or more times while the file is fetched.
pub async fn open_document(
    url: &str,
    options: &DocumentOptions,
    on_progress: Option<Callback<LoadProgress>>,
) -> Result<PdfDocument, LoadError> {
    let params = Object::new();
    set(&params, "url", &JsValue::from_str(url))?;
    set(&params, "cMapUrl", &JsValue::from_str(&options.cmap_url))?;
    set(&params, "cMapPacked", &JsValue::from_bool(options.cmap_packed))?;
    set(
        &params,
        "standardFontDataUrl",
        &JsValue::from_str(&options.standard_font_data_url),
    )?;

    let task = raw::get_document(&params)?;
    // lives as long as the document, detached when dropped
    let progress = on_progress.map(|callback| Rc::new(ProgressListener::attach(&task, callback)));

    let proxy = JsFuture::from(task.promise()).await?;
    let doc = PdfDocument {
        key: next_key(),
        proxy: proxy.unchecked_into(),
        _progress: progress,
    };
    log::info!("opened {url} as {:?} with {} pages", doc.key, doc.page_count());
    Ok(doc)
}

impl PdfDocument {
    pub fn key(&self) -> DocumentKey {
        self.key
    }

    /// Releases the document in the pdf.js worker. Pages can no longer be
    /// fetched or rendered afterwards.
    pub fn destroy(&self) {
        log::debug!("destroying {:?}", self.key);
        if let Err(err) = self.proxy.destroy() {
            log::warn!("failed to destroy {:?}: {err:?}", self.key);
        }
    }

    async fn page(&self, page_number: u32) -> Result<raw::PdfPageProxy, LoadError> {
        let page = JsFuture::from(self.proxy.get_page(page_number))
            .await
            .map_err(|err| LoadError::page_fetch(page_number, err))?;
        Ok(page.unchecked_into())
    }

    /// Draws the page at zero-based `index` into `canvas`, scaled to `width`.
    /// Resolves to the one-based page number once drawing has finished.
    pub async fn render_page(&self, index: usize, canvas: &HtmlCanvasElement, width: f64) -> Result<u32, LoadError> {
        let page_number = u32::try_from(index + 1).map_err(|_| LoadError::PageFetch {
            page: u32::MAX,
            message: format!("page index {index} out of range"),
        })?;
        let page = self.page(page_number).await?;
        let natural = page.get_viewport(&scale_params(1.0)?);
        let pixel_ratio = web_sys::window().map_or(1.0, |window| window.device_pixel_ratio());
        let size = CanvasSize::new(width, natural.width(), natural.height(), pixel_ratio);
        let viewport = page.get_viewport(&scale_params(size.scale)?);
        canvas.set_width(size.backing_width);
        canvas.set_height(size.backing_height);
        canvas
            .style()
            .set_property("height", &format!("{}px", size.css_height))?;

        let context: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| LoadError::Js("canvas has no 2d context".into()))?
            .unchecked_into();
        let params = Object::new();
        set(&params, "canvasContext", &context)?;
        set(&params, "viewport", &viewport)?;
        let task = page.render(&params)?;
        JsFuture::from(task.promise()).await?;
        Ok(page.page_number())
    }
}

/// Backing store and CSS size of a page canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CanvasSize {
    /// Render scale relative to the page's natural size.
    scale: f64,
    backing_width: u32,
    backing_height: u32,
    css_height: u32,
}

impl CanvasSize {
    /// The backing store holds `pixel_ratio` device pixels per CSS pixel; the
    /// CSS height matches the row height computed for the page.
    fn new(css_width: f64, page_width: f64, page_height: f64, pixel_ratio: f64) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let css_scale = css_width / page_width;
        let scale = css_scale * pixel_ratio;
        Self {
            scale,
            backing_width: (page_width * scale).floor() as u32,
            backing_height: (page_height * scale).floor() as u32,
            css_height: (page_height * css_scale).floor() as u32,
        }
    }
}

impl PageGeometry for PdfDocument {
    fn page_count(&self) -> u32 {
        self.proxy.num_pages()
    }

    fn page_viewport(&self, page_number: u32) -> LocalBoxFuture<'_, Result<PageViewport, LoadError>> {
        async move {
            let page = self.page(page_number).await?;
            let viewport = page.get_viewport(&scale_params(1.0)?);
            PageViewport::new(page_number, viewport.width(), viewport.height())
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage() {
        let progress = LoadProgress {
            loaded: 512.0,
            total: 2048.0,
        };
        assert_eq!(progress.percent(), Some(25));
        let unknown = LoadProgress {
            loaded: 512.0,
            total: 0.0,
        };
        assert_eq!(unknown.percent(), None);
    }

    #[test]
    fn canvas_backing_follows_pixel_ratio() {
        let size = CanvasSize::new(100.0, 200.0, 300.0, 2.0);
        assert_eq!(size.scale, 1.0);
        assert_eq!((size.backing_width, size.backing_height), (200, 300));
        assert_eq!(size.css_height, 150);
    }

    #[test]
    fn canvas_css_height_matches_row_content() {
        let viewports = [PageViewport::new(1, 400.0, 300.0).unwrap()];
        let row = crate::geometry::page_height(0, &viewports, 100.0, 1).unwrap();
        for ratio in [1.0, 1.25, 1.5, 3.0] {
            assert_eq!(CanvasSize::new(100.0, 400.0, 300.0, ratio).css_height + 1, row);
        }
    }

    #[test]
    fn unusable_pixel_ratio_falls_back_to_one() {
        let size = CanvasSize::new(100.0, 200.0, 300.0, f64::NAN);
        assert_eq!((size.backing_width, size.backing_height), (100, 150));
        assert_eq!(CanvasSize::new(100.0, 200.0, 300.0, 0.0), size);
    }

    #[test]
    fn default_resource_locations() {
        let options = DocumentOptions::default();
        assert_eq!(options.cmap_url, "/cmaps/");
        assert!(options.cmap_packed);
        assert_eq!(options.standard_font_data_url, "/standard_fonts/");
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod web_tests {
    use super::*;

    use js_sys::Function;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn property(target: &JsValue, name: &str) -> JsValue {
        Reflect::get(target, &JsValue::from_str(name)).unwrap()
    }

    #[wasm_bindgen_test]
    fn progress_listener_detaches_on_drop() {
        let task: raw::PdfLoadingTask = Object::new().unchecked_into();
        let seen = Rc::new(Cell::new(0.0));
        let listener = {
            let seen = seen.clone();
            ProgressListener::attach(&task, Callback::from(move |p: LoadProgress| seen.set(p.loaded)))
        };
        let report = property(&task, "onProgress").unchecked_into::<Function>();
        let data = Object::new();
        Reflect::set(&data, &"loaded".into(), &JsValue::from_f64(42.0)).unwrap();
        report.call1(&JsValue::NULL, &data).unwrap();
        assert_eq!(seen.get(), 42.0);

        drop(listener);
        assert!(property(&task, "onProgress").is_null());
    }

    #[wasm_bindgen_test]
    fn destroy_releases_the_worker_document() {
        let proxy = Object::new();
        let destroy = Function::new_no_args("this.destroyed = true; return Promise.resolve();");
        Reflect::set(&proxy, &"destroyed".into(), &JsValue::FALSE).unwrap();
        Reflect::set(&proxy, &"destroy".into(), &destroy).unwrap();
        let document = PdfDocument {
            key: next_key(),
            proxy: proxy.clone().unchecked_into(),
            _progress: None,
        };
        document.destroy();
        assert_eq!(property(&proxy, "destroyed"), JsValue::TRUE);
    }
}
