//! The PDF viewer component: a [`VariableSizeList`] of exactly sized pages.

use std::{cell::RefCell, rc::Rc};

use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlCanvasElement;
use yew::prelude::*;

use crate::error::LoadError;
use crate::geometry::{DisplayGeometry, DEFAULT_BORDER, DEFAULT_WIDTH};
use crate::list::{ListRow, VariableSizeList, DEFAULT_OVERSCAN};
use crate::loader::load_viewports;
use crate::pdfjs::{open_document, DocumentOptions, LoadProgress, PdfDocument};
use crate::scrollbar::ScrollbarSize;
use crate::state::{DocumentKey, PageLayoutState, Phase};

#[derive(PartialEq, Properties)]
pub struct PdfPageProps {
    pub document: PdfDocument,
    pub index: usize,
    pub width: f64,
    #[prop_or_default]
    pub on_rendered: Option<Callback<u32>>,
}

/// Draws one page into a canvas `width` pixels wide.
#[function_component]
pub fn PdfPage(props: &PdfPageProps) -> Html {
    let canvas_ref = use_node_ref();
    // bumped per render request, older results are ignored
    let latest = use_mut_ref(|| 0u64);
    {
        let canvas_ref = canvas_ref.clone();
        let on_rendered = props.on_rendered.clone();
        use_effect_with_deps(
            move |(document, index, width): &(PdfDocument, usize, f64)| {
                let request = {
                    let mut latest = latest.borrow_mut();
                    *latest += 1;
                    *latest
                };
                let (document, index, width) = (document.clone(), *index, *width);
                if let Some(canvas) = canvas_ref.cast::<HtmlCanvasElement>() {
                    spawn_local(async move {
                        let result = document.render_page(index, &canvas, width).await;
                        if *latest.borrow() != request {
                            return;
                        }
                        match result {
                            Ok(page_number) => {
                                log::info!("Page {page_number} rendered.");
                                if let Some(on_rendered) = on_rendered {
                                    on_rendered.emit(page_number);
                                }
                            }
                            Err(err) => log::warn!("rendering page index {index} failed: {err}"),
                        }
                    });
                }
                || ()
            },
            (props.document.clone(), props.index, props.width),
        );
    }

    html! {
        <canvas ref={canvas_ref} style={format!("display: block; width: {}px;", props.width)} />
    }
}

#[derive(PartialEq, Properties)]
pub struct PdfViewerProps {
    /// URL of the document.
    pub file: AttrValue,
    #[prop_or_default]
    pub options: DocumentOptions,
    /// Width of the list, scrollbar included.
    #[prop_or(DEFAULT_WIDTH)]
    pub width: f64,
    /// Height of the list. One and a half widths when not given.
    #[prop_or_default]
    pub height: Option<f64>,
    /// Separator drawn under every page.
    #[prop_or(DEFAULT_BORDER)]
    pub border: u32,
    #[prop_or(DEFAULT_OVERSCAN)]
    pub overscan: usize,
    #[prop_or_default]
    pub classes: Classes,
    #[prop_or_default]
    pub on_progress: Option<Callback<LoadProgress>>,
    #[prop_or_default]
    pub on_page_rendered: Option<Callback<u32>>,
    #[prop_or_default]
    pub on_error: Option<Callback<LoadError>>,
}

#[derive(Debug, Clone, PartialEq)]
enum DocumentStatus {
    Opening,
    Open(PdfDocument),
    Failed(LoadError),
}

impl DocumentStatus {
    fn document(&self) -> Option<PdfDocument> {
        match self {
            Self::Open(document) => Some(document.clone()),
            _ => None,
        }
    }

    fn view(&self) -> DocumentView<'_> {
        match self {
            Self::Opening => DocumentView::Opening,
            Self::Open(document) => DocumentView::Open(document.key()),
            Self::Failed(err) => DocumentView::Failed(err),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DocumentView<'a> {
    Opening,
    Open(DocumentKey),
    Failed(&'a LoadError),
}

/// What the viewer shows below its container.
#[derive(Debug, Clone, PartialEq)]
enum Contents {
    Nothing,
    Error(String),
    Pages(usize),
}

fn select_contents(document: DocumentView<'_>, phase: &Phase) -> Contents {
    match (document, phase) {
        (DocumentView::Failed(err), _) => Contents::Error(format!("Failed to load PDF file: {err}")),
        (DocumentView::Open(current), Phase::Failed { key, error }) if current == *key => {
            Contents::Error(format!("Failed to load PDF pages: {error}"))
        }
        // the layout may still describe the previous document for one render
        (DocumentView::Open(current), Phase::Ready { key, viewports }) if current == *key => {
            Contents::Pages(viewports.len())
        }
        _ => Contents::Nothing,
    }
}

fn row_style(row: ListRow, border: u32) -> String {
    format!("{} border-bottom: solid {border}px;", row.style())
}

#[hook]
fn use_document(
    file: AttrValue,
    options: DocumentOptions,
    on_progress: Option<Callback<LoadProgress>>,
    on_error: Option<Callback<LoadError>>,
) -> UseStateHandle<DocumentStatus> {
    let status = use_state_eq(|| DocumentStatus::Opening);
    // bumped per open request and on teardown, older documents are dropped
    let latest = use_mut_ref(|| 0u64);
    let current = use_mut_ref(|| Option::<PdfDocument>::None);
    {
        let status = status.clone();
        use_effect_with_deps(
            move |(file, options): &(AttrValue, DocumentOptions)| {
                let request = {
                    let mut latest = latest.borrow_mut();
                    *latest += 1;
                    *latest
                };
                status.set(DocumentStatus::Opening);
                let (file, options) = (file.clone(), options.clone());
                let teardown = {
                    let latest = latest.clone();
                    let current = current.clone();
                    move || {
                        *latest.borrow_mut() += 1;
                        if let Some(document) = current.borrow_mut().take() {
                            document.destroy();
                        }
                    }
                };
                spawn_local(async move {
                    let result = open_document(&file, &options, on_progress).await;
                    if *latest.borrow() != request {
                        log::debug!("dropping superseded document {file}");
                        if let Ok(document) = result {
                            document.destroy();
                        }
                        return;
                    }
                    match result {
                        Ok(document) => {
                            *current.borrow_mut() = Some(document.clone());
                            status.set(DocumentStatus::Open(document));
                        }
                        Err(err) => {
                            log::error!("failed to open {file}: {err}");
                            if let Some(on_error) = on_error {
                                on_error.emit(err.clone());
                            }
                            status.set(DocumentStatus::Failed(err));
                        }
                    }
                });
                teardown
            },
            (file, options),
        );
    }
    status
}

#[hook]
fn use_page_layout(document: Option<PdfDocument>, on_error: Option<Callback<LoadError>>) -> Rc<RefCell<PageLayoutState>> {
    let update = use_force_update();
    let layout = use_mut_ref(PageLayoutState::new);
    {
        let layout = layout.clone();
        use_effect_with_deps(
            move |document: &Option<PdfDocument>| {
                match document.clone() {
                    Some(document) => {
                        let ticket = layout.borrow_mut().open(document.key());
                        if let Some(ticket) = ticket {
                            update.force_update();
                            spawn_local(async move {
                                let result = load_viewports(&document).await;
                                let error = result.as_ref().err().cloned();
                                if layout.borrow_mut().finish(ticket, result) {
                                    if let (Some(err), Some(on_error)) = (error, on_error) {
                                        on_error.emit(err);
                                    }
                                    update.force_update();
                                }
                            });
                        }
                    }
                    None => {
                        let was_idle = matches!(layout.borrow().phase(), Phase::Idle);
                        layout.borrow_mut().close();
                        if !was_idle {
                            update.force_update();
                        }
                    }
                }
                || ()
            },
            document,
        );
    }
    layout
}

/// Shows the document at `file` as a scrollable list of pages.
///
/// Nothing is rendered until the size of every page is known; from then on
/// every row has its exact height.
#[function_component]
pub fn PdfViewer(props: &PdfViewerProps) -> Html {
    let status = use_document(
        props.file.clone(),
        props.options.clone(),
        props.on_progress.clone(),
        props.on_error.clone(),
    );
    let document = status.document();
    let layout = use_page_layout(document.clone(), props.on_error.clone());
    let scrollbar = *use_memo(|_| ScrollbarSize::probe(), ());

    let height = props.height.unwrap_or(props.width * 1.5);
    let geometry = DisplayGeometry::new(props.width, height, props.border).with_scrollbar(scrollbar);
    let (generation, ready) = {
        let layout = layout.borrow();
        (layout.generation(), layout.viewports().is_some())
    };

    let item_size = {
        let layout = layout.clone();
        use_callback(
            move |index: usize, (geometry, _, _): &(DisplayGeometry, u64, bool)| {
                layout
                    .borrow()
                    .row_height(index, geometry)
                    .unwrap_or_else(|err| panic!("row height of page index {index}: {err}"))
            },
            (geometry, generation, ready),
        )
    };

    let items = use_callback(
        |row: ListRow, (document, width, border, on_rendered): &(Option<PdfDocument>, f64, u32, Option<Callback<u32>>)| {
            let Some(document) = document.clone() else {
                return html! {};
            };
            let style = row_style(row, *border);
            html! {
                <div style={style}>
                    <PdfPage {document} index={row.index} width={*width} on_rendered={on_rendered.clone()} />
                </div>
            }
        },
        (
            document,
            geometry.effective_width(),
            props.border,
            props.on_page_rendered.clone(),
        ),
    );

    let layout = layout.borrow();
    let contents = match select_contents(status.view(), layout.phase()) {
        Contents::Error(message) => html! {
            <div class="pdf-error">{message}</div>
        },
        Contents::Pages(item_count) => html! {
            <VariableSizeList
                {item_count}
                {item_size}
                estimated_item_size={layout.estimated_row_height(&geometry)}
                width={geometry.container_width}
                height={geometry.container_height}
                overscan={props.overscan}
                {items} />
        },
        Contents::Nothing => html! {},
    };

    html! {
        <div class={props.classes.clone()}>
            {contents}
        </div>
    }
}
