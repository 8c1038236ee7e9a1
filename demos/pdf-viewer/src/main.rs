use yew::prelude::*;
use yew_pdf_virtualized::{DocumentOptions, LoadProgress, PdfViewer};

const WIDTH: f64 = 500.0;

fn on_progress(progress: LoadProgress) {
    if let Some(percent) = progress.percent() {
        log::info!("loading {percent}%");
    }
}

fn on_page_rendered(page_number: u32) {
    log::debug!("page {page_number} on screen");
}

#[function_component]
fn App() -> Html {
    let options = DocumentOptions {
        cmap_url: "/cmaps/".into(),
        cmap_packed: true,
        standard_font_data_url: "/standard_fonts/".into(),
    };
    html! {
        <div class="App">
            <PdfViewer
                file="r3_all.pdf"
                {options}
                width={WIDTH}
                height={WIDTH * 1.5}
                border={1}
                on_progress={Callback::from(on_progress)}
                on_page_rendered={Callback::from(on_page_rendered)} />
        </div>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Debug));
    yew::Renderer::<App>::new().render();
}
