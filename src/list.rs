//! A scrollable list that renders only the on-screen part of its rows.
//!
//! Rows have individual heights that are asked for lazily, the first time a
//! row's offset is needed. Rows further down are assumed to have the
//! estimated height until then.

use std::{cell::RefCell, rc::Rc};

use gloo_timers::callback::Timeout;
use web_sys::Element;
use yew::prelude::*;

use crate::resize_observer::{ObservedElement, ResizeObserver};

/// Rows kept mounted above and below the visible window.
pub const DEFAULT_OVERSCAN: usize = 5;

/// A row the list asks its row renderer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRow {
    pub index: usize,
    pub height: u32,
}

impl ListRow {
    /// Inline style that gives the row exactly its allotted height.
    pub fn style(&self) -> String {
        format!("height: {}px; box-sizing: border-box; overflow: hidden;", self.height)
    }
}

/// The rows to mount and the space the unmounted rows around them occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub first: usize,
    pub past_last: usize,
    pub before: u64,
    pub after: u64,
}

/// Prefix sums of the row heights measured so far.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowLayout {
    item_count: usize,
    estimate: u32,
    ends: Vec<u64>,
}

impl RowLayout {
    pub fn new(item_count: usize, estimate: u32) -> Self {
        Self {
            item_count,
            estimate,
            ends: Vec::new(),
        }
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Number of rows whose height has been asked for.
    pub fn measured(&self) -> usize {
        self.ends.len()
    }

    fn measure_through(&mut self, index: usize, size: &mut impl FnMut(usize) -> u32) {
        let index = index.min(self.item_count.saturating_sub(1));
        while self.ends.len() <= index && self.ends.len() < self.item_count {
            let i = self.ends.len();
            let end = self.ends.last().copied().unwrap_or(0) + u64::from(size(i));
            self.ends.push(end);
        }
    }

    fn start(&self, index: usize) -> u64 {
        match index {
            0 => 0,
            i => self.ends[i - 1],
        }
    }

    fn height(&self, index: usize) -> u32 {
        (self.ends[index] - self.start(index)) as u32
    }

    /// Estimated height of the whole list.
    pub fn total(&self) -> u64 {
        let measured = self.ends.last().copied().unwrap_or(0);
        let unmeasured = (self.item_count - self.ends.len()) as u64;
        measured + unmeasured * u64::from(self.estimate)
    }

    /// Rows intersecting `[scroll_top, scroll_top + viewport)`, widened by
    /// `overscan` rows on either side.
    pub fn window(
        &mut self,
        scroll_top: u64,
        viewport: u64,
        overscan: usize,
        mut size: impl FnMut(usize) -> u32,
    ) -> Window {
        if self.item_count == 0 {
            return Window::default();
        }
        let bottom = scroll_top + viewport;

        let mut first = 0;
        loop {
            self.measure_through(first, &mut size);
            if self.ends[first] > scroll_top || first + 1 == self.item_count {
                break;
            }
            first += 1;
        }
        let mut past_last = first + 1;
        while past_last < self.item_count && self.start(past_last) < bottom {
            self.measure_through(past_last, &mut size);
            past_last += 1;
        }

        let first = first.saturating_sub(overscan);
        let past_last = (past_last + overscan).min(self.item_count);
        self.measure_through(past_last - 1, &mut size);
        let before = self.start(first);
        Window {
            first,
            past_last,
            before,
            after: self.total() - self.ends[past_last - 1],
        }
    }
}

struct SharedScrollState {
    host_height: RefCell<f64>,
    trigger_update: UseForceUpdateHandle,
}

#[derive(PartialEq)]
struct LayoutInputs {
    item_count: usize,
    estimate: u32,
    item_size: Callback<usize, u32>,
}

struct ScrollManager {
    scroll_top: i32,
    observer: Rc<ResizeObserver>,
    observed: Option<ObservedElement>,
    shared: Rc<SharedScrollState>,
    layout: RowLayout,
    inputs: Option<LayoutInputs>,
}

impl ScrollManager {
    fn new(trigger_update: UseForceUpdateHandle) -> Self {
        let shared = Rc::new(SharedScrollState {
            host_height: RefCell::new(0.0),
            trigger_update,
        });
        let observer = {
            let shared = shared.clone();
            Rc::new(ResizeObserver::new(move |size| {
                let mut host_height = shared.host_height.borrow_mut();
                if *host_height != size.height {
                    *host_height = size.height;
                    shared.trigger_update.force_update();
                }
            }))
        };
        ScrollManager {
            scroll_top: 0,
            observer,
            observed: None,
            shared,
            layout: RowLayout::default(),
            inputs: None,
        }
    }

    fn mounted(&mut self, host: Element) {
        *self.shared.host_height.borrow_mut() = host.client_height().into();
        self.observed = Some(self.observer.observe(host));
        self.shared.trigger_update.force_update();
    }

    fn unmount(&mut self) {
        self.observed = None;
    }

    fn update(&mut self, scroll_top: i32) {
        if self.scroll_top != scroll_top {
            self.scroll_top = scroll_top;
            self.shared.trigger_update.force_update();
        }
    }

    fn generate_contents(&mut self, props: &VariableSizeListProps) -> Html {
        let inputs = LayoutInputs {
            item_count: props.item_count,
            estimate: props.estimated_item_size,
            item_size: props.item_size.clone(),
        };
        // heights are only valid for the callback that produced them
        if self.inputs.as_ref() != Some(&inputs) {
            self.layout = RowLayout::new(props.item_count, props.estimated_item_size);
            self.inputs = Some(inputs);
        }

        let host_height = *self.shared.host_height.borrow();
        let viewport = if host_height > 0.0 { host_height } else { props.height };
        let window = self.layout.window(
            self.scroll_top.max(0) as u64,
            viewport.ceil() as u64,
            props.overscan,
            |i| props.item_size.emit(i),
        );

        let items = (window.first..window.past_last).map(|index| {
            let row = ListRow {
                index,
                height: self.layout.height(index),
            };
            html! {
                <div key={index} class={props.item_classes.clone()}>
                    {props.items.emit(row)}
                </div>
            }
        });

        html! {
            <>
            <div key="pre" style={format!("height: {}px;", window.before)}>
            </div>
            <div key="wrap" style={"display: contents;"}>
            {for items}
            </div>
            <div key="post" style={format!("height: {}px;", window.after)}>
            </div>
            </>
        }
    }
}

#[derive(PartialEq, Properties)]
pub struct VariableSizeListProps {
    /// Renders the row at the given index.
    pub items: Callback<ListRow, Html>,
    pub item_count: usize,
    /// Height in pixels of the row at the given index.
    pub item_size: Callback<usize, u32>,
    pub estimated_item_size: u32,
    pub width: f64,
    pub height: f64,
    #[prop_or(DEFAULT_OVERSCAN)]
    pub overscan: usize,
    #[prop_or_default]
    pub classes: Classes,
    #[prop_or_default]
    pub item_classes: Classes,
}

#[hook]
fn use_debounce<E: 'static>(millis: u32, cb: Callback<E>) -> Callback<E> {
    (*use_memo(
        |cb| {
            let cb = cb.clone();
            let debounced = Rc::new(RefCell::new(None));
            Callback::from(move |scroll| {
                let mut debounced_ref = debounced.borrow_mut();
                if (*debounced_ref).is_some() {
                    return;
                }
                let cb = cb.clone();
                let debounced = debounced.clone();
                *debounced_ref = Some(Timeout::new(millis, move || {
                    cb.emit(scroll);
                    *debounced.borrow_mut() = None;
                }))
            })
        },
        cb,
    ))
    .clone()
}

#[function_component]
pub fn VariableSizeList(props: &VariableSizeListProps) -> Html {
    let update = use_force_update();
    let manager = use_mut_ref(|| ScrollManager::new(update));

    let host_ref = use_node_ref();
    {
        let scroll_manager = manager.clone();
        let host_ref = host_ref.clone();
        use_effect_with_deps(
            move |_| {
                if let Some(host) = host_ref.cast::<Element>() {
                    scroll_manager.borrow_mut().mounted(host);
                }
                move || {
                    scroll_manager.borrow_mut().unmount();
                }
            },
            (),
        );
    }

    let onscroll = {
        let scroll_manager = manager.clone();
        let cb = use_callback(
            move |scroll: Event, _| {
                if let Some(el) = scroll.target_dyn_into::<Element>() {
                    scroll_manager.borrow_mut().update(el.scroll_top());
                }
            },
            (),
        );
        use_debounce(50, cb)
    };
    let contents = (*manager).borrow_mut().generate_contents(props);
    let style = format!(
        "width: {}px; height: {}px; overflow-y: auto; overflow-x: hidden;",
        props.width, props.height
    );

    html! {
        <div ref={host_ref} class={props.classes.clone()} style={style} {onscroll}>
            {contents}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(heights: &'static [u32]) -> impl FnMut(usize) -> u32 {
        move |i| heights[i]
    }

    #[test]
    fn empty_list() {
        let mut layout = RowLayout::new(0, 100);
        assert_eq!(layout.window(0, 500, 5, |_| unreachable!()), Window::default());
        assert_eq!(layout.total(), 0);
    }

    #[test]
    fn only_asks_for_rows_it_needs() {
        let mut asked = Vec::new();
        let mut layout = RowLayout::new(1000, 50);
        let window = layout.window(0, 100, 0, |i| {
            asked.push(i);
            40
        });
        assert_eq!(window.first, 0);
        assert_eq!(window.past_last, 3);
        assert_eq!(asked, [0, 1, 2]);
        assert_eq!(layout.measured(), 3);
        assert_eq!(window.after, 997 * 50);
    }

    #[test]
    fn scrolled_window_with_overscan() {
        let mut layout = RowLayout::new(6, 10);
        let window = layout.window(150, 100, 1, sizes(&[100, 100, 100, 100, 100, 100]));
        // rows 1 and 2 are visible
        assert_eq!(window.first, 0);
        assert_eq!(window.past_last, 4);
        assert_eq!(window.before, 0);
        assert_eq!(window.after, 10 + 10);
    }

    #[test]
    fn variable_heights_place_rows_exactly() {
        let mut layout = RowLayout::new(3, 100);
        let window = layout.window(460, 10, 0, sizes(&[151, 301, 76]));
        assert_eq!(window.first, 2);
        assert_eq!(window.past_last, 3);
        assert_eq!(window.before, 452);
        assert_eq!(window.after, 0);
        assert_eq!(layout.total(), 528);
        assert_eq!(layout.height(1), 301);
    }

    #[test]
    fn scrolled_past_end_shows_last_row() {
        let mut layout = RowLayout::new(2, 10);
        let window = layout.window(10_000, 100, 0, sizes(&[20, 20]));
        assert_eq!((window.first, window.past_last), (1, 2));
        assert_eq!(window.before, 20);
    }

    #[test]
    fn row_style_fixes_height() {
        let row = ListRow { index: 3, height: 301 };
        assert!(row.style().starts_with("height: 301px;"));
    }
}
