//! Fetches the viewport of every page of a document.

use futures::future::{try_join_all, LocalBoxFuture};

use crate::error::LoadError;
use crate::geometry::PageViewport;

/// Source of per-page geometry, typically an opened document.
pub trait PageGeometry {
    fn page_count(&self) -> u32;

    /// Viewport of the one-based `page_number` at scale 1.
    fn page_viewport(&self, page_number: u32) -> LocalBoxFuture<'_, Result<PageViewport, LoadError>>;
}

/// Loads the viewports of all pages of `doc`, concurrently.
///
/// The result is in page order no matter in which order the fetches finish.
/// A single failing page fails the whole load.
pub async fn load_viewports<D: PageGeometry + ?Sized>(doc: &D) -> Result<Vec<PageViewport>, LoadError> {
    let count = doc.page_count();
    log::debug!("loading viewports of {count} pages");
    let viewports = try_join_all((1..=count).map(|page| doc.page_viewport(page))).await?;
    debug_assert_eq!(viewports.len(), count as usize);
    Ok(viewports)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::executor::block_on;
    use futures::FutureExt;

    /// Completes after being polled `remaining` more times.
    struct YieldN {
        remaining: usize,
    }

    impl Future for YieldN {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.remaining == 0 {
                return Poll::Ready(());
            }
            self.remaining -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    struct FakeDoc {
        pages: Vec<(f64, f64)>,
        failing: Option<u32>,
        completed: RefCell<Vec<u32>>,
    }

    impl FakeDoc {
        fn new(pages: &[(f64, f64)]) -> Self {
            Self {
                pages: pages.to_vec(),
                failing: None,
                completed: RefCell::default(),
            }
        }
    }

    impl PageGeometry for FakeDoc {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_viewport(&self, page_number: u32) -> LocalBoxFuture<'_, Result<PageViewport, LoadError>> {
            let (w, h) = self.pages[page_number as usize - 1];
            // later pages finish first
            let delay = self.pages.len() - page_number as usize;
            async move {
                YieldN { remaining: delay * 2 }.await;
                self.completed.borrow_mut().push(page_number);
                if self.failing == Some(page_number) {
                    return Err(LoadError::PageFetch {
                        page: page_number,
                        message: "broken".into(),
                    });
                }
                PageViewport::new(page_number, w, h)
            }
            .boxed_local()
        }
    }

    #[test]
    fn keeps_page_order_when_completion_is_reversed() {
        let doc = FakeDoc::new(&[(200.0, 300.0), (200.0, 600.0), (400.0, 300.0), (10.0, 20.0)]);
        let viewports = block_on(load_viewports(&doc)).unwrap();
        assert_eq!(*doc.completed.borrow(), [4, 3, 2, 1]);
        let sizes: Vec<_> = viewports.iter().map(|v| (v.width(), v.height())).collect();
        assert_eq!(sizes, doc.pages);
    }

    #[test]
    fn empty_document() {
        let doc = FakeDoc::new(&[]);
        assert!(block_on(load_viewports(&doc)).unwrap().is_empty());
    }

    #[test]
    fn one_failing_page_fails_the_load() {
        let mut doc = FakeDoc::new(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        doc.failing = Some(2);
        assert!(matches!(
            block_on(load_viewports(&doc)),
            Err(LoadError::PageFetch { page: 2, .. })
        ));
    }

    #[test]
    fn degenerate_page_fails_the_load() {
        let doc = FakeDoc::new(&[(100.0, 100.0), (0.0, 100.0)]);
        assert!(matches!(
            block_on(load_viewports(&doc)),
            Err(LoadError::DegenerateGeometry { page: 2, .. })
        ));
    }
}
