//! Load cycle of the page viewports of one document at a time.

use std::rc::Rc;

use crate::error::{LayoutError, LoadError};
use crate::geometry::{DisplayGeometry, PageViewport};

/// Identity of an opened document. A reload gets a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentKey(pub u64);

/// Proof that a load was started. Only the ticket of the latest cycle can
/// complete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    key: DocumentKey,
    generation: u64,
}

impl LoadTicket {
    pub fn key(&self) -> DocumentKey {
        self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Loading {
        key: DocumentKey,
    },
    Ready {
        key: DocumentKey,
        viewports: Rc<[PageViewport]>,
    },
    Failed {
        key: DocumentKey,
        error: LoadError,
    },
}

/// Drives Idle → Loading → Ready (or Failed) for the current document.
///
/// Every `open` starts a new generation. A completion carrying an older
/// generation is dropped, so a slow load of a replaced document can never
/// overwrite the viewports of its successor.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayoutState {
    generation: u64,
    phase: Phase,
}

impl Default for PageLayoutState {
    fn default() -> Self {
        Self::new()
    }
}

impl PageLayoutState {
    pub fn new() -> Self {
        Self {
            generation: 0,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts loading the viewports of `key`.
    ///
    /// Returns `None` while a load of the same document is still in flight.
    pub fn open(&mut self, key: DocumentKey) -> Option<LoadTicket> {
        if matches!(self.phase, Phase::Loading { key: current } if current == key) {
            log::debug!("viewports of {key:?} already loading");
            return None;
        }
        self.generation += 1;
        self.phase = Phase::Loading { key };
        Some(LoadTicket {
            key,
            generation: self.generation,
        })
    }

    /// Completes the load started with `ticket`. Returns whether the result
    /// was applied.
    pub fn finish(&mut self, ticket: LoadTicket, result: Result<Vec<PageViewport>, LoadError>) -> bool {
        let current = matches!(self.phase, Phase::Loading { key } if key == ticket.key);
        if ticket.generation != self.generation || !current {
            log::debug!(
                "discarding stale viewports of {:?} (generation {} < {})",
                ticket.key,
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.phase = match result {
            Ok(viewports) => Phase::Ready {
                key: ticket.key,
                viewports: viewports.into(),
            },
            Err(error) => {
                log::error!("loading page viewports failed: {error}");
                Phase::Failed {
                    key: ticket.key,
                    error,
                }
            }
        };
        true
    }

    /// Forgets the current document. Loads still in flight become stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.phase = Phase::Idle;
    }

    pub fn viewports(&self) -> Option<&Rc<[PageViewport]>> {
        match &self.phase {
            Phase::Ready { viewports, .. } => Some(viewports),
            _ => None,
        }
    }

    pub fn page_count(&self) -> Option<usize> {
        self.viewports().map(|v| v.len())
    }

    pub fn row_height(&self, index: usize, geometry: &DisplayGeometry) -> Result<u32, LayoutError> {
        let viewports = self.viewports().ok_or(LayoutError::NotReady)?;
        geometry.page_height(index, viewports)
    }

    /// Height to assume for rows that have not been laid out yet: the first
    /// page once known, otherwise one and a half container widths.
    pub fn estimated_row_height(&self, geometry: &DisplayGeometry) -> u32 {
        self.row_height(0, geometry)
            .unwrap_or_else(|_| geometry.default_row_estimate())
    }
}
