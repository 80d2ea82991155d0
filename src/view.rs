//! Transient view state: cursor, sort, overlay, viewport, sequence counter.

use crate::message::SnapshotResponse;
use crate::store::{InstrumentKey, SortOrder, FIRST_ROW};

/// Depth overlay lifecycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Overlay {
    #[default]
    Hidden,
    /// Fetch in flight for this instrument
    Pending(InstrumentKey),
    Shown {
        key: InstrumentKey,
        book: SnapshotResponse,
    },
    Failed {
        key: InstrumentKey,
        reason: String,
    },
}

impl Overlay {
    pub fn is_shown(&self) -> bool {
        !matches!(self, Overlay::Hidden)
    }

    pub fn key(&self) -> Option<&InstrumentKey> {
        match self {
            Overlay::Hidden => None,
            Overlay::Pending(key) => Some(key),
            Overlay::Shown { key, .. } | Overlay::Failed { key, .. } => Some(key),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub selected_row: usize,
    pub selected_col: usize,
    pub sort: SortOrder,
    pub overlay: Overlay,
    pub width: u16,
    pub height: u16,
    /// Messages applied so far; display only
    pub seq: u64,
    /// Most recent recoverable failure, shown on the status line
    pub last_error: Option<String>,
}

impl ViewState {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            selected_row: FIRST_ROW,
            selected_col: 0,
            sort: SortOrder::None,
            overlay: Overlay::Hidden,
            width,
            height,
            seq: 0,
            last_error: None,
        }
    }

    /// Screen lines available to instrument rows (header and status excluded).
    pub fn body_height(&self) -> usize {
        (self.height as usize).saturating_sub(2).max(1)
    }

    /// First pad row shown in the body: the selected row becomes the last
    /// visible line once it would fall below the window.
    pub fn top_row(&self) -> usize {
        let body = self.body_height();
        if self.selected_row >= FIRST_ROW + body {
            self.selected_row + 1 - body
        } else {
            FIRST_ROW
        }
    }
}
