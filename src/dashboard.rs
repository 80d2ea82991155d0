//! The single mutation point.
//!
//! Owns the instrument store, the view state and the render engine. Every
//! event (stream message, key command, snapshot result) is applied here to
//! completion before the next one is looked at.

use ratatui::backend::Backend;
use tracing::{debug, warn};

use crate::error::SnapshotError;
use crate::input::{self, Command, Effect};
use crate::message::{Message, SnapshotResponse};
use crate::render::RenderEngine;
use crate::store::{InstrumentKey, InstrumentStore, RecolorPolicy};
use crate::view::{Overlay, ViewState};

pub struct Dashboard<B: Backend> {
    store: InstrumentStore,
    view: ViewState,
    render: RenderEngine<B>,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(render: RenderEngine<B>, policy: RecolorPolicy) -> Self {
        let (width, height) = render.size();
        Self {
            store: InstrumentStore::new(policy),
            view: ViewState::new(width, height),
            render,
        }
    }

    pub fn store(&self) -> &InstrumentStore {
        &self.store
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn render(&self) -> &RenderEngine<B> {
        &self.render
    }

    /// First paint: header and empty table.
    pub fn start(&mut self) {
        debug!(
            policy = ?self.store.policy(),
            width = self.view.width,
            height = self.view.height,
            "dashboard started"
        );
        self.render.redraw_all(&self.store, &self.view);
    }

    /// Apply a stream message, then redraw only its row.
    pub fn on_message(&mut self, msg: &Message) {
        self.view.seq += 1;
        let row = self.store.apply(msg);
        self.render.draw_row_at(row, &self.store, &self.view, false);
        self.render.refresh_viewport(&self.view, &self.store);
    }

    pub fn on_command(&mut self, cmd: Command) -> Option<Effect> {
        input::handle(cmd, &mut self.store, &mut self.view, &mut self.render)
    }

    /// Deliver a finished snapshot fetch. Ignored unless the overlay is still
    /// waiting for that instrument.
    pub fn on_snapshot(&mut self, key: InstrumentKey, result: Result<SnapshotResponse, SnapshotError>) {
        if self.view.overlay != Overlay::Pending(key.clone()) {
            debug!(%key, "discarding stale snapshot result");
            return;
        }
        self.view.overlay = match result {
            Ok(book) => Overlay::Shown { key, book },
            Err(e) => {
                warn!(%key, op = "snapshot", error = %e, "snapshot fetch failed");
                let reason = e.to_string();
                self.view.last_error = Some(format!("{key}: {reason}"));
                Overlay::Failed { key, reason }
            }
        };
        self.render.refresh_viewport(&self.view, &self.store);
    }
}
