//! Input Controller - keyboard commands over the view state.
//!
//! Handlers run to completion on the mutation loop, so a highlight move
//! (clear old row, draw new row, refresh) is never interleaved with a stream
//! update.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::Backend;
use tracing::debug;

use crate::render::{RenderEngine, COLUMN_COUNT};
use crate::store::{InstrumentKey, InstrumentStore, SortOrder, FIRST_ROW};
use crate::view::{Overlay, ViewState};

/// A decoded user intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleSnapshot,
    SortAscending,
    SortDescending,
    ToggleMark,
    Up,
    Down,
    Top,
    Bottom,
    Left,
    Right,
    Resize,
}

impl Command {
    /// Map a terminal event to a command; `None` for unbound keys.
    pub fn from_event(event: &Event) -> Option<Self> {
        match event {
            Event::Key(key) => Self::from_key(key),
            Event::Resize(_, _) => Some(Command::Resize),
            _ => None,
        }
    }

    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let cmd = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
            KeyCode::Char('q') | KeyCode::Esc => Command::Quit,
            KeyCode::Char('b') => Command::ToggleSnapshot,
            KeyCode::Char('h') => Command::SortAscending,
            KeyCode::Char('H') => Command::SortDescending,
            KeyCode::Char(' ') => Command::ToggleMark,
            KeyCode::Up | KeyCode::Char('k') => Command::Up,
            KeyCode::Down | KeyCode::Char('j') => Command::Down,
            KeyCode::PageUp | KeyCode::Home => Command::Top,
            KeyCode::PageDown | KeyCode::End => Command::Bottom,
            KeyCode::Left => Command::Left,
            KeyCode::Right => Command::Right,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Follow-up work the coordinator has to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Quit,
    FetchSnapshot(InstrumentKey),
}

/// Apply one command. Pure state mutation plus draw calls.
pub fn handle<B: Backend>(
    cmd: Command,
    store: &mut InstrumentStore,
    view: &mut ViewState,
    render: &mut RenderEngine<B>,
) -> Option<Effect> {
    debug!(?cmd, row = view.selected_row, col = view.selected_col, "key command");
    match cmd {
        Command::Quit => return Some(Effect::Quit),
        Command::ToggleSnapshot => return toggle_snapshot(store, view, render),
        Command::SortAscending | Command::SortDescending => {
            let descending = cmd == Command::SortDescending;
            store.sort_by_key(descending);
            view.sort = if descending {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            render.redraw_all(store, view);
        }
        Command::ToggleMark => {
            if store.toggle_mark(view.selected_row).is_some() {
                render.draw_row_at(view.selected_row, store, view, false);
                render.refresh_viewport(view, store);
            }
        }
        Command::Up => {
            if view.selected_row > FIRST_ROW && store.by_row(view.selected_row - 1).is_some() {
                move_selection(view.selected_row - 1, store, view, render);
            }
        }
        Command::Down => {
            if store.by_row(view.selected_row + 1).is_some() {
                move_selection(view.selected_row + 1, store, view, render);
            }
        }
        Command::Top => {
            if !store.is_empty() {
                move_selection(FIRST_ROW, store, view, render);
            }
        }
        Command::Bottom => {
            if let Some(last) = store.last_row() {
                move_selection(last, store, view, render);
            }
        }
        Command::Left => {
            if view.selected_col > 0 {
                view.selected_col -= 1;
                redraw_selected_cells(store, view, render);
            }
        }
        Command::Right => {
            if view.selected_col + 1 < COLUMN_COUNT {
                view.selected_col += 1;
                redraw_selected_cells(store, view, render);
            }
        }
        Command::Resize => {
            let (width, height) = render.resize();
            view.width = width;
            view.height = height;
            render.redraw_all(store, view);
        }
    }
    None
}

/// Clear the old highlight and draw the new one before a single refresh.
fn move_selection<B: Backend>(
    target: usize,
    store: &InstrumentStore,
    view: &mut ViewState,
    render: &mut RenderEngine<B>,
) {
    if target == view.selected_row {
        return;
    }
    render.draw_row_at(view.selected_row, store, view, true);
    view.selected_row = target;
    render.draw_row_at(view.selected_row, store, view, false);
    render.refresh_viewport(view, store);
}

fn redraw_selected_cells<B: Backend>(
    store: &InstrumentStore,
    view: &ViewState,
    render: &mut RenderEngine<B>,
) {
    render.draw_header(view);
    render.draw_row_at(view.selected_row, store, view, false);
    render.refresh_viewport(view, store);
}

fn toggle_snapshot<B: Backend>(
    store: &InstrumentStore,
    view: &mut ViewState,
    render: &mut RenderEngine<B>,
) -> Option<Effect> {
    if view.overlay.is_shown() {
        view.overlay = Overlay::Hidden;
        render.redraw_all(store, view);
        return None;
    }
    let key = store.key_at(view.selected_row)?.clone();
    view.overlay = Overlay::Pending(key.clone());
    render.refresh_viewport(view, store);
    Some(Effect::FetchSnapshot(key))
}
