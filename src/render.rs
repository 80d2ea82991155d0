//! Render Engine - fixed-column grid over an off-screen pad.
//!
//! Rows are drawn into a pad of one-line [`Buffer`]s (row 0 is the header,
//! row `n` is the instrument at row `n`). A refresh blits the visible window
//! of the pad to the terminal:
//!
//! ```text
//! line 0          header (pad row 0, pinned)
//! line 1..=body   pad rows top..top+body
//! last line       status
//! ```
//!
//! Drawing reads state only. Failures are logged here and never propagate.

use arrayvec::ArrayVec;
use ratatui::backend::Backend;
use ratatui::buffer::{Buffer, Cell};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use ratatui::{Frame, Terminal};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::RenderError;
use crate::fixed::to_decimal;
use crate::message::{DepthLevel, Side};
use crate::store::{Instrument, InstrumentStore, SortOrder, Trend};
use crate::view::{Overlay, ViewState};

/// Default pad capacity in rows (header included).
pub const DEFAULT_PAD_ROWS: usize = 999;

/// Pad width in cells; wide enough for every column.
pub const PAD_WIDTH: u16 = 150;

const QTY_DP: u32 = 4;
const PX_DP: u32 = 7;

/// A table column at a fixed horizontal offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub x: u16,
    pub width: u16,
}

pub const COLUMN_COUNT: usize = 9;

pub const COLUMNS: [Column; COLUMN_COUNT] = [
    Column { title: "TICKER", x: 0, width: 20 },
    Column { title: "BID QTY", x: 21, width: 14 },
    Column { title: "BID", x: 36, width: 16 },
    Column { title: "ASK", x: 53, width: 18 },
    Column { title: "ASK QTY", x: 72, width: 14 },
    Column { title: "SPREAD", x: 87, width: 18 },
    Column { title: "LAST", x: 106, width: 16 },
    Column { title: "UPD", x: 123, width: 10 },
    Column { title: "TOTAL QTY", x: 134, width: 16 },
];

const COL_BID: usize = 2;
const COL_ASK: usize = 3;
const COL_LAST: usize = 6;

const HEADER_STYLE: Style = Style::new().add_modifier(Modifier::BOLD);
const COLUMN_HIGHLIGHT: Style = Style::new().add_modifier(Modifier::BOLD).add_modifier(Modifier::UNDERLINED);
const ROW_HIGHLIGHT: Style = Style::new()
    .fg(Color::Red)
    .bg(Color::White)
    .add_modifier(Modifier::REVERSED);
const ALERT: Style = Style::new()
    .fg(Color::Red)
    .bg(Color::White)
    .remove_modifier(Modifier::REVERSED);
const MARKED: Style = Style::new().fg(Color::Yellow);

/// Right-aligned fixed-precision decimal.
pub fn fmt_fixed(value: Decimal, dp: u32, width: usize) -> String {
    format!("{:>width$.prec$}", value.round_dp(dp), width = width, prec = dp as usize)
}

fn trend_style(trend: Trend) -> Style {
    match trend {
        Trend::Up => Style::new().fg(Color::Green),
        Trend::Down => Style::new().fg(Color::Red),
        Trend::Neutral => Style::new().fg(Color::White),
    }
}

/// Numbers that do not fit their column are shown as `#` fill rather than
/// cut to a wrong magnitude.
fn saturate(text: String, width: u16) -> String {
    if text.chars().count() <= width as usize {
        text
    } else {
        "#".repeat(width as usize)
    }
}

/// Labels that do not fit keep their head and end in `~`.
fn ellipsize(text: String, width: u16) -> String {
    let width = width as usize;
    if text.chars().count() <= width {
        return text;
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

/// Text and base style of every cell in an instrument row.
fn row_cells(inst: &Instrument) -> ArrayVec<(String, Style), COLUMN_COUNT> {
    let w = |idx: usize| COLUMNS[idx].width;
    let mut cells = ArrayVec::new();
    let ticker = if inst.marked {
        (ellipsize(format!("*{}", inst.label), w(0)), MARKED)
    } else {
        (ellipsize(inst.label.clone(), w(0)), Style::new())
    };
    cells.push(ticker);
    cells.push((saturate(fmt_fixed(inst.bid_qty, QTY_DP, 14), w(1)), Style::new()));
    cells.push((saturate(fmt_fixed(inst.bid_px, PX_DP, 16), w(2)), Style::new()));
    cells.push((saturate(format!("x {}", fmt_fixed(inst.ask_px, PX_DP, 16)), w(3)), Style::new()));
    cells.push((saturate(fmt_fixed(inst.ask_qty, QTY_DP, 14), w(4)), Style::new()));
    cells.push((saturate(format!("({})", fmt_fixed(inst.spread(), PX_DP, 16)), w(5)), Style::new()));
    cells.push((saturate(fmt_fixed(inst.last_px, PX_DP, 16), w(6)), trend_style(inst.trend)));
    cells.push((saturate(format!("{:>10}", inst.updates), w(7)), Style::new()));
    cells.push((saturate(fmt_fixed(inst.total_qty, QTY_DP, 16), w(8)), Style::new()));
    cells
}

fn status_line(view: &ViewState, instruments: usize) -> String {
    let sort = match view.sort {
        SortOrder::None => "-",
        SortOrder::Ascending => "asc",
        SortOrder::Descending => "desc",
    };
    let col = COLUMNS.get(view.selected_col).map_or("?", |c| c.title);
    let mut line = format!(
        "{} | {} instruments | sort {} | row {} | col {}",
        view.seq, instruments, sort, view.selected_row, col
    );
    if let Some(err) = &view.last_error {
        line.push_str(" | last error: ");
        line.push_str(err);
    }
    line
}

/// Copies the visible window of the pad onto the screen.
struct PadView<'a> {
    pad: &'a [Buffer],
    top: usize,
    status: String,
}

impl Widget for PadView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let body = area.height.saturating_sub(2).max(1);

        let mut blit = |screen_y: u16, pad_y: usize| {
            let Some(line) = self.pad.get(pad_y) else { return };
            let width = area.width.min(line.area.width);
            for x in 0..width {
                *buf.get_mut(area.x + x, area.y + screen_y) = line.get(x, 0).clone();
            }
        };

        blit(0, 0);
        for line in 0..body {
            if 1 + line >= area.height {
                break;
            }
            blit(1 + line, self.top + line as usize);
        }
        if area.height >= 2 {
            buf.set_stringn(
                area.x,
                area.y + area.height - 1,
                &self.status,
                area.width as usize,
                Style::new(),
            );
        }
    }
}

/// Quantity/price lines for one side of a depth snapshot, with a relative
/// size bar.
fn level_lines(levels: &[DepthLevel], side: Side, bar_width: usize) -> Vec<Line<'static>> {
    let max_qty = levels.iter().map(|l| l.qty).max().unwrap_or(1).max(1);
    let color = match side {
        Side::Bid => Color::Green,
        Side::Ask => Color::Red,
    };
    levels
        .iter()
        .map(|level| {
            let bar_len = ((level.qty as u128 * bar_width as u128) / max_qty as u128) as usize;
            let text = format!(
                "{} {} {}",
                fmt_fixed(to_decimal(level.qty), QTY_DP, 12),
                fmt_fixed(to_decimal(level.price), PX_DP, 14),
                "█".repeat(bar_len)
            );
            Line::styled(text, Style::new().fg(color))
        })
        .collect()
}

fn draw_overlay(f: &mut Frame, area: Rect, overlay: &Overlay) {
    let (title, bids, asks) = match overlay {
        Overlay::Hidden => return,
        Overlay::Pending(key) => (
            format!(" {} depth ", key),
            vec![Line::raw("loading...")],
            Vec::new(),
        ),
        Overlay::Failed { key, reason } => (
            format!(" {} depth ", key),
            vec![Line::styled(format!("error: {}", reason), ALERT)],
            Vec::new(),
        ),
        Overlay::Shown { key, book } => (
            format!(" {} depth ", key),
            level_lines(book.side(Side::Bid), Side::Bid, 6),
            level_lines(book.side(Side::Ask), Side::Ask, 6),
        ),
    };

    let rows = bids.len().max(asks.len()).max(1) as u16;
    let width = area.width.min(PAD_WIDTH - 14);
    let height = (rows + 3).min(area.height.saturating_sub(2)).max(3.min(area.height));
    let rect = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(rect);
    f.render_widget(Clear, rect);
    f.render_widget(block, rect);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let mut bid_lines = vec![Line::styled("BIDS", HEADER_STYLE)];
    bid_lines.extend(bids);
    let mut ask_lines = vec![Line::styled("ASKS", HEADER_STYLE)];
    ask_lines.extend(asks);

    f.render_widget(Paragraph::new(bid_lines), halves[0]);
    f.render_widget(Paragraph::new(ask_lines), halves[1]);
}

/// Owns the pad and the terminal surface.
pub struct RenderEngine<B: Backend> {
    terminal: Terminal<B>,
    /// One single-line buffer per pad row
    pad: Vec<Buffer>,
}

impl<B: Backend> RenderEngine<B> {
    pub fn new(terminal: Terminal<B>) -> Self {
        Self::with_capacity(terminal, DEFAULT_PAD_ROWS)
    }

    pub fn with_capacity(terminal: Terminal<B>, rows: usize) -> Self {
        let rows = rows.clamp(2, u16::MAX as usize) as u16;
        Self {
            terminal,
            pad: (0..rows).map(|_| Buffer::empty(Rect::new(0, 0, PAD_WIDTH, 1))).collect(),
        }
    }

    /// Rows the pad can hold, header included.
    pub fn capacity(&self) -> usize {
        self.pad.len()
    }

    pub fn pad(&self) -> &[Buffer] {
        &self.pad
    }

    /// The pad cell at column `x` of `row`, if both are inside the pad.
    pub fn cell(&self, x: u16, row: usize) -> Option<&Cell> {
        let line = self.pad.get(row)?;
        (x < line.area.width).then(|| line.get(x, 0))
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Current terminal size as `(width, height)`.
    pub fn size(&self) -> (u16, u16) {
        match self.terminal.size() {
            Ok(area) => (area.width, area.height),
            Err(e) => {
                warn!(op = "size", error = %e, "cannot query terminal size");
                (PAD_WIDTH, 24)
            }
        }
    }

    /// Text of one pad row, trailing blanks trimmed.
    pub fn pad_line(&self, row: usize) -> String {
        let Some(line) = self.pad.get(row) else {
            return String::new();
        };
        let text: String = (0..line.area.width).map(|x| line.get(x, 0).symbol()).collect();
        text.trim_end().to_string()
    }

    // ========================================================================
    // Pad drawing
    // ========================================================================

    pub fn draw_header(&mut self, view: &ViewState) {
        self.clear_pad_row(0);
        for (i, col) in COLUMNS.iter().enumerate() {
            let text = if i == 0 {
                format!("{:<w$}", col.title, w = col.width as usize)
            } else {
                format!("{:>w$}", col.title, w = col.width as usize)
            };
            let style = if i == view.selected_col {
                HEADER_STYLE.patch(COLUMN_HIGHLIGHT)
            } else {
                HEADER_STYLE
            };
            self.pad[0].set_stringn(col.x, 0, &text, col.width as usize, style);
        }
    }

    /// Draw one instrument row. With `clearing` the row highlight is left
    /// off even when the row is selected.
    pub fn draw_row(&mut self, inst: &Instrument, view: &ViewState, clearing: bool) {
        if let Err(e) = self.try_draw_row(inst, view, clearing) {
            warn!(row = inst.row, key = %inst.label, op = "draw_row", error = %e, "render failed");
        }
    }

    fn try_draw_row(&mut self, inst: &Instrument, view: &ViewState, clearing: bool) -> Result<(), RenderError> {
        if inst.row == 0 || inst.row >= self.capacity() {
            return Err(RenderError::OutOfBounds {
                row: inst.row,
                key: inst.label.clone(),
                capacity: self.capacity(),
            });
        }
        self.clear_pad_row(inst.row);
        let selected = !clearing && inst.row == view.selected_row;
        let line = &mut self.pad[inst.row];
        let width = line.area.width;

        for (i, (text, base)) in row_cells(inst).into_iter().enumerate() {
            let col = COLUMNS[i];
            if col.x >= width {
                break;
            }
            let style = if selected && i == view.selected_col {
                base.patch(COLUMN_HIGHLIGHT)
            } else {
                base
            };
            let room = col.width.min(width - col.x);
            line.set_stringn(col.x, 0, &text, room as usize, style);
        }

        if selected {
            line.set_style(Rect::new(0, 0, width, 1), ROW_HIGHLIGHT);
        }

        if inst.is_crossed() {
            for idx in [COL_BID, COL_ASK] {
                let col = COLUMNS[idx];
                if col.x < width {
                    line.set_style(Rect::new(col.x, 0, col.width.min(width - col.x), 1), ALERT);
                }
            }
        }
        Ok(())
    }

    /// Draw whatever sits at `row`; no-op for an empty row.
    pub fn draw_row_at(&mut self, row: usize, store: &InstrumentStore, view: &ViewState, clearing: bool) {
        if let Some(inst) = store.by_row(row) {
            self.draw_row(inst, view, clearing);
        }
    }

    fn clear_pad_row(&mut self, row: usize) {
        if let Some(line) = self.pad.get_mut(row) {
            line.reset();
        }
    }

    // ========================================================================
    // Screen
    // ========================================================================

    /// Blit the visible pad window, status line and overlay to the terminal.
    pub fn refresh_viewport(&mut self, view: &ViewState, store: &InstrumentStore) {
        let pad = &self.pad;
        let top = view.top_row();
        let status = status_line(view, store.len());
        let overlay = &view.overlay;

        let result = self.terminal.draw(|f| {
            let area = f.size();
            f.render_widget(PadView { pad, top, status }, area);
            draw_overlay(f, area, overlay);
        });
        if let Err(e) = result {
            let e = RenderError::from(e);
            warn!(op = "refresh_viewport", top, error = %e, "render failed");
        }
    }

    /// Clear everything and redraw header and every row from state.
    pub fn redraw_all(&mut self, store: &InstrumentStore, view: &ViewState) {
        for line in &mut self.pad {
            line.reset();
        }
        if let Err(e) = self.terminal.clear() {
            warn!(op = "redraw_all", error = %e, "terminal clear failed");
        }
        self.draw_header(view);
        for inst in store.iter_rows() {
            self.draw_row(inst, view, false);
        }
        self.refresh_viewport(view, store);
    }

    /// Pick up a new terminal size; the caller follows with [`redraw_all`].
    ///
    /// [`redraw_all`]: RenderEngine::redraw_all
    pub fn resize(&mut self) -> (u16, u16) {
        if let Err(e) = self.terminal.autoresize() {
            warn!(op = "resize", error = %e, "terminal resize failed");
        }
        self.size()
    }
}
