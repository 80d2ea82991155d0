//! Coordinator - terminal lifecycle, task wiring and shutdown.
//!
//! ```text
//! [stream task] --messages--> |                 |
//! [key worker]  --events----> | mutation loop   | --> [terminal]
//! [fetch task]  --snapshot--> | (Dashboard)     |
//! ```
//!
//! Only the key worker runs on a blocking thread; everything that touches
//! the dashboard runs on the loop.

use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use futures_util::Stream;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::error::{SnapshotError, StreamError};
use crate::ingest::StreamIngestor;
use crate::input::{Command, Effect};
use crate::message::SnapshotResponse;
use crate::render::RenderEngine;
use crate::snapshot::SnapshotClient;
use crate::store::InstrumentKey;

/// How often the key worker checks for cancellation while idle.
const KEY_POLL: Duration = Duration::from_millis(100);

// ============================================================================
// Terminal
// ============================================================================

/// Raw mode, alternate screen and hidden cursor for as long as it lives.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn acquire() -> io::Result<(Self, Terminal<CrosstermBackend<Stdout>>)> {
        enable_raw_mode()?;
        // From here on, dropping the guard undoes whatever succeeded.
        let guard = TerminalGuard { _private: () };
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok((guard, terminal))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = restore_terminal() {
            error!(error = %e, "terminal restore failed");
        }
    }
}

/// Echo on, cursor visible, main screen back.
pub fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)?;
    Ok(())
}

/// Restore the terminal before the default panic report is printed.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        previous(info);
    }));
}

// ============================================================================
// Key worker
// ============================================================================

/// Read terminal events on a blocking thread and hand them to the loop.
pub fn spawn_key_reader(tx: mpsc::Sender<Event>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !cancel.is_cancelled() {
            match event::poll(KEY_POLL) {
                Ok(false) => continue,
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(op = "read_key", error = %e, "key read failed");
                        break;
                    }
                },
                Err(e) => {
                    warn!(op = "poll_key", error = %e, "key poll failed");
                    break;
                }
            }
        }
        debug!("key reader stopped");
    })
}

// ============================================================================
// Mutation loop
// ============================================================================

type SnapshotResult = (InstrumentKey, Result<SnapshotResponse, SnapshotError>);

pub struct Coordinator {
    snapshot: SnapshotClient,
    max_levels: u16,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(snapshot: SnapshotClient, max_levels: u16) -> Self {
        Self {
            snapshot,
            max_levels,
            cancel: CancellationToken::new(),
        }
    }

    /// Token observed by every task; cancelling it stops the dashboard.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until quit, key source exhaustion, cancellation, or stream loss.
    ///
    /// Stream loss is the only error. Every message received before the loss
    /// is applied first.
    pub async fn run<B, S>(
        &self,
        dash: &mut Dashboard<B>,
        ingestor: StreamIngestor,
        stream: S,
        mut keys: mpsc::Receiver<Event>,
    ) -> Result<(), StreamError>
    where
        B: Backend,
        S: Stream<Item = Result<WsMessage, WsError>> + Unpin + Send + 'static,
    {
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
        let stream_task = tokio::spawn(ingestor.run(stream, msg_tx, self.cancel.clone()));
        let (snap_tx, mut snap_rx) = mpsc::unbounded_channel::<SnapshotResult>();
        let mut in_flight: Option<JoinHandle<()>> = None;

        dash.start();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                msg = msg_rx.recv() => match msg {
                    Some(msg) => dash.on_message(&msg),
                    None => break,
                },
                ev = keys.recv() => {
                    let Some(ev) = ev else { break };
                    let Some(cmd) = Command::from_event(&ev) else { continue };
                    match dash.on_command(cmd) {
                        Some(Effect::Quit) => {
                            info!("quit requested");
                            break;
                        }
                        Some(Effect::FetchSnapshot(key)) => {
                            if let Some(prev) = in_flight.take() {
                                prev.abort();
                            }
                            in_flight = Some(self.spawn_fetch(key, snap_tx.clone()));
                        }
                        None => {}
                    }
                }
                Some((key, result)) = snap_rx.recv() => dash.on_snapshot(key, result),
            }
        }

        self.cancel.cancel();
        if let Some(fetch) = in_flight {
            fetch.abort();
        }
        match stream_task.await {
            Ok(Ok(stats)) => {
                info!(?stats, "stream task stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "stream lost");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "stream task aborted");
                Err(StreamError::Closed)
            }
        }
    }

    fn spawn_fetch(&self, key: InstrumentKey, tx: mpsc::UnboundedSender<SnapshotResult>) -> JoinHandle<()> {
        let client = self.snapshot.clone();
        let max_levels = self.max_levels;
        tokio::spawn(async move {
            debug!(%key, max_levels, endpoint = client.endpoint(), "snapshot fetch");
            let result = client.fetch(&key.symbol, key.source, max_levels).await;
            let _ = tx.send((key, result));
        })
    }
}

/// Connect, take over the terminal, run, and restore the terminal.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let ingestor = StreamIngestor::new(config.stream_url.clone(), config.offset);
    let stream = ingestor.connect().await?;

    let coordinator = Coordinator::new(
        SnapshotClient::new(config.snapshot_addr.clone(), config.snapshot_timeout),
        config.max_levels,
    );

    install_panic_hook();
    let (guard, terminal) = TerminalGuard::acquire()?;
    let mut dash = Dashboard::new(RenderEngine::new(terminal), config.recolor);

    let (key_tx, key_rx) = mpsc::channel(64);
    let key_worker = spawn_key_reader(key_tx, coordinator.cancel_token());

    let result = coordinator.run(&mut dash, ingestor, stream, key_rx).await;

    if let Err(e) = key_worker.await {
        warn!(error = %e, "key reader join failed");
    }
    drop(guard);

    info!(
        instruments = dash.store().len(),
        messages = dash.view().seq,
        "dashboard stopped"
    );
    result.map_err(Into::into)
}
