//! # Tickboard
//!
//! A terminal dashboard for a live market-data stream.
//!
//! ## Design Principles
//!
//! - **Single mutation point**: one loop owns the store, view and screen
//! - **Row stability**: an instrument keeps its row until the user sorts
//! - **Fixed-point prices**: wire integers are scaled by 10^8, never floats
//! - **Failures stay local**: a bad frame or a failed snapshot never ends the session
//!
//! ## Architecture
//!
//! ```text
//! [WebSocket] --> [Stream Ingestor] --+
//! [Keyboard]  --> [Key Worker] -------+--> [Dashboard] --> [Terminal]
//! [Depth TCP] <-> [Snapshot Client] --+
//! ```

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod dashboard;
pub mod error;
pub mod fixed;
pub mod ingest;
pub mod input;
pub mod logging;
pub mod message;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod view;

// Re-exports for convenience
pub use codec::{decode_message, encode_message};
pub use config::{Args, Config};
pub use coordinator::Coordinator;
pub use dashboard::Dashboard;
pub use error::{ConfigError, DecodeError, EncodeError, FramingError, RenderError, SnapshotError, StreamError};
pub use ingest::{IngestStats, StreamIngestor};
pub use input::{Command, Effect};
pub use message::{DepthLevel, Message, Side, SnapshotRequest, SnapshotResponse, Tick, Trade};
pub use render::RenderEngine;
pub use snapshot::SnapshotClient;
pub use store::{Instrument, InstrumentKey, InstrumentStore, RecolorPolicy, SortOrder, Trend};
pub use view::{Overlay, ViewState};
