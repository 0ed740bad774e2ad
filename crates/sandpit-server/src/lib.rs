//! Preview controller and development server.
//!
//! Owns the execution lifecycle of component previews: transient document
//! handles, the isolation boundary in the host page, the bridge messages the
//! sandbox posts back, and the state machine tying them together.

pub mod boundary;
pub mod bridge;
pub mod controller;
pub mod handles;
pub mod realtime;
pub mod runner;
pub mod server;
pub mod watcher;
pub mod websocket;

pub use boundary::{Boundary, HostBoundary};
pub use bridge::{BridgeMessage, ExecutionId, ExecutionOutcome, OutcomeKind};
pub use controller::{
    ControllerEvent, NoTimer, PreviewController, PreviewState, ReleasePolicy, ReleaseTimer,
    StatusView,
};
pub use handles::{ExecutionHandle, HandleLookup, HandleStats, HandleStore};
pub use realtime::{ChannelError, ChannelEvent, ConnectionState, StatusChannel, Transport};
pub use runner::{controller_channel, spawn_controller, ControllerHandle, TokioReleaseTimer};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{HostEvent, HostMessage, StatusHub};
