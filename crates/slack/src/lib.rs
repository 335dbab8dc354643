//! Slack adapter for the food bot.
//!
//! - **Socket Mode** (`socket`, `transport`) - WebSocket connection to Slack (no public URL needed)
//! - **Events** (`events`) - frame decoding, addressing classification and dispatch
//! - **Messages** (`messages`) - outbound replies and the `ChatSink` seam
//! - **Web API** (`web`) - `auth.test`, `apps.connections.open`, `chat.postMessage`, `users.info`
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to the `message.*` bot events
//! 3. Set env vars: `GRUB_SLACK_APP_TOKEN`, `GRUB_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack socket → SocketModeRunner → EventDispatcher → MessageService → Assistant
//!                      ↓
//!               ChatSink (chat.postMessage) ← replies
//! ```

pub mod events;
pub mod messages;
pub mod socket;
pub mod transport;
pub mod web;

pub use events::{
    bot_dispatcher, EventDispatcher, MessageEvent, MessageService, SlackEnvelope, SlackEvent,
};
pub use messages::{ChatSink, OutboundMessage};
pub use socket::{ReconnectPolicy, SocketError, SocketModeRunner, SocketTransport};
pub use transport::SlackSocketTransport;
pub use web::{SlackApiError, SlackWebClient};
