//! Sink implementations

pub mod discord;
pub mod local;
pub mod terminal;
pub mod transport;

pub use discord::{DiscordSink, RetryPolicy};
pub use local::LocalSink;
pub use terminal::TerminalSink;
pub use transport::{HttpsTransport, WebhookResponse, WebhookTransport};
