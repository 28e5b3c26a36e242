//! Channels deliver questions to the agent and carry answers back.
//!
//! - `repl`: interactive terminal
//! - `http`: JSON chat endpoint with spreadsheet downloads

mod channel;
mod http;
mod manager;
mod repl;
pub mod server;

pub use channel::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
pub use http::HttpChannel;
pub use manager::ChannelManager;
pub use repl::ReplChannel;
pub use server::ChatServer;
