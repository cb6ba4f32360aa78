//! Mock AniDB endpoints for testing

mod server;
mod transport;

pub use server::MockUdpServer;
pub use transport::{Reply, ScriptedTransport, SentCommand};
