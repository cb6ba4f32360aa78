//! Scripted in-memory transport

use anidb_udp_core::protocol::error::{ProtocolError, Result};
use anidb_udp_core::protocol::transport::Transport;
use async_trait::async_trait;
use log::trace;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::time::Instant;

/// How the fake server answers the next command
#[derive(Debug, Clone)]
pub enum Reply {
    /// Reply with `text`, prefixed with the command's tag
    Tagged(String),
    /// Reply with `text` as is
    Untagged(String),
    /// A late reply carrying some other tag, then the real one
    StaleThen { stale_tag: String, text: String },
    /// Never reply
    Silence,
}

/// A command as the server saw it
#[derive(Debug, Clone)]
pub struct SentCommand {
    pub text: String,
    pub at: Instant,
}

impl SentCommand {
    /// Command name
    pub fn command(&self) -> &str {
        self.text.split(' ').next().unwrap_or_default()
    }

    /// Value of a parameter, undecoded
    pub fn param(&self, key: &str) -> Option<&str> {
        let (_, params) = self.text.split_once(' ')?;
        params.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == key).then_some(v)
        })
    }
}

struct Script {
    replies: VecDeque<Reply>,
    sent: Vec<SentCommand>,
}

/// In-memory [`Transport`] that answers from a script
///
/// Clones share the script, so a test can keep one to inspect what the
/// handler sent.
///
/// ```rust,no_run
/// use anidb_udp_test_utils::{Reply, ScriptedTransport};
///
/// let transport = ScriptedTransport::new()
///     .reply("200 abc12 LOGIN ACCEPTED")
///     .reply("300 PONG");
/// ```
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    inbox_tx: mpsc::UnboundedSender<Vec<u8>>,
    inbox_rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            script: Arc::new(Mutex::new(Script {
                replies: VecDeque::new(),
                sent: Vec::new(),
            })),
            inbox_tx,
            inbox_rx: Arc::new(AsyncMutex::new(inbox_rx)),
        }
    }

    /// Queue a tagged reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Reply::Tagged(text.into()));
        self
    }

    /// Queue any reply
    pub fn then(self, reply: Reply) -> Self {
        self.push(reply);
        self
    }

    /// Queue a reply on an existing handle
    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().replies.push_back(reply);
    }

    /// Everything sent so far
    pub fn sent(&self) -> Vec<SentCommand> {
        self.script.lock().unwrap().sent.clone()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().replies.len()
    }

    fn deliver(&self, text: String) {
        // Receiver lives as long as self
        let _ = self.inbox_tx.send(text.into_bytes());
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data).into_owned();
        trace!("ScriptedTransport <- {text}");
        let sent = SentCommand {
            text,
            at: Instant::now(),
        };
        let tag = sent.param("tag").unwrap_or_default().to_string();

        let reply = {
            let mut script = self.script.lock().unwrap();
            script.sent.push(sent);
            script.replies.pop_front().unwrap_or(Reply::Silence)
        };

        match reply {
            Reply::Tagged(text) => self.deliver(format!("{tag} {text}")),
            Reply::Untagged(text) => self.deliver(text),
            Reply::StaleThen { stale_tag, text } => {
                self.deliver(format!("{stale_tag} 300 PONG"));
                self.deliver(format!("{tag} {text}"));
            }
            Reply::Silence => {}
        }
        Ok(())
    }

    async fn recv(&self, buffer: &mut [u8]) -> Result<usize> {
        let data = self.inbox_rx.lock().await.recv().await.ok_or_else(|| {
            ProtocolError::Transport(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted transport closed",
            ))
        })?;
        let len = data.len().min(buffer.len());
        buffer[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }
}
