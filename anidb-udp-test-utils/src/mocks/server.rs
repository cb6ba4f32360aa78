//! Loopback AniDB UDP server

use anidb_udp_core::config::NetworkSettings;
use log::debug;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

type Responder = dyn Fn(&str) -> Option<String> + Send + Sync;

/// UDP server on 127.0.0.1 answering commands through a closure
///
/// The closure sees the command without its `tag=` parameter and returns the
/// reply text, or `None` to stay silent. Tags are echoed automatically.
pub struct MockUdpServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockUdpServer {
    pub async fn start<F>(responder: F) -> std::io::Result<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let received = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let log = Arc::clone(&received);
        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    break;
                };
                let text = String::from_utf8_lossy(&buf[..len]).into_owned();
                debug!("MockUdpServer <- {text}");
                log.lock().unwrap().push(text.clone());

                let (command, tag) = split_tag(&text);
                if let Some(reply) = responder(&command) {
                    let reply = match tag {
                        Some(tag) => format!("{tag} {reply}\n"),
                        None => format!("{reply}\n"),
                    };
                    let _ = socket.send_to(reply.as_bytes(), peer).await;
                }
            }
        });

        Ok(Self {
            addr,
            received,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Network settings pointing at this server
    pub fn network_settings(&self) -> NetworkSettings {
        NetworkSettings {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            request_timeout_secs: 2,
            ..NetworkSettings::default()
        }
    }

    /// Raw commands received so far, tags included
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for MockUdpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Remove the `tag=` parameter, returning it separately
fn split_tag(text: &str) -> (String, Option<String>) {
    let Some((name, params)) = text.split_once(' ') else {
        return (text.to_string(), None);
    };

    let mut tag = None;
    let rest: Vec<&str> = params
        .split('&')
        .filter(|pair| match pair.strip_prefix("tag=") {
            Some(value) => {
                tag = Some(value.to_string());
                false
            }
            None => true,
        })
        .collect();

    if rest.is_empty() {
        (name.to_string(), tag)
    } else {
        (format!("{name} {}", rest.join("&")), tag)
    }
}
