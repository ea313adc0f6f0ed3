//! In-process feed hub.
//!
//! Every accepted connection is sent the same scripted frames, optionally
//! followed by a hub close record. Pings sent by clients are counted.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Hub close record.
pub const CLOSE_RECORD: &str = "{\"type\":7}\u{1e}";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Play the frames, then answer pings until the client leaves.
    Open,
    /// Play the frames, then send a close record.
    Closing,
    /// Complete the handshake, then never read or write.
    Silent,
}

#[derive(Clone)]
struct Script {
    frames: Arc<Vec<String>>,
    mode: Mode,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU32,
    pings: AtomicU32,
}

pub struct MockHub {
    addr: SocketAddr,
    stop: CancellationToken,
    counters: Arc<Counters>,
}

impl MockHub {
    /// Send `frames` on every connection and keep it open.
    pub async fn start(frames: Vec<String>) -> Self {
        Self::listen(frames, Mode::Open).await
    }

    /// Send `frames`, then a close record.
    pub async fn start_closing(frames: Vec<String>) -> Self {
        Self::listen(frames, Mode::Closing).await
    }

    /// Accept connections and go quiet.
    pub async fn start_silent() -> Self {
        Self::listen(Vec::new(), Mode::Silent).await
    }

    async fn listen(frames: Vec<String>, mode: Mode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let hub = Self {
            addr: listener.local_addr().unwrap(),
            stop: CancellationToken::new(),
            counters: Arc::new(Counters::default()),
        };
        let script = Script {
            frames: Arc::new(frames),
            mode,
        };

        let stop = hub.stop.clone();
        let counters = hub.counters.clone();
        tokio::spawn(async move {
            loop {
                let stream = tokio::select! {
                    () = stop.cancelled() => break,
                    conn = listener.accept() => match conn {
                        Ok((stream, _)) => stream,
                        Err(_) => continue,
                    },
                };
                counters.accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(play(stream, script.clone(), counters.clone(), stop.clone()));
            }
        });

        hub
    }

    pub fn url(&self) -> String {
        format!("ws://{}/hub", self.addr)
    }

    pub async fn connection_count(&self) -> u32 {
        self.counters.accepted.load(Ordering::SeqCst)
    }

    /// Ping frames received from clients.
    pub fn ping_count(&self) -> u32 {
        self.counters.pings.load(Ordering::SeqCst)
    }

    pub async fn shutdown(self) {
        self.stop.cancel();
    }
}

async fn play(stream: TcpStream, script: Script, counters: Arc<Counters>, stop: CancellationToken) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    if script.mode == Mode::Silent {
        // Hold the socket open without polling it.
        let _held = ws;
        stop.cancelled().await;
        return;
    }

    let (mut tx, mut rx) = ws.split();
    for frame in script.frames.iter() {
        if tx.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    if script.mode == Mode::Closing {
        let _ = tx.send(Message::Text(CLOSE_RECORD.to_string())).await;
    }

    while let Some(Ok(msg)) = rx.next().await {
        match msg {
            Message::Ping(payload) => {
                counters.pings.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(Message::Pong(payload)).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}
