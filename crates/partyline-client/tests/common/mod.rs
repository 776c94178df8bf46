//! In-process mock of a bot's party-line console.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use partyline_client::{ConnectionConfig, Timeouts};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const HANDLE: &str = "admin";
pub const PASSWORD: &str = "secret";

/// One step of a per-connection script.
#[derive(Debug, Clone)]
pub enum Step {
    /// Write a line (a `\n` is appended).
    Send(String),
    /// Write raw bytes as-is.
    SendRaw(Vec<u8>),
    /// Read one line; drop the connection unless it equals the given text.
    Expect(String),
    /// Read one command line and answer with the given text.
    Reply(String),
    /// Read one command line and answer with raw bytes as-is.
    ReplyRaw(Vec<u8>),
    /// Write noise lines forever.
    Flood,
    /// Keep the connection open without writing anything.
    Hang,
    /// Drop the connection.
    Close,
}

pub fn send(line: &str) -> Step {
    Step::Send(line.to_string())
}

pub fn expect(line: &str) -> Step {
    Step::Expect(line.to_string())
}

pub fn reply(line: &str) -> Step {
    Step::Reply(line.to_string())
}

/// Banner, MOTD noise and the three login prompts.
pub fn login() -> Vec<Step> {
    vec![
        send("Eggdrop v1.9.5 (C) 1997 Robey Pointer"),
        send(""),
        send("Welcome to the party line of TestBot"),
        send("Please enter your handle."),
        expect(HANDLE),
        send("Enter your password."),
        expect(PASSWORD),
        send("Connected to TestBot, running eggdrop v1.9.5"),
        send("*** admin joined the party line."),
    ]
}

/// `login()` followed by `extra`.
pub fn login_then(extra: Vec<Step>) -> Vec<Step> {
    let mut script = login();
    script.extend(extra);
    script
}

/// A listening mock console.
///
/// Connection `n` runs `scripts[n]`, or the last script once they run out.
/// After its script a connection answers every line with `ack: <line>`.
pub struct MockBot {
    port: u16,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockBot {
    pub async fn start(script: Vec<Step>) -> MockBot {
        MockBot::start_with(vec![script]).await
    }

    pub async fn start_with(scripts: Vec<Vec<Step>>) -> MockBot {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let port = listener.local_addr().expect("local addr").port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = {
            let received = received.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let index = connections.fetch_add(1, Ordering::SeqCst);
                    let script = scripts[index.min(scripts.len() - 1)].clone();
                    tokio::spawn(serve(stream, script, received.clone()));
                }
            })
        };

        MockBot {
            port,
            received,
            connections,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Client config for this bot with short timeouts.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig::new("127.0.0.1", self.port, HANDLE, PASSWORD)
            .with_timeouts(Timeouts::uniform(Duration::from_secs(2)))
    }

    /// Every line received so far, terminators included.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().expect("received lock").clone()
    }

    /// Lines received after the login answers.
    pub fn commands(&self) -> Vec<String> {
        self.received()
            .into_iter()
            .filter(|line| line != &format!("{HANDLE}\n") && line != &format!("{PASSWORD}\n"))
            .collect()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl Drop for MockBot {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(stream: TcpStream, script: Vec<Step>, received: Arc<Mutex<Vec<String>>>) {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    for step in script {
        match step {
            Step::Send(line) => {
                if write_line(&mut write, &line).await.is_err() {
                    return;
                }
            }
            Step::SendRaw(bytes) => {
                if write.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Step::Expect(expected) => match next_line(&mut reader, &received).await {
                Some(line) if line.trim_end_matches(['\r', '\n']) == expected => {}
                _ => return,
            },
            Step::Reply(answer) => {
                if next_line(&mut reader, &received).await.is_none() {
                    return;
                }
                if write_line(&mut write, &answer).await.is_err() {
                    return;
                }
            }
            Step::ReplyRaw(bytes) => {
                if next_line(&mut reader, &received).await.is_none() {
                    return;
                }
                if write.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Step::Flood => {
                let mut n = 0u64;
                loop {
                    n += 1;
                    if write_line(&mut write, &format!("MOTD line {n}")).await.is_err() {
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
            Step::Hang => std::future::pending::<()>().await,
            Step::Close => return,
        }
    }

    while let Some(line) = next_line(&mut reader, &received).await {
        let ack = format!("ack: {}", line.trim_end_matches(['\r', '\n']));
        if write_line(&mut write, &ack).await.is_err() {
            return;
        }
    }
}

async fn next_line(
    reader: &mut BufReader<OwnedReadHalf>,
    received: &Mutex<Vec<String>>,
) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line).await {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            received.lock().expect("received lock").push(line.clone());
            Some(line)
        }
    }
}

async fn write_line(write: &mut OwnedWriteHalf, line: &str) -> std::io::Result<()> {
    write.write_all(line.as_bytes()).await?;
    write.write_all(b"\n").await?;
    write.flush().await
}
