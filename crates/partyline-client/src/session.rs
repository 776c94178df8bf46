//! Session lifecycle and the login handshake.
//!
//! A [`Session`] only exists once the handshake has reached
//! [`HandshakeStage::Ready`]; the [`SessionManager`] is its sole owner and
//! hands out `&mut Session` to the dispatcher.
//!
//! ```text
//! Dialing -> AwaitingHandlePrompt -> AwaitingPasswordPrompt
//!         -> AwaitingJoinConfirmation -> Ready
//! ```
//!
//! While waiting for a prompt, every line that does not match it is
//! skipped; the console prints banners and MOTD text between prompts.

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use partyline_metrics::metric_defs;
use partyline_protocol::{LineCodec, Prompt, ProtocolError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, IoError};
use crate::transport::Connector;

const READ_CHUNK: usize = 1024;

// ============================================================================
// States
// ============================================================================

/// Progress of the login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeStage {
    /// Opening the socket.
    Dialing,
    /// Waiting for the handle prompt.
    AwaitingHandlePrompt,
    /// Handle sent, waiting for the password prompt.
    AwaitingPasswordPrompt,
    /// Password sent, waiting for the join confirmation.
    AwaitingJoinConfirmation,
    /// Logged in.
    Ready,
}

impl HandshakeStage {
    /// Snake-case name, used in logs and metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            HandshakeStage::Dialing => "dialing",
            HandshakeStage::AwaitingHandlePrompt => "awaiting_handle_prompt",
            HandshakeStage::AwaitingPasswordPrompt => "awaiting_password_prompt",
            HandshakeStage::AwaitingJoinConfirmation => "awaiting_join_confirmation",
            HandshakeStage::Ready => "ready",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            HandshakeStage::Dialing => "dialing",
            HandshakeStage::AwaitingHandlePrompt => "waiting for the handle prompt",
            HandshakeStage::AwaitingPasswordPrompt => "waiting for the password prompt",
            HandshakeStage::AwaitingJoinConfirmation => "waiting for the join confirmation",
            HandshakeStage::Ready => "ready",
        }
    }
}

impl std::fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Lifecycle of the managed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected, or explicitly disconnected.
    Absent,
    /// Logged in and usable for commands.
    Ready,
    /// The last connect or command failed; the next use reconnects.
    Failed(String),
}

// ============================================================================
// Bounded waits
// ============================================================================

/// How a bounded wait ended.
pub(crate) enum Bounded<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

/// Run `fut` until it completes, `limit` elapses or `cancel` fires.
pub(crate) async fn bounded<F: Future>(
    fut: F,
    limit: Duration,
    cancel: &CancellationToken,
) -> Bounded<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Bounded::Cancelled,
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(value) => Bounded::Done(value),
            Err(_) => Bounded::TimedOut,
        },
    }
}

// ============================================================================
// Session
// ============================================================================

/// Why a line could not be read.
enum LineError {
    Io(io::Error),
    Closed,
    TooLong(ProtocolError),
}

impl LineError {
    fn during(self, stage: HandshakeStage) -> ConnectionError {
        match self {
            LineError::Io(source) => ConnectionError::Io { stage, source },
            LineError::Closed => ConnectionError::Closed { stage },
            LineError::TooLong(source) => ConnectionError::LineTooLong { stage, source },
        }
    }
}

impl From<LineError> for IoError {
    fn from(err: LineError) -> Self {
        match err {
            LineError::Io(source) => IoError::Read(source),
            LineError::Closed => IoError::Closed,
            LineError::TooLong(source) => IoError::LineTooLong(source),
        }
    }
}

/// A logged-in party-line session.
///
/// Dropping the session closes the socket.
#[derive(Debug)]
pub struct Session<S> {
    stream: S,
    codec: LineCodec,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    fn new(stream: S) -> Self {
        Session {
            stream,
            codec: LineCodec::new(),
        }
    }

    /// Read the next complete line.
    async fn read_line(&mut self) -> Result<String, LineError> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.codec.decode_line().map_err(LineError::TooLong)? {
                return Ok(line);
            }
            let n = self.stream.read(&mut buf).await.map_err(LineError::Io)?;
            if n == 0 {
                return Err(LineError::Closed);
            }
            self.codec.push(&buf[..n]);
        }
    }

    /// Write a full line and flush it.
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    /// Skip lines until one matches `prompt`.
    async fn await_prompt(
        &mut self,
        config: &ConnectionConfig,
        prompt: Prompt,
        stage: HandshakeStage,
    ) -> Result<(), ConnectionError> {
        loop {
            let line = self.read_line().await.map_err(|e| e.during(stage))?;
            if config.prompts.matches(prompt, &line) {
                debug!(prompt = %prompt, "received login prompt");
                return Ok(());
            }
            trace!(stage = stage.as_str(), line = %line, "skipping console line");
        }
    }

    /// Write one encoded command line and read exactly one reply line.
    pub(crate) async fn round_trip(&mut self, line: &[u8]) -> Result<String, IoError> {
        self.write_all(line).await.map_err(IoError::Write)?;
        Ok(self.read_line().await?)
    }
}

/// Drive a freshly opened session from the handle prompt to `Ready`.
///
/// `stage` is updated as the handshake progresses so the caller can report
/// where a timeout or cancellation interrupted it.
async fn login<S: AsyncRead + AsyncWrite + Unpin>(
    session: &mut Session<S>,
    config: &ConnectionConfig,
    stage: &mut HandshakeStage,
) -> Result<(), ConnectionError> {
    let steps = [
        (HandshakeStage::AwaitingHandlePrompt, Prompt::Handle, Some(&config.handle)),
        (HandshakeStage::AwaitingPasswordPrompt, Prompt::Password, Some(&config.password)),
        (HandshakeStage::AwaitingJoinConfirmation, Prompt::Joined, None),
    ];

    for (step, prompt, answer) in steps {
        *stage = step;
        session.await_prompt(config, prompt, step).await?;
        if let Some(answer) = answer {
            session
                .write_all(&LineCodec::encode_line(answer))
                .await
                .map_err(|source| ConnectionError::Io { stage: step, source })?;
        }
    }

    *stage = HandshakeStage::Ready;
    Ok(())
}

// ============================================================================
// Session Manager
// ============================================================================

/// Owns the socket lifecycle for one controller.
///
/// At most one session exists at a time. A session is only stored after a
/// complete handshake, so any session handed out is ready for commands.
pub struct SessionManager<C: Connector> {
    config: ConnectionConfig,
    connector: C,
    session: Option<Session<C::Stream>>,
    last_failure: Option<String>,
    handshakes: u64,
}

impl<C: Connector> SessionManager<C> {
    /// Create a manager. Nothing is opened until first use.
    pub fn new(config: ConnectionConfig, connector: C) -> Self {
        SessionManager {
            config,
            connector,
            session: None,
            last_failure: None,
            handshakes: 0,
        }
    }

    /// The connection config.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match (&self.session, &self.last_failure) {
            (Some(_), _) => SessionState::Ready,
            (None, Some(reason)) => SessionState::Failed(reason.clone()),
            (None, None) => SessionState::Absent,
        }
    }

    /// True if a logged-in session is held.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Number of handshakes completed over the manager's lifetime.
    pub fn handshakes(&self) -> u64 {
        self.handshakes
    }

    /// Return the ready session, connecting first if there is none.
    ///
    /// No I/O happens when a session is already held.
    pub async fn ensure_connected(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<&mut Session<C::Stream>, ConnectionError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.establish(cancel).await?,
        };
        Ok(self.session.insert(session))
    }

    /// Dial and log in again, replacing any existing session.
    pub async fn connect(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<&mut Session<C::Stream>, ConnectionError> {
        if self.close_session() {
            debug!(addr = %self.config.address(), "dropping existing session before reconnect");
        }
        let session = self.establish(cancel).await?;
        Ok(self.session.insert(session))
    }

    /// Close the session, if any. The next use reconnects.
    pub fn disconnect(&mut self) {
        if self.close_session() {
            debug!(addr = %self.config.address(), "session closed");
        }
        self.last_failure = None;
    }

    /// Drop a broken session and record why.
    pub fn invalidate(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.close_session();
        debug!(addr = %self.config.address(), reason = %reason, "session invalidated");
        self.last_failure = Some(reason);
    }

    /// Drop the held session and clear the ready gauge. Returns true if
    /// there was one.
    fn close_session(&mut self) -> bool {
        let closed = self.session.take().is_some();
        if closed {
            gauge!(metric_defs::SESSION_READY.name).set(0.0);
        }
        closed
    }

    /// Dial and handshake, updating state and metrics.
    async fn establish(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Session<C::Stream>, ConnectionError> {
        counter!(metric_defs::CONNECT_ATTEMPTS.name).increment(1);
        let started = Instant::now();

        match self.handshake(cancel).await {
            Ok(session) => {
                self.handshakes += 1;
                self.last_failure = None;
                histogram!(metric_defs::HANDSHAKE_DURATION.name)
                    .record(started.elapsed().as_secs_f64() * 1000.0);
                gauge!(metric_defs::SESSION_READY.name).set(1.0);
                debug!(
                    addr = %self.config.address(),
                    handle = %self.config.handle,
                    "joined the party line"
                );
                Ok(session)
            }
            Err(err) => {
                counter!(metric_defs::CONNECT_FAILURES.name, "stage" => err.stage().as_str())
                    .increment(1);
                warn!(addr = %self.config.address(), error = %err, "connection failed");
                self.last_failure = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn handshake(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Session<C::Stream>, ConnectionError> {
        let config = &self.config;
        config.validate().map_err(ConnectionError::InvalidConfig)?;

        let addr = config.address();
        debug!(addr = %addr, "dialing");

        let connect = self.connector.connect(&config.host, config.port);
        let stream = match bounded(connect, config.timeouts.connect, cancel).await {
            Bounded::Done(Ok(stream)) => stream,
            Bounded::Done(Err(source)) => return Err(ConnectionError::Connect { addr, source }),
            Bounded::TimedOut => {
                return Err(ConnectionError::ConnectTimeout {
                    addr,
                    timeout: config.timeouts.connect,
                })
            }
            Bounded::Cancelled => {
                return Err(ConnectionError::Cancelled {
                    stage: HandshakeStage::Dialing,
                })
            }
        };

        let mut session = Session::new(stream);
        let mut stage = HandshakeStage::AwaitingHandlePrompt;
        let outcome = bounded(
            login(&mut session, config, &mut stage),
            config.timeouts.handshake,
            cancel,
        )
        .await;

        match outcome {
            Bounded::Done(Ok(())) => Ok(session),
            Bounded::Done(Err(err)) => Err(err),
            Bounded::TimedOut => Err(ConnectionError::HandshakeTimeout {
                stage,
                timeout: config.timeouts.handshake,
            }),
            Bounded::Cancelled => Err(ConnectionError::Cancelled { stage }),
        }
    }
}

impl<C: Connector + std::fmt::Debug> std::fmt::Debug for SessionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("connector", &self.connector)
            .field("state", &self.state())
            .field("handshakes", &self.handshakes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::{duplex, DuplexStream};

    /// Hands out prepared in-memory streams, last first.
    struct QueuedConnector(Mutex<Vec<DuplexStream>>);

    impl Connector for QueuedConnector {
        type Stream = DuplexStream;

        async fn connect(&self, _host: &str, _port: u16) -> io::Result<DuplexStream> {
            let next = self.0.lock().unwrap().pop();
            next.ok_or_else(|| io::Error::from(io::ErrorKind::ConnectionRefused))
        }
    }

    /// Last value set on the session-ready gauge.
    #[derive(Default)]
    struct ReadyGauge(AtomicU64);

    impl ReadyGauge {
        fn get(&self) -> f64 {
            f64::from_bits(self.0.load(Ordering::SeqCst))
        }
    }

    impl metrics::GaugeFn for ReadyGauge {
        fn increment(&self, value: f64) {
            self.set(self.get() + value);
        }

        fn decrement(&self, value: f64) {
            self.set(self.get() - value);
        }

        fn set(&self, value: f64) {
            self.0.store(value.to_bits(), Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct ReadyRecorder {
        ready: Arc<ReadyGauge>,
    }

    impl metrics::Recorder for ReadyRecorder {
        fn describe_counter(
            &self,
            _key: metrics::KeyName,
            _unit: Option<metrics::Unit>,
            _description: metrics::SharedString,
        ) {
        }

        fn describe_gauge(
            &self,
            _key: metrics::KeyName,
            _unit: Option<metrics::Unit>,
            _description: metrics::SharedString,
        ) {
        }

        fn describe_histogram(
            &self,
            _key: metrics::KeyName,
            _unit: Option<metrics::Unit>,
            _description: metrics::SharedString,
        ) {
        }

        fn register_counter(
            &self,
            _key: &metrics::Key,
            _metadata: &metrics::Metadata<'_>,
        ) -> metrics::Counter {
            metrics::Counter::noop()
        }

        fn register_gauge(
            &self,
            key: &metrics::Key,
            _metadata: &metrics::Metadata<'_>,
        ) -> metrics::Gauge {
            if key.name() == metric_defs::SESSION_READY.name {
                metrics::Gauge::from_arc(self.ready.clone())
            } else {
                metrics::Gauge::noop()
            }
        }

        fn register_histogram(
            &self,
            _key: &metrics::Key,
            _metadata: &metrics::Metadata<'_>,
        ) -> metrics::Histogram {
            metrics::Histogram::noop()
        }
    }

    #[test]
    fn test_failed_reconnect_clears_ready_gauge() {
        let recorder = ReadyRecorder::default();
        let ready = recorder.ready.clone();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let (first, mut bot) = duplex(1024);
                let script = b"Please enter your handle.\n\
                    Enter your password.\n\
                    *** admin joined the party line.\n";
                bot.write_all(script).await.unwrap();
                // The second dial reaches a bot that has already hung up
                let (second, gone) = duplex(1024);
                drop(gone);

                let connector = QueuedConnector(Mutex::new(vec![second, first]));
                let config = ConnectionConfig::new("bot.local", 3333, "admin", "secret");
                let mut manager = SessionManager::new(config, connector);
                let cancel = CancellationToken::new();

                manager.ensure_connected(&cancel).await.unwrap();
                assert_eq!(ready.get(), 1.0);

                let err = manager.connect(&cancel).await.unwrap_err();
                assert!(matches!(err, ConnectionError::Closed { .. }));
                assert!(!manager.is_connected());
                assert_eq!(ready.get(), 0.0);
                drop(bot);
            });
        });
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(HandshakeStage::AwaitingHandlePrompt.as_str(), "awaiting_handle_prompt");
        assert_eq!(
            HandshakeStage::AwaitingJoinConfirmation.to_string(),
            "waiting for the join confirmation"
        );
    }

    #[tokio::test]
    async fn test_login_over_duplex() {
        let (client, mut server) = duplex(1024);
        let config = ConnectionConfig::new("bot.local", 3333, "admin", "secret");

        let bot = tokio::spawn(async move {
            server
                .write_all(b"Welcome!\nPlease enter your handle.\n")
                .await
                .unwrap();
            let mut buf = [0u8; 64];
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"admin\n");

            server.write_all(b"Enter your password.\n").await.unwrap();
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"secret\n");

            server
                .write_all(b"*** admin joined the party line.\n")
                .await
                .unwrap();
            server
        });

        let mut session = Session::new(client);
        let mut stage = HandshakeStage::AwaitingHandlePrompt;
        login(&mut session, &config, &mut stage).await.unwrap();
        assert_eq!(stage, HandshakeStage::Ready);
        bot.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_reports_closed_stage() {
        let (client, mut server) = duplex(1024);
        let config = ConnectionConfig::new("bot.local", 3333, "admin", "secret");

        server.write_all(b"Please enter your handle.\n").await.unwrap();
        let mut session = Session::new(client);
        let mut stage = HandshakeStage::AwaitingHandlePrompt;

        let login_fut = login(&mut session, &config, &mut stage);
        let bot = async move {
            let mut buf = [0u8; 64];
            let _ = server.read(&mut buf).await;
            drop(server);
        };
        let (result, _) = tokio::join!(login_fut, bot);

        match result {
            Err(ConnectionError::Closed { stage }) => {
                assert_eq!(stage, HandshakeStage::AwaitingPasswordPrompt)
            }
            other => panic!("expected Closed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_round_trip_reads_one_line() {
        let (client, mut server) = duplex(1024);
        let mut session = Session::new(client);

        let bot = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b".uptime\n");
            server.write_all(b"Online for 3 days\r\nextra\n").await.unwrap();
            server
        });

        let reply = session.round_trip(b".uptime\n").await.unwrap();
        assert_eq!(reply, "Online for 3 days");
        bot.await.unwrap();
    }

    #[tokio::test]
    async fn test_bounded_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = bounded(std::future::pending::<()>(), Duration::from_secs(5), &cancel).await;
        assert!(matches!(outcome, Bounded::Cancelled));
    }

    #[tokio::test]
    async fn test_bounded_timeout() {
        let cancel = CancellationToken::new();
        let outcome =
            bounded(std::future::pending::<()>(), Duration::from_millis(20), &cancel).await;
        assert!(matches!(outcome, Bounded::TimedOut));
    }
}
