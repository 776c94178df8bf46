//! Command dispatch.
//!
//! [`Controller`] is the caller-facing handle: it owns the
//! [`SessionManager`], turns operations into command lines and performs one
//! write/read round trip per call. Every method takes `&mut self`, so a
//! controller never has more than one command in flight.

use std::time::Instant;

use metrics::{counter, histogram};
use partyline_metrics::metric_defs;
use partyline_protocol::{Command, Operation};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::ConnectionConfig;
use crate::error::{CommandError, CommandResult, ConnectionError, IoError};
use crate::session::{bounded, Bounded, SessionManager, SessionState};
use crate::transport::{Connector, TcpConnector};

/// Client for one bot's party-line console.
///
/// Connects lazily: the first command opens the socket and logs in, later
/// commands reuse the session until it fails.
pub struct Controller<C: Connector = TcpConnector> {
    manager: SessionManager<C>,
    cancel: CancellationToken,
}

impl Controller<TcpConnector> {
    /// Create a controller that connects over plain TCP.
    pub fn new(config: ConnectionConfig) -> Self {
        Controller::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> Controller<C> {
    /// Create a controller with a custom stream connector.
    pub fn with_connector(config: ConnectionConfig, connector: C) -> Self {
        Controller {
            manager: SessionManager::new(config, connector),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the cancellation token.
    ///
    /// Once a token has fired every blocking call fails immediately, so a
    /// fresh token is needed to use the controller again.
    pub fn set_cancellation_token(&mut self, cancel: CancellationToken) {
        self.cancel = cancel;
    }

    /// The current cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The connection config.
    pub fn config(&self) -> &ConnectionConfig {
        self.manager.config()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.manager.state()
    }

    /// True if a logged-in session is held.
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Number of handshakes completed so far.
    pub fn handshakes(&self) -> u64 {
        self.manager.handshakes()
    }

    /// Connect and log in unless a session is already held.
    pub async fn ensure_connected(&mut self) -> Result<(), ConnectionError> {
        self.manager.ensure_connected(&self.cancel).await.map(|_| ())
    }

    /// Drop any session and log in again.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        self.manager.connect(&self.cancel).await.map(|_| ())
    }

    /// Close the session. The next command reconnects.
    pub fn disconnect(&mut self) {
        self.manager.disconnect();
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Send `token` followed by a preformatted argument line and return the
    /// reply line.
    ///
    /// An empty `args` sends the bare token.
    pub async fn send(&mut self, token: &str, args: &str) -> CommandResult<String> {
        let command = Command::with_argument_line(token, args)?;
        self.send_command(&command).await
    }

    /// Run a catalogue operation with positional arguments.
    pub async fn execute(&mut self, operation: Operation, args: &[&str]) -> CommandResult<String> {
        let command = operation.command(args)?;
        self.send_command(&command).await
    }

    /// Write an already validated command and read one reply line.
    ///
    /// Any failure after the session was obtained invalidates it.
    pub async fn send_command(&mut self, command: &Command) -> CommandResult<String> {
        let token = command.token().to_string();
        let timeout = self.manager.config().timeouts.response;

        let session = match self.manager.ensure_connected(&self.cancel).await {
            Ok(session) => session,
            Err(err) => {
                let err = CommandError::NotConnected(err);
                record_failure(&token, &err);
                return Err(err);
            }
        };

        trace!(token = %token, "sending command");
        counter!(metric_defs::COMMANDS_SENT.name, "token" => token.clone()).increment(1);

        let line = command.encode();
        let started = Instant::now();
        let result = match bounded(session.round_trip(&line), timeout, &self.cancel).await {
            Bounded::Done(result) => result,
            Bounded::TimedOut => Err(IoError::Timeout(timeout)),
            Bounded::Cancelled => Err(IoError::Cancelled),
        };

        match result {
            Ok(reply) => {
                histogram!(metric_defs::COMMAND_LATENCY.name, "token" => token.clone())
                    .record(started.elapsed().as_secs_f64() * 1000.0);
                trace!(token = %token, reply = %reply, "received reply");
                Ok(reply)
            }
            Err(err) => {
                debug!(token = %token, error = %err, "command failed, dropping session");
                self.manager.invalidate(err.to_string());
                let err = CommandError::Io(err);
                record_failure(&token, &err);
                Err(err)
            }
        }
    }

    // ========================================================================
    // Catalogue
    // ========================================================================

    /// `.chnick <old> <new>`
    pub async fn change_nick(&mut self, old: &str, new: &str) -> CommandResult<String> {
        self.execute(Operation::ChangeNick, &[old, new]).await
    }

    /// `.+user <handle> [hostmask]`
    pub async fn add_user(
        &mut self,
        handle: &str,
        hostmask: Option<&str>,
    ) -> CommandResult<String> {
        self.execute(Operation::AddUser, &[handle, hostmask.unwrap_or("")])
            .await
    }

    /// `.-user <handle>`
    pub async fn remove_user(&mut self, handle: &str) -> CommandResult<String> {
        self.execute(Operation::RemoveUser, &[handle]).await
    }

    /// `.+chan <channel> [options]`
    pub async fn add_channel(
        &mut self,
        channel: &str,
        options: Option<&str>,
    ) -> CommandResult<String> {
        self.execute(Operation::AddChannel, &[channel, options.unwrap_or("")])
            .await
    }

    /// `.-chan <channel>`
    pub async fn remove_channel(&mut self, channel: &str) -> CommandResult<String> {
        self.execute(Operation::RemoveChannel, &[channel]).await
    }

    /// `.chanset <channel> <settings...>`
    pub async fn set_channel_settings(
        &mut self,
        channel: &str,
        settings: &str,
    ) -> CommandResult<String> {
        self.execute(Operation::SetChannelSettings, &[channel, settings])
            .await
    }

    /// `.chanset <channel> <setting> <value>`
    pub async fn set_channel_setting(
        &mut self,
        channel: &str,
        setting: &str,
        value: &str,
    ) -> CommandResult<String> {
        self.execute(Operation::SetChannelSetting, &[channel, setting, value])
            .await
    }

    /// Set the enforced channel modes (`chanmode` setting).
    pub async fn set_channel_mode(&mut self, channel: &str, mode: &str) -> CommandResult<String> {
        self.set_channel_setting(channel, "chanmode", mode).await
    }

    /// Set the idle-kick time in minutes (`idle_kick` setting).
    pub async fn set_idle_kick(&mut self, channel: &str, minutes: u32) -> CommandResult<String> {
        self.set_channel_setting(channel, "idle_kick", &minutes.to_string())
            .await
    }

    /// Set the channel user limit (`max_users` setting).
    pub async fn set_max_users(&mut self, channel: &str, limit: u32) -> CommandResult<String> {
        self.set_channel_setting(channel, "max_users", &limit.to_string())
            .await
    }

    /// `.chaninfo <channel>`
    pub async fn channel_info(&mut self, channel: &str) -> CommandResult<String> {
        self.execute(Operation::ChannelInfo, &[channel]).await
    }

    /// `.topic <channel> <topic...>`
    pub async fn set_topic(&mut self, channel: &str, topic: &str) -> CommandResult<String> {
        self.execute(Operation::SetTopic, &[channel, topic]).await
    }

    /// `.topic <channel>`
    pub async fn get_topic(&mut self, channel: &str) -> CommandResult<String> {
        self.execute(Operation::GetTopic, &[channel]).await
    }

    /// `.chpass <handle> <password>`
    pub async fn set_password(&mut self, handle: &str, password: &str) -> CommandResult<String> {
        self.execute(Operation::SetPassword, &[handle, password])
            .await
    }

    /// `.passwd <handle> <password>`
    pub async fn change_password(
        &mut self,
        handle: &str,
        password: &str,
    ) -> CommandResult<String> {
        self.execute(Operation::ChangePassword, &[handle, password])
            .await
    }

    /// `.chflags <handle> <flags>`
    pub async fn set_flags(&mut self, handle: &str, flags: &str) -> CommandResult<String> {
        self.execute(Operation::SetFlags, &[handle, flags]).await
    }

    /// `.userinfo <handle>`
    pub async fn get_flags(&mut self, handle: &str) -> CommandResult<String> {
        self.execute(Operation::GetFlags, &[handle]).await
    }

    /// `.+ban <channel> <hostmask>`
    pub async fn ban(&mut self, channel: &str, hostmask: &str) -> CommandResult<String> {
        self.execute(Operation::Ban, &[channel, hostmask]).await
    }

    /// `.-ban <channel> <hostmask>`
    pub async fn unban(&mut self, channel: &str, hostmask: &str) -> CommandResult<String> {
        self.execute(Operation::Unban, &[channel, hostmask]).await
    }

    /// `.kick <channel> <handle> [reason...]`
    pub async fn kick(
        &mut self,
        channel: &str,
        handle: &str,
        reason: Option<&str>,
    ) -> CommandResult<String> {
        self.execute(Operation::Kick, &[channel, handle, reason.unwrap_or("")])
            .await
    }

    /// `.invite <channel> <handle>`
    pub async fn invite(&mut self, channel: &str, handle: &str) -> CommandResult<String> {
        self.execute(Operation::Invite, &[channel, handle]).await
    }

    /// `.join <channel> [key]`
    pub async fn join(&mut self, channel: &str, key: Option<&str>) -> CommandResult<String> {
        self.execute(Operation::Join, &[channel, key.unwrap_or("")])
            .await
    }

    /// `.part <channel> [reason...]`
    pub async fn part(&mut self, channel: &str, reason: Option<&str>) -> CommandResult<String> {
        self.execute(Operation::Part, &[channel, reason.unwrap_or("")])
            .await
    }

    /// `.op <channel> <handle>`
    pub async fn op(&mut self, channel: &str, handle: &str) -> CommandResult<String> {
        self.execute(Operation::Op, &[channel, handle]).await
    }

    /// `.voice <channel> <handle>`
    pub async fn voice(&mut self, channel: &str, handle: &str) -> CommandResult<String> {
        self.execute(Operation::Voice, &[channel, handle]).await
    }

    /// `.devoice <channel> <handle>`
    pub async fn devoice(&mut self, channel: &str, handle: &str) -> CommandResult<String> {
        self.execute(Operation::Devoice, &[channel, handle]).await
    }

    /// `.users <channel>`
    pub async fn list_users(&mut self, channel: &str) -> CommandResult<String> {
        self.execute(Operation::ListUsers, &[channel]).await
    }

    /// `.hostmask <handle>`
    pub async fn hostmask(&mut self, handle: &str) -> CommandResult<String> {
        self.execute(Operation::Hostmask, &[handle]).await
    }

    /// `.version`
    pub async fn version(&mut self) -> CommandResult<String> {
        self.execute(Operation::Version, &[]).await
    }

    /// `.time`
    pub async fn time(&mut self) -> CommandResult<String> {
        self.execute(Operation::Time, &[]).await
    }

    /// `.load`
    pub async fn load(&mut self) -> CommandResult<String> {
        self.execute(Operation::Load, &[]).await
    }

    /// `.uptime`
    pub async fn uptime(&mut self) -> CommandResult<String> {
        self.execute(Operation::Uptime, &[]).await
    }

    /// `.memory`
    pub async fn memory(&mut self) -> CommandResult<String> {
        self.execute(Operation::Memory, &[]).await
    }
}

fn record_failure(token: &str, err: &CommandError) {
    counter!(
        metric_defs::COMMANDS_FAILED.name,
        "token" => token.to_string(),
        "kind" => err.kind()
    )
    .increment(1);
}

impl<C: Connector + std::fmt::Debug> std::fmt::Debug for Controller<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("manager", &self.manager)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
