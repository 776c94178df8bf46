//! The catalogue of administrative operations.
//!
//! Every operation is a fixed command token plus an ordered parameter list.
//! [`Operation::spec`] is the single table mapping one to the other; the
//! client's convenience methods and the CLI's `exec` subcommand both go
//! through it.

use crate::commands::Command;
use crate::error::{ProtocolError, ProtocolResult};

/// Shape of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A single word (channel, handle, hostmask, ...).
    Word,
    /// Free text that may contain spaces. Only allowed as the last parameter.
    Text,
}

/// One parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, used in error messages and usage strings.
    pub name: &'static str,
    /// Word or free text.
    pub kind: ParamKind,
    /// Whether the parameter may be omitted.
    pub optional: bool,
}

impl Param {
    /// A required single-word parameter.
    pub const fn word(name: &'static str) -> Self {
        Param {
            name,
            kind: ParamKind::Word,
            optional: false,
        }
    }

    /// A required free-text parameter.
    pub const fn text(name: &'static str) -> Self {
        Param {
            name,
            kind: ParamKind::Text,
            optional: false,
        }
    }

    /// Mark the parameter as optional.
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Catalogue entry for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Operation name (e.g. `add_channel`).
    pub name: &'static str,
    /// Command token (e.g. `.+chan`).
    pub token: &'static str,
    /// Parameters in wire order.
    pub params: &'static [Param],
    /// One-line description.
    pub summary: &'static str,
}

impl OperationSpec {
    const fn new(
        name: &'static str,
        token: &'static str,
        params: &'static [Param],
        summary: &'static str,
    ) -> Self {
        OperationSpec {
            name,
            token,
            params,
            summary,
        }
    }

    /// Number of required parameters.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| !p.optional).count()
    }

    /// Usage string, e.g. `kick <channel> <handle> [reason...]`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.to_string();
        for param in self.params {
            let ellipsis = if param.kind == ParamKind::Text { "..." } else { "" };
            if param.optional {
                usage.push_str(&format!(" [{}{}]", param.name, ellipsis));
            } else {
                usage.push_str(&format!(" <{}{}>", param.name, ellipsis));
            }
        }
        usage
    }
}

const CHANNEL: Param = Param::word("channel");
const HANDLE: Param = Param::word("handle");
const HOSTMASK: Param = Param::word("hostmask");

const NO_PARAMS: &[Param] = &[];
const ONLY_CHANNEL: &[Param] = &[CHANNEL];
const ONLY_HANDLE: &[Param] = &[HANDLE];
const CHANNEL_HANDLE: &[Param] = &[CHANNEL, HANDLE];
const CHANNEL_HOSTMASK: &[Param] = &[CHANNEL, HOSTMASK];
const HANDLE_PASSWORD: &[Param] = &[HANDLE, Param::word("password")];
const CHANGE_NICK: &[Param] = &[Param::word("old"), Param::word("new")];
const ADD_USER: &[Param] = &[HANDLE, HOSTMASK.optional()];
const ADD_CHANNEL: &[Param] = &[CHANNEL, Param::text("options").optional()];
const CHANNEL_SETTINGS: &[Param] = &[CHANNEL, Param::text("settings")];
const CHANNEL_SETTING: &[Param] = &[CHANNEL, Param::word("setting"), Param::text("value")];
const SET_TOPIC: &[Param] = &[CHANNEL, Param::text("topic")];
const SET_FLAGS: &[Param] = &[HANDLE, Param::word("flags")];
const KICK: &[Param] = &[CHANNEL, HANDLE, Param::text("reason").optional()];
const JOIN: &[Param] = &[CHANNEL, Param::word("key").optional()];
const PART: &[Param] = &[CHANNEL, Param::text("reason").optional()];

/// Administrative operations supported by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Change a user's nickname.
    ChangeNick,
    /// Create a user record.
    AddUser,
    /// Remove a user record.
    RemoveUser,
    /// Add a channel to the bot.
    AddChannel,
    /// Remove a channel from the bot.
    RemoveChannel,
    /// Apply a free-form settings string to a channel.
    SetChannelSettings,
    /// Set one channel setting to a value.
    SetChannelSetting,
    /// List a channel's settings.
    ChannelInfo,
    /// Set a channel topic.
    SetTopic,
    /// Show a channel topic.
    GetTopic,
    /// Set a user's password.
    SetPassword,
    /// Change a password through `.passwd`.
    ChangePassword,
    /// Set a user's flags.
    SetFlags,
    /// Show a user's flags.
    GetFlags,
    /// Ban a hostmask on a channel.
    Ban,
    /// Remove a hostmask ban from a channel.
    Unban,
    /// Kick a user from a channel.
    Kick,
    /// Invite a user to a channel.
    Invite,
    /// Make the bot join a channel.
    Join,
    /// Make the bot part a channel.
    Part,
    /// Op a user on a channel.
    Op,
    /// Voice a user on a channel.
    Voice,
    /// Devoice a user on a channel.
    Devoice,
    /// List users on a channel.
    ListUsers,
    /// Show a user's hostmask.
    Hostmask,
    /// Bot version and build information.
    Version,
    /// Bot's current time.
    Time,
    /// Load average.
    Load,
    /// Bot uptime.
    Uptime,
    /// Memory usage.
    Memory,
}

impl Operation {
    /// Every operation, in catalogue order.
    pub const ALL: &'static [Operation] = &[
        Operation::ChangeNick,
        Operation::AddUser,
        Operation::RemoveUser,
        Operation::AddChannel,
        Operation::RemoveChannel,
        Operation::SetChannelSettings,
        Operation::SetChannelSetting,
        Operation::ChannelInfo,
        Operation::SetTopic,
        Operation::GetTopic,
        Operation::SetPassword,
        Operation::ChangePassword,
        Operation::SetFlags,
        Operation::GetFlags,
        Operation::Ban,
        Operation::Unban,
        Operation::Kick,
        Operation::Invite,
        Operation::Join,
        Operation::Part,
        Operation::Op,
        Operation::Voice,
        Operation::Devoice,
        Operation::ListUsers,
        Operation::Hostmask,
        Operation::Version,
        Operation::Time,
        Operation::Load,
        Operation::Uptime,
        Operation::Memory,
    ];

    /// Catalogue entry for this operation.
    pub const fn spec(&self) -> OperationSpec {
        use OperationSpec as S;
        match self {
            Operation::ChangeNick => S::new(
                "change_nick",
                ".chnick",
                CHANGE_NICK,
                "Change a user's nickname",
            ),
            Operation::AddUser => S::new("add_user", ".+user", ADD_USER, "Create a user record"),
            Operation::RemoveUser => S::new(
                "remove_user",
                ".-user",
                ONLY_HANDLE,
                "Remove a user record",
            ),
            Operation::AddChannel => S::new(
                "add_channel",
                ".+chan",
                ADD_CHANNEL,
                "Add a channel to the bot",
            ),
            Operation::RemoveChannel => S::new(
                "remove_channel",
                ".-chan",
                ONLY_CHANNEL,
                "Remove all information about a channel",
            ),
            Operation::SetChannelSettings => S::new(
                "set_channel_settings",
                ".chanset",
                CHANNEL_SETTINGS,
                "Apply a settings string to a channel",
            ),
            Operation::SetChannelSetting => S::new(
                "set_channel_setting",
                ".chanset",
                CHANNEL_SETTING,
                "Set one channel setting",
            ),
            Operation::ChannelInfo => S::new(
                "channel_info",
                ".chaninfo",
                ONLY_CHANNEL,
                "List the bot's settings for a channel",
            ),
            Operation::SetTopic => S::new("set_topic", ".topic", SET_TOPIC, "Set a channel topic"),
            Operation::GetTopic => S::new(
                "get_topic",
                ".topic",
                ONLY_CHANNEL,
                "Show a channel topic",
            ),
            Operation::SetPassword => S::new(
                "set_password",
                ".chpass",
                HANDLE_PASSWORD,
                "Set a user's password",
            ),
            Operation::ChangePassword => S::new(
                "change_password",
                ".passwd",
                HANDLE_PASSWORD,
                "Change a password with .passwd",
            ),
            Operation::SetFlags => S::new("set_flags", ".chflags", SET_FLAGS, "Set a user's flags"),
            Operation::GetFlags => S::new(
                "get_flags",
                ".userinfo",
                ONLY_HANDLE,
                "Show a user's flags",
            ),
            Operation::Ban => S::new(
                "ban",
                ".+ban",
                CHANNEL_HOSTMASK,
                "Ban a hostmask on a channel",
            ),
            Operation::Unban => S::new(
                "unban",
                ".-ban",
                CHANNEL_HOSTMASK,
                "Remove a hostmask ban from a channel",
            ),
            Operation::Kick => S::new("kick", ".kick", KICK, "Kick a user from a channel"),
            Operation::Invite => S::new(
                "invite",
                ".invite",
                CHANNEL_HANDLE,
                "Invite a user to a channel",
            ),
            Operation::Join => S::new("join", ".join", JOIN, "Make the bot join a channel"),
            Operation::Part => S::new("part", ".part", PART, "Make the bot part a channel"),
            Operation::Op => S::new("op", ".op", CHANNEL_HANDLE, "Op a user on a channel"),
            Operation::Voice => S::new(
                "voice",
                ".voice",
                CHANNEL_HANDLE,
                "Voice a user on a channel",
            ),
            Operation::Devoice => S::new(
                "devoice",
                ".devoice",
                CHANNEL_HANDLE,
                "Devoice a user on a channel",
            ),
            Operation::ListUsers => S::new(
                "list_users",
                ".users",
                ONLY_CHANNEL,
                "List users on a channel",
            ),
            Operation::Hostmask => S::new(
                "hostmask",
                ".hostmask",
                ONLY_HANDLE,
                "Show a user's hostmask",
            ),
            Operation::Version => S::new(
                "version",
                ".version",
                NO_PARAMS,
                "Show version and build information",
            ),
            Operation::Time => S::new("time", ".time", NO_PARAMS, "Show the bot's current time"),
            Operation::Load => S::new("load", ".load", NO_PARAMS, "Show the load average"),
            Operation::Uptime => S::new("uptime", ".uptime", NO_PARAMS, "Show the bot's uptime"),
            Operation::Memory => S::new("memory", ".memory", NO_PARAMS, "Show memory usage"),
        }
    }

    /// Operation name (e.g. `add_channel`).
    pub const fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Command token (e.g. `.+chan`).
    pub const fn token(&self) -> &'static str {
        self.spec().token
    }

    /// Look up an operation by name. Dashes are accepted in place of
    /// underscores (`add-channel`).
    pub fn from_name(name: &str) -> ProtocolResult<Operation> {
        let normalized = name.replace('-', "_");
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.name() == normalized)
            .ok_or_else(|| ProtocolError::UnknownOperation(name.to_string()))
    }

    /// Build the command for this operation.
    ///
    /// `args` are matched to the parameters in order. Trailing optional
    /// arguments may be left out or passed as empty strings. Required
    /// arguments must be non-empty, and single-word parameters must not
    /// contain whitespace.
    pub fn command(&self, args: &[&str]) -> ProtocolResult<Command> {
        let spec = self.spec();
        let min = spec.required_params();
        let max = spec.params.len();

        if args.len() < min || args.len() > max {
            return Err(ProtocolError::ArgumentCount {
                operation: spec.name,
                min,
                max,
                actual: args.len(),
            });
        }

        for (param, arg) in spec.params.iter().zip(args) {
            if arg.is_empty() {
                if param.optional {
                    continue;
                }
                return Err(ProtocolError::MissingArgument {
                    operation: spec.name,
                    param: param.name,
                });
            }
            if param.kind == ParamKind::Word && arg.chars().any(char::is_whitespace) {
                return Err(ProtocolError::UnexpectedWhitespace {
                    operation: spec.name,
                    param: param.name,
                });
            }
        }

        Command::new(spec.token, args.iter().copied())
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Operation {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::from_name(s)
    }
}
