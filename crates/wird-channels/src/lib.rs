//! # WirdBot Channels
//!
//! Everything that talks to Telegram:
//! - [`telegram`]: Bot API client, also the scheduler's [`wird_core::Transport`]
//! - [`dialog`]: `/configure` conversation that activates a chat
//! - [`operator`]: `/list`, `/stats`, `/see` and broadcasts
//! - [`bot`]: update routing between the above

pub mod bot;
pub mod dialog;
pub mod operator;
pub mod telegram;

pub use bot::BotService;
pub use dialog::{ConfigDialog, ConfigureRequest, DialogState};
pub use operator::{BroadcastReport, BroadcastScope, OperatorCommand};
pub use telegram::{BotEvent, TelegramChannel};
