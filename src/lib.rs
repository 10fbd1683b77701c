//! Domain Scout: chat bot for DNS, WHOIS and HTTP liveness lookups.
//! Parses `!dns`, `!whois`, `!status` and `!output` commands from Telegram
//! messages, runs the lookup, and replies inline or with a text/JSON file
//! according to each chat's stored preference.

pub mod bot;
pub mod command;
pub mod config;
pub mod error;
pub mod lookup;
pub mod preferences;
pub mod render;
pub mod telegram;

pub use bot::{run_polling, Reply, ScoutBot};
pub use command::{dispatch, parse_command, Command};
pub use config::{parse_env_ref, BotConfig, LookupConfig, OutputConfig, ResolverKind, ScoutConfig};
pub use error::{Result, ScoutError};
pub use lookup::liveness::{Liveness, LivenessProbe, ReqwestProbe};
pub use lookup::records::{HickoryRecordResolver, RecordKind, RecordResolver};
pub use lookup::registration::{RegistrationSource, WhoisClient};
pub use lookup::{LiveLookups, LookupKind, Lookups};
pub use preferences::{OutputFormat, PreferenceStore};
pub use render::{Rendered, Renderer};
pub use telegram::{Chat, Message, Messenger, TelegramClient, UpdateSource};

/// Bot wired to the network lookups and the Telegram API.
pub type LiveBot = ScoutBot<HickoryRecordResolver, WhoisClient, ReqwestProbe, TelegramClient>;
