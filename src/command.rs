//! Chat command parsing and dispatch.
//!
//! Lookup commands are matched by substring, not by leading token: a message
//! containing `!dns` anywhere is a DNS lookup. Tokens are checked in the order
//! of `LOOKUP_PATTERNS` and the first hit wins. The domain is whatever follows
//! the first `"<token> "` in the lower-cased message, trimmed.

use crate::lookup::liveness::LivenessProbe;
use crate::lookup::records::RecordResolver;
use crate::lookup::registration::RegistrationSource;
use crate::lookup::{LookupKind, Lookups};

pub const NOT_RECOGNIZED: &str = "No command recognized or invalid format.";

pub const START_TEXT: &str = "Welcome to the multifunctioning Domain Tool";

pub const HELP_TEXT: &str = "Commands: \n\n\
DNS - Returns A, NS, MX, TXT, and more records.\n>> Format: !dns domainhere\n\n\
WHOIS - Returns register, creation/expiration dates, more name servers, status, emails, location.\n>> Format: !whois domainhere\n\n\
OUTPUT - Set preferred output format (txt or json (using messages by default)).\n>> Format: !output format\n\n\
STATUS - Returns the current status of a website (Online or Offline).\n>> Format: !status domainhere";

/// Ordered substring table for lookup commands.
const LOOKUP_PATTERNS: [(&str, LookupKind); 3] = [
    ("!dns", LookupKind::Dns),
    ("!whois", LookupKind::Whois),
    ("!status", LookupKind::Status),
];

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// Message starting with `!output`; the argument is read by the preference store.
    SetOutput,
    /// `!dns` / `!whois` / `!status` with a domain.
    Lookup { kind: LookupKind, domain: String },
    /// Lookup token present but no domain after it.
    MissingDomain(LookupKind),
    Unrecognized,
}

/// Leading `/command`, with any `@botname` suffix removed, lower-cased.
fn bot_command(text: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    Some(name.to_lowercase())
}

/// Classify one message text.
pub fn parse_command(text: &str) -> Command {
    match bot_command(text).as_deref() {
        Some("start") => return Command::Start,
        Some("help") => return Command::Help,
        _ => {}
    }

    let processed = text.to_lowercase();

    if processed.starts_with("!output") {
        return Command::SetOutput;
    }

    for (token, kind) in LOOKUP_PATTERNS {
        if !processed.contains(token) {
            continue;
        }
        let with_space = format!("{} ", token);
        return match processed.split_once(with_space.as_str()) {
            Some((_, rest)) if !rest.trim().is_empty() => Command::Lookup {
                kind,
                domain: rest.trim().to_string(),
            },
            _ => Command::MissingDomain(kind),
        };
    }

    Command::Unrecognized
}

/// Produce the reply text for a lookup-style command.
///
/// `Start`, `Help` and `SetOutput` are answered by the caller and map to the
/// not-recognized text here.
pub async fn dispatch<R, W, P>(command: &Command, lookups: &Lookups<R, W, P>) -> crate::Result<String>
where
    R: RecordResolver,
    W: RegistrationSource,
    P: LivenessProbe,
{
    match command {
        Command::Lookup { kind, domain } => lookups.run(*kind, domain).await,
        Command::MissingDomain(kind) => Ok(format!("Usage: {} <domain>", kind.token())),
        Command::Start | Command::Help | Command::SetOutput | Command::Unrecognized => {
            Ok(NOT_RECOGNIZED.to_string())
        }
    }
}
