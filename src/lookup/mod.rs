//! Lookup backends for the three chat commands.
//!
//! Each backend sits behind a small capability trait so the bot can be driven
//! with in-memory fakes; `LiveLookups` wires the network implementations.

pub mod liveness;
pub mod records;
pub mod registration;

use std::time::Instant;

use crate::config::LookupConfig;
use liveness::{check_liveness, LivenessProbe, ReqwestProbe};
use records::{lookup_records, HickoryRecordResolver, RecordResolver};
use registration::{RegistrationSource, WhoisClient};

/// The lookup a chat command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Dns,
    Whois,
    Status,
}

impl LookupKind {
    /// Chat token that triggers this lookup.
    pub fn token(self) -> &'static str {
        match self {
            LookupKind::Dns => "!dns",
            LookupKind::Whois => "!whois",
            LookupKind::Status => "!status",
        }
    }
}

/// Bundle of the three lookup capabilities.
pub struct Lookups<R, W, P> {
    pub records: R,
    pub registration: W,
    pub liveness: P,
}

/// Lookups backed by hickory, TCP WHOIS and reqwest.
pub type LiveLookups = Lookups<HickoryRecordResolver, WhoisClient, ReqwestProbe>;

impl LiveLookups {
    pub fn from_config(config: &LookupConfig) -> crate::Result<Self> {
        Ok(Lookups {
            records: HickoryRecordResolver::from_config(config)?,
            registration: WhoisClient::from_config(config),
            liveness: ReqwestProbe::from_config(config)?,
        })
    }
}

impl<R, W, P> Lookups<R, W, P>
where
    R: RecordResolver,
    W: RegistrationSource,
    P: LivenessProbe,
{
    /// Run one lookup and return its reply text.
    pub async fn run(&self, kind: LookupKind, domain: &str) -> crate::Result<String> {
        let start = Instant::now();
        let result = match kind {
            LookupKind::Dns => lookup_records(&self.records, domain).await,
            LookupKind::Whois => self.registration.whois(domain).await,
            LookupKind::Status => Ok(check_liveness(&self.liveness, domain).await.to_string()),
        };

        tracing::debug!(
            lookup = kind.token(),
            domain = %domain,
            ok = result.is_ok(),
            duration_ms = %start.elapsed().as_millis(),
            "lookup finished"
        );
        result
    }
}
