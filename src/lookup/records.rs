//! DNS record lookup over a fixed, ordered set of record types.
//!
//! Each type is queried in turn; answers become `"<TYPE>: <value>"` lines.
//! Types with no records (or a non-existent domain) are skipped silently,
//! any other resolver failure aborts the whole lookup.

use std::future::Future;
use std::str::FromStr;

use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{Name, ResolveError, TokioResolver};

use crate::config::{LookupConfig, ResolverKind};
use crate::error::ScoutError;

/// Reply used when no record type produced any output.
pub const NO_INFORMATION: &str = "No information available.";

/// Record types queried by `!dns`, in reply order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    A,
    Aaaa,
    Ns,
    Cname,
    Mx,
    Ptr,
    Soa,
    Txt,
}

impl RecordKind {
    /// Query order; also the order of lines in the reply.
    pub const ALL: [RecordKind; 8] = [
        RecordKind::A,
        RecordKind::Aaaa,
        RecordKind::Ns,
        RecordKind::Cname,
        RecordKind::Mx,
        RecordKind::Ptr,
        RecordKind::Soa,
        RecordKind::Txt,
    ];

    /// Label used as the line prefix.
    pub fn label(self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Ns => "NS",
            RecordKind::Cname => "CNAME",
            RecordKind::Mx => "MX",
            RecordKind::Ptr => "PTR",
            RecordKind::Soa => "SOA",
            RecordKind::Txt => "TXT",
        }
    }

    fn record_type(self) -> RecordType {
        match self {
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
            RecordKind::Ns => RecordType::NS,
            RecordKind::Cname => RecordType::CNAME,
            RecordKind::Mx => RecordType::MX,
            RecordKind::Ptr => RecordType::PTR,
            RecordKind::Soa => RecordType::SOA,
            RecordKind::Txt => RecordType::TXT,
        }
    }
}

/// Resolves one record type for a domain.
///
/// Implementations return `Ok(vec![])` for "no such record" and "domain does
/// not exist", and `Err` for everything else.
pub trait RecordResolver: Send + Sync {
    fn resolve(
        &self,
        domain: &str,
        kind: RecordKind,
    ) -> impl Future<Output = crate::Result<Vec<String>>> + Send;
}

/// Query every record type in order and join the answers into one reply.
pub async fn lookup_records<R: RecordResolver>(resolver: &R, domain: &str) -> crate::Result<String> {
    let mut lines = Vec::new();

    for kind in RecordKind::ALL {
        let values = resolver.resolve(domain, kind).await?;
        tracing::debug!(
            domain = %domain,
            record_type = kind.label(),
            count = values.len(),
            "record lookup"
        );
        lines.extend(
            values
                .into_iter()
                .map(|value| format!("{}: {}", kind.label(), value)),
        );
    }

    if lines.is_empty() {
        Ok(NO_INFORMATION.to_string())
    } else {
        Ok(lines.join("\n"))
    }
}

/// `RecordResolver` backed by hickory's tokio resolver.
pub struct HickoryRecordResolver {
    resolver: TokioResolver,
}

impl HickoryRecordResolver {
    /// Build a resolver for the configured upstream with the configured per-query timeout.
    pub fn from_config(config: &LookupConfig) -> crate::Result<Self> {
        let mut builder = match config.resolver {
            ResolverKind::System => TokioResolver::builder_tokio().map_err(|e| {
                ScoutError::InvalidConfig(
                    "lookup".to_string(),
                    format!("failed to read system resolver configuration: {}", e),
                )
            })?,
            ResolverKind::Google => TokioResolver::builder_with_config(
                ResolverConfig::google(),
                TokioConnectionProvider::default(),
            ),
            ResolverKind::Cloudflare => TokioResolver::builder_with_config(
                ResolverConfig::cloudflare(),
                TokioConnectionProvider::default(),
            ),
            ResolverKind::Quad9 => TokioResolver::builder_with_config(
                ResolverConfig::quad9(),
                TokioConnectionProvider::default(),
            ),
        };
        builder.options_mut().timeout = config.dns_timeout();

        tracing::debug!(resolver = ?config.resolver, "DNS resolver configured");

        Ok(Self {
            resolver: builder.build(),
        })
    }
}

/// True for NXDOMAIN and NODATA answers only.
///
/// hickory also reports SERVFAIL and REFUSED as "no records found"; those are
/// upstream failures and must not be mistaken for an empty answer.
fn is_absent(err: &ResolveError) -> bool {
    matches!(
        err.proto().map(|proto| proto.kind()),
        Some(ProtoErrorKind::NoRecordsFound {
            response_code: ResponseCode::NXDomain | ResponseCode::NoError,
            ..
        })
    )
}

impl RecordResolver for HickoryRecordResolver {
    async fn resolve(&self, domain: &str, kind: RecordKind) -> crate::Result<Vec<String>> {
        // Absolute name, so resolv.conf search domains are never appended
        let mut name = Name::from_str(domain)
            .map_err(|e| ScoutError::Dns(domain.to_string(), e.to_string()))?;
        name.set_fqdn(true);

        let record_type = kind.record_type();
        match self.resolver.lookup(name, record_type).await {
            // CNAME chains come back in the same answer; keep only the queried type
            Ok(lookup) => Ok(lookup
                .iter()
                .filter(|rdata| rdata.record_type() == record_type)
                .map(|rdata| rdata.to_string())
                .collect()),
            Err(e) if is_absent(&e) => Ok(Vec::new()),
            Err(e) => Err(ScoutError::Dns(domain.to_string(), e.to_string())),
        }
    }
}
