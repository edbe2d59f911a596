//! Service-discovery records and their DNS resource-record forms.
//!
//! A [`Record`] arrives with loosely-typed string fields; [`Record::rewrite`]
//! validates them against a base domain before any resource record may be
//! built from it. SRV answers are always constructed together with the glue A
//! record that keeps their target resolvable.

use std::net::IpAddr;

use hickory_proto::rr::rdata::{A, SRV};
use hickory_proto::rr::{DNSClass, Name, RData, Record as DnsRecord};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// One service-discovery record.
///
/// The derived fields (`clean_name` and the parsed IP/port) are meaningless
/// until `rewrite` has succeeded; a record that fails `rewrite` must not be
/// published.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    /// Instance identifier, `<task>.<app...>`. The leading segment is the
    /// per-task instance id and is stripped when deriving `clean_name`.
    pub id: String,
    /// Owning application identifier.
    pub parent: String,
    /// Instance IP, unvalidated string form.
    pub ip: String,
    /// Instance port, unvalidated string form.
    pub port: String,
    /// Load-balancing weight.
    pub weight: f64,
    /// True for the agent's own proxy address record.
    pub proxy_record: bool,
    /// Owner name with the instance segment replaced by the base domain.
    /// Stays empty for dot-less ids, which therefore cannot serve SRV.
    pub clean_name: String,

    #[serde(skip)]
    parsed_ip: Option<IpAddr>,
    #[serde(skip)]
    parsed_port: Option<u16>,
}

impl Record {
    /// Validate the record against `base` and fill the derived fields.
    ///
    /// Fails if `ip` is not an IPv4/IPv6 literal or `port` is not a valid
    /// port number; callers must treat a failure as "do not publish".
    pub fn rewrite(&mut self, base: &str) -> Result<(), AgentError> {
        let ip: IpAddr = self.ip.parse().map_err(|_| AgentError::InvalidRecord {
            field: "ip",
            value: self.ip.clone(),
        })?;
        let port: u16 = self.port.parse().map_err(|_| AgentError::InvalidRecord {
            field: "port",
            value: self.port.clone(),
        })?;

        self.parsed_ip = Some(ip);
        self.parsed_port = Some(port);

        if let Some((_, rest)) = self.id.split_once('.') {
            self.clean_name = format!("{}.{}", rest, base);
        }

        Ok(())
    }

    /// Build an A resource record owned by `name`.
    ///
    /// Fails unless `rewrite` succeeded and the parsed IP is IPv4.
    pub fn build_a(&self, name: &str, ttl: u32) -> Result<DnsRecord, AgentError> {
        let ip = match self.parsed_ip {
            Some(IpAddr::V4(ip)) => ip,
            _ => {
                return Err(AgentError::InvalidRecord {
                    field: "ip",
                    value: self.ip.clone(),
                })
            }
        };

        let mut record = DnsRecord::from_rdata(Name::from_ascii(name)?, ttl, RData::A(A::from(ip)));
        record.set_dns_class(DNSClass::IN);
        Ok(record)
    }

    /// Build an SRV resource record owned by `name`, plus the glue A record
    /// owned by the SRV target.
    ///
    /// The target is `clean_name`, priority is 0, and the weight is truncated
    /// into the 16-bit SRV weight field. An SRV answer must always be
    /// published together with its glue record or the target will dangle.
    pub fn build_srv(&self, name: &str, ttl: u32) -> Result<(DnsRecord, DnsRecord), AgentError> {
        if self.clean_name.is_empty() {
            return Err(AgentError::InvalidRecord {
                field: "id",
                value: self.id.clone(),
            });
        }
        let port = self.parsed_port.ok_or_else(|| AgentError::InvalidRecord {
            field: "port",
            value: self.port.clone(),
        })?;

        let srv = SRV::new(0, self.weight as u16, port, Name::from_ascii(&self.clean_name)?);
        let mut record =
            DnsRecord::from_rdata(Name::from_ascii(name)?, ttl, RData::SRV(srv));
        record.set_dns_class(DNSClass::IN);

        let glue = self.build_a(&self.clean_name, ttl)?;

        Ok((record, glue))
    }
}
