//! Target address parsing: `direct://host:port`, `direct://instance-id`,
//! or `discovery://service-name`, mirroring the resolver-scheme split the
//! teacher's discovery module uses between static and registry-backed
//! addressing.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Already-resolved host:port or a known instance ID.
    Direct(String),
    /// Needs resolution through a discovery backend before dialing.
    Discovery(String),
}

impl Target {
    pub fn parse(addr: &str) -> Target {
        if let Some(rest) = addr.strip_prefix("direct://") {
            Target::Direct(rest.to_string())
        } else if let Some(rest) = addr.strip_prefix("discovery://") {
            Target::Discovery(rest.to_string())
        } else {
            Target::Direct(addr.to_string())
        }
    }
}
