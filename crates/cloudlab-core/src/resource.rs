//! Kinds of external resources the flows touch

use serde::{Deserialize, Serialize};

/// Kind of an external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Secret engine mount (kv, transit, ...)
    SecretEngine,
    /// Authentication method mount (userpass, ...)
    AuthMethod,
    /// Demo identity under an auth method
    Identity,
    /// Transit-style encryption key
    EncryptionKey,
    /// Provider API that must be enabled on the project
    ServiceApi,
    FirewallRule,
    Instance,
    DnsZone,
    DnsRecord,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ResourceKind::SecretEngine => "secret engine",
            ResourceKind::AuthMethod => "auth method",
            ResourceKind::Identity => "identity",
            ResourceKind::EncryptionKey => "encryption key",
            ResourceKind::ServiceApi => "service API",
            ResourceKind::FirewallRule => "firewall rule",
            ResourceKind::Instance => "instance",
            ResourceKind::DnsZone => "DNS zone",
            ResourceKind::DnsRecord => "DNS record",
        };
        f.write_str(label)
    }
}
