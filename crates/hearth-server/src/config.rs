//! Server Configuration
//!
//! Command line and environment settings for one hearth member. Every flag
//! has an environment fallback so the same binary runs unchanged in a
//! container. Runtime tunables (call timeout, idle window) stay in
//! `hearth_core::RuntimeConfig::from_env`.

use clap::{Parser, ValueEnum};
use hearth_core::MemberId;
use std::net::SocketAddr;
use std::time::Duration;

/// Where the member learns about the rest of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MembershipSource {
    /// Fixed member list from `--static-members`
    Static,
    /// Lease-backed registration and watch in etcd
    Etcd,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("bind address {0} is unspecified; set --advertise-addr so peers can reach this member")]
    MissingAdvertiseAddr(SocketAddr),

    #[error("static membership needs at least one member in --static-members")]
    NoStaticMembers,

    #[error("lease TTL must be at least 2 seconds, got {0}")]
    LeaseTtlTooShort(i64),

    #[error("keep-alive interval ({keepalive:?}) must be shorter than the lease TTL ({ttl:?})")]
    KeepaliveTooSlow { keepalive: Duration, ttl: Duration },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error(transparent)]
    Runtime(#[from] hearth_core::ConfigError),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "hearth-server")]
#[command(about = "Run one member of a hearth virtual-actor cluster")]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[arg(long, env = "HEARTH_BIND_ADDR", default_value = "0.0.0.0:7000")]
    pub bind_addr: SocketAddr,

    /// `host:port` peers use to reach this member; doubles as the member id
    #[arg(long, env = "HEARTH_ADVERTISE_ADDR")]
    pub advertise_addr: Option<String>,

    /// Cluster provider
    #[arg(long, env = "HEARTH_MEMBERSHIP", value_enum, default_value_t = MembershipSource::Static)]
    pub membership: MembershipSource,

    /// Member ids for static membership (comma-separated)
    #[arg(long, env = "HEARTH_STATIC_MEMBERS", value_delimiter = ',')]
    pub static_members: Vec<String>,

    /// etcd endpoints (comma-separated)
    #[arg(
        long,
        env = "ETCD_ENDPOINTS",
        value_delimiter = ',',
        default_value = "http://127.0.0.1:2379"
    )]
    pub etcd_endpoints: Vec<String>,

    /// Cluster identifier for namespace isolation in etcd
    #[arg(long, env = "CLUSTER_ID", default_value = "default")]
    pub cluster_id: String,

    /// TTL of the membership lease in seconds
    #[arg(long, env = "HEARTH_LEASE_TTL_SECS", default_value_t = 15)]
    pub lease_ttl_secs: i64,

    /// Interval between lease keep-alives in seconds (a third of the TTL works well)
    #[arg(long, env = "HEARTH_KEEPALIVE_SECS", default_value_t = 5)]
    pub keepalive_secs: u64,

    /// Delay before re-registering after a lost lease or a broken watch
    #[arg(long, env = "HEARTH_RECONNECT_DELAY_SECS", default_value_t = 5)]
    pub reconnect_delay_secs: u64,

    /// How long shutdown waits for the member's deletion to reach peers
    #[arg(long, env = "HEARTH_DELETE_PROPAGATION_MS", default_value_t = 2000)]
    pub delete_propagation_ms: u64,

    /// Initial retry interval when connecting to etcd
    #[arg(long, env = "HEARTH_ETCD_BACKOFF_INITIAL_MS", default_value_t = 1000)]
    pub etcd_backoff_initial_ms: u64,

    /// Maximum retry interval when connecting to etcd
    #[arg(long, env = "HEARTH_ETCD_BACKOFF_MAX_MS", default_value_t = 10_000)]
    pub etcd_backoff_max_ms: u64,

    /// Give up connecting to etcd after this many seconds
    #[arg(long, env = "HEARTH_ETCD_BACKOFF_MAX_ELAPSED_SECS", default_value_t = 60)]
    pub etcd_backoff_max_elapsed_secs: u64,

    /// Growth factor between etcd connection retries
    #[arg(long, env = "HEARTH_ETCD_BACKOFF_MULTIPLIER", default_value_t = 2.0)]
    pub etcd_backoff_multiplier: f64,

    /// Log output format: `text` or `json`
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl ServerConfig {
    /// Member id of this process: the advertised address, or the bind
    /// address when it names a concrete interface.
    pub fn member_id(&self) -> Result<MemberId, ConfigError> {
        match &self.advertise_addr {
            Some(addr) => Ok(MemberId::new(addr.clone())),
            None if self.bind_addr.ip().is_unspecified() => {
                Err(ConfigError::MissingAdvertiseAddr(self.bind_addr))
            }
            None => Ok(MemberId::new(self.bind_addr.to_string())),
        }
    }

    pub fn static_member_ids(&self) -> Vec<MemberId> {
        self.static_members
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(MemberId::from)
            .collect()
    }

    pub fn etcd(&self) -> EtcdSettings {
        EtcdSettings {
            endpoints: self.etcd_endpoints.clone(),
            cluster_id: self.cluster_id.clone(),
            lease_ttl: self.lease_ttl_secs,
            keepalive_interval: Duration::from_secs(self.keepalive_secs),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            delete_propagation_wait: Duration::from_millis(self.delete_propagation_ms),
            backoff_initial: Duration::from_millis(self.etcd_backoff_initial_ms),
            backoff_max: Duration::from_millis(self.etcd_backoff_max_ms),
            backoff_max_elapsed: Duration::from_secs(self.etcd_backoff_max_elapsed_secs),
            backoff_multiplier: self.etcd_backoff_multiplier,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.member_id()?;

        match self.membership {
            MembershipSource::Static => {
                if self.static_member_ids().is_empty() {
                    return Err(ConfigError::NoStaticMembers);
                }
            }
            MembershipSource::Etcd => {
                if self.lease_ttl_secs < 2 {
                    return Err(ConfigError::LeaseTtlTooShort(self.lease_ttl_secs));
                }
                if self.keepalive_secs == 0 {
                    return Err(ConfigError::Zero { field: "keepalive_secs" });
                }
                let etcd = self.etcd();
                let ttl = Duration::from_secs(self.lease_ttl_secs.unsigned_abs());
                if etcd.keepalive_interval >= ttl {
                    return Err(ConfigError::KeepaliveTooSlow {
                        keepalive: etcd.keepalive_interval,
                        ttl,
                    });
                }
            }
        }
        Ok(())
    }
}

/// etcd provider settings derived from [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct EtcdSettings {
    pub endpoints: Vec<String>,
    pub cluster_id: String,
    /// Lease TTL in seconds
    pub lease_ttl: i64,
    pub keepalive_interval: Duration,
    pub reconnect_delay: Duration,
    pub delete_propagation_wait: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub backoff_max_elapsed: Duration,
    pub backoff_multiplier: f64,
}

impl Default for EtcdSettings {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            cluster_id: "default".to_string(),
            lease_ttl: 15,
            keepalive_interval: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
            delete_propagation_wait: Duration::from_secs(2),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(10),
            backoff_max_elapsed: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["hearth-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--advertise-addr", "m1:7000", "--static-members", "m1:7000"]);
        assert_eq!(config.membership, MembershipSource::Static);
        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.cluster_id, "default");
        assert_eq!(config.member_id().unwrap(), MemberId::new("m1:7000"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unspecified_bind_needs_advertise_addr() {
        let config = parse(&["--static-members", "m1:7000"]);
        assert!(matches!(config.validate(), Err(ConfigError::MissingAdvertiseAddr(_))));

        let config = parse(&["--bind-addr", "10.0.0.4:7100", "--static-members", "10.0.0.4:7100"]);
        assert_eq!(config.member_id().unwrap(), MemberId::new("10.0.0.4:7100"));
    }

    #[test]
    fn test_static_members_are_split_and_trimmed() {
        let config = parse(&[
            "--advertise-addr",
            "m1:7000",
            "--static-members",
            "m1:7000, m2:7000,,m3:7000",
        ]);
        assert_eq!(
            config.static_member_ids(),
            vec![
                MemberId::new("m1:7000"),
                MemberId::new("m2:7000"),
                MemberId::new("m3:7000")
            ]
        );
    }

    #[test]
    fn test_static_membership_requires_members() {
        let config = parse(&["--advertise-addr", "m1:7000"]);
        assert!(matches!(config.validate(), Err(ConfigError::NoStaticMembers)));
    }

    #[test]
    fn test_etcd_lease_settings_are_checked() {
        let config = parse(&[
            "--advertise-addr",
            "m1:7000",
            "--membership",
            "etcd",
            "--lease-ttl-secs",
            "6",
            "--keepalive-secs",
            "6",
        ]);
        assert!(matches!(config.validate(), Err(ConfigError::KeepaliveTooSlow { .. })));

        let config = parse(&["--advertise-addr", "m1:7000", "--membership", "etcd"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.etcd().lease_ttl, 15);
        assert_eq!(config.etcd().keepalive_interval, Duration::from_secs(5));
    }
}
