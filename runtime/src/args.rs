//! CLI flags and the `kubert::Runtime` this binary runs on top of (spec
//! §6 "CLI & environment"). Mirrors the shape of the index, policy
//! engine, and aggregator through to a single, fully-configured
//! `Settings` value.

use anyhow::Result;
use clap::Parser;
use gwctl_core::{backend::DnsLookupFamily, error::ValidationMode, IpNet};
use gwctl_index::{ports::parse_portset, Settings};
use std::net::SocketAddr;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ValidationModeArg {
    Standard,
    Strict,
}

impl From<ValidationModeArg> for ValidationMode {
    fn from(v: ValidationModeArg) -> Self {
        match v {
            ValidationModeArg::Standard => ValidationMode::Standard,
            ValidationModeArg::Strict => ValidationMode::Strict,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum DnsLookupFamilyArg {
    V4Only,
    V6Only,
    V4Preferred,
    Auto,
    All,
}

impl From<DnsLookupFamilyArg> for DnsLookupFamily {
    fn from(v: DnsLookupFamilyArg) -> Self {
        match v {
            DnsLookupFamilyArg::V4Only => DnsLookupFamily::V4Only,
            DnsLookupFamilyArg::V6Only => DnsLookupFamily::V6Only,
            DnsLookupFamilyArg::V4Preferred => DnsLookupFamily::V4Preferred,
            DnsLookupFamilyArg::Auto => DnsLookupFamily::Auto,
            DnsLookupFamilyArg::All => DnsLookupFamily::All,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[clap(name = "gwctl", about = "Gateway API control plane")]
pub struct Args {
    #[clap(long, default_value = "gwctl=info,warn", env = "GWCTL_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    #[clap(flatten)]
    server: kubert::ServerArgs,

    /// Disables the admission webhook server.
    #[clap(long)]
    admission_disabled: bool,

    /// Address the xDS server listens on.
    #[clap(long, default_value = "0.0.0.0:8090")]
    pub xds_addr: SocketAddr,

    /// Name this controller writes into `controllerName` fields and
    /// status entries (spec §3, §4.7).
    #[clap(long, default_value = "gwctl.io/gateway-controller")]
    pub controller_name: String,

    /// Identity used to claim the leader-election lease.
    #[clap(long, env = "HOSTNAME")]
    pub leader_election_identity: String,

    #[clap(long, default_value = "gwctl-system")]
    pub controller_namespace: String,

    #[clap(long, default_value = "gwctl-controller")]
    pub controller_deployment_name: String,

    /// Network CIDRs of pod/service IPs. Defaults to all private networks.
    #[clap(
        long,
        default_value = "10.0.0.0/8,100.64.0.0/10,172.16.0.0/12,192.168.0.0/16"
    )]
    cluster_networks: IpNets,

    #[clap(long, default_value = "cluster.local")]
    cluster_domain: String,

    #[clap(long)]
    global_policy_namespace: Option<String>,

    #[clap(long, value_enum, default_value = "standard")]
    validation_mode: ValidationModeArg,

    #[clap(long)]
    weighted_route_precedence: bool,

    #[clap(long, value_enum, default_value = "auto")]
    dns_lookup_family: DnsLookupFamilyArg,

    /// Label selector restricting which namespaces are watched; unset
    /// means cluster-wide.
    #[clap(long)]
    discovery_namespace_selector: Option<String>,

    #[clap(long)]
    experimental_features: bool,

    #[clap(long, default_value = "")]
    reserved_ports: String,
}

#[derive(Clone, Debug)]
struct IpNets(Vec<IpNet>);

impl std::str::FromStr for IpNets {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        s.split(',')
            .map(|n| n.parse().map_err(Into::into))
            .collect::<Result<Vec<IpNet>>>()
            .map(Self)
    }
}

impl Args {
    /// Returns a `kubert::Runtime` configured by the CLI arguments, with
    /// the admission webhook's TLS server bound unless disabled.
    pub async fn runtime(&self) -> Result<kubert::Runtime<Option<kubert::server::Bound>>> {
        let server = if self.admission_disabled {
            None
        } else {
            Some(self.server.clone())
        };

        let mut admin = self.admin.clone().into_builder();
        admin.with_default_prometheus();

        kubert::Runtime::builder()
            .with_log(self.log_level.clone(), self.log_format.clone())
            .with_admin(admin)
            .with_client(self.client.clone())
            .with_optional_server(server)
            .build()
            .await
            .map_err(Into::into)
    }

    pub fn admission_enabled(&self) -> bool {
        !self.admission_disabled
    }

    /// Builds the cluster-wide `Settings` threaded through the index,
    /// policy engine, and translator (spec §6 "feature flags").
    pub fn settings(&self) -> Result<Settings> {
        let discovery_namespace_selector = self
            .discovery_namespace_selector
            .as_deref()
            .map(parse_label_selector)
            .transpose()?;

        Ok(Settings {
            cluster_networks: self.cluster_networks.0.clone(),
            cluster_domain: self.cluster_domain.clone(),
            global_policy_namespace: self.global_policy_namespace.clone(),
            validation_mode: self.validation_mode.into(),
            weighted_route_precedence: self.weighted_route_precedence,
            dns_lookup_family: self.dns_lookup_family.into(),
            discovery_namespace_selector,
            experimental_features: self.experimental_features,
            reserved_ports: parse_portset(&self.reserved_ports)?,
        })
    }
}

fn parse_label_selector(s: &str) -> Result<Vec<(String, String)>> {
    s.split(',')
        .filter(|kv| !kv.is_empty())
        .map(|kv| {
            kv.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| anyhow::anyhow!("invalid label selector entry {kv:?}, expected key=value"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_selector_parses_key_value_pairs() {
        let parsed = parse_label_selector("team=platform,tier=edge").unwrap();
        assert_eq!(
            parsed,
            vec![
                ("team".to_string(), "platform".to_string()),
                ("tier".to_string(), "edge".to_string()),
            ]
        );
    }

    #[test]
    fn label_selector_rejects_entries_without_a_value() {
        assert!(parse_label_selector("team").is_err());
    }
}
