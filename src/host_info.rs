// Host network identity: hostname, primary IPv4 interface, cached external IP/provider.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::models::{NOT_AVAILABLE, NetworkInfo};
use crate::probe::{HostIdentity, ProbeError};
use crate::sysinfo_repo::{InterfaceAddrs, InterfaceSource, run_blocking};

pub struct HostInfoCollector {
    source: Arc<dyn InterfaceSource>,
    identity: HostIdentity,
}

impl HostInfoCollector {
    /// `identity` is resolved once by the caller and never refreshed.
    pub fn new(source: Arc<dyn InterfaceSource>, identity: HostIdentity) -> Self {
        Self { source, identity }
    }

    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    pub async fn collect(&self) -> Result<NetworkInfo, ProbeError> {
        let source = self.source.clone();
        let (hostname, interfaces) =
            run_blocking(move || Ok((source.hostname(), source.interfaces()))).await?;
        let interfaces = interfaces?;

        let mut info = self.base_info(hostname);
        if let Some((iface, ip)) = primary_interface(&interfaces) {
            info.interface_name = iface.name.clone();
            info.local_ip = ip.to_string();
            if let Some(mac) = &iface.mac_address {
                info.mac_address = mac.clone();
            }
        }
        Ok(info)
    }

    /// Used when interface enumeration fails: hostname and identity only.
    pub fn fallback(&self) -> NetworkInfo {
        self.base_info(self.source.hostname())
    }

    fn base_info(&self, hostname: Option<String>) -> NetworkInfo {
        let mut info = NetworkInfo::unresolved(hostname.unwrap_or_else(|| NOT_AVAILABLE.into()));
        info.external_ip = self.identity.external_ip.clone();
        info.provider = self.identity.provider.clone();
        info
    }
}

/// First non-loopback interface (by name) with an IPv4 address, and that address.
fn primary_interface(interfaces: &[InterfaceAddrs]) -> Option<(&InterfaceAddrs, Ipv4Addr)> {
    let mut sorted: Vec<&InterfaceAddrs> = interfaces.iter().filter(|i| i.name != "lo").collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted.into_iter().find_map(|iface| {
        iface
            .ipv4
            .iter()
            .find(|ip| !ip.is_loopback())
            .map(|ip| (iface, *ip))
    })
}
