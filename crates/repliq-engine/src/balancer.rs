//! Destination endpoint balancing.
//!
//! New relationships are spread over the destination's floating addresses
//! with a greedy least-loaded choice. Load is seeded from the relationships
//! that already point at each address, so repeated runs keep balancing
//! instead of starting from zero.

use tracing::{info, warn};

use crate::cluster::ClusterApi;
use crate::error::{ReplError, Result};
use crate::model::{NodeNetworks, Relationship};

/// One destination address and the relationships assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Floating address.
    pub address: String,
    /// Relationships currently using this address.
    pub assigned: usize,
}

/// The addresses available to one `create` run.
///
/// Membership is fixed at construction; only counts change. Address order is
/// significant: ties go to the address listed first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
}

impl EndpointPool {
    /// Build a pool with zero load. Duplicate addresses are kept once.
    pub fn new<I, S>(addresses: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut endpoints: Vec<Endpoint> = Vec::new();
        for address in addresses {
            let address = address.into();
            if !endpoints.iter().any(|e| e.address == address) {
                endpoints.push(Endpoint {
                    address,
                    assigned: 0,
                });
            }
        }

        if endpoints.is_empty() {
            return Err(ReplError::Configuration(
                "no destination addresses available for new relationships".to_string(),
            ));
        }
        if endpoints.len() == 1 {
            warn!(
                "Only one destination address ({}) configured. Relationships cannot be balanced.",
                endpoints[0].address
            );
        }

        Ok(Self { endpoints })
    }

    /// Count existing relationships per address. Addresses outside the pool are ignored.
    ///
    /// Returns how many relationships were counted.
    pub fn seed<'a, I>(&mut self, relationships: I) -> usize
    where
        I: IntoIterator<Item = &'a Relationship>,
    {
        let mut counted = 0;
        for rel in relationships {
            let Some(address) = rel.target_address.as_deref() else {
                continue;
            };
            if let Some(endpoint) = self.endpoints.iter_mut().find(|e| e.address == address) {
                endpoint.assigned += 1;
                counted += 1;
            }
        }
        counted
    }

    /// Pick the least-loaded address and charge one relationship to it.
    pub fn assign(&mut self) -> Result<String> {
        let endpoint = self
            .endpoints
            .iter_mut()
            .min_by_key(|e| e.assigned)
            .ok_or_else(|| {
                ReplError::Configuration("destination address pool is empty".to_string())
            })?;
        endpoint.assigned += 1;
        Ok(endpoint.address.clone())
    }

    /// Return a charge taken by [`assign`](Self::assign) for a relationship that was never created.
    pub fn release(&mut self, address: &str) {
        if let Some(endpoint) = self.endpoints.iter_mut().find(|e| e.address == address) {
            endpoint.assigned = endpoint.assigned.saturating_sub(1);
        }
    }

    /// Addresses in pool order.
    pub fn addresses(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.address.as_str()).collect()
    }

    /// Current load of each address, in pool order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Load of a single address.
    pub fn load_of(&self, address: &str) -> Option<usize> {
        self.endpoints
            .iter()
            .find(|e| e.address == address)
            .map(|e| e.assigned)
    }
}

/// Floating addresses of the network called `network`, across every node.
///
/// Names are matched case-sensitively. An unknown name is a configuration
/// error listing the networks that do exist.
pub fn network_addresses(nodes: &[NodeNetworks], network: &str) -> Result<Vec<String>> {
    let mut found = false;
    let mut addresses: Vec<String> = Vec::new();
    for status in nodes.iter().flat_map(|n| n.network_statuses.iter()) {
        if status.name != network {
            continue;
        }
        found = true;
        for address in &status.floating_addresses {
            if !addresses.contains(address) {
                addresses.push(address.clone());
            }
        }
    }

    if !found {
        let mut available: Vec<&str> = nodes
            .iter()
            .flat_map(|n| n.network_statuses.iter().map(|s| s.name.as_str()))
            .collect();
        available.sort_unstable();
        available.dedup();
        return Err(ReplError::Configuration(format!(
            "network '{}' not found on destination cluster. Available networks: {}",
            network,
            available.join(", ")
        )));
    }
    Ok(addresses)
}

/// Every floating address on every network and node.
pub fn all_addresses(nodes: &[NodeNetworks]) -> Vec<String> {
    let mut addresses: Vec<String> = Vec::new();
    for status in nodes.iter().flat_map(|n| n.network_statuses.iter()) {
        for address in &status.floating_addresses {
            if !addresses.contains(address) {
                addresses.push(address.clone());
            }
        }
    }
    addresses
}

/// Build the pool for a `create` run.
///
/// An explicit address list wins over the network lookup, but every listed
/// address must be a floating address of the destination cluster.
pub async fn resolve_pool(
    destination: &dyn ClusterApi,
    explicit: &[String],
    network: &str,
) -> Result<EndpointPool> {
    let nodes = destination.list_networks().await?;

    let addresses = if explicit.is_empty() {
        network_addresses(&nodes, network)?
    } else {
        let known = all_addresses(&nodes);
        let invalid: Vec<&str> = explicit
            .iter()
            .filter(|a| !known.contains(a))
            .map(String::as_str)
            .collect();
        if !invalid.is_empty() {
            return Err(ReplError::Configuration(format!(
                "destination addresses not found among cluster floating IPs: {}",
                invalid.join(", ")
            )));
        }
        info!(
            "Validated {} destination address(es): {}",
            explicit.len(),
            explicit.join(", ")
        );
        explicit.to_vec()
    };

    EndpointPool::new(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkAddresses;

    fn node(id: u64, networks: &[(&str, &[&str])]) -> NodeNetworks {
        NodeNetworks {
            node_id: id,
            node_name: format!("node-{}", id),
            network_statuses: networks
                .iter()
                .map(|(name, addrs)| NetworkAddresses {
                    name: name.to_string(),
                    floating_addresses: addrs.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_pool_is_configuration_error() {
        let err = EndpointPool::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, ReplError::Configuration(_)));
    }

    #[test]
    fn test_release_returns_the_charge() {
        let mut pool = EndpointPool::new(["10.1.1.20", "10.1.1.21"].map(String::from)).unwrap();
        let first = pool.assign().unwrap();
        pool.release(&first);
        assert_eq!(pool.load_of(&first), Some(0));
        assert_eq!(pool.assign().unwrap(), first);
        pool.release("10.9.9.9");
        pool.release("10.1.1.21");
        assert_eq!(pool.load_of("10.1.1.21"), Some(0));
    }

    #[test]
    fn test_assign_round_robins_on_equal_load() {
        let mut pool = EndpointPool::new(["10.1.1.20", "10.1.1.21"]).unwrap();
        let got: Vec<String> = (0..3).map(|_| pool.assign().unwrap()).collect();
        assert_eq!(got, vec!["10.1.1.20", "10.1.1.21", "10.1.1.20"]);
    }

    #[test]
    fn test_assign_prefers_least_loaded() {
        let mut pool = EndpointPool::new(["a", "b", "c"]).unwrap();
        pool.endpoints[0].assigned = 3;
        pool.endpoints[1].assigned = 1;
        pool.endpoints[2].assigned = 2;
        assert_eq!(pool.assign().unwrap(), "b");
        assert_eq!(pool.assign().unwrap(), "b");
        assert_eq!(pool.assign().unwrap(), "c");
    }

    #[test]
    fn test_duplicate_addresses_collapse() {
        let pool = EndpointPool::new(["a", "b", "a"]).unwrap();
        assert_eq!(pool.addresses(), vec!["a", "b"]);
    }

    #[test]
    fn test_network_addresses_across_nodes() {
        let nodes = vec![
            node(1, &[("Default", &["10.1.1.20", "10.1.1.21"])]),
            node(2, &[("Default", &["10.1.1.22"])]),
            node(3, &[("Default", &[])]),
        ];
        assert_eq!(
            network_addresses(&nodes, "Default").unwrap(),
            vec!["10.1.1.20", "10.1.1.21", "10.1.1.22"]
        );
    }

    #[test]
    fn test_network_selected_by_name() {
        let nodes = vec![node(
            1,
            &[("Default", &["10.120.3.54"]), ("test", &["10.120.3.55", "10.120.3.56"])],
        )];
        assert_eq!(
            network_addresses(&nodes, "test").unwrap(),
            vec!["10.120.3.55", "10.120.3.56"]
        );
    }

    #[test]
    fn test_unknown_network_lists_available() {
        let nodes = vec![node(1, &[("Default", &["10.1.1.20"])])];
        let err = network_addresses(&nodes, "default").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'default'"));
        assert!(msg.contains("Available networks: Default"));
    }

    #[test]
    fn test_network_without_addresses_yields_empty_list() {
        let nodes = vec![node(1, &[("Default", &[])])];
        let addrs = network_addresses(&nodes, "Default").unwrap();
        assert!(addrs.is_empty());
        assert!(EndpointPool::new(addrs).is_err());
    }
}
