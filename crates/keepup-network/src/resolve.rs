use std::net::IpAddr;

use async_trait::async_trait;
use tracing::debug;

use crate::{NetworkError, Resolver};

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, NetworkError> {
        if let Ok(address) = host.parse::<IpAddr>() {
            return Ok(vec![address]);
        }

        let addresses: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|err| NetworkError::Resolution(err.to_string()))?
            .map(|socket| socket.ip())
            .collect();

        debug!(host, count = addresses.len(), "host resolved");
        Ok(addresses)
    }
}

/// Picks the first address of the preferred family, then of the other one.
pub fn select_address(addresses: &[IpAddr], prefer_ipv6: bool) -> Option<IpAddr> {
    addresses
        .iter()
        .find(|address| address.is_ipv6() == prefer_ipv6)
        .or_else(|| addresses.first())
        .copied()
}
