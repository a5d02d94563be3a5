use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::{Connector, NetworkError};

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, address: SocketAddr, timeout: Duration) -> Result<(), NetworkError> {
        match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(NetworkError::Timeout(format!(
                "connect to {address} timed out after {} ms",
                timeout.as_millis()
            ))),
        }
    }
}
