//! Address lookup for the `get-ip` command and ready notifications.

use crate::error::{Error, Result};
use async_process::Command;
use async_trait::async_trait;
use tokio::net::UdpSocket;

/// Resolves the addresses players use to reach the server.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Address reachable from outside the LAN.
    async fn public_address(&self) -> Result<String>;

    /// Address on the local network.
    async fn local_address(&self) -> Result<String>;
}

/// Resolver backed by the host system.
///
/// The public address comes from the Hamachi CLI (`hamachi` prints an
/// `address : <ipv4> <ipv6>` line). The local address is the source address
/// the OS would pick for outbound traffic; no packet is sent.
#[derive(Debug, Clone, Default)]
pub struct SystemAddressResolver;

#[async_trait]
impl AddressResolver for SystemAddressResolver {
    async fn public_address(&self) -> Result<String> {
        let output = Command::new("hamachi")
            .output()
            .await
            .map_err(|e| Error::AddressResolution(format!("Failed to run hamachi: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_hamachi_address(&stdout)
            .ok_or_else(|| Error::AddressResolution("No address in hamachi output".to_string()))
    }

    async fn local_address(&self) -> Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket
            .connect("8.8.8.8:80")
            .await
            .map_err(|e| Error::AddressResolution(format!("No route for local address: {}", e)))?;
        let addr = socket.local_addr()?;
        Ok(addr.ip().to_string())
    }
}

/// Picks the first token after the colon on the `address` line.
pub fn parse_hamachi_address(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| line.trim_start().starts_with("address"))
        .find_map(|line| line.split_once(':'))
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hamachi_output() {
        let output = "  version    : 2.1.0.203\n  pid        : 1234\n  status     : logged in\n  client id  : 123-456-789\n  address    : 25.10.20.30  2620:9b::190a:141e\n  nickname   : host\n";
        assert_eq!(parse_hamachi_address(output).as_deref(), Some("25.10.20.30"));
        assert_eq!(parse_hamachi_address("status : logged out\n"), None);
    }
}
