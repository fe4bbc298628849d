use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An IP network prefix such as `10.0.0.0/8` or `2001:db8::/32`.
///
/// The address is kept as given; host bits are not masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inet {
    addr: IpAddr,
    prefix_len: u8,
}

/// Error returned when parsing an [`Inet`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseInetError {
    #[error("invalid address: {0}")]
    Address(#[from] std::net::AddrParseError),
    #[error("invalid prefix length: {0}")]
    PrefixLength(String),
}

impl Inet {
    /// Creates a prefix, returning `None` if `prefix_len` exceeds the address
    /// width (32 for IPv4, 128 for IPv6).
    pub fn new(addr: IpAddr, prefix_len: u8) -> Option<Self> {
        (prefix_len <= max_prefix(addr)).then_some(Self { addr, prefix_len })
    }

    /// A single-host prefix (`/32` or `/128`).
    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix_len: max_prefix(addr),
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Appends the canonical binary form: 4 or 16 address bytes followed by
    /// one prefix-length byte.
    pub fn append_binary(&self, buf: &mut Vec<u8>) {
        match self.addr {
            IpAddr::V4(addr) => buf.extend_from_slice(&addr.octets()),
            IpAddr::V6(addr) => buf.extend_from_slice(&addr.octets()),
        }
        buf.push(self.prefix_len);
    }

    /// Parses the canonical binary form. Returns `None` for any length other
    /// than 5 or 17 bytes, or an out-of-range prefix length.
    pub fn from_binary(bytes: &[u8]) -> Option<Self> {
        let (&prefix_len, addr) = bytes.split_last()?;
        let addr = if let Ok(octets) = <[u8; 4]>::try_from(addr) {
            IpAddr::V4(Ipv4Addr::from(octets))
        } else {
            IpAddr::V6(Ipv6Addr::from(<[u8; 16]>::try_from(addr).ok()?))
        };
        Self::new(addr, prefix_len)
    }
}

fn max_prefix(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl FromStr for Inet {
    type Err = ParseInetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            None => Ok(Self::host(s.parse()?)),
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.parse()?;
                prefix
                    .parse::<u8>()
                    .ok()
                    .and_then(|len| Self::new(addr, len))
                    .ok_or_else(|| ParseInetError::PrefixLength(prefix.to_string()))
            }
        }
    }
}

impl std::fmt::Display for Inet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}
