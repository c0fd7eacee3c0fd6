//! IPv4 CIDR blocks as integer intervals
//!
//! A [`Network`] is a base address plus prefix length, with the base always
//! aligned to the prefix. Every block maps onto an inclusive `u32` range, so
//! containment and free-space computation are plain interval arithmetic.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Longest IPv4 prefix.
pub const MAX_PREFIX: u8 = 32;

/// An IPv4 CIDR block.
///
/// Ordering is by base address, then by prefix length, which is address
/// order for disjoint blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Network {
    base: u32,
    prefix: u8,
}

fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (MAX_PREFIX - prefix)
    }
}

impl Network {
    /// The whole IPv4 address space, `0.0.0.0/0`.
    pub const FULL: Network = Network { base: 0, prefix: 0 };

    /// Build a block from an address and prefix length.
    ///
    /// Fails with `InvalidIP` if the prefix exceeds 32 or the address has
    /// host bits set (`10.0.0.1/8` is an address, not a block).
    pub fn new(addr: Ipv4Addr, prefix: u8) -> DomainResult<Self> {
        if prefix > MAX_PREFIX {
            return Err(DomainError::InvalidIP(format!("{}/{}", addr, prefix)));
        }
        let base = u32::from(addr);
        if base & !mask(prefix) != 0 {
            return Err(DomainError::InvalidIP(format!("{}/{}", addr, prefix)));
        }
        Ok(Self { base, prefix })
    }

    /// Parse `a.b.c.d/p`.
    ///
    /// An empty string yields [`Network::FULL`], a bare address yields a /32.
    pub fn parse(input: &str) -> DomainResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::FULL);
        }
        let invalid = || DomainError::InvalidIP(input.to_string());
        let (addr, prefix) = match input.split_once('/') {
            Some((addr, prefix)) => (addr, prefix.parse::<u8>().map_err(|_| invalid())?),
            None => (input, MAX_PREFIX),
        };
        let addr = addr.parse::<Ipv4Addr>().map_err(|_| invalid())?;
        Self::new(addr, prefix).map_err(|_| invalid())
    }

    pub fn addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.base)
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// First address of the block as an integer.
    pub fn first(&self) -> u32 {
        self.base
    }

    /// Last address of the block as an integer (inclusive).
    pub fn last(&self) -> u32 {
        self.base | !mask(self.prefix)
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> u64 {
        1u64 << (MAX_PREFIX - self.prefix)
    }

    /// True if `other` lies entirely inside this block (equality included).
    pub fn contains(&self, other: &Network) -> bool {
        other.prefix >= self.prefix && other.base & mask(self.prefix) == self.base
    }

    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix) == self.base
    }

    /// CIDR blocks either nest or are disjoint, so overlap means containment
    /// in one direction or the other.
    pub fn overlaps(&self, other: &Network) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// Split into the two blocks one bit longer. `None` for a /32.
    pub fn halves(&self) -> Option<(Network, Network)> {
        if self.prefix >= MAX_PREFIX {
            return None;
        }
        let prefix = self.prefix + 1;
        let upper = self.base | (1u32 << (MAX_PREFIX - prefix));
        Some((
            Network {
                base: self.base,
                prefix,
            },
            Network {
                base: upper,
                prefix,
            },
        ))
    }

    /// The complement of `used` within this block, as maximal CIDR blocks
    /// in address order.
    ///
    /// Disjoint blocks leave this block whole; a `used` block covering this
    /// one leaves nothing.
    pub fn exclude(&self, used: &Network) -> Vec<Network> {
        if used.contains(self) {
            return Vec::new();
        }
        if !self.contains(used) {
            return vec![*self];
        }
        let mut remainder = Vec::new();
        let mut current = *self;
        while current != *used {
            let Some((lower, upper)) = current.halves() else {
                break;
            };
            if lower.contains(used) {
                remainder.push(upper);
                current = lower;
            } else {
                remainder.push(lower);
                current = upper;
            }
        }
        remainder.sort();
        remainder
    }

    /// Sub-blocks of the given prefix length, in address order.
    pub fn subnets(&self, prefix: u8) -> DomainResult<Subnets> {
        if prefix > MAX_PREFIX || prefix < self.prefix {
            return Err(DomainError::InvalidPrefixLength(prefix));
        }
        Ok(Subnets {
            next: u64::from(self.first()),
            end: u64::from(self.last()) + 1,
            step: 1u64 << (MAX_PREFIX - prefix),
            prefix,
        })
    }
}

/// Iterator over equally sized sub-blocks of a [`Network`].
#[derive(Debug, Clone)]
pub struct Subnets {
    next: u64,
    end: u64,
    step: u64,
    prefix: u8,
}

impl Iterator for Subnets {
    type Item = Network;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let base = self.next as u32;
        self.next += self.step;
        Some(Network {
            base,
            prefix: self.prefix,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = ((self.end - self.next) / self.step) as usize;
        (remaining, Some(remaining))
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.prefix)
    }
}

impl FromStr for Network {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Network {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.to_string()
    }
}
