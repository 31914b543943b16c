//! Fixed-width next-hop addresses
//!
//! Every inner payload starts with the next hop written as exactly ten ASCII
//! decimal digits, zero-padded. Addresses that need more digits cannot be
//! expressed in this protocol version and are rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of the address field at the head of an inner payload
pub const ADDRESS_FIELD_LEN: usize = 10;

/// Address errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address {0} does not fit in 10 decimal digits")]
    OutOfRange(u64),
    #[error("address field must be 10 bytes, got {0}")]
    BadLength(usize),
    #[error("address field is not decimal")]
    NotDecimal,
}

/// Inbound address of a relay or user
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub struct Address(u64);

impl Address {
    /// Largest address the field can carry
    pub const MAX: u64 = 9_999_999_999;

    pub fn new(value: u64) -> Result<Self, AddressError> {
        if value > Self::MAX {
            return Err(AddressError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Zero-padded field form
    pub fn to_field(&self) -> [u8; ADDRESS_FIELD_LEN] {
        let mut field = [b'0'; ADDRESS_FIELD_LEN];
        let digits = self.0.to_string();
        field[ADDRESS_FIELD_LEN - digits.len()..].copy_from_slice(digits.as_bytes());
        field
    }

    /// Parse the field form. All ten bytes must be ASCII digits.
    pub fn from_field(field: &[u8]) -> Result<Self, AddressError> {
        if field.len() != ADDRESS_FIELD_LEN {
            return Err(AddressError::BadLength(field.len()));
        }
        let value = field.iter().try_fold(0u64, |acc, &b| {
            if b.is_ascii_digit() {
                Ok(acc * 10 + u64::from(b - b'0'))
            } else {
                Err(AddressError::NotDecimal)
            }
        })?;
        Ok(Self(value))
    }

    /// Interpret the address as a local TCP port
    pub fn port(&self) -> Option<u16> {
        u16::try_from(self.0).ok()
    }
}

impl TryFrom<u64> for Address {
    type Error = AddressError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl From<u16> for Address {
    fn from(port: u16) -> Self {
        Self(u64::from(port))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().parse::<u64>().map_err(|_| AddressError::NotDecimal)?;
        Self::new(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_padding() {
        let addr = Address::new(3001).unwrap();
        assert_eq!(&addr.to_field(), b"0000003001");
        assert_eq!(&Address::new(0).unwrap().to_field(), b"0000000000");
        assert_eq!(&Address::new(Address::MAX).unwrap().to_field(), b"9999999999");
    }

    #[test]
    fn test_field_roundtrip() {
        for value in [0, 7, 4000, 65_535, 1_234_567_890, Address::MAX] {
            let addr = Address::new(value).unwrap();
            assert_eq!(Address::from_field(&addr.to_field()).unwrap(), addr);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(
            Address::new(10_000_000_000),
            Err(AddressError::OutOfRange(10_000_000_000))
        );
    }

    #[test]
    fn test_malformed_field() {
        assert_eq!(Address::from_field(b"000004000"), Err(AddressError::BadLength(9)));
        assert_eq!(Address::from_field(b"00000 4000"), Err(AddressError::NotDecimal));
        assert_eq!(Address::from_field(b"-000004000"), Err(AddressError::NotDecimal));
    }

    #[test]
    fn test_port() {
        assert_eq!(Address::new(4001).unwrap().port(), Some(4001));
        assert_eq!(Address::new(70_000).unwrap().port(), None);
        assert_eq!(Address::from(3000u16).value(), 3000);
    }

    #[test]
    fn test_parse_str() {
        assert_eq!("4002".parse::<Address>().unwrap().value(), 4002);
        assert!("forty".parse::<Address>().is_err());
        assert!("99999999999".parse::<Address>().is_err());
    }
}
