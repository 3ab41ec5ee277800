use chrono::{DateTime, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A 20-byte account identifier, rendered as a 0x-prefixed hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address. Never a valid payout recipient.
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(stripped).map_err(|_| AddressParseError(s.to_string()))?;
        let bytes: [u8; 20] = raw
            .try_into()
            .map_err(|_| AddressParseError(s.to_string()))?;
        Ok(Address(bytes))
    }
}

/// Failure to parse an address from its hex rendering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address '{0}': expected 20 hex-encoded bytes")]
pub struct AddressParseError(pub String);

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

/// One of the two fungible value types held in custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Native,
    Token,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Native => write!(f, "native"),
            AssetClass::Token => write!(f, "token"),
        }
    }
}

/// Batch distribution request: four parallel sequences, one recipient/amount
/// pairing per asset class. Either class may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutRequest {
    pub native_recipients: Vec<Address>,
    pub native_amounts: Vec<u64>,
    pub token_recipients: Vec<Address>,
    pub token_amounts: Vec<u64>,
}

impl PayoutRequest {
    /// Build a request carrying only native-currency transfers.
    pub fn native_only(recipients: Vec<Address>, amounts: Vec<u64>) -> Self {
        Self {
            native_recipients: recipients,
            native_amounts: amounts,
            ..Self::default()
        }
    }

    /// Build a request carrying only token transfers.
    pub fn token_only(recipients: Vec<Address>, amounts: Vec<u64>) -> Self {
        Self {
            token_recipients: recipients,
            token_amounts: amounts,
            ..Self::default()
        }
    }
}

/// Live custody readings for one address: native balance plus the token
/// reference's accounting for the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub native: u64,
    pub token: u64,
}

/// Outcome of a fully applied payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub invocation_id: String,
    pub total_native: u64,
    pub total_token: u64,
    pub native_recipients: usize,
    pub token_recipients: usize,
    pub cost_units: u64,
    pub executed_at: DateTime<Utc>,
}

/// Outcome of a terminal sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReceipt {
    pub invocation_id: String,
    pub beneficiary: Address,
    pub native_swept: u64,
    pub token_swept: u64,
    pub cost_units: u64,
    pub executed_at: DateTime<Utc>,
}

pub(crate) fn invocation_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_hex() {
        let address = Address::from_bytes([0xab; 20]);
        let rendered = address.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn address_parse_accepts_unprefixed_hex() {
        let address = Address::from_bytes([0x11; 20]);
        let unprefixed = hex::encode(address.as_bytes());
        assert_eq!(unprefixed.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn address_parse_rejects_wrong_width() {
        assert!("0xdeadbeef".parse::<Address>().is_err());
        assert!("not hex at all".parse::<Address>().is_err());
    }

    #[test]
    fn zero_address_is_flagged() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_bytes([1; 20]).is_zero());
    }

    #[test]
    fn single_asset_constructors_leave_other_class_empty() {
        let recipient = Address::from_bytes([7; 20]);
        let request = PayoutRequest::token_only(vec![recipient], vec![10]);
        assert!(request.native_recipients.is_empty());
        assert!(request.native_amounts.is_empty());
        assert_eq!(request.token_recipients.len(), 1);
    }
}
