use alloy_rlp::{Decodable, Encodable, Error as RlpError};

/// Identifier for a legacy transaction.
pub const LEGACY_TX_TYPE_ID: u8 = 0;

/// Identifier for an [EIP-2930](https://eips.ethereum.org/EIPS/eip-2930) transaction.
pub const EIP2930_TX_TYPE_ID: u8 = 1;

/// Identifier for an [EIP-1559](https://eips.ethereum.org/EIPS/eip-1559) transaction.
pub const EIP1559_TX_TYPE_ID: u8 = 2;

/// Transaction Type
///
/// Transaction types were introduced in [EIP-2718](https://eips.ethereum.org/EIPS/eip-2718).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TxType {
    /// Legacy transaction pre EIP-2718.
    #[default]
    Legacy = 0,
    /// AccessList transaction
    Eip2930 = 1,
    /// Transaction with priority fee
    Eip1559 = 2,
}

impl From<TxType> for u8 {
    fn from(value: TxType) -> Self {
        value as Self
    }
}

impl TryFrom<u8> for TxType {
    type Error = RlpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            LEGACY_TX_TYPE_ID => Ok(Self::Legacy),
            EIP2930_TX_TYPE_ID => Ok(Self::Eip2930),
            EIP1559_TX_TYPE_ID => Ok(Self::Eip1559),
            _ => Err(RlpError::Custom("unsupported typed transaction type")),
        }
    }
}

impl Encodable for TxType {
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        (*self as u8).encode(out)
    }

    fn length(&self) -> usize {
        1
    }
}

impl Decodable for TxType {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let ty = u8::decode(buf)?;
        Self::try_from(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_type_roundtrip() {
        for ty in [TxType::Legacy, TxType::Eip2930, TxType::Eip1559] {
            let mut buf = Vec::new();
            ty.encode(&mut buf);
            assert_eq!(TxType::decode(&mut &buf[..]).unwrap(), ty);
        }
        assert!(TxType::try_from(3u8).is_err());
    }
}
