//! Transaction types and their signed envelope forms.

mod access_list;
mod eip1559;
mod eip2930;
mod legacy;
mod signature;
mod tx_type;
pub(crate) mod util;

use alloy_primitives::{keccak256, Address, Bytes, TxHash, B256, U256};
use alloy_rlp::{Decodable, Encodable, Error as RlpError, Header, EMPTY_STRING_CODE};
use std::ops::Deref;

pub use access_list::{AccessList, AccessListItem};
pub use eip1559::TxEip1559;
pub use eip2930::TxEip2930;
pub use legacy::TxLegacy;
pub use signature::Signature;
pub use tx_type::{TxType, EIP1559_TX_TYPE_ID, EIP2930_TX_TYPE_ID, LEGACY_TX_TYPE_ID};
pub use util::{public_key_to_address, sign_message};

/// A raw transaction.
///
/// Transaction types were introduced in [EIP-2718](https://eips.ethereum.org/EIPS/eip-2718).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transaction {
    /// Legacy transaction (type `0x0`).
    Legacy(TxLegacy),
    /// Transaction with an access list ([EIP-2930](https://eips.ethereum.org/EIPS/eip-2930)),
    /// type `0x1`.
    Eip2930(TxEip2930),
    /// A transaction with a priority fee ([EIP-1559](https://eips.ethereum.org/EIPS/eip-1559)),
    /// type `0x2`.
    Eip1559(TxEip1559),
}

impl Transaction {
    /// Get the transaction type.
    pub fn tx_type(&self) -> TxType {
        match self {
            Transaction::Legacy(_) => TxType::Legacy,
            Transaction::Eip2930(_) => TxType::Eip2930,
            Transaction::Eip1559(_) => TxType::Eip1559,
        }
    }

    /// Gets the chain id of the transaction, if any.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Transaction::Legacy(tx) => tx.chain_id,
            Transaction::Eip2930(tx) => Some(tx.chain_id),
            Transaction::Eip1559(tx) => Some(tx.chain_id),
        }
    }

    /// Sets the transaction's chain id to the provided value.
    pub fn set_chain_id(&mut self, chain_id: u64) {
        match self {
            Transaction::Legacy(tx) => tx.chain_id = Some(chain_id),
            Transaction::Eip2930(tx) => tx.chain_id = chain_id,
            Transaction::Eip1559(tx) => tx.chain_id = chain_id,
        }
    }

    /// Get the transaction's nonce.
    pub fn nonce(&self) -> u64 {
        match self {
            Transaction::Legacy(tx) => tx.nonce,
            Transaction::Eip2930(tx) => tx.nonce,
            Transaction::Eip1559(tx) => tx.nonce,
        }
    }

    /// Get the gas limit of the transaction.
    pub fn gas_limit(&self) -> u64 {
        match self {
            Transaction::Legacy(tx) => tx.gas_limit,
            Transaction::Eip2930(tx) => tx.gas_limit,
            Transaction::Eip1559(tx) => tx.gas_limit,
        }
    }

    /// Gets the transaction's [`TransactionKind`], which is the address of the recipient or
    /// [`TransactionKind::Create`] if the transaction is a contract creation.
    pub fn kind(&self) -> &TransactionKind {
        match self {
            Transaction::Legacy(tx) => &tx.to,
            Transaction::Eip2930(tx) => &tx.to,
            Transaction::Eip1559(tx) => &tx.to,
        }
    }

    /// Gets the transaction's value field.
    pub fn value(&self) -> U256 {
        match self {
            Transaction::Legacy(tx) => tx.value,
            Transaction::Eip2930(tx) => tx.value,
            Transaction::Eip1559(tx) => tx.value,
        }
    }

    /// Get the transaction's input field.
    pub fn input(&self) -> &Bytes {
        match self {
            Transaction::Legacy(tx) => &tx.input,
            Transaction::Eip2930(tx) => &tx.input,
            Transaction::Eip1559(tx) => &tx.input,
        }
    }

    /// Returns the transaction's access list, if any.
    pub fn access_list(&self) -> Option<&AccessList> {
        match self {
            Transaction::Legacy(_) => None,
            Transaction::Eip2930(tx) => Some(&tx.access_list),
            Transaction::Eip1559(tx) => Some(&tx.access_list),
        }
    }

    /// Max fee per gas for eip1559 transactions, gas price for legacy and access list
    /// transactions.
    pub fn max_fee_per_gas(&self) -> u128 {
        match self {
            Transaction::Legacy(tx) => tx.gas_price,
            Transaction::Eip2930(tx) => tx.gas_price,
            Transaction::Eip1559(tx) => tx.max_fee_per_gas,
        }
    }

    /// Max priority fee per gas. Returns `None` for pre-eip1559 transactions.
    pub fn max_priority_fee_per_gas(&self) -> Option<u128> {
        match self {
            Transaction::Legacy(_) | Transaction::Eip2930(_) => None,
            Transaction::Eip1559(tx) => Some(tx.max_priority_fee_per_gas),
        }
    }

    /// Returns the price per gas the transaction actually pays on a block with the given base
    /// fee.
    ///
    /// For eip1559 transactions this is `min(max_fee_per_gas, base_fee + max_priority_fee)`,
    /// for all other transactions the declared gas price.
    pub fn effective_gas_price(&self, base_fee: u128) -> u128 {
        match self {
            Transaction::Legacy(tx) => tx.gas_price,
            Transaction::Eip2930(tx) => tx.gas_price,
            Transaction::Eip1559(tx) => tx
                .max_fee_per_gas
                .min(base_fee.saturating_add(tx.max_priority_fee_per_gas)),
        }
    }

    /// The maximum amount the sender has to be able to pay up front:
    /// `gas_limit * effective_gas_price + value`.
    pub fn upfront_cost(&self, base_fee: u128) -> U256 {
        U256::from(self.gas_limit()) * U256::from(self.effective_gas_price(base_fee)) +
            self.value()
    }

    /// Heavy operation that returns the hash over the rlp encoded transaction.
    /// It is only used for signature signing.
    pub fn signature_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(self.signing_payload_len());
        self.encode_for_signing(&mut buf);
        keccak256(&buf)
    }

    /// Signs the transaction with the given secret key, consuming it and producing the only
    /// admissible pool form.
    pub fn into_signed(self, secret: B256) -> Result<TransactionSigned, ::secp256k1::Error> {
        let signature = sign_message(secret, self.signature_hash())?;
        Ok(TransactionSigned::from_transaction_and_signature(self, signature))
    }

    /// Encodes the transaction in the form used for producing the signature hash: for legacy
    /// transactions the rlp list including the EIP-155 fields, for typed transactions the type
    /// byte followed by the rlp list of fields.
    fn encode_for_signing(&self, out: &mut dyn bytes::BufMut) {
        match self {
            Transaction::Legacy(tx) => {
                let payload_length = tx.fields_len() + tx.eip155_fields_len();
                Header { list: true, payload_length }.encode(out);
                tx.encode_fields(out);
                tx.encode_eip155_fields(out);
            }
            Transaction::Eip2930(tx) => {
                out.put_u8(EIP2930_TX_TYPE_ID);
                Header { list: true, payload_length: tx.fields_len() }.encode(out);
                tx.encode_fields(out);
            }
            Transaction::Eip1559(tx) => {
                out.put_u8(EIP1559_TX_TYPE_ID);
                Header { list: true, payload_length: tx.fields_len() }.encode(out);
                tx.encode_fields(out);
            }
        }
    }

    fn signing_payload_len(&self) -> usize {
        match self {
            Transaction::Legacy(tx) => {
                let payload_length = tx.fields_len() + tx.eip155_fields_len();
                Header { list: true, payload_length }.length() + payload_length
            }
            Transaction::Eip2930(tx) => {
                let payload_length = tx.fields_len();
                1 + Header { list: true, payload_length }.length() + payload_length
            }
            Transaction::Eip1559(tx) => {
                let payload_length = tx.fields_len();
                1 + Header { list: true, payload_length }.length() + payload_length
            }
        }
    }
}

/// Whether or not the transaction is a contract creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionKind {
    /// A transaction that creates a contract.
    #[default]
    Create,
    /// A transaction that calls a contract or transfer.
    Call(Address),
}

impl TransactionKind {
    /// Returns the address of the contract that will be called or will receive the transfer.
    pub fn to(&self) -> Option<&Address> {
        match self {
            TransactionKind::Create => None,
            TransactionKind::Call(to) => Some(to),
        }
    }
}

impl Encodable for TransactionKind {
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        match self {
            TransactionKind::Call(to) => to.encode(out),
            TransactionKind::Create => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        match self {
            TransactionKind::Call(to) => to.length(),
            TransactionKind::Create => 1,
        }
    }
}

impl Decodable for TransactionKind {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        if let Some(&first) = buf.first() {
            if first == EMPTY_STRING_CODE {
                *buf = &buf[1..];
                Ok(TransactionKind::Create)
            } else {
                let addr = <Address as Decodable>::decode(buf)?;
                Ok(TransactionKind::Call(addr))
            }
        } else {
            Err(RlpError::InputTooShort)
        }
    }
}

/// Signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionSigned {
    transaction: Transaction,
    signature: Signature,
    hash: TxHash,
}

impl AsRef<Transaction> for TransactionSigned {
    fn as_ref(&self) -> &Transaction {
        &self.transaction
    }
}

impl Deref for TransactionSigned {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl TransactionSigned {
    /// Transaction hash. Used to identify transaction.
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Transaction signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Reference to the underlying transaction.
    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// Recover the address of the signer of the transaction.
    ///
    /// Returns `None` if the signature is invalid or has a high `s` value (EIP-2).
    pub fn recover_signer(&self) -> Option<Address> {
        let signature_hash = self.transaction.signature_hash();
        self.signature.recover_signer(signature_hash)
    }

    /// Create a new signed transaction from a transaction and its signature.
    /// This will also calculate the transaction hash using its encoding.
    pub fn from_transaction_and_signature(transaction: Transaction, signature: Signature) -> Self {
        let mut initial_tx = Self { transaction, signature, hash: Default::default() };
        let mut buf = Vec::with_capacity(initial_tx.envelope_len());
        initial_tx.encode_enveloped(&mut buf);
        initial_tx.hash = keccak256(&buf);
        initial_tx
    }

    /// Encodes the transaction in its [EIP-2718](https://eips.ethereum.org/EIPS/eip-2718)
    /// envelope form: the canonical rlp list for legacy transactions, `type || rlp(fields ‖ sig)`
    /// for typed transactions. This is the form the transaction hash is computed over.
    pub fn encode_enveloped(&self, out: &mut dyn bytes::BufMut) {
        match &self.transaction {
            Transaction::Legacy(tx) => {
                let payload_length =
                    tx.fields_len() + self.signature.payload_len_with_eip155_chain_id(tx.chain_id);
                Header { list: true, payload_length }.encode(out);
                tx.encode_fields(out);
                self.signature.encode_with_eip155_chain_id(out, tx.chain_id);
            }
            Transaction::Eip2930(tx) => {
                out.put_u8(EIP2930_TX_TYPE_ID);
                let payload_length = tx.fields_len() + self.signature.payload_len();
                Header { list: true, payload_length }.encode(out);
                tx.encode_fields(out);
                self.signature.encode_inner(out);
            }
            Transaction::Eip1559(tx) => {
                out.put_u8(EIP1559_TX_TYPE_ID);
                let payload_length = tx.fields_len() + self.signature.payload_len();
                Header { list: true, payload_length }.encode(out);
                tx.encode_fields(out);
                self.signature.encode_inner(out);
            }
        }
    }

    /// Length of the envelope form produced by [`Self::encode_enveloped`].
    pub fn envelope_len(&self) -> usize {
        match &self.transaction {
            Transaction::Legacy(tx) => {
                let payload_length =
                    tx.fields_len() + self.signature.payload_len_with_eip155_chain_id(tx.chain_id);
                Header { list: true, payload_length }.length() + payload_length
            }
            Transaction::Eip2930(tx) => {
                let payload_length = tx.fields_len() + self.signature.payload_len();
                1 + Header { list: true, payload_length }.length() + payload_length
            }
            Transaction::Eip1559(tx) => {
                let payload_length = tx.fields_len() + self.signature.payload_len();
                1 + Header { list: true, payload_length }.length() + payload_length
            }
        }
    }

    /// Decodes a transaction from its envelope form, the inverse of
    /// [`Self::encode_enveloped`].
    pub fn decode_enveloped(data: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *data.first().ok_or(RlpError::InputTooShort)?;
        if first >= alloy_rlp::EMPTY_LIST_CODE {
            Self::decode_rlp_legacy_transaction(data)
        } else {
            Self::decode_enveloped_typed_transaction(data)
        }
    }

    /// Decodes a legacy transaction from the canonical rlp list form, computing the hash over
    /// the consumed bytes.
    fn decode_rlp_legacy_transaction(data: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let original_encoding = *data;

        let header = Header::decode(data)?;
        if !header.list {
            return Err(RlpError::Custom("legacy transaction must be encoded as a list"))
        }

        let mut transaction = TxLegacy::decode_fields(data)?;
        let (signature, extracted_id) = Signature::decode_with_eip155_chain_id(data)?;
        transaction.chain_id = extracted_id;

        let tx_length = header.length() + header.payload_length;
        let hash = keccak256(&original_encoding[..tx_length]);
        Ok(Self { transaction: Transaction::Legacy(transaction), signature, hash })
    }

    /// Decodes a typed transaction from `type || rlp(fields ‖ sig)`, computing the hash over the
    /// consumed bytes.
    fn decode_enveloped_typed_transaction(data: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let original_encoding = *data;

        let tx_type = *data
            .first()
            .ok_or(RlpError::Custom("typed tx cannot be decoded from an empty slice"))?;
        *data = &data[1..];

        let header = Header::decode(data)?;
        if !header.list {
            return Err(RlpError::Custom("typed tx fields must be encoded as a list"))
        }

        let transaction = match TxType::try_from(tx_type)? {
            TxType::Eip2930 => Transaction::Eip2930(TxEip2930::decode_fields(data)?),
            TxType::Eip1559 => Transaction::Eip1559(TxEip1559::decode_fields(data)?),
            TxType::Legacy => {
                return Err(RlpError::Custom("unsupported typed transaction type"))
            }
        };
        let signature = Signature::decode_inner(data)?;

        let tx_length = 1 + header.length() + header.payload_length;
        let hash = keccak256(&original_encoding[..tx_length]);
        Ok(Self { transaction, signature, hash })
    }
}

/// This encodes the transaction in the form sent over p2p: typed transactions are wrapped into an
/// rlp string so the outer list of a `Transactions` message stays well formed.
impl Encodable for TransactionSigned {
    fn encode(&self, out: &mut dyn bytes::BufMut) {
        match self.transaction.tx_type() {
            TxType::Legacy => self.encode_enveloped(out),
            _ => {
                let payload_length = self.envelope_len();
                Header { list: false, payload_length }.encode(out);
                self.encode_enveloped(out);
            }
        }
    }

    fn length(&self) -> usize {
        match self.transaction.tx_type() {
            TxType::Legacy => self.envelope_len(),
            _ => {
                let payload_length = self.envelope_len();
                Header { list: false, payload_length }.length() + payload_length
            }
        }
    }
}

/// This `Decodable` implementation only supports decoding the transaction format sent over p2p.
impl Decodable for TransactionSigned {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(RlpError::InputTooShort)?;
        if first >= alloy_rlp::EMPTY_LIST_CODE {
            return Self::decode_rlp_legacy_transaction(buf)
        }

        let header = Header::decode(buf)?;
        if header.list {
            return Err(RlpError::Custom("typed tx must be wrapped into an rlp string"))
        }
        if buf.len() < header.payload_length {
            return Err(RlpError::InputTooShort)
        }

        let mut payload = &buf[..header.payload_length];
        let tx = Self::decode_enveloped_typed_transaction(&mut payload)?;
        if !payload.is_empty() {
            return Err(RlpError::UnexpectedLength)
        }
        *buf = &buf[header.payload_length..];
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256, U256};
    use hex_literal::hex;
    use std::str::FromStr;

    #[test]
    fn unsigned_eip1559_message_hash() {
        // all unset fields are zero; only chain id, recipient, data and the access list carry
        // values
        let tx = Transaction::Eip1559(TxEip1559 {
            chain_id: 4,
            to: TransactionKind::Call(Address::repeat_byte(0x01)),
            input: Bytes::from(hex!("010200").to_vec()),
            access_list: AccessList(vec![AccessListItem {
                address: Address::repeat_byte(0x01),
                storage_keys: vec![B256::repeat_byte(0x01)],
            }]),
            ..Default::default()
        });

        assert_eq!(
            tx.signature_hash(),
            B256::from(hex!("fa81814f7dd57bad435657a05eabdba2815f41e3f15ddd6139027e7db56b0dea"))
        );
    }

    #[test]
    fn upfront_cost_eip1559() {
        let tx = Transaction::Eip1559(TxEip1559 {
            max_fee_per_gas: 10,
            max_priority_fee_per_gas: 8,
            gas_limit: 100,
            value: U256::from(6),
            ..Default::default()
        });

        // base fee 0: effective price is the priority fee
        assert_eq!(tx.upfront_cost(0), U256::from(806));
        // base fee 4: capped by the max fee
        assert_eq!(tx.upfront_cost(4), U256::from(1006));
    }

    #[test]
    fn effective_gas_price_capped_by_max_fee() {
        let tx = Transaction::Eip1559(TxEip1559 {
            max_fee_per_gas: 100,
            max_priority_fee_per_gas: 10,
            ..Default::default()
        });
        assert_eq!(tx.effective_gas_price(0), 10);
        assert_eq!(tx.effective_gas_price(80), 90);
        assert_eq!(tx.effective_gas_price(95), 100);
        assert_eq!(tx.effective_gas_price(u128::MAX), 100);
    }

    #[test]
    fn recover_signer_eip1559() {
        let signer: Address = hex!("dd6b8b3dc6b7ad97db52f08a275ff4483e024cea").into();
        let hash: B256 =
            hex!("0ec0b6a2df4d87424e5f6ad2a654e27aaeb7dac20ae9e8385cc09087ad532ee0").into();

        let tx = Transaction::Eip1559(TxEip1559 {
            chain_id: 1,
            nonce: 0x42,
            gas_limit: 44386,
            to: TransactionKind::Call(hex!("6069a6c32cf691f5982febae4faf8a6f3ab2f0f6").into()),
            value: U256::ZERO,
            input:  Bytes::from(hex!("a22cb4650000000000000000000000005eee75727d804a2b13038928d36f8b188945a57a0000000000000000000000000000000000000000000000000000000000000000").to_vec()),
            max_fee_per_gas: 0x4a817c800,
            max_priority_fee_per_gas: 0x3b9aca00,
            access_list: AccessList::default(),
        });

        let sig = Signature {
            r: U256::from_str("0x840cfc572845f5786e702984c2a582528cad4b49b2a10b9db1be7fca90058565")
                .unwrap(),
            s: U256::from_str("0x25e7109ceb98168d95b09b18bbf6b685130e0562f233877d492b94eee0c5b6d1")
                .unwrap(),
            odd_y_parity: false,
        };

        let signed_tx = TransactionSigned::from_transaction_and_signature(tx, sig);
        assert_eq!(signed_tx.hash(), hash, "Expected same hash");
        assert_eq!(signed_tx.recover_signer(), Some(signer), "Recovering signer should pass.");
    }

    #[test]
    fn sign_and_recover_roundtrip() {
        let secret = B256::repeat_byte(0x46);
        let tx = Transaction::Eip1559(TxEip1559 {
            chain_id: 4,
            nonce: 0x333,
            max_priority_fee_per_gas: 0x1284d,
            max_fee_per_gas: 0x1d97c,
            gas_limit: 0x8ae0,
            to: TransactionKind::Call(Address::repeat_byte(0xaa)),
            value: U256::from(0x2933bc9u64),
            input: Bytes::default(),
            access_list: AccessList::default(),
        });

        let signed = tx.clone().into_signed(secret).unwrap();
        let expected = {
            let secret_key = ::secp256k1::SecretKey::from_slice(secret.as_ref()).unwrap();
            public_key_to_address(secret_key.public_key(::secp256k1::SECP256K1))
        };
        assert_eq!(signed.recover_signer(), Some(expected));

        // the serialized form round-trips through the envelope codec
        let mut buf = Vec::new();
        signed.encode_enveloped(&mut buf);
        let decoded = TransactionSigned::decode_enveloped(&mut &buf[..]).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.transaction(), &tx);
    }

    #[test]
    fn p2p_roundtrip_all_variants() {
        let txs = vec![
            Transaction::Legacy(TxLegacy {
                chain_id: Some(1),
                nonce: 9,
                gas_price: 20_000_000_000,
                gas_limit: 21_000,
                to: TransactionKind::Call(Address::repeat_byte(0x35)),
                value: U256::from(10u64.pow(18)),
                input: Bytes::default(),
            }),
            Transaction::Eip2930(TxEip2930 {
                chain_id: 1,
                nonce: 3,
                gas_price: 1,
                gas_limit: 100_000,
                to: TransactionKind::Create,
                value: U256::from(7),
                input: Bytes::from(vec![1, 2, 3]),
                access_list: AccessList(vec![AccessListItem {
                    address: Address::repeat_byte(0x02),
                    storage_keys: vec![B256::ZERO],
                }]),
            }),
            Transaction::Eip1559(TxEip1559 {
                chain_id: 1,
                nonce: 0,
                gas_limit: 30_000,
                max_fee_per_gas: 2_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
                to: TransactionKind::Call(Address::repeat_byte(0x11)),
                value: U256::ZERO,
                input: Bytes::default(),
                access_list: AccessList::default(),
            }),
        ];

        let signature = Signature { r: U256::from(1), s: U256::from(2), odd_y_parity: true };
        for tx in txs {
            let signed = TransactionSigned::from_transaction_and_signature(tx, signature);
            let mut buf = Vec::new();
            signed.encode(&mut buf);
            assert_eq!(buf.len(), signed.length());
            let decoded = TransactionSigned::decode(&mut &buf[..]).unwrap();
            assert_eq!(decoded, signed);
        }
    }

    #[test]
    fn reject_priority_fee_above_max_fee() {
        let tx = Transaction::Eip1559(TxEip1559 {
            chain_id: 1,
            max_fee_per_gas: 1,
            max_priority_fee_per_gas: 2,
            ..Default::default()
        });
        let signature = Signature { r: U256::from(1), s: U256::from(2), odd_y_parity: false };
        let signed = TransactionSigned::from_transaction_and_signature(tx, signature);

        let mut buf = Vec::new();
        signed.encode_enveloped(&mut buf);
        assert!(TransactionSigned::decode_enveloped(&mut &buf[..]).is_err());
    }
}
