//! Request and response envelopes for the ledger's HTTP API.

use crate::execution::{Key, PublicKey, Transaction, Value};
use bytes::{Buf, BufMut};
use commonware_codec::{Encode, EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_utils::hex;
use sha2::{Digest as _, Sha256};

/// Maximum number of transactions that can be submitted in a single submission
pub const MAX_SUBMISSION_TRANSACTIONS: usize = 128;

/// A SHA-256 digest of an encoded state key.
pub type Digest = [u8; 32];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Transactions(Vec<Transaction>),
}

impl Write for Submission {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Submission::Transactions(txs) => {
                1u8.write(writer);
                txs.write(writer);
            }
        }
    }
}

impl Read for Submission {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            1 => Ok(Submission::Transactions(Vec::read_range(
                reader,
                1..=MAX_SUBMISSION_TRANSACTIONS,
            )?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Submission {
    fn encode_size(&self) -> usize {
        1 + match self {
            Submission::Transactions(txs) => txs.encode_size(),
        }
    }
}

/// The trailing state operation of a `/state` response.
///
/// The ledger prefixes the operation with a certificate and an inclusion
/// proof; clients that trust their endpoint only need the operation itself,
/// which always ends the body: `[key digest][value]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lookup {
    pub key: Digest,
    pub value: Value,
}

impl Write for Lookup {
    fn write(&self, writer: &mut impl BufMut) {
        self.key.write(writer);
        self.value.write(writer);
    }
}

impl Read for Lookup {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = Digest::read(reader)?;
        let value = Value::read(reader)?;
        Ok(Self { key, value })
    }
}

impl EncodeSize for Lookup {
    fn encode_size(&self) -> usize {
        Digest::SIZE + self.value.encode_size()
    }
}

/// Encode the state key of an account.
pub fn encode_account_key(public: &PublicKey) -> Vec<u8> {
    Key::Account(*public).encode().to_vec()
}

/// Hash a state key the way the ledger indexes it.
pub fn hash_key(key: &Key) -> Digest {
    Sha256::digest(key.encode()).into()
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex(bytes)
}

/// Path segment used to query `key` over `/state/{query}`.
pub fn state_query(key: &Key) -> String {
    bytes_to_hex(&hash_key(key))
}

/// Wrap signed transactions into a submission body.
pub fn wrap_transaction_submission(txs: Vec<Transaction>) -> Result<Vec<u8>, Error> {
    if txs.is_empty() || txs.len() > MAX_SUBMISSION_TRANSACTIONS {
        return Err(Error::InvalidLength(txs.len()));
    }
    Ok(Submission::Transactions(txs).encode().to_vec())
}

/// Decode the account value at the end of a `/state` response for `key`.
pub fn decode_lookup(key: &Key, body: &[u8]) -> Result<Lookup, Error> {
    let size = match key {
        Key::Account(_) => Digest::SIZE + Value::ACCOUNT_SIZE,
    };
    if body.len() < size {
        return Err(Error::EndOfBuffer);
    }
    let mut tail = &body[body.len() - size..];
    let lookup = Lookup::read(&mut tail)?;
    if lookup.key != hash_key(key) {
        return Err(Error::Invalid("Lookup", "key digest mismatch"));
    }
    Ok(lookup)
}
