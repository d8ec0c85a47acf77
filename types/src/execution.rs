use crate::casino::GameType;
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_utils::{hex, union, union_unique};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::CryptoRngCore;
use std::fmt;

pub const NAMESPACE: &[u8] = b"_SUPERSOCIETY";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

/// Maximum name length for casino player registration
pub const CASINO_MAX_NAME_LENGTH: usize = 32;

/// Maximum payload length for casino game moves
pub const CASINO_MAX_PAYLOAD_LENGTH: usize = 256;

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

/// An ed25519 signing key owned by a single account.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    pub fn from_rng(rng: &mut impl CryptoRngCore) -> Self {
        Self(SigningKey::generate(rng))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self(SigningKey::from_bytes(&seed))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    pub fn sign(&self, namespace: Option<&[u8]>, message: &[u8]) -> Signature {
        let signature = match namespace {
            Some(namespace) => self.0.sign(&union_unique(namespace, message)),
            None => self.0.sign(message),
        };
        Signature(signature)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({})", self.public_key())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn verify(&self, namespace: Option<&[u8]>, message: &[u8], signature: &Signature) -> bool {
        let result = match namespace {
            Some(namespace) => self.0.verify(&union_unique(namespace, message), &signature.0),
            None => self.0.verify(message, &signature.0),
        };
        result.is_ok()
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(self.0.as_bytes()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Write for PublicKey {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(self.0.as_bytes());
    }
}

impl Read for PublicKey {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let bytes = <[u8; 32]>::read(reader)?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| Error::Invalid("PublicKey", "not a valid ed25519 point"))
    }
}

impl FixedSize for PublicKey {
    const SIZE: usize = 32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Write for Signature {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0.to_bytes());
    }
}

impl Read for Signature {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let bytes = <[u8; 64]>::read(reader)?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&bytes)))
    }
}

impl FixedSize for Signature {
    const SIZE: usize = 64;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub instruction: Instruction,

    pub public: PublicKey,
    pub signature: Signature,
}

impl Transaction {
    fn payload(nonce: &u64, instruction: &Instruction) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.write(&mut payload);
        instruction.write(&mut payload);

        payload
    }

    pub fn sign(private: &PrivateKey, nonce: u64, instruction: Instruction) -> Self {
        let signature = private.sign(
            Some(&transaction_namespace(NAMESPACE)),
            &Self::payload(&nonce, &instruction),
        );

        Self {
            nonce,
            instruction,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.public.verify(
            Some(&transaction_namespace(NAMESPACE)),
            &Self::payload(&self.nonce, &self.instruction),
            &self.signature,
        )
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.instruction.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let nonce = u64::read(reader)?;
        let instruction = Instruction::read(reader)?;
        let public = PublicKey::read(reader)?;
        let signature = Signature::read(reader)?;

        Ok(Self {
            nonce,
            instruction,
            public,
            signature,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.instruction.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

/// The casino instructions a player account can issue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Register a player under a display name (tag 10).
    CasinoRegister { name: String },
    /// Open a game session (tag 12).
    CasinoStartGame {
        game_type: GameType,
        bet: u64,
        session_id: u64,
    },
    /// Apply a game-specific move payload to an open session (tag 13).
    CasinoGameMove { session_id: u64, payload: Vec<u8> },
    /// Join a tournament (tag 16).
    CasinoJoinTournament { tournament_id: u64 },
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::CasinoRegister { name } => {
                10u8.write(writer);
                (name.len() as u32).write(writer);
                writer.put_slice(name.as_bytes());
            }
            Self::CasinoStartGame {
                game_type,
                bet,
                session_id,
            } => {
                12u8.write(writer);
                game_type.write(writer);
                bet.write(writer);
                session_id.write(writer);
            }
            Self::CasinoGameMove {
                session_id,
                payload,
            } => {
                13u8.write(writer);
                session_id.write(writer);
                (payload.len() as u32).write(writer);
                writer.put_slice(payload);
            }
            Self::CasinoJoinTournament { tournament_id } => {
                16u8.write(writer);
                tournament_id.write(writer);
            }
        }
    }
}

/// Read a `u32`-prefixed byte string of at most `max` bytes.
fn read_prefixed(reader: &mut impl Buf, max: usize) -> Result<Vec<u8>, Error> {
    let len = u32::read(reader)? as usize;
    if len > max {
        return Err(Error::InvalidLength(len));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    Ok(bytes)
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            10 => {
                let name = read_prefixed(reader, CASINO_MAX_NAME_LENGTH)?;
                let name = String::from_utf8(name)
                    .map_err(|_| Error::Invalid("Instruction", "invalid UTF-8 in casino name"))?;
                Self::CasinoRegister { name }
            }
            12 => Self::CasinoStartGame {
                game_type: GameType::read(reader)?,
                bet: u64::read(reader)?,
                session_id: u64::read(reader)?,
            },
            13 => Self::CasinoGameMove {
                session_id: u64::read(reader)?,
                payload: read_prefixed(reader, CASINO_MAX_PAYLOAD_LENGTH)?,
            },
            16 => Self::CasinoJoinTournament {
                tournament_id: u64::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::CasinoRegister { name } => u32::SIZE + name.len(),
                Self::CasinoStartGame { .. } => GameType::SIZE + u64::SIZE + u64::SIZE,
                Self::CasinoGameMove { payload, .. } => u64::SIZE + u32::SIZE + payload.len(),
                Self::CasinoJoinTournament { .. } => u64::SIZE,
            }
    }
}

/// State keys queried over `/state`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Account for nonce tracking (tag 0)
    Account(PublicKey),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(public) => {
                0u8.write(writer);
                public.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Account(PublicKey::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Account(public) => public.encode_size(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Account for nonce tracking (tag 0)
    Account(Account),
}

impl Value {
    /// Size of an encoded account value (tag + nonce).
    pub const ACCOUNT_SIZE: usize = 1 + 8;
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Account(Account::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Account(account) => account.encode_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn keypair(seed: u64) -> (PrivateKey, PublicKey) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let private = PrivateKey::from_rng(&mut rng);
        let public = private.public_key();
        (private, public)
    }

    #[test]
    fn test_transaction_sign_verify() {
        let (private, _) = keypair(1);
        let tx = Transaction::sign(
            &private,
            7,
            Instruction::CasinoStartGame {
                game_type: GameType::Blackjack,
                bet: 25,
                session_id: 1_000_001,
            },
        );
        assert!(tx.verify());

        let decoded = Transaction::decode(tx.encode().as_ref()).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify());
    }

    #[test]
    fn test_transaction_tamper_detected() {
        let (private, _) = keypair(2);
        let mut tx = Transaction::sign(&private, 0, Instruction::CasinoJoinTournament { tournament_id: 10 });
        tx.nonce = 1;
        assert!(!tx.verify());
    }

    #[test]
    fn test_transaction_layout() {
        let (private, public) = keypair(3);
        let tx = Transaction::sign(
            &private,
            5,
            Instruction::CasinoGameMove {
                session_id: 9,
                payload: vec![1],
            },
        );
        let bytes = tx.encode();
        assert_eq!(bytes.len(), tx.encode_size());
        assert_eq!(&bytes[..8], &5u64.to_be_bytes());
        assert_eq!(bytes[8], 13);
        assert_eq!(&bytes[9..17], &9u64.to_be_bytes());
        assert_eq!(&bytes[17..21], &1u32.to_be_bytes());
        assert_eq!(bytes[21], 1);
        assert_eq!(&bytes[22..54], public.as_ref());
        assert_eq!(bytes.len(), 54 + 64);
    }

    #[test]
    fn test_register_name_limit() {
        let mut bytes = vec![10u8];
        bytes.extend_from_slice(&33u32.to_be_bytes());
        bytes.extend_from_slice(&[b'a'; 33]);
        assert!(matches!(
            Instruction::decode(bytes.as_slice()),
            Err(Error::InvalidLength(33))
        ));
    }

    #[test]
    fn test_instruction_decode_errors() {
        let join = Instruction::CasinoJoinTournament { tournament_id: 3 }.encode();
        assert!(matches!(
            Instruction::decode(&join[..join.len() - 1]),
            Err(Error::EndOfBuffer)
        ));

        let mut trailing = join.to_vec();
        trailing.push(0);
        assert!(matches!(
            Instruction::decode(trailing.as_slice()),
            Err(Error::ExtraData(1))
        ));

        // Tags outside the bot instruction set are rejected.
        let mut deposit = vec![11u8];
        deposit.extend_from_slice(&5u64.to_be_bytes());
        assert!(matches!(
            Instruction::decode(deposit.as_slice()),
            Err(Error::InvalidEnum(11))
        ));
    }

    #[test]
    fn test_signature_namespace_separation() {
        let (private, public) = keypair(4);
        let signature = private.sign(Some(b"_A".as_slice()), b"msg");
        assert!(public.verify(Some(b"_A".as_slice()), b"msg", &signature));
        assert!(!public.verify(Some(b"_B".as_slice()), b"msg", &signature));
        assert!(!public.verify(None, b"msg", &signature));
    }

    #[test]
    fn test_union_unique_prefix() {
        assert_eq!(union_unique(b"ab", b"c"), vec![2, b'a', b'b', b'c']);
        assert_eq!(transaction_namespace(NAMESPACE), b"_SUPERSOCIETY_TX".to_vec());
    }

    #[test]
    fn test_account_value() {
        let value = Value::Account(Account { nonce: 42 });
        let bytes = value.encode();
        assert_eq!(bytes.len(), Value::ACCOUNT_SIZE);
        assert_eq!(bytes[0], 0);
        assert_eq!(Value::decode(bytes.as_ref()).unwrap(), value);
    }
}
