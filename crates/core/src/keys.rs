use std::fmt;

use crc::{Crc, CRC_16_XMODEM};
use data_encoding::BASE32_NOPAD;
use ed25519_dalek::{Signer, SigningKey};
use thiserror::Error;

const VERSION_ACCOUNT_ID: u8 = 6 << 3;
const VERSION_SEED: u8 = 18 << 3;
const STRKEY_PAYLOAD_LEN: usize = 32;
const STRKEY_RAW_LEN: usize = 1 + STRKEY_PAYLOAD_LEN + 2;

const CHECKSUM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Ed25519 public key identifying a ledger account (`G...` strkey).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses an account id such as `GAAAA...WHF`.
    pub fn from_account_id(value: &str) -> Result<Self, KeyError> {
        decode_strkey(VERSION_ACCOUNT_ID, value).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the strkey representation of the account.
    pub fn account_id(&self) -> String {
        encode_strkey(VERSION_ACCOUNT_ID, &self.0)
    }

    /// Last four bytes of the key, used to decorate signatures.
    pub fn signature_hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.0[28..]);
        hint
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.account_id())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.account_id()).finish()
    }
}

/// Signing key pair decoded from an `S...` secret seed.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
    public: PublicKey,
}

impl Keypair {
    /// Decodes a secret seed strkey and derives the matching public key.
    pub fn from_secret(secret: &str) -> Result<Self, KeyError> {
        let seed = decode_strkey(VERSION_SEED, secret.trim())?;
        Ok(Self::from_seed(seed))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&seed);
        let public = PublicKey(signing.verifying_key().to_bytes());
        Self { signing, public }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public.account_id())
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Errors produced while decoding strkeys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("key is not valid base32")]
    Encoding,
    #[error("key has invalid length {0}")]
    Length(usize),
    #[error("unexpected version byte {found:#04x} (expected {expected:#04x})")]
    Version { expected: u8, found: u8 },
    #[error("key checksum mismatch")]
    Checksum,
}

fn encode_strkey(version: u8, payload: &[u8; STRKEY_PAYLOAD_LEN]) -> String {
    let mut raw = Vec::with_capacity(STRKEY_RAW_LEN);
    raw.push(version);
    raw.extend_from_slice(payload);
    let checksum = CHECKSUM.checksum(&raw);
    raw.extend_from_slice(&checksum.to_le_bytes());
    BASE32_NOPAD.encode(&raw)
}

fn decode_strkey(version: u8, value: &str) -> Result<[u8; STRKEY_PAYLOAD_LEN], KeyError> {
    let raw = BASE32_NOPAD
        .decode(value.as_bytes())
        .map_err(|_| KeyError::Encoding)?;
    if raw.len() != STRKEY_RAW_LEN {
        return Err(KeyError::Length(raw.len()));
    }
    if raw[0] != version {
        return Err(KeyError::Version {
            expected: version,
            found: raw[0],
        });
    }

    let (body, checksum) = raw.split_at(STRKEY_RAW_LEN - 2);
    let expected = CHECKSUM.checksum(body).to_le_bytes();
    if checksum != expected {
        return Err(KeyError::Checksum);
    }

    let mut payload = [0u8; STRKEY_PAYLOAD_LEN];
    payload.copy_from_slice(&body[1..]);
    Ok(payload)
}
