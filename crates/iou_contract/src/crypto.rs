//! Keys, hashes and signatures used to identify parties and authorise transactions.
//!
//! Everything is encoded as base58 when displayed or serialized so values can
//! be copied between the HTTP API, config files and the vault unchanged.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid base58 encoding: {0}")]
    Encoding(String),

    #[error("expected {expected} bytes, received {found}")]
    Length { expected: usize, found: usize },

    #[error("bytes do not encode a valid {0}")]
    Invalid(&'static str),
}

impl From<bs58::decode::Error> for CryptoError {
    fn from(e: bs58::decode::Error) -> Self {
        CryptoError::Encoding(e.to_string())
    }
}

fn decode_exact<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = bs58::decode(s).into_vec()?;
    bytes.as_slice().try_into().map_err(|_| CryptoError::Length {
        expected: N,
        found: bytes.len(),
    })
}

macro_rules! base58_serde {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&bs58::encode(self.as_bytes()).into_string())
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecureHash([u8; 32]);

impl SecureHash {
    pub fn sha256(data: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(data));
        SecureHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for SecureHash {
    fn from(bytes: [u8; 32]) -> Self {
        SecureHash(bytes)
    }
}

impl FromStr for SecureHash {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SecureHash(decode_exact::<32>(s)?))
    }
}

base58_serde!(SecureHash);

/// Compressed secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; 33]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks `signature` was produced over `hash` by the private half of this key.
    pub fn verify(&self, hash: &SecureHash, signature: &DigitalSignature) -> bool {
        let Ok(key) = VerifyingKey::from_sec1_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&signature.0) else {
            return false;
        };
        key.verify(hash.as_bytes(), &signature).is_ok()
    }
}

impl From<&VerifyingKey> for PublicKey {
    fn from(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(point.as_bytes());
        PublicKey(bytes)
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_exact::<33>(s)?;
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::Invalid("public key"))?;
        Ok(PublicKey(bytes))
    }
}

base58_serde!(PublicKey);

/// 64 byte ECDSA signature in fixed (r, s) encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DigitalSignature([u8; 64]);

impl DigitalSignature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for DigitalSignature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DigitalSignature(decode_exact::<64>(s)?))
    }
}

base58_serde!(DigitalSignature);

/// Private signing key together with its public half.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self::from_signing_key(signing_key)
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| CryptoError::Invalid("secret key"))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public = PublicKey::from(signing_key.verifying_key());
        Self {
            signing_key,
            public,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn secret_bytes(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }

    pub fn sign(&self, hash: &SecureHash) -> DigitalSignature {
        let signature: Signature = self.signing_key.sign(hash.as_bytes());
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&signature.to_bytes());
        DigitalSignature(bytes)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
