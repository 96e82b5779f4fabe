use crate::crypto::{KeyPair, PublicKey};
use crate::identity::Party;

pub fn key() -> PublicKey {
    KeyPair::generate().public_key()
}

pub fn party(name: &str) -> Party {
    Party::new(name, key())
}

pub fn party_with_key(name: &str, keys: &KeyPair) -> Party {
    Party::new(name, keys.public_key())
}
