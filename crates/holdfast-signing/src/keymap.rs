use std::collections::BTreeMap;

use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::Signing;
use bitcoin::{NetworkKind, PrivateKey, XOnlyPublicKey};

use crate::SigningError;

/// The keys one signer holds, indexed by x-only public key so PSBT
/// `tap_key_origins` entries can be matched directly.
#[derive(Debug, Clone)]
pub struct SigningKeyMap(BTreeMap<XOnlyPublicKey, PrivateKey>);

impl SigningKeyMap {
    /// Build a single-key map from raw secret bytes.
    pub fn from_privkey_slice<C: Signing>(
        secp: &Secp256k1<C>,
        privkey: &[u8],
        network: NetworkKind,
    ) -> Result<Self, SigningError> {
        let privkey = PrivateKey::from_slice(privkey, network)
            .map_err(|err| SigningError::InvalidPrivateKey(err.to_string()))?;
        let x_only = privkey.public_key(secp).into();
        Ok(Self(BTreeMap::from([(x_only, privkey)])))
    }

    pub fn privkey_for(&self, key: &XOnlyPublicKey) -> Option<&PrivateKey> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &XOnlyPublicKey> {
        self.0.keys()
    }
}

/// Map the wire network byte onto [`NetworkKind`]: `0` mainnet, `1`
/// testnet, anything else invalid.
pub fn network_kind_from_byte(byte: u8) -> Result<NetworkKind, SigningError> {
    match byte {
        0 => Ok(NetworkKind::Main),
        1 => Ok(NetworkKind::Test),
        other => Err(SigningError::InvalidNetwork(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_secret_bytes() {
        let secp = Secp256k1::new();
        let map =
            SigningKeyMap::from_privkey_slice(&secp, &[7u8; 32], NetworkKind::Test).unwrap();
        let key = *map.keys().next().unwrap();
        assert!(map.privkey_for(&key).is_some());
    }

    #[test]
    fn rejects_invalid_secret() {
        let secp = Secp256k1::new();
        assert!(matches!(
            SigningKeyMap::from_privkey_slice(&secp, &[0u8; 32], NetworkKind::Test),
            Err(SigningError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            SigningKeyMap::from_privkey_slice(&secp, &[1u8; 31], NetworkKind::Test),
            Err(SigningError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn network_byte_mapping() {
        assert_eq!(network_kind_from_byte(0).unwrap(), NetworkKind::Main);
        assert_eq!(network_kind_from_byte(1).unwrap(), NetworkKind::Test);
        assert!(matches!(
            network_kind_from_byte(2),
            Err(SigningError::InvalidNetwork(2))
        ));
    }
}
