//! Local key wallet

use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};
use primitive_types::H256;
use rand::rngs::OsRng;
use vela_abi::{keccak256, Address};
use zeroize::Zeroize;

use crate::SdkError;

/// Recoverable secp256k1 signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component
    pub r: [u8; 32],
    /// s component (always low-s)
    pub s: [u8; 32],
    /// Recovery id (0 or 1)
    pub recovery_id: u8,
}

/// Wallet holding one private key. Not `Clone`.
pub struct Wallet {
    private_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Create a new random wallet
    pub fn new_random() -> Self {
        let private_key = SigningKey::random(&mut OsRng);
        let address = public_key_to_address(private_key.verifying_key());
        Self {
            private_key,
            address,
        }
    }

    /// Create a wallet from a 32-byte private key
    pub fn from_private_key(key: &[u8; 32]) -> Result<Self, SdkError> {
        let private_key = SigningKey::from_slice(key)
            .map_err(|e| SdkError::InvalidPrivateKey(e.to_string()))?;
        let address = public_key_to_address(private_key.verifying_key());
        Ok(Self {
            private_key,
            address,
        })
    }

    /// Create a wallet from a hex-encoded private key
    ///
    /// Accepts both with and without "0x" prefix.
    pub fn from_private_key_hex(hex: &str) -> Result<Self, SdkError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut bytes =
            hex::decode(hex).map_err(|e| SdkError::InvalidPrivateKey(e.to_string()))?;
        if bytes.len() != 32 {
            bytes.zeroize();
            return Err(SdkError::InvalidPrivateKey(format!(
                "Expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();

        let result = Self::from_private_key(&key);
        key.zeroize();
        result
    }

    /// Get the wallet's address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest
    pub fn sign_hash(&self, hash: &H256) -> Result<Signature, SdkError> {
        let (signature, mut recovery_id) = self
            .private_key
            .sign_prehash_recoverable(hash.as_bytes())
            .map_err(|e| SdkError::SigningFailed(e.to_string()))?;

        let signature = match signature.normalize_s() {
            Some(normalized) => {
                recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
                normalized
            }
            None => signature,
        };

        Ok(Signature {
            r: signature.r().to_bytes().into(),
            s: signature.s().to_bytes().into(),
            recovery_id: recovery_id.to_byte(),
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn public_key_to_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::hex_address;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_hex() {
        let wallet = Wallet::from_private_key_hex(TEST_KEY).unwrap();
        assert_eq!(
            hex_address(&wallet.address()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_from_hex_no_prefix() {
        let wallet = Wallet::from_private_key_hex(&TEST_KEY[2..]).unwrap();
        assert_eq!(
            hex_address(&wallet.address()),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_wallet_invalid_hex_length() {
        assert!(matches!(
            Wallet::from_private_key_hex("0x1234"),
            Err(SdkError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_sign_hash_low_s_and_recoverable() {
        let wallet = Wallet::new_random();
        let hash = H256::repeat_byte(0x42);
        let signature = wallet.sign_hash(&hash).unwrap();
        assert!(signature.recovery_id <= 1);

        let sig = k256::ecdsa::Signature::from_scalars(signature.r, signature.s).unwrap();
        assert!(sig.normalize_s().is_none());

        let recid = RecoveryId::from_byte(signature.recovery_id).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(hash.as_bytes(), &sig, recid).unwrap();
        assert_eq!(public_key_to_address(&recovered), wallet.address());
    }

    #[test]
    fn test_wallet_debug_hides_key() {
        let wallet = Wallet::new_random();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("address"));
        assert!(!debug.contains("private_key"));
    }
}
