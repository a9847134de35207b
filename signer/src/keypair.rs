use {
    crate::{Signer, SignerError},
    ed25519_dalek::{Signer as DalekSigner, SigningKey},
    wallet_address::Address,
    wallet_signature::Signature,
};

/// Number of bytes in an ed25519 seed (secret key).
pub const SEED_BYTES: usize = 32;
/// Number of bytes in a keypair: the seed followed by the public key.
pub const KEYPAIR_BYTES: usize = 64;

/// A vanilla Ed25519 key pair
#[derive(Debug)]
pub struct Keypair(SigningKey);

impl Keypair {
    /// Constructs a new, random `Keypair` using the thread-local RNG.
    pub fn new() -> Self {
        Self::from_seed(&rand::random::<[u8; SEED_BYTES]>())
    }

    /// Derives the keypair for a 32-byte seed.
    pub fn from_seed(seed: &[u8; SEED_BYTES]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// Recovers a `Keypair` from its 64-byte representation, rejecting
    /// bytes whose public half does not belong to the secret half.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        let bytes: &[u8; KEYPAIR_BYTES] = bytes.try_into().map_err(|_| {
            SignerError::InvalidInput(format!(
                "keypair must be {KEYPAIR_BYTES} bytes, got {}",
                bytes.len()
            ))
        })?;
        SigningKey::from_keypair_bytes(bytes)
            .map(Self)
            .map_err(|_| SignerError::KeypairPubkeyMismatch)
    }

    /// Returns this `Keypair` as a byte array
    pub fn to_bytes(&self) -> [u8; KEYPAIR_BYTES] {
        self.0.to_keypair_bytes()
    }

    /// Allows Keypair cloning
    ///
    /// Note that the `Clone` trait is intentionally unimplemented because making a
    /// second copy of sensitive secret keys in memory is usually a bad idea.
    pub fn insecure_clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Default for Keypair {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for Keypair {
    #[inline]
    fn pubkey(&self) -> Address {
        Address::new_from_array(self.0.verifying_key().to_bytes())
    }

    fn try_pubkey(&self) -> Result<Address, SignerError> {
        Ok(self.pubkey())
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::from(self.0.sign(message).to_bytes())
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        Ok(self.sign_message(message))
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

impl<T> PartialEq<T> for Keypair
where
    T: Signer,
{
    fn eq(&self, other: &T) -> bool {
        self.pubkey() == other.pubkey()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches};

    #[test]
    fn test_keypair_from_seed_is_deterministic() {
        let keypair = Keypair::from_seed(&[7; SEED_BYTES]);
        let again = Keypair::from_seed(&[7; SEED_BYTES]);
        assert_eq!(keypair.pubkey(), again.pubkey());
        assert!(keypair == again);
        assert_ne!(keypair.pubkey(), Keypair::from_seed(&[8; SEED_BYTES]).pubkey());
    }

    #[test]
    fn test_new_keypairs_differ() {
        assert_ne!(Keypair::new().pubkey(), Keypair::new().pubkey());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::new();
        let message = b"transfer";
        let signature = keypair.sign_message(message);
        assert_eq!(keypair.try_sign_message(message), Ok(signature));
        assert!(signature.verify(keypair.pubkey().as_ref(), message));
        assert!(!signature.verify(keypair.pubkey().as_ref(), b"other"));
        assert!(!keypair.is_interactive());
    }

    #[test]
    fn test_bytes_round_trip() {
        let keypair = Keypair::new();
        let bytes = keypair.to_bytes();
        assert_eq!(&bytes[SEED_BYTES..], keypair.pubkey().as_ref());
        let recovered = Keypair::try_from_bytes(&bytes).unwrap();
        assert_eq!(recovered.pubkey(), keypair.pubkey());
        assert_eq!(keypair.insecure_clone().pubkey(), keypair.pubkey());

        let mut mismatched = bytes;
        mismatched[SEED_BYTES..].copy_from_slice(Keypair::new().pubkey().as_ref());
        assert_eq!(
            Keypair::try_from_bytes(&mismatched).unwrap_err(),
            SignerError::KeypairPubkeyMismatch
        );
        assert_matches!(
            Keypair::try_from_bytes(&bytes[..SEED_BYTES]),
            Err(SignerError::InvalidInput(_))
        );
    }
}
