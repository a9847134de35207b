use {
    crate::{Signer, SignerError},
    wallet_address::Address,
    wallet_signature::Signature,
};

/// A `Signer` implementation that represents a `Signature` that has been
/// constructed externally. Performs a signature verification against the
/// expected message upon `sign()` requests to affirm its relationship to
/// the `message` bytes
#[derive(Clone, Debug, Default)]
pub struct Presigner {
    pubkey: Address,
    signature: Signature,
}

impl Presigner {
    pub fn new(pubkey: &Address, signature: &Signature) -> Self {
        Self {
            pubkey: *pubkey,
            signature: *signature,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum PresignerError {
    #[error("pre-generated signature cannot verify data")]
    VerificationFailure,
}

impl Signer for Presigner {
    fn try_pubkey(&self) -> Result<Address, SignerError> {
        Ok(self.pubkey)
    }

    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError> {
        if self.signature.verify(self.pubkey.as_ref(), message) {
            Ok(self.signature)
        } else {
            Err(PresignerError::VerificationFailure.into())
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

impl<T> PartialEq<T> for Presigner
where
    T: Signer,
{
    fn eq(&self, other: &T) -> bool {
        self.pubkey() == other.pubkey()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::Keypair};

    #[test]
    fn test_presigner() {
        let keypair = Keypair::from_seed(&[0u8; 32]);
        let pubkey = keypair.pubkey();
        let data = [1u8];
        let sig = keypair.sign_message(&data);

        // Signer
        let presigner = Presigner::new(&pubkey, &sig);
        assert_eq!(presigner.try_pubkey().unwrap(), pubkey);
        assert_eq!(presigner.pubkey(), pubkey);
        assert_eq!(presigner.try_sign_message(&data).unwrap(), sig);
        assert_eq!(presigner.sign_message(&data), sig);
        let data = [0u8];
        assert!(presigner.try_sign_message(&data).is_err());
        assert_eq!(presigner.sign_message(&data), Signature::default());

        // PartialEq
        let keypair = Keypair::from_seed(&[1u8; 32]);
        let pubkey = keypair.pubkey();
        let presigner = Presigner::new(&pubkey, &sig);
        assert!(presigner == keypair);
        assert!(presigner != Keypair::from_seed(&[2u8; 32]));
    }
}
