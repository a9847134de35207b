//! Collections of signers that sign the same message together.
use {
    crate::{Signer, SignerError},
    wallet_address::Address,
    wallet_signature::Signature,
};

/// Convenience trait for working with mixed collections of `Signer`s
pub trait Signers {
    fn pubkeys(&self) -> Vec<Address>;
    fn try_pubkeys(&self) -> Result<Vec<Address>, SignerError>;
    fn sign_message(&self, message: &[u8]) -> Vec<Signature>;
    fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError>;
    fn is_interactive(&self) -> bool;
}

macro_rules! default_keypairs_impl {
    () => {
        fn pubkeys(&self) -> Vec<Address> {
            self.iter().map(|keypair| keypair.pubkey()).collect()
        }

        fn try_pubkeys(&self) -> Result<Vec<Address>, SignerError> {
            self.iter().map(|keypair| keypair.try_pubkey()).collect()
        }

        fn sign_message(&self, message: &[u8]) -> Vec<Signature> {
            self.iter()
                .map(|keypair| keypair.sign_message(message))
                .collect()
        }

        fn try_sign_message(&self, message: &[u8]) -> Result<Vec<Signature>, SignerError> {
            self.iter()
                .map(|keypair| keypair.try_sign_message(message))
                .collect()
        }

        fn is_interactive(&self) -> bool {
            self.iter().any(|s| s.is_interactive())
        }
    };
}

impl<T: Signer> Signers for [&T] {
    default_keypairs_impl!();
}

impl<T: Signer, const N: usize> Signers for [&T; N] {
    default_keypairs_impl!();
}

impl<T: Signer> Signers for Vec<&T> {
    default_keypairs_impl!();
}

impl Signers for [&dyn Signer] {
    default_keypairs_impl!();
}

impl<const N: usize> Signers for [&dyn Signer; N] {
    default_keypairs_impl!();
}

impl Signers for Vec<&dyn Signer> {
    default_keypairs_impl!();
}

impl Signers for [Box<dyn Signer>] {
    default_keypairs_impl!();
}

impl Signers for Vec<Box<dyn Signer>> {
    default_keypairs_impl!();
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{Keypair, Presigner},
    };

    fn foo(_s: &impl Signers) {}

    #[test]
    fn test_dyn_keypairs_compile() {
        let xs: Vec<Box<dyn Signer>> = vec![Box::new(Keypair::new()), Box::new(Keypair::new())];
        foo(&xs);

        let one = Keypair::new();
        foo(&[&one]);
        foo(&vec![&one]);

        let two = Keypair::new();
        let dyns: [&dyn Signer; 2] = [&one, &two];
        foo(&dyns);
    }

    #[test]
    fn test_sign_in_order() {
        let alice = Keypair::from_seed(&[1; 32]);
        let bob = Keypair::from_seed(&[2; 32]);
        let signers = [&alice, &bob];
        assert_eq!(signers.pubkeys(), vec![alice.pubkey(), bob.pubkey()]);
        assert_eq!(signers.try_pubkeys().unwrap(), signers.pubkeys());

        let signatures = signers.try_sign_message(b"message").unwrap();
        assert_eq!(
            signatures,
            vec![alice.sign_message(b"message"), bob.sign_message(b"message")]
        );
        assert_eq!(signers.sign_message(b"message"), signatures);
        assert!(!signers.is_interactive());
    }

    #[test]
    fn test_first_failure_is_reported() {
        let keypair = Keypair::new();
        let stale = Presigner::new(&keypair.pubkey(), &keypair.sign_message(b"old"));
        let signers: [&dyn Signer; 2] = [&keypair, &stale];
        assert_eq!(
            signers.try_sign_message(b"new"),
            Err(SignerError::PresignerError(
                crate::PresignerError::VerificationFailure
            ))
        );
    }
}
