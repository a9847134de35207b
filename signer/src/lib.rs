#![cfg_attr(docsrs, feature(doc_cfg))]
//! Abstractions for transaction signers.
//!
//! Signing itself is delegated: anything that can produce a 64-byte
//! signature over message bytes for a known [`Address`] implements
//! [`Signer`]. [`Keypair`] is the in-process ed25519 implementation and
//! [`Presigner`] wraps a signature produced elsewhere.
use {core::fmt, wallet_address::Address, wallet_signature::Signature};

mod keypair;
mod presigner;
pub mod signers;

pub use {
    keypair::Keypair,
    presigner::{Presigner, PresignerError},
    signers::Signers,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum SignerError {
    #[error("keypair-pubkey mismatch")]
    KeypairPubkeyMismatch,

    #[error("not enough signers")]
    NotEnoughSigners,

    #[error("custom error: {0}")]
    Custom(String),

    // Presigner-specific Errors
    #[error("presigner error")]
    PresignerError(#[from] PresignerError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("too many signers")]
    TooManySigners,
}

/// The `Signer` trait declares operations that all digital signature providers
/// must support. It is the primary interface by which signers are specified in
/// transaction builders.
pub trait Signer {
    /// Infallibly gets the implementor's public key. Returns the all-zeros
    /// `Address` if the implementor has none.
    fn pubkey(&self) -> Address {
        self.try_pubkey().unwrap_or_default()
    }
    /// Fallibly gets the implementor's public key
    fn try_pubkey(&self) -> Result<Address, SignerError>;
    /// Infallibly produces an Ed25519 signature over the provided `message`
    /// bytes. Returns the all-zeros `Signature` if signing is not possible.
    fn sign_message(&self, message: &[u8]) -> Signature {
        self.try_sign_message(message).unwrap_or_default()
    }
    /// Fallibly produces an Ed25519 signature over the provided `message` bytes.
    fn try_sign_message(&self, message: &[u8]) -> Result<Signature, SignerError>;
    /// Whether the implementation requires user interaction to sign
    fn is_interactive(&self) -> bool;
}

impl<T> From<T> for Box<dyn Signer>
where
    T: Signer + 'static,
{
    fn from(signer: T) -> Self {
        Box::new(signer)
    }
}

impl<'a> PartialEq for dyn Signer + 'a {
    fn eq(&self, other: &(dyn Signer + 'a)) -> bool {
        self.pubkey() == other.pubkey()
    }
}

impl<'a> Eq for dyn Signer + 'a {}

impl<'a> fmt::Debug for dyn Signer + 'a {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "Signer: {:?}", self.pubkey())
    }
}

/// Removes signers that repeat an earlier signer's public key, keeping the
/// first occurrence.
pub fn unique_signers(signers: Vec<&dyn Signer>) -> Vec<&dyn Signer> {
    let mut seen_pubkeys = Vec::with_capacity(signers.len());
    let mut unique = Vec::with_capacity(signers.len());
    for signer in signers {
        let pubkey = signer.pubkey();
        if !seen_pubkeys.contains(&pubkey) {
            seen_pubkeys.push(pubkey);
            unique.push(signer);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_signers() {
        let alice = Keypair::new();
        let bob = Keypair::new();
        assert_eq!(
            unique_signers(vec![&alice as &dyn Signer, &bob, &alice])
                .into_iter()
                .map(|signer| signer.pubkey())
                .collect::<Vec<_>>(),
            vec![alice.pubkey(), bob.pubkey()]
        );
    }

    #[test]
    fn test_dyn_signer_eq() {
        let keypair = Keypair::from_seed(&[3; 32]);
        let same = Keypair::from_seed(&[3; 32]);
        let other = Keypair::from_seed(&[4; 32]);
        let a: &dyn Signer = &keypair;
        let b: &dyn Signer = &same;
        let c: &dyn Signer = &other;
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(format!("{a:?}").starts_with("Signer: "));
    }
}
