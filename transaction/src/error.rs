use {
    wallet_address::Address,
    wallet_message::{CompileError, SanitizeError},
    wallet_serialize_utils::DecodeError,
    wallet_signer::SignerError,
};

/// Reasons a transaction could not be built, signed, verified or decoded.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum TransactionError {
    #[error("signature is not {} bytes", wallet_signature::SIGNATURE_BYTES)]
    InvalidSignature,

    #[error("expected {expected} signatures, got {actual}")]
    InvalidSignaturesCount { expected: usize, actual: usize },

    #[error("`{0}` is not a required signer of this message")]
    SignerIsNotRequired(Address),

    #[error("signature from `{0}` does not belong to any account of this message")]
    UnknownSigner(Address),

    #[error("no signers")]
    NoSigners,

    #[error("no instructions provided")]
    NoInstructions,

    #[error("transaction recent blockhash required")]
    RecentBlockhashRequired,

    #[error("transaction fee payer required")]
    FeePayerRequired,

    #[error("missing signature for `{0}`")]
    MissingSignature(Address),

    #[error("signature verification failed for `{0}`")]
    SignatureFailure(Address),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Signer(#[from] SignerError),
}

pub type TransactionResult<T> = Result<T, TransactionError>;
