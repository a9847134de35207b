use {crate::MAX_ACCOUNT_KEYS, wallet_address::Address};

/// Failures while turning instructions into a message.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum CompileError {
    #[error("expected at least one writable signer key")]
    ExpectedAtLeastOneWritableSignerKey,
    #[error("expected the first writable signer key to be the payer")]
    ExpectedFirstWritableSignerKeyToBePayer,
    #[error("number of static account keys exceeds {MAX_ACCOUNT_KEYS}")]
    MaxStaticAccountKeysLengthExceeded,
    #[error("account index overflowed during compilation")]
    AccountIndexOverflow,
    #[error("address lookup table index overflowed during compilation")]
    MaxLookupTableIndexExceeded,
    #[error("encountered unknown account key `{0}` during instruction compilation")]
    UnknownInstructionAccountKey(Address),
}

/// Failures while assembling the full key space of a message that uses
/// address lookup tables.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone)]
pub enum AccountKeysError {
    #[error("expected {expected} account keys from lookups, got {actual}")]
    MismatchInNumberOfAccountKeysFromLookups { expected: usize, actual: usize },
    #[error("message uses address table lookups that were not resolved")]
    AccountKeysAddressTableLookupsWereNotResolved,
    #[error("lookup table `{0}` was not supplied")]
    MissingTableKey(Address),
    #[error("lookup table `{table}` has no address at index {index}")]
    MissingAddress { table: Address, index: u8 },
}

/// Structural problems found in a decoded message.
#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum SanitizeError {
    #[error("index out of bounds")]
    IndexOutOfBounds,
    #[error("value out of bounds")]
    ValueOutOfBounds,
    #[error("invalid value")]
    InvalidValue,
}
