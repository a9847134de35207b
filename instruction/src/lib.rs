#![cfg_attr(docsrs, feature(doc_cfg))]
//! Program instructions.
//!
//! An [`Instruction`] names the program to run, the accounts it touches and
//! an opaque data payload. Message compilation only looks at the program id
//! and the account references; the data is carried through untouched.
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use wallet_address::Address;

pub mod system;

/// Describes a single account read or written by a program during
/// instruction execution.
///
/// When constructing an [`Instruction`], a list of all accounts that may be
/// read or written during the execution of that instruction must be supplied.
/// Any account that may be mutated by the program during execution, either
/// its data or metadata such as held lamports, must be writable.
///
/// Note that because the compiler merges duplicate references by OR-ing their
/// flags, listing an account once as readonly and once as writable makes it
/// writable for the whole message.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct AccountMeta {
    /// An account's public key.
    pub pubkey: Address,
    /// True if an `Instruction` requires a `Transaction` signature matching `pubkey`.
    pub is_signer: bool,
    /// True if the account data or metadata may be mutated during program execution.
    pub is_writable: bool,
}

impl AccountMeta {
    /// Construct metadata for a writable account.
    pub fn new(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// Construct metadata for a read-only account.
    pub fn new_readonly(pubkey: Address, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A directive for a single invocation of a program.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Instruction {
    /// Address of the program that executes this instruction.
    pub program_id: Address,
    /// Metadata describing accounts that should be passed to the program.
    pub accounts: Vec<AccountMeta>,
    /// Opaque data passed to the program for its own interpretation.
    pub data: Vec<u8>,
}

impl Instruction {
    /// Create a new instruction from a byte slice.
    pub fn new_with_bytes(program_id: Address, data: &[u8], accounts: Vec<AccountMeta>) -> Self {
        Self {
            program_id,
            accounts,
            data: data.to_vec(),
        }
    }

    /// Create a new instruction from a value, encoded with [`bincode`].
    ///
    /// # Panics
    ///
    /// Panics if `data` cannot be encoded, which for plain data types does
    /// not happen.
    #[cfg(feature = "bincode")]
    pub fn new_with_bincode<T: serde::Serialize>(
        program_id: Address,
        data: &T,
        accounts: Vec<AccountMeta>,
    ) -> Self {
        let data = bincode::serialize(data).unwrap();
        Self {
            program_id,
            accounts,
            data,
        }
    }

    /// Iterates over every key referenced by this instruction, program id
    /// first.
    pub fn keys(&self) -> impl Iterator<Item = &Address> {
        core::iter::once(&self.program_id).chain(self.accounts.iter().map(|meta| &meta.pubkey))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_meta_constructors() {
        let key = Address::new_unique();
        let meta = AccountMeta::new(key, true);
        assert!(meta.is_signer && meta.is_writable);
        let meta = AccountMeta::new_readonly(key, false);
        assert!(!meta.is_signer && !meta.is_writable);
    }

    #[test]
    fn test_new_with_bincode() {
        let program_id = Address::new_unique();
        let instruction = Instruction::new_with_bincode(program_id, &(2u32, 7u64), vec![]);
        assert_eq!(instruction.data, vec![2, 0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            instruction,
            Instruction::new_with_bytes(program_id, &instruction.data, vec![])
        );
    }

    #[test]
    fn test_keys() {
        let program_id = Address::new_unique();
        let a = Address::new_unique();
        let b = Address::new_unique();
        let instruction = Instruction::new_with_bytes(
            program_id,
            &[],
            vec![AccountMeta::new(a, true), AccountMeta::new_readonly(b, false)],
        );
        let keys: Vec<_> = instruction.keys().copied().collect();
        assert_eq!(keys, vec![program_id, a, b]);
    }
}
