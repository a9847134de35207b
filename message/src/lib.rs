#![cfg_attr(docsrs, feature(doc_cfg))]
//! Sequences of [`Instruction`]s executed within a single transaction.
//!
//! A message is the compact encoding of a transaction that gets signed. It
//! contains a flat array of all accounts accessed by all instructions in the
//! message, a [`MessageHeader`] that describes the layout of that account
//! array, a recent blockhash, and the message's instructions compiled to
//! indexes into the account array.
//!
//! Two message formats exist. [`legacy::Message`] carries every account key
//! inline. [`v0::Message`] may additionally reference keys stored in on-chain
//! address lookup tables, which lets a transaction name more accounts than
//! fit inline. [`VersionedMessage`] is a closed sum over both, discriminated
//! on the wire by the first byte.
//!
//! Message compilation is deterministic: given the same payer, instructions
//! and lookup tables, the produced bytes are identical on every platform.
//! Account order follows first insertion, never hash order.
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    std::collections::HashSet,
    wallet_address::ids::bpf_loader_upgradeable,
    wallet_serialize_utils::{Cursor, DecodeError, WireDecode, WireEncode},
};

mod account_keys;
pub mod compiled_instruction;
pub mod compiled_keys;
mod error;
pub mod legacy;
mod versions;

pub use {
    account_keys::MessageAccountKeys,
    compiled_instruction::CompiledInstruction,
    compiled_keys::CompiledKeys,
    error::{AccountKeysError, CompileError, SanitizeError},
    legacy::Message,
    versions::*,
    wallet_address::Address,
    wallet_hash::Hash,
    wallet_instruction::{AccountMeta, Instruction},
};

/// The length of a message header in bytes.
pub const MESSAGE_HEADER_LENGTH: usize = 3;

/// Bit mask that indicates whether a serialized message is versioned.
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;

/// Largest number of account keys a compiled message may reference, since
/// every reference is a single byte.
pub const MAX_ACCOUNT_KEYS: usize = u8::MAX as usize;

/// Counts that partition a message's account keys by permission.
///
/// A compiled message keeps one flat key list shared by all of its
/// instructions, and each [`CompiledInstruction`] refers to keys by position.
/// The list is laid out in four runs:
///
/// 1. writable signers
/// 2. read-only signers
/// 3. writable non-signers
/// 4. read-only non-signers
///
/// so three counts are enough to recover every key's signer and writable
/// flags.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct MessageHeader {
    /// Length of the signer prefix of the key list; also the number of
    /// signature slots a transaction carrying this message has.
    pub num_required_signatures: u8,

    /// How many keys at the end of the signer prefix are read-only.
    pub num_readonly_signed_accounts: u8,

    /// How many keys at the end of the whole list are read-only.
    pub num_readonly_unsigned_accounts: u8,
}

impl WireEncode for MessageHeader {
    fn wire_size(&self) -> usize {
        MESSAGE_HEADER_LENGTH
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&[
            self.num_required_signatures,
            self.num_readonly_signed_accounts,
            self.num_readonly_unsigned_accounts,
        ]);
    }
}

impl WireDecode for MessageHeader {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let [num_required_signatures, num_readonly_signed_accounts, num_readonly_unsigned_accounts] =
            cursor.read_array::<MESSAGE_HEADER_LENGTH>()?;
        Ok(Self {
            num_required_signatures,
            num_readonly_signed_accounts,
            num_readonly_unsigned_accounts,
        })
    }
}

/// The contents of an address lookup table account, as fetched by the caller.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct AddressLookupTableAccount {
    pub key: Address,
    pub addresses: Vec<Address>,
    /// Slot at which the table was deactivated, `u64::MAX` while active.
    pub deactivation_slot: u64,
}

impl AddressLookupTableAccount {
    /// An active table.
    pub fn new(key: Address, addresses: Vec<Address>) -> Self {
        Self {
            key,
            addresses,
            deactivation_slot: u64::MAX,
        }
    }

    /// Returns true if the table has not been deactivated as of
    /// `current_slot`.
    pub fn is_active(&self, current_slot: u64) -> bool {
        self.deactivation_slot == u64::MAX || current_slot < self.deactivation_slot
    }
}

/// Returns true if the account at the specified index was requested to be
/// writable, judging only by the header partition.
#[inline(always)]
fn is_writable_index(i: usize, header: MessageHeader, account_keys: &[Address]) -> bool {
    i < usize::from(header.num_required_signatures)
        .saturating_sub(usize::from(header.num_readonly_signed_accounts))
        || (i >= usize::from(header.num_required_signatures)
            && i < account_keys
                .len()
                .saturating_sub(usize::from(header.num_readonly_unsigned_accounts)))
}

/// Returns true if the account at the specified index is in the optional
/// reserved account keys set.
#[inline(always)]
fn is_account_maybe_reserved(
    i: usize,
    account_keys: &[Address],
    reserved_account_keys: Option<&HashSet<Address>>,
) -> bool {
    match (reserved_account_keys, account_keys.get(i)) {
        (Some(reserved_account_keys), Some(key)) => reserved_account_keys.contains(key),
        _ => false,
    }
}

#[inline(always)]
fn is_key_called_as_program(instructions: &[CompiledInstruction], key_index: usize) -> bool {
    u8::try_from(key_index).is_ok_and(|key_index| {
        instructions
            .iter()
            .any(|ix| ix.program_id_index == key_index)
    })
}

/// Returns `true` if any account is the upgradeable loader.
#[inline(always)]
fn is_upgradeable_loader_present(account_keys: &[Address]) -> bool {
    account_keys
        .iter()
        .any(|key| bpf_loader_upgradeable::check_id(key))
}

/// Returns true if the account at the specified index is writable by the
/// instructions in this message. Invoked programs are demoted to read-only
/// unless the upgradeable loader is present. The `reserved_account_keys`
/// param is optional so that clients can approximate writability without
/// fetching the latest set of reserved account keys.
#[inline(always)]
fn is_maybe_writable(
    i: usize,
    header: MessageHeader,
    account_keys: &[Address],
    instructions: &[CompiledInstruction],
    reserved_account_keys: Option<&HashSet<Address>>,
) -> bool {
    is_writable_index(i, header, account_keys)
        && !is_account_maybe_reserved(i, account_keys, reserved_account_keys)
        && !(is_key_called_as_program(instructions, i)
            && !is_upgradeable_loader_present(account_keys))
}

/// Checks the invariants shared by both message formats, given the number of
/// keys instructions may address.
fn sanitize_instructions(
    header: &MessageHeader,
    num_static_keys: usize,
    num_loaded_keys: usize,
    instructions: &[CompiledInstruction],
) -> Result<(), SanitizeError> {
    // signing area and read-only non-signing area should not overlap
    if usize::from(header.num_required_signatures)
        .saturating_add(usize::from(header.num_readonly_unsigned_accounts))
        > num_static_keys
    {
        return Err(SanitizeError::IndexOutOfBounds);
    }

    // there should be at least 1 RW fee-payer account.
    if header.num_readonly_signed_accounts >= header.num_required_signatures {
        return Err(SanitizeError::InvalidValue);
    }

    for ci in instructions {
        if usize::from(ci.program_id_index) >= num_loaded_keys {
            return Err(SanitizeError::IndexOutOfBounds);
        }
        // A program cannot be a payer.
        if ci.program_id_index == 0 {
            return Err(SanitizeError::IndexOutOfBounds);
        }
        if ci
            .accounts
            .iter()
            .any(|ai| usize::from(*ai) >= num_loaded_keys)
        {
            return Err(SanitizeError::IndexOutOfBounds);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_wire_layout() {
        let header = MessageHeader {
            num_required_signatures: 3,
            num_readonly_signed_accounts: 1,
            num_readonly_unsigned_accounts: 2,
        };
        assert_eq!(header.to_wire_bytes(), vec![3, 1, 2]);
        assert_eq!(bincode::serialize(&header).unwrap(), vec![3, 1, 2]);
        assert_eq!(MessageHeader::from_wire_bytes(&[3, 1, 2]), Ok(header));
        assert_eq!(
            MessageHeader::from_wire_bytes(&[3, 1]),
            Err(DecodeError::UnexpectedEnd(2))
        );
    }

    #[test]
    fn test_is_writable_index() {
        let keys = vec![Address::new_unique(); 5];
        let header = MessageHeader {
            num_required_signatures: 3,
            num_readonly_signed_accounts: 1,
            num_readonly_unsigned_accounts: 1,
        };
        let writable: Vec<_> = (0..5)
            .map(|i| is_writable_index(i, header, &keys))
            .collect();
        assert_eq!(writable, vec![true, true, false, true, false]);
    }

    #[test]
    fn test_is_account_maybe_reserved() {
        let key0 = Address::new_unique();
        let key1 = Address::new_unique();
        let account_keys = vec![key0, key1];
        let reserved_account_keys = HashSet::from([key1]);

        assert!(!is_account_maybe_reserved(
            0,
            &account_keys,
            Some(&reserved_account_keys)
        ));
        assert!(is_account_maybe_reserved(
            1,
            &account_keys,
            Some(&reserved_account_keys)
        ));
        assert!(!is_account_maybe_reserved(
            2,
            &account_keys,
            Some(&reserved_account_keys)
        ));
        assert!(!is_account_maybe_reserved(1, &account_keys, None));
    }

    #[test]
    fn test_lookup_table_activity() {
        let mut table = AddressLookupTableAccount::new(Address::new_unique(), vec![]);
        assert!(table.is_active(u64::MAX - 1));
        table.deactivation_slot = 100;
        assert!(table.is_active(99));
        assert!(!table.is_active(100));
    }
}
