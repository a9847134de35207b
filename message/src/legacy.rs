//! The original message format, which carries every account key inline.
//!
//! A legacy message has no version prefix: its first byte is the header's
//! `num_required_signatures`, which is always below
//! [`MESSAGE_VERSION_PREFIX`](crate::MESSAGE_VERSION_PREFIX).
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    crate::{
        compiled_instruction::CompiledInstruction, compiled_keys::CompiledKeys,
        is_key_called_as_program, is_maybe_writable, is_writable_index, sanitize_instructions,
        CompileError, MessageAccountKeys, MessageHeader, SanitizeError, MESSAGE_VERSION_PREFIX,
    },
    log::debug,
    std::collections::HashSet,
    wallet_address::Address,
    wallet_hash::Hash,
    wallet_instruction::Instruction,
    wallet_serialize_utils::{
        read_short_vec, short_vec_size, write_short_vec, Cursor, DecodeError, WireDecode,
        WireEncode,
    },
};

/// A legacy transaction message.
///
/// Every account a transaction touches is listed in `account_keys`, ordered
/// as described by [`MessageHeader`]. The first key is always the fee payer.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Message {
    /// The message header, identifying signed and read-only `account_keys`.
    pub header: MessageHeader,

    /// All the account keys used by this transaction.
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub account_keys: Vec<Address>,

    /// The id of a recent ledger entry.
    pub recent_blockhash: Hash,

    /// Programs that will be executed in sequence and committed in one atomic transaction if all
    /// succeed.
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compiles `instructions` into a message paid for by `payer`.
    ///
    /// Keys keep the order in which they are first referenced within each of
    /// the four header buckets, with the payer first.
    pub fn try_compile(
        payer: &Address,
        instructions: &[Instruction],
        recent_blockhash: Hash,
    ) -> Result<Self, CompileError> {
        let compiled_keys = CompiledKeys::compile(instructions, *payer);
        let (header, account_keys) = compiled_keys.try_into_message_components()?;
        debug!(
            "compiled legacy message: {} keys, header {:?}",
            account_keys.len(),
            header
        );
        let account_keys = MessageAccountKeys::new(account_keys, None);
        let instructions = account_keys.try_compile_instructions(instructions)?;
        Ok(Self {
            header,
            account_keys: account_keys.static_account_keys().to_vec(),
            recent_blockhash,
            instructions,
        })
    }

    pub fn new_with_compiled_instructions(
        num_required_signatures: u8,
        num_readonly_signed_accounts: u8,
        num_readonly_unsigned_accounts: u8,
        account_keys: Vec<Address>,
        recent_blockhash: Hash,
        instructions: Vec<CompiledInstruction>,
    ) -> Self {
        Self {
            header: MessageHeader {
                num_required_signatures,
                num_readonly_signed_accounts,
                num_readonly_unsigned_accounts,
            },
            account_keys,
            recent_blockhash,
            instructions,
        }
    }

    /// Serializes the message with the wire codec.
    pub fn serialize(&self) -> Vec<u8> {
        self.to_wire_bytes()
    }

    pub fn serialized_size(&self) -> usize {
        self.wire_size()
    }

    pub fn sanitize(&self) -> Result<(), SanitizeError> {
        sanitize_instructions(
            &self.header,
            self.account_keys.len(),
            self.account_keys.len(),
            &self.instructions,
        )
    }

    /// The legacy key space is exactly the inline keys.
    pub fn get_account_keys(&self) -> MessageAccountKeys {
        MessageAccountKeys::new(self.account_keys.clone(), None)
    }

    pub fn fee_payer(&self) -> Option<&Address> {
        self.account_keys.first()
    }

    pub fn program_id(&self, instruction_index: usize) -> Option<&Address> {
        self.instructions
            .get(instruction_index)
            .and_then(|ix| ix.program_id(&self.account_keys))
    }

    pub fn program_index(&self, instruction_index: usize) -> Option<usize> {
        self.instructions
            .get(instruction_index)
            .map(|ix| usize::from(ix.program_id_index))
    }

    /// Distinct program ids, in order of first invocation.
    pub fn program_ids(&self) -> Vec<&Address> {
        let mut program_ids = Vec::new();
        for ix in &self.instructions {
            if let Some(program_id) = ix.program_id(&self.account_keys) {
                if !program_ids.contains(&program_id) {
                    program_ids.push(program_id);
                }
            }
        }
        program_ids
    }

    /// Returns true if the account at `index` must sign this message.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid position in `account_keys`.
    pub fn is_account_signer(&self, index: usize) -> bool {
        let num_keys = self.account_keys.len();
        assert!(
            index < num_keys,
            "account index {index} out of range for {num_keys} keys"
        );
        self.is_signer(index)
    }

    /// Returns true if the account at `index` was requested to be writable.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a valid position in `account_keys`.
    pub fn is_account_writable(&self, index: usize) -> bool {
        let num_keys = self.account_keys.len();
        assert!(
            index < num_keys,
            "account index {index} out of range for {num_keys} keys"
        );
        is_writable_index(index, self.header, &self.account_keys)
    }

    /// Returns true if the account at the specified index is an account input
    /// to some program instruction in this message.
    pub fn is_instruction_account(&self, key_index: usize) -> bool {
        u8::try_from(key_index).is_ok_and(|key_index| {
            self.instructions
                .iter()
                .any(|ix| ix.accounts.contains(&key_index))
        })
    }

    pub fn is_key_called_as_program(&self, key_index: usize) -> bool {
        is_key_called_as_program(&self.instructions, key_index)
    }

    /// Returns true if the account at the specified index is writable by the
    /// instructions in this message. The `reserved_account_keys` param has been
    /// optional to allow clients to approximate writability without requiring
    /// fetching the latest set of reserved account keys.
    pub fn is_maybe_writable(
        &self,
        i: usize,
        reserved_account_keys: Option<&HashSet<Address>>,
    ) -> bool {
        is_maybe_writable(
            i,
            self.header,
            &self.account_keys,
            &self.instructions,
            reserved_account_keys,
        )
    }

    pub fn is_signer(&self, i: usize) -> bool {
        i < usize::from(self.header.num_required_signatures)
    }

    /// The keys that must sign, in signature order.
    pub fn signer_keys(&self) -> Vec<&Address> {
        // Clamp in case we're working on un-`sanitize()`ed input
        let last_key = self
            .account_keys
            .len()
            .min(usize::from(self.header.num_required_signatures));
        self.account_keys[..last_key].iter().collect()
    }

    /// Returns `true` if `account_keys` has any duplicate keys.
    pub fn has_duplicates(&self) -> bool {
        // Note: This is an O(n^2) algorithm, but requires no heap allocations. The benchmark
        // `bench_has_duplicates` in benches/message_processor.rs shows that this implementation is
        // ~50 times faster than using HashSet for very short slices.
        for i in 1..self.account_keys.len() {
            if self.account_keys[i..].contains(&self.account_keys[i.saturating_sub(1)]) {
                return true;
            }
        }
        false
    }
}

impl WireEncode for Message {
    fn wire_size(&self) -> usize {
        self.header
            .wire_size()
            .saturating_add(short_vec_size(&self.account_keys))
            .saturating_add(self.recent_blockhash.wire_size())
            .saturating_add(short_vec_size(&self.instructions))
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        self.header.write_to(buf);
        write_short_vec(&self.account_keys, buf);
        self.recent_blockhash.write_to(buf);
        write_short_vec(&self.instructions, buf);
    }
}

impl WireDecode for Message {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        if cursor
            .peek_u8()
            .is_some_and(|byte| byte & MESSAGE_VERSION_PREFIX != 0)
        {
            return Err(DecodeError::UnexpectedVersionedMessage);
        }
        Ok(Self {
            header: MessageHeader::read_from(cursor)?,
            account_keys: read_short_vec(cursor)?,
            recent_blockhash: Hash::read_from(cursor)?,
            instructions: read_short_vec(cursor)?,
        })
    }
}
