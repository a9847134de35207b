//! A future message format.
//!
//! This message format supports succinct account loading with on-chain
//! address lookup tables: keys that neither sign nor are invoked as a program
//! can be referenced by their position in a lookup table instead of being
//! carried inline.
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    crate::{
        compiled_instruction::CompiledInstruction, compiled_keys::CompiledKeys,
        is_account_maybe_reserved, is_key_called_as_program, is_writable_index,
        sanitize_instructions, AccountKeysError, AddressLookupTableAccount, CompileError,
        MessageAccountKeys, MessageHeader, SanitizeError, MESSAGE_VERSION_PREFIX,
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

mod loaded;

pub use loaded::*;

/// Address table lookups describe an on-chain address lookup table to use
/// for loading more readonly and writable accounts in a single tx.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct MessageAddressTableLookup {
    /// Address lookup table account key
    pub account_key: Address,
    /// List of indexes used to load writable account addresses
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub writable_indexes: Vec<u8>,
    /// List of indexes used to load readonly account addresses
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub readonly_indexes: Vec<u8>,
}

impl WireEncode for MessageAddressTableLookup {
    fn wire_size(&self) -> usize {
        self.account_key
            .wire_size()
            .saturating_add(short_vec_size(&self.writable_indexes))
            .saturating_add(short_vec_size(&self.readonly_indexes))
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        self.account_key.write_to(buf);
        write_short_vec(&self.writable_indexes, buf);
        write_short_vec(&self.readonly_indexes, buf);
    }
}

impl WireDecode for MessageAddressTableLookup {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            account_key: Address::read_from(cursor)?,
            writable_indexes: read_short_vec(cursor)?,
            readonly_indexes: read_short_vec(cursor)?,
        })
    }
}

/// Where the keys loaded through a message's lookups come from when
/// assembling its full key space.
#[derive(Debug, Clone, Copy)]
pub enum AccountKeysSource<'a> {
    /// Nothing was supplied. Only valid for messages without lookups.
    Unresolved,
    /// Keys the caller already resolved, e.g. from transaction metadata.
    Resolved(&'a AccountKeysFromLookups),
    /// Lookup table contents to resolve the message's lookups against.
    LookupTables(&'a [AddressLookupTableAccount]),
}

/// A transaction message that can reference accounts through address lookup
/// tables.
///
/// On the wire this body follows the [`MESSAGE_VERSION_PREFIX`] byte with
/// version `0`; the prefix itself is written by
/// [`VersionedMessage`](crate::VersionedMessage) or [`Message::serialize`].
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase")
)]
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Message {
    /// The message header, identifying signed and read-only `account_keys`.
    /// Header values only describe static `account_keys`, they do not describe
    /// any additional account keys loaded via address table lookups.
    pub header: MessageHeader,

    /// List of accounts loaded by this transaction.
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub account_keys: Vec<Address>,

    /// The blockhash of a recent block.
    pub recent_blockhash: Hash,

    /// Instructions that invoke a designated program, are executed in sequence,
    /// and committed in one atomic transaction if all succeed.
    ///
    /// # Notes
    ///
    /// Program indexes must index into the list of message `account_keys` because
    /// program id's cannot be dynamically loaded from a lookup table.
    ///
    /// Account indexes must index into the list of addresses
    /// constructed from the concatenation of three key lists:
    ///   1) message `account_keys`
    ///   2) ordered list of keys loaded from `writable` lookup table indexes
    ///   3) ordered list of keys loaded from `readable` lookup table indexes
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub instructions: Vec<CompiledInstruction>,

    /// List of address table lookups used to load additional accounts
    /// for this transaction.
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

impl Message {
    /// Create a signable transaction message from a `payer` public key,
    /// `recent_blockhash`, list of `instructions`, and a list of
    /// `address_lookup_table_accounts`.
    ///
    /// Each table is consulted in the given order; a table that supplies none
    /// of the remaining eligible keys produces no lookup. Keys that sign, or
    /// that are invoked as programs, always stay static.
    ///
    /// # Examples
    ///
    /// ```
    /// # use wallet_message::{v0, AddressLookupTableAccount, AccountMeta, Address, Hash, Instruction};
    /// let payer = Address::new_unique();
    /// let program_id = Address::new_unique();
    /// let looked_up = Address::new_unique();
    /// let table = AddressLookupTableAccount::new(Address::new_unique(), vec![looked_up]);
    /// let instruction = Instruction::new_with_bytes(
    ///     program_id,
    ///     &[],
    ///     vec![AccountMeta::new(looked_up, false)],
    /// );
    ///
    /// let message =
    ///     v0::Message::try_compile(&payer, &[instruction], &[table], Hash::new_unique()).unwrap();
    /// assert_eq!(message.account_keys, vec![payer, program_id]);
    /// assert_eq!(message.address_table_lookups[0].writable_indexes, vec![0]);
    /// assert_eq!(message.instructions[0].accounts, vec![2]);
    /// ```
    pub fn try_compile(
        payer: &Address,
        instructions: &[Instruction],
        address_lookup_table_accounts: &[AddressLookupTableAccount],
        recent_blockhash: Hash,
    ) -> Result<Self, CompileError> {
        let mut compiled_keys = CompiledKeys::compile(instructions, *payer);

        let mut address_table_lookups = Vec::with_capacity(address_lookup_table_accounts.len());
        let mut loaded_addresses_list = Vec::with_capacity(address_lookup_table_accounts.len());
        for lookup_table_account in address_lookup_table_accounts {
            if let Some((lookup, loaded_addresses)) =
                compiled_keys.try_extract_table_lookup(lookup_table_account)?
            {
                address_table_lookups.push(lookup);
                loaded_addresses_list.push(loaded_addresses);
            }
        }

        let (header, static_keys) = compiled_keys.try_into_message_components()?;
        let keys_from_lookups = AccountKeysFromLookups::from_iter(loaded_addresses_list);
        debug!(
            "compiled v0 message: {} static keys, {} lookups loading {} keys, header {:?}",
            static_keys.len(),
            address_table_lookups.len(),
            keys_from_lookups.len(),
            header
        );
        let account_keys = MessageAccountKeys::new(static_keys, Some(keys_from_lookups));
        let instructions = account_keys.try_compile_instructions(instructions)?;

        Ok(Self {
            header,
            account_keys: account_keys.static_account_keys().to_vec(),
            recent_blockhash,
            instructions,
            address_table_lookups,
        })
    }

    /// Serialize this message with a version #0 prefix using the wire codec.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        buf.push(MESSAGE_VERSION_PREFIX);
        self.write_to(&mut buf);
        buf
    }

    /// Size of [`Message::serialize`], version prefix included.
    pub fn serialized_size(&self) -> usize {
        self.wire_size().saturating_add(1)
    }

    /// Sanitize message fields and compiled instruction indexes
    pub fn sanitize(&self) -> Result<(), SanitizeError> {
        let num_static_account_keys = self.account_keys.len();
        let mut num_loaded_accounts = num_static_account_keys;
        for lookup in &self.address_table_lookups {
            let num_table_loaded_accounts = lookup
                .writable_indexes
                .len()
                .saturating_add(lookup.readonly_indexes.len());

            // each lookup table must be used to load at least one account
            if num_table_loaded_accounts == 0 {
                return Err(SanitizeError::InvalidValue);
            }

            num_loaded_accounts = num_loaded_accounts.saturating_add(num_table_loaded_accounts);
        }

        // the number of loaded accounts must be <= 256 since account indices are
        // encoded as `u8`
        if num_loaded_accounts > 256 {
            return Err(SanitizeError::IndexOutOfBounds);
        }

        sanitize_instructions(
            &self.header,
            num_static_account_keys,
            num_loaded_accounts,
            &self.instructions,
        )?;

        // program ids cannot be loaded from lookup tables
        if self
            .instructions
            .iter()
            .any(|ix| usize::from(ix.program_id_index) >= num_static_account_keys)
        {
            return Err(SanitizeError::IndexOutOfBounds);
        }

        Ok(())
    }

    /// Returns the number of keys the lookups load as `(writable, readonly)`.
    pub fn num_lookup_keys(&self) -> (usize, usize) {
        self.address_table_lookups
            .iter()
            .fold((0usize, 0usize), |(writable, readonly), lookup| {
                (
                    writable.saturating_add(lookup.writable_indexes.len()),
                    readonly.saturating_add(lookup.readonly_indexes.len()),
                )
            })
    }

    /// Returns the size of the full key space, lookup keys included.
    pub fn num_total_keys(&self) -> usize {
        let (num_writable, num_readonly) = self.num_lookup_keys();
        self.account_keys
            .len()
            .saturating_add(num_writable)
            .saturating_add(num_readonly)
    }

    /// Returns true if the account at `index` of the full key space must sign
    /// this message. Keys loaded from lookups never sign.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`Message::num_total_keys`].
    pub fn is_account_signer(&self, index: usize) -> bool {
        let num_total_keys = self.num_total_keys();
        assert!(
            index < num_total_keys,
            "account index {index} out of range for {num_total_keys} keys"
        );
        index < usize::from(self.header.num_required_signatures)
    }

    /// Returns true if the account at `index` of the full key space was
    /// requested to be writable. Keys loaded through writable lookup indexes
    /// come before those loaded through readonly indexes.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`Message::num_total_keys`].
    pub fn is_account_writable(&self, index: usize) -> bool {
        let num_total_keys = self.num_total_keys();
        assert!(
            index < num_total_keys,
            "account index {index} out of range for {num_total_keys} keys"
        );
        let num_static_keys = self.account_keys.len();
        if index < num_static_keys {
            is_writable_index(index, self.header, &self.account_keys)
        } else {
            let (num_writable_lookup_keys, _) = self.num_lookup_keys();
            index.saturating_sub(num_static_keys) < num_writable_lookup_keys
        }
    }

    /// Returns true if the account at the specified index signed this
    /// message.
    pub fn is_signer(&self, index: usize) -> bool {
        index < usize::from(self.header.num_required_signatures)
    }

    /// Returns true if the account at the specified index is called as a
    /// program by an instruction in this message.
    pub fn is_key_called_as_program(&self, key_index: usize) -> bool {
        is_key_called_as_program(&self.instructions, key_index)
    }

    /// Returns true if the account at the specified index was requested as
    /// writable. Before loading addresses, we can't demote write locks for
    /// dynamically loaded addresses so this should not be used by the runtime.
    pub fn is_maybe_writable(
        &self,
        key_index: usize,
        reserved_account_keys: Option<&HashSet<Address>>,
    ) -> bool {
        self.is_writable_index(key_index)
            && !is_account_maybe_reserved(key_index, &self.account_keys, reserved_account_keys)
            && !self.demote_program_id(key_index)
    }

    fn demote_program_id(&self, key_index: usize) -> bool {
        self.is_key_called_as_program(key_index) && !self.is_upgradeable_loader_in_static_keys()
    }

    fn is_writable_index(&self, key_index: usize) -> bool {
        if key_index < self.account_keys.len() {
            is_writable_index(key_index, self.header, &self.account_keys)
        } else {
            let (num_writable_lookup_keys, _) = self.num_lookup_keys();
            key_index.saturating_sub(self.account_keys.len()) < num_writable_lookup_keys
        }
    }

    fn is_upgradeable_loader_in_static_keys(&self) -> bool {
        self.account_keys
            .iter()
            .any(wallet_address::ids::bpf_loader_upgradeable::check_id)
    }

    /// The payer is always the first static key.
    pub fn fee_payer(&self) -> Option<&Address> {
        self.account_keys.first()
    }

    /// Resolves this message's lookups against `lookup_table_accounts`.
    ///
    /// Keys are gathered lookup by lookup: all writable keys first, then all
    /// readonly keys.
    pub fn resolve_address_table_lookups(
        &self,
        lookup_table_accounts: &[AddressLookupTableAccount],
    ) -> Result<AccountKeysFromLookups, AccountKeysError> {
        let mut keys_from_lookups = AccountKeysFromLookups::default();
        for lookup in &self.address_table_lookups {
            let table = lookup_table_accounts
                .iter()
                .find(|table| table.key == lookup.account_key)
                .ok_or(AccountKeysError::MissingTableKey(lookup.account_key))?;
            let resolve = |indexes: &[u8]| -> Result<Vec<Address>, AccountKeysError> {
                indexes
                    .iter()
                    .map(|index| {
                        table.addresses.get(usize::from(*index)).copied().ok_or(
                            AccountKeysError::MissingAddress {
                                table: table.key,
                                index: *index,
                            },
                        )
                    })
                    .collect()
            };
            keys_from_lookups
                .writable
                .extend(resolve(&lookup.writable_indexes)?);
            keys_from_lookups
                .readonly
                .extend(resolve(&lookup.readonly_indexes)?);
        }
        Ok(keys_from_lookups)
    }

    /// Assembles the full key space of this message.
    pub fn get_account_keys(
        &self,
        source: AccountKeysSource<'_>,
    ) -> Result<MessageAccountKeys, AccountKeysError> {
        let keys_from_lookups = match source {
            AccountKeysSource::Resolved(keys_from_lookups) => {
                let (num_writable, num_readonly) = self.num_lookup_keys();
                let expected = num_writable.saturating_add(num_readonly);
                if keys_from_lookups.writable.len() != num_writable
                    || keys_from_lookups.readonly.len() != num_readonly
                {
                    return Err(AccountKeysError::MismatchInNumberOfAccountKeysFromLookups {
                        expected,
                        actual: keys_from_lookups.len(),
                    });
                }
                Some(keys_from_lookups.clone())
            }
            AccountKeysSource::LookupTables(lookup_table_accounts) => {
                Some(self.resolve_address_table_lookups(lookup_table_accounts)?)
            }
            AccountKeysSource::Unresolved if self.address_table_lookups.is_empty() => None,
            AccountKeysSource::Unresolved => {
                return Err(AccountKeysError::AccountKeysAddressTableLookupsWereNotResolved)
            }
        };
        Ok(MessageAccountKeys::new(
            self.account_keys.clone(),
            keys_from_lookups,
        ))
    }
}

impl WireEncode for Message {
    fn wire_size(&self) -> usize {
        self.header
            .wire_size()
            .saturating_add(short_vec_size(&self.account_keys))
            .saturating_add(self.recent_blockhash.wire_size())
            .saturating_add(short_vec_size(&self.instructions))
            .saturating_add(short_vec_size(&self.address_table_lookups))
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        self.header.write_to(buf);
        write_short_vec(&self.account_keys, buf);
        self.recent_blockhash.write_to(buf);
        write_short_vec(&self.instructions, buf);
        write_short_vec(&self.address_table_lookups, buf);
    }
}

impl WireDecode for Message {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            header: MessageHeader::read_from(cursor)?,
            account_keys: read_short_vec(cursor)?,
            recent_blockhash: Hash::read_from(cursor)?,
            instructions: read_short_vec(cursor)?,
            address_table_lookups: read_short_vec(cursor)?,
        })
    }
}
