//! Collection of the keys referenced by a set of instructions.
use {
    crate::{
        v0::{AccountKeysFromLookups, MessageAddressTableLookup},
        AddressLookupTableAccount, CompileError, MessageHeader, MAX_ACCOUNT_KEYS,
    },
    indexmap::IndexMap,
    log::trace,
    wallet_address::Address,
    wallet_instruction::Instruction,
};

/// The capabilities merged from every reference to one key.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledKeyMeta {
    pub is_signer: bool,
    pub is_writable: bool,
    /// Referenced as a program id by at least one instruction.
    pub is_invoked: bool,
}

/// The deduplicated keys of a set of instructions, in first-reference order.
///
/// The payer is always the first entry and is always a writable signer.
/// Later references to a key already present widen its capabilities; they
/// never move it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledKeys {
    payer: Address,
    key_meta_map: IndexMap<Address, CompiledKeyMeta>,
}

impl CompiledKeys {
    /// Compiles the keys referenced by a list of instructions, merging the
    /// signer and writable flags of duplicate references.
    pub fn compile(instructions: &[Instruction], payer: Address) -> Self {
        let mut key_meta_map = IndexMap::<Address, CompiledKeyMeta>::new();
        key_meta_map.insert(
            payer,
            CompiledKeyMeta {
                is_signer: true,
                is_writable: true,
                is_invoked: false,
            },
        );
        for ix in instructions {
            key_meta_map.entry(ix.program_id).or_default().is_invoked = true;
            for account_meta in &ix.accounts {
                let meta = key_meta_map.entry(account_meta.pubkey).or_default();
                meta.is_signer |= account_meta.is_signer;
                meta.is_writable |= account_meta.is_writable;
            }
        }
        trace!(
            "collected {} distinct keys from {} instructions",
            key_meta_map.len(),
            instructions.len()
        );
        Self {
            payer,
            key_meta_map,
        }
    }

    pub fn payer(&self) -> &Address {
        &self.payer
    }

    /// Number of keys that are still static.
    pub fn len(&self) -> usize {
        self.key_meta_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_meta_map.is_empty()
    }

    pub fn get(&self, key: &Address) -> Option<&CompiledKeyMeta> {
        self.key_meta_map.get(key)
    }

    /// Moves every key that `lookup_table_account` can supply out of the
    /// static set. Writable keys are searched first, then read-only ones;
    /// signers and invoked programs are never extracted.
    ///
    /// Returns `None`, and leaves the keys untouched, if the table holds none
    /// of the eligible keys. On error nothing is extracted either.
    pub fn try_extract_table_lookup(
        &mut self,
        lookup_table_account: &AddressLookupTableAccount,
    ) -> Result<Option<(MessageAddressTableLookup, AccountKeysFromLookups)>, CompileError> {
        let (writable_indexes, drained_writable_keys) = self.try_find_keys_in_lookup_table(
            &lookup_table_account.addresses,
            |meta| !meta.is_signer && !meta.is_invoked && meta.is_writable,
        )?;
        let (readonly_indexes, drained_readonly_keys) = self.try_find_keys_in_lookup_table(
            &lookup_table_account.addresses,
            |meta| !meta.is_signer && !meta.is_invoked && !meta.is_writable,
        )?;

        // Don't extract lookup if no keys were found
        if writable_indexes.is_empty() && readonly_indexes.is_empty() {
            return Ok(None);
        }

        for key in drained_writable_keys.iter().chain(&drained_readonly_keys) {
            self.key_meta_map.shift_remove(key);
        }
        trace!(
            "extracted {} writable and {} readonly keys using table {}",
            writable_indexes.len(),
            readonly_indexes.len(),
            lookup_table_account.key
        );

        Ok(Some((
            MessageAddressTableLookup {
                account_key: lookup_table_account.key,
                writable_indexes,
                readonly_indexes,
            },
            AccountKeysFromLookups {
                writable: drained_writable_keys,
                readonly: drained_readonly_keys,
            },
        )))
    }

    /// Finds the table position of every key accepted by `key_meta_filter`.
    /// Duplicated table entries resolve to the lowest position.
    fn try_find_keys_in_lookup_table(
        &self,
        lookup_table_addresses: &[Address],
        key_meta_filter: impl Fn(&CompiledKeyMeta) -> bool,
    ) -> Result<(Vec<u8>, Vec<Address>), CompileError> {
        let mut lookup_table_indexes = Vec::new();
        let mut found_keys = Vec::new();
        for (key, _) in self
            .key_meta_map
            .iter()
            .filter(|(_, meta)| key_meta_filter(meta))
        {
            let Some(index) = lookup_table_addresses
                .iter()
                .position(|address| address == key)
            else {
                continue;
            };
            let index =
                u8::try_from(index).map_err(|_| CompileError::MaxLookupTableIndexExceeded)?;
            lookup_table_indexes.push(index);
            found_keys.push(*key);
        }
        Ok((lookup_table_indexes, found_keys))
    }

    /// Splits the remaining keys into the four header-ordered buckets and
    /// derives the header counts.
    pub fn try_into_message_components(self) -> Result<(MessageHeader, Vec<Address>), CompileError> {
        let bucket = |is_signer: bool, is_writable: bool| -> Vec<Address> {
            self.key_meta_map
                .iter()
                .filter(|(_, meta)| meta.is_signer == is_signer && meta.is_writable == is_writable)
                .map(|(key, _)| *key)
                .collect()
        };
        let writable_signer_keys = bucket(true, true);
        let readonly_signer_keys = bucket(true, false);
        let writable_non_signer_keys = bucket(false, true);
        let readonly_non_signer_keys = bucket(false, false);

        match writable_signer_keys.first() {
            None => return Err(CompileError::ExpectedAtLeastOneWritableSignerKey),
            Some(first) if *first != self.payer => {
                return Err(CompileError::ExpectedFirstWritableSignerKeyToBePayer)
            }
            Some(_) => {}
        }
        if self.key_meta_map.len() > MAX_ACCOUNT_KEYS {
            return Err(CompileError::MaxStaticAccountKeysLengthExceeded);
        }

        let try_into_u8 = |num: usize| -> Result<u8, CompileError> {
            u8::try_from(num).map_err(|_| CompileError::AccountIndexOverflow)
        };
        let signers_len = writable_signer_keys
            .len()
            .saturating_add(readonly_signer_keys.len());
        let header = MessageHeader {
            num_required_signatures: try_into_u8(signers_len)?,
            num_readonly_signed_accounts: try_into_u8(readonly_signer_keys.len())?,
            num_readonly_unsigned_accounts: try_into_u8(readonly_non_signer_keys.len())?,
        };

        let static_account_keys = std::iter::empty()
            .chain(writable_signer_keys)
            .chain(readonly_signer_keys)
            .chain(writable_non_signer_keys)
            .chain(readonly_non_signer_keys)
            .collect();

        Ok((header, static_account_keys))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, wallet_instruction::AccountMeta};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn meta(is_signer: bool, is_writable: bool, is_invoked: bool) -> CompiledKeyMeta {
        CompiledKeyMeta {
            is_signer,
            is_writable,
            is_invoked,
        }
    }

    fn keys_with(payer: Address, entries: &[(Address, CompiledKeyMeta)]) -> CompiledKeys {
        CompiledKeys {
            payer,
            key_meta_map: entries.iter().copied().collect(),
        }
    }

    #[test]
    fn test_compile_with_dups() {
        init_logger();
        let program_id = Address::new_unique();
        let payer = Address::new_unique();
        let id0 = Address::new_unique();
        let id1 = Address::new_unique();
        let id2 = Address::new_unique();
        let keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(
                program_id,
                &[0],
                vec![
                    AccountMeta::new(id0, true),
                    AccountMeta::new_readonly(id1, true),
                    AccountMeta::new(id2, false),
                    // duplicate the account inputs
                    AccountMeta::new(id0, true),
                    AccountMeta::new_readonly(id1, true),
                    AccountMeta::new(id2, false),
                ],
            )],
            payer,
        );
        assert_eq!(
            keys,
            keys_with(
                payer,
                &[
                    (payer, meta(true, true, false)),
                    (program_id, meta(false, false, true)),
                    (id0, meta(true, true, false)),
                    (id1, meta(true, false, false)),
                    (id2, meta(false, true, false)),
                ]
            )
        );
    }

    #[test]
    fn test_compile_with_dup_payer() {
        let program_id = Address::new_unique();
        let payer = Address::new_unique();
        let keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(
                program_id,
                &[0],
                vec![AccountMeta::new_readonly(payer, false)],
            )],
            payer,
        );
        assert_eq!(
            keys,
            keys_with(
                payer,
                &[
                    (payer, meta(true, true, false)),
                    (program_id, meta(false, false, true)),
                ]
            )
        );
    }

    #[test]
    fn test_compile_with_dup_signer_mismatch() {
        let program_id = Address::new_unique();
        let payer = Address::new_unique();
        let id0 = Address::new_unique();
        let keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(
                program_id,
                &[0],
                vec![AccountMeta::new(id0, false), AccountMeta::new(id0, true)],
            )],
            payer,
        );

        // Ensure the dup writable key is a signer
        assert_eq!(keys.get(&id0), Some(&meta(true, true, false)));
    }

    #[test]
    fn test_compile_with_dup_nonsigner_writable_mismatch() {
        let program_id = Address::new_unique();
        let payer = Address::new_unique();
        let id0 = Address::new_unique();
        let keys = CompiledKeys::compile(
            &[
                Instruction::new_with_bytes(
                    program_id,
                    &[0],
                    vec![
                        AccountMeta::new_readonly(id0, false),
                        AccountMeta::new(id0, false),
                    ],
                ),
                Instruction::new_with_bytes(program_id, &[0], vec![AccountMeta::new(id0, false)]),
            ],
            payer,
        );

        // Ensure the dup nonsigner key is writable
        assert_eq!(keys.get(&id0), Some(&meta(false, true, false)));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_program_upgraded_by_account_meta() {
        let program_id = Address::new_unique();
        let payer = Address::new_unique();
        let keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(
                program_id,
                &[],
                vec![AccountMeta::new(program_id, false)],
            )],
            payer,
        );
        assert_eq!(keys.get(&program_id), Some(&meta(false, true, true)));
    }

    #[test]
    fn test_try_into_message_components() {
        init_logger();
        let keys = [
            Address::new_unique(),
            Address::new_unique(),
            Address::new_unique(),
            Address::new_unique(),
        ];

        // insertion order is deliberately not the bucket order
        let compiled_keys = keys_with(
            keys[0],
            &[
                (keys[0], meta(true, true, false)),
                (keys[3], meta(false, false, true)),
                (keys[2], meta(false, true, false)),
                (keys[1], meta(true, false, false)),
            ],
        );

        let (header, static_keys) = compiled_keys.try_into_message_components().unwrap();
        assert_eq!(static_keys, keys);
        assert_eq!(
            header,
            MessageHeader {
                num_required_signatures: 2,
                num_readonly_signed_accounts: 1,
                num_readonly_unsigned_accounts: 1,
            }
        );
    }

    #[test]
    fn test_try_into_message_components_preserves_bucket_insertion_order() {
        let payer = Address::new_unique();
        let smaller = Address::new_unique();
        let larger = Address::new_unique();
        assert!(smaller < larger);

        let compiled_keys = keys_with(
            payer,
            &[
                (payer, meta(true, true, false)),
                (larger, meta(false, true, false)),
                (smaller, meta(false, true, false)),
            ],
        );
        let (_, static_keys) = compiled_keys.try_into_message_components().unwrap();
        assert_eq!(static_keys, vec![payer, larger, smaller]);
    }

    #[test]
    fn test_try_into_message_components_requires_writable_signer() {
        let key = Address::new_unique();
        let compiled_keys = keys_with(key, &[(key, meta(true, false, false))]);
        assert_eq!(
            compiled_keys.try_into_message_components(),
            Err(CompileError::ExpectedAtLeastOneWritableSignerKey)
        );
    }

    #[test]
    fn test_try_into_message_components_requires_payer_first() {
        let payer = Address::new_unique();
        let other = Address::new_unique();
        let compiled_keys = keys_with(
            payer,
            &[
                (other, meta(true, true, false)),
                (payer, meta(true, true, false)),
            ],
        );
        assert_eq!(
            compiled_keys.try_into_message_components(),
            Err(CompileError::ExpectedFirstWritableSignerKeyToBePayer)
        );
    }

    #[test]
    fn test_try_into_message_components_with_too_many_keys() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let accounts = (0..257)
            .map(|_| AccountMeta::new(Address::new_unique(), false))
            .collect();
        let compiled_keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(program_id, &[], accounts)],
            payer,
        );
        assert_eq!(
            compiled_keys.try_into_message_components(),
            Err(CompileError::MaxStaticAccountKeysLengthExceeded)
        );
    }

    #[test]
    fn test_try_extract_table_lookup() {
        init_logger();
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let writable_keys = [Address::new_unique(), Address::new_unique()];
        let readonly_keys = [Address::new_unique(), Address::new_unique()];

        let mut compiled_keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(
                program_id,
                &[],
                vec![
                    AccountMeta::new(writable_keys[0], true),
                    AccountMeta::new_readonly(readonly_keys[0], true),
                    AccountMeta::new(writable_keys[1], false),
                    AccountMeta::new_readonly(readonly_keys[1], false),
                ],
            )],
            payer,
        );

        let lookup_table_account = AddressLookupTableAccount::new(
            Address::new_unique(),
            vec![
                writable_keys[0],
                readonly_keys[0],
                writable_keys[1],
                readonly_keys[1],
                program_id,
                payer,
                // add some duplicates to ensure lowest index is selected
                writable_keys[1],
                readonly_keys[1],
            ],
        );

        assert_eq!(
            compiled_keys.try_extract_table_lookup(&lookup_table_account),
            Ok(Some((
                MessageAddressTableLookup {
                    account_key: lookup_table_account.key,
                    writable_indexes: vec![2],
                    readonly_indexes: vec![3],
                },
                AccountKeysFromLookups {
                    writable: vec![writable_keys[1]],
                    readonly: vec![readonly_keys[1]],
                },
            )))
        );

        // signers and the invoked program stay static
        assert_eq!(compiled_keys.len(), 4);
        assert!(compiled_keys.get(&writable_keys[1]).is_none());
        assert!(compiled_keys.get(&program_id).is_some());
    }

    #[test]
    fn test_try_extract_table_lookup_returns_none() {
        init_logger();
        let payer = Address::new_unique();
        let mut compiled_keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(
                Address::new_unique(),
                &[],
                vec![AccountMeta::new(Address::new_unique(), false)],
            )],
            payer,
        );
        let before = compiled_keys.clone();

        let lookup_table_account = AddressLookupTableAccount::new(Address::new_unique(), vec![]);

        assert_eq!(
            compiled_keys.try_extract_table_lookup(&lookup_table_account),
            Ok(None)
        );
        assert_eq!(compiled_keys, before);
    }

    #[test]
    fn test_try_extract_table_lookup_for_invalid_table() {
        let payer = Address::new_unique();
        let writable_key = Address::new_unique();
        let readonly_key = Address::new_unique();
        let mut compiled_keys = CompiledKeys::compile(
            &[Instruction::new_with_bytes(
                Address::new_unique(),
                &[],
                vec![
                    AccountMeta::new(writable_key, false),
                    AccountMeta::new_readonly(readonly_key, false),
                ],
            )],
            payer,
        );
        let before = compiled_keys.clone();

        const MAX_LENGTH_WITHOUT_OVERFLOW: usize = u8::MAX as usize + 1;
        let mut addresses = vec![Address::default(); MAX_LENGTH_WITHOUT_OVERFLOW];
        addresses.insert(0, writable_key);
        addresses.push(readonly_key);

        let lookup_table_account = AddressLookupTableAccount::new(Address::new_unique(), addresses);

        assert_eq!(
            compiled_keys.try_extract_table_lookup(&lookup_table_account),
            Err(CompileError::MaxLookupTableIndexExceeded),
        );
        // the writable pass succeeded but nothing was drained
        assert_eq!(compiled_keys, before);
    }
}
