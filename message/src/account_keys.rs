use {
    crate::{
        compiled_instruction::CompiledInstruction, v0::AccountKeysFromLookups, CompileError,
        MAX_ACCOUNT_KEYS,
    },
    std::collections::BTreeMap,
    wallet_address::Address,
    wallet_instruction::Instruction,
};

/// The full key space of a message: the static keys followed by the keys
/// loaded from lookup tables, writable ones first.
///
/// Every instruction account index and program id index of a compiled
/// message refers to a position in this concatenation.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct MessageAccountKeys {
    static_keys: Vec<Address>,
    keys_from_lookups: Option<AccountKeysFromLookups>,
}

impl MessageAccountKeys {
    pub fn new(static_keys: Vec<Address>, keys_from_lookups: Option<AccountKeysFromLookups>) -> Self {
        Self {
            static_keys,
            keys_from_lookups,
        }
    }

    pub fn static_account_keys(&self) -> &[Address] {
        &self.static_keys
    }

    pub fn account_keys_from_lookups(&self) -> Option<&AccountKeysFromLookups> {
        self.keys_from_lookups.as_ref()
    }

    /// The key segments in index order: static, then writable from lookups,
    /// then readonly from lookups.
    pub fn key_segments(&self) -> impl Iterator<Item = &[Address]> + Clone {
        let lookup_segments = self
            .keys_from_lookups
            .iter()
            .flat_map(|keys| [keys.writable.as_slice(), keys.readonly.as_slice()]);
        std::iter::once(self.static_keys.as_slice()).chain(lookup_segments)
    }

    /// Returns the address at `index` in the concatenated key space, or
    /// `None` if out of range.
    #[inline]
    pub fn get(&self, mut index: usize) -> Option<&Address> {
        for key_segment in self.key_segments() {
            if index < key_segment.len() {
                return Some(&key_segment[index]);
            }
            index = index.saturating_sub(key_segment.len());
        }

        None
    }

    /// Returns the total length of loaded accounts for a message
    #[inline]
    pub fn len(&self) -> usize {
        self.key_segments()
            .fold(0usize, |len, key_segment| len.saturating_add(key_segment.len()))
    }

    /// Returns true if this collection of account keys is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterator for the addresses of the loaded accounts for a message
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Address> + Clone {
        self.key_segments().flatten()
    }

    /// Compiles the account and program references of `instructions` into
    /// indexes of this key space.
    ///
    /// Fails if the key space cannot be indexed by a byte, or if an
    /// instruction names a key that is not part of it.
    pub fn try_compile_instructions(
        &self,
        instructions: &[Instruction],
    ) -> Result<Vec<CompiledInstruction>, CompileError> {
        if self.len() > MAX_ACCOUNT_KEYS {
            return Err(CompileError::AccountIndexOverflow);
        }

        let mut account_index_map = BTreeMap::<&Address, u8>::new();
        for (index, key) in self.iter().enumerate() {
            // the length check above guarantees every index fits in a byte
            let index = u8::try_from(index).map_err(|_| CompileError::AccountIndexOverflow)?;
            account_index_map.entry(key).or_insert(index);
        }

        let get_account_index = |key: &Address| -> Result<u8, CompileError> {
            account_index_map
                .get(key)
                .copied()
                .ok_or(CompileError::UnknownInstructionAccountKey(*key))
        };

        instructions
            .iter()
            .map(|ix| {
                let accounts: Vec<u8> = ix
                    .accounts
                    .iter()
                    .map(|account_meta| get_account_index(&account_meta.pubkey))
                    .collect::<Result<Vec<u8>, CompileError>>()?;

                Ok(CompiledInstruction {
                    program_id_index: get_account_index(&ix.program_id)?,
                    data: ix.data.clone(),
                    accounts,
                })
            })
            .collect()
    }
}
