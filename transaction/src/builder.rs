//! Assembles a legacy [`Transaction`] from loose instructions.
//!
//! Account order follows the rules wallets have always used for legacy
//! transactions: signers before non-signers, writable before read-only, and
//! within a class by base58 rendering (see [`cmp_base58`]). The fee payer is
//! then forced to the front. Compilation happens once, in
//! [`TransactionBuilder::finalize`], so a finished [`Transaction`] can never
//! disagree with the inputs it was built from.
use {
    crate::{Transaction, TransactionError, TransactionResult},
    log::debug,
    wallet_address::{cmp_base58, Address},
    wallet_hash::Hash,
    wallet_instruction::{AccountMeta, Instruction},
    wallet_message::{legacy::Message, MessageAccountKeys, MessageHeader, MAX_ACCOUNT_KEYS},
    wallet_signature::Signature,
};

/// A durable nonce to use in place of a recent blockhash.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NonceInfo {
    /// The nonce value stored in the nonce account.
    pub nonce: Hash,
    /// The instruction advancing the nonce; it must run first.
    pub nonce_instruction: Instruction,
}

/// A signer slot recorded before the message is compiled.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SignaturePubkeyPair {
    pub pubkey: Address,
    pub signature: Option<Signature>,
}

#[derive(Debug, Default, Clone)]
pub struct TransactionBuilder {
    fee_payer: Option<Address>,
    recent_blockhash: Option<Hash>,
    nonce_info: Option<NonceInfo>,
    instructions: Vec<Instruction>,
    signatures: Vec<SignaturePubkeyPair>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fee_payer(mut self, fee_payer: Address) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }

    pub fn recent_blockhash(mut self, recent_blockhash: Hash) -> Self {
        self.recent_blockhash = Some(recent_blockhash);
        self
    }

    /// Uses a durable nonce. The nonce value overrides any recent blockhash.
    pub fn nonce_info(mut self, nonce_info: NonceInfo) -> Self {
        self.nonce_info = Some(nonce_info);
        self
    }

    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn instructions(mut self, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    /// Reserves a signature slot for `pubkey`. The first reserved signer
    /// pays fees when no explicit fee payer is set.
    pub fn signer(mut self, pubkey: Address) -> Self {
        self.signatures.push(SignaturePubkeyPair {
            pubkey,
            signature: None,
        });
        self
    }

    /// Records a signature collected ahead of compilation.
    pub fn signature(mut self, pubkey: Address, signature: Signature) -> Self {
        self.signatures.push(SignaturePubkeyPair {
            pubkey,
            signature: Some(signature),
        });
        self
    }

    /// Compiles the message without consuming the builder.
    pub fn compile_message(&self) -> TransactionResult<Message> {
        let (recent_blockhash, instructions) = self.resolve_lifetime()?;
        if instructions.is_empty() {
            return Err(TransactionError::NoInstructions);
        }
        let fee_payer = self
            .fee_payer
            .or_else(|| self.signatures.first().map(|pair| pair.pubkey))
            .ok_or(TransactionError::FeePayerRequired)?;

        let mut metas = collect_account_metas(&instructions);
        metas.sort_by(|x, y| {
            y.is_signer
                .cmp(&x.is_signer)
                .then_with(|| y.is_writable.cmp(&x.is_writable))
                .then_with(|| cmp_base58(&x.pubkey, &y.pubkey))
        });

        match metas.iter().position(|meta| meta.pubkey == fee_payer) {
            Some(index) => {
                let mut payer_meta = metas.remove(index);
                payer_meta.is_signer = true;
                payer_meta.is_writable = true;
                metas.insert(0, payer_meta);
            }
            None => metas.insert(0, AccountMeta::new(fee_payer, true)),
        }

        for pair in &self.signatures {
            let meta = metas
                .iter_mut()
                .find(|meta| meta.pubkey == pair.pubkey)
                .ok_or(TransactionError::UnknownSigner(pair.pubkey))?;
            if !meta.is_signer {
                debug!("upgrading {} to signer", pair.pubkey);
                meta.is_signer = true;
            }
        }

        let (header, account_keys) = partition_account_metas(&metas)?;
        debug!(
            "compiled legacy transaction message: {} keys, header {:?}",
            account_keys.len(),
            header
        );
        let account_keys = MessageAccountKeys::new(account_keys, None);
        let compiled_instructions = account_keys.try_compile_instructions(&instructions)?;
        Ok(Message {
            header,
            account_keys: account_keys.static_account_keys().to_vec(),
            recent_blockhash,
            instructions: compiled_instructions,
        })
    }

    /// Compiles the message and places every signature recorded so far in
    /// its slot. Slots without a signature are left zero-filled.
    pub fn finalize(self) -> TransactionResult<Transaction> {
        let message = self.compile_message()?;
        let mut transaction = Transaction::new_unsigned(message);
        for pair in &self.signatures {
            if let Some(signature) = pair.signature {
                transaction.add_signature(&pair.pubkey, signature)?;
            }
        }
        Ok(transaction)
    }

    /// Resolves the blockhash to use and the instruction list, prepending the
    /// nonce advance instruction when a durable nonce is used.
    fn resolve_lifetime(&self) -> TransactionResult<(Hash, Vec<Instruction>)> {
        let mut instructions = self.instructions.clone();
        let recent_blockhash = match &self.nonce_info {
            Some(nonce_info) => {
                if instructions.first() != Some(&nonce_info.nonce_instruction) {
                    debug!("prepending nonce advance instruction");
                    instructions.insert(0, nonce_info.nonce_instruction.clone());
                }
                Some(nonce_info.nonce)
            }
            None => self.recent_blockhash,
        };
        let recent_blockhash = recent_blockhash.ok_or(TransactionError::RecentBlockhashRequired)?;
        Ok((recent_blockhash, instructions))
    }
}

/// Every account meta of every instruction, then one read-only meta per
/// distinct program id, merged by address with flags OR-ed together. The
/// result keeps first-occurrence order.
fn collect_account_metas(instructions: &[Instruction]) -> Vec<AccountMeta> {
    let mut program_ids: Vec<Address> = Vec::new();
    let mut all_metas = Vec::new();
    for instruction in instructions {
        all_metas.extend(instruction.accounts.iter().cloned());
        if !program_ids.contains(&instruction.program_id) {
            program_ids.push(instruction.program_id);
        }
    }
    all_metas.extend(
        program_ids
            .into_iter()
            .map(|program_id| AccountMeta::new_readonly(program_id, false)),
    );

    let mut unique_metas: Vec<AccountMeta> = Vec::with_capacity(all_metas.len());
    for meta in all_metas {
        match unique_metas
            .iter_mut()
            .find(|unique| unique.pubkey == meta.pubkey)
        {
            Some(unique) => {
                unique.is_signer |= meta.is_signer;
                unique.is_writable |= meta.is_writable;
            }
            None => unique_metas.push(meta),
        }
    }
    unique_metas
}

/// Splits ordered metas into the four header buckets, keeping relative order
/// within each bucket.
fn partition_account_metas(
    metas: &[AccountMeta],
) -> TransactionResult<(MessageHeader, Vec<Address>)> {
    if metas.len() > MAX_ACCOUNT_KEYS {
        return Err(wallet_message::CompileError::MaxStaticAccountKeysLengthExceeded.into());
    }
    let bucket = |is_signer: bool, is_writable: bool| {
        metas
            .iter()
            .filter(move |meta| meta.is_signer == is_signer && meta.is_writable == is_writable)
            .map(|meta| meta.pubkey)
    };
    let writable_signers: Vec<Address> = bucket(true, true).collect();
    let readonly_signers: Vec<Address> = bucket(true, false).collect();
    let writable_non_signers: Vec<Address> = bucket(false, true).collect();
    let readonly_non_signers: Vec<Address> = bucket(false, false).collect();

    // every bucket is bounded by `MAX_ACCOUNT_KEYS`, which fits in a u8
    let count = |keys: &[Address]| u8::try_from(keys.len()).unwrap_or(u8::MAX);
    let header = MessageHeader {
        num_required_signatures: count(&writable_signers)
            .saturating_add(count(&readonly_signers)),
        num_readonly_signed_accounts: count(&readonly_signers),
        num_readonly_unsigned_accounts: count(&readonly_non_signers),
    };
    let account_keys = writable_signers
        .into_iter()
        .chain(readonly_signers)
        .chain(writable_non_signers)
        .chain(readonly_non_signers)
        .collect();
    Ok((header, account_keys))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        assert_matches::assert_matches,
        wallet_instruction::system::advance_nonce_account,
        wallet_message::CompileError,
    };

    #[test]
    fn test_missing_blockhash() {
        let payer = Address::new_unique();
        let result = TransactionBuilder::new()
            .fee_payer(payer)
            .instruction(Instruction::new_with_bytes(Address::new_unique(), &[], vec![]))
            .compile_message();
        assert_eq!(result, Err(TransactionError::RecentBlockhashRequired));
    }

    #[test]
    fn test_missing_fee_payer() {
        let result = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .instruction(Instruction::new_with_bytes(Address::new_unique(), &[], vec![]))
            .compile_message();
        assert_eq!(result, Err(TransactionError::FeePayerRequired));
    }

    #[test]
    fn test_no_instructions() {
        let result = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(Address::new_unique())
            .compile_message();
        assert_eq!(result, Err(TransactionError::NoInstructions));
    }

    #[test]
    fn test_fee_payer_inferred_from_first_signer() {
        let signer = Address::new_unique();
        let program_id = Address::new_unique();
        let message = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .signer(signer)
            .instruction(Instruction::new_with_bytes(program_id, &[], vec![]))
            .compile_message()
            .unwrap();
        assert_eq!(message.account_keys, vec![signer, program_id]);
        assert_eq!(message.header.num_required_signatures, 1);
    }

    #[test]
    fn test_class_order_and_payer_first() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let readonly = Address::new_unique();
        let writable = Address::new_unique();
        let readonly_signer = Address::new_unique();
        let writable_signer = Address::new_unique();
        let message = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(payer)
            .instruction(Instruction::new_with_bytes(
                program_id,
                &[9],
                vec![
                    AccountMeta::new_readonly(readonly, false),
                    AccountMeta::new(writable, false),
                    AccountMeta::new_readonly(readonly_signer, true),
                    AccountMeta::new(writable_signer, true),
                    AccountMeta::new_readonly(payer, false),
                ],
            ))
            .compile_message()
            .unwrap();

        // `readonly` and the program id share a class and sort by base58
        let mut readonly_keys = [readonly, program_id];
        readonly_keys.sort_by(cmp_base58);
        assert_eq!(
            message.account_keys,
            vec![
                payer,
                writable_signer,
                readonly_signer,
                writable,
                readonly_keys[0],
                readonly_keys[1],
            ]
        );
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 3,
                num_readonly_signed_accounts: 1,
                num_readonly_unsigned_accounts: 2,
            }
        );
        assert_eq!(message.sanitize(), Ok(()));
    }

    #[test]
    fn test_duplicate_metas_merge_flags() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let shared = Address::new_unique();
        let message = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(payer)
            .instruction(Instruction::new_with_bytes(
                program_id,
                &[],
                vec![AccountMeta::new_readonly(shared, true)],
            ))
            .instruction(Instruction::new_with_bytes(
                program_id,
                &[],
                vec![AccountMeta::new(shared, false)],
            ))
            .compile_message()
            .unwrap();
        assert_eq!(message.account_keys, vec![payer, shared, program_id]);
        assert!(message.is_account_signer(1));
        assert!(message.is_account_writable(1));
        assert!(!message.has_duplicates());
    }

    #[test]
    fn test_case_tie_break_prefers_lowercase() {
        // The base58 renderings of these differ only in the case of one letter.
        let upper = Address::new_from_array([0x55; 32]);
        let lower: Address = "6k78AbasGMFFrhG95Pj6jQbqkVt7FQMhVgemxJovWKr6"
            .parse()
            .unwrap();
        assert_eq!(
            upper.to_string(),
            "6k78AbasGMFFrhG95Pj6jQbqkVt7FQMhVgemxJovWKR6"
        );
        // raw byte order disagrees with the rendering order
        assert!(upper < lower);

        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let message = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(payer)
            .instruction(Instruction::new_with_bytes(
                program_id,
                &[],
                vec![AccountMeta::new(upper, false), AccountMeta::new(lower, false)],
            ))
            .compile_message()
            .unwrap();
        assert_eq!(message.account_keys, vec![payer, lower, upper, program_id]);
    }

    #[test]
    fn test_unknown_signer() {
        let stranger = Address::new_unique();
        let result = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(Address::new_unique())
            .signer(stranger)
            .instruction(Instruction::new_with_bytes(Address::new_unique(), &[], vec![]))
            .compile_message();
        assert_eq!(result, Err(TransactionError::UnknownSigner(stranger)));
    }

    #[test]
    fn test_signer_upgrade() {
        let payer = Address::new_unique();
        let program_id = Address::new_unique();
        let cosigner = Address::new_unique();
        let message = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(payer)
            .signer(payer)
            .signer(cosigner)
            .instruction(Instruction::new_with_bytes(
                program_id,
                &[],
                vec![AccountMeta::new_readonly(cosigner, false)],
            ))
            .compile_message()
            .unwrap();
        assert_eq!(message.account_keys, vec![payer, cosigner, program_id]);
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 2,
                num_readonly_signed_accounts: 1,
                num_readonly_unsigned_accounts: 1,
            }
        );
    }

    #[test]
    fn test_nonce_prepended_once() {
        let payer = Address::new_unique();
        let nonce_account = Address::new_unique();
        let nonce = Hash::new_unique();
        let nonce_instruction = advance_nonce_account(&nonce_account, &payer);
        let transfer = Instruction::new_with_bytes(
            Address::new_unique(),
            &[2],
            vec![AccountMeta::new(Address::new_unique(), false)],
        );
        let nonce_info = NonceInfo {
            nonce,
            nonce_instruction: nonce_instruction.clone(),
        };

        let builder = TransactionBuilder::new()
            .fee_payer(payer)
            .recent_blockhash(Hash::new_unique())
            .nonce_info(nonce_info.clone())
            .instruction(transfer.clone());
        let message = builder.compile_message().unwrap();
        assert_eq!(message.recent_blockhash, nonce);
        assert_eq!(message.instructions.len(), 2);
        assert_eq!(
            message.program_id(0),
            Some(&nonce_instruction.program_id)
        );

        // already first: not prepended again
        let again = TransactionBuilder::new()
            .fee_payer(payer)
            .nonce_info(nonce_info)
            .instruction(nonce_instruction)
            .instruction(transfer)
            .compile_message()
            .unwrap();
        assert_eq!(again, message);
        assert!(Transaction::new_unsigned(again).uses_durable_nonce());
    }

    #[test]
    fn test_too_many_accounts() {
        let accounts = (0..256)
            .map(|_| AccountMeta::new_readonly(Address::new_unique(), false))
            .collect();
        let result = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(Address::new_unique())
            .instruction(Instruction::new_with_bytes(
                Address::new_unique(),
                &[],
                accounts,
            ))
            .compile_message();
        assert_matches!(
            result,
            Err(TransactionError::Compile(
                CompileError::MaxStaticAccountKeysLengthExceeded
            ))
        );
    }

    #[test]
    fn test_finalize_places_signatures() {
        let payer = Address::new_unique();
        let cosigner = Address::new_unique();
        let signature = Signature::new_unique();
        let transaction = TransactionBuilder::new()
            .recent_blockhash(Hash::new_unique())
            .fee_payer(payer)
            .signature(cosigner, signature)
            .instruction(Instruction::new_with_bytes(
                Address::new_unique(),
                &[],
                vec![AccountMeta::new_readonly(cosigner, true)],
            ))
            .finalize()
            .unwrap();
        assert_eq!(transaction.signatures.len(), 2);
        assert_eq!(transaction.signatures[0], Signature::default());
        assert_eq!(transaction.signatures[1], signature);
        assert!(!transaction.is_signed());
    }
}
