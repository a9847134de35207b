//! The one system program instruction the transaction layer recognises.
use {
    crate::{AccountMeta, Instruction},
    wallet_address::{
        ids::{system_program, sysvar},
        Address,
    },
};

/// Little-endian `u32` tag of the system program's advance-nonce instruction.
pub const ADVANCE_NONCE_ACCOUNT_TAG: [u8; 4] = [4, 0, 0, 0];

/// Builds the instruction that consumes the stored durable nonce of
/// `nonce_address` and replaces it, authorized by `authority`.
pub fn advance_nonce_account(nonce_address: &Address, authority: &Address) -> Instruction {
    Instruction::new_with_bytes(
        system_program::id(),
        &ADVANCE_NONCE_ACCOUNT_TAG,
        vec![
            AccountMeta::new(*nonce_address, false),
            AccountMeta::new_readonly(sysvar::recent_blockhashes::id(), false),
            AccountMeta::new_readonly(*authority, true),
        ],
    )
}

/// Returns true if `program_id` and `data` describe an advance-nonce
/// instruction.
pub fn is_advance_nonce_account(program_id: &Address, data: &[u8]) -> bool {
    system_program::check_id(program_id) && data.get(..4) == Some(&ADVANCE_NONCE_ACCOUNT_TAG[..])
}
