#![cfg_attr(docsrs, feature(doc_cfg))]
//! Atomically-committed sequences of instructions.
//!
//! A transaction pairs a message with one signature slot per required
//! signer. The slot count always equals the message header's
//! `num_required_signatures`; an absent signature is the all-zero
//! [`Signature`], which is also how it travels on the wire.
//!
//! [`Transaction`] holds a legacy message and is usually produced by a
//! [`TransactionBuilder`]. [`VersionedTransaction`] holds either message
//! format.
//!
//! ```
//! use wallet_transaction::{TransactionBuilder, Transaction};
//! use wallet_instruction::{AccountMeta, Instruction};
//! use wallet_signer::{Keypair, Signer};
//! use wallet_hash::Hash;
//! use wallet_address::Address;
//!
//! let payer = Keypair::new();
//! let instruction = Instruction::new_with_bytes(
//!     Address::new_unique(),
//!     &[1, 2, 3],
//!     vec![AccountMeta::new(Address::new_unique(), false)],
//! );
//! let mut transaction = TransactionBuilder::new()
//!     .fee_payer(payer.pubkey())
//!     .recent_blockhash(Hash::new_unique())
//!     .instruction(instruction)
//!     .finalize()?;
//! transaction.try_sign(&[&payer])?;
//! transaction.verify_signatures(true)?;
//! # Ok::<(), wallet_transaction::TransactionError>(())
//! ```
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    log::{debug, warn},
    std::cmp::Ordering,
    wallet_address::Address,
    wallet_hash::Hash,
    wallet_instruction::system::is_advance_nonce_account,
    wallet_message::{legacy::Message, CompiledInstruction, SanitizeError},
    wallet_serialize_utils::{
        read_short_vec, short_vec_size, write_short_vec, Cursor, DecodeError, WireDecode,
        WireEncode,
    },
    wallet_signature::Signature,
    wallet_signer::{SignerError, Signers},
};

mod builder;
mod error;
pub mod versioned;

pub use {
    builder::{NonceInfo, SignaturePubkeyPair, TransactionBuilder},
    error::{TransactionError, TransactionResult},
    versioned::{Legacy, TransactionVersion, VersionedTransaction},
};

/// Maximum over-the-wire size of a transaction. 1280 is the IPv6 minimum
/// MTU; 40 bytes is the size of the IPv6 header and 8 bytes is the size of
/// the fragment header.
pub const PACKET_DATA_SIZE: usize = 1280 - 40 - 8;

/// Position of the advance-nonce instruction in a durable-nonce transaction.
pub const NONCED_TX_MARKER_IX_INDEX: u8 = 0;

/// An atomic transaction over a legacy message.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(try_from = "SerdeTransaction")
)]
#[derive(Debug, PartialEq, Default, Eq, Clone)]
pub struct Transaction {
    /// A set of signatures of a serialized [`Message`], signed by the first
    /// keys of the `Message`'s [`account_keys`], where the number of signatures
    /// is equal to [`num_required_signatures`] of the `Message`'s
    /// [`MessageHeader`].
    ///
    /// [`account_keys`]: Message::account_keys
    /// [`MessageHeader`]: wallet_message::MessageHeader
    /// [`num_required_signatures`]: wallet_message::MessageHeader::num_required_signatures
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub signatures: Vec<Signature>,

    /// The message to sign.
    pub message: Message,
}

impl Transaction {
    /// Creates a transaction with every signature slot empty.
    pub fn new_unsigned(message: Message) -> Self {
        Self {
            signatures: vec![
                Signature::default();
                usize::from(message.header.num_required_signatures)
            ],
            message,
        }
    }

    /// Pairs a message with existing signatures, one per required signer.
    pub fn try_new(signatures: Vec<Signature>, message: Message) -> TransactionResult<Self> {
        check_signatures_count(
            usize::from(message.header.num_required_signatures),
            signatures.len(),
        )?;
        Ok(Self {
            signatures,
            message,
        })
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Return the serialized message data to sign.
    pub fn message_data(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Keys whose signatures the message requires, in slot order.
    pub fn signer_keys(&self) -> &[Address] {
        let num_signers = self
            .message
            .account_keys
            .len()
            .min(usize::from(self.message.header.num_required_signatures));
        &self.message.account_keys[..num_signers]
    }

    /// Places `signature` in the slot belonging to `pubkey`.
    pub fn add_signature(&mut self, pubkey: &Address, signature: Signature) -> TransactionResult<()> {
        let index = self
            .signer_keys()
            .iter()
            .position(|key| key == pubkey)
            .ok_or(TransactionError::SignerIsNotRequired(*pubkey))?;
        let expected = usize::from(self.message.header.num_required_signatures);
        let actual = self.signatures.len();
        let slot = self
            .signatures
            .get_mut(index)
            .ok_or(TransactionError::InvalidSignaturesCount { expected, actual })?;
        debug!("filling signature slot {index} for {pubkey}");
        *slot = signature;
        Ok(())
    }

    /// Like [`Transaction::add_signature`], for a signature still in raw
    /// bytes.
    pub fn add_signature_bytes(&mut self, pubkey: &Address, signature: &[u8]) -> TransactionResult<()> {
        let signature =
            Signature::try_from(signature).map_err(|_| TransactionError::InvalidSignature)?;
        self.add_signature(pubkey, signature)
    }

    /// Sign the transaction with every required signer.
    ///
    /// # Errors
    ///
    /// Fails with [`TransactionError::NoSigners`] if `keypairs` is empty,
    /// with [`SignerError::NotEnoughSigners`] if some slot is still empty
    /// afterwards, and for any reason [`Transaction::try_partial_sign`] fails.
    pub fn try_sign<T: Signers + ?Sized>(&mut self, keypairs: &T) -> TransactionResult<()> {
        self.try_partial_sign(keypairs)?;
        if !self.is_signed() {
            return Err(SignerError::NotEnoughSigners.into());
        }
        Ok(())
    }

    /// Sign the transaction with a subset of required keys.
    ///
    /// It is permitted to sign a transaction with the same keypair multiple
    /// times.
    ///
    /// # Errors
    ///
    /// Fails with [`SignerError::KeypairPubkeyMismatch`] if any signer is not
    /// a required signer of the message, and with whatever error a signer
    /// reports while signing.
    pub fn try_partial_sign<T: Signers + ?Sized>(&mut self, keypairs: &T) -> TransactionResult<()> {
        let pubkeys = keypairs.try_pubkeys()?;
        if pubkeys.is_empty() {
            return Err(TransactionError::NoSigners);
        }
        let positions = self.get_signing_keypair_positions(&pubkeys)?;
        let signatures = keypairs.try_sign_message(&self.message_data())?;
        for (position, signature) in positions.into_iter().zip(signatures) {
            if let Some(slot) = self.signatures.get_mut(position) {
                *slot = signature;
            }
        }
        Ok(())
    }

    /// Get the positions of the pubkeys in `account_keys` associated with
    /// signing keypairs.
    ///
    /// [`account_keys`]: Message::account_keys
    pub fn get_signing_keypair_positions(&self, pubkeys: &[Address]) -> TransactionResult<Vec<usize>> {
        let signer_keys = self.signer_keys();
        pubkeys
            .iter()
            .map(|pubkey| {
                signer_keys
                    .iter()
                    .position(|key| key == pubkey)
                    .ok_or(TransactionError::Signer(
                        SignerError::KeypairPubkeyMismatch,
                    ))
            })
            .collect()
    }

    /// Returns true if every signature slot is filled.
    pub fn is_signed(&self) -> bool {
        self.signatures
            .iter()
            .all(|signature| !signature.is_default())
    }

    /// Checks signatures against the required signers.
    ///
    /// With `require_all_signatures`, every slot must hold a valid signature.
    /// Otherwise empty slots are skipped and only signatures already present
    /// are checked, so a partially signed transaction can be inspected
    /// between signers. A slot count that does not match the header fails in
    /// both modes.
    pub fn verify_signatures(&self, require_all_signatures: bool) -> TransactionResult<()> {
        verify_signature_slots(
            &self.signatures,
            &self.message.account_keys,
            usize::from(self.message.header.num_required_signatures),
            &self.message_data(),
            require_all_signatures,
        )
    }

    /// Returns true if the transaction begins with an advance nonce
    /// instruction.
    pub fn uses_durable_nonce(&self) -> bool {
        let message = &self.message;
        message
            .instructions
            .get(usize::from(NONCED_TX_MARKER_IX_INDEX))
            .is_some_and(|instruction| {
                is_durable_nonce_instruction(instruction, &message.account_keys)
                    && matches!(
                        instruction.accounts.first().map(|index| usize::from(*index)),
                        Some(index)
                            if index < message.account_keys.len()
                                && message.is_account_writable(index)
                    )
            })
    }

    pub fn sanitize(&self) -> Result<(), SanitizeError> {
        sanitize_signatures(
            usize::from(self.message.header.num_required_signatures),
            self.message.account_keys.len(),
            self.signatures.len(),
        )?;
        self.message.sanitize()
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.to_wire_bytes()
    }

    pub fn serialized_size(&self) -> usize {
        self.wire_size()
    }

    /// Returns true if the serialized transaction fits in one packet.
    pub fn fits_in_packet(&self) -> bool {
        self.serialized_size() <= PACKET_DATA_SIZE
    }

    /// The blockhash or durable nonce value this transaction is bound to.
    pub fn recent_blockhash(&self) -> &Hash {
        &self.message.recent_blockhash
    }
}

impl WireEncode for Transaction {
    fn wire_size(&self) -> usize {
        short_vec_size(&self.signatures).saturating_add(self.message.wire_size())
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        write_short_vec(&self.signatures, buf);
        self.message.write_to(buf);
    }
}

impl WireDecode for Transaction {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let signatures: Vec<Signature> = read_short_vec(cursor)?;
        let message = Message::read_from(cursor)?;
        if signatures.len() != usize::from(message.header.num_required_signatures) {
            return Err(DecodeError::InvalidValue(
                "signature count does not match required signatures",
            ));
        }
        Ok(Self {
            signatures,
            message,
        })
    }
}

/// Field layout of [`Transaction`] before the signature count is checked.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct SerdeTransaction {
    #[serde(with = "wallet_short_vec")]
    signatures: Vec<Signature>,
    message: Message,
}

#[cfg(feature = "serde")]
impl TryFrom<SerdeTransaction> for Transaction {
    type Error = TransactionError;

    fn try_from(transaction: SerdeTransaction) -> Result<Self, Self::Error> {
        Self::try_new(transaction.signatures, transaction.message)
    }
}

pub(crate) fn check_signatures_count(expected: usize, actual: usize) -> TransactionResult<()> {
    if expected != actual {
        return Err(TransactionError::InvalidSignaturesCount { expected, actual });
    }
    Ok(())
}

pub(crate) fn sanitize_signatures(
    num_required_signatures: usize,
    num_static_account_keys: usize,
    num_signatures: usize,
) -> Result<(), SanitizeError> {
    match num_required_signatures.cmp(&num_signatures) {
        Ordering::Greater => Err(SanitizeError::IndexOutOfBounds),
        Ordering::Less => Err(SanitizeError::InvalidValue),
        Ordering::Equal => Ok(()),
    }?;

    // Signatures are verified before message keys are loaded so all signers
    // must correspond to static account keys.
    if num_signatures > num_static_account_keys {
        return Err(SanitizeError::IndexOutOfBounds);
    }

    Ok(())
}

/// Returns true if `instruction` advances a durable nonce.
pub(crate) fn is_durable_nonce_instruction(
    instruction: &CompiledInstruction,
    static_account_keys: &[Address],
) -> bool {
    instruction
        .program_id(static_account_keys)
        .is_some_and(|program_id| is_advance_nonce_account(program_id, &instruction.data))
}

pub(crate) fn verify_signature_slots(
    signatures: &[Signature],
    static_account_keys: &[Address],
    num_required_signatures: usize,
    message_bytes: &[u8],
    require_all_signatures: bool,
) -> TransactionResult<()> {
    check_signatures_count(num_required_signatures, signatures.len())?;
    if static_account_keys.len() < num_required_signatures {
        return Err(TransactionError::Sanitize(SanitizeError::IndexOutOfBounds));
    }
    for (signature, pubkey) in signatures.iter().zip(static_account_keys) {
        if signature.is_default() {
            if require_all_signatures {
                return Err(TransactionError::MissingSignature(*pubkey));
            }
            warn!("skipping verification of absent signature for {pubkey}");
            continue;
        }
        if !verify_signature(signature, pubkey, message_bytes) {
            return Err(TransactionError::SignatureFailure(*pubkey));
        }
    }
    Ok(())
}

#[cfg(feature = "verify")]
fn verify_signature(signature: &Signature, pubkey: &Address, message_bytes: &[u8]) -> bool {
    signature.verify(pubkey.as_ref(), message_bytes)
}

/// Without ed25519 support only slot assignment is checked.
#[cfg(not(feature = "verify"))]
fn verify_signature(_signature: &Signature, _pubkey: &Address, _message_bytes: &[u8]) -> bool {
    true
}
