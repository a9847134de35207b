//! Defines a transaction which supports multiple versions of messages.

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    crate::{
        check_signatures_count, is_durable_nonce_instruction, sanitize_signatures,
        verify_signature_slots, Transaction, TransactionError, TransactionResult,
        NONCED_TX_MARKER_IX_INDEX,
    },
    log::debug,
    std::cmp::Ordering,
    wallet_address::Address,
    wallet_message::{MessageVersion, SanitizeError, VersionedMessage},
    wallet_serialize_utils::{
        read_short_vec, short_vec_size, write_short_vec, Cursor, DecodeError, WireDecode,
        WireEncode,
    },
    wallet_signature::{Signature, SIGNATURE_BYTES},
    wallet_signer::{SignerError, Signers},
};

/// Type that serializes to the string "legacy"
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase")
)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Legacy {
    Legacy,
}

#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase", untagged)
)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionVersion {
    Legacy(Legacy),
    Number(u8),
}

impl TransactionVersion {
    pub const LEGACY: Self = Self::Legacy(Legacy::Legacy);
}

/// An atomic transaction
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(try_from = "SerdeVersionedTransaction")
)]
#[derive(Debug, PartialEq, Default, Eq, Clone)]
pub struct VersionedTransaction {
    /// List of signatures
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub signatures: Vec<Signature>,
    /// Message to sign.
    pub message: VersionedMessage,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct SerdeVersionedTransaction {
    #[serde(with = "wallet_short_vec")]
    signatures: Vec<Signature>,
    message: VersionedMessage,
}

#[cfg(feature = "serde")]
impl TryFrom<SerdeVersionedTransaction> for VersionedTransaction {
    type Error = TransactionError;

    fn try_from(transaction: SerdeVersionedTransaction) -> Result<Self, Self::Error> {
        Self::try_from_parts(transaction.signatures, transaction.message)
    }
}

impl From<Transaction> for VersionedTransaction {
    fn from(transaction: Transaction) -> Self {
        Self {
            signatures: transaction.signatures,
            message: VersionedMessage::Legacy(transaction.message),
        }
    }
}

impl VersionedTransaction {
    /// Signs a versioned message and if successful, returns a signed
    /// transaction.
    pub fn try_new<T: Signers + ?Sized>(
        message: VersionedMessage,
        keypairs: &T,
    ) -> Result<Self, SignerError> {
        let static_account_keys = message.static_account_keys();
        let num_required_signatures = usize::from(message.header().num_required_signatures);
        let expected_signer_keys = static_account_keys
            .get(..num_required_signatures)
            .ok_or_else(|| SignerError::InvalidInput("invalid message".to_string()))?;

        let signer_keys = keypairs.try_pubkeys()?;
        match signer_keys.len().cmp(&expected_signer_keys.len()) {
            Ordering::Greater => Err(SignerError::TooManySigners),
            Ordering::Less => Err(SignerError::NotEnoughSigners),
            Ordering::Equal => Ok(()),
        }?;

        let message_data = message.serialize();
        let signature_indexes: Vec<usize> = expected_signer_keys
            .iter()
            .map(|signer_key| {
                signer_keys
                    .iter()
                    .position(|key| key == signer_key)
                    .ok_or(SignerError::KeypairPubkeyMismatch)
            })
            .collect::<Result<_, SignerError>>()?;

        let unordered_signatures = keypairs.try_sign_message(&message_data)?;
        let signatures: Vec<Signature> = signature_indexes
            .into_iter()
            .map(|index| {
                unordered_signatures
                    .get(index)
                    .copied()
                    .ok_or_else(|| SignerError::InvalidInput("invalid keypairs".to_string()))
            })
            .collect::<Result<_, SignerError>>()?;

        Ok(Self {
            signatures,
            message,
        })
    }

    /// Creates a transaction with every signature slot empty.
    pub fn new_unsigned(message: VersionedMessage) -> Self {
        Self {
            signatures: vec![
                Signature::default();
                usize::from(message.header().num_required_signatures)
            ],
            message,
        }
    }

    /// Pairs a message with existing signatures, one per required signer.
    pub fn try_from_parts(
        signatures: Vec<Signature>,
        message: VersionedMessage,
    ) -> TransactionResult<Self> {
        check_signatures_count(
            usize::from(message.header().num_required_signatures),
            signatures.len(),
        )?;
        Ok(Self {
            signatures,
            message,
        })
    }

    /// Classifies a serialized transaction by its message version without
    /// decoding the message, so payloads of versions this crate cannot
    /// decode can still be recognised.
    pub fn peek_version(bytes: &[u8]) -> Result<MessageVersion, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let num_signatures = cursor.read_short_len()?;
        let signatures_len = num_signatures
            .checked_mul(SIGNATURE_BYTES)
            .ok_or(DecodeError::UnexpectedEnd(bytes.len()))?;
        cursor.read_slice(signatures_len)?;
        cursor
            .peek_u8()
            .map(MessageVersion::from_prefix)
            .ok_or(DecodeError::UnexpectedEnd(bytes.len()))
    }

    /// Keys whose signatures the message requires, in slot order.
    pub fn signer_keys(&self) -> &[Address] {
        self.message.signer_keys()
    }

    /// Places `signature` in the slot belonging to `pubkey`.
    pub fn add_signature(
        &mut self,
        pubkey: &Address,
        signature: Signature,
    ) -> TransactionResult<()> {
        let index = self
            .signer_keys()
            .iter()
            .position(|key| key == pubkey)
            .ok_or(TransactionError::SignerIsNotRequired(*pubkey))?;
        let expected = usize::from(self.message.header().num_required_signatures);
        let actual = self.signatures.len();
        let slot = self
            .signatures
            .get_mut(index)
            .ok_or(TransactionError::InvalidSignaturesCount { expected, actual })?;
        debug!("filling signature slot {index} for {pubkey}");
        *slot = signature;
        Ok(())
    }

    /// Like [`VersionedTransaction::add_signature`], for a signature still
    /// in raw bytes.
    pub fn add_signature_bytes(
        &mut self,
        pubkey: &Address,
        signature: &[u8],
    ) -> TransactionResult<()> {
        let signature =
            Signature::try_from(signature).map_err(|_| TransactionError::InvalidSignature)?;
        self.add_signature(pubkey, signature)
    }

    /// Signs with a subset of the required signers, leaving other slots as
    /// they are.
    ///
    /// # Errors
    ///
    /// Fails with [`TransactionError::NoSigners`] if `keypairs` is empty and
    /// with [`SignerError::KeypairPubkeyMismatch`] if any signer is not a
    /// required signer of the message.
    pub fn try_partial_sign<T: Signers + ?Sized>(
        &mut self,
        keypairs: &T,
    ) -> TransactionResult<()> {
        let pubkeys = keypairs.try_pubkeys()?;
        if pubkeys.is_empty() {
            return Err(TransactionError::NoSigners);
        }
        let signer_keys = self.signer_keys();
        let positions = pubkeys
            .iter()
            .map(|pubkey| {
                signer_keys
                    .iter()
                    .position(|key| key == pubkey)
                    .ok_or(TransactionError::Signer(SignerError::KeypairPubkeyMismatch))
            })
            .collect::<TransactionResult<Vec<usize>>>()?;
        let signatures = keypairs.try_sign_message(&self.message.serialize())?;
        for (position, signature) in positions.into_iter().zip(signatures) {
            if let Some(slot) = self.signatures.get_mut(position) {
                *slot = signature;
            }
        }
        Ok(())
    }

    pub fn sanitize(&self) -> Result<(), SanitizeError> {
        self.message.sanitize()?;
        self.sanitize_signatures()?;
        Ok(())
    }

    pub(crate) fn sanitize_signatures(&self) -> Result<(), SanitizeError> {
        sanitize_signatures(
            usize::from(self.message.header().num_required_signatures),
            self.message.static_account_keys().len(),
            self.signatures.len(),
        )
    }

    /// Returns the version of the transaction
    pub fn version(&self) -> TransactionVersion {
        match self.message.version() {
            MessageVersion::Legacy => TransactionVersion::LEGACY,
            MessageVersion::V0 => TransactionVersion::Number(0),
            MessageVersion::Unknown(version) => TransactionVersion::Number(version),
        }
    }

    /// Returns a legacy transaction if the transaction message is legacy.
    pub fn into_legacy_transaction(self) -> Option<Transaction> {
        match self.message {
            VersionedMessage::Legacy(message) => Some(Transaction {
                signatures: self.signatures,
                message,
            }),
            VersionedMessage::V0(_) => None,
        }
    }

    /// Checks signatures against the required signers; see
    /// [`Transaction::verify_signatures`] for the two modes.
    pub fn verify_signatures(&self, require_all_signatures: bool) -> TransactionResult<()> {
        verify_signature_slots(
            &self.signatures,
            self.message.static_account_keys(),
            usize::from(self.message.header().num_required_signatures),
            &self.message.serialize(),
            require_all_signatures,
        )
    }

    /// Verify the transaction and return a list of verification results
    #[cfg(feature = "verify")]
    pub fn verify_with_results(&self) -> Vec<bool> {
        let message_bytes = self.message.serialize();
        self.signatures
            .iter()
            .zip(self.message.static_account_keys().iter())
            .map(|(signature, pubkey)| signature.verify(pubkey.as_ref(), &message_bytes))
            .collect()
    }

    /// Returns true if transaction begins with an advance nonce instruction.
    pub fn uses_durable_nonce(&self) -> bool {
        let message = &self.message;
        message
            .instructions()
            .get(usize::from(NONCED_TX_MARKER_IX_INDEX))
            .is_some_and(|instruction| {
                is_durable_nonce_instruction(instruction, message.static_account_keys())
                    // the nonce account must be writable
                    && instruction.accounts.first().is_some_and(|index| {
                        message.is_maybe_writable(usize::from(*index), None)
                    })
            })
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.to_wire_bytes()
    }

    pub fn serialized_size(&self) -> usize {
        self.wire_size()
    }
}

impl WireEncode for VersionedTransaction {
    fn wire_size(&self) -> usize {
        short_vec_size(&self.signatures).saturating_add(self.message.wire_size())
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        write_short_vec(&self.signatures, buf);
        self.message.write_to(buf);
    }
}

impl WireDecode for VersionedTransaction {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let signatures: Vec<Signature> = read_short_vec(cursor)?;
        let message = VersionedMessage::read_from(cursor)?;
        if signatures.len() != usize::from(message.header().num_required_signatures) {
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
