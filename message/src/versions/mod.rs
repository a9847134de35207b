use {
    crate::{
        compiled_instruction::CompiledInstruction, legacy::Message as LegacyMessage,
        v0::MessageAddressTableLookup, MessageAccountKeys, MessageHeader, SanitizeError,
        MESSAGE_VERSION_PREFIX,
    },
    std::{collections::HashSet, fmt},
    wallet_address::Address,
    wallet_hash::Hash,
    wallet_serialize_utils::{Cursor, DecodeError, WireDecode, WireEncode},
};
#[cfg(feature = "serde")]
use {
    serde::{
        de::{self, Deserializer, SeqAccess, Unexpected, Visitor},
        ser::{SerializeTuple, Serializer},
    },
    serde_derive::{Deserialize, Serialize},
};

pub mod v0;

/// Message format as identified by the first byte of a serialized message.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MessageVersion {
    Legacy,
    V0,
    /// A versioned prefix with a version this crate does not know.
    Unknown(u8),
}

impl MessageVersion {
    /// Interprets the first byte of a serialized message.
    pub fn from_prefix(byte: u8) -> Self {
        if byte & MESSAGE_VERSION_PREFIX == 0 {
            return Self::Legacy;
        }
        match byte & !MESSAGE_VERSION_PREFIX {
            0 => Self::V0,
            version => Self::Unknown(version),
        }
    }

    /// The prefix byte written ahead of a message of this version, if any.
    pub fn prefix(&self) -> Option<u8> {
        match self {
            Self::Legacy => None,
            Self::V0 => Some(MESSAGE_VERSION_PREFIX),
            Self::Unknown(version) => Some(MESSAGE_VERSION_PREFIX | version),
        }
    }
}

impl fmt::Display for MessageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::V0 => f.write_str("0"),
            Self::Unknown(version) => write!(f, "unknown({version})"),
        }
    }
}

/// Either a legacy message or a v0 message.
///
/// # Serialization
///
/// The first byte decides the format. With the high bit clear it is the
/// legacy header's signer count and the whole encoding is a legacy
/// [`LegacyMessage`]. With the high bit set the low seven bits name the
/// version and the versioned body follows.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum VersionedMessage {
    Legacy(LegacyMessage),
    V0(v0::Message),
}

impl VersionedMessage {
    pub fn version(&self) -> MessageVersion {
        match self {
            Self::Legacy(_) => MessageVersion::Legacy,
            Self::V0(_) => MessageVersion::V0,
        }
    }

    pub fn sanitize(&self) -> Result<(), SanitizeError> {
        match self {
            Self::Legacy(message) => message.sanitize(),
            Self::V0(message) => message.sanitize(),
        }
    }

    pub fn header(&self) -> &MessageHeader {
        match self {
            Self::Legacy(message) => &message.header,
            Self::V0(message) => &message.header,
        }
    }

    pub fn static_account_keys(&self) -> &[Address] {
        match self {
            Self::Legacy(message) => &message.account_keys,
            Self::V0(message) => &message.account_keys,
        }
    }

    pub fn address_table_lookups(&self) -> Option<&[MessageAddressTableLookup]> {
        match self {
            Self::Legacy(_) => None,
            Self::V0(message) => Some(&message.address_table_lookups),
        }
    }

    pub fn fee_payer(&self) -> Option<&Address> {
        self.static_account_keys().first()
    }

    /// Keys that must sign, in signature order.
    pub fn signer_keys(&self) -> &[Address] {
        let keys = self.static_account_keys();
        let num_signers = keys
            .len()
            .min(usize::from(self.header().num_required_signatures));
        &keys[..num_signers]
    }

    /// Returns true if the account at the specified index signed this
    /// message.
    pub fn is_signer(&self, index: usize) -> bool {
        index < usize::from(self.header().num_required_signatures)
    }

    /// Returns true if the account at the specified index is writable by the
    /// instructions in this message. Since dynamically loaded addresses can't
    /// have write locks demoted without loading addresses, this shouldn't be
    /// used in the runtime.
    pub fn is_maybe_writable(
        &self,
        index: usize,
        reserved_account_keys: Option<&HashSet<Address>>,
    ) -> bool {
        match self {
            Self::Legacy(message) => message.is_maybe_writable(index, reserved_account_keys),
            Self::V0(message) => message.is_maybe_writable(index, reserved_account_keys),
        }
    }

    /// Returns true if the account at the specified index is an input to some
    /// program instruction in this message.
    fn is_instruction_account(&self, key_index: usize) -> bool {
        u8::try_from(key_index).is_ok_and(|key_index| {
            self.instructions()
                .iter()
                .any(|ix| ix.accounts.contains(&key_index))
        })
    }

    pub fn is_invoked(&self, key_index: usize) -> bool {
        match self {
            Self::Legacy(message) => message.is_key_called_as_program(key_index),
            Self::V0(message) => message.is_key_called_as_program(key_index),
        }
    }

    /// Returns true if the account at the specified index is not invoked as a
    /// program or, if invoked, is passed to a program.
    pub fn is_non_loader_key(&self, key_index: usize) -> bool {
        !self.is_invoked(key_index) || self.is_instruction_account(key_index)
    }

    pub fn recent_blockhash(&self) -> &Hash {
        match self {
            Self::Legacy(message) => &message.recent_blockhash,
            Self::V0(message) => &message.recent_blockhash,
        }
    }

    pub fn set_recent_blockhash(&mut self, recent_blockhash: Hash) {
        match self {
            Self::Legacy(message) => message.recent_blockhash = recent_blockhash,
            Self::V0(message) => message.recent_blockhash = recent_blockhash,
        }
    }

    /// Program instructions that will be executed in sequence and committed in
    /// one atomic transaction if all succeed.
    #[inline(always)]
    pub fn instructions(&self) -> &[CompiledInstruction] {
        match self {
            Self::Legacy(message) => &message.instructions,
            Self::V0(message) => &message.instructions,
        }
    }

    /// The static key space. Keys loaded through lookup tables are not
    /// included; see [`v0::Message::get_account_keys`] to resolve them.
    pub fn static_keys(&self) -> MessageAccountKeys {
        MessageAccountKeys::new(self.static_account_keys().to_vec(), None)
    }

    /// Serializes the message, including the version prefix for versioned
    /// formats. These are the bytes that get signed.
    pub fn serialize(&self) -> Vec<u8> {
        self.to_wire_bytes()
    }

    pub fn serialized_size(&self) -> usize {
        self.wire_size()
    }
}

impl Default for VersionedMessage {
    fn default() -> Self {
        Self::Legacy(LegacyMessage::default())
    }
}

impl From<LegacyMessage> for VersionedMessage {
    fn from(message: LegacyMessage) -> Self {
        Self::Legacy(message)
    }
}

impl From<v0::Message> for VersionedMessage {
    fn from(message: v0::Message) -> Self {
        Self::V0(message)
    }
}

impl WireEncode for VersionedMessage {
    fn wire_size(&self) -> usize {
        match self {
            Self::Legacy(message) => message.wire_size(),
            Self::V0(message) => message.wire_size().saturating_add(1),
        }
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Legacy(message) => message.write_to(buf),
            Self::V0(message) => {
                buf.push(MESSAGE_VERSION_PREFIX);
                message.write_to(buf);
            }
        }
    }
}

impl WireDecode for VersionedMessage {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        let Some(first_byte) = cursor.peek_u8() else {
            return Err(DecodeError::UnexpectedEnd(
                cursor.position().saturating_add(cursor.remaining()),
            ));
        };
        match MessageVersion::from_prefix(first_byte) {
            MessageVersion::Legacy => LegacyMessage::read_from(cursor).map(Self::Legacy),
            MessageVersion::V0 => {
                cursor.read_u8()?;
                v0::Message::read_from(cursor).map(Self::V0)
            }
            MessageVersion::Unknown(version) => {
                Err(DecodeError::UnsupportedMessageVersion(version))
            }
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for VersionedMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Legacy(message) => {
                let mut seq = serializer.serialize_tuple(1)?;
                seq.serialize_element(message)?;
                seq.end()
            }
            Self::V0(message) => {
                let mut seq = serializer.serialize_tuple(2)?;
                seq.serialize_element(&MESSAGE_VERSION_PREFIX)?;
                seq.serialize_element(message)?;
                seq.end()
            }
        }
    }
}

#[cfg(feature = "serde")]
enum MessagePrefix {
    Legacy(u8),
    Versioned(u8),
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for MessagePrefix {
    fn deserialize<D>(deserializer: D) -> Result<MessagePrefix, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PrefixVisitor;

        impl Visitor<'_> for PrefixVisitor {
            type Value = MessagePrefix;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("message prefix byte")
            }

            // serde_json hands unsigned integers to visit_u64 directly, so
            // the range check lives here rather than in visit_u8.
            fn visit_u64<E: de::Error>(self, value: u64) -> Result<MessagePrefix, E> {
                let byte = u8::try_from(value)
                    .map_err(|_| de::Error::invalid_type(Unexpected::Unsigned(value), &self))?;
                match MessageVersion::from_prefix(byte) {
                    MessageVersion::Legacy => Ok(MessagePrefix::Legacy(byte)),
                    _ => Ok(MessagePrefix::Versioned(byte & !MESSAGE_VERSION_PREFIX)),
                }
            }
        }

        deserializer.deserialize_u8(PrefixVisitor)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for VersionedMessage {
    fn deserialize<D>(deserializer: D) -> Result<VersionedMessage, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MessageVisitor;

        impl<'de> Visitor<'de> for MessageVisitor {
            type Value = VersionedMessage;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("message bytes")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<VersionedMessage, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let prefix: MessagePrefix = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;

                match prefix {
                    MessagePrefix::Legacy(num_required_signatures) => {
                        // The legacy fields that follow the first byte.
                        #[derive(Serialize, Deserialize)]
                        struct RemainingLegacyMessage {
                            pub num_readonly_signed_accounts: u8,
                            pub num_readonly_unsigned_accounts: u8,
                            #[serde(with = "wallet_short_vec")]
                            pub account_keys: Vec<Address>,
                            pub recent_blockhash: Hash,
                            #[serde(with = "wallet_short_vec")]
                            pub instructions: Vec<CompiledInstruction>,
                        }

                        let message: RemainingLegacyMessage = seq
                            .next_element()?
                            .ok_or_else(|| de::Error::invalid_length(1, &self))?;

                        Ok(VersionedMessage::Legacy(LegacyMessage {
                            header: MessageHeader {
                                num_required_signatures,
                                num_readonly_signed_accounts: message.num_readonly_signed_accounts,
                                num_readonly_unsigned_accounts: message
                                    .num_readonly_unsigned_accounts,
                            },
                            account_keys: message.account_keys,
                            recent_blockhash: message.recent_blockhash,
                            instructions: message.instructions,
                        }))
                    }
                    MessagePrefix::Versioned(0) => Ok(VersionedMessage::V0(
                        seq.next_element()?
                            .ok_or_else(|| de::Error::invalid_length(1, &self))?,
                    )),
                    // 0xff opens off-chain messages, which would otherwise
                    // read as version 127.
                    MessagePrefix::Versioned(127) => {
                        Err(de::Error::custom("off-chain messages are not accepted"))
                    }
                    MessagePrefix::Versioned(version) => Err(de::Error::invalid_value(
                        Unexpected::Unsigned(u64::from(version)),
                        &"a valid transaction message version",
                    )),
                }
            }
        }

        deserializer.deserialize_tuple(2, MessageVisitor)
    }
}
