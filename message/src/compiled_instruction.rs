//! Instructions whose account references have been replaced by indexes.
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
use {
    wallet_address::Address,
    wallet_serialize_utils::{
        read_short_bytes, read_short_vec, short_bytes_size, short_vec_size, write_short_bytes,
        write_short_vec, Cursor, DecodeError, WireDecode, WireEncode,
    },
};

/// A compact encoding of an instruction.
///
/// A `CompiledInstruction` is a component of a multi-instruction message. It
/// indexes the unified key space of its message, which for v0 messages also
/// covers the keys loaded from address lookup tables.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(rename_all = "camelCase")
)]
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct CompiledInstruction {
    /// Index into the transaction keys array indicating the program account
    /// that executes this instruction.
    pub program_id_index: u8,
    /// Ordered indices into the transaction keys array indicating which
    /// accounts to pass to the program.
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub accounts: Vec<u8>,
    /// The program input data.
    #[cfg_attr(feature = "serde", serde(with = "wallet_short_vec"))]
    pub data: Vec<u8>,
}

impl CompiledInstruction {
    pub fn new_from_raw_parts(program_id_index: u8, data: Vec<u8>, accounts: Vec<u8>) -> Self {
        Self {
            program_id_index,
            accounts,
            data,
        }
    }

    /// Looks up the program id in `program_ids`, which must be the key list
    /// this instruction was compiled against.
    pub fn program_id<'a>(&self, program_ids: &'a [Address]) -> Option<&'a Address> {
        program_ids.get(usize::from(self.program_id_index))
    }
}

impl WireEncode for CompiledInstruction {
    fn wire_size(&self) -> usize {
        1usize
            .saturating_add(short_vec_size(&self.accounts))
            .saturating_add(short_bytes_size(&self.data))
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.program_id_index);
        write_short_vec(&self.accounts, buf);
        write_short_bytes(&self.data, buf);
    }
}

impl WireDecode for CompiledInstruction {
    fn read_from(cursor: &mut Cursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            program_id_index: cursor.read_u8()?,
            accounts: read_short_vec(cursor)?,
            data: read_short_bytes(cursor)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let instruction = CompiledInstruction::new_from_raw_parts(2, vec![7, 8, 9], vec![0, 1]);
        let bytes = instruction.to_wire_bytes();
        assert_eq!(bytes, vec![2, 2, 0, 1, 3, 7, 8, 9]);
        assert_eq!(bytes.len(), instruction.wire_size());
        assert_eq!(bincode::serialize(&instruction).unwrap(), bytes);
        assert_eq!(CompiledInstruction::from_wire_bytes(&bytes), Ok(instruction));
    }

    #[test]
    fn test_truncated_data() {
        assert_eq!(
            CompiledInstruction::from_wire_bytes(&[2, 0, 3, 7]),
            Err(DecodeError::UnexpectedEnd(4))
        );
    }

    #[test]
    fn test_program_id() {
        let keys = vec![Address::new_unique(), Address::new_unique()];
        let instruction = CompiledInstruction::new_from_raw_parts(1, vec![], vec![]);
        assert_eq!(instruction.program_id(&keys), Some(&keys[1]));
        assert_eq!(instruction.program_id(&keys[..1]), None);
    }
}
