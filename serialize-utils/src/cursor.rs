use {
    crate::DecodeError,
    wallet_short_vec::{decode_len, ShortVecError},
};

/// A read position over a borrowed byte buffer.
///
/// Every read either consumes exactly the bytes it returns or fails without
/// moving the position.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = self
            .peek_u8()
            .ok_or(DecodeError::UnexpectedEnd(self.bytes.len()))?;
        self.offset = self.offset.saturating_add(1);
        Ok(byte)
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let bytes: &'a [u8] = self.bytes;
        let slice = self
            .offset
            .checked_add(len)
            .and_then(|end| bytes.get(self.offset..end))
            .ok_or(DecodeError::UnexpectedEnd(bytes.len()))?;
        self.offset = self.offset.saturating_add(len);
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let slice = self.read_slice(N)?;
        <[u8; N]>::try_from(slice).map_err(|_| DecodeError::UnexpectedEnd(self.bytes.len()))
    }

    /// Reads a short-vec encoded length.
    pub fn read_short_len(&mut self) -> Result<usize, DecodeError> {
        let rest = self.bytes.get(self.offset..).unwrap_or_default();
        let (len, consumed) = decode_len(rest).map_err(|err| match err {
            ShortVecError::Truncated => DecodeError::UnexpectedEnd(self.bytes.len()),
            err => DecodeError::ShortVec(err),
        })?;
        self.offset = self.offset.saturating_add(consumed);
        Ok(len)
    }

    /// Succeeds only if every byte has been consumed.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(DecodeError::TrailingBytes(trailing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, test_case::test_case};

    #[test]
    fn test_reads_advance() {
        let mut cursor = Cursor::new(&[1, 2, 3, 4, 5]);
        assert_eq!(cursor.read_u8(), Ok(1));
        assert_eq!(cursor.read_array::<2>(), Ok([2, 3]));
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.finish(), Err(DecodeError::TrailingBytes(2)));
        assert_eq!(cursor.read_slice(2), Ok(&[4u8, 5][..]));
        assert_eq!(cursor.finish(), Ok(()));
        assert_eq!(cursor.read_u8(), Err(DecodeError::UnexpectedEnd(5)));
    }

    #[test]
    fn test_failed_read_does_not_move() {
        let mut cursor = Cursor::new(&[1, 2]);
        assert_eq!(cursor.read_array::<3>(), Err(DecodeError::UnexpectedEnd(2)));
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_slice(usize::MAX), Err(DecodeError::UnexpectedEnd(2)));
        assert_eq!(cursor.position(), 0);
    }

    #[test_case(&[0x00], 0, 1)]
    #[test_case(&[0x7f, 0xff], 127, 1)]
    #[test_case(&[0x80, 0x01], 128, 2)]
    #[test_case(&[0xac, 0x02, 0x00], 300, 2)]
    #[test_case(&[0x80, 0x80, 0x00], 0, 3; "non-canonical zero")]
    fn test_read_short_len(bytes: &[u8], len: usize, consumed: usize) {
        let mut cursor = Cursor::new(bytes);
        assert_eq!(cursor.read_short_len(), Ok(len));
        assert_eq!(cursor.position(), consumed);
    }

    #[test]
    fn test_read_short_len_truncated() {
        let mut cursor = Cursor::new(&[7, 0x80]);
        assert_eq!(cursor.read_u8(), Ok(7));
        assert_eq!(cursor.read_short_len(), Err(DecodeError::UnexpectedEnd(2)));
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_read_short_len_too_long() {
        let mut cursor = Cursor::new(&[0x80; 11]);
        assert_eq!(
            cursor.read_short_len(),
            Err(DecodeError::ShortVec(ShortVecError::TooLong))
        );
    }
}
