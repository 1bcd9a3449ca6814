//! All buffer access needed for TIFF decoding

use crate::{TiffFormatError, TiffResult};

/// Byte order of the TIFF file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
  /// little endian byte order
  LittleEndian,
  /// big endian byte order
  BigEndian,
}

/// Reader that is aware of the byte order.
///
/// Every read addresses an absolute position of the underlying buffer; there is no cursor.
pub trait EndianReader {
  /// Byte order that should be adhered to
  fn byte_order(&self) -> ByteOrder;

  /// Returns the `len` bytes starting at `position`.
  fn bytes(&self, position: usize, len: usize) -> TiffResult<&[u8]>;

  /// Reads an u8
  #[inline(always)]
  fn read_u8(&self, position: usize) -> TiffResult<u8> {
    Ok(self.bytes(position, 1)?[0])
  }

  /// Reads an u16
  #[inline(always)]
  fn read_u16(&self, position: usize) -> TiffResult<u16> {
    let mut n = [0u8; 2];
    n.copy_from_slice(self.bytes(position, 2)?);
    Ok(match self.byte_order() {
      ByteOrder::LittleEndian => u16::from_le_bytes(n),
      ByteOrder::BigEndian => u16::from_be_bytes(n),
    })
  }

  /// Reads an u32 and rejects values that do not fit a signed 32-bit offset.
  ///
  /// Counts and offsets are used as buffer positions, so anything above `i32::MAX` is treated
  /// as malformed rather than wrapped.
  #[inline(always)]
  fn read_u32(&self, position: usize) -> TiffResult<u32> {
    let value = self.read_u32_raw(position)?;
    if value > i32::MAX as u32 {
      return Err(TiffFormatError::OffsetOutOfRange(value).into());
    }
    Ok(value)
  }

  /// Reads an u32 without the offset range check
  #[inline(always)]
  fn read_u32_raw(&self, position: usize) -> TiffResult<u32> {
    let mut n = [0u8; 4];
    n.copy_from_slice(self.bytes(position, 4)?);
    Ok(match self.byte_order() {
      ByteOrder::LittleEndian => u32::from_le_bytes(n),
      ByteOrder::BigEndian => u32::from_be_bytes(n),
    })
  }

  /// Reads an u64
  #[inline(always)]
  fn read_u64(&self, position: usize) -> TiffResult<u64> {
    let mut n = [0u8; 8];
    n.copy_from_slice(self.bytes(position, 8)?);
    Ok(match self.byte_order() {
      ByteOrder::LittleEndian => u64::from_le_bytes(n),
      ByteOrder::BigEndian => u64::from_be_bytes(n),
    })
  }

  /// Reads an i8
  #[inline(always)]
  fn read_i8(&self, position: usize) -> TiffResult<i8> {
    Ok(self.read_u8(position)? as i8)
  }

  /// Reads an i16
  #[inline(always)]
  fn read_i16(&self, position: usize) -> TiffResult<i16> {
    Ok(self.read_u16(position)? as i16)
  }

  /// Reads an i32
  #[inline(always)]
  fn read_i32(&self, position: usize) -> TiffResult<i32> {
    Ok(self.read_u32_raw(position)? as i32)
  }

  /// Reads an f32
  #[inline(always)]
  fn read_f32(&self, position: usize) -> TiffResult<f32> {
    Ok(f32::from_bits(self.read_u32_raw(position)?))
  }

  /// Reads an f64
  #[inline(always)]
  fn read_f64(&self, position: usize) -> TiffResult<f64> {
    Ok(f64::from_bits(self.read_u64(position)?))
  }
}

/// Reader that is aware of the byte order.
#[derive(Debug, Clone, Copy)]
pub struct SmartReader<'a> {
  buffer: &'a [u8],
  pub byte_order: ByteOrder,
}

impl<'a> SmartReader<'a> {
  /// Wraps a buffer
  pub fn wrap(buffer: &'a [u8], byte_order: ByteOrder) -> SmartReader<'a> {
    SmartReader { buffer, byte_order }
  }

  /// Same as [`EndianReader::bytes`], but the slice borrows the buffer rather than the reader.
  pub fn slice(&self, position: usize, len: usize) -> TiffResult<&'a [u8]> {
    position
      .checked_add(len)
      .and_then(|end| self.buffer.get(position..end))
      .ok_or_else(|| TiffFormatError::UnexpectedEof { position, len }.into())
  }
}

impl<'a> EndianReader for SmartReader<'a> {
  #[inline(always)]
  fn byte_order(&self) -> ByteOrder {
    self.byte_order
  }

  #[inline]
  fn bytes(&self, position: usize, len: usize) -> TiffResult<&[u8]> {
    self.slice(position, len)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::TiffError;

  #[test]
  fn reads_respect_byte_order() {
    let data = [0x12, 0x34, 0x56, 0x78];
    let le = SmartReader::wrap(&data, ByteOrder::LittleEndian);
    let be = SmartReader::wrap(&data, ByteOrder::BigEndian);

    assert_eq!(le.read_u16(0).unwrap(), 0x3412);
    assert_eq!(be.read_u16(0).unwrap(), 0x1234);
    assert_eq!(le.read_u32(0).unwrap(), 0x7856_3412);
    assert_eq!(be.read_u32(0).unwrap(), 0x1234_5678);
    assert_eq!(be.read_u16(2).unwrap(), 0x5678);
  }

  #[test]
  fn u16_is_not_sign_extended() {
    let data = [0xff, 0xfe];
    let reader = SmartReader::wrap(&data, ByteOrder::BigEndian);
    assert_eq!(reader.read_u16(0).unwrap(), 0xfffe);
    assert_eq!(u32::from(reader.read_u16(0).unwrap()), 65534);
  }

  #[test]
  fn u32_beyond_signed_range_is_rejected() {
    let max = i32::MAX.to_le_bytes();
    let reader = SmartReader::wrap(&max, ByteOrder::LittleEndian);
    assert_eq!(reader.read_u32(0).unwrap(), i32::MAX as u32);

    let over = (i32::MAX as u32 + 1).to_le_bytes();
    let reader = SmartReader::wrap(&over, ByteOrder::LittleEndian);
    match reader.read_u32(0) {
      Err(TiffError::FormatError(TiffFormatError::OffsetOutOfRange(0x8000_0000))) => {}
      other => panic!("unexpected {:?}", other),
    }
    assert_eq!(reader.read_u32_raw(0).unwrap(), 0x8000_0000);
  }

  #[test]
  fn reads_past_the_end_fail() {
    let data = [1, 2, 3];
    let reader = SmartReader::wrap(&data, ByteOrder::LittleEndian);
    match reader.read_u32(0) {
      Err(TiffError::FormatError(TiffFormatError::UnexpectedEof { position: 0, len: 4 })) => {}
      other => panic!("unexpected {:?}", other),
    }
    assert!(reader.read_u16(2).is_err());
    assert!(reader.slice(usize::MAX, 2).is_err());
  }
}
