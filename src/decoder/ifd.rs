//! Function for reading TIFF tags

use std::{collections::HashMap, convert::TryFrom};

use log::trace;

use super::{
  stream::{ByteOrder, EndianReader, SmartReader},
  Limits,
};
use crate::{
  tags::{Tag, Type},
  TiffError, TiffFormatError, TiffResult,
};

use self::Value::{
  Ascii, Byte, Double, Float, List, Long, Rational, SByte, SLong, SRational, SShort, Short,
  Undefined,
};

/// Size of a directory entry: tag, type, count and value/offset.
const ENTRY_SIZE: usize = 12;

/// Number of bytes of an entry that can hold the value itself.
const INLINE_SIZE: usize = 4;

#[allow(unused_qualifications)]
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
  Byte(u8),
  Short(u16),
  SByte(i8),
  SShort(i16),
  Long(u32),
  SLong(i32),
  Float(f32),
  Double(f64),
  Rational(u32, u32),
  SRational(i32, i32),
  Undefined(u8),
  List(Vec<Value>),
  Ascii(String),
}

impl Value {
  pub fn into_u16(self) -> TiffResult<u16> {
    match self {
      Byte(val) => Ok(val.into()),
      Short(val) => Ok(val),
      Long(val) => Ok(u16::try_from(val)?),
      val => Err(TiffFormatError::UnexpectedValue(val).into()),
    }
  }

  pub fn into_u32(self) -> TiffResult<u32> {
    match self {
      Byte(val) => Ok(val.into()),
      Short(val) => Ok(val.into()),
      Long(val) => Ok(val),
      val => Err(TiffFormatError::UnexpectedValue(val).into()),
    }
  }

  pub fn into_f64(self) -> TiffResult<f64> {
    match self {
      Float(val) => Ok(val.into()),
      Double(val) => Ok(val),
      Rational(num, den) => Ok(f64::from(num) / f64::from(den)),
      SRational(num, den) => Ok(f64::from(num) / f64::from(den)),
      Short(val) => Ok(val.into()),
      Long(val) => Ok(val.into()),
      val => Err(TiffFormatError::UnexpectedValue(val).into()),
    }
  }

  pub fn into_string(self) -> TiffResult<String> {
    match self {
      Ascii(val) => Ok(val),
      val => Err(TiffFormatError::UnexpectedValue(val).into()),
    }
  }

  pub fn into_u32_vec(self) -> TiffResult<Vec<u32>> {
    match self {
      List(vec) => vec.into_iter().map(Value::into_u32).collect(),
      val => Ok(vec![val.into_u32()?]),
    }
  }

  pub fn into_f64_vec(self) -> TiffResult<Vec<f64>> {
    match self {
      List(vec) => vec.into_iter().map(Value::into_f64).collect(),
      val => Ok(vec![val.into_f64()?]),
    }
  }
}

/// One decoded directory entry.
///
/// A field only describes where its values live; nothing is copied out of the buffer until
/// a [`FieldView`] is asked for a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
  tag: Tag,
  type_: Type,
  count: u32,
  data_offset: u32,
  subfile: usize,
}

impl Field {
  /// Parses the entry at `position`, belonging to the subfile with index `subfile`.
  // An IFD entry has four fields:
  //
  // Tag   2 bytes
  // Type  2 bytes
  // Count 4 bytes
  // Value 4 bytes either a pointer the value itself
  pub(crate) fn read(
    reader: &SmartReader<'_>, position: usize, subfile: usize,
  ) -> TiffResult<Field> {
    let tag = Tag::from_u16_exhaustive(reader.read_u16(position)?);
    let type_code = reader.read_u16(position + 2)?;
    let type_ = Type::from_u16(type_code).ok_or(TiffFormatError::UnknownValueType(type_code))?;
    let count = reader.read_u32(position + 4)?;

    let value_position = position + 8;
    let size = u64::from(count) * type_.size() as u64;
    let data_offset = if size <= INLINE_SIZE as u64 {
      u32::try_from(value_position)?
    } else {
      reader.read_u32(value_position)?
    };

    trace!("field {} {} x{} at {}", tag, type_, count, data_offset);
    Ok(Field { tag, type_, count, data_offset, subfile })
  }

  pub fn tag(&self) -> Tag {
    self.tag
  }

  pub fn field_type(&self) -> Type {
    self.type_
  }

  pub fn count(&self) -> u32 {
    self.count
  }

  /// Absolute buffer position of the first value.
  pub fn data_offset(&self) -> u32 {
    self.data_offset
  }

  /// Index of the owning subfile in [`Decoder::subfiles`](super::Decoder::subfiles).
  pub fn subfile_index(&self) -> usize {
    self.subfile
  }

  /// Size of the data region in bytes.
  pub fn size(&self) -> usize {
    self.count as usize * self.type_.size()
  }

  /// Resolves the data region of this field inside `reader`'s buffer.
  pub(crate) fn view<'a>(
    &self, reader: &SmartReader<'a>, limits: &Limits,
  ) -> TiffResult<FieldView<'a>> {
    let len = self.size();
    if len > limits.ifd_value_size {
      return Err(TiffError::LimitsExceeded);
    }
    let data = reader.slice(self.data_offset as usize, len)?;
    Ok(FieldView {
      tag: self.tag,
      type_: self.type_,
      count: self.count as usize,
      data,
      byte_order: reader.byte_order,
    })
  }
}

/// A bounded window over the values of one [`Field`].
///
/// Indices are relative to the start of the field's data, so the view can be handed around
/// without knowing where in the file the values are stored.
#[derive(Clone, Copy, Debug)]
pub struct FieldView<'a> {
  tag: Tag,
  type_: Type,
  count: usize,
  data: &'a [u8],
  byte_order: ByteOrder,
}

impl<'a> FieldView<'a> {
  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn field_type(&self) -> Type {
    self.type_
  }

  pub fn as_bytes(&self) -> &'a [u8] {
    self.data
  }

  fn reader(&self) -> SmartReader<'a> {
    SmartReader::wrap(self.data, self.byte_order)
  }

  /// Reads element `index` of a SHORT or LONG field.
  ///
  /// Dimension, offset and count tags may use either width; every other type is malformed.
  pub fn uint(&self, index: usize) -> TiffResult<u32> {
    let position = index * self.type_.size();
    match self.type_ {
      Type::SHORT => Ok(self.reader().read_u16(position)?.into()),
      Type::LONG => self.reader().read_u32(position),
      _ => Err(TiffFormatError::InvalidTagEncoding(self.tag, self.type_).into()),
    }
  }

  /// Reads all elements of a SHORT or LONG field.
  pub fn uints(&self) -> TiffResult<Vec<u32>> {
    let mut values = Vec::with_capacity(self.count);
    for index in 0..self.count {
      values.push(self.uint(index)?);
    }
    Ok(values)
  }

  /// Reads element `index` of a RATIONAL field as `(numerator, denominator)`.
  pub fn rational(&self, index: usize) -> TiffResult<(u32, u32)> {
    if self.type_ != Type::RATIONAL {
      return Err(TiffFormatError::InvalidTagEncoding(self.tag, self.type_).into());
    }
    let position = index * self.type_.size();
    let reader = self.reader();
    Ok((reader.read_u32(position)?, reader.read_u32(position + 4)?))
  }

  /// Reads element `index` of a DOUBLE field.
  pub fn double(&self, index: usize) -> TiffResult<f64> {
    if self.type_ != Type::DOUBLE {
      return Err(TiffFormatError::InvalidTagEncoding(self.tag, self.type_).into());
    }
    self.reader().read_f64(index * self.type_.size())
  }

  /// Decodes element `index` according to the declared type.
  pub fn element(&self, index: usize) -> TiffResult<Value> {
    let reader = self.reader();
    let position = index * self.type_.size();
    Ok(match self.type_ {
      Type::BYTE => Byte(reader.read_u8(position)?),
      Type::ASCII => Byte(reader.read_u8(position)?),
      Type::UNDEFINED => Undefined(reader.read_u8(position)?),
      Type::SBYTE => SByte(reader.read_i8(position)?),
      Type::SHORT => Short(reader.read_u16(position)?),
      Type::SSHORT => SShort(reader.read_i16(position)?),
      Type::LONG => Long(reader.read_u32_raw(position)?),
      Type::SLONG => SLong(reader.read_i32(position)?),
      Type::FLOAT => Float(reader.read_f32(position)?),
      Type::DOUBLE => Double(reader.read_f64(position)?),
      Type::RATIONAL => {
        Rational(reader.read_u32_raw(position)?, reader.read_u32_raw(position + 4)?)
      }
      Type::SRATIONAL => SRational(reader.read_i32(position)?, reader.read_i32(position + 4)?),
    })
  }

  /// Decodes the whole field. Single elements are returned bare, ASCII as a string.
  pub fn value(&self) -> TiffResult<Value> {
    if self.type_ == Type::ASCII {
      let mut out = self.data.to_vec();
      // Strings may be null-terminated, so we trim anything downstream of the null byte
      if let Some(first) = out.iter().position(|&b| b == 0) {
        out.truncate(first);
      }
      return String::from_utf8(out)
        .map(Ascii)
        .map_err(|_| TiffFormatError::InvalidTagEncoding(self.tag, self.type_).into());
    }

    if self.count == 1 {
      return self.element(0);
    }

    let mut values = Vec::with_capacity(self.count);
    for index in 0..self.count {
      values.push(self.element(index)?);
    }
    Ok(List(values))
  }
}

/// Type representing an Image File Directory
pub type Directory = HashMap<Tag, Field>;

/// Reads the directory at `offset` and returns it together with the next IFD offset.
pub(crate) fn read_directory(
  reader: &SmartReader<'_>, offset: usize, subfile: usize,
) -> TiffResult<(Directory, u32)> {
  let num_tags = usize::from(reader.read_u16(offset)?);
  let first_entry = offset + 2;

  let mut dir: Directory = HashMap::with_capacity(num_tags);
  for i in 0..num_tags {
    let field = Field::read(reader, first_entry + i * ENTRY_SIZE, subfile)?;
    dir.insert(field.tag, field);
  }

  let next_ifd = reader.read_u32(first_entry + num_tags * ENTRY_SIZE)?;
  Ok((dir, next_ifd))
}
