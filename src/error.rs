use std::{error::Error, fmt, num::TryFromIntError};

use crate::{
  decoder::ifd::Value,
  tags::{CompressionMethod, PlanarConfiguration, Tag, Type},
};

/// Tiff error kinds.
#[derive(Debug)]
pub enum TiffError {
  /// The Image is not formatted properly.
  FormatError(TiffFormatError),

  /// The Decoder does not support features required by the image.
  UnsupportedError(TiffUnsupportedError),

  /// The Limits of the Decoder is exceeded.
  LimitsExceeded,

  /// An integer conversion to or from a platform size failed, either due to
  /// limits of the platform size or limits of the format.
  IntSizeError,

  /// The image does not support the requested operation
  UsageError(UsageError),
}

/// The image is not formatted properly.
///
/// This indicates that the buffer does not adhere to the TIFF 6.0 layout rules
/// this crate relies on.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TiffFormatError {
  /// The first two bytes are neither `II` nor `MM`.
  BadByteOrderMarker([u8; 2]),
  /// The version word is not 42.
  UnsupportedVersion(u16),
  /// A 32-bit value does not fit a signed 32-bit offset.
  OffsetOutOfRange(u32),
  UnknownValueType(u16),
  MissingRequiredTag(Tag),
  InvalidTagEncoding(Tag, Type),
  UnexpectedValue(Value),
  /// A read of `len` bytes at `position` runs past the end of the buffer.
  UnexpectedEof { position: usize, len: usize },
  InvalidDimensions(u32, u32),
  SamplesPerPixelIsZero,
  InconsistentSizesEncountered,
  CycleInOffsets,
}

impl fmt::Display for TiffFormatError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    use self::TiffFormatError::*;
    match *self {
      BadByteOrderMarker(marker) => {
        write!(fmt, "TIFF byte order marker not found, got {:?}", marker)
      }
      UnsupportedVersion(version) => write!(fmt, "Unsupported TIFF version {}.", version),
      OffsetOutOfRange(value) => {
        write!(fmt, "Value {} exceeds the addressable offset range.", value)
      }
      UnknownValueType(code) => write!(fmt, "Unknown IFD value type {}.", code),
      MissingRequiredTag(ref tag) => write!(fmt, "Required tag `{:?}` not found.", tag),
      InvalidTagEncoding(ref tag, ref type_) => {
        write!(fmt, "Tag `{:?}` cannot be decoded from values of type {}.", tag, type_)
      }
      UnexpectedValue(ref value) => write!(fmt, "Unexpected IFD value {:?}.", value),
      UnexpectedEof { position, len } => {
        write!(fmt, "Read of {} bytes at position {} exceeds the buffer.", len, position)
      }
      InvalidDimensions(width, height) => write!(fmt, "Invalid dimensions: {}x{}.", width, height),
      SamplesPerPixelIsZero => write!(fmt, "Samples per pixel is zero"),
      InconsistentSizesEncountered => write!(fmt, "Inconsistent sizes encountered."),
      CycleInOffsets => write!(fmt, "File contained a cycle in the list of IFDs"),
    }
  }
}

/// The Decoder does not support features required by the image.
///
/// This only captures known failures for which the standard either does not require support or an
/// implementation has been planned but not yet completed. Some variants may become unused over
/// time and will then get deprecated before being removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TiffUnsupportedError {
  UnsupportedCompression(CompressionMethod),
  UnsupportedPlanarConfiguration(PlanarConfiguration),
  UnsupportedBitsPerPixel(u32),
}

impl fmt::Display for TiffUnsupportedError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    use self::TiffUnsupportedError::*;
    match *self {
      UnsupportedCompression(method) => {
        write!(fmt, "Compression method {} is unsupported", method)
      }
      UnsupportedPlanarConfiguration(config) => {
        write!(fmt, "Unsupported planar configuration “{}”.", config)
      }
      UnsupportedBitsPerPixel(bits) => {
        write!(fmt, "{} bits per pixel do not fill whole bytes", bits)
      }
    }
  }
}

/// User attempted to use the Decoder in a way that is incompatible with a specific image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsageError {
  BufferTooSmall { required: usize, available: usize },
}

impl fmt::Display for UsageError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    use self::UsageError::*;
    match *self {
      BufferTooSmall { required, available } => write!(
        fmt,
        "destination buffer holds {} bytes, but {} bytes are required",
        available, required
      ),
    }
  }
}

impl fmt::Display for TiffError {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      TiffError::FormatError(ref e) => write!(fmt, "Format error: {}", e),
      TiffError::UnsupportedError(ref f) => write!(
        fmt,
        "The Decoder does not support the \
         image format `{}`",
        f
      ),
      TiffError::LimitsExceeded => write!(fmt, "The Decoder limits are exceeded"),
      TiffError::IntSizeError => write!(fmt, "Platform or format size limits exceeded"),
      TiffError::UsageError(ref e) => write!(fmt, "Usage error: {}", e),
    }
  }
}

impl Error for TiffError {
  fn description(&self) -> &str {
    match *self {
      TiffError::FormatError(..) => "Format error",
      TiffError::UnsupportedError(..) => "Unsupported error",
      TiffError::LimitsExceeded => "Decoder limits exceeded",
      TiffError::IntSizeError => "Platform or format size limits exceeded",
      TiffError::UsageError(..) => "Invalid usage",
    }
  }

  fn cause(&self) -> Option<&dyn Error> {
    None
  }
}

impl From<TiffFormatError> for TiffError {
  fn from(err: TiffFormatError) -> TiffError {
    TiffError::FormatError(err)
  }
}

impl From<TiffUnsupportedError> for TiffError {
  fn from(err: TiffUnsupportedError) -> TiffError {
    TiffError::UnsupportedError(err)
  }
}

impl From<UsageError> for TiffError {
  fn from(err: UsageError) -> TiffError {
    TiffError::UsageError(err)
  }
}

impl From<TryFromIntError> for TiffError {
  fn from(_err: TryFromIntError) -> TiffError {
    TiffError::IntSizeError
  }
}

/// Result of an image decoding/encoding process
pub type TiffResult<T> = Result<T, TiffError>;
