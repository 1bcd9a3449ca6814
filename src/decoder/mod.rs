use std::{
  collections::HashSet,
  sync::{Mutex, OnceLock, PoisonError},
};

use log::trace;

use self::stream::{EndianReader, SmartReader};
pub use self::{
  ifd::{Directory, Field, FieldView, Value},
  image::{ChunkLayout, Subfile, TileAttributes, ROWS_PER_STRIP_UNBOUNDED},
  stream::ByteOrder,
};
use crate::{TiffError, TiffFormatError, TiffResult};

pub mod ifd;
mod image;
mod stream;
mod tag_reader;

/// The only version of classic TIFF.
const TIFF_VERSION: u16 = 42;

/// Position of the offset of the first IFD.
const FIRST_IFD_POSITION: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Chunk type of the internal representation
pub enum ChunkType {
  Strip,
  Tile,
}

/// Decoding limits
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Limits {
  /// The maximum size of any raster allocated by `Subfile::read_raster` in bytes, the default
  /// is 256MiB.
  pub decoding_buffer_size: usize,
  /// The maximum size of any ifd value in bytes, the default is
  /// 1MiB.
  pub ifd_value_size: usize,
}

impl Limits {
  /// A configuration that does not impose any limits.
  ///
  /// This is a good start if the caller only wants to impose selective limits, contrary to the
  /// default limits which allows selectively disabling limits.
  ///
  /// Note that this configuration is likely to crash on excessively large images since,
  /// naturally, the machine running the program does not have infinite memory.
  pub fn unlimited() -> Limits {
    Limits { decoding_buffer_size: usize::MAX, ifd_value_size: usize::MAX }
  }
}

impl Default for Limits {
  fn default() -> Limits {
    Limits { decoding_buffer_size: 256 * 1024 * 1024, ifd_value_size: 1024 * 1024 }
  }
}

/// The representation of a TIFF decoder
///
/// The decoder borrows the whole file. Subfiles are parsed on the first call to
/// [`subfiles`](Decoder::subfiles) and kept for the lifetime of the decoder.
#[derive(Debug)]
pub struct Decoder<'a> {
  reader: SmartReader<'a>,
  limits: Limits,
  init: Mutex<()>,
  subfiles: OnceLock<Vec<Subfile<'a>>>,
}

impl<'a> Decoder<'a> {
  /// Create a new decoder that decodes from the buffer ```buffer```
  pub fn new(buffer: &'a [u8]) -> TiffResult<Decoder<'a>> {
    let byte_order = match buffer.get(..2) {
      Some(b"II") => ByteOrder::LittleEndian,
      Some(b"MM") => ByteOrder::BigEndian,
      Some(&[a, b]) => return Err(TiffFormatError::BadByteOrderMarker([a, b]).into()),
      _ => return Err(TiffFormatError::UnexpectedEof { position: 0, len: 2 }.into()),
    };
    let reader = SmartReader::wrap(buffer, byte_order);

    let version = reader.read_u16(2)?;
    if version != TIFF_VERSION {
      return Err(TiffFormatError::UnsupportedVersion(version).into());
    }

    Ok(Decoder {
      reader,
      limits: Limits::default(),
      init: Mutex::new(()),
      subfiles: OnceLock::new(),
    })
  }

  /// Replaces the limits. Has no effect on subfiles that were already read.
  pub fn with_limits(mut self, limits: Limits) -> Decoder<'a> {
    self.limits = limits;
    self
  }

  /// Returns the byte_order
  pub fn byte_order(&self) -> ByteOrder {
    self.reader.byte_order
  }

  pub fn limits(&self) -> &Limits {
    &self.limits
  }

  /// All subfiles in file order, root IFD first.
  pub fn subfiles(&self) -> TiffResult<&[Subfile<'a>]> {
    if let Some(subfiles) = self.subfiles.get() {
      return Ok(subfiles);
    }
    let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(subfiles) = self.subfiles.get() {
      return Ok(subfiles);
    }
    let subfiles = self.read_subfiles()?;
    Ok(self.subfiles.get_or_init(|| subfiles))
  }

  /// Returns the subfile at `index` in the IFD chain, if there is one.
  pub fn subfile(&self, index: usize) -> TiffResult<Option<&Subfile<'a>>> {
    Ok(self.subfiles()?.get(index))
  }

  fn read_subfiles(&self) -> TiffResult<Vec<Subfile<'a>>> {
    let mut subfiles = Vec::new();
    let mut seen_ifds = HashSet::new();

    let mut next_ifd = self.reader.read_u32(FIRST_IFD_POSITION)?;
    while next_ifd != 0 {
      if !seen_ifds.insert(next_ifd) {
        return Err(TiffError::FormatError(TiffFormatError::CycleInOffsets));
      }

      trace!("reading IFD {} at {}", subfiles.len(), next_ifd);
      let (subfile, next) =
        Subfile::read(self.reader, self.limits.clone(), subfiles.len(), next_ifd)?;
      subfiles.push(subfile);
      next_ifd = next;
    }

    Ok(subfiles)
  }
}
