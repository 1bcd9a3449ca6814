use std::{
  convert::TryFrom,
  sync::{Mutex, OnceLock, PoisonError},
};

use log::{debug, warn};

use super::{
  ifd::{self, Directory, Field, FieldView, Value},
  stream::SmartReader,
  tag_reader::TagReader,
  ChunkType, Limits,
};
use crate::{
  raster::Raster,
  tags::{
    CompressionMethod, PhotometricInterpretation, PlanarConfiguration, ResolutionUnit,
    SampleFormat, Tag,
  },
  TiffError, TiffFormatError, TiffResult, TiffUnsupportedError, UsageError,
};

/// `RowsPerStrip` when the tag is absent: the whole image is a single strip.
pub const ROWS_PER_STRIP_UNBOUNDED: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Computed values useful for tile decoding
pub struct TileAttributes {
  pub image_width: usize,
  pub image_height: usize,

  pub tile_width: usize,
  pub tile_length: usize,
}

impl TileAttributes {
  pub fn tiles_across(&self) -> usize {
    (self.image_width + self.tile_width - 1) / self.tile_width
  }

  pub fn tiles_down(&self) -> usize {
    (self.image_height + self.tile_length - 1) / self.tile_length
  }

  pub fn tile_count(&self) -> usize {
    self.tiles_across() * self.tiles_down()
  }

  fn padding_right(&self) -> usize {
    (self.tile_width - self.image_width % self.tile_width) % self.tile_width
  }

  fn padding_down(&self) -> usize {
    (self.tile_length - self.image_height % self.tile_length) % self.tile_length
  }

  fn get_padding(&self, tile: usize) -> (usize, usize) {
    let row = tile / self.tiles_across();
    let column = tile % self.tiles_across();

    let padding_right = if column == self.tiles_across() - 1 { self.padding_right() } else { 0 };

    let padding_down = if row == self.tiles_down() - 1 { self.padding_down() } else { 0 };

    (padding_right, padding_down)
  }

  /// Size of the part of `tile` that lies inside the image.
  pub fn chunk_data_dimensions(&self, tile: usize) -> (usize, usize) {
    let (padding_right, padding_down) = self.get_padding(tile);
    (self.tile_width - padding_right, self.tile_length - padding_down)
  }
}

/// How the raster of a subfile is chunked on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkLayout {
  Strips { rows_per_strip: u32, offsets: Vec<u32>, byte_counts: Vec<u32> },
  Tiles { tile_width: u32, tile_length: u32, offsets: Vec<u32>, byte_counts: Vec<u32> },
}

impl ChunkLayout {
  pub fn chunk_type(&self) -> ChunkType {
    match self {
      ChunkLayout::Strips { .. } => ChunkType::Strip,
      ChunkLayout::Tiles { .. } => ChunkType::Tile,
    }
  }

  pub fn offsets(&self) -> &[u32] {
    match self {
      ChunkLayout::Strips { offsets, .. } | ChunkLayout::Tiles { offsets, .. } => offsets,
    }
  }

  pub fn byte_counts(&self) -> &[u32] {
    match self {
      ChunkLayout::Strips { byte_counts, .. } | ChunkLayout::Tiles { byte_counts, .. } => {
        byte_counts
      }
    }
  }

  fn read(tags: &TagReader<'_, '_>) -> TiffResult<ChunkLayout> {
    let layout = if tags.contains(Tag::StripOffsets) {
      let offsets = tags.require_uint_vec(Tag::StripOffsets)?;
      let byte_counts = tags.require_uint_vec(Tag::StripByteCounts)?;
      let rows_per_strip = tags.find_uint(Tag::RowsPerStrip)?.unwrap_or(ROWS_PER_STRIP_UNBOUNDED);
      ChunkLayout::Strips { rows_per_strip, offsets, byte_counts }
    } else {
      let tile_width = tags.require_uint(Tag::TileWidth)?;
      let tile_length = tags.require_uint(Tag::TileLength)?;
      let offsets = tags.require_uint_vec(Tag::TileOffsets)?;
      let byte_counts = tags.require_uint_vec(Tag::TileByteCounts)?;
      if tile_width == 0 || tile_length == 0 {
        return Err(TiffFormatError::InvalidDimensions(tile_width, tile_length).into());
      }
      ChunkLayout::Tiles { tile_width, tile_length, offsets, byte_counts }
    };

    if layout.offsets().len() != layout.byte_counts().len() {
      return Err(TiffFormatError::InconsistentSizesEncountered.into());
    }

    debug!("{:?} layout with {} chunks", layout.chunk_type(), layout.offsets().len());
    Ok(layout)
  }
}

/// One image of a TIFF file, described by a single IFD.
///
/// Metadata accessors decode their tag on first use and keep the result, so repeated calls are
/// cheap and always agree with each other.
#[derive(Debug)]
pub struct Subfile<'a> {
  index: usize,
  offset: u32,
  reader: SmartReader<'a>,
  limits: Limits,
  ifd: Directory,

  init: Mutex<()>,
  dimensions: OnceLock<(u32, u32)>,
  bits_per_sample: OnceLock<Vec<u16>>,
  compression: OnceLock<CompressionMethod>,
  photometric_interpretation: OnceLock<PhotometricInterpretation>,
  samples_per_pixel: OnceLock<u16>,
  planar_configuration: OnceLock<PlanarConfiguration>,
  x_resolution: OnceLock<Option<f64>>,
  y_resolution: OnceLock<Option<f64>>,
  resolution_unit: OnceLock<ResolutionUnit>,
  sample_format: OnceLock<Vec<SampleFormat>>,
  layout: OnceLock<ChunkLayout>,
}

impl<'a> Subfile<'a> {
  /// Parses the directory at `offset`; returns the subfile and the offset of the next IFD.
  pub(crate) fn read(
    reader: SmartReader<'a>, limits: Limits, index: usize, offset: u32,
  ) -> TiffResult<(Subfile<'a>, u32)> {
    let (ifd, next_ifd) = ifd::read_directory(&reader, offset as usize, index)?;

    let subfile = Subfile {
      index,
      offset,
      reader,
      limits,
      ifd,
      init: Mutex::new(()),
      dimensions: OnceLock::new(),
      bits_per_sample: OnceLock::new(),
      compression: OnceLock::new(),
      photometric_interpretation: OnceLock::new(),
      samples_per_pixel: OnceLock::new(),
      planar_configuration: OnceLock::new(),
      x_resolution: OnceLock::new(),
      y_resolution: OnceLock::new(),
      resolution_unit: OnceLock::new(),
      sample_format: OnceLock::new(),
      layout: OnceLock::new(),
    };
    Ok((subfile, next_ifd))
  }

  fn tags(&self) -> TagReader<'_, 'a> {
    TagReader { reader: &self.reader, ifd: &self.ifd, limits: &self.limits }
  }

  /// Computes `cell` at most once.
  ///
  /// `init` must not call other memoized accessors: the guard is not reentrant, so dependencies
  /// are resolved by the caller before entering.
  fn memoized<'s, T>(
    &'s self, cell: &'s OnceLock<T>, init: impl FnOnce(&TagReader<'_, 'a>) -> TiffResult<T>,
  ) -> TiffResult<&'s T> {
    if let Some(value) = cell.get() {
      return Ok(value);
    }
    let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(value) = cell.get() {
      return Ok(value);
    }
    let value = init(&self.tags())?;
    Ok(cell.get_or_init(|| value))
  }

  /// Position of this subfile in the IFD chain, root first.
  pub fn index(&self) -> usize {
    self.index
  }

  /// Absolute buffer position of the IFD.
  pub fn offset(&self) -> u32 {
    self.offset
  }

  pub fn fields(&self) -> &Directory {
    &self.ifd
  }

  pub fn field(&self, tag: Tag) -> Option<&Field> {
    self.ifd.get(&tag)
  }

  /// Window over the values of `tag`, bounded by the decoder limits.
  pub fn view(&self, tag: Tag) -> TiffResult<Option<FieldView<'a>>> {
    self.tags().find_view(tag)
  }

  /// Tries to retrieve a tag.
  /// Return `Ok(None)` if the tag is not present.
  pub fn find_tag(&self, tag: Tag) -> TiffResult<Option<Value>> {
    self.tags().find_tag(tag)
  }

  /// Tries to retrieve a tag.
  /// Returns an error if the tag is not present
  pub fn get_tag(&self, tag: Tag) -> TiffResult<Value> {
    self.find_tag(tag)?.ok_or_else(|| TiffFormatError::MissingRequiredTag(tag).into())
  }

  pub fn dimensions(&self) -> TiffResult<(u32, u32)> {
    self
      .memoized(&self.dimensions, |tags| {
        let width = tags.require_uint(Tag::ImageWidth)?;
        let length = tags.require_uint(Tag::ImageLength)?;
        if width == 0 || length == 0 {
          return Err(TiffFormatError::InvalidDimensions(width, length).into());
        }
        Ok((width, length))
      })
      .copied()
  }

  pub fn image_width(&self) -> TiffResult<u32> {
    Ok(self.dimensions()?.0)
  }

  pub fn image_length(&self) -> TiffResult<u32> {
    Ok(self.dimensions()?.1)
  }

  pub fn samples_per_pixel(&self) -> TiffResult<u16> {
    self
      .memoized(&self.samples_per_pixel, |tags| {
        let samples = match tags.find_uint(Tag::SamplesPerPixel)? {
          Some(samples) => u16::try_from(samples)?,
          None => 1,
        };
        if samples == 0 {
          return Err(TiffFormatError::SamplesPerPixelIsZero.into());
        }
        Ok(samples)
      })
      .copied()
  }

  /// Bits of each sample; defaults to one bit per sample.
  pub fn bits_per_sample(&self) -> TiffResult<&[u16]> {
    let samples = usize::from(self.samples_per_pixel()?);
    self
      .memoized(&self.bits_per_sample, |tags| match tags.find_uint_vec(Tag::BitsPerSample)? {
        Some(bits) => {
          bits.into_iter().map(|b| u16::try_from(b).map_err(TiffError::from)).collect()
        }
        None => Ok(vec![1; samples]),
      })
      .map(Vec::as_slice)
  }

  pub fn compression(&self) -> TiffResult<CompressionMethod> {
    self
      .memoized(&self.compression, |tags| {
        Ok(match tags.find_uint(Tag::Compression)? {
          Some(method) => CompressionMethod::from_u16_exhaustive(u16::try_from(method)?),
          None => CompressionMethod::None,
        })
      })
      .copied()
  }

  pub fn photometric_interpretation(&self) -> TiffResult<PhotometricInterpretation> {
    self
      .memoized(&self.photometric_interpretation, |tags| {
        let value = u16::try_from(tags.require_uint(Tag::PhotometricInterpretation)?)?;
        Ok(PhotometricInterpretation::from_u16_exhaustive(value))
      })
      .copied()
  }

  pub fn planar_configuration(&self) -> TiffResult<PlanarConfiguration> {
    self
      .memoized(&self.planar_configuration, |tags| {
        Ok(match tags.find_uint(Tag::PlanarConfiguration)? {
          Some(config) => PlanarConfiguration::from_u16_exhaustive(u16::try_from(config)?),
          None => PlanarConfiguration::Chunky,
        })
      })
      .copied()
  }

  pub fn x_resolution(&self) -> TiffResult<Option<f64>> {
    self.memoized(&self.x_resolution, |tags| tags.find_rational(Tag::XResolution)).copied()
  }

  pub fn y_resolution(&self) -> TiffResult<Option<f64>> {
    self.memoized(&self.y_resolution, |tags| tags.find_rational(Tag::YResolution)).copied()
  }

  pub fn resolution_unit(&self) -> TiffResult<ResolutionUnit> {
    self
      .memoized(&self.resolution_unit, |tags| {
        Ok(match tags.find_uint(Tag::ResolutionUnit)? {
          Some(unit) => ResolutionUnit::from_u16_exhaustive(u16::try_from(unit)?),
          None => ResolutionUnit::Inch,
        })
      })
      .copied()
  }

  pub fn sample_format(&self) -> TiffResult<&[SampleFormat]> {
    let samples = usize::from(self.samples_per_pixel()?);
    self
      .memoized(&self.sample_format, |tags| match tags.find_uint_vec(Tag::SampleFormat)? {
        Some(formats) => formats
          .into_iter()
          .map(|f| -> TiffResult<SampleFormat> {
            Ok(SampleFormat::from_u16_exhaustive(u16::try_from(f)?))
          })
          .collect(),
        None => Ok(vec![SampleFormat::Uint; samples]),
      })
      .map(Vec::as_slice)
  }

  /// Strip or tile layout, selected by the presence of `StripOffsets`.
  pub fn layout(&self) -> TiffResult<&ChunkLayout> {
    self.memoized(&self.layout, ChunkLayout::read)
  }

  pub fn chunk_type(&self) -> TiffResult<ChunkType> {
    Ok(self.layout()?.chunk_type())
  }

  pub fn offsets(&self) -> TiffResult<&[u32]> {
    Ok(self.layout()?.offsets())
  }

  pub fn byte_counts(&self) -> TiffResult<&[u32]> {
    Ok(self.layout()?.byte_counts())
  }

  /// Rows per strip, or `None` for tiled images.
  pub fn rows_per_strip(&self) -> TiffResult<Option<u32>> {
    Ok(match *self.layout()? {
      ChunkLayout::Strips { rows_per_strip, .. } => Some(rows_per_strip),
      ChunkLayout::Tiles { .. } => None,
    })
  }

  /// Tile width, or `None` for stripped images.
  pub fn tile_width(&self) -> TiffResult<Option<u32>> {
    Ok(match *self.layout()? {
      ChunkLayout::Tiles { tile_width, .. } => Some(tile_width),
      ChunkLayout::Strips { .. } => None,
    })
  }

  /// Tile length, or `None` for stripped images.
  pub fn tile_length(&self) -> TiffResult<Option<u32>> {
    Ok(match *self.layout()? {
      ChunkLayout::Tiles { tile_length, .. } => Some(tile_length),
      ChunkLayout::Strips { .. } => None,
    })
  }

  pub fn tile_attributes(&self) -> TiffResult<Option<TileAttributes>> {
    let (width, length) = self.dimensions()?;
    Ok(match *self.layout()? {
      ChunkLayout::Tiles { tile_width, tile_length, .. } => Some(TileAttributes {
        image_width: usize::try_from(width)?,
        image_height: usize::try_from(length)?,
        tile_width: usize::try_from(tile_width)?,
        tile_length: usize::try_from(tile_length)?,
      }),
      ChunkLayout::Strips { .. } => None,
    })
  }

  /// `ModelPixelScaleTag`: the size of a pixel in model space as `(x, y, z)`.
  pub fn model_pixel_scale(&self) -> TiffResult<Option<[f64; 3]>> {
    match self.tags().find_double_vec(Tag::ModelPixelScaleTag)? {
      Some(scale) => match scale[..] {
        [x, y, z] => Ok(Some([x, y, z])),
        _ => Err(TiffFormatError::InconsistentSizesEncountered.into()),
      },
      None => Ok(None),
    }
  }

  /// `ModelTiepointTag`: `(i, j, k, x, y, z)` raster to model space tie points.
  pub fn model_tiepoints(&self) -> TiffResult<Vec<[f64; 6]>> {
    let values = self.tags().find_double_vec(Tag::ModelTiepointTag)?.unwrap_or_default();
    if values.len() % 6 != 0 {
      return Err(TiffFormatError::InconsistentSizesEncountered.into());
    }
    Ok(
      values
        .chunks_exact(6)
        .map(|p| [p[0], p[1], p[2], p[3], p[4], p[5]])
        .collect(),
    )
  }

  /// Raw `GeoKeyDirectoryTag` words.
  pub fn geo_key_directory(&self) -> TiffResult<Option<Vec<u16>>> {
    match self.tags().find_view(Tag::GeoKeyDirectoryTag)? {
      Some(view) => (0..view.len())
        .map(|index| -> TiffResult<u16> { Ok(u16::try_from(view.uint(index)?)?) })
        .collect::<TiffResult<Vec<_>>>()
        .map(Some),
      None => Ok(None),
    }
  }

  /// GDAL's nodata value as written, e.g. `"-9999"`.
  pub fn gdal_nodata(&self) -> TiffResult<Option<String>> {
    self.find_tag(Tag::GdalNodata)?.map(Value::into_string).transpose()
  }

  /// Bits of every sample plane. A single shared value is repeated for each sample; otherwise
  /// every `BitsPerSample` entry is a plane, which must cover at least `SamplesPerPixel`.
  fn plane_bits(&self) -> TiffResult<Vec<u32>> {
    let samples = usize::from(self.samples_per_pixel()?);
    let bits = self.bits_per_sample()?;
    if bits.len() == 1 {
      Ok(vec![u32::from(bits[0]); samples])
    } else if bits.len() >= samples {
      Ok(bits.iter().copied().map(u32::from).collect())
    } else {
      Err(TiffFormatError::InconsistentSizesEncountered.into())
    }
  }

  /// Size of the uncompressed raster in bytes.
  pub fn data_size(&self) -> TiffResult<usize> {
    let (width, length) = self.dimensions()?;
    let pixels = u64::from(width) * u64::from(length);

    let mut size = 0u64;
    for bits in self.plane_bits()? {
      size = pixels
        .checked_mul(u64::from(bits))
        .map(|plane_bits| plane_bits / 8)
        .and_then(|plane| size.checked_add(plane))
        .ok_or(TiffError::IntSizeError)?;
    }
    Ok(usize::try_from(size)?)
  }

  /// Reconstructs the raster into `buffer` and returns the number of bytes written, which is
  /// always [`data_size`](Self::data_size).
  ///
  /// Samples are copied verbatim, so multi-byte samples stay in the byte order of the file.
  /// Nothing is written if any part of the raster cannot be read.
  pub fn read_raster_into(&self, buffer: &mut [u8]) -> TiffResult<usize> {
    let size = self.data_size()?;
    if buffer.len() < size {
      return Err(UsageError::BufferTooSmall { required: size, available: buffer.len() }.into());
    }

    let compression = self.compression()?;
    if compression != CompressionMethod::None {
      return Err(TiffUnsupportedError::UnsupportedCompression(compression).into());
    }

    let buffer = &mut buffer[..size];
    match self.layout()? {
      // separate planes are stored one after the other, so strips concatenate either way
      ChunkLayout::Strips { offsets, byte_counts, .. } => {
        self.combine_strips(offsets, byte_counts, buffer)?
      }
      ChunkLayout::Tiles { offsets, .. } => {
        let planar = self.planar_configuration()?;
        if planar != PlanarConfiguration::Chunky && self.plane_bits()?.len() > 1 {
          return Err(TiffUnsupportedError::UnsupportedPlanarConfiguration(planar).into());
        }
        self.combine_tiles(offsets, buffer)?
      }
    }

    debug!("reconstructed {} bytes of subfile {}", size, self.index);
    Ok(size)
  }

  /// Reconstructs the raster into a newly allocated [`Raster`].
  pub fn read_raster(&self) -> TiffResult<Raster> {
    let size = self.data_size()?;
    if size > self.limits.decoding_buffer_size {
      return Err(TiffError::LimitsExceeded);
    }

    let mut data = vec![0; size];
    self.read_raster_into(&mut data)?;

    let (width, height) = self.dimensions()?;
    let bits_per_pixel = self.plane_bits()?.iter().sum();
    Ok(Raster::new(data, width, height, bits_per_pixel, self.reader.byte_order))
  }

  fn combine_strips(
    &self, offsets: &[u32], byte_counts: &[u32], buffer: &mut [u8],
  ) -> TiffResult<()> {
    let strips = offsets
      .iter()
      .zip(byte_counts)
      .map(|(&offset, &count)| self.reader.slice(offset as usize, count as usize))
      .collect::<TiffResult<Vec<_>>>()?;

    let total: usize = strips.iter().map(|strip| strip.len()).sum();
    if total < buffer.len() {
      return Err(TiffFormatError::InconsistentSizesEncountered.into());
    }
    if total > buffer.len() {
      warn!("strips hold {} bytes, dropping {} beyond the raster", total, total - buffer.len());
    }

    let mut position = 0;
    for strip in strips {
      let len = strip.len().min(buffer.len() - position);
      buffer[position..position + len].copy_from_slice(&strip[..len]);
      position += len;
    }
    Ok(())
  }

  /// Copies every tile to its place in the image, cropping the parts of edge tiles that lie
  /// beyond the image width or length.
  fn combine_tiles(&self, offsets: &[u32], buffer: &mut [u8]) -> TiffResult<()> {
    let attrs = match self.tile_attributes()? {
      Some(attrs) => attrs,
      None => return Err(TiffFormatError::MissingRequiredTag(Tag::TileWidth).into()),
    };

    let plane_bits = self.plane_bits()?;
    let bits_per_pixel: u32 = plane_bits.iter().sum();
    if plane_bits.iter().any(|bits| bits % 8 != 0) {
      return Err(TiffUnsupportedError::UnsupportedBitsPerPixel(bits_per_pixel).into());
    }
    let bytes_per_pixel = bits_per_pixel as usize / 8;

    if offsets.len() < attrs.tile_count() {
      return Err(TiffFormatError::InconsistentSizesEncountered.into());
    }

    let tile_row = attrs.tile_width.checked_mul(bytes_per_pixel).ok_or(TiffError::IntSizeError)?;
    let tile_bytes = tile_row.checked_mul(attrs.tile_length).ok_or(TiffError::IntSizeError)?;
    let tiles = offsets[..attrs.tile_count()]
      .iter()
      .map(|&offset| self.reader.slice(offset as usize, tile_bytes))
      .collect::<TiffResult<Vec<_>>>()?;

    let image_row = attrs.image_width * bytes_per_pixel;
    let tiles_across = attrs.tiles_across();
    for (index, tile) in tiles.into_iter().enumerate() {
      let (data_width, data_length) = attrs.chunk_data_dimensions(index);
      let row_len = data_width * bytes_per_pixel;
      let first_row = (index / tiles_across) * attrs.tile_length;
      let first_column = (index % tiles_across) * tile_row;

      for row in 0..data_length {
        let src = row * tile_row;
        let dst = (first_row + row) * image_row + first_column;
        buffer[dst..dst + row_len].copy_from_slice(&tile[src..src + row_len]);
      }
    }
    Ok(())
  }
}
