//! Builds small TIFF files in memory.
#![allow(dead_code)]

use geotiff_decoder::{decoder::ByteOrder, tags::Tag};

pub const BYTE: u16 = 1;
pub const ASCII: u16 = 2;
pub const SHORT: u16 = 3;
pub const LONG: u16 = 4;
pub const RATIONAL: u16 = 5;
pub const DOUBLE: u16 = 12;

struct Entry {
  tag: u16,
  type_: u16,
  count: u32,
  payload: Vec<u8>,
}

/// Writes the header up front, raster data as it is appended and each IFD when it is finished,
/// patching the previous "next IFD" pointer.
pub struct TiffBuilder {
  byte_order: ByteOrder,
  buf: Vec<u8>,
  entries: Vec<Entry>,
  next_pointer: usize,
}

impl TiffBuilder {
  pub fn new(byte_order: ByteOrder) -> Self {
    let mut builder =
      TiffBuilder { byte_order, buf: Vec::new(), entries: Vec::new(), next_pointer: 4 };
    builder.buf.extend_from_slice(match byte_order {
      ByteOrder::LittleEndian => b"II",
      ByteOrder::BigEndian => b"MM",
    });
    let version = builder.u16_bytes(42);
    builder.buf.extend_from_slice(&version);
    builder.buf.extend_from_slice(&[0; 4]);
    builder
  }

  fn u16_bytes(&self, value: u16) -> [u8; 2] {
    match self.byte_order {
      ByteOrder::LittleEndian => value.to_le_bytes(),
      ByteOrder::BigEndian => value.to_be_bytes(),
    }
  }

  fn u32_bytes(&self, value: u32) -> [u8; 4] {
    match self.byte_order {
      ByteOrder::LittleEndian => value.to_le_bytes(),
      ByteOrder::BigEndian => value.to_be_bytes(),
    }
  }

  fn f64_bytes(&self, value: f64) -> [u8; 8] {
    match self.byte_order {
      ByteOrder::LittleEndian => value.to_le_bytes(),
      ByteOrder::BigEndian => value.to_be_bytes(),
    }
  }

  fn align(&mut self) {
    if self.buf.len() % 2 == 1 {
      self.buf.push(0);
    }
  }

  fn patch_u32(&mut self, position: usize, value: u32) {
    let bytes = self.u32_bytes(value);
    self.buf[position..position + 4].copy_from_slice(&bytes);
  }

  /// Appends raw data and returns its offset.
  pub fn append_data(&mut self, data: &[u8]) -> u32 {
    self.align();
    let offset = self.buf.len() as u32;
    self.buf.extend_from_slice(data);
    offset
  }

  pub fn raw_entry(&mut self, tag: u16, type_: u16, count: u32, payload: Vec<u8>) -> &mut Self {
    self.entries.push(Entry { tag, type_, count, payload });
    self
  }

  pub fn short(&mut self, tag: Tag, values: &[u16]) -> &mut Self {
    let payload = values.iter().flat_map(|&v| self.u16_bytes(v)).collect();
    self.raw_entry(tag.to_u16(), SHORT, values.len() as u32, payload)
  }

  pub fn long(&mut self, tag: Tag, values: &[u32]) -> &mut Self {
    let payload = values.iter().flat_map(|&v| self.u32_bytes(v)).collect();
    self.raw_entry(tag.to_u16(), LONG, values.len() as u32, payload)
  }

  pub fn rational(&mut self, tag: Tag, numerator: u32, denominator: u32) -> &mut Self {
    let mut payload = self.u32_bytes(numerator).to_vec();
    payload.extend_from_slice(&self.u32_bytes(denominator));
    self.raw_entry(tag.to_u16(), RATIONAL, 1, payload)
  }

  pub fn double(&mut self, tag: Tag, values: &[f64]) -> &mut Self {
    let payload = values.iter().flat_map(|&v| self.f64_bytes(v)).collect();
    self.raw_entry(tag.to_u16(), DOUBLE, values.len() as u32, payload)
  }

  pub fn ascii(&mut self, tag: Tag, value: &str) -> &mut Self {
    let mut payload = value.as_bytes().to_vec();
    payload.push(0);
    let count = payload.len() as u32;
    self.raw_entry(tag.to_u16(), ASCII, count, payload)
  }

  /// Writes the pending entries as an IFD, links it into the chain and returns its offset.
  pub fn finish_ifd(&mut self) -> u32 {
    let mut entries = std::mem::take(&mut self.entries);
    entries.sort_by_key(|e| e.tag);

    self.align();
    let offset = self.buf.len();
    self.patch_u32(self.next_pointer, offset as u32);

    let mut external = offset + 2 + entries.len() * 12 + 4;
    let mut out_of_line = Vec::new();

    let count = self.u16_bytes(entries.len() as u16);
    self.buf.extend_from_slice(&count);
    for entry in &entries {
      let tag = self.u16_bytes(entry.tag);
      let type_ = self.u16_bytes(entry.type_);
      let count = self.u32_bytes(entry.count);
      self.buf.extend_from_slice(&tag);
      self.buf.extend_from_slice(&type_);
      self.buf.extend_from_slice(&count);
      if entry.payload.len() <= 4 {
        let mut value = [0u8; 4];
        value[..entry.payload.len()].copy_from_slice(&entry.payload);
        self.buf.extend_from_slice(&value);
      } else {
        let pointer = self.u32_bytes(external as u32);
        self.buf.extend_from_slice(&pointer);
        out_of_line.extend_from_slice(&entry.payload);
        if entry.payload.len() % 2 == 1 {
          out_of_line.push(0);
        }
        external += entry.payload.len() + entry.payload.len() % 2;
      }
    }

    self.next_pointer = self.buf.len();
    self.buf.extend_from_slice(&[0; 4]);
    self.buf.extend_from_slice(&out_of_line);
    offset as u32
  }

  pub fn build(&self) -> Vec<u8> {
    self.buf.clone()
  }
}

/// A `width` x `height` image of `samples` 8-bit samples stored as tiles; tile `i` is filled
/// with `fill(i, byte_in_tile)`.
pub fn tiled_image(
  byte_order: ByteOrder, image: (u32, u32), tile: (u32, u32), samples: u16,
  fill: impl Fn(usize, usize) -> u8,
) -> Vec<u8> {
  let (width, height) = image;
  let (tile_width, tile_length) = tile;
  let tiles = ((width + tile_width - 1) / tile_width) * ((height + tile_length - 1) / tile_length);
  let tile_bytes = (tile_width * tile_length) as usize * usize::from(samples);

  let mut builder = TiffBuilder::new(byte_order);
  let offsets: Vec<u32> = (0..tiles as usize)
    .map(|t| {
      let data: Vec<u8> = (0..tile_bytes).map(|b| fill(t, b)).collect();
      builder.append_data(&data)
    })
    .collect();

  builder
    .long(Tag::ImageWidth, &[width])
    .long(Tag::ImageLength, &[height])
    .short(Tag::BitsPerSample, &vec![8; usize::from(samples)])
    .short(Tag::Compression, &[1])
    .short(Tag::PhotometricInterpretation, &[if samples >= 3 { 2 } else { 1 }])
    .short(Tag::SamplesPerPixel, &[samples])
    .short(Tag::TileWidth, &[tile_width as u16])
    .short(Tag::TileLength, &[tile_length as u16])
    .long(Tag::TileOffsets, &offsets)
    .long(Tag::TileByteCounts, &vec![tile_bytes as u32; offsets.len()]);
  builder.finish_ifd();
  builder.build()
}

/// A `width` x `height` 8-bit grayscale image stored in strips of `rows_per_strip` rows;
/// pixel `(x, y)` has value `pixel(x, y)`.
pub fn stripped_image(
  byte_order: ByteOrder, width: u32, height: u32, rows_per_strip: u32,
  pixel: impl Fn(u32, u32) -> u8,
) -> Vec<u8> {
  let mut builder = TiffBuilder::new(byte_order);
  let mut offsets = Vec::new();
  let mut counts = Vec::new();
  let mut row = 0;
  while row < height {
    let rows = rows_per_strip.min(height - row);
    let data: Vec<u8> = (row..row + rows)
      .flat_map(|y| (0..width).map(move |x| (x, y)))
      .map(|(x, y)| pixel(x, y))
      .collect();
    offsets.push(builder.append_data(&data));
    counts.push(data.len() as u32);
    row += rows;
  }

  builder
    .short(Tag::ImageWidth, &[width as u16])
    .short(Tag::ImageLength, &[height as u16])
    .short(Tag::BitsPerSample, &[8])
    .short(Tag::PhotometricInterpretation, &[1])
    .long(Tag::StripOffsets, &offsets)
    .short(Tag::RowsPerStrip, &[rows_per_strip as u16])
    .long(Tag::StripByteCounts, &counts);
  builder.finish_ifd();
  builder.build()
}
