use crate::decoder::ByteOrder;

/// An uncompressed raster, samples interleaved per pixel, rows top to bottom.
///
/// Multi-byte samples keep the byte order of the file they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
  data: Vec<u8>,
  width: usize,
  height: usize,
  bits_per_pixel: u32,
  byte_order: ByteOrder,
}

impl Raster {
  pub(crate) fn new(
    data: Vec<u8>, width: u32, height: u32, bits_per_pixel: u32, byte_order: ByteOrder,
  ) -> Self {
    Self { data, width: width as usize, height: height as usize, bits_per_pixel, byte_order }
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn bits_per_pixel(&self) -> u32 {
    self.bits_per_pixel
  }

  pub fn byte_order(&self) -> ByteOrder {
    self.byte_order
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.data
  }

  /// Bytes of one pixel, or `None` when pixels do not occupy whole bytes.
  pub fn pixel_len(&self) -> Option<usize> {
    match self.bits_per_pixel % 8 {
      0 => Some(self.bits_per_pixel as usize / 8),
      _ => None,
    }
  }
}

pub trait GetPixel<'a, C> {
  fn get_pixel(&'a self, coord: C) -> Option<&'a [u8]>;
}

impl<'a> GetPixel<'a, usize> for Raster {
  fn get_pixel(&'a self, coord: usize) -> Option<&'a [u8]> {
    if coord >= self.height * self.width {
      return None;
    }

    let len = self.pixel_len()?;
    let start = coord * len;
    self.data.get(start..start + len)
  }
}

impl<'a> GetPixel<'a, (usize, usize)> for Raster {
  fn get_pixel(&'a self, coord: (usize, usize)) -> Option<&'a [u8]> {
    if coord.0 >= self.width || coord.1 >= self.height {
      None
    } else {
      self.get_pixel(coord.0 + self.width * coord.1)
    }
  }
}
