//! Decoding of uncompressed TIFF and GeoTIFF rasters held in memory
//!
//! A [`Decoder`](decoder::Decoder) borrows a complete TIFF file, walks its chain of Image File
//! Directories and exposes each of them as a [`Subfile`](decoder::Subfile) with typed metadata
//! accessors. The raster of a subfile is reassembled from its strips or tiles, cropping tiles
//! that reach past the right or bottom edge of the image.
//!
//! ```no_run
//! # fn run(bytes: &[u8]) -> geotiff_decoder::TiffResult<()> {
//! use geotiff_decoder::decoder::Decoder;
//!
//! let decoder = Decoder::new(bytes)?;
//! for subfile in decoder.subfiles()? {
//!   let mut raster = vec![0; subfile.data_size()?];
//!   subfile.read_raster_into(&mut raster)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Compressed strips and tiles are not decoded.
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> -
//!   The TIFF specification
//! * <http://geotiff.maptools.org/spec/geotiff2.4.html> - The GeoTIFF tags

pub use self::{
  error::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError, UsageError},
  raster::{GetPixel, Raster},
};

pub mod decoder;
mod error;
mod raster;
pub mod tags;
