macro_rules! tags {
  {
    // Permit arbitrary meta items, which include documentation.
    $( #[$enum_attr:meta] )*
    $vis:vis enum $name:ident($ty:tt) $(unknown($unknown_doc:literal))* {
      // Each of the `Name = Val,` permitting documentation.
      $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
    }
  } => {
    $( #[$enum_attr] )*
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
    #[non_exhaustive]
    pub enum $name {
      $($(#[$ident_attr])* $tag,)*
      $(
        #[doc = $unknown_doc]
        Unknown($ty),
      )*
    }

    impl $name {
      #[inline(always)]
      fn __from_inner_type(n: $ty) -> Result<Self, $ty> {
        match n {
          $( $val => Ok($name::$tag), )*
          n => Err(n),
        }
      }

      #[inline(always)]
      fn __to_inner_type(&self) -> $ty {
        match *self {
          $( $name::$tag => $val, )*
          $( $name::Unknown(n) => { $unknown_doc; n }, )*
        }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
          $( $name::$tag => write!(f, stringify!($tag)), )*
          $( $name::Unknown(n) => { $unknown_doc; write!(f, "{n:x}") }, )*
        }
      }
    }

    tags!($name, $ty, $($unknown_doc)*);
  };

  // For u16 tags, provide direct inherent primitive conversion methods.
  ($name:tt, u16, $($unknown_doc:literal)*) => {
    impl $name {
      #[inline(always)]
      pub fn from_u16(val: u16) -> Option<Self> {
        Self::__from_inner_type(val).ok()
      }

      $(
      #[inline(always)]
      pub fn from_u16_exhaustive(val: u16) -> Self {
        $unknown_doc;
        Self::__from_inner_type(val).unwrap_or_else(|_| $name::Unknown(val))
      }
      )*

      #[inline(always)]
      pub fn to_u16(&self) -> u16 {
        Self::__to_inner_type(self)
      }
    }

    impl From<$name> for u16 {
      fn from(value: $name) -> u16 {
        value.to_u16()
      }
    }
  };
}

// Note: These tags appear in the order they are mentioned in the TIFF reference
tags! {
/// TIFF tags
#[derive(Ord, PartialOrd)]
pub enum Tag(u16) unknown("A private or extension tag") {
  // Baseline tags:
  NewSubfileType = 254,
  ImageWidth = 256,
  ImageLength = 257,
  BitsPerSample = 258,
  Compression = 259,
  PhotometricInterpretation = 262,
  ImageDescription = 270,
  StripOffsets = 273,
  SamplesPerPixel = 277,
  RowsPerStrip = 278,
  StripByteCounts = 279,
  XResolution = 282,
  YResolution = 283,
  PlanarConfiguration = 284,
  ResolutionUnit = 296,
  Software = 305,
  DateTime = 306,
  Predictor = 317,
  ColorMap = 320,
  // Advanced tags
  TileWidth = 322,
  TileLength = 323,
  TileOffsets = 324,
  TileByteCounts = 325,
  ExtraSamples = 338,
  // Data Sample Format
  SampleFormat = 339,
  // GeoTIFF
  ModelPixelScaleTag = 33550, // (SoftDesk)
  ModelTiepointTag = 33922, // (Intergraph)
  ModelTransformationTag = 34264, // (JPL Carto Group)
  GeoKeyDirectoryTag = 34735, // (SPOT)
  GeoDoubleParamsTag = 34736, // (SPOT)
  GeoAsciiParamsTag = 34737, // (SPOT)
  GdalNodata = 42113, // Contains areas with missing data
}
}

tags! {
/// The type of an IFD entry (a 2 byte field).
pub enum Type(u16) {
  /// 8-bit unsigned integer
  BYTE = 1,
  /// 8-bit byte that contains a 7-bit ASCII code; the last byte must be zero
  ASCII = 2,
  /// 16-bit unsigned integer
  SHORT = 3,
  /// 32-bit unsigned integer
  LONG = 4,
  /// Fraction stored as two 32-bit unsigned integers
  RATIONAL = 5,
  /// 8-bit signed integer
  SBYTE = 6,
  /// 8-bit byte that may contain anything, depending on the field
  UNDEFINED = 7,
  /// 16-bit signed integer
  SSHORT = 8,
  /// 32-bit signed integer
  SLONG = 9,
  /// Fraction stored as two 32-bit signed integers
  SRATIONAL = 10,
  /// 32-bit IEEE floating point
  FLOAT = 11,
  /// 64-bit IEEE floating point
  DOUBLE = 12,
}
}

impl Type {
  /// Returns the size of one element of this type in bytes.
  pub fn size(&self) -> usize {
    match self {
      Type::BYTE | Type::ASCII | Type::SBYTE | Type::UNDEFINED => 1,
      Type::SHORT | Type::SSHORT => 2,
      Type::LONG | Type::SLONG | Type::FLOAT => 4,
      Type::RATIONAL | Type::SRATIONAL | Type::DOUBLE => 8,
    }
  }
}

tags! {
/// See [TIFF compression tags](https://www.awaresystems.be/imaging/tiff/tifftags/compression.html)
/// for reference.
pub enum CompressionMethod(u16) unknown("A custom compression method") {
  None = 1,
  Huffman = 2,
  Fax3 = 3,
  Fax4 = 4,
  LZW = 5,
  JPEG = 6,
  // "Extended JPEG" or "new JPEG" style
  ModernJPEG = 7,
  Deflate = 8,
  OldDeflate = 0x80B2,
  PackBits = 0x8005,
}
}

tags! {
pub enum PhotometricInterpretation(u16) unknown("Unknown photometric interpolation") {
  WhiteIsZero = 0,
  BlackIsZero = 1,
  RGB = 2,
  RGBPalette = 3,
  TransparencyMask = 4,
  CMYK = 5,
  YCbCr = 6,
  CIELab = 8,
}
}

tags! {
pub enum PlanarConfiguration(u16) unknown("Unknown planar configuration") {
  Chunky = 1,
  Planar = 2,
}
}

tags! {
/// Type to represent resolution units
pub enum ResolutionUnit(u16) unknown("Unknown resolution unit") {
  None = 1,
  Inch = 2,
  Centimeter = 3,
}
}

tags! {
pub enum SampleFormat(u16) unknown("An unknown extension sample format") {
  Uint = 1,
  Int = 2,
  IEEEFP = 3,
  Void = 4,
}
}
