use super::{
  ifd::{Directory, Field, FieldView, Value},
  stream::SmartReader,
  Limits,
};
use crate::{tags::Tag, TiffFormatError, TiffResult};

pub(crate) struct TagReader<'s, 'a> {
  pub reader: &'s SmartReader<'a>,
  pub ifd: &'s Directory,
  pub limits: &'s Limits,
}

impl<'s, 'a> TagReader<'s, 'a> {
  pub(crate) fn contains(&self, tag: Tag) -> bool {
    self.ifd.contains_key(&tag)
  }

  pub(crate) fn find_field(&self, tag: Tag) -> Option<&'s Field> {
    self.ifd.get(&tag)
  }

  pub(crate) fn find_view(&self, tag: Tag) -> TiffResult<Option<FieldView<'a>>> {
    self.find_field(tag).map(|field| field.view(self.reader, self.limits)).transpose()
  }

  pub(crate) fn require_view(&self, tag: Tag) -> TiffResult<FieldView<'a>> {
    self.find_view(tag)?.ok_or_else(|| TiffFormatError::MissingRequiredTag(tag).into())
  }

  pub(crate) fn find_tag(&self, tag: Tag) -> TiffResult<Option<Value>> {
    self.find_view(tag)?.map(|view| view.value()).transpose()
  }

  /// First element of a SHORT or LONG tag.
  pub(crate) fn find_uint(&self, tag: Tag) -> TiffResult<Option<u32>> {
    self.find_view(tag)?.map(|view| view.uint(0)).transpose()
  }

  pub(crate) fn require_uint(&self, tag: Tag) -> TiffResult<u32> {
    self.require_view(tag)?.uint(0)
  }

  pub(crate) fn find_uint_vec(&self, tag: Tag) -> TiffResult<Option<Vec<u32>>> {
    self.find_view(tag)?.map(|view| view.uints()).transpose()
  }

  pub(crate) fn require_uint_vec(&self, tag: Tag) -> TiffResult<Vec<u32>> {
    self.require_view(tag)?.uints()
  }

  /// First element of a RATIONAL tag as a quotient.
  pub(crate) fn find_rational(&self, tag: Tag) -> TiffResult<Option<f64>> {
    self
      .find_view(tag)?
      .map(|view| view.rational(0).map(|(num, den)| f64::from(num) / f64::from(den)))
      .transpose()
  }

  pub(crate) fn find_double_vec(&self, tag: Tag) -> TiffResult<Option<Vec<f64>>> {
    self
      .find_view(tag)?
      .map(|view| (0..view.len()).map(|index| view.double(index)).collect())
      .transpose()
  }
}
