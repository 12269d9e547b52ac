use super::encoding::Encoding;

/// Reference encodings of the identity being searched for.
///
/// Each pipeline run builds its own set during training; it only grows and
/// is read-only once scanning starts. Order carries no meaning.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KnownFaceSet {
    encodings: Vec<Encoding>,
}

impl KnownFaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_encodings(encodings: Vec<Encoding>) -> Self {
        Self { encodings }
    }

    pub fn add(&mut self, encoding: Encoding) {
        self.encodings.push(encoding);
    }

    pub fn extend(&mut self, encodings: impl IntoIterator<Item = Encoding>) {
        self.encodings.extend(encodings);
    }

    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Encoding> {
        self.encodings.iter()
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }
}
