use serde::{Deserialize, Serialize};

/// Opaque descriptor of one detected face, produced by a
/// [`FaceMatcher`](super::face_matcher::FaceMatcher).
///
/// Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding(Vec<f32>);

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Dot product; equals cosine similarity for L2-normalised encodings.
    pub fn dot(&self, other: &Encoding) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| f64::from(*a) * f64::from(*b))
            .sum()
    }
}

impl From<Vec<f32>> for Encoding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}
