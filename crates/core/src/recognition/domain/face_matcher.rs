use crate::error::BoxError;
use crate::shared::frame::Frame;

use super::encoding::Encoding;
use super::known_face_set::KnownFaceSet;

/// Domain interface to the identity matcher.
///
/// `&self` and `Sync` because scanning workers share one matcher; stateful
/// implementations must synchronise internally.
pub trait FaceMatcher: Send + Sync {
    /// Returns one encoding per face found in `frame` (possibly none).
    fn encode(&self, frame: &Frame) -> Result<Vec<Encoding>, BoxError>;

    /// True when `encoding` belongs to any identity in `known`.
    fn matches(&self, known: &KnownFaceSet, encoding: &Encoding) -> bool;
}
