use std::path::Path;

use crate::error::BoxError;
use crate::recognition::domain::encoding::Encoding;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::known_face_set::KnownFaceSet;
use crate::shared::frame::Frame;

use super::arcface_encoder::ArcFaceEncoder;
use super::onnx_face_locator::{FaceBox, OnnxFaceLocator};

/// Minimum cosine similarity for two ArcFace encodings to be the same person.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.4;

/// Identity matcher backed by two ONNX models: a YOLO face locator and an
/// ArcFace encoder.
///
/// Every located face is cut out as a square crop and embedded; an encoding
/// matches when its cosine similarity to any known encoding reaches the
/// threshold.
pub struct OnnxFaceMatcher {
    locator: OnnxFaceLocator,
    encoder: ArcFaceEncoder,
    threshold: f64,
}

impl OnnxFaceMatcher {
    pub fn new(
        locator_model: &Path,
        encoder_model: &Path,
        detection_confidence: f64,
        threshold: f64,
    ) -> Result<Self, BoxError> {
        Ok(Self {
            locator: OnnxFaceLocator::new(locator_model, detection_confidence)?,
            encoder: ArcFaceEncoder::new(encoder_model)?,
            threshold,
        })
    }
}

impl FaceMatcher for OnnxFaceMatcher {
    fn encode(&self, frame: &Frame) -> Result<Vec<Encoding>, BoxError> {
        let faces = self.locator.locate(frame)?;
        faces
            .iter()
            .filter_map(|face| square_crop(frame, face))
            .map(|crop| self.encoder.encode(&crop))
            .collect()
    }

    fn matches(&self, known: &KnownFaceSet, encoding: &Encoding) -> bool {
        matches_any(known, encoding, self.threshold)
    }
}

fn matches_any(known: &KnownFaceSet, encoding: &Encoding, threshold: f64) -> bool {
    known
        .iter()
        .any(|reference| reference.dot(encoding) >= threshold)
}

/// Square crop centred on the face box, sized by its longer side and
/// clamped to the frame.
fn square_crop(frame: &Frame, face: &FaceBox) -> Option<Frame> {
    let side = (face.x2 - face.x1).max(face.y2 - face.y1);
    if side <= 0.0 {
        return None;
    }
    let cx = (face.x1 + face.x2) / 2.0;
    let cy = (face.y1 + face.y2) / 2.0;
    let half = side / 2.0;
    frame.crop(
        (cx - half).round() as i64,
        (cy - half).round() as i64,
        (cx + half).round() as i64,
        (cy + half).round() as i64,
    )
}
