/// ArcFace face embeddings using ONNX Runtime.
use std::path::Path;
use std::sync::Mutex;

use crate::error::BoxError;
use crate::recognition::domain::encoding::Encoding;
use crate::shared::frame::Frame;

use super::onnx_session::build_session;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEncoder {
    session: Mutex<ort::session::Session>,
}

impl ArcFaceEncoder {
    pub fn new(model_path: &Path) -> Result<Self, BoxError> {
        Ok(Self {
            session: Mutex::new(build_session(model_path)?),
        })
    }

    /// Embeds one face crop into an L2-normalised [`Encoding`].
    pub fn encode(&self, crop: &Frame) -> Result<Encoding, BoxError> {
        let tensor = preprocess(crop.data(), crop.width(), crop.height());
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let mut embedding = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?
            .to_vec();

        l2_normalize(&mut embedding);
        Ok(Encoding::new(embedding))
    }
}

/// Nearest-neighbour resize to 112x112, normalise to [-1, 1], NCHW.
fn preprocess(rgb_data: &[u8], width: u32, height: u32) -> ndarray::Array4<f32> {
    let src_w = width as usize;
    let src_h = height as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            let offset = (src_y * src_w + src_x) * 3;
            if offset + 2 < rgb_data.len() {
                for c in 0..3 {
                    tensor[[0, c, y, x]] = (f32::from(rgb_data[offset + c]) - NORM_MEAN) / NORM_STD;
                }
            }
        }
    }

    tensor
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_vector() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        approx::assert_abs_diff_eq!(v[0], 0.6, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(v[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_preprocess_shape() {
        let tensor = preprocess(&vec![128u8; 50 * 50 * 3], 50, 50);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        let white = preprocess(&vec![255u8; 10 * 10 * 3], 10, 10);
        approx::assert_abs_diff_eq!(white[[0, 0, 0, 0]], 1.0, epsilon = 0.01);
        let black = preprocess(&vec![0u8; 10 * 10 * 3], 10, 10);
        approx::assert_abs_diff_eq!(black[[0, 2, 111, 111]], -1.0, epsilon = 0.01);
    }

    #[test]
    fn test_preprocess_empty_crop_is_zeroed() {
        let tensor = preprocess(&[], 0, 0);
        assert!(tensor.iter().all(|v| *v == 0.0));
    }
}
