/// YOLO face localisation using ONNX Runtime via `ort`.
///
/// Letterbox preprocessing, inference, confidence filtering and greedy NMS.
/// Produces plain bounding boxes in source-frame coordinates; identity is
/// decided downstream from the embeddings of the boxed crops.
use std::path::Path;
use std::sync::Mutex;

use crate::error::BoxError;
use crate::shared::frame::Frame;

use super::onnx_session::build_session;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

/// Axis-aligned face box in source-frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

impl FaceBox {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

pub struct OnnxFaceLocator {
    session: Mutex<ort::session::Session>,
    confidence: f64,
    input_size: u32,
}

impl OnnxFaceLocator {
    /// Loads a YOLO face model. The input resolution is read from the model's
    /// NCHW input shape, falling back to 640 when dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, BoxError> {
        let session = build_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session: Mutex::new(session),
            confidence,
            input_size,
        })
    }

    pub fn locate(&self, frame: &Frame) -> Result<Vec<FaceBox>, BoxError> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size)?;

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        // Output is [1, features, detections] or [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = Vec::new();
        for i in 0..num_dets {
            let feature = |f: usize| {
                if transposed {
                    data[f * num_dets + i]
                } else {
                    data[i * num_feats + f]
                }
            };
            // [cx, cy, w, h, conf, keypoints...]
            if num_feats < 5 {
                break;
            }
            let conf = f64::from(feature(4));
            if conf < self.confidence {
                continue;
            }
            let (cx, cy) = (f64::from(feature(0)), f64::from(feature(1)));
            let (w, h) = (f64::from(feature(2)), f64::from(feature(3)));
            raw.push(FaceBox {
                x1: (cx - w / 2.0 - f64::from(pad_x)) / scale,
                y1: (cy - h / 2.0 - f64::from(pad_y)) / scale,
                x2: (cx + w / 2.0 - f64::from(pad_x)) / scale,
                y2: (cy + h / 2.0 - f64::from(pad_y)) / scale,
                confidence: conf,
            });
        }

        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

/// Letterbox-resize a frame to `target_size` x `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(
    frame: &Frame,
    target_size: u32,
) -> Result<(ndarray::Array4<f32>, f64, u32, u32), BoxError> {
    let fw = f64::from(frame.width());
    let fh = f64::from(frame.height());
    let target = f64::from(target_size);

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // YOLO convention: pad with 114/255 gray.
    let gray = 114.0f32 / 255.0;
    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), gray);

    let src = frame.as_ndarray().ok_or("Frame data does not match its dimensions")?;
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = f32::from(src[[src_y, src_x, c]]) / 255.0;
            }
        }
    }

    Ok((tensor, scale, pad_x, pad_y))
}

/// Greedy NMS: highest confidence first, suppressing overlapping boxes.
fn nms(dets: &mut [FaceBox], iou_thresh: f64) -> Vec<FaceBox> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for det in dets.iter() {
        if keep
            .iter()
            .all(|kept| bbox_iou(&kept.corners(), &det.corners()) <= iou_thresh)
        {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
