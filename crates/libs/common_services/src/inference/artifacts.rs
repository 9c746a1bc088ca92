//! Crops and annotated renders, written next to the job. All functions here block.

use crate::inference::error::InferenceError;
use crate::inference::{DetectionOutput, DetectionRequest};
use common_types::DetectedObject;
use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// A detector box in model coordinates, before clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub xyxy: [f32; 4],
    pub confidence: f32,
    pub class_id: i64,
    pub label: String,
}

/// Clamps a box into `[0, width - 1] x [0, height - 1]`, truncating to whole pixels.
///
/// Inverted or empty boxes are widened to one pixel where the image allows it.
#[must_use]
pub fn clamp_box(xyxy: [f32; 4], width: u32, height: u32) -> [u32; 4] {
    let max_x = width.saturating_sub(1);
    let max_y = height.saturating_sub(1);
    let clamp = |value: f32, max: u32| (value.max(0.0) as u32).min(max);

    let [x1, y1, x2, y2] = xyxy;
    let (x1, y1) = (clamp(x1, max_x), clamp(y1, max_y));
    let (mut x2, mut y2) = (clamp(x2, max_x), clamp(y2, max_y));
    if x2 <= x1 {
        x2 = (x1 + 1).min(max_x);
    }
    if y2 <= y1 {
        y2 = (y1 + 1).min(max_y);
    }
    [x1, y1, x2, y2]
}

/// Keeps alphanumerics, `-` and `_`; everything else becomes `_`.
#[must_use]
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// `{stem}_obj{NNN}_{label}.jpg`, `index` being 1-based.
#[must_use]
pub fn crop_file_name(stem: &str, index: usize, label: &str) -> String {
    format!("{stem}_obj{index:03}_{}.jpg", sanitize_label(label))
}

#[must_use]
pub fn annotated_file_name(stem: &str) -> String {
    format!("{stem}_annotated.jpg")
}

fn box_rect(bbox: [u32; 4]) -> Rect {
    let [x1, y1, x2, y2] = bbox;
    Rect::at(x1 as i32, y1 as i32).of_size((x2 - x1).max(1), (y2 - y1).max(1))
}

/// Clamps and crops every detection, then renders the annotated copy of the photo.
///
/// A failed annotated render is logged and leaves `annotated` empty; crop failures are errors.
pub fn write_artifacts(
    request: &DetectionRequest,
    detections: Vec<RawDetection>,
) -> Result<DetectionOutput, InferenceError> {
    let photo = image::open(&request.image)?.to_rgb8();
    let (image_width, image_height) = photo.dimensions();
    fs::create_dir_all(&request.crops_dir)?;

    let mut objects = Vec::with_capacity(detections.len());
    for (i, detection) in detections.into_iter().enumerate() {
        let bbox = clamp_box(detection.xyxy, image_width, image_height);
        let [x1, y1, x2, y2] = bbox;
        let crop = imageops::crop_imm(&photo, x1, y1, (x2 - x1).max(1), (y2 - y1).max(1)).to_image();
        let crop_path = request
            .crops_dir
            .join(crop_file_name(&request.artifact_stem, i + 1, &detection.label));
        crop.save(&crop_path)?;

        let mut object = DetectedObject::new(detection.label, detection.class_id, detection.confidence, bbox);
        object.crop = Some(crop_path.to_string_lossy().into_owned());
        objects.push(object);
    }
    debug!("Wrote {} crops for {}", objects.len(), request.image.display());

    let annotated = render_annotated(&photo, &objects, request)
        .inspect_err(|e| warn!("Annotated render failed for {}: {e}", request.image.display()))
        .ok();

    Ok(DetectionOutput {
        objects,
        annotated,
        image_width,
        image_height,
    })
}

fn render_annotated(
    photo: &RgbImage,
    objects: &[DetectedObject],
    request: &DetectionRequest,
) -> Result<PathBuf, InferenceError> {
    fs::create_dir_all(&request.annotated_dir)?;
    let mut canvas = photo.clone();
    for object in objects {
        draw_hollow_rect_mut(&mut canvas, box_rect(object.bbox), BOX_COLOR);
    }
    let path = request.annotated_dir.join(annotated_file_name(&request.artifact_stem));
    canvas.save(&path)?;
    Ok(path)
}
