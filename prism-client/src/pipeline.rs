//! Transformation pipeline draft
//!
//! Keeps the declared step order consistent with the set of steps the
//! user has actually parameterized, while the form is edited in any
//! sequence. The invariant: the order is always a permutation of exactly
//! the effectively-present steps.
//!
//! Effective presence per step:
//! - resize: width or height set (fit alone does not count)
//! - crop: any of left/top/width/height set — a partial crop may exist
//!   while editing but blocks submission
//! - rotate: any value, zero included
//! - grayscale: exactly `true`; toggling off clears the field
//! - tint: non-empty after trimming

use std::collections::BTreeSet;

use thiserror::Error;

use shared::models::{CropParams, ResizeFit, ResizeParams, TransformStep, Transformation};

/// Rotation bounds in degrees
pub const ROTATE_MIN: i32 = -360;
pub const ROTATE_MAX: i32 = 360;

/// Draft validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// Crop has some but not all of its four fields
    #[error("Crop requires left, top, width and height together")]
    IncompleteCrop,

    /// Rotation outside [-360, 360]
    #[error("Rotation {0} is outside [{ROTATE_MIN}, {ROTATE_MAX}] degrees")]
    RotateOutOfRange(i32),

    /// No step carries parameters
    #[error("Pipeline has no steps")]
    EmptyPipeline,
}

/// Repair a step order against the effectively-present set
///
/// Steps no longer present are dropped; surviving steps keep their
/// relative positions; newly present steps are appended in canonical scan
/// sequence. When the sets already match the current order is returned
/// unchanged, so manual reordering survives edits that do not change the
/// set.
pub fn repair_order(
    current: &[TransformStep],
    present: &BTreeSet<TransformStep>,
) -> Vec<TransformStep> {
    let current_set: BTreeSet<TransformStep> = current.iter().copied().collect();
    if current_set == *present {
        return current.to_vec();
    }

    let mut order: Vec<TransformStep> = current
        .iter()
        .copied()
        .filter(|step| present.contains(step))
        .collect();
    // BTreeSet iteration is the canonical scan sequence
    order.extend(present.iter().copied().filter(|s| !current_set.contains(s)));
    order
}

/// A transformation form in progress
///
/// Every scalar sub-field is individually optional so the form can be
/// edited and re-cleared in any sequence; the declared order is repaired
/// after every edit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformationDraft {
    resize_width: Option<u32>,
    resize_height: Option<u32>,
    resize_fit: Option<ResizeFit>,
    crop_left: Option<u32>,
    crop_top: Option<u32>,
    crop_width: Option<u32>,
    crop_height: Option<u32>,
    rotate: Option<i32>,
    grayscale: Option<bool>,
    tint: Option<String>,
    order: Vec<TransformStep>,
}

impl TransformationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared order (a permutation of the effectively-present steps)
    pub fn order(&self) -> &[TransformStep] {
        &self.order
    }

    /// The effectively-present step set
    pub fn present_steps(&self) -> BTreeSet<TransformStep> {
        let mut present = BTreeSet::new();
        if self.resize_width.is_some() || self.resize_height.is_some() {
            present.insert(TransformStep::Resize);
        }
        if self.crop_left.is_some()
            || self.crop_top.is_some()
            || self.crop_width.is_some()
            || self.crop_height.is_some()
        {
            present.insert(TransformStep::Crop);
        }
        if self.rotate.is_some() {
            present.insert(TransformStep::Rotate);
        }
        if self.grayscale == Some(true) {
            present.insert(TransformStep::Grayscale);
        }
        if let Some(tint) = &self.tint {
            if !tint.trim().is_empty() {
                present.insert(TransformStep::Tint);
            }
        }
        present
    }

    fn refresh_order(&mut self) {
        self.order = repair_order(&self.order, &self.present_steps());
    }

    // ========== Field mutators ==========

    pub fn set_resize_width(&mut self, width: Option<u32>) {
        self.resize_width = width;
        self.refresh_order();
    }

    pub fn set_resize_height(&mut self, height: Option<u32>) {
        self.resize_height = height;
        self.refresh_order();
    }

    /// Fit alone never activates the resize step
    pub fn set_resize_fit(&mut self, fit: Option<ResizeFit>) {
        self.resize_fit = fit;
        self.refresh_order();
    }

    pub fn set_crop_left(&mut self, left: Option<u32>) {
        self.crop_left = left;
        self.refresh_order();
    }

    pub fn set_crop_top(&mut self, top: Option<u32>) {
        self.crop_top = top;
        self.refresh_order();
    }

    pub fn set_crop_width(&mut self, width: Option<u32>) {
        self.crop_width = width;
        self.refresh_order();
    }

    pub fn set_crop_height(&mut self, height: Option<u32>) {
        self.crop_height = height;
        self.refresh_order();
    }

    /// Clear the whole crop group at once
    pub fn clear_crop(&mut self) {
        self.crop_left = None;
        self.crop_top = None;
        self.crop_width = None;
        self.crop_height = None;
        self.refresh_order();
    }

    pub fn set_rotate(&mut self, degrees: Option<i32>) {
        self.rotate = degrees;
        self.refresh_order();
    }

    /// Toggling off stores "unset", never `false`, so absence detection
    /// stays uniform across steps.
    pub fn set_grayscale(&mut self, enabled: bool) {
        self.grayscale = if enabled { Some(true) } else { None };
        self.refresh_order();
    }

    pub fn set_tint(&mut self, tint: Option<String>) {
        self.tint = tint;
        self.refresh_order();
    }

    // ========== Manual reordering ==========

    /// Swap the step with its predecessor; stable under later recomputes
    /// as long as the present set does not change.
    pub fn move_up(&mut self, step: TransformStep) {
        if let Some(pos) = self.order.iter().position(|s| *s == step) {
            if pos > 0 {
                self.order.swap(pos, pos - 1);
            }
        }
    }

    /// Swap the step with its successor
    pub fn move_down(&mut self, step: TransformStep) {
        if let Some(pos) = self.order.iter().position(|s| *s == step) {
            if pos + 1 < self.order.len() {
                self.order.swap(pos, pos + 1);
            }
        }
    }

    /// Whether the draft can be submitted as-is
    pub fn is_submittable(&self) -> bool {
        self.build_request().is_ok()
    }

    /// Validate and assemble the request payload
    pub fn build_request(&self) -> Result<Transformation, PipelineError> {
        let crop = match (
            self.crop_left,
            self.crop_top,
            self.crop_width,
            self.crop_height,
        ) {
            (None, None, None, None) => None,
            (Some(left), Some(top), Some(width), Some(height)) => Some(CropParams {
                left,
                top,
                width,
                height,
            }),
            _ => return Err(PipelineError::IncompleteCrop),
        };

        if let Some(degrees) = self.rotate {
            if !(ROTATE_MIN..=ROTATE_MAX).contains(&degrees) {
                return Err(PipelineError::RotateOutOfRange(degrees));
            }
        }

        if self.order.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }

        let resize = if self.resize_width.is_some() || self.resize_height.is_some() {
            Some(ResizeParams {
                width: self.resize_width,
                height: self.resize_height,
                fit: self.resize_fit,
            })
        } else {
            None
        };

        let tint = self
            .tint
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Transformation {
            order: self.order.clone(),
            resize,
            crop,
            rotate: self.rotate,
            grayscale: self.grayscale.filter(|g| *g),
            tint,
        })
    }
}
