//! Transformation Pipeline Model

use serde::{Deserialize, Serialize};

/// A single pipeline step tag
///
/// The derived `Ord` gives the canonical scan sequence used when newly
/// activated steps are appended to a pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStep {
    Resize,
    Crop,
    Rotate,
    Grayscale,
    Tint,
}

impl TransformStep {
    /// All step tags in canonical scan sequence
    pub const ALL: [TransformStep; 5] = [
        TransformStep::Resize,
        TransformStep::Crop,
        TransformStep::Rotate,
        TransformStep::Grayscale,
        TransformStep::Tint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformStep::Resize => "resize",
            TransformStep::Crop => "crop",
            TransformStep::Rotate => "rotate",
            TransformStep::Grayscale => "grayscale",
            TransformStep::Tint => "tint",
        }
    }
}

impl std::fmt::Display for TransformStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resize fit mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFit {
    Cover,
    Contain,
    Fill,
    Inside,
    Outside,
}

/// Resize parameters
///
/// Width and height are individually optional; `fit` alone does not make
/// the step effective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<ResizeFit>,
}

/// Crop parameters, all four fields required together on submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropParams {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// An ordered transformation pipeline
///
/// `order` lists exactly the steps whose parameter field is set, in the
/// sequence the server must apply them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub order: Vec<TransformStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<ResizeParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropParams>,
    /// Degrees in [-360, 360]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<i32>,
    /// Only ever serialized as `true`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grayscale: Option<bool>,
    /// Non-empty color string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
}

impl Transformation {
    /// Steps that carry parameters, in canonical scan sequence
    pub fn present_steps(&self) -> Vec<TransformStep> {
        let mut steps = Vec::new();
        if self.resize.is_some() {
            steps.push(TransformStep::Resize);
        }
        if self.crop.is_some() {
            steps.push(TransformStep::Crop);
        }
        if self.rotate.is_some() {
            steps.push(TransformStep::Rotate);
        }
        if self.grayscale == Some(true) {
            steps.push(TransformStep::Grayscale);
        }
        if self.tint.is_some() {
            steps.push(TransformStep::Tint);
        }
        steps
    }
}
