//! Entity models shared between the client engine and the server

pub mod image;
pub mod transformation;

pub use image::{Image, Like, TransformedImage, UploadResponse};
pub use transformation::{
    CropParams, ResizeFit, ResizeParams, TransformStep, Transformation,
};
