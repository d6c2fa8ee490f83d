use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::faces::normalize::NormalizedImage;

pub mod remote;
pub mod synthetic;

/// A detected face as a fractional bounding box plus confidence.
///
/// Geometry is expressed as fractions of the normalized image's own
/// dimensions, all in [0, 1]. `id` is a 1-based ordinal within one
/// detection call, not stable across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub face_count: u32,
    pub faces: Vec<FaceRegion>,
}

/// Pluggable detection capability. Implementations must not fail: the
/// remote variant absorbs its own errors by falling back to the synthetic
/// one, so the request pipeline always gets a result.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image: &NormalizedImage) -> Detection;
}
