use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use super::{Detection, FaceDetector, FaceRegion};
use crate::faces::normalize::NormalizedImage;

/// Offline detector: sleeps to simulate inference latency, then returns a
/// pseudo-random set of faces. Used when no vision credentials are
/// configured and as the fallback behind the remote detector.
pub struct SyntheticDetector {
    delay_ms: RangeInclusive<u64>,
}

impl SyntheticDetector {
    pub fn new(delay_ms: RangeInclusive<u64>) -> Self {
        Self { delay_ms }
    }
}

impl Default for SyntheticDetector {
    fn default() -> Self {
        Self::new(500..=1500)
    }
}

#[async_trait]
impl FaceDetector for SyntheticDetector {
    async fn detect(&self, _image: &NormalizedImage) -> Detection {
        // ThreadRng is not Send, so draw the delay before awaiting.
        let delay = rand::thread_rng().gen_range(self.delay_ms.clone());
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let mut rng = rand::thread_rng();
        let face_count = rng.gen_range(1..=5u32);
        let faces = (1..=face_count)
            .map(|id| FaceRegion {
                id,
                x: rng.gen_range(0.0..0.8),
                y: rng.gen_range(0.0..0.8),
                width: rng.gen_range(0.1..0.3),
                height: rng.gen_range(0.1..0.3),
                confidence: rng.gen_range(0.7..1.0),
            })
            .collect();

        Detection { face_count, faces }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn blank_image() -> NormalizedImage {
        NormalizedImage {
            bytes: Bytes::from_static(b"not inspected"),
            width: 800,
            height: 600,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn produces_one_to_five_well_formed_faces() {
        let detector = SyntheticDetector::default();
        for _ in 0..20 {
            let detection = detector.detect(&blank_image()).await;
            assert!((1..=5).contains(&detection.face_count));
            assert_eq!(detection.face_count as usize, detection.faces.len());
            for (i, face) in detection.faces.iter().enumerate() {
                assert_eq!(face.id, i as u32 + 1);
                for v in [face.x, face.y, face.width, face.height, face.confidence] {
                    assert!((0.0..=1.0).contains(&v), "field out of range: {v}");
                }
                assert!(face.confidence >= 0.7);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn respects_configured_delay_bounds() {
        let detector = SyntheticDetector::new(500..=1500);
        let started = tokio::time::Instant::now();
        detector.detect(&blank_image()).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed <= Duration::from_millis(1500) + Duration::from_millis(1));
    }
}
