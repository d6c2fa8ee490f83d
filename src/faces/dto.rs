use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo::{DetectionRow, UserStats};
use crate::detector::FaceRegion;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResponse {
    pub success: bool,
    pub face_count: u32,
    pub faces: Vec<FaceRegion>,
    /// Wall-clock ms from acquisition through detection completion.
    pub processing_time: i64,
    pub image_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// `page` is 1-based; `limit` must be positive. Pages past the end get
    /// consistent metadata rather than an error.
    pub fn new(page: i64, limit: i64, total_count: i64) -> Self {
        let total_pages = (total_count + limit - 1) / limit;
        Self {
            current_page: page,
            total_pages,
            total_count,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: i64,
    pub face_count: i32,
    pub processing_time_ms: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub image_url: Option<String>,
    pub file_name: String,
    pub file_path: Option<String>,
}

impl From<DetectionRow> for HistoryItem {
    fn from(r: DetectionRow) -> Self {
        Self {
            id: r.id,
            face_count: r.face_count,
            processing_time_ms: r.processing_time_ms,
            created_at: r.created_at,
            image_url: r.image_url,
            file_name: r.file_name,
            file_path: r.file_path,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub detections: Vec<HistoryItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_images: i64,
    pub total_detections: i64,
    pub total_faces_detected: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub joined_date: Option<OffsetDateTime>,
}

impl From<UserStats> for StatsResponse {
    fn from(s: UserStats) -> Self {
        Self {
            total_images: s.total_images,
            total_detections: s.total_detections,
            total_faces_detected: s.total_faces_detected,
            joined_date: s.joined_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_total_pages_is_ceiling() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 1).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
        assert_eq!(Pagination::new(1, 3, 7).total_pages, 3);
        assert_eq!(Pagination::new(1, 1, 7).total_pages, 7);
    }

    #[test]
    fn pagination_flags_first_middle_last() {
        let first = Pagination::new(1, 10, 35);
        assert!(first.has_next && !first.has_prev);

        let middle = Pagination::new(2, 10, 35);
        assert!(middle.has_next && middle.has_prev);

        let last = Pagination::new(4, 10, 35);
        assert!(!last.has_next && last.has_prev);
    }

    #[test]
    fn pagination_past_the_end_is_consistent() {
        let p = Pagination::new(9, 10, 35);
        assert_eq!(p.current_page, 9);
        assert_eq!(p.total_pages, 4);
        assert!(!p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn responses_serialize_camel_case() {
        let response = DetectionResponse {
            success: true,
            face_count: 2,
            faces: vec![],
            processing_time: 734,
            image_id: 5,
            file_name: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"faceCount\":2"));
        assert!(json.contains("\"processingTime\":734"));
        assert!(json.contains("\"imageId\":5"));
        // Absent for URL-sourced detections.
        assert!(!json.contains("fileName"));

        let json = serde_json::to_string(&Pagination::new(2, 10, 35)).unwrap();
        assert!(json.contains("\"currentPage\":2"));
        assert!(json.contains("\"totalPages\":4"));
        assert!(json.contains("\"totalCount\":35"));
        assert!(json.contains("\"hasNext\":true"));
        assert!(json.contains("\"hasPrev\":true"));
    }

    #[test]
    fn empty_stats_serialize_zeroes_and_null() {
        let json = serde_json::to_string(&StatsResponse {
            total_images: 0,
            total_detections: 0,
            total_faces_detected: 0,
            joined_date: None,
        })
        .unwrap();
        assert!(json.contains("\"totalImages\":0"));
        assert!(json.contains("\"totalDetections\":0"));
        assert!(json.contains("\"totalFacesDetected\":0"));
        assert!(json.contains("\"joinedDate\":null"));
    }
}
