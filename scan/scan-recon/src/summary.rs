//! Per-object geometry summaries.

// Sample counts are bounded by the reservoir capacity.
#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::obb::{OrientedBoundingBox, centroid};
use crate::reservoir::ObjectAccumulator;

/// Bounding box as written to the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBoxSummary {
    /// Box center in world space.
    pub center: [f64; 3],
    /// Full widths along each axis.
    pub extents: [f64; 3],
    /// Unit axes, largest variance first.
    pub axes: [[f64; 3]; 3],
    /// Orientation as `[w, x, y, z]`.
    pub quaternion: [f64; 4],
}

impl From<&OrientedBoundingBox> for BoundingBoxSummary {
    fn from(obb: &OrientedBoundingBox) -> Self {
        Self {
            center: obb.center.into(),
            extents: obb.extents.into(),
            axes: obb.axes.map(Into::into),
            quaternion: obb.quaternion_wxyz(),
        }
    }
}

/// Immutable description of one reconstructed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Object identifier.
    pub id: String,
    /// Semantic label supplied by the segmentation source.
    pub label: Option<String>,
    /// Number of sampled points.
    pub point_count: usize,
    /// Mean of the sampled points.
    pub centroid: [f64; 3],
    /// Mean encoded confidence scaled to `[0, 1]`.
    pub average_confidence: Option<f64>,
    /// Principal-axis bounding box.
    pub bounding_box: BoundingBoxSummary,
    /// Point cloud file name, relative to the output directory.
    pub point_cloud_file: String,
}

/// Summarizes one accumulator.
///
/// Returns `None` for an accumulator with no points.
#[must_use]
pub fn summarize(accumulator: &ObjectAccumulator, point_cloud_file: &str) -> Option<ObjectSummary> {
    let points = accumulator.points();
    let center = centroid(points)?;
    let obb = OrientedBoundingBox::fit(points, &center);

    let summary = ObjectSummary {
        id: accumulator.id().to_string(),
        label: accumulator.label().map(str::to_owned),
        point_count: points.len(),
        centroid: center.into(),
        average_confidence: average_confidence(accumulator.confidences()),
        bounding_box: BoundingBoxSummary::from(&obb),
        point_cloud_file: point_cloud_file.to_string(),
    };

    debug!(
        id = %summary.id,
        points = summary.point_count,
        seen = accumulator.total_seen(),
        extents = ?summary.bounding_box.extents,
        "summarized object"
    );
    Some(summary)
}

/// Mean of encoded confidences, scaled to `[0, 1]`.
#[must_use]
pub fn average_confidence(confidences: &[u8]) -> Option<f64> {
    if confidences.is_empty() {
        return None;
    }
    let sum: u64 = confidences.iter().map(|&c| u64::from(c)).sum();
    Some(sum as f64 / confidences.len() as f64 / 255.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sensor_types::ObjectId;

    fn accumulator(points: &[([f32; 3], u8)]) -> ObjectAccumulator {
        let mut rng = StdRng::seed_from_u64(0);
        let mut acc = ObjectAccumulator::new(ObjectId::from("mug"), 100);
        acc.adopt_label(Some("mug"));
        for &(point, confidence) in points {
            acc.append(point, confidence, &mut rng);
        }
        acc
    }

    #[test]
    fn test_average_confidence() {
        assert!(average_confidence(&[]).is_none());
        assert_relative_eq!(average_confidence(&[255, 255]).unwrap(), 1.0);
        assert_relative_eq!(average_confidence(&[0, 255]).unwrap(), 0.5);
    }

    #[test]
    fn test_empty_accumulator_has_no_summary() {
        assert!(summarize(&accumulator(&[]), "mug.ply").is_none());
    }

    #[test]
    fn test_summary_fields() {
        let acc = accumulator(&[
            ([0.0, 0.0, 0.0], 255),
            ([2.0, 0.0, 0.0], 255),
            ([0.0, 1.0, 0.0], 0),
            ([2.0, 1.0, 0.0], 0),
        ]);
        let summary = summarize(&acc, "mug.ply").unwrap();

        assert_eq!(summary.id, "mug");
        assert_eq!(summary.label.as_deref(), Some("mug"));
        assert_eq!(summary.point_count, 4);
        assert_eq!(summary.point_cloud_file, "mug.ply");
        assert_relative_eq!(summary.centroid[0], 1.0);
        assert_relative_eq!(summary.centroid[1], 0.5);
        assert_relative_eq!(summary.average_confidence.unwrap(), 0.5);
        assert_relative_eq!(summary.bounding_box.extents[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(summary.bounding_box.extents[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_summary() {
        let acc = accumulator(&[([1.0, 2.0, 3.0], 10), ([3.0, 2.0, 3.0], 10)]);
        let summary = summarize(&acc, "mug.ply").unwrap();

        assert_eq!(summary.bounding_box.extents, [0.0; 3]);
        assert_eq!(summary.bounding_box.quaternion, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(
            summary.bounding_box.axes,
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
        );
        assert_relative_eq!(summary.bounding_box.center[0], 2.0);
    }

    #[test]
    fn test_json_field_names() {
        let acc = accumulator(&[([0.0, 0.0, 0.0], 255)]);
        let summary = summarize(&acc, "mug.ply").unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["pointCount"], 1);
        assert_eq!(json["pointCloudFile"], "mug.ply");
        assert!(json["averageConfidence"].is_number());
        assert!(json["boundingBox"]["quaternion"].is_array());
    }
}
