//! End-to-end reconstruction tests.
//!
//! Each test drives a [`ReconstructionEngine`] the way a capture session
//! would: segmentation frames are enqueued, depth frames are processed, and
//! the session is finalized to a temporary directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use scan_recon::{
    ObjectAccumulator, ObjectSummary, ReconstructionEngine, ReconstructionParams,
    read_point_cloud,
};
use sensor_types::{
    CameraIntrinsics, ConfidenceMap, DepthFrame, DepthMap, MaskBuffer, ObjectId,
    SegmentationFrame, SegmentationMask, Timestamp,
};
use tempfile::tempdir;

fn seeded_engine() -> ReconstructionEngine {
    ReconstructionEngine::new(ReconstructionParams::default().with_seed(2024)).unwrap()
}

fn depth_frame(secs: f64, width: u32, height: u32, depth: f32) -> DepthFrame {
    DepthFrame::new(
        Timestamp::from_secs_f64(secs),
        DepthMap::filled(width, height, depth),
        CameraIntrinsics::identity(),
        Matrix4::identity(),
    )
}

fn single_mask(secs: f64, id: &str, mask: MaskBuffer) -> SegmentationFrame {
    SegmentationFrame::new(
        Timestamp::from_secs_f64(secs),
        vec![SegmentationMask::new(id, mask)],
    )
}

#[test]
fn identity_camera_two_by_two_frame() {
    let mut engine = seeded_engine();
    engine.enqueue(single_mask(1.0, "obj1", MaskBuffer::full(2, 2)));
    let report = engine.process(&depth_frame(1.0, 2, 2, 2.0));
    assert_eq!(report.matched, 1);

    let accumulators: Vec<&ObjectAccumulator> = engine.accumulators().collect();
    assert_eq!(accumulators.len(), 1);

    let acc = accumulators[0];
    assert_eq!(acc.id().as_str(), "obj1");
    assert_eq!(acc.len(), 4);
    assert_eq!(acc.total_seen(), 4);
    for (point, confidence) in acc.samples() {
        assert_relative_eq!(point[2], 2.0);
        assert_eq!(confidence, 255);
    }
}

#[test]
fn no_segmentation_produces_no_output() {
    let dir = tempdir().unwrap();
    let mut engine = seeded_engine();
    for i in 0..10 {
        engine.process(&depth_frame(f64::from(i) * 0.1, 4, 4, 1.0));
    }

    assert!(
        engine
            .finalize(dir.path(), &dir.path().join("index.json"))
            .is_none()
    );
    assert_eq!(engine.stats().depth_frames, 10);
}

#[test]
fn reservoir_caps_long_streams() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut acc = ObjectAccumulator::new(ObjectId::from("big"), 200_000);
    for i in 0..300_000u32 {
        acc.append([i as f32, 0.0, 0.0], 255, &mut rng);
    }

    assert_eq!(acc.len(), 200_000);
    assert_eq!(acc.total_seen(), 300_000);
}

#[test]
fn engine_caps_points_per_object() {
    let params = ReconstructionParams::default().with_seed(3).with_max_points(1000);
    let mut engine = ReconstructionEngine::new(params).unwrap();

    // 40 frames of 64x64 masked pixels: 163 840 points offered.
    for i in 0..40 {
        let t = f64::from(i) * 0.1;
        engine.enqueue(single_mask(t, "wall", MaskBuffer::full(64, 64)));
        engine.process(&depth_frame(t, 64, 64, 3.0));
    }

    let acc = engine.accumulator(&"wall".into()).unwrap();
    assert_eq!(acc.len(), 1000);
    assert_eq!(acc.total_seen(), 40 * 64 * 64);
    assert_eq!(engine.stats().points_offered, 40 * 64 * 64);
}

#[test]
fn half_depth_confidence_with_half_mask_confidence() {
    let mut engine = seeded_engine();
    let frame = depth_frame(1.0, 2, 2, 1.0).with_confidence(ConfidenceMap::filled(2, 2, 1));
    engine.enqueue(SegmentationFrame::new(
        Timestamp::from_secs_f64(1.0),
        vec![SegmentationMask::new("obj", MaskBuffer::full(2, 2)).with_confidence(0.5)],
    ));
    engine.process(&frame);

    let acc = engine.accumulator(&"obj".into()).unwrap();
    assert_eq!(acc.len(), 4);
    assert!(acc.confidences().iter().all(|&c| c == 64));
}

#[test]
fn segmentation_matched_within_tolerance() {
    let mut engine = seeded_engine();
    engine.enqueue(single_mask(1.000, "obj", MaskBuffer::full(2, 2)));

    let report = engine.process(&depth_frame(1.030, 2, 2, 1.0));
    assert_eq!(report.matched, 1);
    assert!(engine.accumulator(&"obj".into()).is_some());
    assert_eq!(engine.pending_frames(), 0);
}

#[test]
fn segmentation_between_distant_depth_frames_expires() {
    let mut engine = seeded_engine();
    engine.enqueue(single_mask(1.000, "obj", MaskBuffer::full(2, 2)));

    let early = engine.process(&depth_frame(0.800, 2, 2, 1.0));
    assert_eq!(early.matched, 0);
    assert_eq!(engine.pending_frames(), 1);

    let late = engine.process(&depth_frame(1.200, 2, 2, 1.0));
    assert_eq!(late.matched, 0);
    assert_eq!(late.expired, 1);

    assert!(engine.accumulator(&"obj".into()).is_none());
    assert_eq!(engine.pending_frames(), 0);
    assert_eq!(engine.stats().frames_expired, 1);
}

#[test]
fn masks_are_never_matched_twice() {
    let mut engine = seeded_engine();
    engine.enqueue(single_mask(1.0, "obj", MaskBuffer::full(2, 2)));

    engine.process(&depth_frame(1.0, 2, 2, 1.0));
    engine.process(&depth_frame(1.01, 2, 2, 1.0));

    assert_eq!(engine.accumulator(&"obj".into()).unwrap().total_seen(), 4);
    assert_eq!(engine.stats().frames_matched, 1);
}

#[test]
fn pending_queue_is_bounded() {
    let mut params = ReconstructionParams::default().with_seed(1);
    params.max_pending_frames = 4;
    let mut engine = ReconstructionEngine::new(params).unwrap();

    for i in 0..10 {
        engine.enqueue(single_mask(f64::from(i), "obj", MaskBuffer::full(2, 2)));
    }

    assert_eq!(engine.pending_frames(), 4);
    assert_eq!(engine.stats().frames_evicted, 6);
    assert_eq!(engine.stats().segmentation_frames, 10);
}

#[test]
fn camera_pose_places_points_in_world() {
    let mut engine = seeded_engine();
    let intrinsics = CameraIntrinsics::new(2.0, 2.0, 1.0, 1.0, 0, 0);
    let pose = Matrix4::new_translation(&Vector3::new(10.0, 0.0, -5.0));
    let frame = DepthFrame::new(
        Timestamp::from_secs_f64(2.0),
        DepthMap::filled(3, 3, 4.0),
        intrinsics,
        pose,
    );
    let mut mask = vec![0u8; 9];
    mask[4] = 255;
    engine.enqueue(single_mask(2.0, "dot", MaskBuffer::gray8(3, 3, mask)));
    engine.process(&frame);

    let acc = engine.accumulator(&"dot".into()).unwrap();
    assert_eq!(acc.len(), 1);
    let p = acc.points()[0];
    assert_relative_eq!(p[0], 10.0);
    assert_relative_eq!(p[1], 0.0);
    assert_relative_eq!(p[2], -1.0);
}

#[test]
fn finalize_writes_point_clouds_and_index() {
    let dir = tempdir().unwrap();
    let output_dir = dir.path().join("objects");
    let index_path = dir.path().join("index.json");

    let mut engine = seeded_engine();
    engine.enqueue(SegmentationFrame::new(
        Timestamp::from_secs_f64(1.0),
        vec![
            SegmentationMask::new("table", MaskBuffer::gray8(4, 4, vec![255; 16]))
                .with_label("table"),
            SegmentationMask::new("lamp", MaskBuffer::gray8(4, 4, [0, 255].repeat(8))),
        ],
    ));
    let mut frame = depth_frame(1.0, 4, 4, 2.0);
    frame.depth.depths = (0..16).map(|i| 1.0 + i as f32 * 0.1).collect();
    engine.process(&frame);

    let output = engine.finalize(&output_dir, &index_path).unwrap();
    assert_eq!(output.object_count, 2);
    assert_eq!(output.index_path, index_path);

    let ids: Vec<&str> = output.summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["lamp", "table"]);

    let table = &output.summaries[1];
    assert_eq!(table.label.as_deref(), Some("table"));
    assert_eq!(table.point_count, 16);
    assert_eq!(table.point_cloud_file, "table.ply");
    assert_relative_eq!(table.average_confidence.unwrap(), 1.0);

    let cloud = read_point_cloud(output_dir.join("table.ply")).unwrap();
    assert_eq!(cloud.len(), 16);
    let lamp = read_point_cloud(output_dir.join("lamp.ply")).unwrap();
    assert_eq!(lamp.len(), 8);

    let index: Vec<ObjectSummary> =
        serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).unwrap();
    assert_eq!(index, output.summaries);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).unwrap();
    assert_eq!(raw[0]["pointCloudFile"], "lamp.ply");
    assert!(raw[0]["label"].is_null());
    assert_eq!(raw[1]["boundingBox"]["axes"].as_array().unwrap().len(), 3);
}

#[test]
fn finalize_summaries_have_right_handed_boxes() {
    let dir = tempdir().unwrap();
    let mut engine = seeded_engine();

    // A tilted plane so the covariance has distinct axes.
    let mut frame = depth_frame(0.5, 8, 6, 1.0);
    frame.depth.depths = (0..48)
        .map(|i| 1.0 + (i % 8) as f32 * 0.05 + (i / 8) as f32 * 0.01)
        .collect();
    engine.enqueue(single_mask(0.5, "plane", MaskBuffer::full(8, 6)));
    engine.process(&frame);

    let output = engine
        .finalize(dir.path(), &dir.path().join("index.json"))
        .unwrap();
    let bbox = &output.summaries[0].bounding_box;
    let axes: Vec<Vector3<f64>> = bbox.axes.iter().map(|a| Vector3::from(*a)).collect();

    for axis in &axes {
        assert_relative_eq!(axis.norm(), 1.0, epsilon = 1e-6);
    }
    assert_relative_eq!(axes[0].dot(&axes[1]), 0.0, epsilon = 1e-6);
    assert_relative_eq!(axes[0].cross(&axes[1]).dot(&axes[2]), 1.0, epsilon = 1e-6);
}

#[test]
fn two_point_object_uses_fallback_box() {
    let dir = tempdir().unwrap();
    let mut engine = seeded_engine();
    engine.enqueue(single_mask(1.0, "pair", MaskBuffer::gray8(2, 1, vec![255, 255])));
    engine.process(&depth_frame(1.0, 2, 1, 1.0));

    let output = engine
        .finalize(dir.path(), &dir.path().join("index.json"))
        .unwrap();
    let summary = &output.summaries[0];
    assert_eq!(summary.point_count, 2);
    assert_eq!(summary.bounding_box.extents, [0.0; 3]);
    assert_eq!(
        summary.bounding_box.axes,
        [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
    );
    assert_relative_eq!(summary.bounding_box.center[0], summary.centroid[0]);
}
