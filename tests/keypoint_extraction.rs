use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiematch::{
    extract_keypoints, DescriptorKind, DetectorConfig, KeypointConfig, KeypointSetFilter,
    OwnedImage, PointSet, RasterRegion, TieMatchError,
};

/// Noise smoothed with a 3x3 box so extrema are not single-pixel spikes.
fn make_texture(width: usize, height: usize, seed: u64) -> OwnedImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise: Vec<f32> = (0..width * height)
        .map(|_| rng.random_range(0.0f32..255.0))
        .collect();
    let mut data = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0;
            let mut count = 0.0;
            for yy in y.saturating_sub(1)..(y + 2).min(height) {
                for xx in x.saturating_sub(1)..(x + 2).min(width) {
                    sum += noise[yy * width + xx];
                    count += 1.0;
                }
            }
            data[y * width + x] = sum / count;
        }
    }
    OwnedImage::new(data, width, height).unwrap()
}

fn make_blob(width: usize, height: usize, cx: f64, cy: f64) -> OwnedImage {
    let mut data = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            data[y * width + x] = (255.0 * (-(dx * dx + dy * dy) / 8.0).exp()) as f32;
        }
    }
    OwnedImage::new(data, width, height).unwrap()
}

fn blob_config() -> KeypointConfig {
    KeypointConfig {
        detector: DetectorConfig {
            contrast_threshold: 8.0,
            ..DetectorConfig::default()
        },
        ..KeypointConfig::default()
    }
}

fn assert_same_points(a: &PointSet, b: &PointSet) {
    assert_eq!(a.len(), b.len());
    for (pa, pb) in a.iter().zip(b.iter()) {
        assert_eq!(pa.x().to_bits(), pb.x().to_bits());
        assert_eq!(pa.y().to_bits(), pb.y().to_bits());
        let da: Vec<u32> = pa.descriptor().iter().map(|v| v.to_bits()).collect();
        let db: Vec<u32> = pb.descriptor().iter().map(|v| v.to_bits()).collect();
        assert_eq!(da, db);
    }
}

#[test]
fn extraction_is_deterministic() {
    let img = make_texture(96, 80, 11);
    let cfg = KeypointConfig::default();
    let first = extract_keypoints(RasterRegion::new(img.view()), &cfg).unwrap();
    let second = extract_keypoints(RasterRegion::new(img.view()), &cfg).unwrap();
    assert!(!first.is_empty());
    assert_same_points(&first, &second);
}

#[test]
fn export_order_is_lexicographic() {
    let img = make_texture(96, 96, 3);
    let set = extract_keypoints(RasterRegion::new(img.view()), &KeypointConfig::default()).unwrap();
    assert!(set.len() > 1);
    for pair in set.points().windows(2) {
        let order = pair[0]
            .x()
            .total_cmp(&pair[1].x())
            .then(pair[0].y().total_cmp(&pair[1].y()));
        assert_eq!(order, std::cmp::Ordering::Less);
    }
}

#[test]
fn keypoints_stay_inside_region_footprint() {
    let img = make_texture(80, 72, 5);
    let region = RasterRegion::new(img.view()).with_offset(300, 120);
    let footprint = region.footprint();
    let cfg = KeypointConfig {
        iterations: 4,
        ..KeypointConfig::default()
    };
    let set = extract_keypoints(region, &cfg).unwrap();
    assert!(!set.is_empty());
    for key in &set {
        assert!(footprint.contains(&key.position()), "{:?}", key.position());
        assert_eq!(key.descriptor().len(), 8);
        // the first detection always fills its own pair
        let slot = 2 * key.first_iteration();
        assert!(key.descriptor()[slot].is_finite());
        assert!(key.descriptor()[slot + 1].is_finite());
    }
}

#[test]
fn orientations_are_quantized() {
    let img = make_texture(64, 64, 9);
    let set = extract_keypoints(RasterRegion::new(img.view()), &KeypointConfig::default()).unwrap();
    for key in &set {
        for pair in key.descriptor().chunks(2) {
            if pair[1].is_nan() {
                continue;
            }
            assert!((0.0..360.0).contains(&pair[1]));
            assert_eq!(pair[1] % 10.0, 0.0);
            assert!(pair[0] >= 0.0);
        }
    }
}

#[test]
fn histogram_descriptors_are_unit_length() {
    let img = make_texture(64, 64, 21);
    let cfg = KeypointConfig {
        descriptor: DescriptorKind::OrientationHistogram { bins: 36, radius: 4 },
        ..KeypointConfig::default()
    };
    let set = extract_keypoints(RasterRegion::new(img.view()), &cfg).unwrap();
    assert!(!set.is_empty());
    for key in &set {
        assert_eq!(key.descriptor().len(), 36);
        let norm: f32 = key.descriptor().iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-4);
    }
}

#[test]
fn shifted_blob_shifts_keypoint() {
    let a = make_blob(96, 96, 40.0, 40.0);
    let b = make_blob(96, 96, 47.0, 45.0);
    let set_a = extract_keypoints(RasterRegion::new(a.view()), &blob_config()).unwrap();
    let set_b = extract_keypoints(RasterRegion::new(b.view()), &blob_config()).unwrap();
    assert_eq!(set_a.len(), 1);
    assert_eq!(set_b.len(), 1);
    let pa = set_a.points()[0].position();
    let pb = set_b.points()[0].position();
    assert!((pb.x - pa.x - 7.0).abs() < 1e-3);
    assert!((pb.y - pa.y - 5.0).abs() < 1e-3);
}

#[test]
fn blank_region_yields_empty_set() {
    let img = OwnedImage::filled(64, 48, 17.0).unwrap();
    let mut filter = KeypointSetFilter::new(KeypointConfig::default());
    filter.set_input(RasterRegion::new(img.view()));
    let set = filter.update().unwrap();
    assert!(set.is_empty());
}

#[test]
fn region_smaller_than_pyramid_is_rejected() {
    let img = OwnedImage::filled(5, 40, 0.0).unwrap();
    let err = extract_keypoints(RasterRegion::new(img.view()), &KeypointConfig::default())
        .unwrap_err();
    assert!(matches!(err, TieMatchError::RegionTooSmall { width: 5, height: 40, .. }));
}

#[test]
fn invalid_configuration_is_reported() {
    let img = OwnedImage::filled(32, 32, 0.0).unwrap();
    let cfg = KeypointConfig {
        iterations: 0,
        ..KeypointConfig::default()
    };
    assert!(matches!(
        extract_keypoints(RasterRegion::new(img.view()), &cfg),
        Err(TieMatchError::InvalidConfig { .. })
    ));
}
