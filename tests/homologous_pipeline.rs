use std::fs;

use tiematch::coordinator::BinSkip;
use tiematch::{
    write_tie_point_file, AffineTransform, BinGridConfig, DetectorConfig, GeoImage,
    HomologousConfig, HomologousPointExtractor, IdentityTransform, ImageGeometry,
    KeypointConfig, OwnedImage, PixelRegion, Point2, SearchMode,
};

fn blob_image(width: usize, height: usize, centers: &[(f64, f64)]) -> OwnedImage {
    let mut data = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut v = 0.0;
            for &(cx, cy) in centers {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                v += 255.0 * (-(dx * dx + dy * dy) / 8.0).exp();
            }
            data[y * width + x] = v as f32;
        }
    }
    OwnedImage::new(data, width, height).unwrap()
}

fn blob_keypoints() -> KeypointConfig {
    KeypointConfig {
        detector: DetectorConfig {
            contrast_threshold: 8.0,
            ..DetectorConfig::default()
        },
        ..KeypointConfig::default()
    }
}

#[test]
fn identical_images_give_one_exact_tie_point() {
    let img = GeoImage::new(blob_image(256, 256, &[(132.0, 132.0)]), ImageGeometry::default());
    let cfg = HomologousConfig {
        keypoints: blob_keypoints(),
        ..HomologousConfig::default()
    };
    let extractor = HomologousPointExtractor::new(&img, &img, &IdentityTransform, cfg).unwrap();
    let report = extractor.match_bin(&PixelRegion::new(100, 100, 64, 64)).unwrap();

    assert_eq!(report.window, Some(PixelRegion::new(39, 39, 185, 185)));
    assert_eq!(report.keypoints1, 1);
    assert_eq!(report.keypoints2, 1);
    assert_eq!(report.landmarks, 1);
    assert_eq!(report.discarded, 0);
    assert_eq!(report.tie_points.len(), 1);
    let tp = report.tie_points[0];
    assert!(tp.error.unwrap() < 1e-3);
    assert!(tp.pixel1.distance(&Point2::new(132.0, 132.0)) < 1e-3);
    assert!(tp.pixel2.distance(&Point2::new(132.0, 132.0)) < 1e-3);
}

#[test]
fn prediction_three_precisions_away_is_discarded() {
    let img = GeoImage::new(blob_image(256, 256, &[(132.0, 132.0)]), ImageGeometry::default());
    let precision = 5.0;
    let shift = AffineTransform::translation(3.0 * precision, 0.0);
    let cfg = HomologousConfig {
        precision,
        keypoints: blob_keypoints(),
        ..HomologousConfig::default()
    };
    let extractor = HomologousPointExtractor::new(&img, &img, &shift, cfg).unwrap();
    let report = extractor.match_bin(&PixelRegion::new(100, 100, 64, 64)).unwrap();
    assert_eq!(report.landmarks, 1);
    assert_eq!(report.discarded, 1);
    assert!(report.tie_points.is_empty());
}

#[test]
fn flat_crops_produce_nothing_to_discard() {
    let img = GeoImage::new(OwnedImage::filled(200, 200, 0.0).unwrap(), ImageGeometry::default());
    let cfg = HomologousConfig {
        mode: SearchMode::GeoBins(BinGridConfig {
            bin_size: (64, 64),
            bin_step: (32, 32),
            margin: 10,
        }),
        ..HomologousConfig::default()
    };
    let extractor = HomologousPointExtractor::new(&img, &img, &IdentityTransform, cfg).unwrap();
    let report = extractor.run().unwrap();
    assert!(!report.bins.is_empty());
    for bin in &report.bins {
        assert_eq!((bin.keypoints1, bin.keypoints2, bin.landmarks), (0, 0, 0));
        assert_eq!(bin.skipped, None);
    }
    assert_eq!(report.discarded(), 0);
    assert!(report.tie_points().is_empty());
}

#[test]
fn too_small_bins_are_skipped_not_fatal() {
    let img = GeoImage::new(blob_image(120, 120, &[(40.0, 40.0)]), ImageGeometry::default());
    let cfg = HomologousConfig {
        mode: SearchMode::GeoBins(BinGridConfig {
            bin_size: (64, 64),
            bin_step: (0, 0),
            margin: 0,
        }),
        keypoints: blob_keypoints(),
        ..HomologousConfig::default()
    };
    let extractor = HomologousPointExtractor::new(&img, &img, &IdentityTransform, cfg).unwrap();
    let report = extractor.run().unwrap();
    // 120 = 64 + 56: the second row and column are cropped but still usable
    assert_eq!(report.bins.len(), 4);
    assert_eq!(report.skipped(), 0);

    let tiny = extractor.match_bin(&PixelRegion::new(0, 0, 5, 64)).unwrap();
    assert!(matches!(tiny.skipped, Some(BinSkip::Failed(_))));
    assert!(tiny.tie_points.is_empty());
}

#[test]
fn full_run_writes_world_coordinates_in_bin_order() {
    let geometry = ImageGeometry::new(Point2::new(1000.0, 2000.0), Point2::new(0.5, -0.5)).unwrap();
    let img = GeoImage::new(
        blob_image(256, 256, &[(40.0, 40.0), (170.0, 40.0)]),
        geometry,
    );
    let cfg = HomologousConfig {
        mode: SearchMode::GeoBins(BinGridConfig {
            bin_size: (64, 64),
            bin_step: (64, 64),
            margin: 10,
        }),
        keypoints: blob_keypoints(),
        ..HomologousConfig::default()
    };
    let extractor = HomologousPointExtractor::new(&img, &img, &IdentityTransform, cfg).unwrap();
    let report = extractor.run().unwrap();
    assert_eq!(report.bins.len(), 4);
    assert_eq!(report.bins[0].bin, PixelRegion::new(10, 10, 64, 64));
    assert_eq!(report.bins[1].bin, PixelRegion::new(138, 10, 64, 64));

    let tie_points = report.tie_points();
    assert_eq!(tie_points.len(), 2);
    assert!(tie_points[0].point1.distance(&Point2::new(1020.0, 1980.0)) < 1e-3);
    assert!(tie_points[1].point1.distance(&Point2::new(1085.0, 1980.0)) < 1e-3);

    let path = std::env::temp_dir().join(format!("tiematch-{}.txt", std::process::id()));
    write_tie_point_file(&path, &tie_points).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    for (line, tp) in lines.iter().zip(&tie_points) {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 4);
        assert!(fields.iter().all(|f| f.split('.').nth(1).map(str::len) == Some(12)));
        let x1: f64 = fields[0].parse().unwrap();
        let y2: f64 = fields[3].parse().unwrap();
        assert!((x1 - tp.point1.x).abs() < 1e-9);
        assert!((y2 - tp.point2.y).abs() < 1e-9);
    }
}

#[test]
fn empty_result_still_writes_file() {
    let path = std::env::temp_dir().join(format!("tiematch-empty-{}.txt", std::process::id()));
    write_tie_point_file(&path, &[]).unwrap();
    let meta = fs::metadata(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(meta.len(), 0);
}

#[test]
fn full_mode_uses_whole_images() {
    let img = GeoImage::new(blob_image(96, 96, &[(48.0, 48.0)]), ImageGeometry::default());
    let cfg = HomologousConfig {
        mode: SearchMode::Full,
        keypoints: blob_keypoints(),
        ..HomologousConfig::default()
    };
    let extractor = HomologousPointExtractor::new(&img, &img, &IdentityTransform, cfg).unwrap();
    assert_eq!(extractor.bins(), vec![PixelRegion::new(0, 0, 96, 96)]);
    let report = extractor.run().unwrap();
    assert_eq!(report.tie_points().len(), 1);
}
