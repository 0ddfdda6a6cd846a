use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tiematch::image::io::load_band;
use tiematch::{
    write_tie_point_file, AffineTransform, BinGridConfig, DescriptorKind, DetectorConfig,
    DistanceMetric, GeoImage, HomologousConfig, HomologousPointExtractor, HomologousReport,
    ImageGeometry, KeypointConfig, MatchingConfig, Neighborhood, Point2, ResponseFamily,
    ScaleSpaceConfig, SearchMode,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "TieMatch CLI (JSON config driven)")]
struct Cli {
    /// JSON file describing both images, the transform and the matcher.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Write a default configuration to stdout instead of running.
    #[arg(long)]
    print_example: bool,
    /// Log per-bin spans and events to stderr.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct GeometryJson {
    origin: [f64; 2],
    spacing: [f64; 2],
}

impl Default for GeometryJson {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0],
            spacing: [1.0, 1.0],
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct ImageJson {
    path: String,
    /// 1-based band index.
    band: usize,
    geometry: GeometryJson,
}

impl Default for ImageJson {
    fn default() -> Self {
        Self {
            path: String::new(),
            band: 1,
            geometry: GeometryJson::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct AffineJson {
    /// `[a, b, c, d, e, f]` with `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
    coefficients: [f64; 6],
}

impl Default for AffineJson {
    fn default() -> Self {
        Self {
            coefficients: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum ModeConfig {
    Full,
    GeoBins,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct BinsJson {
    bin_size: [usize; 2],
    bin_step: [usize; 2],
    margin: usize,
}

impl Default for BinsJson {
    fn default() -> Self {
        let cfg = BinGridConfig::default();
        Self {
            bin_size: [cfg.bin_size.0, cfg.bin_size.1],
            bin_step: [cfg.bin_step.0, cfg.bin_step.1],
            margin: cfg.margin,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum FamilyConfig {
    DifferenceOfGaussians,
    GradientMagnitude,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum NeighborhoodConfig {
    Spatial,
    ScaleSpace,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum DescriptorConfig {
    MagnitudeOrientation,
    OrientationHistogram,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct KeypointsJson {
    iterations: usize,
    family: FamilyConfig,
    initial_sigma: f32,
    scales_per_octave: usize,
    neighborhood: NeighborhoodConfig,
    radius: usize,
    contrast_threshold: f32,
    border: usize,
    subpixel: bool,
    descriptor: DescriptorConfig,
    orientation_step_deg: f32,
    histogram_bins: usize,
    histogram_radius: usize,
}

impl Default for KeypointsJson {
    fn default() -> Self {
        let cfg = KeypointConfig::default();
        Self {
            iterations: cfg.iterations,
            family: FamilyConfig::DifferenceOfGaussians,
            initial_sigma: cfg.scale_space.initial_sigma,
            scales_per_octave: cfg.scale_space.scales_per_octave,
            neighborhood: NeighborhoodConfig::Spatial,
            radius: cfg.detector.radius,
            contrast_threshold: cfg.detector.contrast_threshold,
            border: cfg.detector.border,
            subpixel: cfg.subpixel,
            descriptor: DescriptorConfig::MagnitudeOrientation,
            orientation_step_deg: 10.0,
            histogram_bins: 36,
            histogram_radius: 4,
        }
    }
}

impl KeypointsJson {
    fn to_config(&self, parallel: bool) -> KeypointConfig {
        KeypointConfig {
            iterations: self.iterations,
            scale_space: ScaleSpaceConfig {
                family: match self.family {
                    FamilyConfig::DifferenceOfGaussians => ResponseFamily::DifferenceOfGaussians,
                    FamilyConfig::GradientMagnitude => ResponseFamily::GradientMagnitude,
                },
                initial_sigma: self.initial_sigma,
                scales_per_octave: self.scales_per_octave,
            },
            detector: DetectorConfig {
                neighborhood: match self.neighborhood {
                    NeighborhoodConfig::Spatial => Neighborhood::Spatial,
                    NeighborhoodConfig::ScaleSpace => Neighborhood::ScaleSpace,
                },
                radius: self.radius,
                contrast_threshold: self.contrast_threshold,
                border: self.border,
            },
            descriptor: match self.descriptor {
                DescriptorConfig::MagnitudeOrientation => DescriptorKind::MagnitudeOrientation {
                    orientation_step_deg: self.orientation_step_deg,
                },
                DescriptorConfig::OrientationHistogram => DescriptorKind::OrientationHistogram {
                    bins: self.histogram_bins,
                    radius: self.histogram_radius,
                },
            },
            subpixel: self.subpixel,
            parallel,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
enum MetricConfig {
    Euclidean,
    EuclideanMissingValue,
    FlexiblePower,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct MatchingJson {
    metric: MetricConfig,
    alpha: f64,
    beta: f64,
    ratio_threshold: Option<f64>,
    distance_threshold: Option<f64>,
    back_matching: bool,
}

impl Default for MatchingJson {
    fn default() -> Self {
        Self {
            metric: MetricConfig::EuclideanMissingValue,
            alpha: 1.0,
            beta: 2.0,
            ratio_threshold: Some(0.6),
            distance_threshold: None,
            back_matching: false,
        }
    }
}

impl MatchingJson {
    fn to_config(&self, parallel: bool) -> MatchingConfig {
        MatchingConfig {
            metric: match self.metric {
                MetricConfig::Euclidean => DistanceMetric::Euclidean,
                MetricConfig::EuclideanMissingValue => DistanceMetric::EuclideanMissingValue,
                MetricConfig::FlexiblePower => DistanceMetric::FlexiblePower {
                    alpha: self.alpha,
                    beta: self.beta,
                },
            },
            ratio_threshold: self.ratio_threshold,
            distance_threshold: self.distance_threshold,
            back_matching: self.back_matching,
            parallel,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
struct Config {
    image1: ImageJson,
    image2: ImageJson,
    output_path: String,
    /// Image-1 world to image-2 world.
    transform: AffineJson,
    /// Frame for the written image-2 coordinates.
    output_transform: Option<AffineJson>,
    mode: ModeConfig,
    bins: BinsJson,
    precision: f64,
    geometric_filter: bool,
    parallel: bool,
    keypoints: KeypointsJson,
    matching: MatchingJson,
}

impl Default for Config {
    fn default() -> Self {
        let cfg = HomologousConfig::default();
        Self {
            image1: ImageJson::default(),
            image2: ImageJson::default(),
            output_path: "tiepoints.txt".to_string(),
            transform: AffineJson::default(),
            output_transform: None,
            mode: ModeConfig::GeoBins,
            bins: BinsJson::default(),
            precision: cfg.precision,
            geometric_filter: cfg.geometric_filter,
            parallel: true,
            keypoints: KeypointsJson::default(),
            matching: MatchingJson::default(),
        }
    }
}

impl Config {
    fn homologous(&self) -> HomologousConfig {
        HomologousConfig {
            mode: match self.mode {
                ModeConfig::Full => SearchMode::Full,
                ModeConfig::GeoBins => SearchMode::GeoBins(BinGridConfig {
                    bin_size: (self.bins.bin_size[0], self.bins.bin_size[1]),
                    bin_step: (self.bins.bin_step[0], self.bins.bin_step[1]),
                    margin: self.bins.margin,
                }),
            },
            precision: self.precision,
            geometric_filter: self.geometric_filter,
            keypoints: self.keypoints.to_config(self.parallel),
            matching: self.matching.to_config(self.parallel),
            parallel: self.parallel,
        }
    }
}

#[derive(Debug, Serialize)]
struct BinRecord {
    x: isize,
    y: isize,
    width: usize,
    height: usize,
    keypoints1: usize,
    keypoints2: usize,
    landmarks: usize,
    accepted: usize,
    discarded: usize,
    skipped: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    output_path: String,
    tie_points: usize,
    discarded: usize,
    skipped_bins: usize,
    bins: Vec<BinRecord>,
}

impl Summary {
    fn new(output_path: &str, report: &HomologousReport) -> Self {
        let bins = report
            .bins
            .iter()
            .map(|b| BinRecord {
                x: b.bin.x,
                y: b.bin.y,
                width: b.bin.width,
                height: b.bin.height,
                keypoints1: b.keypoints1,
                keypoints2: b.keypoints2,
                landmarks: b.landmarks,
                accepted: b.tie_points.len(),
                discarded: b.discarded,
                skipped: b.skipped.as_ref().map(|s| format!("{s:?}")),
            })
            .collect();
        Self {
            output_path: output_path.to_string(),
            tie_points: report.tie_points().len(),
            discarded: report.discarded(),
            skipped_bins: report.skipped(),
            bins,
        }
    }
}

fn load_image(cfg: &ImageJson) -> Result<GeoImage, Box<dyn std::error::Error>> {
    let image = load_band(&cfg.path, cfg.band)?;
    let geometry = ImageGeometry::new(
        Point2::new(cfg.geometry.origin[0], cfg.geometry.origin[1]),
        Point2::new(cfg.geometry.spacing[0], cfg.geometry.spacing[1]),
    )?;
    Ok(GeoImage::new(image, geometry))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("tiematch=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_example {
        println!("{}", serde_json::to_string_pretty(&Config::default())?);
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.image1.path.is_empty() || config.image2.path.is_empty() {
        return Err("image1.path and image2.path must be set in the config".into());
    }
    if config.output_path.is_empty() {
        return Err("output_path must be set in the config".into());
    }

    let image1 = load_image(&config.image1)?;
    let image2 = load_image(&config.image2)?;
    let transform = AffineTransform::new(config.transform.coefficients)?;
    let output_transform = config
        .output_transform
        .as_ref()
        .map(|t| AffineTransform::new(t.coefficients))
        .transpose()?;

    let mut extractor =
        HomologousPointExtractor::new(&image1, &image2, &transform, config.homologous())?;
    if let Some(t) = &output_transform {
        extractor = extractor.with_output_transform(t);
    }
    let report = extractor.run()?;
    write_tie_point_file(&config.output_path, &report.tie_points())?;

    let summary = Summary::new(&config.output_path, &report);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
