//! Integration test: run synthetic multi-epoch water masks through the
//! full pipeline and check the migration series.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use meander_pipeline::{
    BinaryMask, Epoch, EpochPipeline, GeoTransform, Georeference, MatchingMode, NearestSearchKind,
    PipelineConfig, PipelineError,
};

const WIDTH: u32 = 120;
const HEIGHT: u32 = 60;

/// 30 m pixels, north-up, upper-left corner at a UTM-like origin.
fn landsat_grid() -> Georeference {
    Georeference::new(
        GeoTransform::new(400_000.0, 3_500_000.0, 30.0, -30.0),
        Some("EPSG:32615".to_string()),
    )
}

/// A straight east-west channel nine pixels wide centered on `row`.
fn straight_channel(label: &str, row: u32) -> Epoch {
    let mask = BinaryMask::from_fn(WIDTH, HEIGHT, landsat_grid(), |x, y| {
        (8..112).contains(&x) && y + 4 >= row && y <= row + 4
    });
    Epoch::new(label, mask)
}

/// A sinusoidal channel nine pixels tall, displaced by `shift` rows.
fn meandering_channel(label: &str, shift: f64) -> Epoch {
    let mask = BinaryMask::from_fn(WIDTH, HEIGHT, landsat_grid(), |x, y| {
        if !(6..114).contains(&x) {
            return false;
        }
        let phase = f64::from(x) / 60.0 * std::f64::consts::TAU;
        let center = 6.0f64.mul_add(phase.sin(), 28.0 + shift);
        (f64::from(y) - center).abs() <= 4.5
    });
    Epoch::new(label, mask)
}

/// A channel on rows 11..=19 that splits around an island into a second
/// arm centered on `lower`, joined by two nine-pixel-wide connectors.
fn braided_channel(label: &str, lower: u32) -> Epoch {
    let mask = BinaryMask::from_fn(WIDTH, HEIGHT, landsat_grid(), |x, y| {
        let main = (6..114).contains(&x) && (11..=19).contains(&y);
        let arm = (30..=89).contains(&x) && y + 4 >= lower && y <= lower + 4;
        let connector =
            ((30..=38).contains(&x) || (81..=89).contains(&x)) && (11..=lower).contains(&y);
        main || arm || connector
    });
    Epoch::new(label, mask)
}

#[test]
fn four_epochs_yield_three_ordered_estimates() {
    let epochs = vec![
        straight_channel("1990", 20),
        straight_channel("2000", 22),
        straight_channel("2010", 24),
        straight_channel("2020", 26),
    ];
    let pipeline = EpochPipeline::new(PipelineConfig::default()).unwrap();
    let estimates = pipeline.run(epochs, 10.0).unwrap();

    assert_eq!(estimates.len(), 3);
    let pairs: Vec<(&str, &str)> = estimates
        .iter()
        .map(|e| (e.epoch_from.as_str(), e.epoch_to.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("1990", "2000"), ("2000", "2010"), ("2010", "2020")]
    );

    // Two rows of 30 m per decade.
    for estimate in &estimates {
        assert!(!estimate.degenerate);
        assert!((estimate.time_interval - 10.0).abs() < f64::EPSILON);
        assert!(
            (estimate.mean_offset - 60.0).abs() < 1e-6,
            "offset {}",
            estimate.mean_offset
        );
        assert!((estimate.rate - 6.0).abs() < 1e-6);
    }
}

#[test]
fn empty_epoch_produces_degenerate_neighbors() {
    let dry = Epoch::new("2000", BinaryMask::empty(WIDTH, HEIGHT, landsat_grid()));
    let epochs = vec![
        straight_channel("1990", 20),
        dry,
        straight_channel("2010", 24),
    ];
    let result = EpochPipeline::new(PipelineConfig::default())
        .unwrap()
        .run_detailed(epochs, 10.0)
        .unwrap();

    assert!(result.centerlines[1].is_empty());
    assert_eq!(result.estimates.len(), 2);
    assert!(result.estimates.iter().all(|e| e.degenerate));
    assert!(result.estimates.iter().all(|e| e.rate.abs() < f64::EPSILON));
    assert_eq!(result.diagnostics.degenerate_pairs, 2);
    assert!(result.vectors.iter().all(Option::is_none));
    assert!(result.baseline[0].hausdorff.is_infinite());
}

#[test]
fn meandering_channel_is_traced_and_migrates() {
    let epochs = vec![
        meandering_channel("2000", 0.0),
        meandering_channel("2010", 3.0),
    ];
    let result = EpochPipeline::new(PipelineConfig::default())
        .unwrap()
        .run_detailed(epochs, 10.0)
        .unwrap();

    for centerline in &result.centerlines {
        assert!(!centerline.is_empty());
        // A sine bend needs more than a straight chord.
        assert!(centerline.point_count() > 4);
        for p in centerline.flatten() {
            assert!((400_000.0..400_000.0 + 30.0 * f64::from(WIDTH)).contains(&p.x));
            assert!((3_500_000.0 - 30.0 * f64::from(HEIGHT)..3_500_000.0).contains(&p.y));
        }
    }

    let estimate = &result.estimates[0];
    assert!(!estimate.degenerate);
    assert!(estimate.mean_offset > 0.0);
    assert!(estimate.mean_offset < 240.0, "offset {}", estimate.mean_offset);

    let epoch = &result.diagnostics.epochs[0];
    assert!(epoch.skeleton_pixels > 0);
    assert!(epoch.simplified_vertices < epoch.raw_vertices);
}

#[test]
fn search_backends_agree_on_real_centerlines() {
    let epochs = || {
        vec![
            meandering_channel("2000", 0.0),
            meandering_channel("2010", 2.0),
        ]
    };
    let with = |search| {
        EpochPipeline::new(PipelineConfig {
            nearest_search: search,
            ..PipelineConfig::default()
        })
        .unwrap()
        .run(epochs(), 10.0)
        .unwrap()
    };
    let exhaustive = with(NearestSearchKind::Exhaustive);
    let rtree = with(NearestSearchKind::RTree);
    assert!((exhaustive[0].rate - rtree[0].rate).abs() < 1e-9);
}

#[test]
fn per_component_matching_runs_end_to_end() {
    let config: PipelineConfig = serde_json::from_str(r#"{"matching": "PerComponent"}"#).unwrap();
    assert_eq!(config.matching, MatchingMode::PerComponent);
    let estimates = EpochPipeline::new(config)
        .unwrap()
        .run(
            vec![straight_channel("1990", 20), straight_channel("2000", 23)],
            5.0,
        )
        .unwrap();
    assert!((estimates[0].rate - 18.0).abs() < 1e-6);
}

#[test]
fn zero_interval_is_rejected() {
    let result = EpochPipeline::new(PipelineConfig::default())
        .unwrap()
        .run(
            vec![straight_channel("1990", 20), straight_channel("2000", 22)],
            0.0,
        );
    assert_eq!(result, Err(PipelineError::NonPositiveInterval(0.0)));
}

#[test]
fn diagnostics_serialize_to_json() {
    let result = EpochPipeline::new(PipelineConfig::default())
        .unwrap()
        .run_detailed(
            vec![straight_channel("1990", 20), straight_channel("2000", 22)],
            10.0,
        )
        .unwrap();
    let json = serde_json::to_value(&result.diagnostics).unwrap();
    assert_eq!(json["epochs"].as_array().unwrap().len(), 2);
    assert!(json["total_duration"].as_f64().unwrap() >= 0.0);
    assert!(result.diagnostics.report().contains("1990"));
}

#[test]
fn braided_channel_arm_contributes_to_migration() {
    let pipeline = EpochPipeline::new(PipelineConfig::default()).unwrap();
    let result = pipeline
        .run_detailed(
            vec![braided_channel("2000", 35), braided_channel("2010", 41)],
            10.0,
        )
        .unwrap();

    // The second arm is traced alongside the main channel.
    let earlier = &result.centerlines[0];
    assert!(earlier.polylines.len() >= 2, "{}", earlier.polylines.len());
    let arm_row = 3_500_000.0 - 35.5 * 30.0;
    assert!(
        earlier
            .flatten()
            .iter()
            .any(|p| (p.y - arm_row).abs() <= 45.0)
    );

    // Only the second arm moved, and it moved 6 rows.
    let estimate = &result.estimates[0];
    assert!(!estimate.degenerate);
    assert!(estimate.rate > 1.0, "rate {}", estimate.rate);

    let unchanged = pipeline
        .run(
            vec![braided_channel("2000", 35), braided_channel("2010", 35)],
            10.0,
        )
        .unwrap();
    assert!(unchanged[0].rate.abs() < f64::EPSILON);
}
