//! Run diagnostics: timing and counts for every epoch and the series.
//!
//! Collected by [`EpochPipeline::run_detailed`](crate::EpochPipeline::run_detailed)
//! alongside the results. Useful when tuning the opening radii, the ridge
//! window or the simplification tolerance for a new sensor.
//!
//! Timestamps come from the `web-time` crate so the core builds for
//! WASM as well as native targets. Durations are serialized as fractional
//! seconds (`f64`), since `std::time::Duration` has no serde impls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics for one epoch's centerline extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochDiagnostics {
    /// Epoch label.
    pub label: String,
    /// Mask width in pixels.
    pub width: u32,
    /// Mask height in pixels.
    pub height: u32,
    /// Water pixels in the input mask.
    pub mask_pixels: usize,
    /// Water pixels left after the opening.
    pub opened_pixels: usize,
    /// Ridge pixels in the skeleton.
    pub skeleton_pixels: usize,
    /// Skeleton components traced into polylines.
    pub kept_components: usize,
    /// Skeleton components dropped as noise.
    pub dropped_components: usize,
    /// Vertices before simplification.
    pub raw_vertices: usize,
    /// Vertices after simplification.
    pub simplified_vertices: usize,
    /// Opening, distance transform and ridge detection.
    #[serde(with = "duration_serde")]
    pub skeletonize: Duration,
    /// Component tracing and simplification.
    #[serde(with = "duration_serde")]
    pub vectorize: Duration,
}

impl EpochDiagnostics {
    /// Fraction of traced vertices removed by simplification.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reduction_ratio(&self) -> f64 {
        if self.raw_vertices == 0 {
            0.0
        } else {
            1.0 - self.simplified_vertices as f64 / self.raw_vertices as f64
        }
    }
}

/// Diagnostics for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDiagnostics {
    /// One entry per epoch, in input order.
    pub epochs: Vec<EpochDiagnostics>,
    /// Estimates flagged degenerate.
    pub degenerate_pairs: usize,
    /// Pairwise estimation and comparison metrics.
    #[serde(with = "duration_serde")]
    pub estimation: Duration,
    /// Wall-clock duration of the entire run.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl SeriesDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Meander Diagnostics Report\n{}", "=".repeat(60)));
        if let Some(first) = self.epochs.first() {
            lines.push(format!("Grid: {}x{}", first.width, first.height));
        }
        lines.push(format!(
            "Epochs: {}  |  Degenerate pairs: {}",
            self.epochs.len(),
            self.degenerate_pairs,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<12} {:>10} {:>10} {:>10} {:>7} {:>12} {:>8} {:>11} {:>11}",
            "Epoch",
            "Mask px",
            "Opened px",
            "Ridge px",
            "Comps",
            "Vertices",
            "Reduced",
            "Skeleton",
            "Vectorize"
        ));
        lines.push("-".repeat(101));

        for e in &self.epochs {
            let comps = format!(
                "{}/{}",
                e.kept_components,
                e.kept_components + e.dropped_components
            );
            let vertices = format!("{}->{}", e.raw_vertices, e.simplified_vertices);
            lines.push(format!(
                "{:<12} {:>10} {:>10} {:>10} {:>7} {:>12} {:>7.1}% {:>9.3}ms {:>9.3}ms",
                e.label,
                e.mask_pixels,
                e.opened_pixels,
                e.skeleton_pixels,
                comps,
                vertices,
                e.reduction_ratio() * 100.0,
                duration_ms(e.skeletonize),
                duration_ms(e.vectorize),
            ));
        }

        lines.push(String::new());
        lines.push(format!("Estimation: {:.3}ms", duration_ms(self.estimation)));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn epoch(label: &str) -> EpochDiagnostics {
        EpochDiagnostics {
            label: label.to_string(),
            width: 64,
            height: 32,
            mask_pixels: 500,
            opened_pixels: 480,
            skeleton_pixels: 70,
            kept_components: 1,
            dropped_components: 2,
            raw_vertices: 60,
            simplified_vertices: 6,
            skeletonize: Duration::from_millis(3),
            vectorize: Duration::from_millis(1),
        }
    }

    fn series() -> SeriesDiagnostics {
        SeriesDiagnostics {
            epochs: vec![epoch("1995"), epoch("2005")],
            degenerate_pairs: 0,
            estimation: Duration::from_micros(250),
            total_duration: Duration::from_millis(9),
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn reduction_ratio() {
        assert!((epoch("a").reduction_ratio() - 0.9).abs() < 1e-12);
        let empty = EpochDiagnostics {
            raw_vertices: 0,
            simplified_vertices: 0,
            ..epoch("b")
        };
        assert!(empty.reduction_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn report_lists_every_epoch() {
        let report = series().report();
        assert!(report.contains("Grid: 64x32"));
        assert!(report.contains("1995"));
        assert!(report.contains("2005"));
        assert!(report.contains("60->6"));
        assert!(report.contains("90.0%"));
        assert!(report.contains("1/3"));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(series()).unwrap();
        let total = json["total_duration"].as_f64().unwrap();
        assert!((total - 0.009).abs() < 1e-12);
        let back: SeriesDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back.epochs.len(), 2);
        assert!((back.epochs[0].skeletonize.as_secs_f64() - 0.003).abs() < 1e-9);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(series()).unwrap();
        json["estimation"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<SeriesDiagnostics>(json).is_err());
    }
}
