//! Metric accumulation
//!
//! Descriptive statistics over per-ring values, Pearson correlation between
//! ring patches of two channels, and the per-channel summary row.
//!
//! Shape problems never raise here: they yield sentinels (empty lists, NaN)
//! so one odd channel cannot fail a whole item.

use crate::error::{QcError, QcResult};
use crate::models::{Channel, PixelRegion, Table};
use crate::models::table::format_number;
use tracing::{debug, warn};

/// Summary of a list of values; population standard deviation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Statistics {
    /// Returned for empty input
    pub const EMPTY: Statistics = Statistics {
        mean: 0.0,
        std: 0.0,
        min: 0.0,
        max: 0.0,
    };
}

/// Mean, population standard deviation (divides by N), min and max
pub fn compute_statistics(values: &[f64]) -> Statistics {
    if values.is_empty() {
        return Statistics::EMPTY;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Statistics {
        mean,
        std: variance.sqrt(),
        min,
        max,
    }
}

/// Pearson correlation of two equally shaped regions, scanned row-major
///
/// Returns NaN when either region has zero variance (or no pixels).
pub fn pearson_correlation(a: &PixelRegion, b: &PixelRegion) -> QcResult<f64> {
    if a.width != b.width || a.height != b.height || a.values.len() != b.values.len() {
        return Err(QcError::ShapeMismatch {
            left_width: a.width,
            left_height: a.height,
            right_width: b.width,
            right_height: b.height,
        });
    }
    if a.values.is_empty() {
        return Ok(f64::NAN);
    }

    let n = a.values.len() as f64;
    let mean_a = a.values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.values.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&va, &vb) in a.values.iter().zip(&b.values) {
        let da = va as f64 - mean_a;
        let db = vb as f64 - mean_b;
        covariance += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(covariance / (var_a.sqrt() * var_b.sqrt()))
}

/// One coefficient per ring between two channels
///
/// Patch lists of different lengths give an empty list; a pair of patches
/// with different shapes gives NaN for that ring.
pub fn ring_correlations(a: &Channel, b: &Channel) -> Vec<f64> {
    if a.ring_patches.len() != b.ring_patches.len() {
        warn!(
            channel_a = a.id,
            channel_b = b.id,
            patches_a = a.ring_patches.len(),
            patches_b = b.ring_patches.len(),
            "Ring patch counts differ, skipping correlation"
        );
        return Vec::new();
    }

    a.ring_patches
        .iter()
        .zip(&b.ring_patches)
        .enumerate()
        .map(|(ring, (pa, pb))| match pearson_correlation(pa, pb) {
            Ok(r) => r,
            Err(e) => {
                debug!(ring, error = %e, "Ring patch shapes differ");
                f64::NAN
            }
        })
        .collect()
}

/// Per-ring correlation for every channel pair (i < j) of one image
#[derive(Debug, Clone, PartialEq)]
pub struct PccTable {
    /// Channel ids of each pair, in column order
    pub pairs: Vec<(u32, u32)>,
    /// One list of per-ring coefficients per pair
    pub values: Vec<Vec<f64>>,
}

impl PccTable {
    /// `None` for single-channel images
    pub fn compute(channels: &[Channel]) -> Option<Self> {
        if channels.len() < 2 {
            return None;
        }
        let mut pairs = Vec::new();
        let mut values = Vec::new();
        for (i, a) in channels.iter().enumerate() {
            for b in &channels[i + 1..] {
                pairs.push((a.id, b.id));
                values.push(ring_correlations(a, b));
            }
        }
        Some(Self { pairs, values })
    }

    /// Columns `ch{i}_ch{j}`, one row per ring; short columns padded with NaN
    pub fn to_table(&self) -> Table {
        let headers = self
            .pairs
            .iter()
            .map(|(i, j)| format!("ch{}_ch{}", i, j))
            .collect();
        let mut table = Table::new(headers);
        let rings = self.values.iter().map(Vec::len).max().unwrap_or(0);
        for ring in 0..rings {
            let row = self
                .values
                .iter()
                .map(|column| format_number(column.get(ring).copied().unwrap_or(f64::NAN)))
                .collect();
            table.push_row(row);
        }
        table
    }
}

/// Metric headers of one summary row, in column order
pub const SUMMARY_HEADERS: [&str; 16] = [
    "Channel",
    "Rotation_angle__°",
    "Cross_horizontal_shift__pix",
    "Cross_vertical_shift__pix",
    "Field_Distortion_avg__um",
    "Field_Distortion_std__um",
    "Field_Distortion_min__um",
    "Field_Distortion_max__um",
    "Field_Uniformity_avg",
    "Field_Uniformity_std",
    "Field_Uniformity_min",
    "Field_Uniformity_max",
    "Field_FWHM_avg__um",
    "Field_FWHM_std__um",
    "Field_FWHM_min__um",
    "Field_FWHM_max__um",
];

pub fn summary_headers() -> Vec<String> {
    SUMMARY_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// Summary values of one channel, aligned with `SUMMARY_HEADERS`
pub fn channel_summary(channel: &Channel) -> Vec<f64> {
    let (cx, cy) = channel.center_cross.centroid();
    let horizontal_shift = cx - channel.image_width as f64 / 2.0;
    let vertical_shift = cy - channel.image_height as f64 / 2.0;

    let distortion = compute_statistics(&channel.field_distortion);
    let uniformity = compute_statistics(&channel.field_uniformity);
    let fwhm = compute_statistics(&channel.fwhm);

    debug!(
        channel = channel.id,
        rotation_rad = channel.rotation_angle,
        horizontal_shift,
        vertical_shift,
        distortion_avg = distortion.mean,
        uniformity_avg = uniformity.mean,
        fwhm_avg = fwhm.mean,
        "Channel summary"
    );

    let mut row = vec![
        channel.id as f64,
        channel.rotation_angle.to_degrees(),
        horizontal_shift,
        vertical_shift,
    ];
    for stats in [distortion, uniformity, fwhm] {
        row.extend([stats.mean, stats.std, stats.min, stats.max]);
    }
    row
}

/// Per-ring results of one channel: `Ring,Field_distortion,Field_uniformity,FWHM`
///
/// `None` when the three per-ring lists have different lengths.
pub fn results_table(channel: &Channel) -> Option<Table> {
    let rings = channel.ring_count()?;
    let mut table = Table::new(vec![
        "Ring".to_string(),
        "Field_distortion".to_string(),
        "Field_uniformity".to_string(),
        "FWHM".to_string(),
    ]);
    for ring in 0..rings {
        table.push_row(vec![
            ring.to_string(),
            format_number(channel.field_distortion[ring]),
            format_number(channel.field_uniformity[ring]),
            format_number(channel.fwhm[ring]),
        ]);
    }
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;

    fn patch(values: &[f32]) -> PixelRegion {
        PixelRegion::new(values.len() as u32, 1, values.to_vec())
    }

    #[test]
    fn test_statistics_known_values() {
        let stats = compute_statistics(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std, 2.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_statistics_bounds() {
        let values = [0.31, -1.2, 7.5, 3.3, 0.0];
        let stats = compute_statistics(&values);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        assert!(stats.std >= 0.0);
    }

    #[test]
    fn test_statistics_empty_sentinel() {
        assert_eq!(compute_statistics(&[]), Statistics::EMPTY);
    }

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let a = patch(&[1.0, 2.0, 3.0, 4.0]);
        let b = patch(&[2.0, 4.0, 6.0, 8.0]);
        let c = patch(&[4.0, 3.0, 2.0, 1.0]);
        assert!((pearson_correlation(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson_correlation(&a, &c).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_shape_mismatch() {
        let a = PixelRegion::new(2, 2, vec![1.0; 4]);
        let b = PixelRegion::new(4, 1, vec![1.0; 4]);
        assert!(matches!(
            pearson_correlation(&a, &b),
            Err(QcError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_pearson_zero_variance_is_nan() {
        let flat = patch(&[3.0, 3.0, 3.0]);
        let varied = patch(&[1.0, 2.0, 3.0]);
        assert!(pearson_correlation(&flat, &varied).unwrap().is_nan());
    }

    #[test]
    fn test_ring_correlations_sentinels() {
        let mut a = Channel::new(0, 10, 10);
        let mut b = Channel::new(1, 10, 10);
        a.ring_patches = vec![patch(&[1.0, 2.0]), patch(&[1.0, 2.0, 3.0])];
        b.ring_patches = vec![patch(&[2.0, 4.0]), patch(&[1.0, 2.0])];

        let r = ring_correlations(&a, &b);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 1.0).abs() < 1e-12);
        assert!(r[1].is_nan());

        b.ring_patches.pop();
        assert!(ring_correlations(&a, &b).is_empty());
    }

    #[test]
    fn test_pcc_table_layout() {
        let mut channels: Vec<Channel> = (0..3).map(|id| Channel::new(id, 10, 10)).collect();
        for channel in &mut channels {
            channel.ring_patches = vec![patch(&[1.0, 2.0, 3.0]), patch(&[3.0, 1.0, 2.0])];
        }
        let pcc = PccTable::compute(&channels).unwrap();
        assert_eq!(pcc.pairs, vec![(0, 1), (0, 2), (1, 2)]);

        let table = pcc.to_table();
        assert_eq!(table.headers, vec!["ch0_ch1", "ch0_ch2", "ch1_ch2"]);
        assert_eq!(table.rows.len(), 2);
        assert!(PccTable::compute(&channels[..1]).is_none());
    }

    #[test]
    fn test_channel_summary_order() {
        let mut channel = Channel::new(2, 100, 50);
        channel.rotation_angle = std::f64::consts::FRAC_PI_2;
        channel.center_cross = Region::new(0.0, 0.0, 0.0, 0.0).with_centroid(52.0, 24.0);
        channel.field_distortion = vec![0.1, 0.3];
        channel.field_uniformity = vec![0.9];
        channel.fwhm = vec![];

        let row = channel_summary(&channel);
        assert_eq!(row.len(), SUMMARY_HEADERS.len());
        assert_eq!(SUMMARY_HEADERS[1], "Rotation_angle__°");
        assert_eq!(row[0], 2.0);
        assert!((row[1] - 90.0).abs() < 1e-9);
        assert_eq!(row[2], 2.0);
        assert_eq!(row[3], -1.0);
        assert!((row[4] - 0.2).abs() < 1e-12);
        assert_eq!(row[8], 0.9);
        assert_eq!(&row[12..], &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_results_table_requires_equal_lengths() {
        let mut channel = Channel::new(0, 10, 10);
        channel.field_distortion = vec![0.1, 0.2];
        channel.field_uniformity = vec![1.0, 0.5];
        channel.fwhm = vec![0.25, 0.5];
        let table = results_table(&channel).unwrap();
        assert_eq!(table.rows[1], vec!["1", "0.2", "0.5", "0.5"]);

        channel.fwhm.pop();
        assert!(results_table(&channel).is_none());
    }
}
