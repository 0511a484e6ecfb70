// Calibration: raw samples to physical units

use crate::core::error::{Ks2Error, Result};
use crate::core::format::ChannelMetadata;
use crate::core::samples::{PhysicalMatrix, SampleMatrix};

/// `physical[i][j] = coef_a[j] * raw[i][j] + coef_b[j]`, evaluated in f64.
pub fn calibrate(raw: &SampleMatrix, channels: &ChannelMetadata) -> Result<PhysicalMatrix> {
    let n = raw.channels();
    let coef_a = coefficients(channels.coef_a.as_deref(), "coefficient A", n)?;
    let coef_b = coefficients(channels.coef_b.as_deref(), "coefficient B", n)?;

    let values = raw
        .values()
        .iter_f64()
        .zip((0..n).cycle())
        .map(|(x, j)| coef_a[j] as f64 * x + coef_b[j] as f64)
        .collect();

    Ok(PhysicalMatrix {
        rows: raw.rows(),
        channels: n,
        values,
    })
}

fn coefficients<'a>(column: Option<&'a [f32]>, what: &str, channels: usize) -> Result<&'a [f32]> {
    let column = column.ok_or_else(|| {
        Ks2Error::MissingCalibration(format!("file carries no conversion {}", what))
    })?;
    if column.len() != channels {
        return Err(Ks2Error::MissingCalibration(format!(
            "conversion {} has {} entries for {} channels",
            what,
            column.len(),
            channels
        )));
    }
    Ok(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::samples::RawSamples;

    fn metadata(coef_a: Vec<f32>, coef_b: Vec<f32>) -> ChannelMetadata {
        ChannelMetadata {
            channel_count: coef_a.len(),
            coef_a: Some(coef_a),
            coef_b: Some(coef_b),
            ..Default::default()
        }
    }

    #[test]
    fn test_affine_map_per_channel() {
        let raw = SampleMatrix::new(RawSamples::Short(vec![100, -100, 7, 0, 1, -1]), 3).unwrap();
        let meta = metadata(vec![0.5, -2.0, 0.0], vec![1.0, 0.0, -3.25]);
        let physical = calibrate(&raw, &meta).unwrap();

        assert_eq!(physical.rows, 2);
        assert_eq!(physical.channels, 3);
        let coef_a = meta.coef_a.as_ref().unwrap();
        let coef_b = meta.coef_b.as_ref().unwrap();
        for i in 0..2 {
            for j in 0..3 {
                let expected = coef_a[j] as f64 * raw.get(i, j).unwrap() + coef_b[j] as f64;
                assert_eq!(physical.get(i, j), Some(expected));
            }
        }
        assert_eq!(physical.row(0), Some(&[51.0, 200.0, -3.25][..]));
    }

    #[test]
    fn test_wide_integers_keep_every_value() {
        let raw = SampleMatrix::new(RawSamples::UInt64(vec![u64::MAX, 0, 1 << 53, 3]), 2).unwrap();
        let physical = calibrate(&raw, &metadata(vec![1.0, -1.0], vec![0.0, 0.5])).unwrap();
        assert_eq!(physical.values.len(), 4);
        assert_eq!(
            physical.values,
            vec![u64::MAX as f64, 0.5, (1u64 << 53) as f64, -2.5]
        );
    }

    #[test]
    fn test_identity_calibration() {
        let raw = SampleMatrix::new(RawSamples::Float(vec![1.25, -7.5, 3.0e6, 0.0]), 2).unwrap();
        let physical = calibrate(&raw, &metadata(vec![1.0, 1.0], vec![0.0, 0.0])).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert_eq!(physical.get(i, j), raw.get(i, j));
            }
        }
    }

    #[test]
    fn test_missing_coefficients() {
        let raw = SampleMatrix::new(RawSamples::Long(vec![1, 2]), 2).unwrap();
        let mut meta = metadata(vec![1.0, 1.0], vec![0.0, 0.0]);
        meta.coef_b = None;
        assert!(matches!(
            calibrate(&raw, &meta),
            Err(Ks2Error::MissingCalibration(_))
        ));
        assert!(matches!(
            calibrate(&raw, &ChannelMetadata::default()),
            Err(Ks2Error::MissingCalibration(_))
        ));
    }

    #[test]
    fn test_coefficient_count_mismatch() {
        let raw = SampleMatrix::new(RawSamples::Long(vec![1, 2, 3]), 3).unwrap();
        let meta = metadata(vec![1.0, 1.0], vec![0.0, 0.0]);
        assert!(matches!(
            calibrate(&raw, &meta),
            Err(Ks2Error::MissingCalibration(_))
        ));
    }
}
