use ndarray::{Array2, ArrayView1, Axis};
use crate::drivers::AcquisitionError;
/// Subtracts one offset per channel from every sample of that channel.
pub fn correct_matrix(
    samples: &Array2<f64>,
    offsets: &[f64],
) -> Result<Array2<f64>, AcquisitionError> {
    if offsets.len() != samples.nrows() {
        return Err(AcquisitionError::Dimension {
            expected: samples.nrows(),
            actual: offsets.len(),
        });
    }
    let column = ArrayView1::from(offsets).insert_axis(Axis(1));
    Ok(samples - &column)
}
pub fn correct_series(series: &[f64], offset: f64) -> Vec<f64> {
    series.iter().map(|v| v - offset).collect()
}
/// Per-channel mean over the time axis, `None` for a matrix without samples.
pub fn channel_means(samples: &Array2<f64>) -> Option<Vec<f64>> {
    samples.mean_axis(Axis(1)).map(|means| means.to_vec())
}
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    #[test]
    fn subtracts_per_row() {
        let x = array![[1.0, 2.0, 3.0], [10.0, 10.0, 10.0]];
        let out = correct_matrix(&x, &[1.0, 9.5]).unwrap();
        assert_eq!(out, array![[0.0, 1.0, 2.0], [0.5, 0.5, 0.5]]);
    }
    #[test]
    fn correcting_twice_with_negated_offsets_restores_input() {
        let x = Array2::from_shape_fn((16, 40), |(r, c)| (r * 40 + c) as f64 * 0.013);
        let offs: Vec<f64> = (0..16).map(|r| 1.6 + r as f64 * 0.01).collect();
        let neg: Vec<f64> = offs.iter().map(|o| -o).collect();
        let back = correct_matrix(&correct_matrix(&x, &offs).unwrap(), &neg).unwrap();
        for (a, b) in back.iter().zip(x.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
    #[test]
    fn wrong_offset_length_is_rejected() {
        let x = Array2::<f64>::zeros((16, 4));
        let err = correct_matrix(&x, &[0.0; 15]).unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::Dimension {
                expected: 16,
                actual: 15
            }
        ));
    }
    #[test]
    fn series_and_means() {
        assert_eq!(correct_series(&[2.0, 3.0], 0.5), vec![1.5, 2.5]);
        let x = array![[1.0, 3.0], [4.0, 4.0]];
        assert_eq!(channel_means(&x), Some(vec![2.0, 4.0]));
        assert_eq!(channel_means(&Array2::<f64>::zeros((16, 0))), None);
    }
}
