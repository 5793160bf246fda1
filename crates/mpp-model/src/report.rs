//! Fit quality against measured samples.

use crate::{Mpp, MppError, MppResult, Sample};
use mpp_color::{delta_e, xyz_to_lab};
use rayon::prelude::*;
use std::fmt;

/// CIE76 delta E statistics of a model against a sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    /// Number of samples compared.
    pub count: usize,
    /// Mean delta E.
    pub mean_de: f64,
    /// Root mean square delta E.
    pub rms_de: f64,
    /// Largest delta E.
    pub max_de: f64,
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples, mean dE {:.3}, rms dE {:.3}, max dE {:.3}",
            self.count, self.mean_de, self.rms_de, self.max_de
        )
    }
}

impl Mpp {
    /// Compares model predictions with measured XYZ.
    pub fn fit_report(&self, samples: &[Sample]) -> MppResult<FitReport> {
        if samples.is_empty() {
            return Err(MppError::NoSamples);
        }
        let des: Vec<f64> = samples
            .par_iter()
            .map(|s| delta_e(self.lookup_lab(&s.dev), xyz_to_lab(s.xyz)))
            .collect();

        let n = des.len() as f64;
        Ok(FitReport {
            count: des.len(),
            mean_de: des.iter().sum::<f64>() / n,
            rms_de: (des.iter().map(|d| d * d).sum::<f64>() / n).sqrt(),
            max_de: des.iter().copied().fold(0.0, f64::max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MppParts;
    use approx::assert_abs_diff_eq;
    use mpp_color::{D50, InkMask};

    #[test]
    fn exact_model_reports_zero() {
        let mask = InkMask::from_chars("W").unwrap();
        let mpp = Mpp::from_parts(MppParts::from_primaries(mask, &[[0.0; 3], D50]).unwrap()).unwrap();
        let samples: Vec<Sample> = (0..=4)
            .map(|i| {
                let v = i as f64 / 4.0;
                Sample::new(vec![v], [v * D50[0], v * D50[1], v * D50[2]])
            })
            .collect();
        let r = mpp.fit_report(&samples).unwrap();
        assert_eq!(r.count, 5);
        assert_abs_diff_eq!(r.max_de, 0.0, epsilon = 1e-9);

        let mut off = samples.clone();
        off[4].xyz = [0.5 * D50[0], 0.5 * D50[1], 0.5 * D50[2]];
        let r = mpp.fit_report(&off).unwrap();
        assert!(r.max_de > 20.0);
        assert!(r.rms_de >= r.mean_de);
        assert!(matches!(mpp.fit_report(&[]), Err(MppError::NoSamples)));
    }
}
