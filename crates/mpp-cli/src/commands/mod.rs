//! CLI command implementations

pub mod fit;
pub mod gamut;
pub mod info;
pub mod lookup;
pub mod verify;

use anyhow::{Context, Result, anyhow, bail};
use mpp_cgats::{Cgats, Table};
use mpp_color::{InkMask, SpectralShape, lab_to_xyz};
use mpp_model::{Mpp, Sample};
use std::path::Path;
use tracing::debug;

/// Measurements read from a CTI3 style file.
pub struct Measurements {
    pub mask: InkMask,
    pub samples: Vec<Sample>,
    pub spectral: Option<SpectralShape>,
    pub instrument: Option<String>,
}

/// Load a model from path
pub fn load_model(path: &Path) -> Result<Mpp> {
    Mpp::read_mpp(path).with_context(|| format!("Failed to load model: {}", path.display()))
}

/// Load measurements from path
pub fn load_measurements(path: &Path) -> Result<Measurements> {
    let cg = Cgats::read_file(path).with_context(|| format!("Failed to read: {}", path.display()))?;
    let m = measurements(&cg).with_context(|| format!("Bad measurement file: {}", path.display()))?;
    debug!(
        path = %path.display(),
        inks = %m.mask,
        samples = m.samples.len(),
        spectral = m.spectral.is_some(),
        "loaded measurements"
    );
    Ok(m)
}

fn kword_num(t: &Table, name: &str) -> Result<f64> {
    let s = t.find_kword(name).ok_or_else(|| anyhow!("missing {name}"))?;
    s.trim().parse().with_context(|| format!("bad {name}: {s}"))
}

/// Extracts samples from the first table of a measurement file.
///
/// `COLOR_REP` is `<inks>_<pcs>`; device fields are `<inks>_<ink>` in
/// percent, colour is `XYZ_*` scaled to Y = 100 or `LAB_*`. Spectra are
/// read when `SPECTRAL_BANDS` is present.
pub fn measurements(cg: &Cgats) -> Result<Measurements> {
    let t = cg.table(0).ok_or_else(|| anyhow!("no table"))?;
    let rep = t.find_kword("COLOR_REP").ok_or_else(|| anyhow!("missing COLOR_REP"))?;
    let (dev_rep, _) = rep.split_once('_').ok_or_else(|| anyhow!("bad COLOR_REP: {rep}"))?;
    let mask = InkMask::from_chars(dev_rep)?;

    let col = |name: &str| t.find_field(name).ok_or_else(|| anyhow!("missing field {name}"));
    let dev_cols = mask
        .inks()
        .map(|ink| col(&format!("{dev_rep}_{}", ink.letter())))
        .collect::<Result<Vec<_>>>()?;

    let (pcs_cols, is_lab) = if t.find_field("XYZ_X").is_some() {
        ([col("XYZ_X")?, col("XYZ_Y")?, col("XYZ_Z")?], false)
    } else if t.find_field("LAB_L").is_some() {
        ([col("LAB_L")?, col("LAB_A")?, col("LAB_B")?], true)
    } else {
        bail!("no XYZ or LAB fields");
    };

    let spectral = match t.find_kword("SPECTRAL_BANDS") {
        Some(_) => Some(SpectralShape::new(
            kword_num(t, "SPECTRAL_BANDS")? as usize,
            kword_num(t, "SPECTRAL_START_NM")?,
            kword_num(t, "SPECTRAL_END_NM")?,
            t.find_kword("SPECTRAL_NORM").map_or(Ok(100.0), |_| kword_num(t, "SPECTRAL_NORM"))?,
        )?),
        None => None,
    };
    let spec_cols = match &spectral {
        Some(s) => (0..s.bands)
            .map(|i| col(&format!("SPEC_{:03}", s.wavelength(i).round() as i64)))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let cell = |row: usize, c: usize| t.real(row, c).ok_or_else(|| anyhow!("row {row}: non-numeric value"));
    let mut samples = Vec::with_capacity(t.len());
    for row in 0..t.len() {
        let dev = dev_cols.iter().map(|&c| cell(row, c).map(|v| v / 100.0)).collect::<Result<Vec<_>>>()?;
        let pcs = [cell(row, pcs_cols[0])?, cell(row, pcs_cols[1])?, cell(row, pcs_cols[2])?];
        let xyz = if is_lab { lab_to_xyz(pcs) } else { pcs.map(|v| v / 100.0) };

        let mut sample = Sample::new(dev, xyz);
        if let Some(s) = &spectral {
            let spec = spec_cols
                .iter()
                .map(|&c| cell(row, c).map(|v| v / s.norm))
                .collect::<Result<Vec<_>>>()?;
            sample = sample.with_spectrum(spec);
        }
        samples.push(sample);
    }

    Ok(Measurements {
        mask,
        samples,
        spectral,
        instrument: t.find_kword("TARG_INSTRUMENT").map(str::to_string),
    })
}

/// Formats a colour triple for display.
pub fn fmt3(v: [f64; 3]) -> String {
    format!("{:8.3} {:8.3} {:8.3}", v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TI3: &str = "CTI3

DESCRIPTOR \"test chart\"
KEYWORD \"COLOR_REP\"
COLOR_REP \"CMY_XYZ\"
KEYWORD \"TARG_INSTRUMENT\"
TARG_INSTRUMENT \"i1Pro\"
KEYWORD \"SPECTRAL_BANDS\"
SPECTRAL_BANDS \"3\"
KEYWORD \"SPECTRAL_START_NM\"
SPECTRAL_START_NM \"400\"
KEYWORD \"SPECTRAL_END_NM\"
SPECTRAL_END_NM \"600\"
KEYWORD \"SPECTRAL_NORM\"
SPECTRAL_NORM \"100\"

NUMBER_OF_FIELDS 10
BEGIN_DATA_FORMAT
SAMPLE_ID CMY_C CMY_M CMY_Y XYZ_X XYZ_Y XYZ_Z SPEC_400 SPEC_500 SPEC_600
END_DATA_FORMAT

NUMBER_OF_SETS 2
BEGIN_DATA
1 0 0 0 85.1 88 72.4 80 88 90
2 100 50 0 12.5 17 40.2 40 30 8
END_DATA
";

    #[test]
    fn reads_cti3() {
        let m = measurements(&Cgats::parse_str(TI3).unwrap()).unwrap();
        assert_eq!(m.mask, InkMask::CMY);
        assert_eq!(m.instrument.as_deref(), Some("i1Pro"));
        assert_eq!(m.samples.len(), 2);

        let s = &m.samples[1];
        assert_eq!(s.dev, vec![1.0, 0.5, 0.0]);
        assert!((s.xyz[1] - 0.17).abs() < 1e-12);
        let spec = s.spec.as_ref().unwrap();
        assert!((spec[0] - 0.4).abs() < 1e-12);
        assert_eq!(m.spectral.unwrap().bands, 3);
    }

    #[test]
    fn missing_device_field() {
        let bad = TI3.replace("CMY_M", "CMY_Q");
        assert!(measurements(&Cgats::parse_str(&bad).unwrap()).is_err());
    }
}
