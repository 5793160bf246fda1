//! Model files.
//!
//! A model is stored as a single CGATS table of type `MPP`. Keywords carry
//! the configuration; each data set is one parameter with its value for
//! every band:
//!
//! ```text
//! MPP
//!
//! DEVICE_CLASS "OUTPUT"
//! COLOR_REP "CMYK"
//! TOTAL_INK_LIMIT "300"
//! TRANSFER_ORDERS "6"
//! SHAPE_PARAMS "YES"
//!
//! BEGIN_DATA_FORMAT
//! PARAM_ID XYZ_X XYZ_Y XYZ_Z
//! END_DATA_FORMAT
//!
//! BEGIN_DATA
//! "t_0_0" -1.41 -1.52 -1.38      transfer: channel, harmonic
//! "s_0_6" 0.12 0.08 0.1          shape: channel, combination
//! "c_15" 0.021 0.019 0.016       primary combination
//! END_DATA
//! ```
//!
//! Spectral models add all four `SPECTRAL_*` keywords and a `SPEC_nnn`
//! column per band. Models whose black point search was tuned carry the
//! changed settings as `BLACK_*` keywords, so the reloaded model finds the
//! same black. Primary combinations may be written as `LAB_L LAB_A LAB_B`
//! instead of XYZ; transfer and shape rows are never converted.

use crate::options::FitTuning;
use crate::params::{BandParams, MAX_ORDER, MppParts, XYZ_BANDS, shape_comb, shape_index};
use crate::{Mpp, MppError, MppResult};
use mpp_cgats::{Cgats, FieldType, Table, Value};
use mpp_color::{InkMask, SpectralShape, lab_to_xyz, xyz_to_lab};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const SPECTRAL_KEYWORDS: [&str; 4] = ["SPECTRAL_BANDS", "SPECTRAL_START_NM", "SPECTRAL_END_NM", "SPECTRAL_NORM"];

/// Table type of model files.
pub const MPP_TABLE: &str = "MPP";

/// How primary combination colours are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcsEncoding {
    /// XYZ, exactly as modelled.
    #[default]
    Xyz,
    /// D50 Lab.
    Lab,
}

impl PcsEncoding {
    fn fields(self) -> [&'static str; 3] {
        match self {
            PcsEncoding::Xyz => ["XYZ_X", "XYZ_Y", "XYZ_Z"],
            PcsEncoding::Lab => ["LAB_L", "LAB_A", "LAB_B"],
        }
    }
}

fn spec_field(shape: &SpectralShape, i: usize) -> String {
    format!("SPEC_{:03}", shape.wavelength(i).round() as i64)
}

fn format_err(msg: impl Into<String>) -> MppError {
    MppError::Format(msg.into())
}

impl Mpp {
    /// Serializes the model to a CGATS table.
    pub fn to_cgats(&self, enc: PcsEncoding) -> MppResult<Cgats> {
        let info = self.info();
        let layout = *self.layout();
        let mut cg = Cgats::new();
        let t = cg.add_table(MPP_TABLE);

        t.add_kword("DESCRIPTOR", "Model Printer Profile");
        t.add_kword("ORIGINATOR", concat!("mpp-rs ", env!("CARGO_PKG_VERSION")));
        if let Some(created) = self.created() {
            t.add_kword("CREATED", created);
        }
        t.add_kword("DEVICE_CLASS", info.class.as_str());
        t.add_kword("COLOR_REP", info.mask.to_chars());
        if let Some(inst) = &info.instrument {
            t.add_kword("TARG_INSTRUMENT", inst.as_str());
        }
        if let Some(l) = info.limit {
            t.add_kword("TOTAL_INK_LIMIT", format!("{}", l * 100.0));
        }
        t.add_kword("TRANSFER_ORDERS", layout.cord.to_string());
        t.add_kword("SHAPE_PARAMS", if layout.shaped { "YES" } else { "NO" });
        write_black_tuning(t, self.tuning());
        if let Some(s) = &info.spectral {
            t.add_kword("SPECTRAL_BANDS", s.bands.to_string());
            t.add_kword("SPECTRAL_START_NM", format!("{}", s.start_nm));
            t.add_kword("SPECTRAL_END_NM", format!("{}", s.end_nm));
            t.add_kword("SPECTRAL_NORM", format!("{}", s.norm));
        }

        t.add_field("PARAM_ID", FieldType::Text)?;
        for name in enc.fields() {
            t.add_field(name, FieldType::Real)?;
        }
        if let Some(s) = &info.spectral {
            for i in 0..s.bands {
                t.add_field(&spec_field(s, i), FieldType::Real)?;
            }
        }

        let bands = self.band_params();
        for m in 0..layout.n {
            for o in 0..layout.cord {
                push_row(t, format!("t_{m}_{o}"), bands, |bp| bp.tc[m * layout.cord + o])?;
            }
        }
        let half = layout.shape_per_channel();
        for m in 0..layout.n {
            for i in 0..half {
                push_row(t, format!("s_{m}_{}", shape_comb(m, i)), bands, |bp| bp.shape[m * half + i])?;
            }
        }
        for c in 0..layout.nn {
            let id = format!("c_{c}");
            match enc {
                PcsEncoding::Xyz => push_row(t, id, bands, |bp| bp.pc[c])?,
                PcsEncoding::Lab => {
                    let lab = xyz_to_lab([bands[0].pc[c], bands[1].pc[c], bands[2].pc[c]]);
                    let mut set = vec![Value::Text(id)];
                    set.extend(lab.iter().map(|&v| Value::Real(v)));
                    set.extend(bands[XYZ_BANDS..].iter().map(|bp| Value::Real(bp.pc[c])));
                    t.add_set(set)?;
                }
            }
        }
        Ok(cg)
    }

    /// Writes the model to a file.
    pub fn write_mpp<P: AsRef<Path>>(&self, path: P, enc: PcsEncoding) -> MppResult<()> {
        self.to_cgats(enc)?.write_file(path.as_ref())?;
        debug!(path = %path.as_ref().display(), ?enc, "wrote model");
        Ok(())
    }

    /// Reads a model file. White and black points are recomputed.
    pub fn read_mpp<P: AsRef<Path>>(path: P) -> MppResult<Self> {
        let cg = Cgats::read_file(path.as_ref())?;
        let mpp = Self::from_cgats(&cg)?;
        debug!(path = %path.as_ref().display(), inks = %mpp.mask(), "read model");
        Ok(mpp)
    }

    /// Builds a model from a parsed CGATS file.
    pub fn from_cgats(cg: &Cgats) -> MppResult<Self> {
        let t = cg.table(0).ok_or_else(|| format_err("no table"))?;
        if t.kind() != MPP_TABLE {
            return Err(format_err(format!("table type {}, expected {MPP_TABLE}", t.kind())));
        }
        Self::build(parse_table(t)?, read_black_tuning(t)?)
    }
}

fn push_row(
    t: &mut Table,
    id: String,
    bands: &[BandParams],
    get: impl Fn(&BandParams) -> f64,
) -> mpp_cgats::CgatsResult<()> {
    let mut set = Vec::with_capacity(1 + bands.len());
    set.push(Value::Text(id));
    set.extend(bands.iter().map(|bp| Value::Real(get(bp))));
    t.add_set(set)
}

fn kword<'a>(t: &'a Table, name: &str) -> MppResult<&'a str> {
    t.find_kword(name).ok_or_else(|| format_err(format!("missing {name}")))
}

fn kword_num<T: std::str::FromStr>(t: &Table, name: &str) -> MppResult<T> {
    let s = kword(t, name)?;
    s.trim().parse().map_err(|_| format_err(format!("bad {name}: {s}")))
}

fn opt_num<T: std::str::FromStr>(t: &Table, name: &str) -> MppResult<Option<T>> {
    match t.find_kword(name) {
        Some(_) => kword_num(t, name).map(Some),
        None => Ok(None),
    }
}

/// Writes the black point solver settings that differ from the defaults.
fn write_black_tuning(t: &mut Table, tuning: &FitTuning) {
    let d = FitTuning::default();
    if tuning.black_restarts != d.black_restarts {
        t.add_kword("BLACK_RESTARTS", tuning.black_restarts.to_string());
    }
    if tuning.black_seed != d.black_seed {
        t.add_kword("BLACK_SEED", tuning.black_seed.to_string());
    }
    if tuning.black_neutral_weight != d.black_neutral_weight {
        t.add_kword("BLACK_NEUTRAL_WEIGHT", format!("{}", tuning.black_neutral_weight));
    }
    if tuning.black_range_weight != d.black_range_weight {
        t.add_kword("BLACK_RANGE_WEIGHT", format!("{}", tuning.black_range_weight));
    }
    if tuning.black_fail != d.black_fail {
        t.add_kword("BLACK_FAIL", format!("{}", tuning.black_fail));
    }
}

/// Black point solver settings of a file; absent keywords keep defaults.
fn read_black_tuning(t: &Table) -> MppResult<FitTuning> {
    let mut tuning = FitTuning::default();
    if let Some(v) = opt_num(t, "BLACK_RESTARTS")? {
        tuning.black_restarts = v;
    }
    if let Some(v) = opt_num(t, "BLACK_SEED")? {
        tuning.black_seed = v;
    }
    if let Some(v) = opt_num(t, "BLACK_NEUTRAL_WEIGHT")? {
        tuning.black_neutral_weight = v;
    }
    if let Some(v) = opt_num(t, "BLACK_RANGE_WEIGHT")? {
        tuning.black_range_weight = v;
    }
    if let Some(v) = opt_num(t, "BLACK_FAIL")? {
        tuning.black_fail = v;
    }
    Ok(tuning)
}

fn parse_table(t: &Table) -> MppResult<MppParts> {
    let mask = InkMask::from_chars(kword(t, "COLOR_REP")?)
        .map_err(|e| format_err(format!("COLOR_REP: {e}")))?;
    match (kword(t, "DEVICE_CLASS")?, mask.is_additive()) {
        ("OUTPUT", false) | ("DISPLAY", true) => {}
        (class @ ("OUTPUT" | "DISPLAY"), _) => {
            return Err(format_err(format!("DEVICE_CLASS {class} does not match COLOR_REP {mask}")));
        }
        (class, _) => return Err(format_err(format!("unknown DEVICE_CLASS {class}"))),
    }

    let cord: usize = kword_num(t, "TRANSFER_ORDERS")?;
    if !(1..=MAX_ORDER).contains(&cord) {
        return Err(format_err(format!("TRANSFER_ORDERS {cord} outside 1..={MAX_ORDER}")));
    }
    let shaped = match t.find_kword("SHAPE_PARAMS") {
        None | Some("NO") => false,
        Some("YES") => true,
        Some(other) => return Err(format_err(format!("bad SHAPE_PARAMS: {other}"))),
    };
    let limit = opt_num::<f64>(t, "TOTAL_INK_LIMIT")?.map(|l| l / 100.0);

    let spectral = match SPECTRAL_KEYWORDS.iter().filter(|k| t.find_kword(k).is_some()).count() {
        0 => None,
        4 => Some(
            SpectralShape::new(
                kword_num(t, "SPECTRAL_BANDS")?,
                kword_num(t, "SPECTRAL_START_NM")?,
                kword_num(t, "SPECTRAL_END_NM")?,
                kword_num(t, "SPECTRAL_NORM")?,
            )
            .map_err(|e| format_err(e.to_string()))?,
        ),
        _ => return Err(format_err(format!("{} must appear together", SPECTRAL_KEYWORDS.join(", ")))),
    };

    let field = |name: &str| t.find_field(name).ok_or_else(|| format_err(format!("missing field {name}")));
    let id_col = field("PARAM_ID")?;
    let enc = if t.find_field("XYZ_X").is_some() { PcsEncoding::Xyz } else { PcsEncoding::Lab };
    let mut cols = enc.fields().map(field).into_iter().collect::<MppResult<Vec<_>>>()?;
    if let Some(s) = &spectral {
        for i in 0..s.bands {
            cols.push(field(&spec_field(s, i))?);
        }
    }

    let rows: HashMap<&str, usize> = (0..t.len())
        .filter_map(|r| t.text(r, id_col).map(|id| (id, r)))
        .collect();
    let values = |id: &str| -> MppResult<Vec<f64>> {
        let r = *rows.get(id).ok_or_else(|| format_err(format!("missing parameter {id}")))?;
        cols.iter()
            .map(|&c| t.real(r, c).ok_or_else(|| format_err(format!("{id}: non-numeric value"))))
            .collect()
    };

    let mut parts = MppParts {
        mask,
        limit,
        cord,
        shaped,
        spectral,
        instrument: t.find_kword("TARG_INSTRUMENT").map(str::to_string),
        created: t.find_kword("CREATED").map(str::to_string),
        bands: Vec::new(),
    };
    let layout = parts.layout();
    parts.bands = vec![BandParams::zeroed(&layout); cols.len()];

    for m in 0..layout.n {
        for o in 0..cord {
            for (bp, v) in parts.bands.iter_mut().zip(values(&format!("t_{m}_{o}"))?) {
                bp.tc[m * cord + o] = v;
            }
        }
    }
    if layout.shaped {
        let half = layout.shape_per_channel();
        for m in 0..layout.n {
            for c in (0..layout.nn).filter(|c| c & (1 << m) == 0) {
                for (bp, v) in parts.bands.iter_mut().zip(values(&format!("s_{m}_{c}"))?) {
                    bp.shape[m * half + shape_index(m, c)] = v;
                }
            }
        }
    }
    for c in 0..layout.nn {
        let mut v = values(&format!("c_{c}"))?;
        if enc == PcsEncoding::Lab {
            let xyz = lab_to_xyz([v[0], v[1], v[2]]);
            v[..XYZ_BANDS].copy_from_slice(&xyz);
        }
        for (bp, v) in parts.bands.iter_mut().zip(v) {
            bp.pc[c] = v;
        }
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpp_cgats::Cgats;

    fn cmy() -> Mpp {
        let mask = InkMask::from_chars("CMY").unwrap();
        let prims: Vec<[f64; 3]> = (0..8)
            .map(|c: usize| {
                let k = 0.85 * 0.45f64.powi(c.count_ones() as i32);
                [k * 0.96, k, k * 0.82]
            })
            .collect();
        let mut parts = MppParts::from_primaries(mask, &prims).unwrap();
        parts.limit = Some(2.5);
        Mpp::from_parts(parts).unwrap()
    }

    #[test]
    fn keywords_and_rows() {
        let cg = cmy().to_cgats(PcsEncoding::Xyz).unwrap();
        let t = cg.table(0).unwrap();
        assert_eq!(t.kind(), "MPP");
        assert_eq!(t.find_kword("DEVICE_CLASS"), Some("OUTPUT"));
        assert_eq!(t.find_kword("COLOR_REP"), Some("CMY"));
        assert_eq!(t.find_kword("TOTAL_INK_LIMIT"), Some("250"));
        assert_eq!(t.find_kword("SHAPE_PARAMS"), Some("NO"));
        // 3 transfer rows and 8 primaries
        assert_eq!(t.len(), 11);
        assert_eq!(t.text(0, 0), Some("t_0_0"));
        assert_eq!(t.text(10, 0), Some("c_7"));
    }

    fn reparse(text: &str) -> MppResult<Mpp> {
        Mpp::from_cgats(&Cgats::parse_str(text).unwrap())
    }

    fn format_error(res: MppResult<Mpp>, needle: &str) -> bool {
        matches!(res, Err(MppError::Format(msg)) if msg.contains(needle))
    }

    #[test]
    fn rejects_inconsistent_files() {
        let good = cmy().to_cgats(PcsEncoding::Xyz).unwrap().to_string();
        assert!(reparse(&good).is_ok());

        let bad_class = good.replace("DEVICE_CLASS \"OUTPUT\"", "DEVICE_CLASS \"DISPLAY\"");
        assert!(format_error(reparse(&bad_class), "DEVICE_CLASS"));

        let bad_order = good.replace("TRANSFER_ORDERS \"1\"", "TRANSFER_ORDERS \"21\"");
        assert!(format_error(reparse(&bad_order), "TRANSFER_ORDERS"));

        let missing = good.replace("\"c_5\"", "\"x_5\"");
        assert!(format_error(reparse(&missing), "c_5"));

        let wrong_type = good.replacen("MPP", "CTI3", 1);
        assert!(format_error(reparse(&wrong_type), "table type"));

        let partial_spectral = good.replace("SHAPE_PARAMS \"NO\"", "SHAPE_PARAMS \"NO\"\nSPECTRAL_START_NM \"400\"");
        assert!(format_error(reparse(&partial_spectral), "must appear together"));
    }

    #[test]
    fn shaped_model_round_trip() {
        let mut parts = cmy().to_parts();
        parts.shaped = true;
        let layout = parts.layout();
        for (j, bp) in parts.bands.iter_mut().enumerate() {
            bp.shape = (0..layout.n_shape()).map(|i| 0.01 * i as f64 - 0.05 + 0.001 * j as f64).collect();
        }
        let mpp = Mpp::from_parts(parts).unwrap();

        let text = mpp.to_cgats(PcsEncoding::Xyz).unwrap().to_string();
        assert!(text.contains("SHAPE_PARAMS \"YES\""));
        assert!(text.contains("\"s_0_2\""));
        let back = reparse(&text).unwrap();
        assert_eq!(back.to_parts().bands, mpp.to_parts().bands);
        assert_eq!(back.get_wb(), mpp.get_wb());
    }

    #[test]
    fn black_tuning_round_trip() {
        let plain = cmy().to_cgats(PcsEncoding::Xyz).unwrap().to_string();
        assert!(!plain.contains("BLACK_"));

        let tuning = FitTuning {
            black_restarts: 4,
            black_neutral_weight: 25.0,
            ..FitTuning::default()
        };
        let mpp = Mpp::build(cmy().to_parts(), tuning).unwrap();
        let text = mpp.to_cgats(PcsEncoding::Xyz).unwrap().to_string();
        assert!(text.contains("BLACK_RESTARTS \"4\""));
        assert!(!text.contains("BLACK_SEED"));

        let back = reparse(&text).unwrap();
        assert_eq!(back.tuning(), mpp.tuning());
        assert_eq!(back.get_wb(), mpp.get_wb());
    }

    #[test]
    fn file_round_trip_keeps_parameters() {
        let mut parts = cmy().to_parts();
        parts.instrument = Some("i1Pro".into());
        parts.created = Some("Sat Oct 17 2026".into());
        let mpp = Mpp::from_parts(parts).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmy.mpp");
        mpp.write_mpp(&path, PcsEncoding::Xyz).unwrap();
        let back = Mpp::read_mpp(&path).unwrap();

        let (a, b) = (mpp.to_parts(), back.to_parts());
        assert_eq!(a.mask, b.mask);
        assert_eq!(a.limit, b.limit);
        assert_eq!(a.instrument, b.instrument);
        assert_eq!(a.created, b.created);
        assert_eq!(a.bands, b.bands);
        assert_eq!(mpp.get_wb(), back.get_wb());
    }

    #[test]
    fn lab_encoding_round_trip() {
        let mpp = cmy();
        let cg = mpp.to_cgats(PcsEncoding::Lab).unwrap();
        assert!(cg.table(0).unwrap().find_field("LAB_L").is_some());
        let back = Mpp::from_cgats(&Cgats::parse_str(&cg.to_string()).unwrap()).unwrap();
        for c in 0..8usize {
            let dev: Vec<f64> = (0..3).map(|m| ((c >> m) & 1) as f64).collect();
            let (a, b) = (mpp.lookup(&dev), back.lookup(&dev));
            for j in 0..3 {
                assert!((a[j] - b[j]).abs() < 1e-9);
            }
        }
    }
}
