//! CGATS text writer.

use crate::{Cgats, CgatsResult, Table, Value};
use std::io::Write;

/// Keywords every CGATS reader knows without a `KEYWORD` declaration.
const STANDARD_KEYWORDS: &[&str] = &[
    "DESCRIPTOR",
    "ORIGINATOR",
    "CREATED",
    "MANUFACTURER",
    "PROD_DATE",
    "SERIAL",
    "MATERIAL",
    "INSTRUMENTATION",
    "MEASUREMENT_SOURCE",
    "PRINT_CONDITIONS",
];

impl Cgats {
    /// Writes all tables to `writer`.
    ///
    /// Numbers use the shortest text that reads back to the same `f64`.
    pub fn write<W: Write>(&self, writer: &mut W) -> CgatsResult<()> {
        for (i, table) in self.tables().iter().enumerate() {
            if i > 0 {
                writeln!(writer)?;
            }
            write_table(writer, table)?;
        }
        Ok(())
    }
}

fn write_table<W: Write>(w: &mut W, t: &Table) -> CgatsResult<()> {
    writeln!(w, "{}", t.kind())?;
    writeln!(w)?;

    for (name, value) in t.keywords() {
        if !STANDARD_KEYWORDS.contains(&name) {
            writeln!(w, "KEYWORD \"{name}\"")?;
        }
        writeln!(w, "{name} \"{value}\"")?;
    }
    writeln!(w)?;

    writeln!(w, "NUMBER_OF_FIELDS {}", t.fields().len())?;
    writeln!(w, "BEGIN_DATA_FORMAT")?;
    let names: Vec<&str> = t.fields().iter().map(|f| f.name.as_str()).collect();
    writeln!(w, "{}", names.join(" "))?;
    writeln!(w, "END_DATA_FORMAT")?;
    writeln!(w)?;

    writeln!(w, "NUMBER_OF_SETS {}", t.len())?;
    writeln!(w, "BEGIN_DATA")?;
    for row in t.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                Value::Real(x) => format!("{x}"),
                Value::Text(s) => format!("\"{s}\""),
            })
            .collect();
        writeln!(w, "{}", cells.join(" "))?;
    }
    writeln!(w, "END_DATA")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Cgats, FieldType, Value};

    fn sample() -> Cgats {
        let mut cg = Cgats::new();
        let t = cg.add_table("MPP");
        t.add_kword("DESCRIPTOR", "test profile");
        t.add_kword("COLOR_REP", "CMYK");
        t.add_field("PARAM_ID", FieldType::Text).unwrap();
        t.add_field("XYZ_X", FieldType::Real).unwrap();
        for (id, v) in [("t_0_0", -1.6), ("c_1", 0.1 + 0.2), ("c_2", 1.0e-17)] {
            t.add_set(vec![Value::from(id), Value::from(v)]).unwrap();
        }
        cg
    }

    #[test]
    fn declares_custom_keywords() {
        let text = sample().to_string();
        assert!(text.contains("KEYWORD \"COLOR_REP\""));
        assert!(!text.contains("KEYWORD \"DESCRIPTOR\""));
        assert!(text.contains("NUMBER_OF_SETS 3"));
    }

    #[test]
    fn reals_read_back_exactly() {
        let cg = sample();
        let back = Cgats::parse_str(&cg.to_string()).unwrap();
        assert_eq!(back, cg);
    }

    #[test]
    fn file_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mpp");
        sample().write_file(&path).unwrap();
        let back = Cgats::read_file(&path).unwrap();
        assert_eq!(back.tables()[0].find_kword("DESCRIPTOR"), Some("test profile"));
        assert_eq!(back.tables()[0].real(1, 1), Some(0.1 + 0.2));
    }
}
