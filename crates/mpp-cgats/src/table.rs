//! In-memory CGATS tables.

use crate::{CgatsError, CgatsResult};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Floating point number.
    Real,
    /// Quoted string.
    Text,
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name, e.g. `XYZ_X`.
    pub name: String,
    /// Data type of every value in the column.
    pub ty: FieldType,
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Number.
    Real(f64),
    /// String.
    Text(String),
}

impl Value {
    /// Type of this value.
    pub fn ty(&self) -> FieldType {
        match self {
            Value::Real(_) => FieldType::Real,
            Value::Text(_) => FieldType::Text,
        }
    }

    /// Numeric value, if this is a number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    /// String value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Real(_) => None,
            Value::Text(s) => Some(s),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// One table: type identifier, keywords, fields and data sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    kind: String,
    keywords: Vec<(String, String)>,
    fields: Vec<Field>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates an empty table of the given type (e.g. `"CTI3"`).
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            keywords: Vec::new(),
            fields: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Table type identifier.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Sets a keyword, replacing any previous value.
    pub fn add_kword(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.keywords.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.keywords.push((name.to_string(), value)),
        }
    }

    /// Value of a keyword.
    pub fn find_kword(&self, name: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Keywords in insertion order.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keywords.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Appends a field and returns its index.
    pub fn add_field(&mut self, name: &str, ty: FieldType) -> CgatsResult<usize> {
        if !self.rows.is_empty() {
            return Err(CgatsError::FieldAfterData(name.to_string()));
        }
        if self.find_field(name).is_some() {
            return Err(CgatsError::DuplicateField(name.to_string()));
        }
        self.fields.push(Field { name: name.to_string(), ty });
        Ok(self.fields.len() - 1)
    }

    /// Index of a field.
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// All fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Appends a data set. Values must match the fields in count and type.
    pub fn add_set(&mut self, values: Vec<Value>) -> CgatsResult<()> {
        if values.len() != self.fields.len() {
            return Err(CgatsError::SetLength {
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        if let Some(f) = self.fields.iter().zip(&values).find(|(f, v)| f.ty != v.ty()) {
            return Err(CgatsError::TypeMismatch(f.0.name.clone()));
        }
        self.rows.push(values);
        Ok(())
    }

    /// Number of data sets.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the table has no data sets.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All data sets.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number at `(row, col)`.
    pub fn real(&self, row: usize, col: usize) -> Option<f64> {
        self.rows.get(row)?.get(col)?.as_real()
    }

    /// String at `(row, col)`.
    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_text()
    }

    pub(crate) fn push_parsed(&mut self, fields: Vec<Field>, rows: Vec<Vec<Value>>) {
        self.fields = fields;
        self.rows = rows;
    }
}

/// A CGATS file: an ordered list of tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cgats {
    tables: Vec<Table>,
}

impl Cgats {
    /// Creates an empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a new table and returns it for filling in.
    pub fn add_table(&mut self, kind: &str) -> &mut Table {
        self.tables.push(Table::new(kind));
        let last = self.tables.len() - 1;
        &mut self.tables[last]
    }

    /// All tables.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Table `i`.
    pub fn table(&self, i: usize) -> Option<&Table> {
        self.tables.get(i)
    }

    pub(crate) fn push(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Parses a string.
    pub fn parse_str(text: &str) -> CgatsResult<Self> {
        Self::parse(text.as_bytes())
    }

    /// Reads a file.
    pub fn read_file<P: AsRef<Path>>(path: P) -> CgatsResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::parse(BufReader::new(file))
    }

    /// Writes a file.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> CgatsResult<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for Cgats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.write(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_replace() {
        let mut t = Table::new("MPP");
        t.add_kword("COLOR_REP", "RGB");
        t.add_kword("COLOR_REP", "CMYK");
        assert_eq!(t.find_kword("COLOR_REP"), Some("CMYK"));
        assert_eq!(t.keywords().count(), 1);
        assert_eq!(t.find_kword("MISSING"), None);
    }

    #[test]
    fn set_validation() {
        let mut t = Table::new("MPP");
        t.add_field("ID", FieldType::Text).unwrap();
        t.add_field("V", FieldType::Real).unwrap();
        assert!(matches!(t.add_field("V", FieldType::Real), Err(CgatsError::DuplicateField(_))));

        assert!(matches!(
            t.add_set(vec![Value::from("a")]),
            Err(CgatsError::SetLength { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            t.add_set(vec![Value::from(1.0), Value::from(2.0)]),
            Err(CgatsError::TypeMismatch(_))
        ));
        t.add_set(vec![Value::from("a"), Value::from(2.5)]).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.text(0, 0), Some("a"));
        assert_eq!(t.real(0, 1), Some(2.5));
        assert_eq!(t.real(0, 0), None);
        assert!(matches!(t.add_field("W", FieldType::Real), Err(CgatsError::FieldAfterData(_))));
    }
}
