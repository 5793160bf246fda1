//! CGATS text parser.
//!
//! Line oriented. Each table starts with its type identifier on a line of
//! its own, followed by keyword lines, a `BEGIN_DATA_FORMAT` block naming
//! the fields and a `BEGIN_DATA` block of sets. Column types are inferred:
//! a column whose values are all unquoted numbers is [`FieldType::Real`],
//! anything else is [`FieldType::Text`].

use crate::{Cgats, CgatsError, CgatsResult, Field, FieldType, Table, Value};
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    quoted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Keywords,
    Format,
    Data,
}

struct Pending {
    table: Table,
    names: Vec<String>,
    rows: Vec<Vec<Token>>,
    n_fields: Option<usize>,
    n_sets: Option<usize>,
}

impl Pending {
    fn new(kind: &str) -> Self {
        Self {
            table: Table::new(kind),
            names: Vec::new(),
            rows: Vec::new(),
            n_fields: None,
            n_sets: None,
        }
    }

    /// Adds field names up to `END_DATA_FORMAT`. Returns whether the
    /// format block ended.
    fn add_names(&mut self, tokens: &[Token]) -> CgatsResult<bool> {
        for tok in tokens {
            if !tok.quoted && tok.text == "END_DATA_FORMAT" {
                return Ok(true);
            }
            if self.names.contains(&tok.text) {
                return Err(CgatsError::DuplicateField(tok.text.clone()));
            }
            self.names.push(tok.text.clone());
        }
        Ok(false)
    }

    fn finish(mut self, line: usize) -> CgatsResult<Table> {
        if let Some(n) = self.n_fields {
            if n != self.names.len() {
                return Err(parse_err(
                    line,
                    format!("NUMBER_OF_FIELDS is {n} but {} fields declared", self.names.len()),
                ));
            }
        }
        if let Some(n) = self.n_sets {
            if n != self.rows.len() {
                return Err(parse_err(
                    line,
                    format!("NUMBER_OF_SETS is {n} but {} sets found", self.rows.len()),
                ));
            }
        }

        let fields: Vec<Field> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let real = self
                    .rows
                    .iter()
                    .all(|r| !r[i].quoted && r[i].text.parse::<f64>().is_ok());
                let ty = if real { FieldType::Real } else { FieldType::Text };
                Field { name: name.clone(), ty }
            })
            .collect();

        let rows = self
            .rows
            .into_iter()
            .map(|r| {
                r.into_iter()
                    .zip(&fields)
                    .map(|(tok, f)| match f.ty {
                        FieldType::Real => Value::Real(tok.text.parse().unwrap_or(0.0)),
                        FieldType::Text => Value::Text(tok.text),
                    })
                    .collect()
            })
            .collect();

        self.table.push_parsed(fields, rows);
        Ok(self.table)
    }
}

fn parse_err(line: usize, msg: impl Into<String>) -> CgatsError {
    CgatsError::Parse { line, msg: msg.into() }
}

impl Cgats {
    /// Parses CGATS text from a reader.
    pub fn parse<R: BufRead>(reader: R) -> CgatsResult<Self> {
        let mut cgats = Cgats::new();
        let mut state = State::Start;
        let mut pending: Option<Pending> = None;
        let mut line_no = 0;

        for line in reader.lines() {
            let line = line?;
            line_no += 1;
            let tokens = tokenize(&line).map_err(|m| parse_err(line_no, m))?;
            if tokens.is_empty() {
                continue;
            }

            match state {
                State::Start => {
                    pending = Some(Pending::new(&tokens[0].text));
                    state = State::Keywords;
                }
                State::Keywords => {
                    let Some(p) = pending.as_mut() else {
                        return Err(parse_err(line_no, "keyword outside a table"));
                    };
                    let head = tokens[0].text.as_str();
                    match head {
                        "KEYWORD" => {}
                        "NUMBER_OF_FIELDS" => p.n_fields = Some(parse_count(&tokens, line_no)?),
                        "NUMBER_OF_SETS" => p.n_sets = Some(parse_count(&tokens, line_no)?),
                        "BEGIN_DATA_FORMAT" => {
                            if !p.add_names(&tokens[1..])? {
                                state = State::Format;
                            }
                        }
                        "BEGIN_DATA" => {
                            if p.names.is_empty() {
                                return Err(parse_err(line_no, "BEGIN_DATA before data format"));
                            }
                            state = State::Data;
                        }
                        _ => {
                            let value = tokens[1..]
                                .iter()
                                .map(|t| t.text.as_str())
                                .collect::<Vec<_>>()
                                .join(" ");
                            p.table.add_kword(head, value);
                        }
                    }
                }
                State::Format => {
                    let Some(p) = pending.as_mut() else {
                        return Err(parse_err(line_no, "field list outside a table"));
                    };
                    if p.add_names(&tokens)? {
                        state = State::Keywords;
                    }
                }
                State::Data => {
                    if !tokens[0].quoted && tokens[0].text == "END_DATA" {
                        if let Some(p) = pending.take() {
                            cgats.push(p.finish(line_no)?);
                        }
                        state = State::Start;
                        continue;
                    }
                    let Some(p) = pending.as_mut() else {
                        return Err(parse_err(line_no, "data outside a table"));
                    };
                    if tokens.len() != p.names.len() {
                        return Err(parse_err(
                            line_no,
                            format!("expected {} values, found {}", p.names.len(), tokens.len()),
                        ));
                    }
                    p.rows.push(tokens);
                }
            }
        }

        match state {
            State::Start => {}
            State::Keywords if pending.as_ref().is_some_and(|p| p.names.is_empty()) => {
                return Err(parse_err(line_no, "table has no data format"));
            }
            _ => return Err(parse_err(line_no, "unexpected end of file")),
        }

        if cgats.tables().is_empty() {
            return Err(CgatsError::NoTable);
        }
        Ok(cgats)
    }
}

fn parse_count(tokens: &[Token], line: usize) -> CgatsResult<usize> {
    tokens
        .get(1)
        .and_then(|t| t.text.parse().ok())
        .ok_or_else(|| parse_err(line, format!("invalid {}", tokens[0].text)))
}

/// Splits a line into whitespace separated tokens. Double quotes group,
/// `#` outside quotes starts a comment.
fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut out = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            break;
        } else if c == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                text.push(c);
            }
            if !closed {
                return Err("unterminated string".into());
            }
            out.push(Token { text, quoted: true });
        } else {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '"' {
                    break;
                }
                text.push(c);
                chars.next();
            }
            out.push(Token { text, quoted: false });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TI3: &str = r#"CTI3

DESCRIPTOR "Argyll Calibration Target chart information 3"
ORIGINATOR "Argyll target"
KEYWORD "DEVICE_CLASS"
DEVICE_CLASS "OUTPUT"
COLOR_REP "CMYK_XYZ"   # trailing comment

NUMBER_OF_FIELDS 6
BEGIN_DATA_FORMAT
SAMPLE_ID CMYK_C CMYK_M
CMYK_Y CMYK_K XYZ_Y
END_DATA_FORMAT

NUMBER_OF_SETS 2
BEGIN_DATA
1 0.0 0.0 0.0 0.0 90.1
"A2" 100 0 0 0 24.5
END_DATA
"#;

    #[test]
    fn parses_ti3() {
        let cg = Cgats::parse_str(TI3).unwrap();
        let t = &cg.tables()[0];
        assert_eq!(t.kind(), "CTI3");
        assert_eq!(t.find_kword("DEVICE_CLASS"), Some("OUTPUT"));
        assert_eq!(t.find_kword("COLOR_REP"), Some("CMYK_XYZ"));
        assert_eq!(t.fields().len(), 6);
        assert_eq!(t.fields()[0].ty, FieldType::Text);
        assert_eq!(t.fields()[1].ty, FieldType::Real);
        assert_eq!(t.text(0, 0), Some("1"));
        assert_eq!(t.text(1, 0), Some("A2"));
        assert_eq!(t.real(1, 1), Some(100.0));
        assert_eq!(t.real(0, 5), Some(90.1));
    }

    #[test]
    fn multiple_tables() {
        let text = format!("{TI3}\nCAL\nBEGIN_DATA_FORMAT\nRGB_I RGB_R\nEND_DATA_FORMAT\nBEGIN_DATA\n0 0\n1 1\nEND_DATA\n");
        let cg = Cgats::parse_str(&text).unwrap();
        assert_eq!(cg.tables().len(), 2);
        assert_eq!(cg.tables()[1].kind(), "CAL");
        assert_eq!(cg.tables()[1].len(), 2);
    }

    #[test]
    fn set_count_mismatch() {
        let text = TI3.replace("NUMBER_OF_SETS 2", "NUMBER_OF_SETS 3");
        assert!(matches!(Cgats::parse_str(&text), Err(CgatsError::Parse { .. })));
    }

    #[test]
    fn short_row() {
        let text = TI3.replace("\"A2\" 100 0 0 0 24.5", "\"A2\" 100 0 0");
        let err = Cgats::parse_str(&text).unwrap_err();
        assert!(matches!(err, CgatsError::Parse { line: 18, .. }), "{err}");
    }

    #[test]
    fn truncated_and_empty() {
        let cut = &TI3[..TI3.len() - "\nEND_DATA\n".len()];
        assert!(Cgats::parse_str(cut).is_err());
        assert!(matches!(Cgats::parse_str("# nothing\n\n"), Err(CgatsError::NoTable)));
    }

    #[test]
    fn format_on_one_line() {
        let text = "CAL\nBEGIN_DATA_FORMAT RGB_I RGB_R END_DATA_FORMAT\nBEGIN_DATA\n0 0\n1 1\nEND_DATA\n";
        let cg = Cgats::parse_str(text).unwrap();
        let t = &cg.tables()[0];
        assert_eq!(t.fields().len(), 2);
        assert_eq!(t.real(1, 1), Some(1.0));

        let dup = "CAL\nBEGIN_DATA_FORMAT RGB_I RGB_I\nEND_DATA_FORMAT\nBEGIN_DATA\n0 0\nEND_DATA\n";
        assert!(matches!(Cgats::parse_str(dup), Err(CgatsError::DuplicateField(_))));
    }

    #[test]
    fn tokenizer() {
        let toks = tokenize(r#"KEY "a b"  c # gone"#).unwrap();
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[1], Token { text: "a b".into(), quoted: true });
        assert!(tokenize("\"open").is_err());
    }
}
