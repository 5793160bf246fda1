//! # mpp-cgats
//!
//! Reading and writing CGATS.5 style text tables.
//!
//! CGATS files carry colour measurement data (Argyll `.ti3` files) and
//! serialized model printer profiles. A file holds one or more tables;
//! each table has a type identifier, keyword/value pairs, a list of named
//! fields, and rows of values.
//!
//! # Format
//!
//! ```text
//! CTI3
//!
//! DESCRIPTOR "Calibration target"
//! KEYWORD "DEVICE_CLASS"
//! DEVICE_CLASS "OUTPUT"
//!
//! NUMBER_OF_FIELDS 4
//! BEGIN_DATA_FORMAT
//! SAMPLE_ID CMY_C CMY_M CMY_Y
//! END_DATA_FORMAT
//!
//! NUMBER_OF_SETS 2
//! BEGIN_DATA
//! "A1" 0.0 0.0 0.0
//! "A2" 100.0 0.0 0.0
//! END_DATA
//! ```
//!
//! # Example
//!
//! ```rust
//! use mpp_cgats::{Cgats, FieldType, Value};
//!
//! let mut cg = Cgats::new();
//! let t = cg.add_table("MPP");
//! t.add_kword("COLOR_REP", "CMYK");
//! t.add_field("PARAM_ID", FieldType::Text).unwrap();
//! t.add_field("XYZ_Y", FieldType::Real).unwrap();
//! t.add_set(vec![Value::from("c_0"), Value::from(0.9)]).unwrap();
//!
//! let text = cg.to_string();
//! let back = Cgats::parse_str(&text).unwrap();
//! assert_eq!(back.tables()[0].real(0, 1), Some(0.9));
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - Error handling
//!
//! # Used By
//!
//! - `mpp-model` - Model persistence
//! - `mpp-cli` - Measurement file loading

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod parse;
mod table;
mod write;

pub use error::{CgatsError, CgatsResult};
pub use table::{Cgats, Field, FieldType, Table, Value};
