//! Structural SQL parsing.
//!
//! A full SQL parser is out of scope here; structural extraction (tables,
//! filter/join/order columns, shape flags) runs on case-insensitive regex
//! with keyword exclusion lists instead. Keeping every such pattern behind
//! this one module means a real parser can replace it later without
//! ripple — nothing outside `sql::parser` holds a regex for SQL structure.

mod parser;

pub use parser::{ParsedQuery, parse_structural};
