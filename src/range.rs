use crate::token::{Token, MAX_STRING, MIN_STRING};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("min or max is not valid")]
    InvalidBound,
}

/// Parsed interval over scores. Owns both bound tokens; `minex` / `maxex`
/// mark an exclusive end.
pub struct RangeSpec {
    pub min: Token,
    pub max: Token,
    pub minex: bool,
    pub maxex: bool,
}

impl RangeSpec {
    /// Interpret a pair of bound tokens:
    ///
    /// | first byte | meaning                         |
    /// |------------|---------------------------------|
    /// | `+`        | above every token, inclusive    |
    /// | `-`        | below every token, inclusive    |
    /// | `(`        | remainder of the bytes, exclusive |
    /// | `[`        | remainder of the bytes, inclusive |
    /// | other      | whole byte string, inclusive    |
    ///
    /// `+` and `-` must be exactly one byte. Integer-encoded bounds are
    /// rejected; the sentinels only parse from string-encoded input.
    pub fn parse(min: &Token, max: &Token) -> Result<RangeSpec, RangeError> {
        if min.is_int() || max.is_int() {
            return Err(RangeError::InvalidBound);
        }
        let (min, minex) = parse_bound(min)?;
        let (max, maxex) = parse_bound(max)?;
        Ok(RangeSpec {
            min,
            max,
            minex,
            maxex,
        })
    }
}

fn parse_bound(item: &Token) -> Result<(Token, bool), RangeError> {
    let bytes = item.as_bytes();
    match bytes.first() {
        Some(b'+') => {
            if bytes.len() != 1 {
                return Err(RangeError::InvalidBound);
            }
            Ok((MAX_STRING.clone(), false))
        }
        Some(b'-') => {
            if bytes.len() != 1 {
                return Err(RangeError::InvalidBound);
            }
            Ok((MIN_STRING.clone(), false))
        }
        Some(b'(') => Ok((Token::raw(&bytes[1..]), true)),
        Some(b'[') => Ok((Token::raw(&bytes[1..]), false)),
        _ => Ok((Token::raw(bytes), false)),
    }
}
