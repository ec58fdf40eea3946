use once_cell::sync::Lazy;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Shared instance that sorts below every real token.
pub static MIN_STRING: Lazy<Token> = Lazy::new(|| Token::sentinel(Kind::Min, b"minstring"));
/// Shared instance that sorts above every real token.
pub static MAX_STRING: Lazy<Token> = Lazy::new(|| Token::sentinel(Kind::Max, b"maxstring"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    /// Plain byte string.
    Str,
    /// Payload parses as a signed 64-bit integer; the original bytes are kept.
    Int(i64),
    Min,
    Max,
}

struct Repr {
    kind: Kind,
    bytes: Box<[u8]>,
}

/// An opaque, reference-counted byte string. Cloning bumps the refcount; the
/// payload is immutable for the life of the token.
#[derive(Clone)]
pub struct Token {
    repr: Arc<Repr>,
}

impl Token {
    /// Build a token, attempting the integer fast-path encoding first.
    pub fn parse(bytes: &[u8]) -> Self {
        let kind = match parse_strict_i64(bytes) {
            Some(n) => Kind::Int(n),
            None => Kind::Str,
        };
        Token {
            repr: Arc::new(Repr {
                kind,
                bytes: bytes.into(),
            }),
        }
    }

    /// Build a string-encoded token without the integer attempt.
    pub fn raw(bytes: &[u8]) -> Self {
        Token {
            repr: Arc::new(Repr {
                kind: Kind::Str,
                bytes: bytes.into(),
            }),
        }
    }

    fn sentinel(kind: Kind, bytes: &[u8]) -> Self {
        Token {
            repr: Arc::new(Repr {
                kind,
                bytes: bytes.into(),
            }),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.repr.bytes
    }

    pub fn is_int(&self) -> bool {
        matches!(self.repr.kind, Kind::Int(_))
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.repr.kind, Kind::Min | Kind::Max)
    }

    /// Total order over score tokens. Sentinels bound everything; two
    /// integer-encoded tokens compare as signed integers; anything else is
    /// bytewise over the payloads.
    pub fn cmp_score(&self, other: &Token) -> Ordering {
        match (self.repr.kind, other.repr.kind) {
            (Kind::Min, Kind::Min) | (Kind::Max, Kind::Max) => Ordering::Equal,
            (Kind::Min, _) => Ordering::Less,
            (_, Kind::Min) => Ordering::Greater,
            (Kind::Max, _) => Ordering::Greater,
            (_, Kind::Max) => Ordering::Less,
            (Kind::Int(a), Kind::Int(b)) => a.cmp(&b),
            _ => self.repr.bytes.cmp(&other.repr.bytes),
        }
    }

    /// Secondary order over member tokens: always bytewise, even when both
    /// payloads happen to be integer-encoded.
    pub fn cmp_bytes(&self, other: &Token) -> Ordering {
        self.repr.bytes.cmp(&other.repr.bytes)
    }

    /// Score comparison lifted over absent operands: the absent side is
    /// greater, two absent sides are equal.
    pub fn cmp_opt(a: Option<&Token>, b: Option<&Token>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp_score(b),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.is_sentinel() == other.is_sentinel() && self.repr.bytes == other.repr.bytes
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?})", String::from_utf8_lossy(&self.repr.bytes))
    }
}

/// Strict integer parse for the fast-path encoding: optional leading minus,
/// no leading zeros (except "0" itself), fits in i64. Mirrors the encoding
/// rules of the embedding store.
fn parse_strict_i64(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 20 {
        return None;
    }
    let s = std::str::from_utf8(bytes).ok()?;
    if s == "0" {
        return Some(0);
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || digits.starts_with('0') {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
