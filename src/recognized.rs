use std::fmt;
use std::str::FromStr;

/// A host-supplied value that either maps onto a known variant `T` or is kept
/// verbatim as `Raw`.
///
/// Scene hosts hand us free-form strings (custom mesh properties, animation
/// channel paths). Anything we don't understand is preserved so it can be
/// reported instead of silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Recognized<T, Raw = String> {
    Known(T),
    Unknown(Raw),
}

impl<T: Copy, Raw: Copy> Copy for Recognized<T, Raw> {}

impl<T: FromStr> Recognized<T, String> {
    /// Parse `raw` into `T`, keeping the original text when parsing fails.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<T>() {
            Ok(value) => Recognized::Known(value),
            Err(_) => Recognized::Unknown(raw.to_string()),
        }
    }
}

impl<T, Raw> Recognized<T, Raw> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Recognized::Known(t) => Some(t),
            Recognized::Unknown(_) => None,
        }
    }

    pub fn unknown(&self) -> Option<&Raw> {
        match self {
            Recognized::Known(_) => None,
            Recognized::Unknown(raw) => Some(raw),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Recognized::Known(_))
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Recognized::Known(t) => t,
            Recognized::Unknown(_) => default,
        }
    }
}

impl<T, Raw> From<T> for Recognized<T, Raw> {
    fn from(value: T) -> Self {
        Recognized::Known(value)
    }
}

impl<T: fmt::Display, Raw: fmt::Display> fmt::Display for Recognized<T, Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recognized::Known(t) => t.fmt(f),
            Recognized::Unknown(raw) => raw.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_unknown_text() {
        let known: Recognized<u32> = Recognized::parse("42");
        assert_eq!(known.known(), Some(&42));

        let unknown: Recognized<u32> = Recognized::parse("forty-two");
        assert!(!unknown.is_known());
        assert_eq!(unknown.unknown().map(String::as_str), Some("forty-two"));
        assert_eq!(unknown.to_string(), "forty-two");
        assert_eq!(unknown.unwrap_or(7), 7);
    }
}
