//! Ordered, case-insensitive HTTP field table.
//!
//! Field lines are parsed one at a time so that a line boundary may fall
//! anywhere inside the caller's buffer. The same table type is used for
//! request headers, request trailers and the headers of a response.

use std::fmt;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Punctuation allowed in a field name besides letters and digits.
const TOKEN_PUNCTUATION: &[u8] = b"!#$%&'*+-.^_`|~";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Name is empty or contains a non-token byte, such as whitespace
    /// before the colon.
    InvalidName(String),
    MissingColon,
    InvalidValue,
    DuplicateHost,
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::InvalidName(name) => write!(f, "invalid field name: {:?}", name),
            HeaderError::MissingColon => write!(f, "field line has no colon"),
            HeaderError::InvalidValue => write!(f, "invalid field value"),
            HeaderError::DuplicateHost => write!(f, "duplicate host field"),
        }
    }
}

impl std::error::Error for HeaderError {}

/// Header (or trailer) fields in first-seen order.
///
/// Names are stored lower-cased. Setting a name that is already present
/// joins the new value onto the old one with `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses at most one field line from the front of `data`.
    ///
    /// Returns `(consumed, done)`:
    /// - `(0, false)` when no complete line is buffered yet,
    /// - `(2, true)` for the empty line that ends the section,
    /// - `(line length + 2, false)` after a field was merged into the table.
    ///
    /// On error nothing is consumed and the table is left untouched.
    ///
    /// # Example
    ///
    /// ```
    /// # use courier::http::headers::Headers;
    /// let mut headers = Headers::new();
    /// let (consumed, done) = headers.parse_field(b"Host: localhost:42069\r\n\r\n").unwrap();
    /// assert_eq!(consumed, 23);
    /// assert!(!done);
    /// assert_eq!(headers.get("host"), Some("localhost:42069"));
    /// ```
    pub fn parse_field(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(line_end) = find_crlf(data) else {
            return Ok((0, false));
        };

        if line_end == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = &data[..line_end];
        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(HeaderError::MissingColon)?;

        let raw_name = &line[..colon];
        if !is_valid_name(raw_name) {
            return Err(HeaderError::InvalidName(
                String::from_utf8_lossy(raw_name).into_owned(),
            ));
        }

        let raw_value = &line[colon + 1..];
        if raw_value.iter().any(|&b| matches!(b, b'\0' | b'\r' | b'\n')) {
            return Err(HeaderError::InvalidValue);
        }
        let value = std::str::from_utf8(raw_value)
            .map_err(|_| HeaderError::InvalidValue)?
            .trim_matches(|c| c == ' ' || c == '\t')
            .to_lowercase();

        // Token bytes are ASCII.
        let name = String::from_utf8_lossy(raw_name).to_ascii_lowercase();

        if name == "host" && self.contains("host") {
            return Err(HeaderError::DuplicateHost);
        }

        self.set(&name, &value);
        Ok((line_end + CRLF.len(), false))
    }

    /// Inserts a field, joining with `", "` when the name is already present.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => self.fields.push((name, value.to_string())),
        }
    }

    /// Sets a field, discarding any previous value for the name.
    pub fn replace(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.fields.push((name, value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .fields
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.fields.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serializes every field as `name: value\r\n` followed by the blank line.
    pub(crate) fn write_section(&self, buf: &mut Vec<u8>) {
        for (name, value) in self.iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(CRLF);
        }
        buf.extend_from_slice(CRLF);
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.set(name.as_ref(), value.as_ref());
        }
        headers
    }
}

pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn is_valid_name(name: &[u8]) -> bool {
    !name.is_empty()
        && name
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || TOKEN_PUNCTUATION.contains(b))
}
