//! `application/x-www-form-urlencoded` decoding.

use thiserror::Error;

use crate::storage::FormRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestFormatError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("pair {0:?} does not contain exactly one '='")]
    MalformedPair(String),
    #[error("pair {0:?} does not decode to UTF-8")]
    InvalidEncoding(String),
}

/// Decode `key=value&key=value` into a record.
///
/// Pairs are split on the raw text, so an encoded `%26` or `%3D` inside a
/// value stays part of that value. Later duplicates overwrite earlier ones.
pub fn decode_form(payload: &[u8]) -> Result<FormRecord, IngestFormatError> {
    let text = std::str::from_utf8(payload).map_err(|_| IngestFormatError::InvalidUtf8)?;

    let mut record = FormRecord::new();
    for pair in text.split('&') {
        let mut parts = pair.split('=');
        let (key, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => (key, value),
            _ => return Err(IngestFormatError::MalformedPair(pair.to_string())),
        };

        let key = decode_component(key)
            .ok_or_else(|| IngestFormatError::InvalidEncoding(pair.to_string()))?;
        let value = decode_component(value)
            .ok_or_else(|| IngestFormatError::InvalidEncoding(pair.to_string()))?;
        record.insert(key, value);
    }
    Ok(record)
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(s: &str) -> Result<FormRecord, IngestFormatError> {
        decode_form(s.as_bytes())
    }

    #[test]
    fn decodes_simple_pairs() {
        let record = decode("name=Alice&msg=Hi").unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record["name"], "Alice");
        assert_eq!(record["msg"], "Hi");
    }

    #[test]
    fn plus_and_percent_escapes() {
        let record = decode("msg=Hello+there%21&city=S%C3%A3o+Paulo").unwrap();
        assert_eq!(record["msg"], "Hello there!");
        assert_eq!(record["city"], "São Paulo");
    }

    #[test]
    fn encoded_separators_stay_in_values() {
        let record = decode("q=a%3Db%26c").unwrap();
        assert_eq!(record["q"], "a=b&c");
    }

    #[test]
    fn empty_value_is_allowed() {
        assert_eq!(decode("name=").unwrap()["name"], "");
    }

    #[test]
    fn last_duplicate_wins() {
        assert_eq!(decode("a=1&a=2").unwrap()["a"], "2");
    }

    #[test]
    fn pair_without_equals_is_rejected() {
        assert_eq!(
            decode("name=Alice&oops"),
            Err(IngestFormatError::MalformedPair("oops".into()))
        );
    }

    #[test]
    fn pair_with_two_equals_is_rejected() {
        assert_eq!(
            decode("a=b=c"),
            Err(IngestFormatError::MalformedPair("a=b=c".into()))
        );
    }

    #[test]
    fn trailing_ampersand_is_rejected() {
        assert!(matches!(
            decode("a=1&"),
            Err(IngestFormatError::MalformedPair(p)) if p.is_empty()
        ));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert_eq!(decode_form(&[0x61, 0x3d, 0xff]), Err(IngestFormatError::InvalidUtf8));
        assert!(matches!(
            decode("a=%FF"),
            Err(IngestFormatError::InvalidEncoding(_))
        ));
    }
}
