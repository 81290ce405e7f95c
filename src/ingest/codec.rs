use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::Sample;

/// Why a payload did not become a [`Sample`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("expected 2 comma-separated fields, found {0}")]
    WrongFieldCount(usize),
    #[error("'{0}' is not a base-10 integer")]
    InvalidInteger(String),
}

/// Decodes `"<int>,<int>"`, stamping the sample with the current time.
pub fn decode(payload: &[u8]) -> Result<Sample, DecodeError> {
    decode_at(payload, Utc::now())
}

/// Same as [`decode`] with an explicit receipt time.
pub fn decode_at(payload: &[u8], captured_at: DateTime<Utc>) -> Result<Sample, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::NotUtf8)?;

    let fields: Vec<&str> = text.split(',').collect();
    let [x, y] = fields.as_slice() else {
        return Err(DecodeError::WrongFieldCount(fields.len()));
    };

    Ok(Sample::new(parse_coord(x)?, parse_coord(y)?, captured_at))
}

// `i64::from_str` accepts an optional sign and nothing else, so surrounding
// whitespace and empty tokens are rejected here.
fn parse_coord(token: &str) -> Result<i64, DecodeError> {
    token
        .parse::<i64>()
        .map_err(|_| DecodeError::InvalidInteger(token.to_string()))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Optional sign, at least one ASCII digit, value within `i64`.
    fn is_decimal_i64(token: &str) -> bool {
        let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
        !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && token
                .parse::<i128>()
                .is_ok_and(|value| i64::try_from(value).is_ok())
    }

    fn is_canonical(payload: &str) -> bool {
        payload
            .split_once(',')
            .is_some_and(|(x, y)| is_decimal_i64(x) && is_decimal_i64(y))
    }

    #[test]
    fn decodes_two_integers() {
        let now = Utc::now();
        let sample = decode_at(b"10,20", now).unwrap();
        assert_eq!(sample, Sample::new(10, 20, now));
    }

    #[test]
    fn accepts_signs_and_large_values() {
        let sample = decode(b"-4000,+9223372036854775807").unwrap();
        assert_eq!(sample.position(), (-4000, i64::MAX));
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(decode(b""), Err(DecodeError::Empty));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(decode(b"bad"), Err(DecodeError::WrongFieldCount(1)));
        assert_eq!(decode(b"1,2,3"), Err(DecodeError::WrongFieldCount(3)));
        assert_eq!(decode(b"1,2,"), Err(DecodeError::WrongFieldCount(3)));
    }

    #[test]
    fn rejects_non_integers() {
        assert_eq!(decode(b"1.5,2"), Err(DecodeError::InvalidInteger("1.5".into())));
        assert_eq!(decode(b"x,2"), Err(DecodeError::InvalidInteger("x".into())));
        assert_eq!(decode(b"1,"), Err(DecodeError::InvalidInteger("".into())));
        assert_eq!(decode(b"0x10,2"), Err(DecodeError::InvalidInteger("0x10".into())));
    }

    #[test]
    fn rejects_whitespace_variants() {
        for payload in [" 10,20", "10, 20", "10 ,20", "10,20\n", "10,20 ", "\t10,20"] {
            assert!(
                matches!(decode(payload.as_bytes()), Err(DecodeError::InvalidInteger(_))),
                "{payload:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(matches!(
            decode(b"9223372036854775808,0"),
            Err(DecodeError::InvalidInteger(_))
        ));
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert_eq!(decode(&[0xff, b',', b'1']), Err(DecodeError::NotUtf8));
    }

    proptest! {
        #[test]
        fn any_integer_pair_decodes_exactly(x in any::<i64>(), y in any::<i64>()) {
            let sample = decode(format!("{x},{y}").as_bytes()).unwrap();
            prop_assert_eq!(sample.position(), (x, y));
        }

        #[test]
        fn accepts_only_two_comma_joined_integers(payload in "[-+0-9, a.]{0,12}") {
            prop_assert_eq!(decode(payload.as_bytes()).is_ok(), is_canonical(&payload));
        }

        #[test]
        fn arbitrary_text_decodes_only_when_canonical(payload in "\\PC{0,16}") {
            prop_assert_eq!(decode(payload.as_bytes()).is_ok(), is_canonical(&payload));
        }

        #[test]
        fn inserted_whitespace_is_rejected(
            x in any::<i64>(),
            y in any::<i64>(),
            space in "[ \t\r\n]",
            at in any::<prop::sample::Index>(),
        ) {
            let mut payload = format!("{x},{y}");
            let position = at.index(payload.len() + 1);
            payload.insert_str(position, &space);
            prop_assert!(decode(payload.as_bytes()).is_err());
        }
    }
}
