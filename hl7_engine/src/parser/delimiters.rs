//! Delimiter discovery from the message header

use crate::config::constants::protocol::{HEADER_SEGMENT_ID, MIN_HEADER_LENGTH, SEGMENT_SEPARATOR};
use crate::diagnostics::ParsingError;
use crate::logging::codes;
use serde::{Deserialize, Serialize};

/// The five separator characters declared by `MSH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Read the separators following `MSH` at the start of `message`. Only
    /// the header segment is inspected; a line break never counts as a
    /// separator.
    pub fn from_header(message: &str) -> Result<Self, ParsingError> {
        let header = message
            .split([SEGMENT_SEPARATOR, '\n'])
            .next()
            .unwrap_or_default();
        if header.chars().count() < MIN_HEADER_LENGTH {
            return Err(ParsingError::new(
                codes::parsing::MESSAGE_TOO_SHORT,
                "Message is too short.",
            ));
        }

        let Some(rest) = header.strip_prefix(HEADER_SEGMENT_ID) else {
            return Err(ParsingError::new(
                codes::parsing::MISSING_HEADER,
                format!(
                    "Message must begin with {}. Is this an HL7 message?",
                    HEADER_SEGMENT_ID
                ),
            ));
        };

        let mut chars = rest.chars();
        match (
            chars.next(),
            chars.next(),
            chars.next(),
            chars.next(),
            chars.next(),
        ) {
            (Some(field), Some(component), Some(repetition), Some(escape), Some(subcomponent)) => {
                Ok(Self {
                    field,
                    component,
                    repetition,
                    escape,
                    subcomponent,
                })
            }
            _ => Err(ParsingError::new(
                codes::parsing::MESSAGE_TOO_SHORT,
                "Message is too short.",
            )),
        }
    }

    /// Separator splitting a composite parsed at `level`; `None` once the
    /// delimiter set is exhausted
    pub fn for_level(&self, level: u8) -> Option<char> {
        match level {
            1 => Some(self.component),
            2 => Some(self.subcomponent),
            _ => None,
        }
    }
}

/// Split `text` on `separator`, keeping each part's byte offset
pub(crate) fn split_with_offsets(text: &str, separator: char) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == separator {
            parts.push((start, &text[start..i]));
            start = i + c.len_utf8();
        }
    }
    parts.push((start, &text[start..]));
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_standard_delimiters() {
        let delimiters = Delimiters::from_header("MSH|^~\\&|A|B").unwrap();
        assert_eq!(delimiters, Delimiters::default());
        assert_eq!(delimiters.for_level(1), Some('^'));
        assert_eq!(delimiters.for_level(2), Some('&'));
        assert_eq!(delimiters.for_level(3), None);
    }

    #[test]
    fn test_nonstandard_delimiters() {
        let delimiters = Delimiters::from_header("MSH#*!/$#A").unwrap();
        assert_eq!(delimiters.field, '#');
        assert_eq!(delimiters.component, '*');
        assert_eq!(delimiters.repetition, '!');
        assert_eq!(delimiters.escape, '/');
        assert_eq!(delimiters.subcomponent, '$');
    }

    #[test]
    fn test_missing_prefix() {
        let error = Delimiters::from_header("EVN|A01|20240101").unwrap_err();
        assert_eq!(error.code, codes::parsing::MISSING_HEADER);
        assert!(error.message.contains("must begin with MSH"));
    }

    #[test]
    fn test_too_short() {
        assert_matches!(
            Delimiters::from_header("MSH|^~"),
            Err(ParsingError { code, .. }) if code == codes::parsing::MESSAGE_TOO_SHORT
        );
    }

    #[test]
    fn test_short_header_in_longer_message() {
        // Seven characters before the segment separator: the separator must
        // not be taken as the subcomponent delimiter
        assert_matches!(
            Delimiters::from_header("MSH|^~\\\rEVN|A01|20240101|20240102"),
            Err(ParsingError { code, .. }) if code == codes::parsing::MESSAGE_TOO_SHORT
        );
        assert_matches!(
            Delimiters::from_header("MSH|^~\\\nEVN|A01|20240101|20240102"),
            Err(ParsingError { code, .. }) if code == codes::parsing::MESSAGE_TOO_SHORT
        );
        assert!(Delimiters::from_header("MSH|^~\\&\rEVN|A01").is_ok());
    }

    #[test]
    fn test_split_with_offsets() {
        assert_eq!(
            split_with_offsets("EVN|A01||x", '|'),
            vec![(0, "EVN"), (4, "A01"), (8, ""), (9, "x")]
        );
        assert_eq!(split_with_offsets("", '|'), vec![(0, "")]);
    }
}
