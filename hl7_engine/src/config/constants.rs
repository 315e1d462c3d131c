//! Fixed HL7 v2 protocol values
//!
//! Unlike `compile_time`, nothing here varies between build profiles: these
//! are properties of the wire format itself.

pub mod protocol {
    /// Segment id every message must begin with
    pub const HEADER_SEGMENT_ID: &str = "MSH";

    /// `MSH` plus the field separator and four encoding characters
    pub const MIN_HEADER_LENGTH: usize = 8;

    /// Length of a segment type code
    pub const SEGMENT_ID_LENGTH: usize = 3;

    /// Shortest raw segment that can carry a type code and a separator
    pub const MIN_SEGMENT_LENGTH: usize = 4;

    /// Segment separator
    pub const SEGMENT_SEPARATOR: char = '\r';

    /// HL7 explicit null literal, distinct from an absent value
    pub const NULL_VALUE: &str = "\"\"";

    /// Ordinal of the message type field on the header segment
    pub const MESSAGE_TYPE_FIELD: usize = 9;

    /// Header fields that are taken verbatim (field separator, encoding characters)
    pub const VERBATIM_HEADER_FIELDS: usize = 2;

    /// Deepest constituent level the delimiter set can express
    /// (field, component, subcomponent)
    pub const MAX_CONSTITUENT_LEVEL: u8 = 3;
}

pub mod grammar {
    /// Depth letter of top-level constituents
    pub const FIRST_DEPTH_LETTER: char = 'A';

    /// Nesting beyond this depth collapses onto `'Z'`
    pub const MAX_DEPTH_LETTER_OFFSET: usize = 25;

    /// Repeatability value meaning "unbounded" in definition bodies
    pub const UNBOUNDED_REPEATABILITY: i64 = -1;

    /// Extension of grammar definition files
    pub const DEFINITION_EXTENSION: &str = "json";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_length_covers_encoding_characters() {
        // MSH + field separator + component, repetition, escape, subcomponent
        assert_eq!(protocol::MIN_HEADER_LENGTH, protocol::HEADER_SEGMENT_ID.len() + 5);
        assert_eq!(protocol::NULL_VALUE.len(), 2);
    }

    #[test]
    fn test_depth_letter_range_ends_at_z() {
        let last = (grammar::FIRST_DEPTH_LETTER as u8 + grammar::MAX_DEPTH_LETTER_OFFSET as u8) as char;
        assert_eq!(last, 'Z');
    }
}
