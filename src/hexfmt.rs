/**
 * Hex literal formatting for byte buffers. Usually used in debug/trace logs.
 *
 * Every byte is rendered as a token `0x<hh>,` (two lowercase, zero padded hex digits),
 * tokens are concatenated in input order and the last one keeps its trailing comma.
 */
use std::fmt;

/// Every byte renders as exactly `0x`, two hex digits and a comma
pub const TOKEN_LENGTH: usize = 5;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/**
 * Errors returned by the formatter entry points that accept an absent buffer.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// No buffer was supplied
    InvalidArgument,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::InvalidArgument => f.write_str("invalid argument: no buffer supplied"),
        }
    }
}

impl std::error::Error for FormatError {}

/**
 * Encodes a byte slice into a string of `0x` literals, each followed by a comma.
 *
 * @param buffer The byte slice to encode.
 * @return A `String` of exactly `TOKEN_LENGTH * buffer.len()` characters, empty for an empty slice.
 *
 * ```
 * assert_eq!(hexlit::to_hex_string(&[0x00, 0x0a, 0xff]), "0x00,0x0a,0xff,");
 * ```
 */
pub fn to_hex_string(buffer: &[u8]) -> String {
    let mut result = String::with_capacity(buffer.len() * TOKEN_LENGTH);

    for &byte in buffer {
        result.push_str("0x");
        result.push(HEX_DIGITS[(byte >> 4) as usize] as char);
        result.push(HEX_DIGITS[(byte & 0xF) as usize] as char);
        result.push(',');
    }

    result
}

/**
 * Same as `to_hex_string`, for callers holding a buffer that may be absent.
 *
 * An absent buffer is rejected, it is never rendered as an empty string.
 *
 * @param buffer The byte slice to encode, if any.
 * @return The encoded string, or `FormatError::InvalidArgument` when `buffer` is `None`.
 */
pub fn try_to_hex_string(buffer: Option<&[u8]>) -> Result<String, FormatError> {
    buffer.map(to_hex_string).ok_or(FormatError::InvalidArgument)
}

/**
 * Borrowing `Display` adapter producing the same text as `to_hex_string`.
 *
 * Meant for log macros: the literal is only rendered if the record passes the level filter.
 */
#[derive(Debug, Clone, Copy)]
pub struct HexLiteral<'a>(pub &'a [u8]);

impl fmt::Display for HexLiteral<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "0x{:02x},", byte)?;
        }
        Ok(())
    }
}
