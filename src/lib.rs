/**
 * Renders raw byte buffers (captured packets, media frames) as comma separated
 * `0x` literals that can be logged or pasted back into source code for replay.
 */
pub mod hexfmt;

pub use hexfmt::{to_hex_string, try_to_hex_string, FormatError, HexLiteral, TOKEN_LENGTH};
