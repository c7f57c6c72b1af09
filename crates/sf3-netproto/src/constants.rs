/// Magic bytes at the beginning of every packet.
/// Used to quickly reject unrelated or corrupted data.
pub const MAGIC: [u8; 2] = *b"S3";

/// Wire-format protocol version.
/// Bump this only for breaking changes to the header layout or message formats.
pub const VERSION: u8 = 1;

/// Fixed header length in bytes (wire format).
pub const HEADER_LEN: usize = 16;

/// Maximum payload size allowed for UDP packets (in bytes).
/// Keep this below typical path MTU to reduce fragmentation risk.
pub const MAX_UDP_PAYLOAD: usize = 1200;

/// Maximum number of per-frame inputs carried by a single `InputWindow`.
pub const MAX_INPUT_WINDOW: usize = 64;

/// Number of player slots in a session.
pub const PLAYER_COUNT: usize = 2;
