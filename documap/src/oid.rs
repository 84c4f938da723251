use crate::errors::{DocumapError, DocumapResult, ErrorKind};
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU32, Ordering};

/// Length of the canonical hex representation of an [ObjectId].
pub const OBJECT_ID_HEX_LEN: usize = 24;

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| rand::thread_rng().gen());

static COUNTER: Lazy<AtomicU32> =
    Lazy::new(|| AtomicU32::new(rand::thread_rng().gen::<u32>() & 0x00FF_FFFF));

/// The native store identifier for documents.
///
/// Each persisted document is uniquely identified by an `ObjectId`, assigned
/// by the store on first insert and never supplied by the application. The ID
/// is 12 bytes: a 4-byte big-endian seconds timestamp, a 5-byte per-process
/// random component, and a 3-byte big-endian counter seeded randomly.
///
/// # Codec
///
/// The human-facing form is the 24-character hexadecimal string produced by
/// [Display] and parsed back by [ObjectId::parse_str]. Parsing rejects any
/// string that is not exactly 24 hex characters with
/// [ErrorKind::InvalidQuery], since a malformed identifier in a filter can
/// never match a stored document.
///
/// # Examples
///
/// ```rust,ignore
/// use documap::oid::ObjectId;
///
/// let id = ObjectId::new();
/// let hex = id.to_hex();
/// assert_eq!(ObjectId::parse_str(&hex)?, id);
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId {
    bytes: [u8; 12],
}

impl ObjectId {
    /// Generates a new unique `ObjectId` from the current time and the
    /// process-wide random component and counter.
    pub fn new() -> Self {
        let timestamp = Utc::now().timestamp() as u32;
        let counter = COUNTER.fetch_add(1, Ordering::SeqCst) & 0x00FF_FFFF;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        ObjectId { bytes }
    }

    /// Creates an `ObjectId` from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId { bytes }
    }

    /// Parses a human-facing hexadecimal string into an `ObjectId`.
    ///
    /// # Errors
    ///
    /// Fails with [ErrorKind::InvalidQuery] when the string is not exactly
    /// 24 hexadecimal characters.
    pub fn parse_str(raw: &str) -> DocumapResult<ObjectId> {
        if raw.len() != OBJECT_ID_HEX_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DocumapError::new(
                &format!("Invalid ObjectId '{}': expected 24 hex characters", raw),
                ErrorKind::InvalidQuery,
            ));
        }

        let mut bytes = [0u8; 12];
        for (i, chunk) in raw.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(chunk[0]);
            let lo = hex_digit(chunk[1]);
            bytes[i] = (hi << 4) | lo;
        }
        Ok(ObjectId { bytes })
    }

    /// Returns the 24-character lowercase hexadecimal form.
    pub fn to_hex(&self) -> String {
        let mut hex = String::with_capacity(OBJECT_ID_HEX_LEN);
        for byte in &self.bytes {
            hex.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
            hex.push(char::from_digit((byte & 0x0F) as u32, 16).unwrap_or('0'));
        }
        hex
    }

    /// Returns the raw identifier bytes.
    pub fn bytes(&self) -> &[u8; 12] {
        &self.bytes
    }

    /// Returns the embedded creation timestamp in whole seconds since the
    /// Unix epoch.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
    }
}

// caller guarantees an ascii hex digit
fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}
