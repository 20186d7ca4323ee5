// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::actor::ExitReason;
use crate::util::ActorId;

/// Hard cap on one mailbox entry: header plus payload.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Bytes occupied by the packed `class << 28 | tag` header.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a single message can carry.
pub const MAX_PAYLOAD_SIZE: usize = MAX_MESSAGE_SIZE - HEADER_SIZE;

/// 4-bit message class tag carried in the header's top nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MsgClass {
    /// Fire-and-forget notification.
    Notify = 0,
    /// Synchronous call; expects a `Reply` with the same tag.
    Request = 1,
    /// Answer to a `Request`.
    Reply = 2,
    /// Timer firing; tag is the timer id.
    Timer = 3,
    /// Death notification from a link or monitor.
    Exit = 4,
    /// Wildcard in receive filters; never appears on the wire.
    Any = 15,
}

impl MsgClass {
    /// Decode the header nibble. Unknown values yield `None`.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Notify),
            1 => Some(Self::Request),
            2 => Some(Self::Reply),
            3 => Some(Self::Timer),
            4 => Some(Self::Exit),
            15 => Some(Self::Any),
            _ => None,
        }
    }

    pub const fn bits(&self) -> u8 {
        *self as u8
    }

    pub const fn is_wildcard(&self) -> bool {
        matches!(self, Self::Any)
    }
}

/// 28-bit message tag.
///
/// Bit 27 distinguishes runtime-generated tags (timer ids, request call
/// tags, monitor refs) from user tags; `0x0FFF_FFFF` is the filter wildcard.
///
/// # Example
/// ```rust
/// use weft_rt::message::Tag;
///
/// let t = Tag::new(42);
/// assert_eq!(t.raw(), 42);
/// assert!(!t.is_runtime());
/// assert!(Tag::new(Tag::RUNTIME_BIT | 1).is_runtime());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(u32);

impl Tag {
    /// Mask of the 28 significant bits.
    pub const MASK: u32 = 0x0FFF_FFFF;

    /// Wildcard tag for receive filters.
    pub const WILDCARD: Tag = Tag(Self::MASK);

    /// Bit marking tags generated by the runtime rather than user code.
    pub const RUNTIME_BIT: u32 = 1 << 27;

    /// Tag carried by link-generated EXIT messages.
    pub const LINK_EXIT: Tag = Tag(Self::RUNTIME_BIT);

    /// Default tag for plain notifications.
    pub const ZERO: Tag = Tag(0);

    /// Build a tag, truncating to 28 bits.
    pub const fn new(raw: u32) -> Self {
        Self(raw & Self::MASK)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn is_wildcard(&self) -> bool {
        self.0 == Self::MASK
    }

    pub const fn is_runtime(&self) -> bool {
        self.0 & Self::RUNTIME_BIT != 0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            f.write_str("tag(*)")
        } else {
            write!(f, "tag({:#x})", self.0)
        }
    }
}

/// Pack a header word from class and tag.
pub(crate) const fn encode_header(class: MsgClass, tag: Tag) -> u32 {
    ((class.bits() as u32) << 28) | tag.raw()
}

/// Split a header word into class (if known) and tag.
pub(crate) const fn decode_header(word: u32) -> (Option<MsgClass>, Tag) {
    (MsgClass::from_bits((word >> 28) as u8), Tag::new(word))
}

/// Fixed-size payload record backing mailbox entries and bus entries.
///
/// Lives in a [`Pool`](crate::alloc::Pool); the first [`HEADER_SIZE`] bytes
/// of a mailbox buffer hold the packed header, bus buffers are payload only.
pub(crate) struct PayloadBuf(pub [u8; MAX_MESSAGE_SIZE]);

impl PayloadBuf {
    pub(crate) const fn zeroed() -> Self {
        Self([0; MAX_MESSAGE_SIZE])
    }

    /// Read the packed header from the first four bytes.
    pub(crate) fn header(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Write header then payload. Caller validates the length.
    pub(crate) fn fill(&mut self, class: MsgClass, tag: Tag, payload: &[u8]) {
        self.0[..HEADER_SIZE].copy_from_slice(&encode_header(class, tag).to_le_bytes());
        self.0[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
    }
}

/// Copyable descriptor of a received message, without the payload borrow.
///
/// Obtained from [`Message::info`]; needed to `reply` after the payload view
/// has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgInfo {
    pub sender: ActorId,
    pub class: MsgClass,
    pub tag: Tag,
}

/// Borrowed view of a received message.
///
/// The payload slice borrows runtime-owned storage: it stays valid until the
/// owning actor's next receive/select/bus read (which requires `&mut` access
/// to the actor context, so the borrow checker enforces the lifetime).
#[derive(Debug)]
pub struct Message<'a> {
    pub sender: ActorId,
    pub class: MsgClass,
    pub tag: Tag,
    pub data: &'a [u8],
}

impl<'a> Message<'a> {
    /// Payload length in bytes (header excluded).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copyable header info, for use after this view is dropped.
    pub fn info(&self) -> MsgInfo {
        MsgInfo {
            sender: self.sender,
            class: self.class,
            tag: self.tag,
        }
    }
}

/// Payload of an EXIT message: which actor died and why.
///
/// Encoded as eight little-endian bytes (actor id, then reason) so EXIT
/// payloads survive the byte-oriented mailbox unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub actor: ActorId,
    pub reason: ExitReason,
}

impl ExitInfo {
    pub(crate) const ENCODED_LEN: usize = 8;

    pub(crate) fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[..4].copy_from_slice(&self.actor.raw().to_le_bytes());
        out[4..].copy_from_slice(&(self.reason.bits()).to_le_bytes());
        out
    }

    /// Decode an EXIT payload. Fails on short buffers or unknown reasons.
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < Self::ENCODED_LEN {
            return None;
        }
        let actor = ActorId::from_raw(u32::from_le_bytes([data[0], data[1], data[2], data[3]]));
        let reason = ExitReason::from_bits(u32::from_le_bytes([data[4], data[5], data[6], data[7]]))?;
        Some(Self { actor, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let word = encode_header(MsgClass::Request, Tag::new(0x123));
        let (class, tag) = decode_header(word);
        assert_eq!(class, Some(MsgClass::Request));
        assert_eq!(tag, Tag::new(0x123));
    }

    #[test]
    fn test_tag_truncates_to_28_bits() {
        let t = Tag::new(0xFFFF_FFFF);
        assert_eq!(t.raw(), Tag::MASK);
        assert!(t.is_wildcard());
    }

    #[test]
    fn test_class_nibble_survives_max_tag() {
        let word = encode_header(MsgClass::Exit, Tag::new(Tag::MASK - 1));
        let (class, tag) = decode_header(word);
        assert_eq!(class, Some(MsgClass::Exit));
        assert_eq!(tag.raw(), Tag::MASK - 1);
    }

    #[test]
    fn test_unknown_class_bits() {
        assert_eq!(MsgClass::from_bits(7), None);
        assert_eq!(MsgClass::from_bits(15), Some(MsgClass::Any));
    }

    #[test]
    fn test_payload_buf_fill() {
        let mut buf = PayloadBuf::zeroed();
        buf.fill(MsgClass::Notify, Tag::new(9), b"ping");
        let (class, tag) = decode_header(buf.header());
        assert_eq!(class, Some(MsgClass::Notify));
        assert_eq!(tag.raw(), 9);
        assert_eq!(&buf.0[HEADER_SIZE..HEADER_SIZE + 4], b"ping");
    }

    #[test]
    fn test_exit_info_round_trip() {
        let info = ExitInfo {
            actor: ActorId::from_raw(17),
            reason: ExitReason::Killed,
        };
        let bytes = info.encode();
        assert_eq!(ExitInfo::decode(&bytes), Some(info));
        assert_eq!(ExitInfo::decode(&bytes[..7]), None);
    }
}
