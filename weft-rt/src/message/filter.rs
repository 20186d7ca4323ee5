// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::types::{MsgClass, Tag};
use crate::util::ActorId;

/// One selective-receive filter: `(sender, class, tag)`.
///
/// Each component may independently be its wildcard (`ActorId::ANY`,
/// `MsgClass::Any`, `Tag::WILDCARD`); a filter matches an entry iff every
/// non-wildcard component equals the entry's decoded value.
///
/// # Example
/// ```rust
/// use weft_rt::message::{MsgClass, RecvFilter, Tag};
/// use weft_rt::util::ActorId;
///
/// let from_7 = RecvFilter::from_sender(ActorId::from_raw(7));
/// assert!(from_7.matches(ActorId::from_raw(7), MsgClass::Notify, Tag::ZERO));
/// assert!(!from_7.matches(ActorId::from_raw(8), MsgClass::Notify, Tag::ZERO));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvFilter {
    pub sender: ActorId,
    pub class: MsgClass,
    pub tag: Tag,
}

impl RecvFilter {
    /// Matches every well-formed entry.
    pub const ANY: RecvFilter = RecvFilter {
        sender: ActorId::ANY,
        class: MsgClass::Any,
        tag: Tag::WILDCARD,
    };

    pub const fn new(sender: ActorId, class: MsgClass, tag: Tag) -> Self {
        Self { sender, class, tag }
    }

    /// Any class, any tag, from one sender.
    pub const fn from_sender(sender: ActorId) -> Self {
        Self::new(sender, MsgClass::Any, Tag::WILDCARD)
    }

    /// One class from anyone, any tag.
    pub const fn of_class(class: MsgClass) -> Self {
        Self::new(ActorId::ANY, class, Tag::WILDCARD)
    }

    /// Component-wise wildcard-or-equal test.
    pub fn matches(&self, sender: ActorId, class: MsgClass, tag: Tag) -> bool {
        (self.sender == ActorId::ANY || self.sender == sender)
            && (self.class.is_wildcard() || self.class == class)
            && (self.tag.is_wildcard() || self.tag == tag)
    }
}

impl Default for RecvFilter {
    fn default() -> Self {
        Self::ANY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_matches_everything() {
        let f = RecvFilter::ANY;
        assert!(f.matches(ActorId::from_raw(1), MsgClass::Exit, Tag::new(0x0700_0000)));
        assert!(f.matches(ActorId::INVALID, MsgClass::Notify, Tag::ZERO));
    }

    #[test]
    fn test_each_component_filters() {
        let a = ActorId::from_raw(3);
        let f = RecvFilter::new(a, MsgClass::Reply, Tag::new(5));
        assert!(f.matches(a, MsgClass::Reply, Tag::new(5)));
        assert!(!f.matches(ActorId::from_raw(4), MsgClass::Reply, Tag::new(5)));
        assert!(!f.matches(a, MsgClass::Notify, Tag::new(5)));
        assert!(!f.matches(a, MsgClass::Reply, Tag::new(6)));
    }

    #[test]
    fn test_partial_wildcards() {
        let f = RecvFilter::of_class(MsgClass::Timer);
        assert!(f.matches(ActorId::from_raw(9), MsgClass::Timer, Tag::new(0x0800_0001)));
        assert!(!f.matches(ActorId::from_raw(9), MsgClass::Notify, Tag::new(1)));
    }
}
