//! Conversation addressing.
//!
//! A private conversation is addressed by the unordered pair of its two
//! participants. The pair is normalised to `(low, high)` once, here, and that
//! normalised form is used both as the bus subject and as the uniqueness key
//! of the stored conversation row.
//!
//! ```text
//! chat.private.<low>.<high>
//! ```

use std::fmt;

use super::UserId;

/// Subject prefix shared by every private conversation.
pub const PRIVATE_CHAT_PREFIX: &str = "chat.private";

/// Single-token wildcard understood by the broker.
pub const WILDCARD: &str = "*";

/// Order-independent key of a two-party conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    low: UserId,
    high: UserId,
}

impl ConversationKey {
    /// Build the key for `a` and `b` in either order.
    pub fn new(a: UserId, b: UserId) -> Self {
        if a > b {
            Self { low: b, high: a }
        } else {
            Self { low: a, high: b }
        }
    }

    /// The smaller identity.
    pub fn low(&self) -> UserId {
        self.low
    }

    /// The larger identity.
    pub fn high(&self) -> UserId {
        self.high
    }

    /// Whether `user` is one of the two participants.
    pub fn involves(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    /// Bus subject for this conversation.
    pub fn subject(&self) -> String {
        format!("{}.{}.{}", PRIVATE_CHAT_PREFIX, self.low, self.high)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Canonical subject for the pair `(a, b)`; identical for `(b, a)`.
pub fn canonical_subject(a: UserId, b: UserId) -> String {
    ConversationKey::new(a, b).subject()
}

/// The two subscription patterns that together cover every conversation of
/// `user`: one where the user is the larger identity, one where it is the
/// smaller.
pub fn subscription_patterns(user: UserId) -> [String; 2] {
    [
        format!("{}.{}.{}", PRIVATE_CHAT_PREFIX, WILDCARD, user),
        format!("{}.{}.{}", PRIVATE_CHAT_PREFIX, user, WILDCARD),
    ]
}

/// Parse a concrete private-chat subject back into its key.
///
/// Returns `None` for anything that is not exactly
/// `chat.private.<int>.<int>` in canonical order.
pub fn parse_subject(subject: &str) -> Option<ConversationKey> {
    let rest = subject.strip_prefix(PRIVATE_CHAT_PREFIX)?.strip_prefix('.')?;
    let mut parts = rest.split('.');
    let low: UserId = parts.next()?.parse().ok()?;
    let high: UserId = parts.next()?.parse().ok()?;
    if parts.next().is_some() || low > high {
        return None;
    }
    Some(ConversationKey { low, high })
}
