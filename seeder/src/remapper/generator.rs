//! Canonical id generation.

use uuid::Uuid;

/// Length of ids produced by [`CanonicalIdGenerator::Random`]. Matches the
/// record store's native id length.
pub const RANDOM_ID_LEN: usize = 15;

/// Strategy for allocating new canonical ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CanonicalIdGenerator {
    /// Lowercase hex taken from a v4 UUID, [`RANDOM_ID_LEN`] characters long.
    #[default]
    Random,

    /// `{prefix}{n:012}` with `n` counting up from 1.
    Sequential { prefix: String },
}

impl CanonicalIdGenerator {
    pub fn random() -> Self {
        Self::Random
    }

    pub fn sequential(prefix: impl Into<String>) -> Self {
        Self::Sequential {
            prefix: prefix.into(),
        }
    }

    /// Produce the candidate for the `counter`-th allocation (1-based).
    pub(crate) fn generate(&self, counter: u64) -> String {
        match self {
            Self::Random => {
                let mut id = Uuid::new_v4().simple().to_string();
                id.truncate(RANDOM_ID_LEN);
                id
            }
            Self::Sequential { prefix } => format!("{}{:012}", prefix, counter),
        }
    }
}
