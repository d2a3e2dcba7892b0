//! Channel flags bitfield as delivered by the platform

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Per-channel flags
    ///
    /// Unknown bits are retained so a round trip never loses platform data.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelFlags: u64 {
        /// Thread is pinned to the top of its forum
        const PINNED       = 1 << 1;
        /// Forum requires a tag on every post
        const REQUIRE_TAG  = 1 << 4;

        const _ = !0;
    }
}

impl ChannelFlags {
    /// Check if the thread is pinned in its parent forum
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.contains(Self::PINNED)
    }
}

impl Default for ChannelFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for ChannelFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for ChannelFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Self::from_bits_retain(bits))
    }
}
