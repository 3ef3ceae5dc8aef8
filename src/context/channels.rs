// SPDX-License-Identifier: MPL-2.0

use crate::constants::MAX_CHANNELS;
use crate::errors::{BridgeError, BridgeResult};
use crate::native::SourceHandle;
use std::collections::BTreeMap;

/// Which source sits on which output channel
///
/// Mirrors the engine's channel table. Holds identities only; the engine keeps
/// its own reference to every assigned source.
#[derive(Debug, Default)]
pub(crate) struct ChannelRegistry {
    slots: BTreeMap<u32, SourceHandle>,
}

pub(crate) fn validate_channel(channel: u32) -> BridgeResult<()> {
    if channel >= MAX_CHANNELS {
        return Err(BridgeError::InvalidChannel {
            channel,
            max: MAX_CHANNELS,
        });
    }
    Ok(())
}

impl ChannelRegistry {
    /// Record `source` on `channel`, returning the displaced occupant
    pub fn assign(&mut self, channel: u32, source: SourceHandle) -> Option<SourceHandle> {
        self.slots.insert(channel, source).filter(|&old| old != source)
    }

    pub fn clear(&mut self, channel: u32) -> Option<SourceHandle> {
        self.slots.remove(&channel)
    }

    /// Clear `channel` only while it still holds `source`
    pub fn clear_if_holds(&mut self, channel: u32, source: SourceHandle) -> bool {
        if self.slots.get(&channel) == Some(&source) {
            self.slots.remove(&channel);
            return true;
        }
        false
    }

    pub fn get(&self, channel: u32) -> Option<SourceHandle> {
        self.slots.get(&channel).copied()
    }

    pub fn channels(&self) -> Vec<u32> {
        self.slots.keys().copied().collect()
    }

    pub fn drain(&mut self) -> Vec<(u32, SourceHandle)> {
        std::mem::take(&mut self.slots).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_reports_displaced_source() {
        let mut registry = ChannelRegistry::default();
        let a = SourceHandle::from_raw(1);
        let b = SourceHandle::from_raw(2);
        assert_eq!(registry.assign(0, a), None);
        assert_eq!(registry.assign(0, a), None);
        assert_eq!(registry.assign(0, b), Some(a));
        assert_eq!(registry.get(0), Some(b));
    }

    #[test]
    fn test_clear_if_holds_leaves_other_sources() {
        let mut registry = ChannelRegistry::default();
        let a = SourceHandle::from_raw(1);
        let b = SourceHandle::from_raw(2);
        registry.assign(3, b);
        assert!(!registry.clear_if_holds(3, a));
        assert_eq!(registry.get(3), Some(b));
        assert!(registry.clear_if_holds(3, b));
        assert!(registry.channels().is_empty());
    }

    #[test]
    fn test_validate_channel() {
        assert!(validate_channel(0).is_ok());
        assert!(validate_channel(MAX_CHANNELS - 1).is_ok());
        assert!(matches!(
            validate_channel(MAX_CHANNELS),
            Err(BridgeError::InvalidChannel { .. })
        ));
    }
}
