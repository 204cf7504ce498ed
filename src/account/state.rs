//! Connection snapshots and the reconciliation function.

use alloy::primitives::Address;
use serde::Serialize;

use crate::account::device::DeviceClass;

/// Which connection provider a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceClass {
    Primary,
    Secondary,
}

/// What one provider currently reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionSnapshot {
    pub is_connected: bool,
    pub address: Option<Address>,
}

impl ConnectionSnapshot {
    pub fn connected(address: Address) -> Self {
        Self {
            is_connected: true,
            address: Some(address),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// The single authoritative connection view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub is_connected: bool,
    pub address: Option<Address>,
    /// Provider whose view decided the address, or the connected flag when
    /// there is no address.
    pub source: SourceClass,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            is_connected: false,
            address: None,
            source: SourceClass::Primary,
        }
    }
}

impl ConnectionState {
    /// The address reads may be issued for: present only while connected.
    pub fn active_address(&self) -> Option<Address> {
        if self.is_connected {
            self.address
        } else {
            None
        }
    }
}

/// Merges two provider snapshots.
///
/// Mobile devices trust only the secondary provider's connected flag;
/// elsewhere either provider being connected is enough. The address comes
/// from the secondary provider on mobile when it has one, and otherwise
/// from the primary provider with the secondary as fallback. When the
/// primary provider is disconnected while the secondary is connected with
/// an address, the secondary address wins.
pub fn reconcile(
    device: DeviceClass,
    primary: &ConnectionSnapshot,
    secondary: &ConnectionSnapshot,
) -> ConnectionState {
    let is_connected = if device.is_mobile() {
        secondary.is_connected
    } else {
        secondary.is_connected || primary.is_connected
    };

    let secondary_decides = if device.is_mobile() {
        secondary.address.is_some() || primary.address.is_none()
    } else {
        let secondary_only = secondary.is_connected && !primary.is_connected;
        (secondary_only && secondary.address.is_some()) || primary.address.is_none()
    };

    let (address, source) = if secondary_decides {
        match secondary.address {
            Some(address) => (Some(address), SourceClass::Secondary),
            None if device.is_mobile() || secondary.is_connected => (None, SourceClass::Secondary),
            None => (None, SourceClass::Primary),
        }
    } else {
        (primary.address, SourceClass::Primary)
    };

    ConnectionState {
        is_connected,
        address,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn snap(is_connected: bool, address: Option<Address>) -> ConnectionSnapshot {
        ConnectionSnapshot {
            is_connected,
            address,
        }
    }

    #[test]
    fn test_mobile_ignores_primary_connected_flag() {
        let state = reconcile(
            DeviceClass::Mobile,
            &snap(true, Some(addr(1))),
            &snap(false, None),
        );
        assert!(!state.is_connected);
        assert_eq!(state.active_address(), None);
    }

    #[test]
    fn test_mobile_prefers_secondary_address() {
        let state = reconcile(
            DeviceClass::Mobile,
            &snap(true, Some(addr(1))),
            &snap(true, Some(addr(2))),
        );
        assert!(state.is_connected);
        assert_eq!(state.address, Some(addr(2)));
        assert_eq!(state.source, SourceClass::Secondary);
    }

    #[test]
    fn test_mobile_falls_back_to_primary_address() {
        let state = reconcile(
            DeviceClass::Mobile,
            &snap(true, Some(addr(1))),
            &snap(true, None),
        );
        assert!(state.is_connected);
        assert_eq!(state.address, Some(addr(1)));
        assert_eq!(state.source, SourceClass::Primary);
    }

    #[test]
    fn test_desktop_secondary_only() {
        let state = reconcile(
            DeviceClass::NonMobile,
            &snap(false, None),
            &snap(true, Some(addr(2))),
        );
        assert!(state.is_connected);
        assert_eq!(state.address, Some(addr(2)));
        assert_eq!(state.source, SourceClass::Secondary);
    }

    #[test]
    fn test_desktop_disconnected_primary_with_stale_address() {
        let state = reconcile(
            DeviceClass::NonMobile,
            &snap(false, Some(addr(1))),
            &snap(true, Some(addr(2))),
        );
        assert!(state.is_connected);
        assert_eq!(state.address, Some(addr(2)));
    }

    #[test]
    fn test_desktop_both_connected_prefers_primary() {
        let state = reconcile(
            DeviceClass::NonMobile,
            &snap(true, Some(addr(1))),
            &snap(true, Some(addr(2))),
        );
        assert!(state.is_connected);
        assert_eq!(state.address, Some(addr(1)));
        assert_eq!(state.source, SourceClass::Primary);
    }

    #[test]
    fn test_desktop_primary_only() {
        let state = reconcile(
            DeviceClass::NonMobile,
            &snap(true, Some(addr(1))),
            &snap(false, None),
        );
        assert!(state.is_connected);
        assert_eq!(state.active_address(), Some(addr(1)));
    }

    #[test]
    fn test_both_disconnected() {
        for device in [DeviceClass::Mobile, DeviceClass::NonMobile] {
            let state = reconcile(device, &snap(false, None), &snap(false, None));
            assert!(!state.is_connected);
            assert_eq!(state.address, None);
        }
    }

    #[test]
    fn test_disconnected_state_has_no_active_address() {
        let state = reconcile(
            DeviceClass::NonMobile,
            &snap(false, Some(addr(1))),
            &snap(false, None),
        );
        assert_eq!(state.address, Some(addr(1)));
        assert_eq!(state.active_address(), None);
    }
}
