use keepup_core::SettingsHandle;

use crate::Connectivity;

/// Connectivity as declared in the `[network]` settings.
#[derive(Debug, Clone)]
pub struct ConfiguredConnectivity {
    settings: SettingsHandle,
}

impl ConfiguredConnectivity {
    pub fn new(settings: SettingsHandle) -> Self {
        Self { settings }
    }
}

impl Connectivity for ConfiguredConnectivity {
    fn is_connected(&self) -> bool {
        self.settings.get().network.connected
    }

    fn is_wifi_connected(&self) -> bool {
        let network = self.settings.get().network;
        network.connected && network.wifi_connected
    }
}
