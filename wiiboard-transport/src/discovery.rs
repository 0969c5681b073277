//! Balance board discovery through BlueZ
//!
//! Classic inquiry is driven through the BlueZ daemon on the system bus:
//! start discovery on the adapter, let it run for the configured duration,
//! then walk the object manager for `org.bluez.Device1` entries.
//!
//! The board only answers inquiry while its red sync button is pressed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use crate::address::BdAddr;
use crate::error::TransportError;
use crate::protocol::DEVICE_NAME;

const BLUEZ_SERVICE: &str = "org.bluez";
const ADAPTER_INTERFACE: &str = "org.bluez.Adapter1";
const DEVICE_INTERFACE: &str = "org.bluez.Device1";

type ManagedObjects = HashMap<OwnedObjectPath, HashMap<String, HashMap<String, OwnedValue>>>;

/// Device discovery abstraction
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    /// Scan for nearby devices and return everything that was seen
    async fn scan(&self) -> Result<Vec<DiscoveredDevice>, TransportError>;
}

/// A device seen during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub address: BdAddr,
    /// Device name (if resolved)
    pub name: Option<String>,
    /// Signal strength (RSSI)
    pub rssi: Option<i16>,
}

/// Discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// How long to scan, in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
    /// Name to match against
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// BlueZ adapter, e.g. `hci0`
    #[serde(default = "default_adapter")]
    pub adapter: String,
}

fn default_duration_secs() -> u64 {
    10
}

fn default_device_name() -> String {
    DEVICE_NAME.to_string()
}

fn default_adapter() -> String {
    "hci0".to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            device_name: default_device_name(),
            adapter: default_adapter(),
        }
    }
}

impl DiscoveryConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Return the address of the first device whose name matches exactly
pub fn first_matching(devices: &[DiscoveredDevice], name: &str) -> Option<BdAddr> {
    devices
        .iter()
        .find(|d| d.name.as_deref() == Some(name))
        .map(|d| d.address)
}

/// BlueZ D-Bus discovery
pub struct BluezDiscovery {
    config: DiscoveryConfig,
}

impl BluezDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Scan and return the first device advertising the balance board name
    pub async fn find_board(&self) -> Result<Option<BdAddr>, TransportError> {
        info!("Press the red sync button on the board now");
        let devices = self.scan().await?;
        let found = first_matching(&devices, &self.config.device_name);
        match found {
            Some(address) => info!("Found balance board at {}", address),
            None => info!("No balance board discovered"),
        }
        Ok(found)
    }
}

fn string_prop(props: &HashMap<String, OwnedValue>, key: &str) -> Option<String> {
    match props.get(key).map(|v| &**v) {
        Some(Value::Str(s)) => Some(s.to_string()),
        _ => None,
    }
}

fn i16_prop(props: &HashMap<String, OwnedValue>, key: &str) -> Option<i16> {
    match props.get(key).map(|v| &**v) {
        Some(Value::I16(v)) => Some(*v),
        _ => None,
    }
}

#[async_trait]
impl DeviceDiscovery for BluezDiscovery {
    async fn scan(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let conn = zbus::Connection::system().await?;
        let adapter_path = format!("/org/bluez/{}", self.config.adapter);
        let adapter = zbus::Proxy::new_owned(
            conn.clone(),
            BLUEZ_SERVICE,
            adapter_path,
            ADAPTER_INTERFACE,
        )
        .await?;

        debug!(
            "Starting discovery on {} for {}s",
            self.config.adapter, self.config.duration_secs
        );
        adapter.call_method("StartDiscovery", &()).await?;
        tokio::time::sleep(self.config.duration()).await;
        if let Err(e) = adapter.call_method("StopDiscovery", &()).await {
            // Another client may already have stopped it
            warn!("StopDiscovery failed: {}", e);
        }

        let manager = zbus::Proxy::new_owned(
            conn,
            BLUEZ_SERVICE,
            "/",
            "org.freedesktop.DBus.ObjectManager",
        )
        .await?;
        let reply = manager.call_method("GetManagedObjects", &()).await?;
        let objects: ManagedObjects = reply.body().deserialize()?;

        let mut devices = Vec::new();
        for (path, interfaces) in objects {
            let Some(props) = interfaces.get(DEVICE_INTERFACE) else {
                continue;
            };
            let Some(address) = string_prop(props, "Address").and_then(|a| a.parse().ok())
            else {
                debug!("Skipping {} without a usable address", path.as_str());
                continue;
            };
            let device = DiscoveredDevice {
                address,
                name: string_prop(props, "Name"),
                rssi: i16_prop(props, "RSSI"),
            };
            debug!("Seen {:?}", device);
            devices.push(device);
        }
        Ok(devices)
    }
}
