use super::Item;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WakelockKind {
    Kernel,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakelockEntry {
    pub name: String,
    pub kind: WakelockKind,
    /// Owning uid, only reported for partial wake locks
    pub uid: Option<String>,
    pub held_ms: i64,
    pub count: i64,
}

/// Estimated power drawn by one component or uid, in mAh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerUseEntry {
    pub name: String,
    pub mah: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct BatteryStatsItem {
    pub time_on_battery_ms: Option<i64>,
    pub screen_on_ms: Option<i64>,
    pub capacity_mah: Option<i64>,
    pub computed_drain_mah: Option<f64>,
    pub wakelocks: Vec<WakelockEntry>,
    pub power_use: Vec<PowerUseEntry>,
}

impl BatteryStatsItem {
    pub fn kernel_wakelocks(&self) -> impl Iterator<Item = &WakelockEntry> {
        self.wakelocks.iter().filter(|w| w.kind == WakelockKind::Kernel)
    }

    pub fn partial_wakelocks(&self) -> impl Iterator<Item = &WakelockEntry> {
        self.wakelocks.iter().filter(|w| w.kind == WakelockKind::Partial)
    }
}

impl Item for BatteryStatsItem {
    fn kind(&self) -> &'static str {
        "BATTERY_STATS"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct WifiStatsItem {
    pub scans: i64,
    pub disconnects: i64,
    pub associations: i64,
}

impl Item for WifiStatsItem {
    fn kind(&self) -> &'static str {
        "WIFI_STATS"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageEntry {
    pub name: String,
    pub version_code: Option<i64>,
    pub version_name: Option<String>,
    pub first_install_time: Option<String>,
    pub last_update_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PackageStatsItem {
    pub packages: Vec<PackageEntry>,
}

impl PackageStatsItem {
    pub fn get(&self, name: &str) -> Option<&PackageEntry> {
        self.packages.iter().find(|p| p.name == name)
    }
}

impl Item for PackageStatsItem {
    fn kind(&self) -> &'static str {
        "PACKAGE_STATS"
    }
}

/// Services recognized inside the `DUMPSYS` section
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DumpsysItem {
    pub battery_stats: Option<BatteryStatsItem>,
    pub wifi_stats: Option<WifiStatsItem>,
    pub package_stats: Option<PackageStatsItem>,
}

impl Item for DumpsysItem {
    fn kind(&self) -> &'static str {
        "DUMPSYS"
    }
}
