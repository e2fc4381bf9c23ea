//! Parsing of device discovery and metadata tool output.

use serde::{Deserialize, Serialize};

/// `ProductName` reported by phones; anything else is a tablet
pub const PHONE_PRODUCT_NAME: &str = "iPhone OS";

/// Identifiers from `idevice_id -l`, one per line.
///
/// Output mentioning `ERROR` means no usable devices.
pub fn parse_device_ids(output: &str) -> Vec<String> {
    if output.contains("ERROR") {
        return Vec::new();
    }
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// An app on the device home screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeScreenApp {
    pub bundle_id: String,
    pub name: String,
}

/// Lines of `bundle_id[,name]`. Without exactly one name column the bundle
/// id doubles as the name.
pub fn parse_home_screen_apps(output: &str) -> Vec<HomeScreenApp> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let columns: Vec<&str> = line.split(',').filter(|c| !c.is_empty()).collect();
            let bundle_id = columns.first()?.to_string();
            let name = if columns.len() == 2 {
                columns[1].to_string()
            } else {
                bundle_id.clone()
            };
            Some(HomeScreenApp { bundle_id, name })
        })
        .collect()
}

/// Home screen page count; anything unparsable counts as a single page
pub fn parse_page_count(output: &str) -> u32 {
    output.trim().parse().unwrap_or(1)
}
