//! Device characteristics reported inside every signature.
//!
//! The signing pipeline only reads from a [`DeviceCharacteristics`] provider;
//! where the values come from is up to the embedder. [`DeviceProfile`] is a
//! static, config-driven provider.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Hardware and firmware identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    /// Unique device id.
    pub device_id: String,
    /// Board name.
    pub android_board_name: String,
    /// Bootloader version.
    pub android_bootloader: String,
    /// Brand.
    pub device_brand: String,
    /// Model.
    pub device_model: String,
    /// Boot model.
    pub device_model_boot: String,
    /// Model identifier.
    pub device_model_identifier: String,
    /// Firmware fingerprint.
    pub firmware_fingerprint: String,
    /// Firmware tags.
    pub firmware_tags: String,
    /// Manufacturer.
    pub hardware_manufacturer: String,
    /// Hardware model.
    pub hardware_model: String,
    /// Firmware brand.
    pub firmware_brand: String,
    /// Firmware type.
    pub firmware_type: String,
}

/// Raw sensor readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorReadings {
    /// Raw accelerometer.
    pub accel_raw: [f64; 3],
    /// Magnetometer.
    pub magnetometer: [f64; 3],
    /// Raw gyroscope.
    pub gyroscope_raw: [f64; 3],
    /// Normalized angle.
    pub angle_normalized: [f64; 3],
    /// Accelerometer axes reported.
    pub accelerometer_axes: u32,
    /// Time the readings were taken, in ms since start.
    pub time_snapshot: u64,
}

/// Client build data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionData {
    /// Seed for location and request hashes.
    pub hash_seed: u32,
    /// Build hash.
    pub version_hash: u64,
}

/// Motion classifier output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityStatus {
    /// Walking.
    pub walking: bool,
    /// In a vehicle.
    pub automotive: bool,
    /// Cycling.
    pub cycling: bool,
    /// Running.
    pub running: bool,
    /// Stationary.
    pub stationary: bool,
    /// Tilting.
    pub tilting: bool,
}

/// One visible GPS satellite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsSatellite {
    /// Azimuth in degrees.
    pub azimuth: f32,
    /// Elevation in degrees.
    pub elevation: f32,
    /// Almanac available.
    pub almanac: bool,
    /// Ephemeris available.
    pub ephemeris: bool,
    /// Pseudo-random noise number.
    pub prn: i32,
    /// Signal to noise ratio.
    pub snr: f32,
    /// Used in the current fix.
    pub used_in_fix: bool,
}

/// One historical location fix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationFix {
    /// Location provider name.
    pub provider: String,
    /// Time of the fix, in ms since start.
    pub timestamp_snapshot: u64,
    /// Latitude.
    pub latitude: f32,
    /// Longitude.
    pub longitude: f32,
    /// Altitude.
    pub altitude: f32,
    /// Horizontal accuracy.
    pub horizontal_accuracy: f32,
    /// Vertical accuracy.
    pub vertical_accuracy: f32,
    /// Speed.
    pub speed: f32,
    /// Course.
    pub course: f32,
    /// Floor.
    pub floor: u32,
    /// Location type.
    pub location_type: u64,
    /// Provider status.
    pub provider_status: u64,
}

/// Read-only supplier of device data for the signature.
pub trait DeviceCharacteristics: Send + Sync {
    /// Hardware and firmware identifiers.
    fn device_info(&self) -> DeviceInfo;
    /// Current sensor readings.
    fn sensors(&self) -> SensorReadings;
    /// Client build data.
    fn version_data(&self) -> VersionData;
    /// Motion classifier output, when the device reports one.
    fn activity_status(&self) -> Option<ActivityStatus>;
    /// Visible satellites.
    fn gps_satellites(&self) -> Vec<GpsSatellite>;
    /// Recent location fixes.
    fn location_fixes(&self) -> Vec<LocationFix>;
    /// Milliseconds since the client started.
    fn time_snapshot(&self) -> u64;
}

/// Static device description, loadable from configuration.
///
/// Sensor and fix timestamps are taken relative to when the profile was
/// constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Identifiers.
    pub info: DeviceInfo,
    /// Sensor readings.
    pub sensors: SensorReadings,
    /// Build data.
    pub version: VersionData,
    /// Optional activity status.
    pub activity: Option<ActivityStatus>,
    /// Satellites.
    pub satellites: Vec<GpsSatellite>,
    /// Location fixes.
    pub location_fixes: Vec<LocationFix>,
    #[serde(skip, default = "Instant::now")]
    started_at: Instant,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            info: DeviceInfo::default(),
            sensors: SensorReadings {
                accel_raw: [0.0, 0.0, 1.0],
                accelerometer_axes: 3,
                ..SensorReadings::default()
            },
            version: VersionData {
                hash_seed: 0x1B84_5238,
                version_hash: 0,
            },
            activity: None,
            satellites: Vec::new(),
            location_fixes: Vec::new(),
            started_at: Instant::now(),
        }
    }
}

impl DeviceProfile {
    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl DeviceCharacteristics for DeviceProfile {
    fn device_info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn sensors(&self) -> SensorReadings {
        SensorReadings {
            time_snapshot: self.elapsed_ms(),
            ..self.sensors.clone()
        }
    }

    fn version_data(&self) -> VersionData {
        self.version.clone()
    }

    fn activity_status(&self) -> Option<ActivityStatus> {
        self.activity.clone()
    }

    fn gps_satellites(&self) -> Vec<GpsSatellite> {
        self.satellites.clone()
    }

    fn location_fixes(&self) -> Vec<LocationFix> {
        let now = self.elapsed_ms();
        self.location_fixes
            .iter()
            .cloned()
            .map(|fix| LocationFix {
                timestamp_snapshot: now.saturating_sub(fix.timestamp_snapshot),
                ..fix
            })
            .collect()
    }

    fn time_snapshot(&self) -> u64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_parses_from_partial_json() {
        let profile: DeviceProfile =
            serde_json::from_str(r#"{"info":{"device_id":"abc"},"version":{"hash_seed":7}}"#)
                .unwrap();
        assert_eq!(profile.device_info().device_id, "abc");
        assert_eq!(profile.version_data().hash_seed, 7);
        assert!(profile.activity_status().is_none());
    }

    #[test]
    fn fix_timestamps_are_relative_to_now() {
        let profile = DeviceProfile {
            location_fixes: vec![LocationFix {
                timestamp_snapshot: 0,
                ..LocationFix::default()
            }],
            ..DeviceProfile::default()
        };
        let fixes = profile.location_fixes();
        assert_eq!(fixes.len(), 1);
        assert!(fixes[0].timestamp_snapshot <= profile.time_snapshot());
    }
}
