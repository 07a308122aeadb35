//! Deterministic stand-ins for the device and the signature sealer.

use pogo_net::{
    ActivityStatus, DeviceCharacteristics, DeviceInfo, DeviceProfile, GpsSatellite, LocationFix,
    SensorReadings, SignatureEncryptor, VersionData,
};

/// Device whose clock is frozen at a fixed snapshot.
#[derive(Debug, Clone)]
pub struct FixtureDevice {
    /// Everything but the clock.
    pub profile: DeviceProfile,
    /// Value reported as the time snapshot.
    pub time_snapshot: u64,
}

impl Default for FixtureDevice {
    fn default() -> Self {
        let mut profile = DeviceProfile::default();
        profile.info.device_id = "fixture-device".into();
        profile.info.device_brand = "Fixture".into();
        profile.info.device_model = "F1".into();
        profile.sensors.magnetometer = [12.5, -3.25, 40.0];
        profile.sensors.gyroscope_raw = [0.01, 0.02, 0.03];
        profile.sensors.angle_normalized = [0.0, 0.0, 9.81];
        profile.version.version_hash = 0x0123_4567_89AB_CDEF;
        profile.satellites = vec![GpsSatellite {
            prn: 7,
            azimuth: 120.0,
            elevation: 45.0,
            snr: 30.0,
            almanac: true,
            ephemeris: true,
            used_in_fix: true,
        }];
        Self {
            profile,
            time_snapshot: 10_000,
        }
    }
}

impl DeviceCharacteristics for FixtureDevice {
    fn device_info(&self) -> DeviceInfo {
        self.profile.info.clone()
    }

    fn sensors(&self) -> SensorReadings {
        SensorReadings {
            time_snapshot: self.time_snapshot,
            ..self.profile.sensors.clone()
        }
    }

    fn version_data(&self) -> VersionData {
        self.profile.version.clone()
    }

    fn activity_status(&self) -> Option<ActivityStatus> {
        self.profile.activity.clone()
    }

    fn gps_satellites(&self) -> Vec<GpsSatellite> {
        self.profile.satellites.clone()
    }

    fn location_fixes(&self) -> Vec<LocationFix> {
        self.profile.location_fixes.clone()
    }

    fn time_snapshot(&self) -> u64 {
        self.time_snapshot
    }
}

/// Sealer that returns the signature bytes unchanged, so tests can decode
/// what was signed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySealer;

impl SignatureEncryptor for IdentitySealer {
    fn seal(&self, plaintext: &[u8], _timestamp: u32) -> Vec<u8> {
        plaintext.to_vec()
    }
}
