//! The signature structure sealed into every envelope.

use crate::device::{
    ActivityStatus, DeviceCharacteristics, DeviceInfo, GpsSatellite, LocationFix, SensorReadings,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed accuracy value reported for the magnetic field sensor.
pub const MAGNETIC_FIELD_ACCURACY: i32 = 10;

/// Range of the backward jitter applied to the sensor timestamp.
pub const SENSOR_TIMESTAMP_JITTER: std::ops::Range<u64> = 150..260;

/// Device and session attestation attached to an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Location hash bound to the auth seed.
    pub location_hash1: u32,
    /// Position-only location hash.
    pub location_hash2: u32,
    /// Process-lifetime random bytes.
    pub session_hash: [u8; 32],
    /// Client build hash.
    pub version_hash: u64,
    /// Wall clock time of signing, unix ms.
    pub timestamp: u64,
    /// Milliseconds since the client started.
    pub timestamp_since_start: u64,
    /// Device identifiers.
    pub device_info: DeviceInfo,
    /// Motion classifier output.
    pub activity_status: Option<ActivityStatus>,
    /// One entry per visible satellite.
    pub gps_info: Vec<AndroidGpsInfo>,
    /// Recent location fixes.
    pub location_fix: Vec<LocationFix>,
    /// One hash per sub-request, in sub-request order.
    pub request_hash: Vec<u64>,
    /// Sensor snapshots.
    pub sensor_info: Vec<SensorInfo>,
}

/// Per-satellite GPS descriptor.
///
/// Each field is a list on the wire even though the client fills one entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndroidGpsInfo {
    /// Time to first fix; not reported.
    pub time_to_fix: u64,
    /// Satellite PRNs.
    pub satellites_prn: Vec<i32>,
    /// Azimuths.
    pub azimuth: Vec<f32>,
    /// Elevations.
    pub elevation: Vec<f32>,
    /// Signal to noise ratios.
    pub snr: Vec<f32>,
    /// Almanac flags.
    pub has_almanac: Vec<bool>,
    /// Ephemeris flags.
    pub has_ephemeris: Vec<bool>,
    /// Used-in-fix flags.
    pub used_in_fix: Vec<bool>,
}

impl From<&GpsSatellite> for AndroidGpsInfo {
    fn from(sat: &GpsSatellite) -> Self {
        Self {
            time_to_fix: 0,
            satellites_prn: vec![sat.prn],
            azimuth: vec![sat.azimuth],
            elevation: vec![sat.elevation],
            snr: vec![sat.snr],
            has_almanac: vec![sat.almanac],
            has_ephemeris: vec![sat.ephemeris],
            used_in_fix: vec![sat.used_in_fix],
        }
    }
}

/// Synthesized sensor snapshot.
///
/// Field names follow the server schema; the values placed in them are
/// taken from other sensors (see [`SensorInfo::from_readings`]). The server
/// accepts this exact mapping, so it must not be "corrected".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    /// Snapshot time.
    pub timestamp_snapshot: u64,
    /// Magnetic field.
    pub magnetic_field: [f64; 3],
    /// Linear acceleration.
    pub linear_acceleration: [f64; 3],
    /// Rotation rate.
    pub rotation_rate: [f64; 3],
    /// Attitude as pitch, roll, yaw.
    pub attitude: [f64; 3],
    /// Gravity.
    pub gravity: [f64; 3],
    /// Magnetic field accuracy.
    pub magnetic_field_accuracy: i32,
    /// Sensor status.
    pub status: u32,
}

impl SensorInfo {
    /// Build the snapshot from raw readings.
    ///
    /// - magnetic field: unit-length accelerometer
    /// - rotation rate: negated raw accelerometer
    /// - linear acceleration: magnetometer
    /// - attitude: raw gyroscope
    /// - gravity: normalized angle
    pub fn from_readings<R: Rng + ?Sized>(sensors: &SensorReadings, rng: &mut R) -> Self {
        let accel = sensors.accel_raw;
        let jitter = rng.gen_range(SENSOR_TIMESTAMP_JITTER);
        Self {
            timestamp_snapshot: sensors.time_snapshot.saturating_sub(jitter),
            magnetic_field: normalize(accel),
            linear_acceleration: sensors.magnetometer,
            rotation_rate: [-accel[0], -accel[1], -accel[2]],
            attitude: sensors.gyroscope_raw,
            gravity: sensors.angle_normalized,
            magnetic_field_accuracy: MAGNETIC_FIELD_ACCURACY,
            status: sensors.accelerometer_axes,
        }
    }
}

/// Scale a vector to unit length.
///
/// Zero and non-finite magnitudes yield the zero vector.
pub fn normalize(v: [f64; 3]) -> [f64; 3] {
    let magnitude = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return [0.0; 3];
    }
    [v[0] / magnitude, v[1] / magnitude, v[2] / magnitude]
}

/// Device-derived parts of a signature, read once per envelope.
pub(crate) struct DeviceSection {
    pub device_info: DeviceInfo,
    pub activity_status: Option<ActivityStatus>,
    pub gps_info: Vec<AndroidGpsInfo>,
    pub location_fix: Vec<LocationFix>,
    pub sensor_info: Vec<SensorInfo>,
    pub version_hash: u64,
    pub hash_seed: u32,
    pub time_snapshot: u64,
}

impl DeviceSection {
    pub(crate) fn read<R: Rng + ?Sized>(device: &dyn DeviceCharacteristics, rng: &mut R) -> Self {
        let version = device.version_data();
        let sensors = device.sensors();
        Self {
            device_info: device.device_info(),
            activity_status: device.activity_status(),
            gps_info: device
                .gps_satellites()
                .iter()
                .map(AndroidGpsInfo::from)
                .collect(),
            location_fix: device.location_fixes(),
            sensor_info: vec![SensorInfo::from_readings(&sensors, rng)],
            version_hash: version.version_hash,
            hash_seed: version.hash_seed,
            time_snapshot: device.time_snapshot(),
        }
    }
}
