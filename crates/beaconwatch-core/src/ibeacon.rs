//! iBeacon advertisement decoding and distance estimation.
//!
//! iBeacons advertise inside Apple manufacturer-specific data:
//!
//! ```text
//! 0x02 0x15 | proximity UUID (16) | major (2, BE) | minor (2, BE) | measured power (1, i8)
//! ```

use uuid::Uuid;

use crate::beacon::{ProximityCategory, RangedBeacon};

/// Bluetooth SIG company identifier for Apple.
pub const APPLE_COMPANY_ID: u16 = 0x004C;

/// iBeacon type byte.
const IBEACON_TYPE: u8 = 0x02;

/// Length of the remaining iBeacon payload after the type and length bytes.
const IBEACON_PAYLOAD_LEN: u8 = 0x15;

/// A decoded iBeacon advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IBeaconAdvertisement {
    /// Proximity UUID.
    pub identifier: Uuid,
    /// Major value.
    pub major: u16,
    /// Minor value.
    pub minor: u16,
    /// Calibrated RSSI at one metre, in dBm.
    pub measured_power: i8,
}

impl IBeaconAdvertisement {
    /// Decode manufacturer-specific data. Returns `None` for anything that is
    /// not an Apple iBeacon frame.
    #[must_use]
    pub fn from_manufacturer_data(company_id: u16, data: &[u8]) -> Option<Self> {
        if company_id != APPLE_COMPANY_ID || data.len() < 23 {
            return None;
        }
        if data[0] != IBEACON_TYPE || data[1] != IBEACON_PAYLOAD_LEN {
            return None;
        }

        let uuid_bytes: [u8; 16] = data[2..18].try_into().ok()?;
        Some(Self {
            identifier: Uuid::from_bytes(uuid_bytes),
            major: u16::from_be_bytes([data[18], data[19]]),
            minor: u16::from_be_bytes([data[20], data[21]]),
            measured_power: i8::from_be_bytes([data[22]]),
        })
    }

    /// Build the ranged reading for a received signal strength.
    #[must_use]
    pub fn ranged(&self, rssi: i16) -> RangedBeacon {
        let accuracy_m = estimate_accuracy(self.measured_power, rssi);
        RangedBeacon {
            identifier: self.identifier,
            major: self.major,
            minor: self.minor,
            proximity: ProximityCategory::from_accuracy(accuracy_m),
            accuracy_m,
            rssi,
        }
    }
}

/// Estimate distance in metres from measured power and RSSI.
///
/// Returns `-1.0` when either value is zero, which callers treat as unknown.
#[must_use]
pub fn estimate_accuracy(measured_power: i8, rssi: i16) -> f64 {
    if rssi == 0 || measured_power == 0 {
        return -1.0;
    }

    let ratio = f64::from(rssi) / f64::from(measured_power);
    if ratio < 1.0 {
        ratio.powi(10)
    } else {
        0.899_76 * ratio.powf(7.7095) + 0.111
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(uuid: Uuid, major: u16, minor: u16, power: i8) -> Vec<u8> {
        let mut data = vec![IBEACON_TYPE, IBEACON_PAYLOAD_LEN];
        data.extend_from_slice(uuid.as_bytes());
        data.extend_from_slice(&major.to_be_bytes());
        data.extend_from_slice(&minor.to_be_bytes());
        data.extend_from_slice(&power.to_be_bytes());
        data
    }

    fn sample_uuid() -> Uuid {
        Uuid::parse_str("E2C56DB5-DFFB-48D2-B060-D0F5A71096E0").unwrap()
    }

    #[test]
    fn test_decode_ibeacon_frame() {
        let data = frame(sample_uuid(), 100, 7, -59);
        let adv = IBeaconAdvertisement::from_manufacturer_data(APPLE_COMPANY_ID, &data).unwrap();
        assert_eq!(adv.identifier, sample_uuid());
        assert_eq!(adv.major, 100);
        assert_eq!(adv.minor, 7);
        assert_eq!(adv.measured_power, -59);
    }

    #[test]
    fn test_reject_non_ibeacon_data() {
        let data = frame(sample_uuid(), 1, 1, -59);
        assert!(IBeaconAdvertisement::from_manufacturer_data(0x0006, &data).is_none());
        assert!(IBeaconAdvertisement::from_manufacturer_data(APPLE_COMPANY_ID, &data[..10]).is_none());

        let mut wrong_type = data;
        wrong_type[0] = 0x10;
        assert!(IBeaconAdvertisement::from_manufacturer_data(APPLE_COMPANY_ID, &wrong_type).is_none());
    }

    #[test]
    fn test_estimate_accuracy() {
        assert!(estimate_accuracy(-59, 0) < 0.0);

        // At measured power the estimate is close to one metre.
        let at_one_metre = estimate_accuracy(-59, -59);
        assert!((at_one_metre - 1.01).abs() < 0.02);

        // Stronger than measured power means closer than one metre.
        assert!(estimate_accuracy(-59, -45) < 1.0);
        // Weaker means further away.
        assert!(estimate_accuracy(-59, -80) > 4.0);
    }

    #[test]
    fn test_ranged_reading() {
        let adv = IBeaconAdvertisement {
            identifier: sample_uuid(),
            major: 1,
            minor: 2,
            measured_power: -59,
        };
        let ranged = adv.ranged(-90);
        assert_eq!(ranged.identifier, sample_uuid());
        assert_eq!(ranged.rssi, -90);
        assert_eq!(ranged.proximity, ProximityCategory::Far);
    }
}
