use incubator_common::{profile_by_id, CUSTOM_PROFILE_ID, DEFAULT_PROFILE_ID};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

const TEMP_ALARM_MARGIN_F: f64 = 0.5;
const HUMIDITY_ALARM_MARGIN: f64 = 5.0;

const PEAK_WINDOWS: [(&str, i64); 3] = [("1h", 3_600), ("24h", 86_400), ("7d", 604_800)];

/// Body of `POST /api/profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub profile_id: u8,
    #[serde(default)]
    pub tmin: Option<f64>,
    #[serde(default)]
    pub tmax: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileRejection {
    #[error("unknown_profile")]
    UnknownProfile,
    #[error("bad_range")]
    BadRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TargetBand {
    tmin: f64,
    tmax: f64,
    hmin: f64,
    hmax: f64,
}

impl TargetBand {
    fn for_profile(profile_id: u8) -> Option<Self> {
        let band = profile_by_id(profile_id)?.incubation?;
        Some(Self {
            tmin: band.temp_min_f,
            tmax: band.temp_max_f,
            hmin: band.hum_min,
            hmax: band.hum_max,
        })
    }

    fn temp_alarm(&self, temp_f: f64) -> bool {
        temp_f < self.tmin - TEMP_ALARM_MARGIN_F || temp_f > self.tmax + TEMP_ALARM_MARGIN_F
    }

    fn humidity_alarm(&self, rh: f64) -> bool {
        rh < self.hmin - HUMIDITY_ALARM_MARGIN || rh > self.hmax + HUMIDITY_ALARM_MARGIN
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WindowPeak {
    temp_f: Option<f64>,
    ts: i64,
}

#[derive(Debug, Clone)]
pub struct Readings {
    pub temp_f: f64,
    pub temp_c: f64,
    pub rh: f64,
    pub ah: f64,
    pub dew_f: f64,
    pub heat_f: f64,
}

/// A pretend incubator: one heater, one humidity reading, a target band set
/// by profile.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    profile_id: u8,
    band: TargetBand,
    tick: u64,
    lamp: bool,
    clients: usize,
    peaks: [WindowPeak; 3],
    last_info: Option<String>,
    wifi_ssid: String,
    ap_ssid: String,
}

impl SimulatedDevice {
    pub fn new(wifi_ssid: impl Into<String>, ap_ssid: impl Into<String>) -> Self {
        Self {
            profile_id: DEFAULT_PROFILE_ID,
            band: default_band(),
            tick: 0,
            lamp: false,
            clients: 0,
            peaks: [WindowPeak::default(); 3],
            last_info: None,
            wifi_ssid: wifi_ssid.into(),
            ap_ssid: ap_ssid.into(),
        }
    }

    pub fn profile_id(&self) -> u8 {
        self.profile_id
    }

    pub fn apply_profile(&mut self, update: &ProfileUpdate) -> Result<(), ProfileRejection> {
        if profile_by_id(update.profile_id).is_none() {
            return Err(ProfileRejection::UnknownProfile);
        }

        let band = if update.profile_id == CUSTOM_PROFILE_ID {
            let (Some(tmin), Some(tmax)) = (update.tmin, update.tmax) else {
                return Err(ProfileRejection::BadRange);
            };
            if !tmin.is_finite() || !tmax.is_finite() || tmin >= tmax {
                return Err(ProfileRejection::BadRange);
            }
            TargetBand {
                tmin,
                tmax,
                ..self.band
            }
        } else {
            TargetBand::for_profile(update.profile_id).ok_or(ProfileRejection::UnknownProfile)?
        };

        self.profile_id = update.profile_id;
        self.band = band;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.profile_id = DEFAULT_PROFILE_ID;
        self.band = default_band();
        self.peaks = [WindowPeak::default(); 3];
    }

    pub fn client_connected(&mut self) {
        self.clients = self.clients.saturating_add(1);
    }

    pub fn client_disconnected(&mut self) {
        self.clients = self.clients.saturating_sub(1);
    }

    pub fn info(&self) -> Value {
        let wifi_connected = !self.wifi_ssid.is_empty();
        json!({
            "type": "info",
            "wifi_connected": wifi_connected,
            "wifi_ssid": self.wifi_ssid,
            "ap_ssid": self.ap_ssid,
            "ws": if self.clients > 0 { "CONNECTED" } else { "DISCONNECTED" },
            "mode": if wifi_connected { "AP+STA" } else { "AP" },
            "ip_ap": "192.168.4.1",
            "ip_sta": if wifi_connected { "192.168.1.42" } else { "" },
            "mac": "24:6F:28:A1:B2:C3",
        })
    }

    /// The info message, but only when it differs from the last one returned.
    pub fn info_if_changed(&mut self) -> Option<String> {
        let info = self.info().to_string();
        if self.last_info.as_deref() == Some(info.as_str()) {
            return None;
        }
        self.last_info = Some(info.clone());
        Some(info)
    }

    pub fn readings(&self) -> Readings {
        let mid_t = (self.band.tmin + self.band.tmax) / 2.0;
        let half_t = ((self.band.tmax - self.band.tmin) / 2.0).max(0.25);
        let mid_h = (self.band.hmin + self.band.hmax) / 2.0;
        let half_h = (self.band.hmax - self.band.hmin) / 2.0;

        let phase = self.tick as f64 * 0.15;
        let temp_f = mid_t + half_t * 1.4 * phase.sin();
        let rh = (mid_h + half_h * 0.8 * (phase * 0.7).cos()).clamp(0.0, 100.0);
        let temp_c = (temp_f - 32.0) * 5.0 / 9.0;

        Readings {
            temp_f,
            temp_c,
            rh,
            ah: absolute_humidity(temp_c, rh),
            dew_f: dew_point_c(temp_c, rh) * 9.0 / 5.0 + 32.0,
            heat_f: heat_index_f(temp_f, rh),
        }
    }

    /// Advances the simulation one step and returns the telemetry message.
    pub fn step(&mut self, now_epoch: i64) -> Value {
        self.tick = self.tick.wrapping_add(1);
        let readings = self.readings();
        let mid_t = (self.band.tmin + self.band.tmax) / 2.0;
        self.lamp = readings.temp_f < mid_t;
        self.record_peak(readings.temp_f, now_epoch);

        let peaks: Vec<Value> = PEAK_WINDOWS
            .iter()
            .zip(self.peaks.iter())
            .map(|((label, _), peak)| match peak.temp_f {
                Some(temp_f) => json!({ "label": label, "temp_f": temp_f, "ts": peak.ts }),
                None => json!({ "label": label }),
            })
            .collect();

        json!({
            "type": "status",
            "active": true,
            "profile_id": self.profile_id,
            "temp_f": readings.temp_f,
            "temp_c": readings.temp_c,
            "rh": readings.rh,
            "ah": readings.ah,
            "dew_f": readings.dew_f,
            "heat_f": readings.heat_f,
            "tmin": self.band.tmin,
            "tmax": self.band.tmax,
            "hmin": self.band.hmin,
            "hmax": self.band.hmax,
            "temp_alarm": self.band.temp_alarm(readings.temp_f),
            "humidity_alarm": self.band.humidity_alarm(readings.rh),
            "lamp": self.lamp,
            "temp_peaks": peaks,
        })
    }

    fn record_peak(&mut self, temp_f: f64, now_epoch: i64) {
        for ((_, window), peak) in PEAK_WINDOWS.iter().zip(self.peaks.iter_mut()) {
            let expired = now_epoch - peak.ts > *window;
            let higher = peak.temp_f.map(|t| temp_f >= t).unwrap_or(true);
            if expired || higher {
                *peak = WindowPeak {
                    temp_f: Some(temp_f),
                    ts: now_epoch,
                };
            }
        }
    }
}

fn default_band() -> TargetBand {
    TargetBand::for_profile(DEFAULT_PROFILE_ID).unwrap_or(TargetBand {
        tmin: 98.0,
        tmax: 100.5,
        hmin: 45.0,
        hmax: 55.0,
    })
}

// Grams of water per cubic metre.
fn absolute_humidity(temp_c: f64, rh: f64) -> f64 {
    let saturation = 6.112 * ((17.67 * temp_c) / (temp_c + 243.5)).exp();
    216.7 * ((rh / 100.0) * saturation) / (temp_c + 273.15)
}

// Magnus formula.
fn dew_point_c(temp_c: f64, rh: f64) -> f64 {
    if rh <= 0.0 {
        return f64::NAN;
    }
    let (a, b) = (17.62, 243.12);
    let gamma = (rh / 100.0).ln() + (a * temp_c) / (b + temp_c);
    (b * gamma) / (a - gamma)
}

// NOAA: Steadman's approximation, Rothfusz regression above 79 °F.
fn heat_index_f(t: f64, rh: f64) -> f64 {
    let simple = 0.5 * (t + 61.0 + (t - 68.0) * 1.2 + rh * 0.094);
    if simple <= 79.0 {
        return simple;
    }

    let mut hi = -42.379 + 2.049_015_23 * t + 10.143_331_27 * rh
        - 0.224_755_41 * t * rh
        - 0.006_837_83 * t * t
        - 0.054_817_17 * rh * rh
        + 0.001_228_74 * t * t * rh
        + 0.000_852_82 * t * rh * rh
        - 0.000_001_99 * t * t * rh * rh;

    if rh < 13.0 && (80.0..=112.0).contains(&t) {
        hi -= ((13.0 - rh) * 0.25) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
    } else if rh > 85.0 && (80.0..=87.0).contains(&t) {
        hi += ((rh - 85.0) * 0.1) * ((87.0 - t) * 0.2);
    }
    hi
}

#[cfg(test)]
mod tests {
    use incubator_common::Snapshot;
    use pretty_assertions::assert_eq;

    use super::*;

    fn device() -> SimulatedDevice {
        SimulatedDevice::new("barn", "Incubator-AP")
    }

    #[test]
    fn telemetry_parses_as_snapshot() {
        let mut device = device();
        let message = device.step(1_767_632_700);
        let fields = message.as_object().unwrap();
        let snapshot = Snapshot::from_fields(fields).unwrap();

        assert_eq!(snapshot.profile_id, Some(0));
        assert_eq!(snapshot.tmin, Some(98.0));
        assert_eq!(snapshot.tmax, Some(100.5));
        assert_eq!(snapshot.peaks().len(), 3);
        assert_eq!(snapshot.extra.get("active"), Some(&json!(true)));
    }

    #[test]
    fn custom_profile_requires_ordered_band() {
        let mut device = device();
        let missing = ProfileUpdate {
            profile_id: CUSTOM_PROFILE_ID,
            tmin: Some(99.0),
            tmax: None,
        };
        assert_eq!(device.apply_profile(&missing), Err(ProfileRejection::BadRange));

        let inverted = ProfileUpdate {
            profile_id: CUSTOM_PROFILE_ID,
            tmin: Some(101.0),
            tmax: Some(99.0),
        };
        assert_eq!(device.apply_profile(&inverted), Err(ProfileRejection::BadRange));

        let valid = ProfileUpdate {
            profile_id: CUSTOM_PROFILE_ID,
            tmin: Some(97.0),
            tmax: Some(98.0),
        };
        assert_eq!(device.apply_profile(&valid), Ok(()));
        assert_eq!(device.profile_id(), CUSTOM_PROFILE_ID);

        let message = device.step(1_000);
        assert_eq!(message["tmin"], json!(97.0));
        assert_eq!(message["hmin"], json!(45.0));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let mut device = device();
        let update = ProfileUpdate {
            profile_id: 99,
            tmin: None,
            tmax: None,
        };
        assert_eq!(
            device.apply_profile(&update),
            Err(ProfileRejection::UnknownProfile)
        );
        assert_eq!(device.profile_id(), DEFAULT_PROFILE_ID);
    }

    #[test]
    fn preset_replaces_band_and_reset_restores_default() {
        let mut device = device();
        let emu = ProfileUpdate {
            profile_id: 7,
            tmin: Some(1.0),
            tmax: Some(2.0),
        };
        device.apply_profile(&emu).unwrap();
        assert_eq!(device.step(1_000)["tmin"], json!(96.5));

        device.reset();
        assert_eq!(device.profile_id(), DEFAULT_PROFILE_ID);
        assert_eq!(device.step(1_001)["tmax"], json!(100.5));
    }

    #[test]
    fn alarms_use_margins_outside_band() {
        let band = default_band();
        assert!(!band.temp_alarm(100.9));
        assert!(band.temp_alarm(101.1));
        assert!(band.temp_alarm(97.4));
        assert!(!band.humidity_alarm(59.0));
        assert!(band.humidity_alarm(61.0));
    }

    #[test]
    fn info_is_only_repeated_after_a_change() {
        let mut device = device();
        assert!(device.info_if_changed().is_some());
        assert!(device.info_if_changed().is_none());

        device.client_connected();
        let info = device.info_if_changed().unwrap();
        assert!(info.contains(r#""ws":"CONNECTED""#));
        assert!(device.info_if_changed().is_none());
    }

    #[test]
    fn peaks_keep_window_maximum() {
        let mut device = device();
        device.record_peak(99.0, 100);
        device.record_peak(98.5, 200);
        assert_eq!(device.peaks[0].temp_f, Some(99.0));
        assert_eq!(device.peaks[0].ts, 100);

        device.record_peak(98.0, 100 + 3_601);
        assert_eq!(device.peaks[0].temp_f, Some(98.0));
        assert_eq!(device.peaks[1].temp_f, Some(99.0));
    }

    #[test]
    fn dew_point_is_below_air_temperature() {
        let readings = device().readings();
        assert!(readings.dew_f < readings.temp_f);
        assert!(readings.ah > 0.0);
    }
}
