use serde::Serialize;

use crate::snapshot::Snapshot;

/// Tolerance absorbing sensor jitter when comparing against the dew point.
pub const DEW_POINT_TOLERANCE_F: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Unknown,
    Alarm,
    Warning,
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DewPointState {
    Unknown,
    Condensation,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        let min = known(min)?;
        let max = known(max)?;
        Some(Self { min, max })
    }

    pub fn contains(self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn to_celsius(self) -> Self {
        Self {
            min: fahrenheit_to_celsius(self.min),
            max: fahrenheit_to_celsius(self.max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub temp_f: Severity,
    pub temp_c: Severity,
    pub humidity: Severity,
    pub dew_point: DewPointState,
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Unknown beats alarm, alarm beats warning, warning beats ok.
///
/// The alarm flag comes from the device and is trusted over the local band
/// comparison; only an explicit `true` counts.
pub fn classify(value: Option<f64>, alarm: Option<bool>, band: Option<Band>) -> Severity {
    let (Some(value), Some(band)) = (known(value), band) else {
        return Severity::Unknown;
    };
    if alarm == Some(true) {
        Severity::Alarm
    } else if !band.contains(value) {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

pub fn classify_dew_point(temp_f: Option<f64>, dew_f: Option<f64>) -> DewPointState {
    match (known(temp_f), known(dew_f)) {
        (Some(temp), Some(dew)) if temp <= dew + DEW_POINT_TOLERANCE_F => {
            DewPointState::Condensation
        }
        (Some(_), Some(_)) => DewPointState::Normal,
        _ => DewPointState::Unknown,
    }
}

pub fn classify_snapshot(snapshot: &Snapshot) -> Classification {
    let temp_band = Band::new(snapshot.tmin, snapshot.tmax);
    let humidity_band = Band::new(snapshot.hmin, snapshot.hmax);

    Classification {
        temp_f: classify(snapshot.temp_f, snapshot.temp_alarm, temp_band),
        temp_c: classify(
            snapshot.temp_c,
            snapshot.temp_alarm,
            temp_band.map(Band::to_celsius),
        ),
        humidity: classify(snapshot.rh, snapshot.humidity_alarm, humidity_band),
        dew_point: classify_dew_point(snapshot.temp_f, snapshot.dew_f),
    }
}

fn known(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !v.is_nan())
}
