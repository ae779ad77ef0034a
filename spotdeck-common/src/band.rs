//! Amateur band classification

use serde::{Deserialize, Serialize};

/// Named amateur band, serialized with its conventional label ("20m", "70cm", ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "160m")]
    M160,
    #[serde(rename = "80m")]
    M80,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "40m")]
    M40,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "20m")]
    M20,
    #[serde(rename = "17m")]
    M17,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "12m")]
    M12,
    #[serde(rename = "10m")]
    M10,
    #[serde(rename = "6m")]
    M6,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "70cm")]
    Cm70,
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Band edges in Hz, inclusive on both ends.
const BAND_PLAN: &[(Band, u64, u64)] = &[
    (Band::M160, 1_800_000, 2_000_000),
    (Band::M80, 3_500_000, 4_000_000),
    (Band::M60, 5_300_000, 5_400_000),
    (Band::M40, 7_000_000, 7_300_000),
    (Band::M30, 10_100_000, 10_150_000),
    (Band::M20, 14_000_000, 14_350_000),
    (Band::M17, 18_068_000, 18_168_000),
    (Band::M15, 21_000_000, 21_450_000),
    (Band::M12, 24_890_000, 24_990_000),
    (Band::M10, 28_000_000, 29_700_000),
    (Band::M6, 50_000_000, 54_000_000),
    (Band::M2, 144_000_000, 148_000_000),
    (Band::Cm70, 420_000_000, 450_000_000),
];

impl Band {
    /// Classify a frequency given in Hz.
    pub fn from_hz(freq_hz: u64) -> Self {
        BAND_PLAN
            .iter()
            .find(|(_, low, high)| freq_hz >= *low && freq_hz <= *high)
            .map(|(band, _, _)| *band)
            .unwrap_or(Band::Unknown)
    }

    /// Classify a frequency given in kHz, as carried by cluster spots.
    pub fn from_khz(freq_khz: f64) -> Self {
        if !freq_khz.is_finite() || freq_khz <= 0.0 {
            return Band::Unknown;
        }
        Self::from_hz((freq_khz * 1000.0).round() as u64)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::M160 => "160m",
            Band::M80 => "80m",
            Band::M60 => "60m",
            Band::M40 => "40m",
            Band::M30 => "30m",
            Band::M20 => "20m",
            Band::M17 => "17m",
            Band::M15 => "15m",
            Band::M12 => "12m",
            Band::M10 => "10m",
            Band::M6 => "6m",
            Band::M2 => "2m",
            Band::Cm70 => "70cm",
            Band::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
