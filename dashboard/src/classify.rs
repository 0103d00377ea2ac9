use crate::model::{Measurements, SoilReading};
use std::fmt;

const PH_MIN: f64 = 5.5;
const PH_MAX: f64 = 7.5;
const TEMP_MIN: f64 = 15.0;
const TEMP_MAX: f64 = 35.0;
const HUMIDITY_MIN: f64 = 40.0;
const HUMIDITY_MAX: f64 = 90.0;

const ACIDIC_BELOW: f64 = 6.0;
const ALKALINE_ABOVE: f64 = 7.0;

/// Crop recommendation derived from one reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Recommendation {
    #[default]
    AwaitingData,
    OutsideOptimalRange,
    GeneralFieldCrop,
    Coffee,
    PotatoesOrBerries,
    Cotton,
    GrapesOrBarley,
    Rice,
    SugarcaneOrMaize,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::AwaitingData => "Waiting for ESP32 Data...",
            Recommendation::OutsideOptimalRange => {
                "Environmental conditions are outside optimal range. Consider corrective action."
            }
            Recommendation::GeneralFieldCrop => "General Field Crop (Wheat/Maize)",
            Recommendation::Coffee => "Coffee (Acid-loving, high Potassium)",
            Recommendation::PotatoesOrBerries => "Potatoes or Berries",
            Recommendation::Cotton => "Cotton (Tolerates alkalinity, needs heat)",
            Recommendation::GrapesOrBarley => "Grapes or Barley",
            Recommendation::Rice => "Rice (High heat and humidity)",
            Recommendation::SugarcaneOrMaize => "Sugarcane or High-Yield Maize",
        }
    }

    /// Short label, used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::AwaitingData => "awaiting_data",
            Recommendation::OutsideOptimalRange => "outside_range",
            Recommendation::GeneralFieldCrop => "general_field_crop",
            Recommendation::Coffee => "coffee",
            Recommendation::PotatoesOrBerries => "potatoes_or_berries",
            Recommendation::Cotton => "cotton",
            Recommendation::GrapesOrBarley => "grapes_or_barley",
            Recommendation::Rice => "rice",
            Recommendation::SugarcaneOrMaize => "sugarcane_or_maize",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the optimal-range guard compares a value against its bounds.
///
/// `Chained` evaluates the guard as `(low <= x) <= high`: the boolean `low <= x`
/// becomes 0 or 1 and is compared against `high`. Every upper bound here is
/// above 1, so the guard never rejects a reading. `Inclusive` checks
/// `low <= x && x <= high`. The dashboard runs `Chained` unless
/// `STRICT_RANGE_CHECK` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangeCheck {
    #[default]
    Chained,
    Inclusive,
}

impl RangeCheck {
    fn within(self, low: f64, value: f64, high: f64) -> bool {
        match self {
            RangeCheck::Chained => f64::from(u8::from(low <= value)) <= high,
            RangeCheck::Inclusive => (low..=high).contains(&value),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    range_check: RangeCheck,
}

impl Classifier {
    pub fn new(range_check: RangeCheck) -> Self {
        Self { range_check }
    }

    pub fn range_check(&self) -> RangeCheck {
        self.range_check
    }

    /// Maps the latest reading to a recommendation.
    ///
    /// Only nitrogen is checked for presence: a reading without measurements
    /// yields `AwaitingData` whatever else it carries.
    pub fn classify(&self, reading: &SoilReading) -> Recommendation {
        match &reading.measurements {
            None => Recommendation::AwaitingData,
            Some(m) => self.classify_measurements(m),
        }
    }

    pub fn classify_measurements(&self, m: &Measurements) -> Recommendation {
        let check = self.range_check;
        if !check.within(PH_MIN, m.ph, PH_MAX)
            || !check.within(TEMP_MIN, m.temperature, TEMP_MAX)
            || !check.within(HUMIDITY_MIN, m.humidity, HUMIDITY_MAX)
        {
            return Recommendation::OutsideOptimalRange;
        }

        if m.ph < ACIDIC_BELOW {
            if m.n < 40.0 && m.k > 50.0 {
                Recommendation::Coffee
            } else if m.temperature < 20.0 {
                Recommendation::PotatoesOrBerries
            } else {
                Recommendation::GeneralFieldCrop
            }
        } else if m.ph > ALKALINE_ABOVE {
            if m.p > 60.0 && m.temperature > 28.0 {
                Recommendation::Cotton
            } else if m.k > 80.0 {
                Recommendation::GrapesOrBarley
            } else {
                Recommendation::GeneralFieldCrop
            }
        } else if m.temperature > 30.0 && m.humidity > 80.0 {
            Recommendation::Rice
        } else if m.n > 80.0 && m.p > 50.0 {
            Recommendation::SugarcaneOrMaize
        } else {
            Recommendation::GeneralFieldCrop
        }
    }
}
