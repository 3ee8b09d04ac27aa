//! Soil and Climate Input Vector
//!
//! Parses the 7 agronomic measurements from a loosely-typed JSON payload.
//! Fields may arrive as JSON numbers or numeric strings (form submissions send
//! both). Validation order: presence, numeric parse, then range checks.

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

/// Wire names of the input fields, in classifier column order
pub const FEATURE_NAMES: [&str; 7] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];

pub const PH_RANGE: (f64, f64) = (0.0, 14.0);
pub const HUMIDITY_RANGE: (f64, f64) = (0.0, 100.0);

/// Validated classifier input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoilClimateInput {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilClimateInput {
    /// Build and validate from already-numeric values
    pub fn new(
        nitrogen: f64,
        phosphorus: f64,
        potassium: f64,
        temperature: f64,
        humidity: f64,
        ph: f64,
        rainfall: f64,
    ) -> Result<Self, ValidationError> {
        let input = Self {
            nitrogen,
            phosphorus,
            potassium,
            temperature,
            humidity,
            ph,
            rainfall,
        };
        input.validate()?;
        Ok(input)
    }

    /// Parse a request body
    pub fn from_json(payload: &Value) -> Result<Self, ValidationError> {
        let fields = match payload.as_object() {
            Some(map) if !map.is_empty() => map,
            _ => return Err(ValidationError::NoData),
        };

        let missing: Vec<String> = FEATURE_NAMES
            .iter()
            .filter(|name| !fields.contains_key(**name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let mut values = [0.0; 7];
        let mut invalid = Vec::new();
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            match parse_real(&fields[name]) {
                Some(v) => *slot = v,
                None => invalid.push(name.to_string()),
            }
        }
        if !invalid.is_empty() {
            return Err(ValidationError::InvalidNumber(invalid));
        }

        let [n, p, k, temperature, humidity, ph, rainfall] = values;
        Self::new(n, p, k, temperature, humidity, ph, rainfall)
    }

    /// Range checks (pH first, then humidity)
    pub fn validate(&self) -> Result<(), ValidationError> {
        let non_finite: Vec<String> = FEATURE_NAMES
            .iter()
            .zip(self.as_array())
            .filter(|(_, v)| !v.is_finite())
            .map(|(name, _)| name.to_string())
            .collect();
        if !non_finite.is_empty() {
            return Err(ValidationError::InvalidNumber(non_finite));
        }

        if !(PH_RANGE.0..=PH_RANGE.1).contains(&self.ph) {
            return Err(ValidationError::PhOutOfRange(self.ph));
        }
        if !(HUMIDITY_RANGE.0..=HUMIDITY_RANGE.1).contains(&self.humidity) {
            return Err(ValidationError::HumidityOutOfRange(self.humidity));
        }
        Ok(())
    }

    /// Values in `FEATURE_NAMES` order
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.nitrogen,
            self.phosphorus,
            self.potassium,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }
}

/// Accept a finite JSON number or a string that parses as one
pub fn parse_real(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
