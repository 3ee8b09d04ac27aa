//! Crop Label Set
//!
//! The classifier was trained against this exact ordering: output index `i`
//! always refers to `CROP_NAMES[i]`. Never reorder.

/// Number of crops the classifier can score
pub const CROP_COUNT: usize = 22;

/// Ordered crop labels, positionally aligned with classifier output
pub const CROP_NAMES: [&str; CROP_COUNT] = [
    "apple",
    "banana",
    "blackgram",
    "chickpea",
    "coconut",
    "coffee",
    "cotton",
    "grapes",
    "jute",
    "kidneybeans",
    "lentil",
    "maize",
    "mango",
    "mothbeans",
    "mungbean",
    "muskmelon",
    "orange",
    "papaya",
    "pigeonpeas",
    "pomegranate",
    "rice",
    "watermelon",
];

/// Position of a crop in the label set
pub fn crop_index(name: &str) -> Option<usize> {
    CROP_NAMES.iter().position(|c| *c == name)
}

pub fn is_known_crop(name: &str) -> bool {
    crop_index(name).is_some()
}
