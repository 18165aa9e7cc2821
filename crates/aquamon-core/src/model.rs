// Model of the data read in this app

use crate::scaling::round_hundredths;

/// One temperature / pH / dissolved-oxygen triple, rounded to 2 decimals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f32,
    pub ph: f32,
    pub dissolved_oxygen: f32,
}

impl Reading {
    pub fn new(temperature: f32, ph: f32, dissolved_oxygen: f32) -> Self {
        Self {
            temperature: round_hundredths(temperature),
            ph: round_hundredths(ph),
            dissolved_oxygen: round_hundredths(dissolved_oxygen),
        }
    }
}
