//! Linear scaling of raw ADC counts into engineering units
//!
//! No calibration curve is applied: a count is mapped proportionally from
//! `0..=full_scale` onto `0..=max`, then rounded to hundredths.
//!
//! Rounding is half to even on the exact value, so DS18B20 steps such as
//! 25.125 publish as 25.12 and 25.375 as 25.38.

/// Round to the nearest hundredth, ties to even
pub fn round_hundredths(value: f32) -> f32 {
    to_hundredths(value) as f32 / 100.0
}

/// Value in hundredths as an integer, ties to even
pub fn to_hundredths(value: f32) -> i32 {
    // An f32 times 100 is exact in f64, so ties are detected exactly
    let scaled = f64::from(value) * 100.0;
    let negative = scaled < 0.0;
    let magnitude = if negative { -scaled } else { scaled };

    let mut whole = magnitude as i32;
    let frac = magnitude - f64::from(whole);
    if frac > 0.5 || (frac == 0.5 && whole % 2 == 1) {
        whole += 1;
    }

    if negative { -whole } else { whole }
}

/// `numerator / denominator` rounded to the nearest integer, ties to even
fn div_round_even(numerator: u64, denominator: u64) -> u64 {
    let quotient = numerator / denominator;
    let twice_rem = 2 * (numerator % denominator);
    if twice_rem > denominator || (twice_rem == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// Map `raw` proportionally onto `0..=max`, clamping counts above full scale
///
/// Computed on integers in hundredths so the result is the exact ratio
/// rounded once.
pub fn scale(raw: u16, full_scale: u16, max: f32) -> f32 {
    if full_scale == 0 {
        return 0.0;
    }
    let raw = raw.min(full_scale);
    let max_centi = to_hundredths(max).max(0) as u64;
    let centi = div_round_even(u64::from(raw) * max_centi, u64::from(full_scale));
    centi as f32 / 100.0
}

/// pH proxy in `0..=14`
pub fn ph_from_raw(raw: u16, full_scale: u16) -> f32 {
    scale(raw, full_scale, 14.0)
}

/// Dissolved oxygen proxy in mg/L, `0..=20`
pub fn oxygen_from_raw(raw: u16, full_scale: u16) -> f32 {
    scale(raw, full_scale, 20.0)
}
