//! Frequency codes: which days of the week a schedule runs.
//!
//! The source documents carry a 4-digit frequency code plus a day-of-week
//! bitstring of 7 characters, or 8 when a trailing holiday bit is present.
//! Internally the days are a fixed 7-element array and the holiday bit is an
//! explicit flag, so there is no variable-length string slicing anywhere
//! downstream.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrequencyCodeError {
    #[error("day bitstring must be 7 or 8 characters, got {0}")]
    BadLength(usize),
    #[error("day bitstring may only contain '0' and '1': {0}")]
    BadDigit(String),
}

/// A schedule's operating frequency: the raw 4-digit code, the days of the
/// week it runs (Monday first), and whether it also runs on holidays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyCode {
    pub code: String,
    pub days: [bool; 7],
    pub is_holiday: bool,
}

impl FrequencyCode {
    /// Parse a 7- or 8-character day bitstring. The optional 8th character is
    /// the holiday bit. The 4-digit code is zero-padded on the left.
    pub fn from_bitstring(code: &str, bits: &str) -> Result<Self, FrequencyCodeError> {
        if bits.len() != 7 && bits.len() != 8 {
            return Err(FrequencyCodeError::BadLength(bits.len()));
        }
        if !bits.chars().all(|c| c == '0' || c == '1') {
            return Err(FrequencyCodeError::BadDigit(bits.to_string()));
        }

        let mut days = [false; 7];
        for (i, c) in bits.chars().take(7).enumerate() {
            days[i] = c == '1';
        }
        let is_holiday = bits.chars().nth(7) == Some('1');

        Ok(Self {
            code: pad_code(code),
            days,
            is_holiday,
        })
    }

    /// A holiday-only frequency: no weekday service.
    pub fn holiday_only(code: &str) -> Self {
        Self {
            code: pad_code(code),
            days: [false; 7],
            is_holiday: true,
        }
    }

    pub fn monday(&self) -> bool {
        self.days[0]
    }

    pub fn thursday(&self) -> bool {
        self.days[3]
    }

    pub fn friday(&self) -> bool {
        self.days[4]
    }

    pub fn saturday(&self) -> bool {
        self.days[5]
    }

    pub fn sunday(&self) -> bool {
        self.days[6]
    }

    /// Number of operating days per week (holiday excluded).
    pub fn days_per_week(&self) -> usize {
        self.days.iter().filter(|d| **d).count()
    }

    /// Shift every operating day one day later, for schedules whose start
    /// was pushed across midnight during repair. Sunday wraps to Monday; the
    /// holiday flag is untouched. The code digits move in step: each digit
    /// naming a day 1-7 advances by one, 7 wrapping to 1. Codes containing a
    /// '9' (holiday designators) are left alone.
    pub fn rotate_forward(&mut self) {
        self.days.rotate_right(1);
        self.code = rotate_code(&self.code);
    }
}

fn pad_code(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.len() >= 4 {
        trimmed.to_string()
    } else {
        format!("{:0>4}", trimmed)
    }
}

fn rotate_code(code: &str) -> String {
    if code.contains('9') || code.len() != 4 {
        return code.to_string();
    }

    let mut day_digits: Vec<u32> = Vec::new();
    let mut day_positions: Vec<usize> = Vec::new();
    for (i, c) in code.chars().enumerate() {
        if let Some(d) = c.to_digit(10) {
            if (1..=7).contains(&d) {
                day_digits.push(if d == 7 { 1 } else { d + 1 });
                day_positions.push(i);
            }
        }
    }

    if day_digits.is_empty() {
        return code.to_string();
    }

    day_digits.sort_unstable();
    let mut out: Vec<char> = code.chars().collect();
    for (&pos, digit) in day_positions.iter().zip(day_digits) {
        if let (Some(slot), Some(c)) = (out.get_mut(pos), char::from_digit(digit, 10)) {
            *slot = c;
        }
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seven_char_bitstring() {
        let fc = FrequencyCode::from_bitstring("110", "1111100").unwrap();
        assert_eq!(fc.code, "0110");
        assert!(fc.monday());
        assert!(fc.friday());
        assert!(!fc.saturday());
        assert!(!fc.sunday());
        assert!(!fc.is_holiday);
        assert_eq!(fc.days_per_week(), 5);
    }

    #[test]
    fn parses_eight_char_bitstring_with_holiday_bit() {
        let fc = FrequencyCode::from_bitstring("1239", "00000011").unwrap();
        assert!(fc.sunday());
        assert!(fc.is_holiday);
        assert_eq!(fc.days_per_week(), 1);
    }

    #[test]
    fn rejects_bad_lengths_and_digits() {
        assert_eq!(
            FrequencyCode::from_bitstring("0110", "111110"),
            Err(FrequencyCodeError::BadLength(6))
        );
        assert!(matches!(
            FrequencyCode::from_bitstring("0110", "11111x0"),
            Err(FrequencyCodeError::BadDigit(_))
        ));
    }

    #[test]
    fn rotate_forward_moves_sunday_to_monday() {
        let mut fc = FrequencyCode::from_bitstring("0167", "0000011").unwrap();
        fc.rotate_forward();
        // Sat/Sun service becomes Sun/Mon.
        assert!(fc.monday());
        assert!(fc.sunday());
        assert!(!fc.saturday());
    }

    #[test]
    fn rotate_forward_preserves_holiday_flag() {
        let mut fc = FrequencyCode::from_bitstring("0110", "11111001").unwrap();
        assert!(fc.is_holiday);
        fc.rotate_forward();
        assert!(fc.is_holiday);
    }

    #[test]
    fn rotate_code_advances_day_digits() {
        // Digits 1-7 name days; each advances by one, 7 wraps to 1, and the
        // results are re-sorted into the day positions.
        assert_eq!(rotate_code("0167"), "0127");
        assert_eq!(rotate_code("0017"), "0012");
    }

    #[test]
    fn rotate_code_leaves_holiday_codes_alone() {
        assert_eq!(rotate_code("0901"), "0901");
        let mut fc = FrequencyCode::holiday_only("0901");
        let before = fc.code.clone();
        fc.rotate_forward();
        assert_eq!(fc.code, before);
    }

    #[test]
    fn code_is_zero_padded() {
        assert_eq!(FrequencyCode::from_bitstring("12", "1111111").unwrap().code, "0012");
    }
}
