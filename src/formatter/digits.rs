//! Exact decimal digit strings used for rounding
//!
//! Values are taken from the shortest round-trip representation of an `f64`,
//! so `1.005` rounds to `1.01` at two fraction digits, and all scaling by
//! powers of ten (percent, scientific, compact) is a shift of the decimal
//! point rather than a floating point multiplication.

/// A non-negative decimal `0.d1 d2 … dn × 10^point`
///
/// `digits` has no leading or trailing zeros; zero is the empty digit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitString {
    digits: Vec<u8>,
    point: i32,
}

impl DigitString {
    pub fn zero() -> Self {
        Self {
            digits: Vec::new(),
            point: 0,
        }
    }

    /// Digits of `|value|`; `value` must be finite
    pub fn from_f64(value: f64) -> Self {
        let abs = value.abs();
        if abs == 0.0 || !abs.is_finite() {
            return Self::zero();
        }

        // `{:e}` prints the shortest round-trip mantissa, e.g. "1.2345e3"
        let repr = format!("{abs:e}");
        let (mantissa, exponent) = repr.split_once('e').unwrap_or((repr.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let digits = mantissa
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();

        let mut result = Self {
            digits,
            point: exponent + 1,
        };
        result.normalize();
        result
    }

    /// Digits of a plain numeral such as "1234.5600"
    pub fn from_numeral(numeral: &str) -> Self {
        let (integer, fraction) = numeral.split_once('.').unwrap_or((numeral, ""));
        let digits = integer
            .bytes()
            .chain(fraction.bytes())
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();
        let mut result = Self {
            digits,
            point: integer.len() as i32,
        };
        result.normalize();
        result
    }

    fn normalize(&mut self) {
        while self.digits.last() == Some(&0) {
            self.digits.pop();
        }
        let leading = self.digits.iter().take_while(|d| **d == 0).count();
        if leading > 0 {
            self.digits.drain(..leading);
            self.point -= leading as i32;
        }
        if self.digits.is_empty() {
            self.point = 0;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// Power of ten of the most significant digit, `None` for zero
    pub fn magnitude(&self) -> Option<i32> {
        if self.is_zero() {
            None
        } else {
            Some(self.point - 1)
        }
    }

    /// Number of integer digits (0 when the value is below one)
    pub fn integer_len(&self) -> usize {
        self.point.max(0) as usize
    }

    /// Multiply by 10^`places`
    pub fn shift(&mut self, places: i32) {
        if !self.is_zero() {
            self.point += places;
        }
    }

    /// Round half away from zero to `max_fraction` fraction digits
    pub fn round_to_fraction(&mut self, max_fraction: u32) {
        self.round_at(self.point + max_fraction as i32);
    }

    /// Round half away from zero to `max_significant` significant digits
    pub fn round_to_significant(&mut self, max_significant: u32) {
        self.round_at(max_significant as i32);
    }

    /// Keep the first `keep` digits, rounding on the next one
    fn round_at(&mut self, keep: i32) {
        if keep >= self.digits.len() as i32 {
            return;
        }
        if keep < 0 {
            *self = Self::zero();
            return;
        }

        let keep = keep as usize;
        let round_up = self.digits[keep] >= 5;
        self.digits.truncate(keep);

        if round_up {
            let mut carry = true;
            for i in (0..self.digits.len()).rev() {
                if !carry {
                    break;
                }
                self.digits[i] += 1;
                if self.digits[i] == 10 {
                    self.digits[i] = 0;
                } else {
                    carry = false;
                }
            }
            if carry {
                // Carry out of the first digit (or nothing kept at all)
                self.digits.insert(0, 1);
                self.point += 1;
            }
        }
        self.normalize();
    }

    /// Integer and fraction digit strings, without padding
    ///
    /// The integer string is empty for values below one.
    pub fn split(&self) -> (String, String) {
        let mut integer = String::new();
        let mut fraction = String::new();
        if self.is_zero() {
            return (integer, fraction);
        }

        for _ in 0..(-self.point).max(0) {
            fraction.push('0');
        }
        for (i, d) in self.digits.iter().enumerate() {
            let c = char::from(b'0' + d);
            if (i as i32) < self.point {
                integer.push(c);
            } else {
                fraction.push(c);
            }
        }
        for _ in self.digits.len() as i32..self.point {
            integer.push('0');
        }
        (integer, fraction)
    }

    /// Number of significant digits currently held
    pub fn significant_len(&self) -> usize {
        self.digits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounded(value: f64, fraction: u32) -> (String, String) {
        let mut d = DigitString::from_f64(value);
        d.round_to_fraction(fraction);
        d.split()
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(
            DigitString::from_f64(1234.5).split(),
            ("1234".to_string(), "5".to_string())
        );
        assert_eq!(
            DigitString::from_f64(0.00045).split(),
            (String::new(), "00045".to_string())
        );
        assert_eq!(
            DigitString::from_f64(1.5e21).split(),
            ("1500000000000000000000".to_string(), String::new())
        );
        assert!(DigitString::from_f64(0.0).is_zero());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(rounded(0.04, 1), (String::new(), String::new()));
        assert_eq!(rounded(0.05, 1), (String::new(), "1".to_string()));
        assert_eq!(rounded(0.95, 1), ("1".to_string(), String::new()));
        assert_eq!(rounded(0.994, 2), (String::new(), "99".to_string()));
        assert_eq!(rounded(0.995, 2), ("1".to_string(), String::new()));
        assert_eq!(rounded(1.005, 2), ("1".to_string(), "01".to_string()));
        assert_eq!(rounded(1234.567, 2), ("1234".to_string(), "57".to_string()));
        assert_eq!(rounded(0.0006, 3), (String::new(), "001".to_string()));
        assert_eq!(rounded(999.9, 0), ("1000".to_string(), String::new()));
    }

    #[test]
    fn test_significant_rounding() {
        let mut d = DigitString::from_f64(123456.0);
        d.round_to_significant(2);
        assert_eq!(d.split(), ("120000".to_string(), String::new()));

        let mut d = DigitString::from_f64(0.0012345);
        d.round_to_significant(3);
        assert_eq!(d.split(), (String::new(), "00123".to_string()));
        assert_eq!(d.significant_len(), 3);
    }

    #[test]
    fn test_shift_and_magnitude() {
        let mut d = DigitString::from_f64(0.1234);
        assert_eq!(d.magnitude(), Some(-1));
        d.shift(2);
        assert_eq!(d.split(), ("12".to_string(), "34".to_string()));
        assert_eq!(DigitString::from_numeral("001200.50").split(), ("1200".to_string(), "5".to_string()));
    }
}
