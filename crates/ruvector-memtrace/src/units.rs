use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed byte quantity: either a delta between two samples or an
/// absolute reading.
///
/// `Display` prints the floored megabyte figure, which is what result
/// tables show next to an "MB" suffix. Use [`Memory::human`] for a unit-scaled
/// string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Memory {
    pub bytes: i64,
}

impl Memory {
    pub const fn new(bytes: i64) -> Self {
        Self { bytes }
    }

    pub fn mega_bytes(&self) -> i64 {
        bytes_to_mega_bytes(self.bytes)
    }

    pub fn human(&self) -> String {
        bytes_to_human_readable(self.bytes)
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mega_bytes())
    }
}

impl std::ops::Add for Memory {
    type Output = Memory;

    fn add(self, rhs: Memory) -> Memory {
        Memory::new(self.bytes + rhs.bytes)
    }
}

impl std::ops::AddAssign for Memory {
    fn add_assign(&mut self, rhs: Memory) {
        self.bytes += rhs.bytes;
    }
}

/// Convert bytes to whole megabytes (floor, `x >> 20`).
pub fn bytes_to_mega_bytes(bytes: i64) -> i64 {
    bytes >> 20
}

/// Format a byte count with three decimals and the largest unit that keeps
/// the magnitude under 1024. Negative values use the same thresholds.
pub fn bytes_to_human_readable(bytes: i64) -> String {
    let mut amount = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if amount > -1024.0 && amount < 1024.0 {
            return format!("{amount:.3}{unit}");
        }
        amount /= 1024.0;
    }
    format!("{amount:.3}TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mega_bytes_is_shift() {
        assert_eq!(bytes_to_mega_bytes(1_048_576), 1);
        assert_eq!(bytes_to_mega_bytes(1_500_000), 1);
        assert_eq!(bytes_to_mega_bytes(0), 0);
        for x in [0i64, 1, 1023, 1 << 20, (1 << 20) - 1, 123_456_789, i64::MAX] {
            assert_eq!(bytes_to_mega_bytes(x), x >> 20);
        }
    }

    #[test]
    fn human_readable_units() {
        assert_eq!(bytes_to_human_readable(0), "0.000B");
        assert_eq!(bytes_to_human_readable(1023), "1023.000B");
        assert_eq!(bytes_to_human_readable(1024), "1.000KB");
        assert_eq!(bytes_to_human_readable(1_048_576), "1.000MB");
        assert_eq!(bytes_to_human_readable(1 << 30), "1.000GB");
        assert_eq!(bytes_to_human_readable(1 << 40), "1.000TB");
        assert_eq!(bytes_to_human_readable(3 << 41), "6.000TB");
    }

    #[test]
    fn human_readable_negative() {
        assert_eq!(bytes_to_human_readable(-500), "-500.000B");
        assert_eq!(bytes_to_human_readable(-2048), "-2.000KB");
    }

    #[test]
    fn display_prints_megabytes() {
        assert_eq!(Memory::new(5 << 20).to_string(), "5");
        assert_eq!(Memory::new(1_500_000).human(), "1.431MB");
    }

    #[test]
    fn add_assign_accumulates() {
        let mut m = Memory::new(100);
        m += Memory::new(-30);
        assert_eq!(m, Memory::new(70));
        assert_eq!(m + Memory::new(30), Memory::new(100));
    }
}
