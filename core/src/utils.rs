//! Utility functions and types.

use std::fmt::Debug;

/// Redact hides secrets like access keys and session tokens from `Debug` output.
///
/// Values shorter than 12 characters are fully masked. Longer values keep their
/// first and last three characters so two different keys stay distinguishable
/// in logs.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact(value.as_deref().unwrap_or_default())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let length = self.0.len();
        match length {
            0 => f.write_str("EMPTY"),
            1..=11 => f.write_str("***"),
            _ => {
                f.write_str(&self.0[..3])?;
                f.write_str("***")?;
                f.write_str(&self.0[length - 3..])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        let cases = vec![
            ("", "EMPTY"),
            ("AKIDSHORT", "***"),
            ("AKIDEXAMPLE", "***"),
            ("AKIDEXAMPLE1", "AKI***LE1"),
            ("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", "wJa***KEY"),
        ];

        for (input, expected) in cases {
            assert_eq!(
                format!("{:?}", Redact(input)),
                expected,
                "Failed on input: {}",
                input
            );
        }
    }

    #[test]
    fn test_redact_option() {
        let none: Option<String> = None;
        assert_eq!(format!("{:?}", Redact::from(&none)), "EMPTY");

        let some = Some("session-token-value".to_string());
        assert_eq!(format!("{:?}", Redact::from(&some)), "ses***lue");
    }
}
