//! Script name and schedule rules

use crate::error::{Error, RejectReason, Result};

/// Required suffix of every script name.
pub const SCRIPT_EXTENSION: &str = ".sh";
/// Suffix of the paired metadata record.
pub const METADATA_EXTENSION: &str = ".json";
/// Longest accepted stem.
pub const MAX_STEM_LEN: usize = 128;

/// Check `name` and return its stem.
///
/// A valid name is `<stem>.sh` where the stem is 1..=128 ASCII letters,
/// digits, `-` or `_`.
pub fn validate_script_name(name: &str) -> Result<&str> {
    let stem = name.strip_suffix(SCRIPT_EXTENSION).ok_or_else(|| {
        Error::rejected(
            RejectReason::InvalidName,
            format!("script name '{}' must end with {}", name, SCRIPT_EXTENSION),
        )
    })?;
    if stem.is_empty() || stem.len() > MAX_STEM_LEN {
        return Err(Error::rejected(
            RejectReason::InvalidName,
            format!("script name must be 1 to {} characters before the extension", MAX_STEM_LEN),
        ));
    }
    if !stem
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::rejected(
            RejectReason::InvalidName,
            "script name may only contain letters, digits, hyphens and underscores",
        ));
    }
    Ok(stem)
}

/// Check a cron-style schedule. Blank means unscheduled and yields `None`;
/// otherwise the five fields are returned joined by single spaces.
pub fn validate_schedule(schedule: &str) -> Result<Option<String>> {
    let fields: Vec<&str> = schedule.split_whitespace().collect();
    match fields.len() {
        0 => Ok(None),
        5 => Ok(Some(fields.join(" "))),
        n => Err(Error::rejected(
            RejectReason::InvalidSchedule,
            format!("schedule must have exactly 5 fields, got {}", n),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(validate_script_name("backup.sh").unwrap(), "backup");
        assert_eq!(validate_script_name("a-b_C9.sh").unwrap(), "a-b_C9");
        let longest = format!("{}.sh", "x".repeat(MAX_STEM_LEN));
        assert!(validate_script_name(&longest).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        let too_long = format!("{}.sh", "x".repeat(MAX_STEM_LEN + 1));
        for name in [
            "",
            ".sh",
            "backup",
            "backup.bash",
            "../evil.sh",
            "dir/evil.sh",
            "with space.sh",
            "semi;colon.sh",
            "ünïcode.sh",
            "evil.sh.sh.",
            too_long.as_str(),
        ] {
            assert!(validate_script_name(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_schedule_rules() {
        assert_eq!(validate_schedule("").unwrap(), None);
        assert_eq!(validate_schedule("   ").unwrap(), None);
        assert_eq!(
            validate_schedule("*/5 * * * *").unwrap().as_deref(),
            Some("*/5 * * * *")
        );
        assert_eq!(
            validate_schedule("  0   9 *\t* 1-5 ").unwrap().as_deref(),
            Some("0 9 * * 1-5")
        );
        assert!(validate_schedule("* * *").is_err());
        assert!(validate_schedule("* * * * * *").is_err());
    }
}
