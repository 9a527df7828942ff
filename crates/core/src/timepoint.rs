use crate::error::TimepointError;
use std::cmp::Ordering;
use std::fmt;

/// A named survey epoch such as `TP3`.
///
/// Chronological order comes from the trailing integer of the name, so
/// `TP2 < TP10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timepoint {
    name: String,
    ordinal: u64,
}

impl Timepoint {
    pub fn parse(name: impl Into<String>) -> Result<Self, TimepointError> {
        let name = name.into();
        let digits_start = name
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i);

        let ordinal = digits_start
            .and_then(|start| name[start..].parse::<u64>().ok())
            .ok_or_else(|| TimepointError::MissingOrdinal(name.clone()))?;

        Ok(Self { name, ordinal })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }
}

impl Ord for Timepoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal
            .cmp(&other.ordinal)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Timepoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Returns the two timepoint names as `(earlier, later)`.
pub fn order_timepoints<'a>(a: &'a str, b: &'a str) -> Result<(&'a str, &'a str), TimepointError> {
    let ta = Timepoint::parse(a)?;
    let tb = Timepoint::parse(b)?;
    if ta <= tb {
        Ok((a, b))
    } else {
        Ok((b, a))
    }
}
