use thiserror::Error;

/// Parameter-range verdict attached to every evaluation.
///
/// The model never aborts: a numeric loss is always produced, and this
/// code qualifies how much to trust it. Codes 3 and above mean the
/// result is probably invalid.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Warning {
    #[error("no warnings")]
    None,

    #[error("some parameters are nearly out of range; results should be used with caution")]
    NearlyOutOfRange,

    #[error("default parameters have been substituted for impossible ones")]
    DefaultsSubstituted,

    #[error("a combination of parameters is out of range; results are probably invalid")]
    CombinationOutOfRange,

    #[error("some parameters are out of range; results are probably invalid")]
    OutOfRange,
}

impl Warning {
    pub fn from_code(kwx: i32) -> Self {
        match kwx {
            i32::MIN..=0 => Warning::None,
            1 => Warning::NearlyOutOfRange,
            2 => Warning::DefaultsSubstituted,
            3 => Warning::CombinationOutOfRange,
            _ => Warning::OutOfRange,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Warning::None => 0,
            Warning::NearlyOutOfRange => 1,
            Warning::DefaultsSubstituted => 2,
            Warning::CombinationOutOfRange => 3,
            Warning::OutOfRange => 4,
        }
    }
}
