//! Initialization of the time parameters `\time`, `\day`, `\month` and `\year`.
//!
//! The parameters themselves are ordinary integer parameters; this module only sets their
//!     initial values when a job starts.

#[cfg(feature = "time")]
use chrono::prelude::*;
use texweave::group::{Address, IntegerParameter, Scope};
use texweave::vm;

/// A point in time in the form TeX stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub minutes_since_midnight: i32,
    pub day: i32,
    pub month: i32,
    pub year: i32,
}

impl Timestamp {
    /// The current local time.
    #[cfg(feature = "time")]
    pub fn now() -> Timestamp {
        let dt: DateTime<Local> = Local::now();
        Timestamp {
            minutes_since_midnight: 60 * (dt.hour() as i32) + (dt.minute() as i32),
            day: dt.day() as i32,
            month: dt.month() as i32,
            year: dt.year(),
        }
    }

    /// Noon on 4 July 1776, the value INITEX uses when the system clock is not available.
    #[cfg(not(feature = "time"))]
    pub fn now() -> Timestamp {
        Timestamp::INITEX
    }

    pub const INITEX: Timestamp = Timestamp {
        minutes_since_midnight: 12 * 60,
        day: 4,
        month: 7,
        year: 1776,
    };
}

/// Sets the time parameters globally.
pub fn initialize<S>(vm: &mut vm::VM<S>, timestamp: Timestamp) {
    let chain = vm.chain_mut();
    for (parameter, value) in [
        (IntegerParameter::Time, timestamp.minutes_since_midnight),
        (IntegerParameter::Day, timestamp.day),
        (IntegerParameter::Month, timestamp.month),
        (IntegerParameter::Year, timestamp.year),
    ] {
        chain.set_integer(Address::Integer(parameter), value, Scope::Global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn fixed_time(vm: &mut vm::VM<State>) {
        initialize(
            vm,
            Timestamp {
                minutes_since_midnight: 75,
                day: 18,
                month: 10,
                year: 2026,
            },
        );
    }

    test_suite![
        options(
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::CustomVMInitialization(fixed_time),
        ),
        expansion_equality_tests(
            (time, r"\the\time", "75"),
            (day, r"\the\day", "18"),
            (month, r"\the\month", "10"),
            (year, r"\the\year", "2026"),
            (time_is_a_variable, r"{\global\time=100 }\the\time", "100"),
        ),
    ];

    #[test]
    fn now_is_plausible() {
        let now = Timestamp::now();
        assert!((0..24 * 60).contains(&now.minutes_since_midnight));
        assert!((1..=31).contains(&now.day));
        assert!((1..=12).contains(&now.month));
    }
}
