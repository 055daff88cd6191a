use chrono::{Datelike, NaiveDate, Utc};

use crate::limits::*;
use crate::model::StayRange;

use super::EngineError;

/// Today as a calendar date (UTC). Mutations that need "now" take it as a
/// parameter so tests can pin it; this is the production source.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Structural checks on a stay range. Inversion is reported before anything
/// else; a bound on total nights and on the calendar year keeps the per-day
/// expansion finite.
pub(crate) fn validate_range(stay: &StayRange) -> Result<(), EngineError> {
    if stay.is_inverted() {
        return Err(EngineError::InvalidDateRange {
            arrival: stay.arrival,
            departure: stay.departure,
        });
    }
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay too long"));
    }
    if stay.departure.year() > MAX_VALID_YEAR {
        return Err(EngineError::LimitExceeded("date out of range"));
    }
    Ok(())
}

/// Both stay dates must be strictly in the future: a date equal to `today`
/// is rejected.
pub(crate) fn validate_future(stay: &StayRange, today: NaiveDate) -> Result<(), EngineError> {
    if stay.arrival <= today {
        return Err(EngineError::PastDate(stay.arrival));
    }
    if stay.departure <= today {
        return Err(EngineError::PastDate(stay.departure));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn inverted_range_is_invalid() {
        let err = validate_range(&StayRange::new(d(2030, 5, 10), d(2030, 5, 9))).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDateRange { .. }));
    }

    #[test]
    fn same_day_range_is_valid() {
        validate_range(&StayRange::new(d(2030, 5, 10), d(2030, 5, 10))).unwrap();
    }

    #[test]
    fn overlong_stay_rejected() {
        let err = validate_range(&StayRange::new(d(2030, 1, 1), d(2032, 1, 1))).unwrap_err();
        assert!(matches!(err, EngineError::LimitExceeded(_)));
    }

    #[test]
    fn far_future_year_rejected() {
        let err = validate_range(&StayRange::new(d(2201, 1, 1), d(2201, 1, 2))).unwrap_err();
        assert!(matches!(err, EngineError::LimitExceeded(_)));
    }

    #[test]
    fn today_is_not_a_future_date() {
        let today = d(2030, 5, 10);
        let err =
            validate_future(&StayRange::new(today, d(2030, 5, 12)), today).unwrap_err();
        assert_eq!(err, EngineError::PastDate(today));
    }

    #[test]
    fn tomorrow_is_future() {
        let today = d(2030, 5, 10);
        validate_future(&StayRange::new(d(2030, 5, 11), d(2030, 5, 12)), today).unwrap();
    }

    #[test]
    fn past_departure_rejected() {
        let today = d(2030, 5, 10);
        let err =
            validate_future(&StayRange::new(d(2030, 5, 12), d(2030, 5, 9)), today).unwrap_err();
        assert_eq!(err, EngineError::PastDate(d(2030, 5, 9)));
    }
}
