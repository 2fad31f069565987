use chrono::NaiveDate;

use crate::error::AppError;

/// Parse a `--since`/`--until` bound
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    // Try YYYYMMDD
    if s.len() == 8
        && let Ok(d) = NaiveDate::parse_from_str(s, "%Y%m%d")
    {
        return Ok(d);
    }
    // Try YYYY-MM-DD
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    Err(AppError::InvalidDate {
        input: s.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2022, 3, 14).unwrap();
        assert_eq!(parse_date("20220314").unwrap(), expected);
        assert_eq!(parse_date("2022-03-14").unwrap(), expected);
    }

    #[test]
    fn rejects_garbage_and_impossible_dates() {
        for bad in ["", "140322", "2022-02-30", "20221301", "yesterday"] {
            assert!(
                matches!(parse_date(bad), Err(AppError::InvalidDate { .. })),
                "{bad}"
            );
        }
    }
}
