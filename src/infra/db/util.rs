use time::OffsetDateTime;

use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

pub(super) fn convert_id(value: i64, field: &'static str) -> Result<u64, RepoError> {
    u64::try_from(value).map_err(|_| RepoError::invalid_data(format!("negative {field}: {value}")))
}

pub(super) fn convert_count(value: i64, field: &'static str) -> Result<u32, RepoError> {
    u32::try_from(value)
        .map_err(|_| RepoError::invalid_data(format!("{field} out of range: {value}")))
}

/// Counters are epoch milliseconds of the latest post modification. A scope
/// without posts reports zero.
pub(super) fn counter_from_time(value: Option<OffsetDateTime>) -> u64 {
    value.map_or(0, |time| {
        u64::try_from(time.unix_timestamp_nanos() / 1_000_000).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }

    #[test]
    fn counters_are_epoch_millis() {
        assert_eq!(counter_from_time(None), 0);
        assert_eq!(
            counter_from_time(Some(datetime!(2024-01-01 00:00:00.250 UTC))),
            1_704_067_200_250
        );
    }

    #[test]
    fn negative_ids_are_invalid() {
        assert!(matches!(
            convert_id(-1, "thread id"),
            Err(RepoError::InvalidData { .. })
        ));
        assert_eq!(convert_id(7, "thread id").unwrap(), 7);
    }
}
