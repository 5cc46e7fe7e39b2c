/* CVIAbsoluteTime: whole seconds since 1904-01-01 UTC in `msb`, the fraction of
 * a second in units of 2^-64 s in `lsb`. */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/* Seconds between 1904-01-01 and 1970-01-01 */
pub const SECONDS_1904_TO_1970: i64 = 2_082_844_800;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct CviTime {
    pub lsb: u64,
    pub msb: i64,
}

impl CviTime {
    pub fn from_datetime(time: &DateTime<Utc>) -> Self {
        let nanos = time.timestamp_subsec_nanos() as u128;
        /* round up so the conversion back yields the same nanosecond */
        let fraction = ((nanos << 64) + NANOS_PER_SECOND - 1) / NANOS_PER_SECOND;
        Self {
            lsb: fraction as u64,
            msb: time.timestamp() + SECONDS_1904_TO_1970,
        }
    }

    /// None when the instant is outside the range chrono can represent.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let seconds = self.msb.checked_sub(SECONDS_1904_TO_1970)?;
        let nanos = ((self.lsb as u128 * NANOS_PER_SECOND) >> 64) as u32;
        DateTime::from_timestamp(seconds, nanos)
    }
}

impl From<DateTime<Utc>> for CviTime {
    fn from(time: DateTime<Utc>) -> Self {
        CviTime::from_datetime(&time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn epoch_offsets() {
        let unix_epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(CviTime::from_datetime(&unix_epoch), CviTime { lsb: 0, msb: SECONDS_1904_TO_1970 });

        let labview_epoch = CviTime { lsb: 0, msb: 0 }.to_datetime().unwrap();
        assert_eq!(labview_epoch, Utc.with_ymd_and_hms(1904, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn half_second_is_top_bit() {
        let time = DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap();
        let cvi = CviTime::from(time);
        assert_eq!(cvi.lsb, 1u64 << 63);
        assert_eq!(cvi.to_datetime(), Some(time));
    }

    #[test]
    fn nanoseconds_survive_conversion() {
        for nanos in [1, 7, 123_456_789, 999_999_999] {
            let time = DateTime::from_timestamp(1_234_567_890, nanos).unwrap();
            assert_eq!(CviTime::from(time).to_datetime(), Some(time));
        }
    }
}
