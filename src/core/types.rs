//! Core data types shared by the parser, the index and the file operations

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::KeyParseError;

/// One completed recording session, as reconstructed from a volume's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SessionRecord {
    pub(crate) date: NaiveDate,
    /// Device (plane) number exactly as written in the marker filename
    pub(crate) device_id: String,
    /// Directory part of the marker path, as written by the device
    pub(crate) base_path: String,
    /// Marker filename without its `.000` extension; the artifact prefix
    pub(crate) base_filename: String,
    pub(crate) size_bytes: u64,
    pub(crate) started_at: Option<String>,
    pub(crate) finished_at: String,
}

impl SessionRecord {
    /// Date as `20YYMMDD`
    pub(crate) fn date_code(&self) -> String {
        self.date.format("%Y%m%d").to_string()
    }
}

/// A scanned storage root and its operator-assigned id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub(crate) struct VolumeTag {
    pub(crate) root: PathBuf,
    pub(crate) volume_id: u32,
}

impl VolumeTag {
    pub(crate) fn new(root: impl Into<PathBuf>, volume_id: u32) -> Self {
        Self {
            root: root.into(),
            volume_id,
        }
    }
}

/// Identifies a session within one index generation.
///
/// Ordering is date first, then device, then volume, which is also the
/// listing order of the index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct SessionKey {
    pub(crate) date: NaiveDate,
    pub(crate) device_id: String,
    pub(crate) volume_id: u32,
}

impl SessionKey {
    pub(crate) fn for_record(record: &SessionRecord, volume: &VolumeTag) -> Self {
        Self {
            date: record.date,
            device_id: record.device_id.clone(),
            volume_id: volume.volume_id,
        }
    }

    /// `DDMMYY_device`, the filename prefix artifacts share on disk
    pub(crate) fn simplified(&self) -> String {
        format!("{}_{}", self.date.format("%d%m%y"), self.device_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.simplified(), self.volume_id)
    }
}

impl Serialize for SessionKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for SessionKey {
    type Err = KeyParseError;

    /// Accepts `DDMMYY_device_volume` and the operator-facing
    /// `DDMMYYYY_device_volume`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| KeyParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().split('_');
        let (Some(date), Some(device), Some(volume), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected DATE_DEVICE_VOLUME"));
        };

        if !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("date must be digits"));
        }
        let date = match date.len() {
            6 => decode_ddmmyy(date),
            8 => decode_digits(&date[..2], &date[2..4], &date[4..]),
            _ => return Err(invalid("date must be DDMMYY or DDMMYYYY")),
        }
        .ok_or_else(|| invalid("date does not exist"))?;

        if device.is_empty() || !device.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("device id must be digits"));
        }
        let volume_id = volume
            .parse::<u32>()
            .map_err(|_| invalid("volume id must be a number"))?;

        Ok(Self {
            date,
            device_id: device.to_string(),
            volume_id,
        })
    }
}

/// Decode the device's `DDMMYY` date; the year is always 20YY.
pub(crate) fn decode_ddmmyy(digits: &str) -> Option<NaiveDate> {
    if digits.len() != 6 {
        return None;
    }
    let year = format!("20{}", digits.get(4..6)?);
    decode_digits(digits.get(..2)?, digits.get(2..4)?, &year)
}

fn decode_digits(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    if ![day, month, year]
        .iter()
        .all(|part| part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// A record together with the volume it was found on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct IndexedSession {
    pub(crate) key: SessionKey,
    pub(crate) record: SessionRecord,
    pub(crate) volume: VolumeTag,
}

impl IndexedSession {
    pub(crate) fn new(record: SessionRecord, volume: VolumeTag) -> Self {
        Self {
            key: SessionKey::for_record(&record, &volume),
            record,
            volume,
        }
    }
}

/// Inclusive date range used to narrow listings
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DateFilter {
    pub(crate) since: Option<NaiveDate>,
    pub(crate) until: Option<NaiveDate>,
}

impl DateFilter {
    pub(crate) fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self { since, until }
    }

    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        if let Some(s) = self.since
            && date < s
        {
            return false;
        }
        if let Some(u) = self.until
            && date > u
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
pub(crate) fn sample_record(date: (i32, u32, u32), device: &str) -> SessionRecord {
    let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
    let base_filename = format!("{}_{}", date.format("%d%m%y"), device);
    SessionRecord {
        date,
        device_id: device.to_string(),
        base_path: "D:/das".to_string(),
        base_filename,
        size_bytes: 0,
        started_at: Some("09:00:00".to_string()),
        finished_at: "10:00:00".to_string(),
    }
}
