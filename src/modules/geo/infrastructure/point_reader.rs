//! Reader for the point dataset: a headered `id,lng,lat` CSV with one row
//! per registry unit.

use crate::modules::geo::domain::entities::UnitPoint;
use crate::shared::errors::AppResult;
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

/// Number of data rows, without deserializing them.
pub fn count_points(path: &Path) -> AppResult<usize> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut record = csv::ByteRecord::new();
    let mut count = 0;
    while reader.read_byte_record(&mut record)? {
        count += 1;
    }
    Ok(count)
}

/// Iterator over the rows whose index falls in `range`.
pub struct PointRangeReader<R: Read> {
    records: csv::DeserializeRecordsIntoIter<R, UnitPoint>,
    remaining: usize,
}

impl PointRangeReader<File> {
    pub fn open(path: &Path, range: Range<usize>) -> AppResult<Self> {
        Self::from_reader(File::open(path)?, range)
    }
}

impl<R: Read> PointRangeReader<R> {
    pub fn from_reader(inner: R, range: Range<usize>) -> AppResult<Self> {
        let reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(inner);
        let mut records = reader.into_deserialize::<UnitPoint>();

        // Skip by raw position; a malformed row still counts as one index.
        for _ in 0..range.start {
            if records.next().is_none() {
                break;
            }
        }

        Ok(Self {
            records,
            remaining: range.len(),
        })
    }
}

impl<R: Read> Iterator for PointRangeReader<R> {
    type Item = AppResult<UnitPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.records.next().map(|r| r.map_err(Into::into))
    }
}
