use csv::{ReaderBuilder, Trim};
use payrun_core::{Address, PayoutRequest};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Fixture loading failures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("fixture io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fixture parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// One fixture row: a native pairing and a token pairing.
type FixtureRow = (Address, u64, Address, u64);

/// Tabular payout fixture.
///
/// Each row is `native_recipient,native_amount,token_recipient,token_amount`
/// with no header line; rows zip into the four parallel request sequences.
#[derive(Debug, Clone, Default)]
pub struct PayoutFixture {
    rows: Vec<FixtureRow>,
}

impl PayoutFixture {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FixtureError> {
        let mut rows = Vec::new();
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .from_reader(reader);
        for row in csv_reader.deserialize::<FixtureRow>() {
            rows.push(row?);
        }
        Ok(Self { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        Self::from_reader(File::open(path)?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total amount per asset class, for funding custody to exactly what the
    /// batch will distribute.
    pub fn totals(&self) -> (u64, u64) {
        self.rows.iter().fold((0u64, 0u64), |(native, token), row| {
            (
                native.saturating_add(row.1),
                token.saturating_add(row.3),
            )
        })
    }

    /// Assemble the batch request the engine consumes.
    pub fn request(&self) -> PayoutRequest {
        PayoutRequest {
            native_recipients: self.rows.iter().map(|row| row.0).collect(),
            native_amounts: self.rows.iter().map(|row| row.1).collect(),
            token_recipients: self.rows.iter().map(|row| row.2).collect(),
            token_amounts: self.rows.iter().map(|row| row.3).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::derive_account;
    use std::io::Cursor;

    fn fixture_csv(rows: usize) -> String {
        (0..rows as u64)
            .map(|i| {
                format!(
                    "{},{},{},{}\n",
                    derive_account("fixture-native", i),
                    (i + 1) * 100,
                    derive_account("fixture-token", i),
                    10
                )
            })
            .collect()
    }

    #[test]
    fn parses_rows_into_parallel_sequences() {
        let fixture = PayoutFixture::from_reader(Cursor::new(fixture_csv(3))).unwrap();
        assert_eq!(fixture.len(), 3);

        let request = fixture.request();
        assert_eq!(request.native_recipients.len(), 3);
        assert_eq!(request.native_amounts, vec![100, 200, 300]);
        assert_eq!(request.token_amounts, vec![10, 10, 10]);
        assert_eq!(
            request.native_recipients[0],
            derive_account("fixture-native", 0)
        );
    }

    #[test]
    fn totals_sum_each_asset_class() {
        let fixture = PayoutFixture::from_reader(Cursor::new(fixture_csv(4))).unwrap();
        assert_eq!(fixture.totals(), (100 + 200 + 300 + 400, 40));
    }

    #[test]
    fn whitespace_around_fields_is_tolerated() {
        let row = format!(
            "{} , 250 , {} , 10\n",
            derive_account("a", 0),
            derive_account("b", 0)
        );
        let fixture = PayoutFixture::from_reader(Cursor::new(row)).unwrap();
        assert_eq!(fixture.totals(), (250, 10));
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        let bad = "not-an-address,100,also-bad,10\n";
        assert!(matches!(
            PayoutFixture::from_reader(Cursor::new(bad)),
            Err(FixtureError::Csv(_))
        ));
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        let bad = format!(
            "{},lots,{},10\n",
            derive_account("a", 0),
            derive_account("b", 0)
        );
        assert!(matches!(
            PayoutFixture::from_reader(Cursor::new(bad)),
            Err(FixtureError::Csv(_))
        ));
    }

    #[test]
    fn empty_input_yields_an_empty_batch() {
        let fixture = PayoutFixture::from_reader(Cursor::new("")).unwrap();
        assert!(fixture.is_empty());
        assert_eq!(fixture.totals(), (0, 0));
    }
}
