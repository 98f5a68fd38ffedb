use blv_common::{BatchId, Real, SlotId};
use std::{collections::HashMap, fs::File, io::Read, path::Path};
use thiserror::Error;

const BATCH_COLUMN: &str = "Batch";
const SLOT_COLUMN: &str = "Slot";
const SENSITIVITY_COLUMN: &str = "Sensitivity_nA_ppm";

#[derive(Debug, Error)]
pub(crate) enum SensitivityError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column '{0}' missing from sensitivity database header")]
    MissingColumn(&'static str),
    #[error("Row {row}: cannot parse '{value}'")]
    MalformedValue { row: usize, value: String },
}

/// Native sensitivity of each manufactured sensor, keyed by the batch it
/// came from and the jig slot it occupied. A miss is not an error; the
/// affected channel simply loses its concentration scaling.
#[derive(Debug, Default, Clone)]
pub(crate) struct SensitivityTable {
    entries: HashMap<(BatchId, SlotId), Real>,
}

impl SensitivityTable {
    pub(crate) fn from_path(path: &Path) -> Result<Self, SensitivityError> {
        Self::from_reader(File::open(path)?)
    }

    pub(crate) fn from_reader(input: impl Read) -> Result<Self, SensitivityError> {
        let mut reader = csv::Reader::from_reader(input);
        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or(SensitivityError::MissingColumn(name))
        };
        let batch_index = column(BATCH_COLUMN)?;
        let slot_index = column(SLOT_COLUMN)?;
        let sensitivity_index = column(SENSITIVITY_COLUMN)?;

        let mut entries = HashMap::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let cell = |index: usize| record.get(index).unwrap_or_default().trim();
            let parse_error = |value: &str| SensitivityError::MalformedValue {
                row,
                value: value.to_owned(),
            };
            let batch: BatchId = cell(batch_index)
                .parse()
                .map_err(|_| parse_error(cell(batch_index)))?;
            let slot: SlotId = cell(slot_index)
                .parse()
                .map_err(|_| parse_error(cell(slot_index)))?;
            let sensitivity: Real = cell(sensitivity_index)
                .parse()
                .map_err(|_| parse_error(cell(sensitivity_index)))?;
            entries.insert((batch, slot), sensitivity);
        }
        Ok(Self { entries })
    }

    pub(crate) fn lookup(&self, batch: BatchId, slot: SlotId) -> Option<Real> {
        self.entries.get(&(batch, slot)).copied()
    }
}
