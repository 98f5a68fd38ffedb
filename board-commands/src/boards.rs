use blv_common::{BatchId, SerialId};
use std::{fs::File, io::Read, path::Path};
use thiserror::Error;

const BOARD_BATCH_COLUMN: &str = "Board_Batch";
const BOARD_SERIAL_COLUMN: &str = "Board_Serial";
const SENSOR_TYPE_COLUMN: &str = "Sensor_Type";
const KWJ_BATCH_COLUMN: &str = "KWJ_Batch";
const KWJ_SERIAL_COLUMN: &str = "KWJ_Serial";

#[derive(Debug, Error)]
pub(crate) enum BoardsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column '{0}' missing from sensor boards database header")]
    MissingColumn(&'static str),
    #[error("Row {row}: cannot parse '{value}'")]
    MalformedValue { row: usize, value: String },
}

/// One gas sensor fitted to a board: its type and the batch/serial it was
/// calibrated under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FittedSensor {
    pub(crate) sensor_type: String,
    pub(crate) batch: BatchId,
    pub(crate) serial: SerialId,
}

pub(crate) fn sensors_for_board(
    path: &Path,
    board_batch: BatchId,
    board_serial: SerialId,
) -> Result<Vec<FittedSensor>, BoardsError> {
    sensors_from_reader(File::open(path)?, board_batch, board_serial)
}

/// Scans the sensor boards database for every sensor fitted to the given
/// board. A board normally carries one row per gas type.
pub(crate) fn sensors_from_reader(
    input: impl Read,
    board_batch: BatchId,
    board_serial: SerialId,
) -> Result<Vec<FittedSensor>, BoardsError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or(BoardsError::MissingColumn(name))
    };
    let board_batch_index = column(BOARD_BATCH_COLUMN)?;
    let board_serial_index = column(BOARD_SERIAL_COLUMN)?;
    let sensor_type_index = column(SENSOR_TYPE_COLUMN)?;
    let kwj_batch_index = column(KWJ_BATCH_COLUMN)?;
    let kwj_serial_index = column(KWJ_SERIAL_COLUMN)?;

    let mut sensors = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |index: usize| record.get(index).unwrap_or_default().trim();
        let number = |index: usize| -> Result<u32, BoardsError> {
            cell(index).parse().map_err(|_| BoardsError::MalformedValue {
                row,
                value: cell(index).to_owned(),
            })
        };
        if number(board_batch_index)? == board_batch
            && number(board_serial_index)? == board_serial
        {
            sensors.push(FittedSensor {
                sensor_type: cell(sensor_type_index).to_owned(),
                batch: number(kwj_batch_index)?,
                serial: number(kwj_serial_index)?,
            });
        }
    }
    Ok(sensors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Board_Batch,Board_Serial,Sensor_Type,KWJ_Batch,KWJ_Serial
3,14,CO,101,7
3,14,NO2,205,9
3,15,CO,101,8
";

    #[test]
    fn all_sensors_on_the_board_are_found() {
        let sensors = sensors_from_reader(SAMPLE.as_bytes(), 3, 14).unwrap();
        assert_eq!(
            sensors,
            vec![
                FittedSensor {
                    sensor_type: "CO".to_owned(),
                    batch: 101,
                    serial: 7
                },
                FittedSensor {
                    sensor_type: "NO2".to_owned(),
                    batch: 205,
                    serial: 9
                },
            ]
        );
    }

    #[test]
    fn unknown_board_yields_nothing() {
        let sensors = sensors_from_reader(SAMPLE.as_bytes(), 9, 9).unwrap();
        assert!(sensors.is_empty());
    }

    #[test]
    fn missing_column_is_reported() {
        let sample = "Board_Batch,Board_Serial\n3,14\n";
        assert!(matches!(
            sensors_from_reader(sample.as_bytes(), 3, 14),
            Err(BoardsError::MissingColumn(SENSOR_TYPE_COLUMN))
        ));
    }
}
