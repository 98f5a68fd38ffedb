use blv_common::{Real, SlotId, MAX_SLOTS_PER_BATCH};
use std::{fs::File, io::Read, path::Path};
use thiserror::Error;
use tracing::warn;

pub(crate) const TIMESTAMP_COLUMN: &str = "Timestamp";
pub(crate) const SENSOR_TYPE_COLUMN: &str = "Sensor_Type";
pub(crate) const TEMPERATURE_COLUMN: &str = "Temperature_degC";
pub(crate) const HUMIDITY_COLUMN: &str = "Humidity_%";

/// Voltage columns are recognized by this substring in their header.
pub(crate) const CHANNEL_COLUMN_TAG: &str = "Slot";

#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column '{0}' missing from header row")]
    MissingColumn(&'static str),
    #[error("Channel column '{0}' carries no slot number")]
    MalformedChannelName(String),
    #[error("Row {row}: cannot parse {column} value '{value}'")]
    MalformedNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("Log file contains no data rows")]
    Empty,
}

/// One voltage column; cells which failed to parse stay missing until the
/// filter stage forward-fills them.
#[derive(Debug, Clone)]
pub(crate) struct ChannelColumn {
    pub(crate) name: String,
    pub(crate) slot: SlotId,
    pub(crate) voltage: Vec<Option<Real>>,
}

/// A full log transposed into column vectors, time-ordered.
#[derive(Debug, Clone)]
pub(crate) struct LogFile {
    pub(crate) time: Vec<Real>,
    pub(crate) sensor_type: Vec<String>,
    pub(crate) temperature: Vec<Real>,
    pub(crate) humidity: Vec<Real>,
    pub(crate) channels: Vec<ChannelColumn>,
}

impl LogFile {
    pub(crate) fn len(&self) -> usize {
        self.time.len()
    }
}

/// First run of decimal digits embedded in a channel column header.
fn parse_slot(name: &str) -> Option<SlotId> {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn parse_cell(
    row: usize,
    column: &'static str,
    value: &str,
) -> Result<Real, LoadError> {
    value
        .trim()
        .parse()
        .map_err(|_| LoadError::MalformedNumber {
            row,
            column,
            value: value.to_owned(),
        })
}

pub(crate) fn load_log_file(path: &Path) -> Result<LogFile, LoadError> {
    read_log(File::open(path)?)
}

/// Parses a CSV log into column vectors. The timestamp, sensor type,
/// temperature and humidity columns are required; every header containing
/// [`CHANNEL_COLUMN_TAG`] becomes a channel. Voltage cells which are not
/// finite numbers are kept as missing rather than rejected.
pub(crate) fn read_log(input: impl Read) -> Result<LogFile, LoadError> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or(LoadError::MissingColumn(name))
    };
    let time_index = column(TIMESTAMP_COLUMN)?;
    let sensor_type_index = column(SENSOR_TYPE_COLUMN)?;
    let temperature_index = column(TEMPERATURE_COLUMN)?;
    let humidity_index = column(HUMIDITY_COLUMN)?;

    let channel_columns: Vec<(usize, String, SlotId)> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| header.contains(CHANNEL_COLUMN_TAG))
        .map(|(index, header)| {
            let slot = parse_slot(header)
                .ok_or_else(|| LoadError::MalformedChannelName(header.to_owned()))?;
            if slot == 0 || slot > MAX_SLOTS_PER_BATCH {
                warn!("Channel column '{header}' names slot {slot}, outside 1..={MAX_SLOTS_PER_BATCH}");
            }
            Ok((index, header.to_owned(), slot))
        })
        .collect::<Result<_, LoadError>>()?;

    let mut log = LogFile {
        time: Vec::new(),
        sensor_type: Vec::new(),
        temperature: Vec::new(),
        humidity: Vec::new(),
        channels: channel_columns
            .iter()
            .map(|(_, name, slot)| ChannelColumn {
                name: name.clone(),
                slot: *slot,
                voltage: Vec::new(),
            })
            .collect(),
    };

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |index: usize| record.get(index).unwrap_or_default();

        let time = parse_cell(row, TIMESTAMP_COLUMN, cell(time_index))?;
        if let Some(previous) = log.time.last() {
            if time < *previous {
                warn!("Row {row}: timestamp {time} precedes {previous}");
            }
        }
        log.time.push(time);
        log.sensor_type.push(cell(sensor_type_index).to_owned());
        log.temperature.push(parse_cell(
            row,
            TEMPERATURE_COLUMN,
            cell(temperature_index),
        )?);
        log.humidity
            .push(parse_cell(row, HUMIDITY_COLUMN, cell(humidity_index))?);

        for ((index, _, _), channel) in channel_columns.iter().zip(&mut log.channels) {
            let voltage = cell(*index).trim().parse::<Real>().ok().filter(|v| v.is_finite());
            channel.voltage.push(voltage);
        }
    }

    if log.time.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Timestamp,Sensor_Type,Temperature_degC,Humidity_%,Slot_01_V,Slot_12_V
0,CO,20.0,40.1,0.501,1.001
1,CO,20.1,40.0,0.502,
2,CO,20.2,39.9,garbage,1.003
";

    #[test]
    fn columns_are_transposed_and_typed() {
        let log = read_log(SAMPLE.as_bytes()).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.time, vec![0.0, 1.0, 2.0]);
        assert_eq!(log.sensor_type[0], "CO");
        assert_eq!(log.temperature, vec![20.0, 20.1, 20.2]);
        assert_eq!(log.channels.len(), 2);
    }

    #[test]
    fn slot_numbers_come_from_the_header() {
        let log = read_log(SAMPLE.as_bytes()).unwrap();
        assert_eq!(log.channels[0].slot, 1);
        assert_eq!(log.channels[1].slot, 12);
    }

    #[test]
    fn unparseable_voltage_cells_stay_missing() {
        let log = read_log(SAMPLE.as_bytes()).unwrap();
        assert_eq!(log.channels[0].voltage, vec![Some(0.501), Some(0.502), None]);
        assert_eq!(log.channels[1].voltage, vec![Some(1.001), None, Some(1.003)]);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let sample = "Timestamp,Sensor_Type,Humidity_%\n0,CO,40.0\n";
        assert!(matches!(
            read_log(sample.as_bytes()),
            Err(LoadError::MissingColumn(TEMPERATURE_COLUMN))
        ));
    }

    #[test]
    fn channel_header_without_digits_is_rejected() {
        let sample = "Timestamp,Sensor_Type,Temperature_degC,Humidity_%,Slot_V\n0,CO,20.0,40.0,0.5\n";
        assert!(matches!(
            read_log(sample.as_bytes()),
            Err(LoadError::MalformedChannelName(_))
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let sample = "Timestamp,Sensor_Type,Temperature_degC,Humidity_%\n";
        assert!(matches!(read_log(sample.as_bytes()), Err(LoadError::Empty)));
    }
}
