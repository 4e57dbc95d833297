use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::info;

use super::features::derive_features;
use crate::scoring::{normalize_category, normalize_name, AttributeValue, RawRecord, ScoringRequest};

/// Columns coerced to numbers; blanks and unparsable cells take the column median.
pub const NUMERIC_ATTRIBUTES: [&str; 3] = ["tenure", "monthlycharges", "totalcharges"];

/// Training label, never passed to the scorer.
pub const LABEL_ATTRIBUTE: &str = "churn";

const CUSTOMER_ID_COLUMNS: [&str; 2] = ["customerid", "customer_id"];
const NON_NEGATIVE_ATTRIBUTES: [&str; 2] = ["tenure", "monthlycharges"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv input has no header row")]
    MissingHeader,
    #[error("column {0} has an empty header")]
    EmptyColumn(usize),
    #[error("column '{0}' appears more than once after normalization")]
    DuplicateColumn(String),
}

/// Cleaned scoring requests plus what cleaning removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub requests: Vec<ScoringRequest>,
    pub rows_read: usize,
    pub duplicate_rows: usize,
    pub dropped_rows: usize,
}

/// Reads customer exports into scoring requests.
#[derive(Debug, Clone)]
pub struct CsvIngestor {
    numeric: Vec<String>,
    derive_features: bool,
}

impl Default for CsvIngestor {
    fn default() -> Self {
        Self {
            numeric: NUMERIC_ATTRIBUTES.iter().map(|name| name.to_string()).collect(),
            derive_features: false,
        }
    }
}

impl CsvIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric(mut self, attribute: &str) -> Self {
        let attribute = normalize_name(attribute);
        if !self.numeric.contains(&attribute) {
            self.numeric.push(attribute);
        }
        self
    }

    pub fn derive_features(mut self, enabled: bool) -> Self {
        self.derive_features = enabled;
        self
    }

    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Dataset, IngestError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = self.read(BufReader::new(file))?;
        info!(
            path = %path.display(),
            rows = dataset.rows_read,
            kept = dataset.requests.len(),
            duplicates = dataset.duplicate_rows,
            dropped = dataset.dropped_rows,
            "customer export ingested"
        );
        Ok(dataset)
    }

    pub fn read<R: Read>(&self, reader: R) -> Result<Dataset, IngestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(IngestError::MissingHeader);
        }
        let columns = normalized_columns(&headers)?;
        let id_column = columns
            .iter()
            .position(|column| CUSTOMER_ID_COLUMNS.contains(&column.as_str()));

        let mut dataset = Dataset::default();
        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            dataset.rows_read += 1;
            let key: Vec<String> = record.iter().map(str::to_string).collect();
            if seen.insert(key) {
                rows.push(record);
            } else {
                dataset.duplicate_rows += 1;
            }
        }

        let medians: BTreeMap<usize, f64> = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| self.numeric.contains(column))
            .filter_map(|(position, _)| {
                median(rows.iter().filter_map(|row| parse_number(row.get(position)?)))
                    .map(|value| (position, value))
            })
            .collect();

        for (row_number, row) in (1usize..).zip(&rows) {
            let mut attributes = RawRecord::new();
            let mut customer_id = None;

            for (position, (column, raw)) in columns.iter().zip(row.iter()).enumerate() {
                if Some(position) == id_column {
                    if !raw.is_empty() {
                        customer_id = Some(raw.to_string());
                    }
                    continue;
                }
                if column == LABEL_ATTRIBUTE {
                    continue;
                }
                if self.numeric.contains(column) {
                    if let Some(value) = parse_number(raw).or_else(|| medians.get(&position).copied())
                    {
                        attributes.insert(column.clone(), value);
                    }
                    continue;
                }
                if raw.is_empty() {
                    continue;
                }
                match parse_number(raw) {
                    Some(value) => attributes.insert(column.clone(), value),
                    None => attributes.insert(column.clone(), normalize_category(raw)),
                }
            }

            if has_negative(&attributes) {
                dataset.dropped_rows += 1;
                continue;
            }
            if self.derive_features {
                derive_features(&mut attributes);
            }

            // Position in the deduplicated export, stable across dropped rows.
            let customer_id = customer_id.unwrap_or_else(|| row_number.to_string());
            dataset
                .requests
                .push(ScoringRequest::new(attributes).with_customer_id(customer_id));
        }

        Ok(dataset)
    }
}

fn normalized_columns(headers: &csv::StringRecord) -> Result<Vec<String>, IngestError> {
    let mut columns = Vec::with_capacity(headers.len());
    for (index, header) in headers.iter().enumerate() {
        let column = normalize_name(header);
        if column.is_empty() {
            return Err(IngestError::EmptyColumn(index));
        }
        if columns.contains(&column) {
            return Err(IngestError::DuplicateColumn(column));
        }
        columns.push(column);
    }
    Ok(columns)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut values: Vec<f64> = values.collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn has_negative(record: &RawRecord) -> bool {
    NON_NEGATIVE_ATTRIBUTES.iter().any(|name| {
        record
            .get(name)
            .and_then(AttributeValue::as_number)
            .is_some_and(|value| value < 0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
customerID, Gender ,SeniorCitizen,tenure,Contract,MonthlyCharges,TotalCharges,Churn
7590-VHVEG,Female,No,1,Month-to-month,29.85,29.85,No
5575-GNVDE,Male,No,34,One year,56.95,1889.5,No
5575-GNVDE,Male,No,34,One year,56.95,1889.5,No
3668-QPYBK,Male,No,2,Month-to-month,53.85, ,Yes
9237-HQITU,Female,No,-3,Month-to-month,70.70,151.65,Yes
";

    fn dataset() -> Dataset {
        CsvIngestor::new()
            .read(EXPORT.as_bytes())
            .expect("export parses")
    }

    #[test]
    fn duplicates_and_negative_rows_are_removed() {
        let dataset = dataset();
        assert_eq!(dataset.rows_read, 5);
        assert_eq!(dataset.duplicate_rows, 1);
        assert_eq!(dataset.dropped_rows, 1);
        assert_eq!(dataset.requests.len(), 3);
    }

    #[test]
    fn headers_and_categories_are_normalized() {
        let dataset = dataset();
        let first = &dataset.requests[0];
        assert_eq!(first.customer_id.as_deref(), Some("7590-VHVEG"));
        assert_eq!(
            first.attributes.get("gender"),
            Some(&AttributeValue::Categorical("female".to_string()))
        );
        assert_eq!(
            first.attributes.get("contract"),
            Some(&AttributeValue::Categorical("month-to-month".to_string()))
        );
        assert!(first.attributes.get(LABEL_ATTRIBUTE).is_none());
        assert!(first.attributes.get("customerid").is_none());
    }

    #[test]
    fn blank_numeric_cells_take_the_column_median() {
        let dataset = dataset();
        let filled = dataset.requests[2]
            .attributes
            .get("totalcharges")
            .and_then(AttributeValue::as_number);
        // Median of 29.85, 1889.5 and 151.65 across deduplicated rows.
        assert_eq!(filled, Some(151.65));
    }

    #[test]
    fn missing_customer_ids_fall_back_to_row_position() {
        let export = "tenure,monthlycharges\n3,20\n5,25\n";
        let dataset = CsvIngestor::new()
            .read(export.as_bytes())
            .expect("export parses");
        let ids: Vec<_> = dataset
            .requests
            .iter()
            .map(|request| request.customer_id.clone().unwrap_or_default())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn fallback_ids_survive_dropped_rows() {
        let export = "tenure,monthlycharges\n3,20\n-1,25\n7,30\n";
        let dataset = CsvIngestor::new()
            .read(export.as_bytes())
            .expect("export parses");
        let ids: Vec<_> = dataset
            .requests
            .iter()
            .map(|request| request.customer_id.clone().unwrap_or_default())
            .collect();
        assert_eq!(dataset.dropped_rows, 1);
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn derived_features_are_opt_in() {
        let plain = dataset();
        assert!(plain.requests[0].attributes.get("avg_monthly_spend").is_none());

        let derived = CsvIngestor::new()
            .derive_features(true)
            .read(EXPORT.as_bytes())
            .expect("export parses");
        assert_eq!(
            derived.requests[1]
                .attributes
                .get("tenure_group")
                .map(AttributeValue::category_label),
            Some("24-48".to_string())
        );
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = CsvIngestor::new()
            .read("".as_bytes())
            .expect_err("nothing to read");
        assert!(matches!(err, IngestError::MissingHeader));
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let err = CsvIngestor::new()
            .read("Tenure,tenure\n1,2\n".as_bytes())
            .expect_err("ambiguous header");
        assert!(matches!(err, IngestError::DuplicateColumn(column) if column == "tenure"));
    }

    #[test]
    fn ragged_rows_surface_csv_errors() {
        let err = CsvIngestor::new()
            .read("tenure,monthlycharges\n1\n".as_bytes())
            .expect_err("short row");
        assert!(matches!(err, IngestError::Csv(_)));
    }
}
