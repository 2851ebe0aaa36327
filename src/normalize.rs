//! Maps raw upstream records onto the canonical [`Recall`] shape.
//!
//! Normalization never fails as a whole: entries that are not JSON objects
//! are counted and skipped, and every missing field is replaced by a default
//! so a canonical record never carries an empty value.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

use crate::domain::{Recall, Source};

pub const NOT_AVAILABLE: &str = "N/A";
/// Substituted for a combined date-time that fails to parse.
pub const DEFAULT_DATE: &str = "20240101";

pub const CPSC_CLASSIFICATION: &str = "Consumer Product";
pub const CPSC_DEFAULT_PRODUCT: &str = "Consumer Product";
pub const CPSC_SEE_DETAILS: &str = "See CPSC for details";
pub const CPSC_DEFAULT_COMPANY: &str = "Unknown Manufacturer";
pub const CPSC_DEFAULT_STATUS: &str = "Active";

const PRODUCT_SEPARATOR: &str = " - ";
const REASON_SEPARATOR: &str = " | ";
const LIST_SEPARATOR: &str = ", ";

/// Raw records as returned by one adapter, tagged with their origin.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBatch {
    Fda(Vec<Value>),
    Cpsc(Vec<Value>),
}

impl RawBatch {
    pub fn new(source: Source, records: Vec<Value>) -> Self {
        match source {
            Source::Fda => RawBatch::Fda(records),
            Source::Cpsc => RawBatch::Cpsc(records),
        }
    }

    pub fn source(&self) -> Source {
        match self {
            RawBatch::Fda(_) => Source::Fda,
            RawBatch::Cpsc(_) => Source::Cpsc,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawBatch::Fda(records) | RawBatch::Cpsc(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub recalls: Vec<Recall>,
    pub skipped: usize,
}

pub fn normalize(batch: &RawBatch) -> Normalized {
    let normalized = match batch {
        RawBatch::Fda(records) => normalize_with(records, |recall, _, produced| {
            normalize_fda(recall, produced)
        }),
        RawBatch::Cpsc(records) => normalize_with(records, |recall, index, _| {
            normalize_cpsc(recall, index)
        }),
    };
    if normalized.skipped > 0 {
        tracing::warn!(
            source = %batch.source(),
            skipped = normalized.skipped,
            "skipped malformed upstream records"
        );
    }
    normalized
}

fn normalize_with<F>(records: &[Value], mut map: F) -> Normalized
where
    F: FnMut(&Map<String, Value>, usize, usize) -> Recall,
{
    let mut normalized = Normalized::default();
    for (index, record) in records.iter().enumerate() {
        let Some(object) = record.as_object() else {
            normalized.skipped += 1;
            continue;
        };
        let produced = normalized.recalls.len();
        normalized.recalls.push(map(object, index, produced));
    }
    normalized
}

/// `produced` is the number of records already emitted in this batch and
/// seeds the synthesized id when `recall_number` is missing.
pub fn normalize_fda(record: &Map<String, Value>, produced: usize) -> Recall {
    let text = |key: &str| text_or(record, key, NOT_AVAILABLE);
    let recall_number = record.get("recall_number").and_then(field_text);
    let date = record
        .get("recall_initiation_date")
        .and_then(field_text)
        .or_else(|| record.get("report_date").and_then(field_text))
        .map(|raw| normalize_date(&raw, DEFAULT_DATE))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    Recall {
        id: recall_number
            .clone()
            .unwrap_or_else(|| format!("FDA-{produced}")),
        recall_number: recall_number.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        product_description: text("product_description"),
        reason_for_recall: text("reason_for_recall"),
        company: text("recalling_firm"),
        date,
        classification: text("classification"),
        status: text("status"),
        distribution_pattern: text("distribution_pattern"),
        product_quantity: text("product_quantity"),
        source: Source::Fda,
    }
}

/// `index` is the zero-based position in the raw batch.
pub fn normalize_cpsc(record: &Map<String, Value>, index: usize) -> Recall {
    let field = |key: &str| record.get(key).and_then(field_text);

    let recall_number = field("RecallNumber").unwrap_or_else(|| format!("CPSC-{:03}", index + 1));
    let id = field("RecallID").unwrap_or_else(|| recall_number.clone());

    let product_description = join_non_empty(
        [field("Title"), field("ProductNames"), field("ProductDescriptions")],
        PRODUCT_SEPARATOR,
    )
    .unwrap_or_else(|| CPSC_DEFAULT_PRODUCT.to_string());

    let hazards = field("Hazards");
    let injuries = field("Injuries");
    let description = if hazards.is_none() && injuries.is_none() {
        field("Description")
    } else {
        None
    };
    let reason_for_recall = join_non_empty(
        [
            hazards.map(|value| format!("Hazard: {value}")),
            injuries.map(|value| format!("Injuries: {value}")),
            description,
        ],
        REASON_SEPARATOR,
    )
    .unwrap_or_else(|| CPSC_SEE_DETAILS.to_string());

    let company = match (field("Manufacturers"), field("ManufacturerCountries")) {
        (Some(manufacturers), Some(countries)) => format!("{manufacturers}, of {countries}"),
        (Some(manufacturers), None) => manufacturers,
        (None, _) => CPSC_DEFAULT_COMPANY.to_string(),
    };

    let date = field("RecallDate")
        .map(|raw| normalize_date(&raw, DEFAULT_DATE))
        .unwrap_or_else(|| DEFAULT_DATE.to_string());

    Recall {
        id,
        recall_number,
        product_description,
        reason_for_recall,
        company,
        date,
        classification: CPSC_CLASSIFICATION.to_string(),
        status: CPSC_DEFAULT_STATUS.to_string(),
        distribution_pattern: CPSC_SEE_DETAILS.to_string(),
        product_quantity: field("NumberOfUnits").unwrap_or_else(|| CPSC_SEE_DETAILS.to_string()),
        source: Source::Cpsc,
    }
}

/// Reformats combined date-times (anything containing `T`) as `YYYYMMDD`,
/// substituting `default` when they do not parse. Other values pass through
/// untouched, conforming or not.
pub fn normalize_date(raw: &str, default: &str) -> String {
    if !raw.contains('T') {
        return raw.to_string();
    }
    parse_date_time(raw)
        .map(|parsed| parsed.format("%Y%m%d").to_string())
        .unwrap_or_else(|| default.to_string())
}

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_local());
    }
    let naive = trimmed.trim_end_matches('Z').replacen('T', " ", 1);
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&naive, format).ok())
}

/// Textual content of an upstream field, or `None` when it is missing or blank.
///
/// Numbers are stringified; arrays (as served by the non-delimited CPSC
/// endpoint) are flattened to their string items or `Name` members.
pub fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => {
            let parts = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(object) => object.get("Name").and_then(field_text),
                    other => field_text(other),
                })
                .collect::<Vec<_>>();
            (!parts.is_empty()).then(|| parts.join(LIST_SEPARATOR))
        }
        _ => None,
    }
}

fn text_or(record: &Map<String, Value>, key: &str, default: &str) -> String {
    record
        .get(key)
        .and_then(field_text)
        .unwrap_or_else(|| default.to_string())
}

fn join_non_empty<const N: usize>(parts: [Option<String>; N], separator: &str) -> Option<String> {
    let parts = parts.into_iter().flatten().collect::<Vec<_>>();
    (!parts.is_empty()).then(|| parts.join(separator))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn fda_missing_fields_defaulted() {
        let recall = normalize_fda(&object(json!({"product_description": "Cheese"})), 3);
        assert_eq!(recall.id, "FDA-3");
        assert_eq!(recall.recall_number, NOT_AVAILABLE);
        assert_eq!(recall.product_description, "Cheese");
        assert_eq!(recall.company, NOT_AVAILABLE);
        assert_eq!(recall.date, NOT_AVAILABLE);
        assert_eq!(recall.classification, NOT_AVAILABLE);
        assert_eq!(recall.source, Source::Fda);
    }

    #[test]
    fn fda_unparseable_date_time_gets_default_date() {
        let recall = normalize_fda(
            &object(json!({"recall_initiation_date": "2025-13-45T99:00:00"})),
            0,
        );
        assert_eq!(recall.date, DEFAULT_DATE);

        let recall = normalize_fda(&object(json!({"report_date": "2025-02-26T08:00:00"})), 0);
        assert_eq!(recall.date, "20250226");
    }

    #[test]
    fn fda_fields_map_one_to_one() {
        let recall = normalize_fda(
            &object(json!({
                "recall_number": "F-0123-2025",
                "product_description": "Frozen spinach",
                "reason_for_recall": "Listeria monocytogenes",
                "recalling_firm": "Green Fields Inc",
                "recall_initiation_date": "20250102",
                "report_date": "20250110",
                "classification": "Class I",
                "status": "Ongoing",
                "distribution_pattern": "Nationwide",
                "product_quantity": "1,200 cases"
            })),
            0,
        );
        assert_eq!(recall.id, "F-0123-2025");
        assert_eq!(recall.recall_number, "F-0123-2025");
        assert_eq!(recall.company, "Green Fields Inc");
        assert_eq!(recall.date, "20250102");
        assert_eq!(recall.classification, "Class I");
        assert_eq!(recall.product_quantity, "1,200 cases");
    }

    #[test]
    fn cpsc_composites_fields() {
        let recall = normalize_cpsc(
            &object(json!({
                "RecallID": 9876,
                "RecallNumber": "25-101",
                "Title": "Acme Recalls Space Heaters",
                "ProductNames": "Space Heater",
                "Hazards": "Fire",
                "Injuries": "None reported",
                "Description": "ignored because hazards exist",
                "Manufacturers": "Acme",
                "ManufacturerCountries": "China",
                "RecallDate": "2025-03-14T00:00:00",
                "NumberOfUnits": "About 4,000"
            })),
            0,
        );
        assert_eq!(recall.id, "9876");
        assert_eq!(recall.recall_number, "25-101");
        assert_eq!(
            recall.product_description,
            "Acme Recalls Space Heaters - Space Heater"
        );
        assert_eq!(
            recall.reason_for_recall,
            "Hazard: Fire | Injuries: None reported"
        );
        assert_eq!(recall.company, "Acme, of China");
        assert_eq!(recall.date, "20250314");
        assert_eq!(recall.classification, CPSC_CLASSIFICATION);
        assert_eq!(recall.product_quantity, "About 4,000");
    }

    #[test]
    fn cpsc_defaults_when_empty() {
        let recall = normalize_cpsc(&object(json!({"Title": "", "Hazards": "  "})), 4);
        assert_eq!(recall.recall_number, "CPSC-005");
        assert_eq!(recall.id, "CPSC-005");
        assert_eq!(recall.product_description, CPSC_DEFAULT_PRODUCT);
        assert_eq!(recall.reason_for_recall, CPSC_SEE_DETAILS);
        assert_eq!(recall.company, CPSC_DEFAULT_COMPANY);
        assert_eq!(recall.date, DEFAULT_DATE);
        assert_eq!(recall.status, CPSC_DEFAULT_STATUS);
        assert_eq!(recall.distribution_pattern, CPSC_SEE_DETAILS);
    }

    #[test]
    fn cpsc_description_used_without_hazard_or_injury() {
        let recall = normalize_cpsc(&object(json!({"Description": "Sharp edges"})), 0);
        assert_eq!(recall.reason_for_recall, "Sharp edges");
    }

    #[test]
    fn cpsc_array_fields_flattened() {
        let recall = normalize_cpsc(
            &object(json!({
                "Products": [],
                "ProductNames": [{"Name": "Kettle"}, {"Name": "Lid"}],
                "Manufacturers": [{"Name": "Boil Co"}],
            })),
            0,
        );
        assert_eq!(recall.product_description, "Kettle, Lid");
        assert_eq!(recall.company, "Boil Co");
    }

    #[test]
    fn date_normalization_tolerates_garbage() {
        assert_eq!(normalize_date("2024-06-01T12:30:00Z", "x"), "20240601");
        assert_eq!(normalize_date("2024-06-01T12:30:00.123", "x"), "20240601");
        assert_eq!(normalize_date("2024-06-01T23:30:00-05:00", "x"), "20240601");
        assert_eq!(normalize_date("not-a-Time", "20240101"), "20240101");
        assert_eq!(normalize_date("June 1 2024", "x"), "June 1 2024");
        assert_eq!(normalize_date("2024113", "x"), "2024113");
    }

    #[test]
    fn malformed_entries_skipped() {
        let batch = RawBatch::Cpsc(vec![
            json!({"RecallNumber": "A"}),
            json!(42),
            json!(["nested"]),
            json!({"RecallNumber": "B"}),
        ]);
        let normalized = normalize(&batch);
        assert_eq!(normalized.skipped, 2);
        let numbers = normalized
            .recalls
            .iter()
            .map(|recall| recall.recall_number.as_str())
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec!["A", "B"]);
    }

    #[test]
    fn fda_synthesized_ids_count_produced_records() {
        let batch = RawBatch::Fda(vec![json!({}), json!(null), json!({})]);
        let normalized = normalize(&batch);
        assert_eq!(normalized.recalls[0].id, "FDA-0");
        assert_eq!(normalized.recalls[1].id, "FDA-1");
    }
}
