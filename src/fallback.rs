//! Built-in sample records served for a failed source when the degrade
//! policy is `static`.

use serde_json::{Value, json};

use crate::domain::Source;
use crate::normalize::RawBatch;

pub fn sample_batch(source: Source) -> RawBatch {
    RawBatch::new(source, sample_records(source))
}

fn sample_records(source: Source) -> Vec<Value> {
    match source {
        Source::Fda => vec![
            json!({
                "recall_number": "F-0001-2024",
                "product_description": "Ready-to-eat chicken salad sandwiches, 6 oz clamshell",
                "reason_for_recall": "Potential contamination with Listeria monocytogenes",
                "recalling_firm": "Sample Fresh Foods LLC",
                "recall_initiation_date": "20240115",
                "classification": "Class I",
                "status": "Ongoing",
                "distribution_pattern": "Distributed in CA, NV and AZ",
                "product_quantity": "2,400 units"
            }),
            json!({
                "recall_number": "F-0002-2024",
                "product_description": "Dark chocolate bars, 3.5 oz",
                "reason_for_recall": "Undeclared milk",
                "recalling_firm": "Sample Confections Inc",
                "recall_initiation_date": "20240122",
                "classification": "Class II",
                "status": "Ongoing",
                "distribution_pattern": "Nationwide",
                "product_quantity": "12,000 bars"
            }),
        ],
        Source::Cpsc => vec![
            json!({
                "RecallID": 1,
                "RecallNumber": "24-001",
                "Title": "Sample Space Heaters Recalled Due to Fire Hazard",
                "ProductNames": "Portable space heater",
                "Hazards": "The heater can overheat, posing a fire hazard.",
                "Manufacturers": "Sample Appliances Co",
                "ManufacturerCountries": "China",
                "RecallDate": "2024-01-18T00:00:00",
                "NumberOfUnits": "About 15,000"
            }),
            json!({
                "RecallID": 2,
                "RecallNumber": "24-002",
                "Title": "Sample Toddler Toys Recalled Due to Choking Hazard",
                "ProductNames": "Stacking rings toy",
                "Hazards": "Small parts can detach, posing a choking hazard to young children.",
                "Injuries": "None reported",
                "Manufacturers": "Sample Toys Ltd",
                "RecallDate": "2024-01-25T00:00:00",
                "NumberOfUnits": "About 3,200"
            }),
        ],
    }
}
