//! Static reference sets: small closed enumerations loaded verbatim.
//!
//! None of these tables carry foreign keys and none take part in
//! reconciliation. [`ReferenceData::standard`] is the embedded default; the
//! mapping config may override the list-shaped sets.

use serde::Serialize;

/// Reference tables and their DDL, in load order.
pub const TABLES: &[(&str, &str)] = &[
    (
        "us_states",
        "CREATE TABLE us_states (\n    abbr TEXT PRIMARY KEY,\n    name TEXT NOT NULL\n)",
    ),
    ("fuels", "CREATE TABLE fuels (\n    name TEXT PRIMARY KEY\n)"),
    ("fuel_units", "CREATE TABLE fuel_units (\n    unit TEXT PRIMARY KEY\n)"),
    ("prime_movers", "CREATE TABLE prime_movers (\n    prime_mover TEXT PRIMARY KEY\n)"),
    ("rto_iso", "CREATE TABLE rto_iso (\n    name TEXT PRIMARY KEY\n)"),
    ("years", "CREATE TABLE years (\n    year INTEGER PRIMARY KEY\n)"),
    (
        "months",
        "CREATE TABLE months (\n    month INTEGER PRIMARY KEY,\n    name TEXT NOT NULL\n)",
    ),
    (
        "quarters",
        "CREATE TABLE quarters (\n    q INTEGER PRIMARY KEY,\n    end_month INTEGER NOT NULL\n)",
    ),
];

/// US state and territory codes.
pub const US_STATES: &[(&str, &str)] = &[
    ("AK", "Alaska"),
    ("AL", "Alabama"),
    ("AR", "Arkansas"),
    ("AS", "American Samoa"),
    ("AZ", "Arizona"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DC", "District of Columbia"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("GU", "Guam"),
    ("HI", "Hawaii"),
    ("IA", "Iowa"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("MA", "Massachusetts"),
    ("MD", "Maryland"),
    ("ME", "Maine"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MO", "Missouri"),
    ("MP", "Northern Mariana Islands"),
    ("MS", "Mississippi"),
    ("MT", "Montana"),
    ("NA", "National"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("NE", "Nebraska"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NV", "Nevada"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("PR", "Puerto Rico"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VA", "Virginia"),
    ("VI", "Virgin Islands"),
    ("VT", "Vermont"),
    ("WA", "Washington"),
    ("WI", "Wisconsin"),
    ("WV", "West Virginia"),
    ("WY", "Wyoming"),
];

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

const DEFAULT_FUELS: &[&str] = &["coal", "gas", "oil", "nuclear", "waste", "other"];
const DEFAULT_FUEL_UNITS: &[&str] = &["ton", "mcf", "bbl", "gal", "kgU", "mmbtu", "mwhth", "other"];
const DEFAULT_PRIME_MOVERS: &[&str] = &[
    "BA", "BT", "CA", "CE", "CP", "CS", "CT", "FC", "FW", "GT", "HA", "HB", "HK", "HY", "IC",
    "OT", "PS", "PV", "ST", "WS", "WT",
];
const DEFAULT_RTO_ISO: &[&str] = &["CAISO", "ERCOT", "ISO-NE", "MISO", "NYISO", "PJM", "SPP"];
const DEFAULT_YEARS: std::ops::RangeInclusive<i64> = 1994..=2016;

/// A single reference cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RefValue {
    Int(i64),
    Text(String),
}

/// Rows destined for one reference table.
#[derive(Debug, Clone)]
pub struct ReferenceRows {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<RefValue>>,
}

/// Every reference set, ready to be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceData {
    pub fuels: Vec<String>,
    pub fuel_units: Vec<String>,
    pub prime_movers: Vec<String>,
    pub rto_iso: Vec<String>,
    pub years: Vec<i64>,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::standard()
    }
}

impl ReferenceData {
    pub fn standard() -> Self {
        let owned = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
        Self {
            fuels: owned(DEFAULT_FUELS),
            fuel_units: owned(DEFAULT_FUEL_UNITS),
            prime_movers: owned(DEFAULT_PRIME_MOVERS),
            rto_iso: owned(DEFAULT_RTO_ISO),
            years: DEFAULT_YEARS.collect(),
        }
    }

    /// Rows for every table in [`TABLES`], in the same order.
    pub fn rows(&self) -> Vec<ReferenceRows> {
        let text = |xs: &[String]| -> Vec<Vec<RefValue>> {
            xs.iter().map(|s| vec![RefValue::Text(s.clone())]).collect()
        };

        vec![
            ReferenceRows {
                table: "us_states",
                columns: &["abbr", "name"],
                rows: US_STATES
                    .iter()
                    .map(|(abbr, name)| {
                        vec![RefValue::Text(abbr.to_string()), RefValue::Text(name.to_string())]
                    })
                    .collect(),
            },
            ReferenceRows { table: "fuels", columns: &["name"], rows: text(&self.fuels) },
            ReferenceRows { table: "fuel_units", columns: &["unit"], rows: text(&self.fuel_units) },
            ReferenceRows {
                table: "prime_movers",
                columns: &["prime_mover"],
                rows: text(&self.prime_movers),
            },
            ReferenceRows { table: "rto_iso", columns: &["name"], rows: text(&self.rto_iso) },
            ReferenceRows {
                table: "years",
                columns: &["year"],
                rows: self.years.iter().map(|y| vec![RefValue::Int(*y)]).collect(),
            },
            ReferenceRows {
                table: "months",
                columns: &["month", "name"],
                rows: MONTH_NAMES
                    .iter()
                    .enumerate()
                    .map(|(i, name)| vec![RefValue::Int(i as i64 + 1), RefValue::Text(name.to_string())])
                    .collect(),
            },
            ReferenceRows {
                table: "quarters",
                columns: &["q", "end_month"],
                rows: (1..=4).map(|q| vec![RefValue::Int(q), RefValue::Int(q * 3)]).collect(),
            },
        ]
    }
}
