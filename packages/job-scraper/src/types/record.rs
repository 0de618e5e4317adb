//! Job listing records and their fixed tabular layout.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Sink header, in column order.
pub const HEADER: [&str; 7] = [
    "Organization Name",
    "Job Title",
    "Salary",
    "Location",
    "Contract Type",
    "Location Type",
    "Date Posted",
];

/// Employment contract of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContractType {
    Contract,
    FullTime,
    Unknown,
}

impl ContractType {
    /// Normalise a free-text value from the query boundary.
    pub fn parse(raw: &str) -> Self {
        match normalise(raw).as_str() {
            "contract" => Self::Contract,
            "fulltime" => Self::FullTime,
            _ => Self::Unknown,
        }
    }

    /// Column value; `Unknown` is the empty-string sentinel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contract => "Contract",
            Self::FullTime => "Full-time",
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationType {
    Remote,
    OnSite,
    Hybrid,
    Unknown,
}

impl LocationType {
    pub fn parse(raw: &str) -> Self {
        match normalise(raw).as_str() {
            "remote" => Self::Remote,
            "onsite" => Self::OnSite,
            "hybrid" => Self::Hybrid,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::OnSite => "on-site",
            Self::Hybrid => "hybrid",
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase and drop separators so "Full time", "full-time" and "FULLTIME" agree.
fn normalise(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// One job listing.
///
/// Every field is always present; missing source values are empty strings so
/// each row keeps exactly [`HEADER`]`.len()` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub org_name: String,
    pub job_title: String,
    pub salary: String,
    pub location: String,
    pub contract_type: ContractType,
    pub location_type: LocationType,
    pub date_posted: String,
}

impl JobRecord {
    /// Columns in [`HEADER`] order.
    pub fn to_row(&self) -> [&str; 7] {
        [
            self.org_name.as_str(),
            self.job_title.as_str(),
            self.salary.as_str(),
            self.location.as_str(),
            self.contract_type.as_str(),
            self.location_type.as_str(),
            self.date_posted.as_str(),
        ]
    }

    /// Build a record from one item of a `job_posts` response.
    ///
    /// Missing and `null` fields become empty strings. Scalars are rendered as
    /// text. Nested arrays or objects mean the boundary returned something
    /// other than the requested shape.
    pub fn from_item(item: &Value) -> Result<Self, String> {
        let obj = item
            .as_object()
            .ok_or_else(|| format!("job post is not an object: {}", item))?;

        let text = |key: &str| -> Result<String, String> {
            match obj.get(key) {
                None | Some(Value::Null) => Ok(String::new()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(Value::Number(n)) => Ok(n.to_string()),
                Some(Value::Bool(b)) => Ok(b.to_string()),
                Some(other) => Err(format!("field '{}' has unexpected value {}", key, other)),
            }
        };

        Ok(Self {
            org_name: text("org_name")?,
            job_title: text("job_title")?,
            salary: text("salary")?,
            location: text("location")?,
            contract_type: ContractType::parse(&text("contract_type")?),
            location_type: LocationType::parse(&text("location_type")?),
            date_posted: text("date_posted")?,
        })
    }

    /// Parse a full `{ "job_posts": [...] }` response.
    pub fn list_from_response(response: &Value, key: &str) -> Result<Vec<Self>, String> {
        let items = response
            .get(key)
            .ok_or_else(|| format!("response has no '{}' field", key))?
            .as_array()
            .ok_or_else(|| format!("'{}' is not a list", key))?;

        items.iter().map(Self::from_item).collect()
    }
}
