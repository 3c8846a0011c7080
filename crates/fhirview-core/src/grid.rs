//! Client-side table state: column set, sorting, filtering and row expansion.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{Result, ViewError};
use crate::normalize::{DisplayRecord, coerce_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Photo,
    Name,
    Gender,
    Age,
    BirthDate,
    Status,
    GeneralPractitioner,
    DeathDate,
    MaritalStatus,
    Phone,
    Email,
    Fax,
    Address,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Photo,
        Column::Name,
        Column::Gender,
        Column::Age,
        Column::BirthDate,
        Column::Status,
        Column::GeneralPractitioner,
        Column::DeathDate,
        Column::MaritalStatus,
        Column::Phone,
        Column::Email,
        Column::Fax,
        Column::Address,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Column::Photo => "photo",
            Column::Name => "name",
            Column::Gender => "gender",
            Column::Age => "age",
            Column::BirthDate => "birthDate",
            Column::Status => "status",
            Column::GeneralPractitioner => "generalPractitioner",
            Column::DeathDate => "deathDate",
            Column::MaritalStatus => "maritalStatus",
            Column::Phone => "phone",
            Column::Email => "email",
            Column::Fax => "fax",
            Column::Address => "address",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Column::Photo => "Photo",
            Column::Name => "Name",
            Column::Gender => "Gender",
            Column::Age => "Age",
            Column::BirthDate => "Birth Date",
            Column::Status => "Status",
            Column::GeneralPractitioner => "General Practitioner",
            Column::DeathDate => "Death Date",
            Column::MaritalStatus => "Marital Status",
            Column::Phone => "Phone",
            Column::Email => "Email",
            Column::Fax => "Fax",
            Column::Address => "Address",
        }
    }

    pub fn cell(&self, record: &DisplayRecord) -> String {
        match self {
            Column::Photo => record.photo_url.clone(),
            Column::Name => record.full_name.join("\n"),
            Column::Gender => record.gender.clone(),
            Column::Age => record.age.clone(),
            Column::BirthDate => record.birth_date.clone(),
            Column::Status => record.status.clone(),
            Column::GeneralPractitioner => record.gen_practitioner.clone(),
            Column::DeathDate => record.death_date.clone(),
            Column::MaritalStatus => record.marital_status.clone(),
            Column::Phone => contact_values(&record.phone),
            Column::Email => contact_values(&record.email),
            Column::Fax => contact_values(&record.fax),
            Column::Address => record.full_address.join("\n"),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Column {
    type Err = ViewError;

    /// Accepts the column key in any case, with or without `-`/`_` separators.
    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_lowercase();
        let wanted = match wanted.as_str() {
            "gp" | "practitioner" => "generalpractitioner",
            other => other,
        };
        Column::ALL
            .into_iter()
            .find(|c| c.key().to_lowercase() == wanted)
            .ok_or_else(|| ViewError::UnknownColumn(s.to_string()))
    }
}

fn contact_values(points: &[Value]) -> String {
    points
        .iter()
        .filter_map(|p| p.get("value"))
        .map(coerce_text)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

impl FromStr for SortDirection {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(ViewError::invalid_field("sort direction", format!("'{s}' is not asc or desc"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: Column,
    pub direction: SortDirection,
}

/// Where a cell sorts: empty cells first, then numbers by value, then text.
#[derive(Debug, PartialEq, PartialOrd)]
enum CellKey<'a> {
    Empty,
    Number(f64),
    Text(&'a str),
}

impl<'a> CellKey<'a> {
    fn of(cell: &'a str) -> Self {
        if cell.is_empty() {
            return Self::Empty;
        }
        // "nan" and "inf" parse as floats but are text here
        match cell.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(cell),
        }
    }
}

/// A total order over cells: empty, then numeric by value, then text.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (CellKey::of(a), CellKey::of(b)) {
        (CellKey::Number(x), CellKey::Number(y)) => x.total_cmp(&y),
        (x, y) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// The displayed dataset and how it is currently viewed.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    records: Vec<DisplayRecord>,
    sort: Option<SortSpec>,
    filter: String,
}

impl Grid {
    pub fn new(records: Vec<DisplayRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Replace the dataset wholesale, keeping sort and filter.
    pub fn replace(&mut self, records: Vec<DisplayRecord>) {
        self.records = records;
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.sort = sort;
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn records(&self) -> &[DisplayRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Visible rows: filtered, then stably sorted.
    pub fn view(&self) -> Vec<&DisplayRecord> {
        let needle = self.filter.trim().to_lowercase();
        let mut rows: Vec<&DisplayRecord> = self
            .records
            .iter()
            .filter(|r| needle.is_empty() || matches_filter(r, &needle))
            .collect();

        if let Some(SortSpec { column, direction }) = self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(&column.cell(a), &column.cell(b));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        rows
    }

    /// Cell text for the visible rows, one inner vector per row in column order.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.view()
            .into_iter()
            .map(|r| Column::ALL.iter().map(|c| c.cell(r)).collect())
            .collect()
    }

    /// Find a row to expand, by resource id or by 1-based position in the view.
    pub fn expand(&self, key: &str) -> Result<&DisplayRecord> {
        let view = self.view();
        if let Some(record) = view.iter().copied().find(|r| r.id.as_deref() == Some(key)) {
            return Ok(record);
        }
        key.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| view.get(i).copied())
            .ok_or_else(|| ViewError::RowNotFound(key.to_string()))
    }
}

fn matches_filter(record: &DisplayRecord, needle: &str) -> bool {
    Column::ALL
        .iter()
        .any(|c| c.cell(record).to_lowercase().contains(needle))
}
