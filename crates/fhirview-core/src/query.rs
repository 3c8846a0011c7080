use std::fmt;

use time::Date;
use time::macros::format_description;

pub const PATIENT_RESOURCE: &str = "Patient";
pub const FHIR_JSON: &str = "application/fhir+json";

pub const DEFAULT_BIRTH_FROM: &str = "ge1960-01-01";
pub const DEFAULT_BIRTH_TO: &str = "le1965-01-01";

/// The three ways the viewer asks the registry for patients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientQuery {
    All,
    BirthRange { from: String, to: String },
    Search { name: Option<String>, birth_date: Option<Date> },
}

impl PatientQuery {
    pub fn birth_range(from: Option<&str>, to: Option<&str>) -> Self {
        Self::BirthRange {
            from: from.unwrap_or(DEFAULT_BIRTH_FROM).to_string(),
            to: to.unwrap_or(DEFAULT_BIRTH_TO).to_string(),
        }
    }

    /// Query string pairs, in request order. `birthdate` repeats for a range.
    pub fn params(&self) -> Vec<(String, String)> {
        match self {
            Self::All => Vec::new(),
            Self::BirthRange { from, to } => vec![
                ("birthdate".to_string(), from.clone()),
                ("birthdate".to_string(), to.clone()),
            ],
            Self::Search { name, birth_date } => {
                let mut params = Vec::new();
                if let Some(name) = name.as_deref().filter(|n| !n.is_empty()) {
                    params.push(("name".to_string(), name.to_string()));
                }
                if let Some(date) = birth_date {
                    params.push(("birthdate".to_string(), format_date(*date)));
                }
                params
            }
        }
    }
}

impl fmt::Display for PatientQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params();
        if params.is_empty() {
            return write!(f, "{PATIENT_RESOURCE}");
        }
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        write!(f, "{PATIENT_RESOURCE}?{query}")
    }
}

/// `yyyy-MM-dd`
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}
