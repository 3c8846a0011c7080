use std::sync::LazyLock;

use time::Date;
use time::macros::format_description;

use crate::error::{Result, ViewError};
use crate::query::PatientQuery;

/// Letters and spaces only
static NAME_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-zA-Z ]*$").expect("Invalid name regex"));

/// Raw search input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchForm {
    pub name: String,
    pub birth_date: String,
}

impl SearchForm {
    pub fn new(name: Option<&str>, birth_date: Option<&str>) -> Self {
        Self {
            name: name.unwrap_or_default().to_string(),
            birth_date: birth_date.unwrap_or_default().trim().to_string(),
        }
    }

    /// Field-level validation. An all-empty form is valid but not submittable.
    pub fn validate(&self) -> Result<()> {
        if !NAME_REGEX.is_match(&self.name) {
            return Err(ViewError::invalid_field(
                "name",
                format!("'{}' may contain only letters and spaces", self.name),
            ));
        }
        self.parsed_birth_date()?;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Turn the form into a search, refusing invalid or empty forms.
    pub fn submit(&self) -> Result<PatientQuery> {
        self.validate()?;
        let name = Some(self.name.clone()).filter(|n| !n.is_empty());
        let birth_date = self.parsed_birth_date()?;
        if name.is_none() && birth_date.is_none() {
            return Err(ViewError::EmptySearch);
        }
        Ok(PatientQuery::Search { name, birth_date })
    }

    fn parsed_birth_date(&self) -> Result<Option<Date>> {
        if self.birth_date.is_empty() {
            return Ok(None);
        }
        Date::parse(&self.birth_date, format_description!("[year]-[month]-[day]"))
            .map(Some)
            .map_err(|e| {
                ViewError::invalid_field(
                    "birth date",
                    format!("'{}' is not a yyyy-MM-dd date: {e}", self.birth_date),
                )
            })
    }
}
