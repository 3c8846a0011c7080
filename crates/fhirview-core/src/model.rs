//! Raw FHIR shapes as returned by the registry.
//!
//! Only the parts of `Patient` the viewer displays are modelled. Every field is
//! optional, list fields accept `null`, and the name parts accept either a
//! scalar or a list, since registries are loose about all three. A field of the
//! wrong JSON type reads as absent, and a mistyped list item is dropped, so one
//! sloppy record never hides the rest of the bundle.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Result, ViewError};

/// A value FHIR servers send either bare or wrapped in an array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring mistyped field");
            Ok(None)
        }
    }
}

/// A list, a bare item standing in for a one-item list, or `null`.
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        item => vec![item],
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(error = %e, "dropping mistyped list item");
                None
            }
        })
        .collect())
}

/// Search result wrapper. Absent or `null` `entry` is an empty bundle.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientBundle {
    pub resource_type: Option<String>,
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entry: Vec<BundleEntry>,
}

impl PatientBundle {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| ViewError::invalid_resource(format!("Bundle: {e}")))
    }
}

/// One bundle entry. The resource stays raw so the detail view can show it verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: Option<String>,
    pub resource: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub deceased_date_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub deceased_boolean: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub marital_status: Option<CodeableConcept>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub name: Vec<HumanName>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub address: Vec<Address>,
    /// Contact points stay raw JSON so they reach the output verbatim.
    #[serde(default, deserialize_with = "lenient_list")]
    pub telecom: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub general_practitioner: Vec<Reference>,
    #[serde(default, deserialize_with = "lenient")]
    pub photo: Option<OneOrMany<Attachment>>,
}

impl PatientRecord {
    pub fn from_value(value: &Value) -> Result<Self> {
        Self::deserialize(value).map_err(|e| {
            let id = value.get("id").and_then(Value::as_str).unwrap_or("?");
            ViewError::invalid_resource(format!("Patient/{id}: {e}"))
        })
    }
}

/// Name parts, each possibly a scalar, a list, or a list with `null` holes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HumanName {
    #[serde(default, deserialize_with = "lenient")]
    pub prefix: Option<OneOrMany<Option<String>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub given: Option<OneOrMany<Option<String>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub family: Option<OneOrMany<Option<String>>>,
    #[serde(rename = "use", default, deserialize_with = "lenient")]
    pub name_use: Option<OneOrMany<Option<String>>>,
}

/// Address parts are kept as raw JSON and coerced to text on display.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub line: Option<Value>,
    pub city: Option<Value>,
    pub district: Option<Value>,
    pub state: Option<Value>,
    pub postal_code: Option<Value>,
    pub country: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reference {
    #[serde(default, deserialize_with = "lenient")]
    pub reference: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, deserialize_with = "lenient")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeableConcept {
    #[serde(default, deserialize_with = "lenient_list")]
    pub coding: Vec<Coding>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Coding {
    #[serde(default, deserialize_with = "lenient")]
    pub system: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display: Option<String>,
}
