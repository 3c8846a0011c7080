//! Turns raw `Patient` resources into flat, display-ready records.
//!
//! Each derived field is an independent pure function of the raw record. Absent
//! inputs produce empty strings, empty lists or `"N/A"`, never errors. Only a
//! resource that is not a JSON object is left out of the bundle.

use serde::Serialize;
use serde_json::Value;
use time::Date;

use crate::age::age_on;
use crate::model::{Address, CodeableConcept, HumanName, OneOrMany, PatientBundle, PatientRecord};
use crate::NOT_AVAILABLE;

pub const PLACEHOLDER_PHOTO_URL: &str =
    "https://cdn.pixabay.com/photo/2016/08/08/09/17/avatar-1577909_1280.png";

pub const PRACTITIONER_SEPARATOR: &str = "\n";

/// A patient as the grid shows it, plus the raw resource for the detail view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    pub id: Option<String>,
    pub photo_url: String,
    pub full_name: Vec<String>,
    pub gender: String,
    pub age: String,
    pub birth_date: String,
    pub status: String,
    pub gen_practitioner: String,
    pub death_date: String,
    pub marital_status: String,
    pub phone: Vec<Value>,
    pub email: Vec<Value>,
    pub fax: Vec<Value>,
    pub full_address: Vec<String>,
    #[serde(skip)]
    pub raw: Value,
}

/// Telecom entries split by channel, with the source order kept in each list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPoints {
    pub phone: Vec<Value>,
    pub email: Vec<Value>,
    pub fax: Vec<Value>,
}

pub fn normalize_bundle(bundle: &PatientBundle, today: Date) -> Vec<DisplayRecord> {
    let mut records = Vec::with_capacity(bundle.entry.len());
    for (index, entry) in bundle.entry.iter().enumerate() {
        let Some(resource) = &entry.resource else {
            tracing::debug!(index, full_url = ?entry.full_url, "skipping entry without resource");
            continue;
        };
        match PatientRecord::from_value(resource) {
            Ok(record) => records.push(normalize_record(&record, resource.clone(), today)),
            Err(e) => tracing::warn!(index, error = %e, "skipping unreadable entry"),
        }
    }
    records
}

pub fn normalize_record(record: &PatientRecord, raw: Value, today: Date) -> DisplayRecord {
    let contacts = contact_points(&record.telecom);
    DisplayRecord {
        id: record.id.clone(),
        photo_url: photo_url(record.photo.as_ref()),
        full_name: full_names(&record.name),
        gender: record.gender.clone().unwrap_or_default(),
        age: age_on(record.birth_date.as_deref(), today),
        birth_date: record.birth_date.clone().unwrap_or_default(),
        status: status(record.active).to_string(),
        gen_practitioner: practitioner_display(record),
        death_date: death_date(record),
        marital_status: marital_status(record.marital_status.as_ref()),
        phone: contacts.phone,
        email: contacts.email,
        fax: contacts.fax,
        full_address: full_addresses(&record.address),
        raw,
    }
}

pub fn status(active: Option<bool>) -> &'static str {
    match active {
        Some(true) => "Active",
        Some(false) => "Inactive",
        None => NOT_AVAILABLE,
    }
}

pub fn practitioner_display(record: &PatientRecord) -> String {
    record
        .general_practitioner
        .iter()
        .filter_map(|p| p.display.as_deref())
        .collect::<Vec<_>>()
        .join(PRACTITIONER_SEPARATOR)
}

pub fn full_names(names: &[HumanName]) -> Vec<String> {
    names.iter().map(full_name).collect()
}

/// Prefix, given, family and use, in that order, empty segments dropped.
pub fn full_name(name: &HumanName) -> String {
    [&name.prefix, &name.given, &name.family, &name.name_use]
        .into_iter()
        .map(|part| join_parts(part.as_ref()))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_parts(part: Option<&OneOrMany<Option<String>>>) -> String {
    let Some(part) = part else {
        return String::new();
    };
    part.as_slice()
        .iter()
        .filter_map(|p| p.as_deref().map(str::trim))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn full_addresses(addresses: &[Address]) -> Vec<String> {
    addresses.iter().map(full_address).collect()
}

/// Line, city, district, state, postal code and country, empty parts dropped.
pub fn full_address(address: &Address) -> String {
    [
        &address.line,
        &address.city,
        &address.district,
        &address.state,
        &address.postal_code,
        &address.country,
    ]
    .into_iter()
    .map(|part| part.as_ref().map(coerce_text).unwrap_or_default())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Render a JSON scalar (or list of scalars) as trimmed text.
pub(crate) fn coerce_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Object(_) => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(coerce_text)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub fn contact_points(telecom: &[Value]) -> ContactPoints {
    let mut points = ContactPoints::default();
    for point in telecom {
        match point.get("system").and_then(Value::as_str) {
            Some("phone") => points.phone.push(point.clone()),
            Some("email") => points.email.push(point.clone()),
            Some("fax") => points.fax.push(point.clone()),
            _ => {}
        }
    }
    points
}

pub fn photo_url(photo: Option<&OneOrMany<crate::model::Attachment>>) -> String {
    let attachment = photo.and_then(OneOrMany::first);
    attachment
        .and_then(|a| non_empty(a.url.as_deref()))
        .or_else(|| attachment.and_then(|a| non_empty(a.data.as_deref())))
        .unwrap_or(PLACEHOLDER_PHOTO_URL)
        .to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

pub fn death_date(record: &PatientRecord) -> String {
    match (&record.deceased_date_time, record.deceased_boolean) {
        (Some(at), _) => at.clone(),
        (None, Some(true)) => "Deceased".to_string(),
        _ => String::new(),
    }
}

pub fn marital_status(concept: Option<&CodeableConcept>) -> String {
    let Some(concept) = concept else {
        return String::new();
    };
    non_empty(concept.text.as_deref())
        .or_else(|| concept.coding.first().and_then(|c| non_empty(c.display.as_deref())))
        .or_else(|| concept.coding.first().and_then(|c| non_empty(c.code.as_deref())))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    const TODAY: Date = date!(2026 - 10 - 14);

    fn record(value: Value) -> PatientRecord {
        PatientRecord::from_value(&value).unwrap()
    }

    #[test]
    fn test_status_tri_state() {
        assert_eq!(status(Some(true)), "Active");
        assert_eq!(status(Some(false)), "Inactive");
        assert_eq!(status(None), "N/A");

        assert_eq!(normalize_record(&record(json!({"active": false})), Value::Null, TODAY).status, "Inactive");
    }

    #[test]
    fn test_practitioners_joined_with_line_break() {
        let r = record(json!({
            "generalPractitioner": [
                {"reference": "Practitioner/1", "display": "Dr. Adams"},
                {"reference": "Practitioner/2"},
                {"display": "Dr. Baker"}
            ]
        }));
        assert_eq!(practitioner_display(&r), "Dr. Adams\nDr. Baker");
        assert_eq!(practitioner_display(&record(json!({}))), "");
    }

    #[test]
    fn test_full_name_order() {
        let r = record(json!({
            "name": [
                {"use": "official", "family": "Chalmers", "given": ["Peter", "James"], "prefix": ["Mr."]},
                {"use": "usual", "given": "Jim"}
            ]
        }));
        assert_eq!(
            full_names(&r.name),
            vec!["Mr. Peter James Chalmers official", "Jim usual"]
        );
    }

    #[test]
    fn test_full_name_trims_and_skips_empty() {
        let r = record(json!({
            "name": [{"prefix": "  ", "given": [" Ana ", null, ""], "family": " Lopez ", "use": ""}]
        }));
        assert_eq!(full_name(&r.name[0]), "Ana Lopez");
    }

    #[test]
    fn test_full_name_all_empty() {
        let r = record(json!({
            "name": [{"prefix": "", "given": [""], "family": "", "use": ""}, {}]
        }));
        assert_eq!(full_names(&r.name), vec!["", ""]);
    }

    #[test]
    fn test_address_line_and_city() {
        let r = record(json!({"address": [{"line": ["123 Main St"], "city": "Springfield"}]}));
        assert_eq!(full_addresses(&r.address), vec!["123 Main St Springfield"]);
    }

    #[test]
    fn test_address_all_parts_coerced() {
        let r = record(json!({
            "address": [{
                "line": ["1 Elm Rd", "Flat 2"],
                "city": " Leeds ",
                "district": "West Yorkshire",
                "state": null,
                "postalCode": 12345,
                "country": "UK"
            }]
        }));
        assert_eq!(
            full_address(&r.address[0]),
            "1 Elm Rd, Flat 2 Leeds West Yorkshire 12345 UK"
        );
    }

    #[test]
    fn test_address_lines_separated_by_comma_and_space() {
        let r = record(json!({"address": [{"line": ["a", "b"]}]}));
        assert_eq!(full_address(&r.address[0]), "a, b");
        assert_ne!(full_address(&r.address[0]), "a,b");
    }

    #[test]
    fn test_address_scalar_line() {
        let r = record(json!({"address": [{"line": "9 High St"}, {}]}));
        assert_eq!(full_addresses(&r.address), vec!["9 High St", ""]);
    }

    #[test]
    fn test_contact_point_partition() {
        let r = record(json!({
            "telecom": [
                {"system": "phone", "value": "1"},
                {"system": "email", "value": "a@b.c"}
            ]
        }));
        let points = contact_points(&r.telecom);
        assert_eq!(points.phone, vec![json!({"system": "phone", "value": "1"})]);
        assert_eq!(points.email, vec![json!({"system": "email", "value": "a@b.c"})]);
        assert!(points.fax.is_empty());
    }

    #[test]
    fn test_contact_point_exact_match_and_order() {
        let r = record(json!({
            "telecom": [
                {"system": "fax", "value": "f1"},
                {"system": "Phone", "value": "ignored"},
                {"system": "sms", "value": "ignored"},
                {"value": "no-system"},
                {"system": "fax", "value": "f2"}
            ]
        }));
        let points = contact_points(&r.telecom);
        assert!(points.phone.is_empty());
        let faxes: Vec<_> = points.fax.iter().filter_map(|p| p["value"].as_str()).collect();
        assert_eq!(faxes, vec!["f1", "f2"]);
    }

    #[test]
    fn test_missing_telecom_yields_empty_lists() {
        assert_eq!(contact_points(&[]), ContactPoints::default());
        assert_eq!(contact_points(&record(json!({"telecom": null})).telecom), ContactPoints::default());
    }

    #[test]
    fn test_contact_point_kept_verbatim() {
        let point = json!({
            "system": "phone",
            "value": 5550100,
            "use": "home",
            "rank": "1",
            "period": {"start": "2020-01-01"},
            "extension": [{"url": "http://example.org/ext", "valueString": "x"}]
        });
        let points = contact_points(&record(json!({"telecom": [point.clone()]})).telecom);
        assert_eq!(points.phone, vec![point]);
    }

    #[test]
    fn test_photo_url_resolution_order() {
        let both = record(json!({"photo": {"url": "http://img/1.png", "data": "QUJD"}}));
        assert_eq!(photo_url(both.photo.as_ref()), "http://img/1.png");

        let data_only = record(json!({"photo": {"data": "QUJD"}}));
        assert_eq!(photo_url(data_only.photo.as_ref()), "QUJD");

        let url_only = record(json!({"photo": [{"url": "http://img/2.png"}]}));
        assert_eq!(photo_url(url_only.photo.as_ref()), "http://img/2.png");

        let empty_photo = record(json!({"photo": {}}));
        assert_eq!(photo_url(empty_photo.photo.as_ref()), PLACEHOLDER_PHOTO_URL);

        assert_eq!(photo_url(None), PLACEHOLDER_PHOTO_URL);
    }

    #[test]
    fn test_death_date() {
        assert_eq!(death_date(&record(json!({"deceasedDateTime": "2015-02-14T13:42:00+10:00"}))), "2015-02-14T13:42:00+10:00");
        assert_eq!(death_date(&record(json!({"deceasedBoolean": true}))), "Deceased");
        assert_eq!(death_date(&record(json!({"deceasedBoolean": false}))), "");
    }

    #[test]
    fn test_marital_status_fallbacks() {
        let text = record(json!({"maritalStatus": {"text": "Married", "coding": [{"code": "M"}]}}));
        assert_eq!(marital_status(text.marital_status.as_ref()), "Married");

        let display = record(json!({"maritalStatus": {"coding": [{"code": "S", "display": "Never Married"}]}}));
        assert_eq!(marital_status(display.marital_status.as_ref()), "Never Married");

        let code = record(json!({"maritalStatus": {"coding": [{"code": "D"}]}}));
        assert_eq!(marital_status(code.marital_status.as_ref()), "D");

        assert_eq!(marital_status(None), "");
    }

    #[test]
    fn test_normalize_empty_bundle() {
        let bundle = PatientBundle::from_value(json!({"resourceType": "Bundle", "total": 0})).unwrap();
        assert!(normalize_bundle(&bundle, TODAY).is_empty());
    }

    #[test]
    fn test_normalize_bundle_preserves_order_and_raw() {
        let bundle = PatientBundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "b", "birthDate": "1966-10-14", "gender": "female"}},
                {"fullUrl": "urn:uuid:0"},
                {"resource": {"resourceType": "Patient", "id": "a"}}
            ]
        }))
        .unwrap();
        let records = normalize_bundle(&bundle, TODAY);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("b"));
        assert_eq!(records[0].age, "60");
        assert_eq!(records[0].gender, "female");
        assert_eq!(records[0].raw["birthDate"], "1966-10-14");
        assert_eq!(records[1].id.as_deref(), Some("a"));
        assert_eq!(records[1].age, "N/A");
        assert_eq!(records[1].photo_url, PLACEHOLDER_PHOTO_URL);
    }

    #[test]
    fn test_loose_record_does_not_hide_its_neighbours() {
        let bundle = PatientBundle::from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "good", "gender": "female"}},
                {"resource": {
                    "resourceType": "Patient",
                    "id": "loose",
                    "active": "yes",
                    "telecom": [{"system": "phone", "value": "1", "rank": "1"}]
                }},
                {"resource": "not a patient"}
            ]
        }))
        .unwrap();
        let records = normalize_bundle(&bundle, TODAY);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("good"));
        assert_eq!(records[1].id.as_deref(), Some("loose"));
        assert_eq!(records[1].status, "N/A");
        assert_eq!(records[1].phone[0]["rank"], "1");
    }

    #[test]
    fn test_display_record_json_skips_raw() {
        let r = normalize_record(&record(json!({"id": "1"})), json!({"id": "1"}), TODAY);
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("raw").is_none());
        assert_eq!(json["status"], "N/A");
        assert_eq!(json["fullName"], json!([]));
    }
}
