use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use fhirview_core::model::PatientBundle;
use fhirview_core::query::{FHIR_JSON, PATIENT_RESOURCE, PatientQuery};
use serde_json::Value;

/// A bundle together with how long the registry took to answer.
pub struct Fetched {
    pub bundle: PatientBundle,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
}

impl FhirClient {
    pub fn new(base_url: &str) -> Result<Self> {
        url::Url::parse(base_url).with_context(|| format!("Invalid server URL: {base_url}"))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resource_url(&self, resource_type: &str) -> String {
        format!("{}/{}", self.base_url, resource_type)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Accept", FHIR_JSON)
            .header("Content-Type", FHIR_JSON)
    }

    pub async fn fetch_all(&self) -> Result<Fetched> {
        self.fetch(&PatientQuery::All).await
    }

    pub async fn fetch_by_birth_range(&self, from: Option<&str>, to: Option<&str>) -> Result<Fetched> {
        self.fetch(&PatientQuery::birth_range(from, to)).await
    }

    pub async fn fetch(&self, query: &PatientQuery) -> Result<Fetched> {
        let url = self.resource_url(PATIENT_RESOURCE);
        let params = query.params();
        tracing::debug!(%url, ?params, "querying patients");

        let start = Instant::now();
        let resp = self
            .request(reqwest::Method::GET, &url)
            .query(&params)
            .send()
            .await
            .context("Failed to connect to server")?;
        let status = resp.status();
        let body = handle_response(resp).await?;
        let elapsed = start.elapsed();
        tracing::info!(%status, elapsed_ms = elapsed.as_millis() as u64, query = %query, "patients received");

        let bundle = match body {
            Value::Null => PatientBundle::default(),
            value => PatientBundle::from_value(value)?,
        };
        Ok(Fetched { bundle, elapsed })
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await.context("Failed to read response body")?;

    if !status.is_success() {
        if let Ok(json) = serde_json::from_str::<Value>(&body)
            && json.get("resourceType").and_then(|v| v.as_str()) == Some("OperationOutcome")
            && let Some(issues) = json.get("issue").and_then(|v| v.as_array())
        {
            let msgs: Vec<&str> = issues
                .iter()
                .filter_map(|i| i.get("diagnostics").and_then(|d| d.as_str()))
                .collect();
            if !msgs.is_empty() {
                anyhow::bail!("HTTP {status}: {}", msgs.join("; "));
            }
        }
        anyhow::bail!("HTTP {status}: {body}");
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).context("Failed to parse response JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bundle(ids: &[&str]) -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "total": ids.len(),
            "entry": ids
                .iter()
                .map(|id| json!({"resource": {"resourceType": "Patient", "id": id}}))
                .collect::<Vec<_>>()
        })
    }

    #[tokio::test]
    async fn test_fetch_all_sends_fhir_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Patient"))
            .and(header("content-type", "application/fhir+json"))
            .and(header("accept", "application/fhir+json"))
            .and(query_param_is_missing("name"))
            .and(query_param_is_missing("birthdate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bundle(&["1", "2"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = FhirClient::new(&format!("{}/fhir/", server.uri())).unwrap();
        let fetched = client.fetch_all().await.unwrap();
        assert_eq!(fetched.bundle.entry.len(), 2);
        assert_eq!(fetched.bundle.total, Some(2));
    }

    #[tokio::test]
    async fn test_birth_range_sends_both_bounds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .and(query_param("birthdate", "ge1960-01-01"))
            .and(query_param("birthdate", "le1965-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bundle(&["r"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = FhirClient::new(&server.uri()).unwrap();
        let fetched = client.fetch_by_birth_range(None, None).await.unwrap();
        assert_eq!(fetched.bundle.entry.len(), 1);
    }

    #[tokio::test]
    async fn test_search_by_name_and_date() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .and(query_param("name", "John Smith"))
            .and(query_param("birthdate", "1961-03-09"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bundle(&["s"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = FhirClient::new(&server.uri()).unwrap();
        let query = PatientQuery::Search {
            name: Some("John Smith".to_string()),
            birth_date: Some(date!(1961 - 03 - 09)),
        };
        let fetched = client.fetch(&query).await.unwrap();
        assert_eq!(fetched.bundle.entry.len(), 1);
    }

    #[tokio::test]
    async fn test_search_by_name_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .and(query_param("name", "Smith"))
            .and(query_param_is_missing("birthdate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bundle(&[])))
            .expect(1)
            .mount(&server)
            .await;

        let client = FhirClient::new(&server.uri()).unwrap();
        let query = PatientQuery::Search {
            name: Some("Smith".to_string()),
            birth_date: None,
        };
        let fetched = client.fetch(&query).await.unwrap();
        assert!(fetched.bundle.entry.is_empty());
    }

    #[tokio::test]
    async fn test_bundle_without_entry_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"resourceType": "Bundle", "total": 0})),
            )
            .mount(&server)
            .await;

        let client = FhirClient::new(&server.uri()).unwrap();
        let fetched = client.fetch_all().await.unwrap();
        assert!(fetched.bundle.entry.is_empty());
    }

    #[tokio::test]
    async fn test_operation_outcome_becomes_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Patient"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "resourceType": "OperationOutcome",
                "issue": [{"severity": "error", "code": "invalid", "diagnostics": "Unknown search parameter"}]
            })))
            .mount(&server)
            .await;

        let client = FhirClient::new(&server.uri()).unwrap();
        let err = client.fetch_all().await.err().unwrap();
        let msg = format!("{err:#}");
        assert!(msg.contains("400"));
        assert!(msg.contains("Unknown search parameter"));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let client = FhirClient::new(&uri).unwrap();
        let err = client.fetch_all().await.err().unwrap();
        assert!(format!("{err:#}").contains("Failed to connect to server"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(FhirClient::new("not a url").is_err());
    }
}
