//! Client for the external heavy-compute preprocessing service.
//!
//! The service owns the expensive algorithms (MICE imputation,
//! bloom-filter deduplication at scale, isolation-forest outliers,
//! SMOTE balancing) behind a single request/response call. The client
//! is blocking with an explicit timeout; transport failure surfaces as
//! [`Error::ServiceUnavailable`], distinct from a service-side
//! processing failure ([`Error::Service`]) and from an empty result.
//! Either way the caller's document is untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    document::TableDocument,
    error::{Error, Result},
    factors::FactorId,
    report::PreprocessingReport,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Request payload for the `/preprocess` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessRequest {
    /// The dataset serialized as CSV.
    #[serde(rename = "csvData")]
    pub csv_data: String,
    /// Factor id to enabled flag.
    pub config: BTreeMap<String, bool>,
    /// Target column for supervised factors.
    #[serde(rename = "targetColumn", skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
}

impl PreprocessRequest {
    /// Build a request from a document and the enabled factor set.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized to CSV.
    pub fn from_document(
        doc: &TableDocument,
        enabled: &[FactorId],
        target_column: Option<String>,
    ) -> Result<Self> {
        let config = FactorId::ALL
            .iter()
            .map(|id| (id.as_str().to_string(), enabled.contains(id)))
            .collect();
        Ok(Self {
            csv_data: doc.to_csv_string()?,
            config,
            target_column,
        })
    }
}

/// Response payload from the `/preprocess` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessResponse {
    /// Whether the service processed the dataset.
    pub success: bool,
    /// The processed dataset as CSV, when successful.
    #[serde(default)]
    pub processed_data: Option<String>,
    /// The service-side preprocessing report, when successful.
    #[serde(default)]
    pub preprocessing_report: Option<PreprocessingReport>,
    /// Error message, when unsuccessful.
    #[serde(default)]
    pub error: Option<String>,
}

impl PreprocessResponse {
    /// Parse the processed CSV back into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries no data or the CSV does
    /// not parse.
    pub fn into_document(self) -> Result<TableDocument> {
        let data = self
            .processed_data
            .ok_or_else(|| Error::service("response carried no processed_data"))?;
        TableDocument::from_csv_str(&data)
    }
}

/// Blocking HTTP client for the compute service.
#[derive(Debug)]
pub struct ComputeClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ComputeClient {
    /// Create a client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("limpiar/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::service_unavailable(format!("client setup failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// The service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Submit a preprocessing request and wait for the single response.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceUnavailable`] on transport failure, timeout, or
    ///   a non-success HTTP status.
    /// - [`Error::Service`] when the service answers `success: false`.
    pub fn preprocess(&self, request: &PreprocessRequest) -> Result<PreprocessResponse> {
        let url = self.endpoint("preprocess");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .map_err(|e| Error::service_unavailable(format!("POST {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::service_unavailable(format!(
                "POST {url}: status {status}"
            )));
        }

        let parsed: PreprocessResponse = response
            .json()
            .map_err(|e| Error::service(format!("malformed response body: {e}")))?;
        if !parsed.success {
            return Err(Error::service(
                parsed
                    .error
                    .unwrap_or_else(|| "service reported failure without a message".to_string()),
            ));
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let doc = TableDocument::from_csv_str("a,b\n1,x\n").unwrap();
        let request = PreprocessRequest::from_document(
            &doc,
            &[FactorId::MissingValues, FactorId::Duplicates],
            Some("b".to_string()),
        )
        .unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert!(json["csvData"].as_str().unwrap().starts_with("a,b"));
        assert_eq!(json["config"]["missing_values"], true);
        assert_eq!(json["config"]["outliers"], false);
        assert_eq!(json["targetColumn"], "b");
    }

    #[test]
    fn test_request_omits_absent_target() {
        let doc = TableDocument::from_csv_str("a\n1\n").unwrap();
        let request = PreprocessRequest::from_document(&doc, &[], None).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("targetColumn").is_none());
    }

    #[test]
    fn test_response_parses_success_payload() {
        let body = serde_json::json!({
            "success": true,
            "processed_data": "a\n1\n2\n",
            "preprocessing_report": {
                "preprocessing_stats": {},
                "preprocessing_log": ["ok"],
                "final_dataset_info": {
                    "shape": [2, 1],
                    "numeric_columns": ["a"],
                    "categorical_columns": [],
                    "datetime_columns": [],
                    "missing_values": 0,
                    "data_types": { "a": "numeric" }
                }
            }
        });
        let response: PreprocessResponse = serde_json::from_value(body).unwrap();
        assert!(response.success);
        let doc = response.into_document().unwrap();
        assert_eq!(doc.num_rows(), 2);
    }

    #[test]
    fn test_response_without_data_errors() {
        let response = PreprocessResponse {
            success: true,
            processed_data: None,
            preprocessing_report: None,
            error: None,
        };
        assert!(matches!(
            response.into_document(),
            Err(Error::Service { .. })
        ));
    }

    #[test]
    fn test_unreachable_service_is_distinct_error() {
        // Nothing listens on this port; the transport error must surface
        // as ServiceUnavailable, not as an empty result.
        let client = ComputeClient::with_timeout("http://127.0.0.1:9", 1).unwrap();
        let doc = TableDocument::from_csv_str("a\n1\n").unwrap();
        let request = PreprocessRequest::from_document(&doc, &FactorId::ALL, None).unwrap();
        assert!(matches!(
            client.preprocess(&request),
            Err(Error::ServiceUnavailable { .. })
        ));
    }
}
