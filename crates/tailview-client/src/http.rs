use std::time::Duration;

use chrono::NaiveDate;
use tracing::debug;

use tailview_types::{DeleteResponse, FetchResponse, LogRecord};

use crate::endpoints::Endpoints;
use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP side of the backend: historical pages and admin delete
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpLogClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl HttpLogClient {
    pub fn new(endpoints: Endpoints) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, endpoints })
    }

    /// Fetch up to `limit` records for `date`, skipping the newest `offset`
    ///
    /// Records come back newest first.
    pub async fn fetch_page(&self, date: NaiveDate, limit: usize, offset: usize) -> Result<Vec<LogRecord>, ClientError> {
        let url = self.endpoints.logs_url(date, limit, offset)?;
        debug!(%url, "fetching log page");

        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        decode_fetch_response(&body)
    }

    /// Delete all server-side logs for `date`
    pub async fn delete_logs(&self, date: NaiveDate) -> Result<(), ClientError> {
        let url = self.endpoints.delete_url(date)?;
        debug!(%url, "deleting logs");

        let body = self
            .http
            .delete(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let response: DeleteResponse = serde_json::from_str(&body)?;
        if response.success {
            Ok(())
        } else {
            Err(ClientError::Backend(
                response.error.unwrap_or_else(|| "delete rejected".to_string()),
            ))
        }
    }
}

/// Decode a fetch response body, turning `success: false` into an error
pub(crate) fn decode_fetch_response(body: &str) -> Result<Vec<LogRecord>, ClientError> {
    let response: FetchResponse = serde_json::from_str(body)?;
    if response.success {
        Ok(response.logs)
    } else {
        Err(ClientError::Backend(
            response.error.unwrap_or_else(|| "fetch rejected".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_successful_page() {
        let records = decode_fetch_response(
            r#"{"success":true,"logs":[
                {"level":"ERROR","message":"boom","timestamp":"10:00:01"},
                {"level":"INFO","msg":"ok","ts":1705312800000}
            ]}"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message.as_deref(), Some("boom"));
        assert_eq!(records[1].epoch_ms, Some(1_705_312_800_000));
    }

    #[test]
    fn test_odd_record_keeps_rest_of_page() {
        let records = decode_fetch_response(
            r#"{"success":true,"logs":[
                {"level":"INFO","message":"good","timestamp":"10:00:00"},
                {"level":"INFO","message":"numeric ts","timestamp":1705312800000},
                {"level":null,"message":42}
            ]}"#,
        )
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].timestamp.as_deref(), Some("10:00:00"));
        assert_eq!(records[1].timestamp, None);
        assert_eq!(records[1].epoch_ms, Some(1_705_312_800_000));
        assert_eq!(records[2].level, None);
        assert_eq!(records[2].message.as_deref(), Some("42"));
    }

    #[test]
    fn test_decode_backend_error() {
        let err = decode_fetch_response(r#"{"success":false,"error":"no logs table"}"#).unwrap_err();
        assert!(err.is_backend());
        assert_eq!(err.to_string(), "no logs table");
    }

    #[test]
    fn test_decode_garbage_is_transport_side() {
        let err = decode_fetch_response("<html>502</html>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(!err.is_backend());
    }
}
