use chrono::NaiveDate;
use url::Url;

use crate::error::ClientError;

/// Backend URLs for fetching, deleting and streaming logs
///
/// Endpoint paths are resolved under the base URL's path, so a backend
/// mounted at `http://host/proxy` serves logs from `/proxy/api/logs`.
#[derive(Clone, Debug)]
pub struct Endpoints {
    base: Url,
    logs_path: String,
    delete_path: String,
    push_path: String,
}

impl Endpoints {
    pub fn new(
        base_url: &str,
        logs_path: impl Into<String>,
        delete_path: impl Into<String>,
        push_path: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            base,
            logs_path: logs_path.into(),
            delete_path: delete_path.into(),
            push_path: push_path.into(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET` URL for one page of logs
    pub fn logs_url(&self, date: NaiveDate, limit: usize, offset: usize) -> Result<Url, ClientError> {
        let mut url = self.resolve(&self.logs_path)?;
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        Ok(url)
    }

    /// `DELETE` URL for one day of logs
    pub fn delete_url(&self, date: NaiveDate) -> Result<Url, ClientError> {
        let mut url = self.resolve(&self.delete_path)?;
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    /// WebSocket URL of the push channel (http -> ws, https -> wss)
    pub fn push_url(&self) -> Result<Url, ClientError> {
        let mut url = self.resolve(&self.push_path)?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(ClientError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::UnsupportedScheme(url.scheme().to_string()))?;
        Ok(url)
    }

    fn resolve(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(base: &str) -> Endpoints {
        Endpoints::new(base, "/api/logs", "/api/logs", "/ws/logs").unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_logs_url_has_paging_query() {
        let url = endpoints("http://localhost:8080").logs_url(date(), 200, 400).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/logs?date=2024-03-09&limit=200&offset=400"
        );
    }

    #[test]
    fn test_delete_url() {
        let url = endpoints("http://localhost:8080/").delete_url(date()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/logs?date=2024-03-09");
    }

    #[test]
    fn test_push_url_switches_scheme() {
        assert_eq!(
            endpoints("http://example.com").push_url().unwrap().as_str(),
            "ws://example.com/ws/logs"
        );
        assert_eq!(
            endpoints("https://example.com").push_url().unwrap().as_str(),
            "wss://example.com/ws/logs"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let endpoints = endpoints("https://example.com/proxy");
        assert_eq!(
            endpoints.logs_url(date(), 10, 0).unwrap().as_str(),
            "https://example.com/proxy/api/logs?date=2024-03-09&limit=10&offset=0"
        );
        assert_eq!(
            endpoints.push_url().unwrap().as_str(),
            "wss://example.com/proxy/ws/logs"
        );
        assert_eq!(endpoints.base().as_str(), "https://example.com/proxy/");
    }

    #[test]
    fn test_push_url_rejects_other_schemes() {
        let err = endpoints("ftp://example.com").push_url().unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            Endpoints::new("not a url", "/a", "/b", "/c"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
