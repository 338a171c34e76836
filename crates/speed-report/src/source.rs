use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tracing::Instrument;

use crate::error::ReportError;
use crate::window::ReportWindow;

/// Facade trait for the service that renders reports.
pub trait ReportSource: Send + Sync {
    fn fetch<'a>(
        &'a self,
        window: &'a ReportWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ReportError>> + Send + 'a>>;
}

/// Fetches reports over HTTP: `GET {base_url}{report_path}?start_date=..&end_date=..`.
pub struct HttpReportSource {
    http: reqwest::Client,
    base_url: String,
    report_path: String,
    span: tracing::Span,
}

impl HttpReportSource {
    pub fn new(base_url: String, report_path: String, timeout: Duration) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Http(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            report_path,
            span: tracing::Span::none(),
        })
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn url(&self) -> String {
        if self.report_path.starts_with('/') {
            format!("{}{}", self.base_url, self.report_path)
        } else {
            format!("{}/{}", self.base_url, self.report_path)
        }
    }
}

impl ReportSource for HttpReportSource {
    fn fetch<'a>(
        &'a self,
        window: &'a ReportWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ReportError>> + Send + 'a>> {
        Box::pin(
            async move {
                let start = window.start_str();
                let end = window.end_str();
                tracing::info!(start = %start, end = %end, "Fetching report");

                let resp = self
                    .http
                    .get(self.url())
                    .query(&[("start_date", start.as_str()), ("end_date", end.as_str())])
                    .send()
                    .await
                    .map_err(|e| ReportError::Http(e.to_string()))?;

                if !resp.status().is_success() {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(ReportError::Status { status, body });
                }

                let bytes = resp
                    .bytes()
                    .await
                    .map_err(|e| ReportError::Http(e.to_string()))?;
                tracing::debug!(size = bytes.len(), "Report received");
                Ok(bytes.to_vec())
            }
            .instrument(self.span.clone()),
        )
    }
}

/// Stub report source that returns fixed bytes and records the windows it was asked for.
pub struct StubReportSource {
    body: Result<Vec<u8>, String>,
    requests: Mutex<Vec<ReportWindow>>,
}

impl StubReportSource {
    pub fn new(body: &[u8]) -> Self {
        Self {
            body: Ok(body.to_vec()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            body: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ReportWindow> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl ReportSource for StubReportSource {
    fn fetch<'a>(
        &'a self,
        window: &'a ReportWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ReportError>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(*window);
            }
            self.body.clone().map_err(ReportError::Http)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::parse_date;

    #[test]
    fn url_joins_base_and_path() {
        let source = HttpReportSource::new(
            "http://reports.local/".into(),
            "/api/analysis/report".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(source.url(), "http://reports.local/api/analysis/report");

        let source = HttpReportSource::new(
            "http://reports.local".into(),
            "api/analysis/report".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(source.url(), "http://reports.local/api/analysis/report");
    }

    #[tokio::test]
    async fn unreachable_service_is_an_http_error() {
        let source = HttpReportSource::new(
            "http://127.0.0.1:9".into(),
            "/report".into(),
            Duration::from_secs(2),
        )
        .unwrap();
        let day = ReportWindow::day(parse_date("2024-01-01").unwrap());
        let err = source.fetch(&day).await.unwrap_err();
        assert!(matches!(err, ReportError::Http(_)));
    }

    #[tokio::test]
    async fn stub_records_windows() {
        let source = StubReportSource::new(b"xlsx");
        let day = ReportWindow::day(parse_date("2024-01-01").unwrap());
        assert_eq!(source.fetch(&day).await.unwrap(), b"xlsx");
        assert_eq!(source.requests(), vec![day]);
    }
}
