//! HTTP client for the call-sync endpoint
//!
//! Uses synchronous HTTP (ureq) so the sync worker stays executor-agnostic.

use anyhow::{Context, Result};
use log::debug;
use std::time::Duration;
use ureq::Agent;
use url::Url;

use super::{CALLS_ENDPOINT, UploadPage};
use crate::error::SyncError;

/// Delivers one page of a batch upstream
///
/// Success means the endpoint acknowledged the page with a 2xx status; the
/// engine only advances its watermark after every page is acknowledged.
pub trait CallUploader: Send + Sync {
    fn upload(&self, page: &UploadPage) -> Result<(), SyncError>;
}

/// Build the full endpoint URL from the configured API base
pub fn endpoint_url(api_base_url: &str) -> Result<Url> {
    let mut base = api_base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base).with_context(|| format!("Invalid API base URL: {}", api_base_url))?;
    base.join(CALLS_ENDPOINT)
        .context("Failed to build call-sync endpoint URL")
}

/// ureq-based uploader posting form-encoded pages
pub struct HttpUploader {
    agent: Agent,
    endpoint: Url,
}

impl HttpUploader {
    /// Create an uploader for `api_base_url`.
    ///
    /// `timeout` applies separately to connecting, sending and receiving.
    pub fn new(api_base_url: &str, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint_url(api_base_url)?;
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(timeout))
            .timeout_send_request(Some(timeout))
            .timeout_send_body(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .timeout_recv_body(Some(timeout))
            .build();

        Ok(Self {
            agent: Agent::new_with_config(config),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl CallUploader for HttpUploader {
    fn upload(&self, page: &UploadPage) -> Result<(), SyncError> {
        let fields = page
            .form_fields()
            .map_err(|e| SyncError::Unexpected(format!("Failed to encode call records: {}", e)))?;

        debug!(
            "Posting page {}/{} ({} calls) to {}",
            page.page_number,
            page.total_pages,
            page.records.len(),
            self.endpoint
        );

        let response = self
            .agent
            .post(self.endpoint.as_str())
            .send_form(fields.iter().map(|(k, v)| (*k, v.as_str())));

        match response {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(SyncError::Server {
                status: resp.status().as_u16(),
            }),
            Err(e) => Err(SyncError::Network(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceConfig;
    use crate::upload::{CallRecord, paginate};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Serve a single request with `status`, returning the request body
    fn serve_once(status_line: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            tx.send(String::from_utf8(body).unwrap()).unwrap();

            let mut stream = stream;
            let response = format!("{}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok", status_line);
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    fn sample_page() -> UploadPage {
        let config = DeviceConfig::new("WH-1", "dev-1", "+15550100");
        let record = CallRecord {
            device_number: "+15550100".into(),
            call_type: "OUTGOING".into(),
            caller_number: "+15550199".into(),
            caller_name: "Bob".into(),
            duration: "12".into(),
            time: "2024-05-01 09:30:00".into(),
        };
        paginate(&config, vec![record], 100).remove(0)
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(
            endpoint_url("https://erp.example.com").unwrap().as_str(),
            "https://erp.example.com/api/lms/calls.php"
        );
        assert_eq!(
            endpoint_url("https://example.com/erp/").unwrap().as_str(),
            "https://example.com/erp/api/lms/calls.php"
        );
        assert!(endpoint_url("not a url").is_err());
    }

    #[test]
    fn test_upload_success_posts_form() {
        let (base, rx) = serve_once("HTTP/1.1 200 OK");
        let uploader = HttpUploader::new(&base, Duration::from_secs(5)).unwrap();

        uploader.upload(&sample_page()).unwrap();

        let body = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(body.contains("action=sync_data"));
        assert!(body.contains("wh_id=WH-1"));
        assert!(body.contains("device_id=dev-1"));
        assert!(body.contains("page_number=1"));
        assert!(body.contains("total_pages=1"));
        assert!(body.contains("data="));
    }

    #[test]
    fn test_upload_server_error() {
        let (base, _rx) = serve_once("HTTP/1.1 500 Internal Server Error");
        let uploader = HttpUploader::new(&base, Duration::from_secs(5)).unwrap();

        assert_eq!(
            uploader.upload(&sample_page()),
            Err(SyncError::Server { status: 500 })
        );
    }

    #[test]
    fn test_upload_connection_refused_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let uploader =
            HttpUploader::new(&format!("http://127.0.0.1:{}", port), Duration::from_secs(2))
                .unwrap();

        assert!(matches!(
            uploader.upload(&sample_page()),
            Err(SyncError::Network(_))
        ));
    }
}
