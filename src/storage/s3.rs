//! S3 backend: presigned URLs + a blocking HTTP client.

use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;

use super::sigv4::{Endpoint, PresignRequest, presign_url};
use super::{Locator, ObjectStore, PublishAck, StorageCredentials, StorageError};
use crate::domain::ObjectRef;
use crate::error::PipelineError;

/// Connection settings for the S3 backend.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub region: String,
    /// Path-style endpoint override for S3-compatible services.
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    /// Validity of the presigned PUT used for uploads.
    pub upload_expiration_secs: u64,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            timeout_secs: 60,
            upload_expiration_secs: 900,
        }
    }
}

pub struct S3Store {
    client: Client,
    credentials: StorageCredentials,
    endpoint: Endpoint,
    settings: S3Settings,
}

impl S3Store {
    pub fn new(credentials: StorageCredentials, settings: S3Settings) -> Result<Self, PipelineError> {
        if settings.region.trim().is_empty() {
            return Err(PipelineError::Config("S3 region must not be empty".to_string()));
        }

        let endpoint = match &settings.endpoint {
            Some(url) => Endpoint::custom(url).map_err(|e| PipelineError::Config(e.to_string()))?,
            None => Endpoint::aws(&settings.region),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            endpoint,
            settings,
        })
    }

    fn sign(&self, method: &str, object: &ObjectRef, expires_in_secs: u64) -> Result<String, StorageError> {
        presign_url(
            &self.endpoint,
            &self.credentials,
            &PresignRequest {
                method,
                bucket: &object.bucket,
                key: &object.key,
                region: &self.settings.region,
                expires_in_secs,
                now: Utc::now(),
            },
        )
    }
}

impl ObjectStore for S3Store {
    fn presign(&self, object: &ObjectRef, expires_in_secs: u64) -> Result<Locator, StorageError> {
        let now = Utc::now();
        let uri = self.sign("GET", object, expires_in_secs)?;
        let expires_at = i64::try_from(expires_in_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .map(|d| now + d);
        Ok(Locator { uri, expires_at })
    }

    fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, StorageError> {
        let uri = redact_query(&locator.uri);
        let resp = self.client.get(&locator.uri).send().map_err(|e| StorageError::Transport {
            uri: uri.clone(),
            message: e.without_url().to_string(),
        })?;

        let uri = check_status(uri, resp.status())?;
        let body = resp.bytes().map_err(|e| StorageError::Transport {
            uri,
            message: e.without_url().to_string(),
        })?;
        Ok(body.to_vec())
    }

    fn store(&self, bytes: &[u8], object: &ObjectRef) -> Result<PublishAck, StorageError> {
        let url = self.sign("PUT", object, self.settings.upload_expiration_secs)?;
        let uri = redact_query(&url);

        let resp = self
            .client
            .put(&url)
            .body(bytes.to_vec())
            .send()
            .map_err(|e| StorageError::Transport {
                uri: uri.clone(),
                message: e.without_url().to_string(),
            })?;

        check_status(uri, resp.status())?;

        Ok(PublishAck {
            object: object.clone(),
            bytes: bytes.len(),
        })
    }
}

/// Map a non-2xx response to a storage error; hands `uri` back on success.
fn check_status(uri: String, status: reqwest::StatusCode) -> Result<String, StorageError> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(uri));
    }
    if !status.is_success() {
        return Err(StorageError::Status {
            uri,
            status: status.as_u16(),
        });
    }
    Ok(uri)
}

/// Drop the signature-bearing query string before a URL ends up in a log or error.
fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    fn creds() -> StorageCredentials {
        StorageCredentials::new(Some("AKIA".to_string()), Some("secret".to_string()), None).unwrap()
    }

    /// Serve one canned HTTP response on a loopback port; returns the endpoint URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
        });
        (format!("http://{addr}"), handle)
    }

    fn store_at(endpoint: String) -> S3Store {
        let settings = S3Settings {
            endpoint: Some(endpoint),
            timeout_secs: 5,
            ..S3Settings::default()
        };
        S3Store::new(creds(), settings).unwrap()
    }

    fn export() -> ObjectRef {
        ObjectRef::new("pimis-ml", "reports/export.xlsx")
    }

    #[test]
    fn presign_sets_expiry() {
        let store = S3Store::new(creds(), S3Settings::default()).unwrap();
        let locator = store
            .presign(&ObjectRef::new("pimis-ml", "reports/export.xlsx"), 1200)
            .unwrap();
        assert!(locator.uri.starts_with("https://pimis-ml.s3.amazonaws.com/reports/export.xlsx?"));
        assert!(locator.uri.contains("X-Amz-Expires=1200"));
        let expires_at = locator.expires_at.unwrap();
        let remaining = (expires_at - Utc::now()).num_seconds();
        assert!(remaining > 1100 && remaining <= 1200);
    }

    #[test]
    fn invalid_endpoint_is_a_config_error() {
        let settings = S3Settings {
            endpoint: Some("not a url".to_string()),
            ..S3Settings::default()
        };
        let err = S3Store::new(creds(), settings).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn redact_query_strips_signature() {
        assert_eq!(
            redact_query("https://b.s3.amazonaws.com/k?X-Amz-Signature=abc"),
            "https://b.s3.amazonaws.com/k"
        );
    }

    #[test]
    fn status_mapping() {
        let uri = || "http://minio/b/k".to_string();
        assert_eq!(check_status(uri(), reqwest::StatusCode::OK).unwrap(), uri());
        assert!(matches!(
            check_status(uri(), reqwest::StatusCode::NOT_FOUND),
            Err(StorageError::NotFound(u)) if u == uri()
        ));
        assert!(matches!(
            check_status(uri(), reqwest::StatusCode::FORBIDDEN),
            Err(StorageError::Status { status: 403, .. })
        ));
    }

    #[test]
    fn fetch_returns_body() {
        let (endpoint, server) = serve_once("200 OK", "ds,y\n2024-01-01,1\n");
        let store = store_at(endpoint);
        let locator = store.presign(&export(), 60).unwrap();
        let body = store.fetch(&locator).unwrap();
        server.join().unwrap();
        assert_eq!(body, b"ds,y\n2024-01-01,1\n");
    }

    #[test]
    fn fetch_missing_object_is_not_found() {
        let (endpoint, server) = serve_once("404 Not Found", "<Error><Code>NoSuchKey</Code></Error>");
        let store = store_at(endpoint);
        let locator = store.presign(&export(), 60).unwrap();
        let err = store.fetch(&locator).unwrap_err();
        server.join().unwrap();
        match err {
            StorageError::NotFound(uri) => {
                assert!(uri.ends_with("/pimis-ml/reports/export.xlsx"));
                assert!(!uri.contains("X-Amz-Signature"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn fetch_server_error_keeps_status() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "");
        let store = store_at(endpoint);
        let locator = store.presign(&export(), 60).unwrap();
        let err = store.fetch(&locator).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, StorageError::Status { status: 500, .. }));
        assert!(!err.to_string().contains("X-Amz-Signature"));
    }

    #[test]
    fn store_rejected_put_keeps_status() {
        let (endpoint, server) = serve_once("403 Forbidden", "");
        let store = store_at(endpoint);
        let err = store
            .store(b"<svg/>", &ObjectRef::new("pimis-ml", "results/graph.svg"))
            .unwrap_err();
        server.join().unwrap();
        match err {
            StorageError::Status { uri, status } => {
                assert_eq!(status, 403);
                assert!(!uri.contains('?'));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn store_success_acknowledges_size() {
        let (endpoint, server) = serve_once("200 OK", "");
        let store = store_at(endpoint);
        let ack = store
            .store(b"<svg/>", &ObjectRef::new("pimis-ml", "results/graph.svg"))
            .unwrap();
        server.join().unwrap();
        assert_eq!(ack.bytes, 6);
    }

    #[test]
    fn transport_error_omits_signature() {
        // Bind then drop so the port refuses connections.
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let store = store_at(format!("http://{addr}"));
        let locator = store.presign(&export(), 60).unwrap();
        let err = store.fetch(&locator).unwrap_err();
        assert!(matches!(err, StorageError::Transport { .. }));
        let text = err.to_string();
        assert!(!text.contains("X-Amz-Signature"));
        assert!(!text.contains("X-Amz-Credential"));
    }
}
