//! Streaming an artifact to disk

use crate::deadline::Deadline;
use crate::errors::TransportError;
use crate::marketplace::HttpTransport;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use url::Url;

const CHUNK_SIZE: usize = 64 * 1024;

/// Download `url` into `dest_file`, following at most `max_redirects`
/// redirects. Returns the URL the body was finally served from.
pub fn download(
    transport: &dyn HttpTransport,
    url: &Url,
    dest_file: &Path,
    max_redirects: u32,
    deadline: &Deadline,
) -> Result<Url, TransportError> {
    let mut current = url.clone();
    let mut hops = 0;

    loop {
        deadline.check()?;
        let response = transport.get(&current)?;

        if response.status.is_redirection() {
            if hops >= max_redirects {
                return Err(TransportError::TooManyRedirects {
                    limit: max_redirects,
                    url: url.to_string(),
                });
            }
            let location = response
                .location
                .ok_or_else(|| TransportError::MissingLocation {
                    url: current.to_string(),
                })?;
            let next = current
                .join(&location)
                .map_err(|source| TransportError::InvalidLocation {
                    location: location.clone(),
                    source,
                })?;
            tracing::debug!("redirect {} -> {}", current, next);
            current = next;
            hops += 1;
            continue;
        }

        if !response.status.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                message: response
                    .status
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_string(),
                url: current.to_string(),
            });
        }

        let written = copy_body(response.body, dest_file, deadline)?;
        tracing::debug!("downloaded {} bytes from {}", written, current);
        return Ok(current);
    }
}

fn copy_body(
    mut body: Box<dyn Read + Send>,
    dest_file: &Path,
    deadline: &Deadline,
) -> Result<u64, TransportError> {
    let mut file = File::create(dest_file)?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        deadline.check()?;
        let read = body.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])?;
        written += read as u64;
    }
    file.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;
    use std::time::Duration;
    use tempfile::TempDir;

    fn url(raw: &str) -> Url {
        let Ok(url) = Url::parse(raw) else {
            panic!("test url should parse: {raw}");
        };
        url
    }

    #[test]
    fn test_direct_success_writes_body() {
        let Ok(temp) = TempDir::new() else {
            panic!("tempdir");
        };
        let dest = temp.path().join("a.zip");
        let transport = FakeTransport::new().ok("https://x.test/a.zip", b"archive".to_vec());

        let result = download(&transport, &url("https://x.test/a.zip"), &dest, 5, &Deadline::none());
        assert!(result.is_ok_and(|u| u.as_str() == "https://x.test/a.zip"));
        assert!(std::fs::read(&dest).is_ok_and(|bytes| bytes == b"archive"));
    }

    #[test]
    fn test_follows_relative_redirect() {
        let Ok(temp) = TempDir::new() else {
            panic!("tempdir");
        };
        let dest = temp.path().join("a.zip");
        let transport = FakeTransport::new()
            .redirect("https://x.test/start", "/files/a-1.0.zip")
            .ok("https://x.test/files/a-1.0.zip", b"zip".to_vec());

        let result = download(&transport, &url("https://x.test/start"), &dest, 1, &Deadline::none());
        assert!(result.is_ok_and(|u| u.path() == "/files/a-1.0.zip"));
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_redirect_budget_exhausted() {
        let Ok(temp) = TempDir::new() else {
            panic!("tempdir");
        };
        let transport = FakeTransport::new()
            .redirect("https://x.test/1", "https://x.test/2")
            .redirect("https://x.test/2", "https://x.test/3")
            .ok("https://x.test/3", Vec::new());

        let result = download(
            &transport,
            &url("https://x.test/1"),
            &temp.path().join("a.zip"),
            1,
            &Deadline::none(),
        );
        assert!(matches!(
            result,
            Err(TransportError::TooManyRedirects { limit: 1, .. })
        ));
    }

    #[test]
    fn test_error_status_names_url() {
        let Ok(temp) = TempDir::new() else {
            panic!("tempdir");
        };
        let transport = FakeTransport::new().status("https://x.test/a.zip", 451);
        let result = download(
            &transport,
            &url("https://x.test/a.zip"),
            &temp.path().join("a.zip"),
            5,
            &Deadline::none(),
        );
        let Err(err) = result else {
            panic!("expected failure");
        };
        assert_eq!(
            err.to_string(),
            "HTTP 451 Unavailable For Legal Reasons for https://x.test/a.zip"
        );
    }

    #[test]
    fn test_expired_deadline_stops_before_request() {
        let Ok(temp) = TempDir::new() else {
            panic!("tempdir");
        };
        let transport = FakeTransport::new().ok("https://x.test/a.zip", b"zip".to_vec());
        let deadline = Deadline::after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));

        let result = download(
            &transport,
            &url("https://x.test/a.zip"),
            &temp.path().join("a.zip"),
            5,
            &deadline,
        );
        assert!(matches!(result, Err(TransportError::DeadlineExceeded(_))));
        assert!(transport.requests().is_empty());
    }
}
