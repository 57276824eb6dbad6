//! In-memory HTTP transport for unit tests

use crate::errors::TransportError;
use crate::marketplace::transport::{HttpResponse, HttpTransport};
use reqwest::StatusCode;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor};
use url::Url;

#[derive(Debug, Clone)]
enum Reply {
    Response {
        status: u16,
        location: Option<String>,
        body: Vec<u8>,
    },
    ConnectionReset,
}

/// Answers GETs from a fixed route table and records every requested URL.
/// Unknown URLs get a 404.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: HashMap<String, Reply>,
    requests: RefCell<Vec<String>>,
}

fn key(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |u| u.to_string())
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.routes.insert(
            key(from),
            Reply::Response {
                status: 302,
                location: Some(to.to_string()),
                body: Vec::new(),
            },
        );
        self
    }

    pub fn ok(mut self, url: &str, body: Vec<u8>) -> Self {
        self.routes.insert(
            key(url),
            Reply::Response {
                status: 200,
                location: None,
                body,
            },
        );
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(
            key(url),
            Reply::Response {
                status,
                location: None,
                body: Vec::new(),
            },
        );
        self
    }

    pub fn reset(mut self, url: &str) -> Self {
        self.routes.insert(key(url), Reply::ConnectionReset);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl HttpTransport for FakeTransport {
    fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(url.to_string());
        match self.routes.get(url.as_str()) {
            Some(Reply::Response {
                status,
                location,
                body,
            }) => Ok(HttpResponse {
                status: StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                location: location.clone(),
                body: Box::new(Cursor::new(body.clone())),
            }),
            Some(Reply::ConnectionReset) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
            None => Ok(HttpResponse {
                status: StatusCode::NOT_FOUND,
                location: None,
                body: Box::new(io::empty()),
            }),
        }
    }
}

/// A zip archive holding the given `(path, contents)` entries
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        if name.ends_with('/') {
            assert!(writer.add_directory(*name, SimpleFileOptions::default()).is_ok());
        } else {
            assert!(writer.start_file(*name, SimpleFileOptions::default()).is_ok());
            assert!(writer.write_all(contents.as_bytes()).is_ok());
        }
    }
    let Ok(cursor) = writer.finish() else {
        panic!("zip should finish");
    };
    cursor.into_inner()
}

/// `plugin.xml` text for a plugin with the given id, version and range
pub fn plugin_xml(id: &str, version: &str, since: &str, until: &str) -> String {
    format!(
        r#"<idea-plugin>
  <id>{id}</id>
  <name>{id}</name>
  <version>{version}</version>
  <idea-version since-build="{since}" until-build="{until}"/>
</idea-plugin>"#
    )
}
