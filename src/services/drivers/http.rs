//! Blocking HTTP plumbing shared by the metadata client and the downloader.

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::{Error, Result};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeouts and identification used for every repository request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    /// Upper bound for a whole request, body included.
    ///
    /// The blocking client has no per-read idle timeout, so a large artifact
    /// on a slow link fails once this elapses even while data still arrives.
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            user_agent: concat!("sqlbridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    pub(crate) fn client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| Error::Transport {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })
    }

    /// GET `url`, failing on anything but `200 OK`.
    pub(crate) fn get(&self, url: &str) -> Result<Response> {
        let response = self
            .client()?
            .get(url)
            .send()
            .map_err(|e| transport_error(url, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

pub(crate) fn transport_error(url: &str, e: reqwest::Error) -> Error {
    let message = if e.is_timeout() {
        format!("timed out: {}", e)
    } else {
        e.to_string()
    };
    Error::Transport {
        url: url.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = HttpSettings::default();
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.read_timeout, Duration::from_secs(60));
        assert!(settings.user_agent.starts_with("sqlbridge/"));
    }

    #[test]
    fn test_unreachable_host_is_a_connectivity_error() {
        let settings = HttpSettings {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_secs(1),
            ..HttpSettings::default()
        };
        // port 9 on loopback has nothing listening
        let err = settings.get("http://127.0.0.1:9/nothing").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Connectivity);
    }

    #[test]
    fn test_read_timeout_covers_the_body() {
        use std::io::Write;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nab");
                let _ = stream.flush();
                // the rest of the body never arrives in time
                std::thread::sleep(Duration::from_secs(3));
            }
        });

        let settings = HttpSettings {
            read_timeout: Duration::from_millis(300),
            ..HttpSettings::default()
        };
        let response = settings.get(&format!("http://{}/slow.jar", addr)).unwrap();
        let err = response.bytes().unwrap_err();
        assert!(err.is_timeout());
    }
}
