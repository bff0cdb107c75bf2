//! Shared fixtures: an in-process Maven repository and archive builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// How the fixture server answers one path.
#[derive(Debug, Clone)]
pub enum Route {
    Body(Vec<u8>),
    Status(u16),
    /// Announce `declared` bytes, send `body`, then hang up.
    Truncated { body: Vec<u8>, declared: usize },
}

/// A minimal HTTP/1.1 server serving fixed routes under `/maven2`.
pub struct RepoServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl RepoServer {
    pub fn start(routes: HashMap<String, Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let routes = routes.clone();
                let log = log.clone();
                thread::spawn(move || serve(stream, &routes, &log));
            }
        });

        Self {
            base_url: format!("http://{}/maven2", addr),
            requests,
        }
    }

    /// Paths requested so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve(mut stream: TcpStream, routes: &HashMap<String, Route>, log: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap_or(0) == 0 || header == "\r\n" {
            break;
        }
    }

    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    log.lock().unwrap().push(path.clone());

    let _ = match routes.get(&path) {
        Some(Route::Body(body)) => respond(&mut stream, 200, body.len(), body),
        Some(Route::Truncated { body, declared }) => respond(&mut stream, 200, *declared, body),
        Some(Route::Status(code)) => respond(&mut stream, *code, 0, &[]),
        None => respond(&mut stream, 404, 0, &[]),
    };
}

fn respond(stream: &mut TcpStream, status: u16, length: usize, body: &[u8]) -> std::io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {} Fixture\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, length
    )?;
    stream.write_all(body)?;
    stream.flush()
}

/// Metadata document listing `versions` in the given order.
pub fn metadata_xml(group_id: &str, artifact_id: &str, versions: &[&str]) -> Vec<u8> {
    let versions: String = versions
        .iter()
        .map(|v| format!("      <version>{}</version>\n", v))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <metadata>\n  <groupId>{}</groupId>\n  <artifactId>{}</artifactId>\n  \
         <versioning>\n    <versions>\n{}    </versions>\n  </versioning>\n</metadata>\n",
        group_id, artifact_id, versions
    )
    .into_bytes()
}

/// A small, valid jar.
pub fn jar_bytes() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"Manifest-Version: 1.0\n").unwrap();
    writer
        .start_file("com/mysql/cj/jdbc/Driver.class", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(&[0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 61]).unwrap();
    writer.finish().unwrap().into_inner()
}

pub const MYSQL_METADATA_PATH: &str = "/maven2/com/mysql/mysql-connector-j/maven-metadata.xml";

pub fn mysql_jar_path(version: &str) -> String {
    format!(
        "/maven2/com/mysql/mysql-connector-j/{v}/mysql-connector-j-{v}.jar",
        v = version
    )
}
