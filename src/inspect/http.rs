//! Lenient HTTP/1.x message parsing over lossily decoded payload text.

use serde::Serialize;
use std::collections::HashMap;

pub const HTTP_PORTS: [u16; 4] = [80, 8080, 8000, 3000];

const REQUEST_PREFIXES: [&str; 8] = [
    "GET ", "POST ", "PUT ", "DELETE ", "HEAD ", "OPTIONS ", "PATCH ", "HTTP/",
];

/// Whether a TCP payload should be treated as HTTP: a well-known HTTP port
/// with data on it, or a payload that opens like a request or status line.
pub fn looks_like_http(payload: &[u8], src_port: u16, dst_port: u16) -> bool {
    if payload.is_empty() {
        return false;
    }
    if HTTP_PORTS.contains(&src_port) || HTTP_PORTS.contains(&dst_port) {
        return true;
    }
    REQUEST_PREFIXES.iter().any(|prefix| {
        payload
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HttpMessage {
    pub method: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub status_code: Option<u16>,
    /// Header names are lowercased; a repeated header keeps its last value.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_request(&self) -> bool {
        self.method.is_some()
    }

    /// Parse `text`. Never fails: fields that are not present stay empty.
    pub fn parse(text: &str) -> Self {
        let mut msg = HttpMessage::default();
        let mut offset = 0usize;
        let mut lines = text.split_inclusive('\n');

        if let Some(first) = lines.next() {
            offset += first.len();
            msg.parse_start_line(trim_eol(first));
        }

        for line in lines {
            offset += line.len();
            let line = trim_eol(line);
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                msg.headers
                    .insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        msg.body = text.get(offset..).unwrap_or_default().to_string();
        msg
    }

    fn parse_start_line(&mut self, line: &str) {
        let mut parts = line.split_whitespace();
        let Some(first) = parts.next() else {
            return;
        };
        let is_version = first
            .get(..5)
            .is_some_and(|head| head.eq_ignore_ascii_case("HTTP/"));
        if is_version {
            self.version = Some(first.to_string());
            self.status_code = parts.next().and_then(|code| code.parse().ok());
        } else if is_method(first) {
            self.method = Some(first.to_ascii_uppercase());
            self.url = parts.next().map(str::to_string);
            self.version = parts.next().map(str::to_string);
        }
    }
}

fn is_method(token: &str) -> bool {
    REQUEST_PREFIXES
        .iter()
        .any(|prefix| prefix.trim_end().eq_ignore_ascii_case(token))
}

fn trim_eol(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}
