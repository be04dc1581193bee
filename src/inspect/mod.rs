//! Payload inspection: HTTP recognition and threat signatures.

pub mod http;
mod rules;

pub use http::{looks_like_http, HttpMessage};

use crate::model::{AlertType, HttpSummary, SecurityAlert, Severity};
use rules::{RuleSet, SUSPICIOUS_AGENTS};

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// A recognised HTTP message and the alerts it raised.
#[derive(Debug, Clone)]
pub struct HttpInspection {
    pub message: HttpMessage,
    pub alerts: Vec<SecurityAlert>,
}

impl HttpInspection {
    pub fn summary(&self) -> HttpSummary {
        let m = &self.message;
        HttpSummary {
            method: m.method.clone(),
            url: m.url.clone(),
            host: m.header("host").map(str::to_string),
            user_agent: m.header("user-agent").map(str::to_string),
            status_code: m.status_code,
        }
    }
}

pub struct PayloadInspector {
    rules: RuleSet,
}

impl PayloadInspector {
    pub fn new() -> Result<Self, InspectError> {
        Ok(PayloadInspector {
            rules: RuleSet::builtin()?,
        })
    }

    /// Inspect a TCP payload. Returns `None` unless the payload is HTTP.
    pub fn inspect(
        &self,
        payload: &[u8],
        src_port: u16,
        dst_port: u16,
        timestamp: f64,
    ) -> Option<HttpInspection> {
        if !looks_like_http(payload, src_port, dst_port) {
            return None;
        }
        let text = String::from_utf8_lossy(payload);
        let message = HttpMessage::parse(&text);

        let mut alerts: Vec<SecurityAlert> = self
            .rules
            .matches(&text)
            .map(|rule| {
                SecurityAlert::new(
                    timestamp,
                    rule.alert_type,
                    rule.severity,
                    rule.title,
                    format!("{} detected in HTTP payload", rule.title),
                    rule.evidence(&text),
                )
            })
            .collect();

        if let Some(alert) = suspicious_agent(&message, timestamp) {
            alerts.push(alert);
        }

        Some(HttpInspection { message, alerts })
    }
}

impl std::fmt::Debug for PayloadInspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadInspector")
            .field("rules", &self.rules.len())
            .finish()
    }
}

fn suspicious_agent(message: &HttpMessage, timestamp: f64) -> Option<SecurityAlert> {
    let agent = message.header("user-agent")?;
    let lowered = agent.to_ascii_lowercase();
    let signature = SUSPICIOUS_AGENTS.iter().find(|sig| lowered.contains(*sig))?;
    Some(SecurityAlert::new(
        timestamp,
        AlertType::SuspiciousTraffic,
        Severity::Medium,
        "Suspicious user agent",
        format!("user agent '{}' matches scanner signature '{}'", agent, signature),
        agent,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURL_GET: &[u8] =
        b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nUser-Agent: curl/7.0\r\n\r\n";

    #[test]
    fn curl_request_is_parsed_and_flagged() {
        let inspector = PayloadInspector::new().unwrap();
        let result = inspector.inspect(CURL_GET, 51000, 80, 10.0).unwrap();
        assert_eq!(result.message.method.as_deref(), Some("GET"));
        assert_eq!(result.message.url.as_deref(), Some("/index.html"));
        assert_eq!(result.message.headers.len(), 2);
        assert_eq!(result.message.headers["host"], "example.com");
        assert_eq!(result.message.headers["user-agent"], "curl/7.0");

        let agent_alerts: Vec<_> = result
            .alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::SuspiciousTraffic)
            .collect();
        assert_eq!(agent_alerts.len(), 1);
        assert!(agent_alerts[0].description.contains("curl"));
        assert_eq!(agent_alerts[0].severity, Severity::Medium);
        assert_eq!(agent_alerts[0].timestamp, 10.0);
        assert_eq!(result.alerts.len(), 1);

        let summary = result.summary();
        assert_eq!(summary.host.as_deref(), Some("example.com"));
        assert_eq!(summary.user_agent.as_deref(), Some("curl/7.0"));
    }

    #[test]
    fn non_http_payload_is_ignored() {
        let inspector = PayloadInspector::new().unwrap();
        assert!(inspector.inspect(b"\x16\x03\x01\x02\x00", 51000, 443, 0.0).is_none());
        assert!(inspector.inspect(b"SSH-2.0-OpenSSH_9.6", 51000, 22, 0.0).is_none());
        assert!(inspector.inspect(b"", 51000, 80, 0.0).is_none());
    }

    #[test]
    fn sql_injection_in_body() {
        let inspector = PayloadInspector::new().unwrap();
        let attack = b"POST /search HTTP/1.1\r\nHost: db.local\r\n\r\nid=1' OR '1'='1";
        let result = inspector.inspect(attack, 40000, 8080, 0.0).unwrap();
        let sqli: Vec<_> = result
            .alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::SqlInjection)
            .collect();
        assert!(!sqli.is_empty());
        assert!(sqli.iter().all(|a| a.severity == Severity::Critical));

        let benign = b"POST /search HTTP/1.1\r\nHost: db.local\r\n\r\nid=12345";
        let result = inspector.inspect(benign, 40000, 8080, 0.0).unwrap();
        assert!(result.alerts.is_empty());
    }

    #[test]
    fn one_alert_per_matching_rule() {
        let inspector = PayloadInspector::new().unwrap();
        let payload = b"GET /?q=<script>document.cookie</script>&password=abc HTTP/1.1\r\n\r\n";
        let result = inspector.inspect(payload, 1, 2, 0.0).unwrap();
        let mut titles: Vec<&str> = result.alerts.iter().map(|a| a.title.as_str()).collect();
        let before = titles.len();
        titles.dedup();
        assert_eq!(titles.len(), before);
        assert!(result.alerts.iter().any(|a| a.alert_type == AlertType::CrossSiteScripting));
        assert!(result
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::UnencryptedSensitiveData));
    }

    #[test]
    fn lowercase_verb_on_unusual_port_is_inspected() {
        let inspector = PayloadInspector::new().unwrap();
        let attack = b"get /?id=1' OR '1'='1 HTTP/1.1\r\nUser-Agent: sqlmap\r\n\r\n";
        let result = inspector.inspect(attack, 40000, 9999, 0.0).unwrap();
        assert_eq!(result.message.method.as_deref(), Some("GET"));
        assert!(result.alerts.iter().any(|a| a.alert_type == AlertType::SqlInjection));
        assert!(result.alerts.iter().any(|a| a.alert_type == AlertType::SuspiciousTraffic));
    }

    #[test]
    fn eval_and_email_payloads_raise_alerts() {
        let inspector = PayloadInspector::new().unwrap();
        let xss = b"GET /?q=eval(atob('YWxlcnQoMSk=')) HTTP/1.1\r\n\r\n";
        let result = inspector.inspect(xss, 40000, 80, 0.0).unwrap();
        assert!(result.alerts.iter().any(|a| a.alert_type == AlertType::CrossSiteScripting));

        let form = b"POST /signup HTTP/1.1\r\n\r\ncontact=alice.smith@example.com";
        let result = inspector.inspect(form, 40000, 80, 0.0).unwrap();
        assert!(result
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::UnencryptedSensitiveData && a.severity == Severity::High));
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let inspector = PayloadInspector::new().unwrap();
        let mut payload = b"GET /\xff\xfe HTTP/1.1\r\nUser-Agent: Nikto\r\n\r\n".to_vec();
        payload.extend_from_slice(&[0xc3, 0x28]);
        let result = inspector.inspect(&payload, 1, 2, 0.0).unwrap();
        assert_eq!(result.message.method.as_deref(), Some("GET"));
        assert!(result
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::SuspiciousTraffic));
    }

    #[test]
    fn long_evidence_is_truncated() {
        let inspector = PayloadInspector::new().unwrap();
        let agent = format!("sqlmap/{}", "x".repeat(400));
        let payload = format!("GET / HTTP/1.1\r\nUser-Agent: {}\r\n\r\n", agent);
        let result = inspector.inspect(payload.as_bytes(), 1, 2, 0.0).unwrap();
        assert!(result.alerts.iter().all(|a| a.evidence.chars().count() <= 150));
    }
}
