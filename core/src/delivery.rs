// core/src/delivery.rs
use std::time::Duration;

use log::info;
use ureq::Agent;

use crate::error::ConvertError;
use crate::reduce::ActivitySummary;

/// Sender ferdige aktivitetsdokumenter videre – enkel blocking-versjon (ureq).
pub struct DeliveryClient {
    agent: Agent,
    url: String,
}

impl DeliveryClient {
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self { agent, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST av dokumentet med `uuid` og `converter` som query-parametre.
    /// Ingen retry; feil går rett tilbake til kalleren.
    pub fn post_activity(&self, summary: &ActivitySummary) -> Result<u16, ConvertError> {
        let body = summary.to_json()?;
        let resp = self
            .agent
            .post(&self.url)
            .query("uuid", &summary.uuid)
            .query("converter", &summary.converter)
            .set("Content-Type", "application/json")
            .send_string(&body);

        match resp {
            Ok(r) => {
                info!(
                    "activity {} ({} records) delivered to {} => {}",
                    summary.uuid,
                    summary.records.len(),
                    self.url,
                    r.status()
                );
                Ok(r.status())
            }
            Err(ureq::Error::Status(code, r)) => {
                let text = r.into_string().unwrap_or_default();
                Err(ConvertError::Delivery(format!("{} answered {code}: {text}", self.url)))
            }
            Err(e) => Err(ConvertError::Delivery(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::SessionTotals;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn summary() -> ActivitySummary {
        ActivitySummary {
            uuid: "abc-123".into(),
            converter: "FitConverter".into(),
            totals: SessionTotals::default(),
            records: vec![],
        }
    }

    /// Minimal HTTP-server for én forespørsel; returnerer rå request.
    fn one_shot_server(status_line: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            let mut body_len = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 {
                    break;
                }
                if let Some(("content-length", v)) = line.to_ascii_lowercase().split_once(':') {
                    body_len = v.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }
            let mut body = vec![0u8; body_len];
            reader.read_exact(&mut body).unwrap();
            request.push_str(&String::from_utf8(body).unwrap());

            let response = format!("{status_line}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
            (&stream).write_all(response.as_bytes()).unwrap();
            request
        });
        (format!("http://{addr}/api/HttpGarmData"), handle)
    }

    #[test]
    fn posts_document_with_query_params() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK");
        let status = DeliveryClient::new(url).post_activity(&summary()).unwrap();
        assert_eq!(status, 200);

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /api/HttpGarmData?"), "{request}");
        assert!(request.contains("uuid=abc-123"));
        assert!(request.contains("converter=FitConverter"));
        assert!(request.ends_with(r#"{"uuid":"abc-123","converter":"FitConverter","records":[]}"#));
    }

    #[test]
    fn non_success_status_is_a_delivery_error() {
        let (url, server) = one_shot_server("HTTP/1.1 500 Internal Server Error");
        let err = DeliveryClient::new(url).post_activity(&summary()).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, ConvertError::Delivery(msg) if msg.contains("500")));
    }
}
