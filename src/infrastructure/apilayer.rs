use crate::domain::ports::CurrencyConverter;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{instrument, warn};

pub const CONVERT_URL: &str = "https://api.apilayer.com/currency_data/convert";

/// Currency conversion backed by the apilayer `currency_data` API.
#[derive(Clone)]
pub struct ApiLayerClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

/// Body of a convert reply. Error replies (bad key, quota) carry neither
/// field and decode as unsuccessful.
#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<Decimal>,
}

impl ConvertResponse {
    fn into_result(self, from: &str, to: &str) -> Result<Decimal> {
        match (self.success, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(invalid_currency(from, to)),
        }
    }
}

fn invalid_currency(from: &str, to: &str) -> LedgerError {
    LedgerError::InvalidRequest(format!("invalid currency: cannot convert {from} to {to}"))
}

impl ApiLayerClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: CONVERT_URL.to_string(),
        }
    }

    /// Points the client at a different convert endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CurrencyConverter for ApiLayerClient {
    /// Any failure to obtain a converted amount is reported as an invalid
    /// currency. The cause is logged.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal> {
        let amount = amount.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .header("apikey", &self.api_key)
            .query(&[("from", from), ("to", to), ("amount", amount.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "currency conversion request failed");
                invalid_currency(from, to)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "currency conversion rejected");
            return Err(invalid_currency(from, to));
        }

        let body: ConvertResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "currency conversion reply could not be decoded");
            invalid_currency(from, to)
        })?;

        body.into_result(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// A one-shot HTTP server answering with a canned reply. Its handle
    /// resolves to the raw request head it received.
    struct StubServer {
        endpoint: String,
        request: JoinHandle<String>,
    }

    impl StubServer {
        async fn spawn(status: &'static str, body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let request = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }

                let reply = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
                String::from_utf8_lossy(&head).into_owned()
            });

            Self {
                endpoint: format!("http://{addr}/currency_data/convert"),
                request,
            }
        }

        fn client(&self, api_key: &str) -> ApiLayerClient {
            local_client(api_key, &self.endpoint)
        }
    }

    /// A client that talks to `endpoint` directly, ignoring proxy settings.
    fn local_client(api_key: &str, endpoint: &str) -> ApiLayerClient {
        ApiLayerClient {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
            ..ApiLayerClient::new(api_key).with_endpoint(endpoint)
        }
    }

    #[test]
    fn test_successful_response() {
        let body = r#"{
            "date": "2024-03-01",
            "info": {"quote": 0.011, "timestamp": 1709251199},
            "query": {"amount": 1000, "from": "RUB", "to": "USD"},
            "result": 1350.5,
            "success": true
        }"#;
        let response: ConvertResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_result("RUB", "USD").unwrap(), dec!(1350.5));
    }

    #[test]
    fn test_unsuccessful_response_is_invalid_currency() {
        let body = r#"{"success": false, "error": {"code": 402, "info": "invalid target currency"}}"#;
        let response: ConvertResponse = serde_json::from_str(body).unwrap();
        let err = response.into_result("RUB", "XXX").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(ref msg) if msg.contains("XXX")));
    }

    #[tokio::test]
    async fn test_convert_sends_key_and_query() {
        let server = StubServer::spawn(
            "200 OK",
            r#"{"success": true, "query": {"from": "RUB", "to": "USD", "amount": 50}, "result": 0.55}"#,
        )
        .await;

        let converted = server
            .client("secret-key")
            .convert(dec!(50.00), "RUB", "USD")
            .await
            .unwrap();
        assert_eq!(converted, dec!(0.55));

        let request = server.request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /currency_data/convert?"));
        assert!(request.contains("from=rub"));
        assert!(request.contains("to=usd"));
        assert!(request.contains("amount=50.00"));
        assert!(request.contains("apikey: secret-key"));
    }

    #[tokio::test]
    async fn test_convert_reports_unsuccessful_reply_as_invalid_currency() {
        let server = StubServer::spawn(
            "200 OK",
            r#"{"success": false, "error": {"code": 402, "info": "invalid target currency"}}"#,
        )
        .await;

        let err = server
            .client("secret-key")
            .convert(dec!(1.00), "RUB", "XXX")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(ref msg) if msg.contains("invalid currency")));
    }

    #[tokio::test]
    async fn test_convert_reports_rejected_key_as_invalid_currency() {
        let server = StubServer::spawn(
            "401 Unauthorized",
            r#"{"message": "Invalid authentication credentials"}"#,
        )
        .await;

        let err = server
            .client("bad-key")
            .convert(dec!(50.00), "RUB", "USD")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("invalid currency"));
    }

    #[tokio::test]
    async fn test_convert_reports_error_body_without_status_as_invalid_currency() {
        // Some quota replies come back as 200 with only a message.
        let server = StubServer::spawn("200 OK", r#"{"message": "API rate limit reached"}"#).await;

        let err = server
            .client("secret-key")
            .convert(dec!(50.00), "RUB", "USD")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_convert_reports_unreachable_service_as_invalid_currency() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = local_client("secret-key", &format!("http://{addr}/currency_data/convert"))
            .convert(dec!(50.00), "RUB", "USD")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidRequest);
    }
}
