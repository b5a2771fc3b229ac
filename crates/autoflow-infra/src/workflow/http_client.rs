//! reqwest-backed `HttpClient` for `http_request` steps.
//!
//! The client carries the configured timeout itself, so a hung server is cut
//! off here even when the engine's outer bound is looser. Responses with a
//! JSON body come back parsed; anything else is returned as text.

use std::collections::HashMap;
use std::time::Duration;

use autoflow_core::workflow::step_runner::{HttpClient, StepError};
use autoflow_types::workflow::{HttpRequestConfig, StepKind};
use futures_util::future::BoxFuture;
use serde_json::{json, Value};

/// Live HTTP transport.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    /// Build a client with the given per-request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, timeout })
    }

    async fn execute(&self, request: HttpRequestConfig) -> Result<Value, StepError> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| StepError::InvalidConfig {
                step_type: StepKind::HttpRequest,
                message: format!("invalid HTTP method: {}", request.method),
            })?;

        let mut builder = self.client.request(method, &request.url);
        if let Some(headers) = &request.headers {
            for (key, value) in headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
        }
        builder = match request.body {
            Some(Value::String(text)) => builder.body(text),
            Some(Value::Null) | None => builder,
            Some(body) => builder.json(&body),
        };

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StepError::Http(format!(
                "{} returned status {status}",
                request.url
            )));
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let text = response.text().await.map_err(|e| self.map_error(e))?;
        let data = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        tracing::info!(
            url = %request.url,
            status = status.as_u16(),
            "http_request step completed"
        );

        Ok(json!({
            "status": status.as_u16(),
            "headers": headers,
            "data": data,
        }))
    }

    fn map_error(&self, e: reqwest::Error) -> StepError {
        if e.is_timeout() {
            StepError::Timeout(self.timeout)
        } else {
            StepError::Http(e.to_string())
        }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn send(&self, request: HttpRequestConfig) -> BoxFuture<'_, Result<Value, StepError>> {
        Box::pin(self.execute(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(timeout: Duration) -> ReqwestHttpClient {
        ReqwestHttpClient::new(timeout, "autoflow-test").unwrap()
    }

    fn request(method: &str, url: String) -> HttpRequestConfig {
        HttpRequestConfig {
            method: method.to_string(),
            url,
            headers: None,
            body: None,
        }
    }

    #[tokio::test]
    async fn test_json_response_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users"))
            .and(header("x-api-key", "k1"))
            .and(header("user-agent", "autoflow-test"))
            .and(body_json(json!({"name": "Ada"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-served-by", "mock")
                    .set_body_json(json!({"email": "a@b.c"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut req = request("post", format!("{}/users", server.uri()));
        req.headers = Some(HashMap::from([("x-api-key".to_string(), "k1".to_string())]));
        req.body = Some(json!({"name": "Ada"}));

        let result = client(Duration::from_secs(5)).send(req).await.unwrap();
        assert_eq!(result["status"], 200);
        assert_eq!(result["data"], json!({"email": "a@b.c"}));
        assert_eq!(result["headers"]["x-served-by"], "mock");
    }

    #[tokio::test]
    async fn test_string_body_is_sent_raw() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/notes/1"))
            .and(body_string("plain note"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut req = request("PUT", format!("{}/notes/1", server.uri()));
        req.body = Some(Value::String("plain note".to_string()));
        let result = client(Duration::from_secs(5)).send(req).await.unwrap();
        assert_eq!(result["status"], 204);
        assert_eq!(result["data"], "");
    }

    #[tokio::test]
    async fn test_text_response_stays_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let result = client(Duration::from_secs(5))
            .send(request("GET", format!("{}/ping", server.uri())))
            .await
            .unwrap();
        assert_eq!(result["data"], "pong");
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "missing"})))
            .mount(&server)
            .await;

        let err = client(Duration::from_secs(5))
            .send(request("GET", format!("{}/nope", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Http(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client(Duration::from_millis(200))
            .send(request("GET", format!("{}/slow", server.uri())))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Timeout(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_invalid_method_is_config_error() {
        let err = client(Duration::from_secs(1))
            .send(request("GE T", "http://127.0.0.1:9/".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidConfig { .. }));
    }
}
