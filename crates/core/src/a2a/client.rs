//! # Remote Call Client
//!
//! Sends one request to a worker's message endpoint with a per-attempt
//! timeout and bounded retry.
//!
//! Only transport failures (unreachable, timeout) are retried. A service
//! that answers with an error status or an unreadable body has spoken;
//! asking again would not change the answer.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use super::card::ServiceCard;
use super::wire::{MessageResponse, SendMessageRequest};
use crate::config::RetryPolicy;
use crate::error::{CallError, CallErrorKind};

#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl RemoteClient {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_client(reqwest::Client::new(), policy)
    }

    pub fn with_client(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[tracing::instrument(skip(self, card, request), fields(service = %card.name, id = %request.id))]
    pub async fn send(
        &self,
        card: &ServiceCard,
        request: &SendMessageRequest,
        timeout: Duration,
    ) -> Result<MessageResponse, CallError> {
        let fail = |kind: CallErrorKind, attempts: u32| CallError {
            service: card.name.clone(),
            kind,
            attempts,
        };

        let body = serde_json::to_vec(request)
            .map_err(|e| fail(CallErrorKind::Malformed(format!("request: {}", e)), 0))?;
        let url = card.send_message_url();

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(url, &body, &request.id, timeout).await {
                Ok(response) => {
                    tracing::debug!("'{}' answered on attempt {}", card.name, attempt);
                    return Ok(response);
                }
                Err(kind) if kind.is_retryable() && attempt < self.policy.max_attempts() => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        "attempt {}/{} to '{}' failed: {}, retrying in {:?}",
                        attempt,
                        self.policy.max_attempts(),
                        card.name,
                        kind,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(kind) => return Err(fail(kind, attempt)),
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        body: &[u8],
        expected_id: &str,
        timeout: Duration,
    ) -> Result<MessageResponse, CallErrorKind> {
        let exchange = async {
            let response = self
                .http
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_vec())
                .send()
                .await
                .map_err(transport_error(timeout))?;

            let status = response.status();
            let bytes = response.bytes().await.map_err(transport_error(timeout))?;

            if !status.is_success() {
                return Err(CallErrorKind::Application {
                    status: status.as_u16(),
                    message: String::from_utf8_lossy(&bytes).chars().take(512).collect(),
                });
            }
            Ok(bytes)
        };

        let bytes = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| CallErrorKind::Timeout(timeout))??;

        let response: MessageResponse = serde_json::from_slice(&bytes)
            .map_err(|e| CallErrorKind::Malformed(e.to_string()))?;
        if response.id != expected_id {
            return Err(CallErrorKind::Malformed(format!(
                "response id '{}' does not match request id '{}'",
                response.id, expected_id
            )));
        }
        Ok(response)
    }
}

fn transport_error(timeout: Duration) -> impl Fn(reqwest::Error) -> CallErrorKind {
    move |e| {
        if e.is_timeout() {
            CallErrorKind::Timeout(timeout)
        } else {
            CallErrorKind::Unreachable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::Envelope;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            ..RetryPolicy::default()
        }
    }

    fn card(base: &str) -> ServiceCard {
        ServiceCard::new("milestone", "test", vec!["milestone_planning".into()], base)
    }

    /// Replies with the request's own id.
    struct EchoId;

    impl Respond for EchoId {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
            let reply = MessageResponse::new(
                body["id"].as_str().unwrap(),
                Envelope::assistant_text("ok"),
            );
            ResponseTemplate::new(200).set_body_json(reply)
        }
    }

    #[tokio::test]
    async fn test_successful_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send_message"))
            .respond_with(EchoId)
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteClient::new(fast_retry(2));
        let request = SendMessageRequest::new(Envelope::user_text("hi"));
        let response = client
            .send(&card(&server.uri()), &request, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(response.id, request.id);
        assert_eq!(response.response.text(), "ok");
    }

    #[tokio::test]
    async fn test_application_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteClient::new(fast_retry(3));
        let err = client
            .send(
                &card(&server.uri()),
                &SendMessageRequest::new(Envelope::user_text("hi")),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 1);
        assert!(matches!(err.kind, CallErrorKind::Application { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .expect(3)
            .mount(&server)
            .await;

        let client = RemoteClient::new(fast_retry(2));
        let started = std::time::Instant::now();
        let err = client
            .send(
                &card(&server.uri()),
                &SendMessageRequest::new(Envelope::user_text("hi")),
                Duration::from_millis(150),
            )
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.kind, CallErrorKind::Timeout(Duration::from_millis(150)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_mismatched_id_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(MessageResponse::new("other", Envelope::assistant_text("ok"))),
            )
            .mount(&server)
            .await;

        let client = RemoteClient::new(fast_retry(2));
        let err = client
            .send(
                &card(&server.uri()),
                &SendMessageRequest::new(Envelope::user_text("hi")),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind.label(), "malformed");
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn test_unreachable_uses_every_attempt() {
        let client = RemoteClient::new(fast_retry(1));
        let err = client
            .send(
                &card("http://127.0.0.1:9"),
                &SendMessageRequest::new(Envelope::user_text("hi")),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 2);
        assert_eq!(err.kind.label(), "unreachable");
    }
}
