//! Webhook notification.
//!
//! Fires a best-effort POST to the configured revalidation endpoint when a
//! catalog write commits. Dispatch is detached: the triggering request path
//! never waits on delivery and cannot observe its outcome. Delivery failure
//! leaves a debug line inside the detached task and nothing else.

use metrics::counter;
use tracing::debug;
use url::Url;
use vetrina_api_types::{ChangeKind, WebhookPayload};

use crate::domain::products::SaveKind;

/// Outcome of a notification trigger: either a detached dispatch was
/// launched or a guard suppressed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Fired,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Automated intermediate saves never notify.
    Autosave,
    /// No target endpoint configured.
    NoEndpoint,
}

impl SkipReason {
    fn as_str(self) -> &'static str {
        match self {
            SkipReason::Autosave => "autosave",
            SkipReason::NoEndpoint => "no_endpoint",
        }
    }
}

pub struct WebhookNotifier {
    endpoint: Option<Url>,
    secret: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// `endpoint` is the frontend base URL; `/api/revalidate` is appended at
    /// dispatch time. `None` disables the notifier.
    pub fn new(endpoint: Option<Url>, secret: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vetrina/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            endpoint,
            secret,
            client,
        })
    }

    /// Trigger for a committed save. `previously_existed` selects update
    /// versus create semantics in the payload.
    pub fn product_saved(&self, id: u64, kind: SaveKind, previously_existed: bool) -> Dispatch {
        if kind == SaveKind::Autosave {
            return self.skip(id, SkipReason::Autosave);
        }
        let change = if previously_existed {
            ChangeKind::Update
        } else {
            ChangeKind::Create
        };
        self.trigger(id, change)
    }

    /// Independent trigger for a committed delete. Deletes have no autosave
    /// analogue, so only the endpoint guard applies.
    pub fn product_deleted(&self, id: u64) -> Dispatch {
        self.trigger(id, ChangeKind::Delete)
    }

    fn trigger(&self, id: u64, change: ChangeKind) -> Dispatch {
        let Some(endpoint) = &self.endpoint else {
            return self.skip(id, SkipReason::NoEndpoint);
        };

        let payload = WebhookPayload {
            secret: self.secret.clone(),
            path: format!("/products/{id}"),
            kind: change,
        };
        let url = revalidate_url(endpoint);
        let client = self.client.clone();

        counter!("vetrina_webhook_fired_total").increment(1);
        debug!(
            product_id = id,
            change = change.as_str(),
            path = %payload.path,
            "Dispatching revalidation webhook"
        );

        // Dispatch and detach: the handle is dropped on purpose, so delivery
        // is unobservable from the triggering path.
        tokio::spawn(async move {
            deliver(&client, &url, &payload).await;
        });

        Dispatch::Fired
    }

    fn skip(&self, id: u64, reason: SkipReason) -> Dispatch {
        counter!("vetrina_webhook_skipped_total", "reason" => reason.as_str()).increment(1);
        debug!(
            product_id = id,
            reason = reason.as_str(),
            "Revalidation webhook skipped"
        );
        Dispatch::Skipped(reason)
    }
}

/// Appended rather than URL-resolved, so an endpoint with a subpath keeps
/// the subpath.
fn revalidate_url(endpoint: &Url) -> String {
    format!("{}/api/revalidate", endpoint.as_str().trim_end_matches('/'))
}

async fn deliver(client: &reqwest::Client, url: &str, payload: &WebhookPayload) {
    match client.post(url).json(payload).send().await {
        Ok(response) => debug!(
            status = response.status().as_u16(),
            url, "Revalidation webhook delivered"
        ),
        Err(error) => debug!(error = %error, url, "Revalidation webhook delivery failed"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;

    use super::*;

    fn notifier(endpoint: Option<&str>) -> WebhookNotifier {
        let endpoint = endpoint.map(|raw| Url::parse(raw).expect("endpoint url"));
        WebhookNotifier::new(endpoint, "abc".to_string()).expect("notifier")
    }

    #[test]
    fn autosave_is_skipped_before_any_other_guard() {
        let notifier = notifier(None);
        assert_eq!(
            notifier.product_saved(5, SaveKind::Autosave, true),
            Dispatch::Skipped(SkipReason::Autosave)
        );
    }

    #[tokio::test]
    async fn missing_endpoint_is_skipped() {
        let notifier = notifier(None);
        assert_eq!(
            notifier.product_saved(5, SaveKind::Manual, true),
            Dispatch::Skipped(SkipReason::NoEndpoint)
        );
        assert_eq!(
            notifier.product_deleted(5),
            Dispatch::Skipped(SkipReason::NoEndpoint)
        );
    }

    #[test]
    fn revalidate_route_is_appended_to_the_endpoint() {
        let base = Url::parse("https://frontend.example").unwrap();
        assert_eq!(
            revalidate_url(&base),
            "https://frontend.example/api/revalidate"
        );

        let with_subpath = Url::parse("https://frontend.example/shop/").unwrap();
        assert_eq!(
            revalidate_url(&with_subpath),
            "https://frontend.example/shop/api/revalidate"
        );
    }

    #[tokio::test]
    async fn delivery_posts_the_payload_as_json() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/revalidate")
                    .header("content-type", "application/json")
                    .json_body(serde_json::json!({
                        "secret": "abc",
                        "path": "/products/5",
                        "type": "update"
                    }));
                then.status(200);
            })
            .await;

        let payload = WebhookPayload {
            secret: "abc".to_string(),
            path: "/products/5".to_string(),
            kind: vetrina_api_types::ChangeKind::Update,
        };
        let client = reqwest::Client::new();
        deliver(&client, &format!("{}/api/revalidate", server.base_url()), &payload).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_swallowed() {
        let payload = WebhookPayload {
            secret: "abc".to_string(),
            path: "/products/5".to_string(),
            kind: vetrina_api_types::ChangeKind::Delete,
        };
        let client = reqwest::Client::new();
        // Nothing listens here; delivery must not panic or error outward.
        deliver(&client, "http://127.0.0.1:9/api/revalidate", &payload).await;
    }

    #[tokio::test]
    async fn fired_dispatch_reaches_the_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/revalidate");
                then.status(200);
            })
            .await;

        let notifier = notifier(Some(&server.base_url()));
        assert_eq!(
            notifier.product_saved(5, SaveKind::Manual, false),
            Dispatch::Fired
        );

        // The dispatch task is detached; poll until it lands.
        for _ in 0..100 {
            if mock.hits_async().await >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(mock.hits_async().await, 1);
    }
}
