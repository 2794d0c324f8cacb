use reqwest::Client;
use serde_json::json;

/// Discord webhook notifier for the operator channel
#[derive(Clone)]
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    /// Best-effort send - failures are logged, never propagated.
    pub async fn send(&self, message: &str) {
        let payload = json!({ "content": message });

        match self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Notification delivered");
            }
            Ok(response) => {
                tracing::error!("Discord webhook failed: {}", response.status());
            }
            Err(e) => {
                tracing::error!("Failed to send Discord webhook: {}", e);
            }
        }
    }
}
