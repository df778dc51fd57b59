use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;

use super::StateChangedEvent;

#[derive(Debug, Clone)]
pub struct HaHttpClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl HaHttpClient {
    pub fn new(url: &str, token: &str) -> anyhow::Result<Self> {
        let client = HttpClientConfig::new(Some(token.to_owned())).new_tracing_client()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_owned(),
        })
    }
}

impl HaHttpClient {
    /// Current state of an entity, `None` if HA does not know it.
    #[tracing::instrument(skip(self))]
    pub async fn get_state(&self, entity_id: &str) -> anyhow::Result<Option<StateChangedEvent>> {
        let response = self
            .client
            .get(format!("{}/api/states/{}", self.base_url, entity_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let state = response
            .error_for_status()?
            .json::<StateChangedEvent>()
            .await
            .with_context(|| format!("Error getting state of {}", entity_id))?;

        Ok(Some(state))
    }

    #[tracing::instrument(skip(self))]
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
    ) -> anyhow::Result<()> {
        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);

        tracing::info!("Calling HA service {}: {:?}", url, serde_json::to_string(&service_data)?);

        let response = self.client.post(url).json(&service_data).send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("Response: {} - {}", status, body);

        if !status.is_success() {
            anyhow::bail!("HA service {}/{} failed with {}: {}", domain, service, status, body);
        }

        Ok(())
    }
}
