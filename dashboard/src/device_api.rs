use std::time::Duration;

use anyhow::Context;
use incubator_common::ProfileRequest;

/// HTTP endpoints the device exposes for persistence and reboot.
#[derive(Debug, Clone)]
pub struct DeviceApi {
    client: reqwest::Client,
    base: String,
}

impl DeviceApi {
    pub fn new(base: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build device http client")?;
        Ok(Self { client, base })
    }

    pub async fn save_profile(&self, request: &ProfileRequest) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/api/profile", self.base))
            .json(request)
            .send()
            .await
            .context("profile request failed")?
            .error_for_status()
            .context("device rejected profile")?;
        Ok(())
    }

    pub async fn reset(&self) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/api/reset", self.base))
            .send()
            .await
            .context("reset request failed")?
            .error_for_status()
            .context("device rejected reset")?;
        Ok(())
    }
}
