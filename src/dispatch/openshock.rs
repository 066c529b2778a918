//! OpenShock control API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Serialize;

use super::{DispatchError, DispatchResult, StimulusSink};
use crate::{
    config::DeviceSettings,
    cue::{Cue, CueKind, Intensity},
};

/// Wire body for `POST /2/shockers/control`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest<'a> {
    pub shocks: Vec<ShockControl<'a>>,
    pub custom_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShockControl<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub kind: CueKind,
    pub intensity: Intensity,
    /// Milliseconds
    pub duration: u64,
}

impl<'a> ControlRequest<'a> {
    pub fn for_cue(device_id: &'a str, custom_name: &'a str, cue: &Cue) -> Self {
        Self {
            shocks: vec![ShockControl {
                id: device_id,
                kind: cue.kind,
                intensity: cue.intensity,
                duration: cue.duration.as_millis() as u64,
            }],
            custom_name,
        }
    }
}

/// Delivers cues to one shocker through the OpenShock HTTP API
pub struct OpenShockSink {
    client: reqwest::Client,
    device: DeviceSettings,
    timeout: Duration,
}

impl OpenShockSink {
    /// Build a client whose requests give up after `timeout`
    pub fn new(device: DeviceSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            device,
            timeout,
        })
    }
}

#[async_trait]
impl StimulusSink for OpenShockSink {
    async fn deliver(&self, cue: &Cue) -> DispatchResult {
        let body = ControlRequest::for_cue(&self.device.device_id, &self.device.custom_name, cue);

        tracing::debug!(
            kind = %cue.kind,
            intensity = cue.intensity.get(),
            duration_ms = cue.duration.as_millis() as u64,
            "sending control request"
        );

        let response = self
            .client
            .post(&self.device.endpoint)
            .header(header::ACCEPT, "application/json")
            .header("OpenShockToken", self.device.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| classify_transport_error(err, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| DispatchError::MalformedResponse(err.to_string()))?;
        tracing::debug!(status = status.as_u16(), body = %text, "control response");

        classify_status(status, text)
    }
}

fn classify_transport_error(err: reqwest::Error, timeout: Duration) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Timeout(timeout)
    } else {
        DispatchError::Network(err.to_string())
    }
}

/// Map an HTTP status to a dispatch outcome
pub(crate) fn classify_status(status: StatusCode, body: String) -> DispatchResult {
    if status.is_success() {
        return Ok(());
    }

    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(DispatchError::Unauthorized { status: code })
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(DispatchError::MalformedRequest { status: code, body })
        }
        _ => Err(DispatchError::Rejected { status: code, body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_request_shape() {
        let cue = Cue::new(
            Duration::from_secs(2),
            CueKind::Vibrate,
            Intensity::new(40).unwrap(),
            Duration::from_millis(1500),
        );
        let body = ControlRequest::for_cue("abc-123", "ImmersiveASMR", &cue);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "shocks": [{
                    "id": "abc-123",
                    "type": "Vibrate",
                    "intensity": 40,
                    "duration": 1500
                }],
                "customName": "ImmersiveASMR"
            })
        );
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK, String::new()), Ok(()));
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            Err(DispatchError::Unauthorized { status: 401 })
        );
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, String::new()),
            Err(DispatchError::Unauthorized { status: 403 })
        );
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "bad intensity".into()),
            Err(DispatchError::MalformedRequest { status: 400, .. })
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            Err(DispatchError::Rejected { status: 503, .. })
        ));
    }
}
