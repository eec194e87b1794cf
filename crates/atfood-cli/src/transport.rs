use async_trait::async_trait;
use atfood_client_core::{ActionCall, ActionTransport, DispatchError, HttpReply};

/// Native transport. No client-side timeout is set; the request runs until
/// the server or the network gives up.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait(?Send)]
impl ActionTransport for ReqwestTransport {
    async fn post(&self, call: ActionCall) -> Result<HttpReply, DispatchError> {
        let mut request = self.http.post(call.url.as_str()).body(call.body);
        for (name, value) in &call.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|error| DispatchError::Network(error.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| DispatchError::Network(error.to_string()))?;
        tracing::debug!(status, bytes = body.len(), "atfood endpoint replied");
        Ok(HttpReply { status, body })
    }
}
