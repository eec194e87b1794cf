use super::*;

/// Browser transport over `fetch`. Non-2xx replies come back as data; only a
/// failed exchange is an error.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct GlooTransport;

#[async_trait(?Send)]
impl ActionTransport for GlooTransport {
    async fn post(&self, call: ActionCall) -> Result<HttpReply, DispatchError> {
        let mut builder = Request::post(&call.url);
        for (name, value) in &call.headers {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(call.body)
            .map_err(|error| DispatchError::Encode(error.to_string()))?;

        let response = request
            .send()
            .await
            .map_err(|error| DispatchError::Network(error.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| DispatchError::Network(error.to_string()))?;
        Ok(HttpReply { status, body })
    }
}
