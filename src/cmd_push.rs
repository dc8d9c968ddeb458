//! `sockethub push`: publish through the push transport.

use anyhow::Context;
use serde_json::Value;
use sockethub_config::Config;
use sockethub_runloop::{PushClient, PushEndpoint};
use sockethub_server::PushMessage;
use tracing::info;

/// Send one `{topic, data}` payload to a running server.
pub(crate) async fn push(
    config: &Config,
    topic: String,
    data: &str,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let endpoint = PushEndpoint::new(
        host.unwrap_or_else(|| config.push.host.clone()),
        port.unwrap_or(config.push.port),
    );
    let payload = build_payload(topic.clone(), data)?;

    let mut client = PushClient::connect(&endpoint)
        .await
        .with_context(|| format!("Failed to connect to push transport at {}", endpoint))?;
    client.push(payload).await?;
    client.close().await?;

    info!("Pushed {} to {}", topic, endpoint);
    println!("Pushed to '{}' via {}", topic, endpoint);
    Ok(())
}

/// `data` is parsed as JSON; anything else is sent as a JSON string.
fn build_payload(topic: String, data: &str) -> anyhow::Result<Vec<u8>> {
    let data = serde_json::from_str(data).unwrap_or_else(|_| Value::String(data.to_string()));
    Ok(serde_json::to_vec(&PushMessage { topic, data })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_with_json_data() {
        let payload = build_payload("news".to_string(), r#"{"title":"hi"}"#).unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value, json!({"topic": "news", "data": {"title": "hi"}}));
    }

    #[test]
    fn test_payload_with_plain_text() {
        let payload = build_payload("news".to_string(), "hello world").unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["data"], json!("hello world"));
    }
}
