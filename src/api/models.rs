use crate::api::{ModelInfo, ModelsResponse};
use crate::core::error::{summarize_error_body, ChatError};
use crate::core::request::{build_models_request, ApiEndpoint};
use crate::core::transport::Transport;

pub async fn fetch_models(
    transport: &dyn Transport,
    endpoint: &ApiEndpoint,
    api_key: &str,
) -> Result<ModelsResponse, ChatError> {
    let request = build_models_request(endpoint, api_key)?;
    let response = transport.execute(request).await?;

    let status = response.status;
    let retry_after = response.retry_after;
    let success = response.is_success();
    let body = response.text().await?;

    if !success {
        // A 503 here is about the catalogue, not a particular model.
        if status == 503 {
            return Err(ChatError::ServerError {
                status,
                message: summarize_error_body(&body),
            });
        }
        return Err(ChatError::from_status(status, &body, retry_after, ""));
    }

    serde_json::from_str::<ModelsResponse>(&body)
        .map_err(|err| ChatError::Decoding(format!("models list: {err}")))
}

/// Newest first, then by id for a stable order.
pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| match (a.created, b.created) {
        (Some(a_created), Some(b_created)) => {
            b_created.cmp(&a_created).then_with(|| a.id.cmp(&b.id))
        }
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::{HttpMethod, HttpResponse};
    use crate::utils::test_utils::ScriptedTransport;

    fn model(id: &str, created: Option<u64>) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            name: None,
            created,
            context_length: None,
            pricing: None,
        }
    }

    #[test]
    fn sorts_newest_first_then_by_id() {
        let mut models = vec![
            model("b/undated", None),
            model("a/old", Some(100)),
            model("z/new", Some(300)),
            model("a/undated", None),
            model("y/new", Some(300)),
        ];
        sort_models(&mut models);
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["y/new", "z/new", "a/old", "a/undated", "b/undated"]);
    }

    #[tokio::test]
    async fn fetches_and_decodes_models() {
        let body = r#"{"data":[
            {"id":"openai/gpt-4o","name":"GPT-4o","created":1715367049,"context_length":128000,
             "pricing":{"prompt":"0.000005","completion":"0.000015"}},
            {"id":"meta-llama/llama-3-8b-instruct"}
        ]}"#;
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::from_text(200, body))]);

        let response = fetch_models(&transport, &ApiEndpoint::default(), "sk-or-1")
            .await
            .unwrap();
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].context_length, Some(128_000));
        assert_eq!(
            response.data[0].pricing.as_ref().and_then(|p| p.prompt.as_deref()),
            Some("0.000005")
        );
        assert_eq!(response.data[1].name, None);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert!(requests[0].url.as_str().ends_with("/models"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_invalid_key() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::from_text(
            401,
            r#"{"error":{"message":"No auth credentials found","code":401}}"#,
        ))]);
        let err = fetch_models(&transport, &ApiEndpoint::default(), "sk-or-1")
            .await
            .unwrap_err();
        assert_eq!(err, ChatError::ApiKeyInvalid);
    }

    #[tokio::test]
    async fn unavailable_catalogue_is_a_server_error() {
        let transport =
            ScriptedTransport::new(vec![Ok(HttpResponse::from_text(503, "maintenance"))]);
        let err = fetch_models(&transport, &ApiEndpoint::default(), "sk-or-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChatError::ServerError {
                status: 503,
                message: "maintenance".to_string()
            }
        );
    }

    #[tokio::test]
    async fn malformed_body_is_a_decoding_error() {
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::from_text(200, "<html>"))]);
        let err = fetch_models(&transport, &ApiEndpoint::default(), "sk-or-1")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Decoding(_)));
    }
}
