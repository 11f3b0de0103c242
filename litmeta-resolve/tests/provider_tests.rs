// Generative Provider Wire Tests
//
// Providers talk to a local scripted HTTP server, so status mapping, reply
// parsing and the search-backed second stage run over real requests.

mod helpers;

use helpers::{chat_body, FakeSearch, ScriptedServer};
use litmeta_resolve::providers::{ChatCompletionsProvider, TextGenerationProvider};
use litmeta_resolve::{
    Availability, CallOutcome, FallbackRequest, Field, GenerativeProvider, ProviderReply, QuotaRouter,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const TITLE: &str = "Kürk Mantolu Madonna";
const AUTHOR: &str = "Sabahattin Ali";

fn chat_provider(server: &ScriptedServer) -> ChatCompletionsProvider {
    ChatCompletionsProvider::new(
        "groq",
        &server.base_url,
        "test-model",
        Some("gsk-test".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn request<'a>(missing: &'a [Field], known: &'a BTreeMap<Field, String>) -> FallbackRequest<'a> {
    FallbackRequest {
        title: TITLE,
        author: AUTHOR,
        missing,
        known,
    }
}

// ================================================================================================
// Direct answers
// ================================================================================================

#[tokio::test]
async fn test_reasoning_trace_answers_when_content_is_empty() {
    let server = ScriptedServer::start(vec![(
        200,
        chat_body(json!({
            "content": "",
            "reasoning": "First edition appeared in 1943.\n```json\n{\"first_published\": \"1943\"}\n```"
        })),
    )])
    .await;
    let known = BTreeMap::new();

    let reply = chat_provider(&server)
        .complete(&request(&[Field::FirstPublished], &known))
        .await;

    assert_eq!(reply.outcome, CallOutcome::Success);
    assert_eq!(reply.fields.unwrap()[&Field::FirstPublished], "1943");
    assert_eq!(server.bodies().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_status_is_signalled() {
    let server = ScriptedServer::start(vec![(401, json!({"error": "invalid key"}).to_string())]).await;
    let known = BTreeMap::new();

    let reply = chat_provider(&server).complete(&request(&[Field::Genre], &known)).await;

    assert_eq!(reply, ProviderReply::empty(CallOutcome::Unauthorized));
}

// ================================================================================================
// Search-backed second stage
// ================================================================================================

#[tokio::test]
async fn test_unknown_work_is_answered_from_search_context() {
    let server = ScriptedServer::start(vec![
        (200, chat_body(json!({"content": "WEB_SEARCH"}))),
        (
            200,
            chat_body(json!({"content": "{\"first_published\": \"1943\", \"genre\": \"Novel\"}"})),
        ),
    ])
    .await;
    let search = Arc::new(FakeSearch::new(Some("Kürk Mantolu Madonna: A 1943 novel by Sabahattin Ali.")));
    let provider = chat_provider(&server).with_search(search.clone());
    let known = BTreeMap::new();

    let reply = provider
        .complete(&request(&[Field::FirstPublished, Field::Genre], &known))
        .await;

    assert_eq!(reply.outcome, CallOutcome::Success);
    let fields = reply.fields.unwrap();
    assert_eq!(fields[&Field::FirstPublished], "1943");
    assert_eq!(fields[&Field::Genre], "Novel");

    assert_eq!(search.queries(), vec![(TITLE.to_string(), AUTHOR.to_string())]);
    let bodies = server.bodies();
    assert_eq!(bodies.len(), 2);
    assert!(!bodies[0].contains("Search results:"));
    assert!(bodies[1].contains("Search results:"));
    assert!(bodies[1].contains("A 1943 novel by Sabahattin Ali."));
}

#[tokio::test]
async fn test_search_request_without_backend_fails() {
    let server = ScriptedServer::start(vec![(200, chat_body(json!({"content": "WEB_SEARCH"})))]).await;
    let known = BTreeMap::new();

    let reply = chat_provider(&server).complete(&request(&[Field::Genre], &known)).await;

    assert_eq!(reply.outcome, CallOutcome::Failed);
    assert_eq!(reply.fields, None);
    assert_eq!(server.bodies().len(), 1);
}

#[tokio::test]
async fn test_empty_search_skips_second_call() {
    let server = ScriptedServer::start(vec![(200, chat_body(json!({"content": "web_search"})))]).await;
    let search = Arc::new(FakeSearch::new(None));
    let known = BTreeMap::new();

    let reply = chat_provider(&server)
        .with_search(search.clone())
        .complete(&request(&[Field::Genre], &known))
        .await;

    assert_eq!(reply.outcome, CallOutcome::Failed);
    assert_eq!(search.queries().len(), 1);
    assert_eq!(server.bodies().len(), 1);
}

#[tokio::test]
async fn test_rate_limit_on_second_stage_is_signalled() {
    let server = ScriptedServer::start(vec![
        (200, chat_body(json!({"content": "WEB_SEARCH"}))),
        (429, json!({"error": "rate limited"}).to_string()),
    ])
    .await;
    let provider = chat_provider(&server).with_search(Arc::new(FakeSearch::new(Some("a 1943 novel"))));
    let known = BTreeMap::new();

    let reply = provider.complete(&request(&[Field::Genre], &known)).await;

    assert_eq!(reply.outcome, CallOutcome::RateLimited);
    assert_eq!(server.bodies().len(), 2);
}

// ================================================================================================
// Text generation
// ================================================================================================

#[tokio::test]
async fn test_text_generation_reply_is_parsed() {
    let server = ScriptedServer::start(vec![(
        200,
        json!([{"generated_text": "{\"genre\": \"Novel\", \"synopsis\": \"\"}"}]).to_string(),
    )])
    .await;
    let provider =
        TextGenerationProvider::new("huggingface", &server.base_url, "org/model", None, Duration::from_secs(5))
            .unwrap();
    let known = BTreeMap::new();

    let reply = provider.complete(&request(&[Field::Genre], &known)).await;

    assert_eq!(reply.outcome, CallOutcome::Success);
    assert_eq!(reply.fields.unwrap().into_iter().collect::<Vec<_>>(), vec![(Field::Genre, "Novel".to_string())]);

    let body: serde_json::Value = serde_json::from_str(&server.bodies()[0]).unwrap();
    assert!(body["inputs"].as_str().unwrap().contains(TITLE));
    assert_eq!(body["parameters"]["return_full_text"], json!(false));
}

#[tokio::test]
async fn test_loading_model_starts_cooldown() {
    let server =
        ScriptedServer::start(vec![(503, json!({"error": "Model is currently loading"}).to_string())]).await;
    let provider =
        TextGenerationProvider::new("huggingface", &server.base_url, "org/model", None, Duration::from_secs(5))
            .unwrap();
    let router = QuotaRouter::with_cooldown(Duration::from_secs(60));
    let missing = [Field::Genre];
    let known = BTreeMap::new();
    let req = request(&missing, &known);

    let fields = router
        .call("huggingface", || async {
            let reply = provider.complete(&req).await;
            (reply.fields, reply.outcome)
        })
        .await;

    assert_eq!(fields, None);
    assert!(matches!(router.availability("huggingface"), Availability::CoolingDown(_)));
}
