//! Test Helper Utilities
//!
//! In-memory fakes for the engine's two seams: the structured source catalog
//! and the generative provider. Neither touches the network.

#![allow(dead_code)]

use async_trait::async_trait;
use litmeta_resolve::{
    CallOutcome, FallbackRequest, Field, GenerativeProvider, ProviderReply, SourceCatalog,
    SourceFields, SourceId, SourceSnapshot, WebSearch, WorkQuery,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ================================================================================================
// Source catalog
// ================================================================================================

/// Catalog answering from canned per-source results
#[derive(Default)]
pub struct FakeCatalog {
    responses: HashMap<SourceId, SourceFields>,
    fetches: Mutex<Vec<SourceId>>,
    /// Prerequisites already in the snapshot when each source was fetched
    prerequisites_seen: Mutex<HashMap<SourceId, bool>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canned result for a source (context text used for gating)
    pub fn with(mut self, source: SourceId, context: &str, values: &[(Field, &str)]) -> Self {
        let mut fields = SourceFields::with_context(context);
        for (field, value) in values {
            fields.insert(*field, Some(value.to_string()));
        }
        self.responses.insert(source, fields);
        self
    }

    /// Attach a knowledge-graph identifier to a canned result
    pub fn with_cross_ref(mut self, source: SourceId, qid: &str) -> Self {
        self.responses.entry(source).or_default().cross_ref = Some(qid.to_string());
        self
    }

    pub fn fetches(&self) -> Vec<SourceId> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn prerequisites_were_ready(&self, source: SourceId) -> Option<bool> {
        self.prerequisites_seen.lock().unwrap().get(&source).copied()
    }
}

#[async_trait]
impl SourceCatalog for FakeCatalog {
    async fn fetch(
        &self,
        source: SourceId,
        _work: &WorkQuery<'_>,
        snapshot: &SourceSnapshot,
    ) -> Option<SourceFields> {
        self.fetches.lock().unwrap().push(source);
        let ready = source
            .prerequisites()
            .iter()
            .all(|prerequisite| snapshot.is_fetched(*prerequisite));
        self.prerequisites_seen.lock().unwrap().insert(source, ready);
        self.responses.get(&source).cloned()
    }
}

// ================================================================================================
// Generative provider
// ================================================================================================

/// Provider replaying scripted replies; `Failed` once the script runs out
pub struct FakeProvider {
    id: String,
    script: Mutex<VecDeque<ProviderReply>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<Vec<Field>>>,
}

impl FakeProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply with the given values
    pub fn answers(self, values: &[(Field, &str)]) -> Self {
        let fields: BTreeMap<Field, String> = values
            .iter()
            .map(|(field, value)| (*field, value.to_string()))
            .collect();
        self.script.lock().unwrap().push_back(ProviderReply::success(fields));
        self
    }

    /// Queue a reply carrying only an outcome signal
    pub fn signals(self, outcome: CallOutcome) -> Self {
        self.script.lock().unwrap().push_back(ProviderReply::empty(outcome));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Missing-field lists of every request received
    pub fn requested(&self) -> Vec<Vec<Field>> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeProvider for FakeProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &FallbackRequest<'_>) -> ProviderReply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.missing.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ProviderReply::empty(CallOutcome::Failed))
    }
}

// ================================================================================================
// Web search
// ================================================================================================

/// Search returning a fixed digest (or nothing)
pub struct FakeSearch {
    digest: Option<String>,
    queries: Mutex<Vec<(String, String)>>,
}

impl FakeSearch {
    pub fn new(digest: Option<&str>) -> Self {
        Self {
            digest: digest.map(str::to_string),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, title: &str, author: &str) -> Option<String> {
        self.queries
            .lock()
            .unwrap()
            .push((title.to_string(), author.to_string()));
        self.digest.clone()
    }
}

// ================================================================================================
// Scripted HTTP endpoint
// ================================================================================================

/// Local HTTP server answering each connection with the next scripted reply
///
/// Replies close the connection, so every client request gets its own
/// accept. Request bodies are recorded in arrival order.
pub struct ScriptedServer {
    pub base_url: String,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    pub async fn start(replies: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let seen = bodies.clone();

        tokio::spawn(async move {
            for (status, body) in replies {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request_body(&mut stream).await;
                seen.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            bodies,
        }
    }

    /// Bodies of the requests served so far
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn read_request_body(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let start = end + 4;
        if buf.len() >= start + length {
            return String::from_utf8_lossy(&buf[start..start + length]).into_owned();
        }
    }
}

/// Chat completions response body with the given message object
pub fn chat_body(message: serde_json::Value) -> String {
    serde_json::json!({ "choices": [{ "message": message }] }).to_string()
}

// ================================================================================================
// Fixtures
// ================================================================================================

/// Catalog resolving every structured field of "Savaş ve Barış"
pub fn war_and_peace_catalog() -> FakeCatalog {
    FakeCatalog::new()
        .with(
            SourceId::ForeignWiki,
            "War and Peace is a novel by the Russian author Leo Tolstoy. It was first published in 1869.",
            &[
                (Field::FirstPublished, "1869"),
                (Field::Genre, "Novel"),
                (Field::CountryTradition, "Russia"),
                (Field::Synopsis, "War and Peace is a novel by the Russian author Leo Tolstoy."),
            ],
        )
        .with_cross_ref(SourceId::ForeignWiki, "Q161531")
        .with(
            SourceId::Wikidata,
            "novel by Leo Tolstoy",
            &[
                (Field::OriginalTitle, "Война и мир"),
                (Field::FirstPublished, "1867"),
                (Field::CountryTradition, "Russian Empire"),
            ],
        )
        .with_cross_ref(SourceId::Wikidata, "Q161531")
}
