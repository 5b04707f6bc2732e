use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::fs::NamedFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use common::Config;

use crate::audio;
use crate::pipeline::{Pipeline, PipelineRun, Progress, SkipReason, Stage, StageOutcome};
use crate::sessions::CompactionPolicy;

/// Default number of scraped posts kept for chat
pub const DEFAULT_MAX_DOCUMENTS: usize = 100;

/// Scraped content of finished runs, keyed by run id, bounded to the most
/// recent `capacity` runs.
#[derive(Debug)]
pub struct DocumentStore {
    capacity: usize,
    order: VecDeque<Uuid>,
    documents: HashMap<Uuid, String>,
}

impl DocumentStore {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            documents: HashMap::with_capacity(capacity),
        }
    }

    /// Store `content` for `id`, evicting the oldest runs past capacity.
    pub fn insert(&mut self, id: Uuid, content: String) {
        if self.documents.insert(id, content).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.documents.remove(&oldest);
                debug!("evicted scraped document for run {}", oldest);
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&String> {
        self.documents.get(id)
    }

    pub fn contains_key(&self, id: &Uuid) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub pipeline: Arc<Pipeline>,
    pub chat_policy: CompactionPolicy,
    /// Scraped posts available to chat sessions
    pub documents: Arc<RwLock<DocumentStore>>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, chat_policy: CompactionPolicy) -> Self {
        Self {
            started_at: Utc::now(),
            pipeline,
            chat_policy,
            documents: Arc::new(RwLock::new(DocumentStore::with_capacity(
                DEFAULT_MAX_DOCUMENTS,
            ))),
        }
    }

    pub fn with_document_limit(mut self, max_documents: usize) -> Self {
        self.documents = Arc::new(RwLock::new(DocumentStore::with_capacity(max_documents)));
        self
    }
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    documents: usize,
}

#[derive(Deserialize)]
struct PodcastRequest {
    url: String,
}

#[derive(Serialize)]
struct StageView {
    stage: Stage,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    elapsed_ms: u64,
}

/// Run report returned by `POST /api/podcast`.
#[derive(Serialize)]
struct PodcastResponse {
    id: Uuid,
    url: String,
    progress: Progress,
    blog_content: String,
    podcast_script: String,
    /// Server path to fetch the audio from, once synthesized
    audio_url: Option<String>,
    stages: Vec<StageView>,
    error: Option<String>,
}

impl From<&PipelineRun> for PodcastResponse {
    fn from(run: &PipelineRun) -> Self {
        let state = &run.state;
        let audio_url = std::path::Path::new(state.audio_file_path())
            .file_name()
            .map(|name| format!("/audio/{}", name.to_string_lossy()));

        let stages = run
            .reports
            .iter()
            .map(|r| StageView {
                stage: r.stage,
                status: r.outcome.label(),
                reason: match &r.outcome {
                    StageOutcome::Skipped(reason) => Some(*reason),
                    _ => None,
                },
                error: match &r.outcome {
                    StageOutcome::Failed(e) => Some(e.to_string()),
                    _ => None,
                },
                elapsed_ms: r.elapsed_ms,
            })
            .collect();

        PodcastResponse {
            id: run.id,
            url: state.url().to_string(),
            progress: state.progress(),
            blog_content: state.blog_content().to_string(),
            podcast_script: state.podcast_script().to_string(),
            audio_url,
            stages,
            error: run.failure().map(|e| e.to_string()),
        }
    }
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    let documents = state.documents.read().await.len();

    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        documents,
    })
}

/// Run the pipeline for one url. A failed stage answers 502 with the
/// partial run report.
#[post("/api/podcast", data = "<body>")]
async fn create_podcast(
    state: &State<AppState>,
    body: Json<PodcastRequest>,
) -> Result<(Status, Json<PodcastResponse>), Status> {
    let url = body.url.trim();
    if url.is_empty() {
        return Err(Status::BadRequest);
    }

    let run = state.pipeline.run(url).await;

    if !run.state.blog_content().is_empty() {
        state
            .documents
            .write()
            .await
            .insert(run.id, run.state.blog_content().to_string());
    }

    let status = if run.failure().is_some() {
        Status::BadGateway
    } else {
        Status::Ok
    };
    Ok((status, Json(PodcastResponse::from(&run))))
}

/// Serve a generated audio file. Only generated file names are accepted.
#[get("/audio/<file_name>")]
async fn audio_file(state: &State<AppState>, file_name: &str) -> Option<NamedFile> {
    if !audio::is_generated_file_name(file_name) {
        return None;
    }
    NamedFile::open(state.pipeline.output_dir().join(file_name))
        .await
        .ok()
}

/// Assemble the Rocket instance with managed state and routes.
pub fn build_rocket(state: AppState, figment: rocket::figment::Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![health, status, create_podcast, audio_file])
        .mount("/ws", routes![crate::sessions::websocket::chat_websocket])
}

pub async fn launch_rocket(config: Arc<Config>, state: AppState) -> Result<()> {
    let fig = rocket::Config::figment()
        .merge(("address", config.server.bind.clone()))
        .merge(("port", config.server.port));

    tracing::info!(
        "Starting Rocket HTTP server on {}:{}",
        config.server.bind,
        config.server.port
    );
    build_rocket(state, fig)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
