use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use fieldfix_contracts::decode::{decode_bill_of_materials, decode_solution};
use fieldfix_contracts::events::EventWriter;
use fieldfix_contracts::models::{capability_for, ModelSelector, ModelSpec};
use fieldfix_contracts::prompt::{bom_prompt, solve_content, solve_system_instruction, ContentPayload};
use fieldfix_contracts::record::record_id;
use fieldfix_contracts::safety::DEFAULT_MIN_CHARS;
use fieldfix_contracts::{
    AssessmentError, BomItem, ImageAttachment, ProblemRequest, RecordOutcome, SafetyClassifier,
    SessionStore, SolutionRecord, SolveTicket,
};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const JSON_MIME_TYPE: &str = "application/json";
const MAX_ATTACHMENT_DIM: u32 = 1600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPurpose {
    Solve,
    BillOfMaterials,
}

impl CompletionPurpose {
    fn as_str(self) -> &'static str {
        match self {
            CompletionPurpose::Solve => "solve",
            CompletionPurpose::BillOfMaterials => "bill_of_materials",
        }
    }
}

/// Sampling parameters, fixed per call type.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
    pub thinking_budget: Option<u32>,
    pub response_mime_type: &'static str,
}

impl GenerationConfig {
    pub fn solve() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: Some(4000),
            thinking_budget: Some(16000),
            response_mime_type: JSON_MIME_TYPE,
        }
    }

    pub fn bill_of_materials() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: None,
            thinking_budget: None,
            response_mime_type: JSON_MIME_TYPE,
        }
    }

    /// Drops the thinking budget for models that do not think.
    pub fn for_model(mut self, model: &ModelSpec) -> Self {
        if !model.supports("thinking") {
            self.thinking_budget = None;
        }
        self
    }

    fn to_gemini_value(&self) -> Value {
        let mut config = Map::new();
        config.insert("temperature".to_string(), json!(self.temperature));
        config.insert(
            "responseMimeType".to_string(),
            Value::String(self.response_mime_type.to_string()),
        );
        if let Some(max_output_tokens) = self.max_output_tokens {
            config.insert("maxOutputTokens".to_string(), json!(max_output_tokens));
        }
        if let Some(thinking_budget) = self.thinking_budget {
            config.insert(
                "thinkingConfig".to_string(),
                json!({ "thinkingBudget": thinking_budget }),
            );
        }
        Value::Object(config)
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub purpose: CompletionPurpose,
    pub model: String,
    pub system_instruction: Option<String>,
    pub content: ContentPayload,
    pub config: GenerationConfig,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Map<String, Value>,
}

/// One attempt against a completion service. Implementations must not retry.
pub trait CompletionGateway: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

#[derive(Default)]
pub struct GatewayRegistry {
    gateways: BTreeMap<String, Box<dyn CompletionGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<G: CompletionGateway + 'static>(&mut self, gateway: G) {
        self.gateways
            .insert(gateway.name().to_string(), Box::new(gateway));
    }

    pub fn get(&self, name: &str) -> Option<&dyn CompletionGateway> {
        self.gateways.get(name).map(|gateway| gateway.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.gateways.keys().cloned().collect()
    }
}

pub fn default_gateway_registry() -> GatewayRegistry {
    let mut registry = GatewayRegistry::new();
    registry.register(GeminiGateway::new());
    registry.register(DryrunGateway);
    registry
}

pub struct GeminiGateway {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl GeminiGateway {
    pub fn new() -> Self {
        let api_base = non_empty_env("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());
        Self::with_settings(api_base, Self::api_key_from_env())
    }

    pub fn with_settings(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: api_base.into(),
            api_key,
            http: HttpClient::new(),
        }
    }

    fn api_key_from_env() -> Option<String> {
        non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("GOOGLE_API_KEY"))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_parts(content: &ContentPayload) -> Vec<Value> {
        let mut parts = Vec::new();
        if let Some(image) = content.image() {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.media_type,
                    "data": BASE64.encode(&image.data),
                }
            }));
        }
        parts.push(json!({ "text": content.text() }));
        parts
    }

    fn build_payload(request: &CompletionRequest) -> Value {
        let mut payload = Map::new();
        if let Some(system) = request.system_instruction.as_deref() {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": [{ "text": system }] }),
            );
        }
        payload.insert(
            "contents".to_string(),
            json!([{
                "role": "user",
                "parts": Self::build_parts(&request.content),
            }]),
        );
        payload.insert(
            "generationConfig".to_string(),
            request.config.to_gemini_value(),
        );
        Value::Object(payload)
    }

    /// Joins the non-thought text parts of the first candidate.
    fn extract_text(response_payload: &Value) -> Result<CompletionResponse> {
        let candidates = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let Some(candidate) = candidates.first() else {
            let reason = response_payload
                .get("promptFeedback")
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            bail!("Gemini returned no candidates ({reason})");
        };

        let parts = candidate
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut text = String::new();
        for part in parts {
            if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }
            if let Some(chunk) = part.get("text").and_then(Value::as_str) {
                text.push_str(chunk);
            }
        }

        Ok(CompletionResponse {
            text,
            finish_reason: candidate
                .get("finishReason")
                .and_then(Value::as_str)
                .map(str::to_string),
            usage: response_payload
                .get("usageMetadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

impl Default for GeminiGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionGateway for GeminiGateway {
    fn name(&self) -> &str {
        "gemini"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = Self::build_payload(request);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let response_payload = response_json_or_error("Gemini", response)?;
        Self::extract_text(&response_payload)
    }
}

/// Offline gateway with canned answers; lets the dashboard run without a key.
pub struct DryrunGateway;

impl DryrunGateway {
    fn solve_payload(content: &ContentPayload) -> Value {
        let subject = truncate_text(content.text(), 80);
        let image_note = content
            .image()
            .map(|image| format!(" Attached image: {}.", image.media_type))
            .unwrap_or_default();
        json!({
            "analysis": format!("Dry-run analysis for \"{subject}\".{image_note} No model was called."),
            "safetyCheck": "None.",
            "diagnosticTree": [
                {"hypothesis": "Supply or input fault", "test": "Measure the input at the terminals against nameplate values"},
                {"hypothesis": "Component wear", "test": "Inspect the suspect part and compare with the last service record"}
            ],
            "clarificationQuestions": [],
            "projectScopeConfirm": "Dry-run scope: diagnosis only.",
            "timeToComplete": "1-2 hours",
            "followUp24h": ["Confirm the fault does not recur under normal load"],
            "followUp7d": ["Review readings against baseline"],
            "steps": ["Isolate and make safe", "Run the diagnostic tests in order", "Replace the failed part"],
            "variables": {"Mode": "dryrun"},
            "finalResult": "Equipment returned to normal operation.",
            "confidence": 0.5
        })
    }

    fn bom_payload() -> Value {
        json!({
            "bom": [
                {"itemName": "Replacement part", "specification": "As per nameplate", "quantity": "1", "priority": "High"},
                {"itemName": "Consumables kit", "specification": "Cleaning and fixings", "quantity": "1", "priority": "Low"}
            ]
        })
    }
}

impl CompletionGateway for DryrunGateway {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let payload = match request.purpose {
            CompletionPurpose::Solve => Self::solve_payload(&request.content),
            CompletionPurpose::BillOfMaterials => Self::bom_payload(),
        };
        Ok(CompletionResponse {
            text: serde_json::to_string(&payload)?,
            finish_reason: Some("STOP".to_string()),
            usage: Map::new(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub text_model: Option<String>,
    pub safety_min_chars: usize,
    pub events_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            text_model: None,
            safety_min_chars: DEFAULT_MIN_CHARS,
            events_path: None,
        }
    }
}

impl EngineConfig {
    /// `FIELDFIX_TEXT_MODEL`, `FIELDFIX_SAFETY_MIN_CHARS`, `FIELDFIX_EVENTS`.
    pub fn from_env() -> Self {
        Self {
            text_model: non_empty_env("FIELDFIX_TEXT_MODEL"),
            safety_min_chars: non_empty_env("FIELDFIX_SAFETY_MIN_CHARS")
                .and_then(|raw| raw.parse::<usize>().ok())
                .map(|value| value.clamp(1, 64))
                .unwrap_or(DEFAULT_MIN_CHARS),
            events_path: non_empty_env("FIELDFIX_EVENTS").map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Recorded(Box<SolutionRecord>),
    /// Blank description; nothing was sent.
    Skipped,
    /// A newer solve began before this one finished; its result was dropped.
    Stale,
}

/// A solve holding a ticket and a resolved model, not yet sent.
#[derive(Debug, Clone)]
pub struct PendingSolve {
    ticket: SolveTicket,
    request: ProblemRequest,
    model: ModelSpec,
    completion: CompletionRequest,
}

impl PendingSolve {
    pub fn completion(&self) -> &CompletionRequest {
        &self.completion
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }
}

/// Drives solve / bill-of-materials actions against a gateway and owns the session store.
///
/// `solve` is `begin_solve`, `dispatch` and `finish_solve` in one go. Front ends that keep several
/// solves in flight call the three steps themselves; only the most recently begun one is stored.
pub struct AssessmentEngine {
    gateways: GatewayRegistry,
    selector: ModelSelector,
    text_model: Option<String>,
    classifier: SafetyClassifier,
    store: SessionStore,
    events: EventWriter,
    last_request: Option<ProblemRequest>,
    last_fallback_reason: Option<String>,
    sequence: u64,
}

impl AssessmentEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_parts(config, default_gateway_registry(), ModelSelector::new(None))
    }

    pub fn with_parts(
        config: EngineConfig,
        gateways: GatewayRegistry,
        selector: ModelSelector,
    ) -> Result<Self> {
        let events = EventWriter::for_new_session(config.events_path.clone());
        let engine = Self {
            gateways,
            selector,
            text_model: config.text_model,
            classifier: SafetyClassifier::new(config.safety_min_chars),
            store: SessionStore::new(),
            events,
            last_request: None,
            last_fallback_reason: None,
            sequence: 0,
        };
        engine
            .events
            .emit(
                "session_started",
                map_object(json!({
                    "text_model": engine.text_model,
                    "safety_min_chars": engine.classifier.min_chars,
                    "gateways": engine.gateways.names(),
                })),
            )
            .context("failed to write session_started event")?;
        Ok(engine)
    }

    pub fn set_text_model(&mut self, model: Option<String>) {
        self.text_model = model;
    }

    pub fn text_model(&self) -> Option<&str> {
        self.text_model.as_deref()
    }

    /// Why the last model selection did not use the requested model, if it did not.
    pub fn last_fallback_reason(&self) -> Option<&str> {
        self.last_fallback_reason.as_deref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn current(&self) -> Option<&SolutionRecord> {
        self.store.current()
    }

    pub fn history(&self) -> &[SolutionRecord] {
        self.store.history()
    }

    pub fn last_request(&self) -> Option<&ProblemRequest> {
        self.last_request.as_ref()
    }

    pub fn safety_banner<'a>(&self, record: &'a SolutionRecord) -> Option<&'a str> {
        let text = record.result.safety_check.as_deref();
        if self.classifier.is_actionable(text) {
            text.map(str::trim)
        } else {
            None
        }
    }

    pub fn solve(&mut self, request: ProblemRequest) -> Result<SolveOutcome, AssessmentError> {
        let Some(pending) = self.begin_solve(request)? else {
            return Ok(SolveOutcome::Skipped);
        };
        let response = self.dispatch(&pending);
        self.finish_solve(pending, response)
    }

    /// Issues a ticket and picks the model. `None` for a blank description.
    pub fn begin_solve(
        &mut self,
        request: ProblemRequest,
    ) -> Result<Option<PendingSolve>, AssessmentError> {
        if !request.is_submittable() {
            self.emit(
                "solve_skipped",
                json!({ "field": request.domain.as_str(), "reason": "empty description" }),
            );
            return Ok(None);
        }
        self.last_request = Some(request.clone());
        let ticket = self.store.begin_solve();

        let capability = capability_for(request.image.is_some());
        let model = match self.select_model(CompletionPurpose::Solve, capability) {
            Ok(model) => model,
            Err(err) => return Err(self.fail_solve(&request, err)),
        };
        let completion = CompletionRequest {
            purpose: CompletionPurpose::Solve,
            model: model.name.clone(),
            system_instruction: Some(solve_system_instruction(request.domain, request.language)),
            content: solve_content(&request),
            config: GenerationConfig::solve().for_model(&model),
        };
        Ok(Some(PendingSolve {
            ticket,
            request,
            model,
            completion,
        }))
    }

    /// Sends a pending solve. A newer solve may begin before this one is finished.
    pub fn dispatch(&self, pending: &PendingSolve) -> Result<CompletionResponse> {
        self.gateway_for(&pending.model)?
            .complete(&pending.completion)
    }

    /// Decodes and stores a dispatched solve. A superseded solve is dropped as `Stale`, even when
    /// it failed, so it never clears the newer result.
    pub fn finish_solve(
        &mut self,
        pending: PendingSolve,
        response: Result<CompletionResponse>,
    ) -> Result<SolveOutcome, AssessmentError> {
        let PendingSolve {
            ticket,
            request,
            model,
            ..
        } = pending;
        if !self.store.is_latest(ticket) {
            self.emit(
                "solve_stale",
                json!({ "field": request.domain.as_str(), "ticket": ticket.generation() }),
            );
            return Ok(SolveOutcome::Stale);
        }

        let response = match response {
            Ok(response) => response,
            Err(err) => return Err(self.fail_solve(&request, AssessmentError::from_gateway(&err))),
        };
        let result = match decode_solution(&response.text) {
            Ok(result) => result,
            Err(err) => return Err(self.fail_solve(&request, err)),
        };

        let id = self.next_record_id(&request.description);
        let record = SolutionRecord::new(id, &request, model.name, result);
        match self.store.record_solution(ticket, record.clone()) {
            Ok(RecordOutcome::Recorded) => {
                self.emit(
                    "solve_recorded",
                    json!({
                        "record_id": record.id,
                        "field": record.field.as_str(),
                        "language": record.language.code(),
                        "model": record.model,
                        "confidence": record.result.confidence,
                        "safety_actionable": self.safety_banner(&record).is_some(),
                        "has_image": record.image.is_some(),
                        "finish_reason": response.finish_reason,
                        "usage": Value::Object(response.usage),
                    }),
                );
                Ok(SolveOutcome::Recorded(Box::new(record)))
            }
            Ok(RecordOutcome::Stale) => Ok(SolveOutcome::Stale),
            Err(reason) => Err(self.fail_solve(&request, AssessmentError::decode(reason))),
        }
    }

    /// Enriches a stored record. Failures leave the store untouched.
    pub fn generate_bill_of_materials(&mut self, id: &str) -> Result<Vec<BomItem>, AssessmentError> {
        let Some(record) = self.store.get(id) else {
            return Err(AssessmentError::missing_record(id));
        };
        let prompt = bom_prompt(&record.result.analysis, record.language);
        let purpose = CompletionPurpose::BillOfMaterials;
        let result = self.select_model(purpose, "text").and_then(|model| {
            let completion = CompletionRequest {
                purpose,
                model: model.name.clone(),
                system_instruction: None,
                content: ContentPayload::Text(prompt),
                config: GenerationConfig::bill_of_materials().for_model(&model),
            };
            let response = self
                .gateway_for(&model)
                .and_then(|gateway| gateway.complete(&completion))
                .map_err(|err| AssessmentError::from_gateway(&err))?;
            decode_bill_of_materials(&response.text)
        });

        match result {
            Ok(items) => {
                self.store.merge_bill_of_materials(id, items.clone());
                self.emit(
                    "bom_recorded",
                    json!({ "record_id": id, "items": items.len() }),
                );
                Ok(items)
            }
            Err(err) => {
                self.emit(
                    "bom_failed",
                    json!({
                        "purpose": purpose.as_str(),
                        "record_id": id,
                        "kind": err.kind_label(),
                        "error": err.detail(),
                    }),
                );
                Err(err)
            }
        }
    }

    /// Re-runs the last request in the other language.
    pub fn toggle_language(&mut self) -> Result<SolveOutcome, AssessmentError> {
        let Some(mut request) = self.last_request.clone() else {
            return Ok(SolveOutcome::Skipped);
        };
        let from = request.language;
        request.language = from.toggled();
        self.emit(
            "language_toggled",
            json!({ "from": from.code(), "to": request.language.code() }),
        );
        self.solve(request)
    }

    /// Makes a history entry current and restores its input as the last request.
    pub fn reopen(&mut self, id: &str) -> Result<SolutionRecord, AssessmentError> {
        let Some(record) = self.store.select(id).cloned() else {
            return Err(AssessmentError::missing_record(id));
        };
        self.last_request = Some(record.to_request());
        self.emit("history_reopened", json!({ "record_id": record.id }));
        Ok(record)
    }

    fn select_model(
        &mut self,
        purpose: CompletionPurpose,
        capability: &str,
    ) -> Result<ModelSpec, AssessmentError> {
        self.last_fallback_reason = None;
        let selection = self
            .selector
            .select(self.text_model.as_deref(), capability)
            .map_err(AssessmentError::upstream)?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            self.emit(
                "model_fallback",
                json!({
                    "purpose": purpose.as_str(),
                    "requested": self.text_model,
                    "model": selection.model.name,
                    "reason": reason,
                }),
            );
        }
        self.last_fallback_reason = selection.fallback_reason;
        Ok(selection.model)
    }

    fn gateway_for(&self, model: &ModelSpec) -> Result<&dyn CompletionGateway> {
        self.gateways.get(&model.provider).with_context(|| {
            format!("no gateway registered for provider '{}'", model.provider)
        })
    }

    fn fail_solve(&mut self, request: &ProblemRequest, err: AssessmentError) -> AssessmentError {
        self.store.clear_current();
        self.emit(
            "solve_failed",
            json!({
                "purpose": CompletionPurpose::Solve.as_str(),
                "field": request.domain.as_str(),
                "kind": err.kind_label(),
                "error": err.detail(),
            }),
        );
        err
    }

    fn next_record_id(&mut self, query: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        loop {
            self.sequence += 1;
            let id = record_id(millis, self.sequence, query);
            if self.store.get(&id).is_none() {
                return id;
            }
        }
    }

    fn emit(&self, event_type: &str, payload: Value) {
        if let Err(err) = self.events.emit(event_type, map_object(payload)) {
            eprintln!("fieldfix: failed to write {event_type} event: {err:#}");
        }
    }
}

/// Loads an image for upload: flattened onto white, downscaled to fit `MAX_ATTACHMENT_DIM`,
/// re-encoded as JPEG. Bytes that do not decode are passed through unchanged.
pub fn load_attachment(path: &Path) -> Result<ImageAttachment> {
    let raw = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let (data, media_type) = match reencode_for_upload(&raw) {
        Some(jpeg) => (jpeg, "image/jpeg".to_string()),
        None => (raw, guess_image_mime(path).to_string()),
    };
    let mut attachment = ImageAttachment::new(media_type, data);
    if let Some(name) = path.file_name().and_then(|value| value.to_str()) {
        attachment = attachment.with_file_name(name);
    }
    Ok(attachment)
}

fn reencode_for_upload(raw: &[u8]) -> Option<Vec<u8>> {
    let image = image::load_from_memory(raw).ok()?;
    let rgba = image.to_rgba8();
    let mut flattened = RgbaImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8
        };
        flattened.put_pixel(
            x,
            y,
            Rgba([blend(pixel[0]), blend(pixel[1]), blend(pixel[2]), 255]),
        );
    }
    let mut flattened = DynamicImage::ImageRgba8(flattened);
    if flattened.width().max(flattened.height()) > MAX_ATTACHMENT_DIM {
        flattened = flattened.resize(MAX_ATTACHMENT_DIM, MAX_ATTACHMENT_DIM, FilterType::Triangle);
    }
    let rgb = DynamicImage::ImageRgb8(flattened.to_rgb8());
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, 90);
    encoder.encode_image(&rgb).ok()?;
    Some(bytes)
}

fn guess_image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" | "heif" => "image/heic",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
