//! In-process fake of the EcoAction REST API, bound to a random loopback
//! port. Each test starts its own server so state never leaks between tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Notify;

use ecoaction_client::{ClientConfig, EcoActionClient, FileTokenStore, telemetry};

pub const USER_ID: i64 = 1;
pub const EMAIL: &str = "amina@example.org";
pub const PASSWORD: &str = "green-future";

pub type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Default)]
pub struct Backend {
    tokens: Mutex<HashSet<String>>,
    actions: Mutex<HashMap<i64, u32>>,
    members: Mutex<HashSet<i64>>,
    requests: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(String, String, usize)>>,
    reports: Mutex<Vec<Value>>,
    /// Join/leave answer 500 while set.
    pub fail_mutations: AtomicBool,
    /// Join/leave wait for `release` while set.
    pub hold_mutations: AtomicBool,
    pub release: Notify,
    /// `/auth/me` waits for `release_me` while set.
    pub hold_me: AtomicBool,
    pub release_me: Notify,
}

impl Backend {
    pub fn issue_token(&self) -> String {
        let token = format!("tok-{}", uuid::Uuid::new_v4());
        self.tokens.lock().unwrap().insert(token.clone());
        token
    }

    pub fn revoke_all(&self) {
        self.tokens.lock().unwrap().clear();
    }

    pub fn seed_action(&self, id: i64, participants: u32, joined: bool) {
        self.actions.lock().unwrap().insert(id, participants);
        if joined {
            self.members.lock().unwrap().insert(id);
        }
    }

    pub fn participants(&self, id: i64) -> Option<u32> {
        self.actions.lock().unwrap().get(&id).copied()
    }

    pub fn is_member(&self, id: i64) -> bool {
        self.members.lock().unwrap().contains(&id)
    }

    /// Number of recorded requests whose `"METHOD /path"` starts with `prefix`.
    pub fn hits(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    /// Wait until at least `count` requests matching `prefix` have arrived.
    pub async fn wait_for_hits(&self, prefix: &str, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.hits(prefix) < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {:?}",
                prefix
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub fn uploads(&self) -> Vec<(String, String, usize)> {
        self.uploads.lock().unwrap().clone()
    }

    fn authorized(&self, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match token {
            Some(t) if self.tokens.lock().unwrap().contains(t) => Ok(()),
            _ => Err(failure(StatusCode::UNAUTHORIZED, "Token has expired")),
        }
    }
}

pub struct FakeServer {
    pub addr: SocketAddr,
    pub backend: Arc<Backend>,
}

impl FakeServer {
    pub async fn start() -> Self {
        telemetry::init(telemetry::DEFAULT_FILTER);

        let backend = Arc::new(Backend::default());
        let app = router(backend.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, backend }
    }

    pub fn base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn config(&self, token_path: PathBuf) -> ClientConfig {
        ClientConfig::new(self.base())
            .with_token_path(token_path)
            .with_timeout(Duration::from_secs(5))
    }

    /// Client whose token file lives in a fresh temp dir.
    pub fn client(&self, name: &str) -> (EcoActionClient, PathBuf) {
        let path = temp_token_path(name);
        let client = EcoActionClient::with_store(
            &self.config(path.clone()),
            Arc::new(FileTokenStore::new(path.clone())),
        )
        .unwrap();
        (client, path)
    }
}

pub fn temp_token_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ecoaction_test_{}_{}", name, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("session.json")
}

fn failure(status: StatusCode, error: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "error": error })))
}

fn user_json() -> Value {
    json!({ "id": USER_ID, "email": EMAIL, "created_at": "2025-09-01T10:00:00" })
}

fn profile_json() -> Value {
    json!({
        "id": 11,
        "user_id": USER_ID,
        "full_name": "Amina Otieno",
        "county": "Nairobi",
        "area": "Kibera",
        "trees_planted": 4,
        "impact_points": 120
    })
}

fn action_json(id: i64, participants: u32) -> Value {
    json!({
        "id": id,
        "title": format!("Clean-up #{}", id),
        "description": "Collect plastic along the river bank",
        "category": "Environment",
        "location": "Nairobi River",
        "date": "2025-10-18 09:00:00",
        "created_at": "2025-10-01 08:30:12.123456",
        "image": null,
        "participants_count": participants,
        "status": "active",
        "created_by": 2
    })
}

pub fn router(backend: Arc<Backend>) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/community/actions", get(list_actions))
        .route("/community/my-actions", get(my_actions))
        .route("/community/actions/{id}/join", post(join))
        .route("/community/actions/{id}/leave", post(leave))
        .route("/community/stats", get(stats))
        .route("/upload/image", post(upload))
        .route("/upload/image/{filename}", delete(delete_upload))
        .route("/emergency/alerts", get(alerts))
        .route("/ai/chat", post(chat))
        .route("/profile/{id}", get(get_profile).put(update_profile))
        .route("/profile/{id}/stats", patch(update_profile))
        .route("/contact/messages", post(contact))
        .route("/reports/", post(create_report))
        .route("/reports/{id}", get(get_report).put(update_report))
        .route("/reports/{id}/comments", post(add_comment))
        .route("/reports/user/{user_id}", get(user_reports))
        .route("/reports/recent/{county}", get(recent_reports))
        .route("/reports/stats/{user_id}", get(report_stats))
        .route("/dashboard/{user_id}", get(dashboard));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(backend.clone(), record))
        .with_state(backend)
}

async fn record(State(backend): State<Arc<Backend>>, req: Request, next: Next) -> Response {
    let line = format!("{} {}", req.method(), req.uri().path());
    backend.requests.lock().unwrap().push(line);
    next.run(req).await
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(backend): State<Arc<Backend>>, Json(body): Json<Credentials>) -> ApiResult {
    if body.email != EMAIL || body.password != PASSWORD {
        return Err(failure(StatusCode::UNAUTHORIZED, "Invalid email or password"));
    }
    Ok(Json(json!({
        "success": true,
        "token": backend.issue_token(),
        "user": user_json(),
        "profile": profile_json()
    })))
}

#[derive(Deserialize)]
struct Registration {
    full_name: String,
    email: String,
}

async fn register(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<Registration>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if body.email == EMAIL {
        return Err(failure(StatusCode::CONFLICT, "Email already registered"));
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "token": backend.issue_token(),
            "user": { "id": 2, "email": body.email },
            "profile": { "id": 12, "user_id": 2, "full_name": body.full_name }
        })),
    ))
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> ApiResult {
    if backend.hold_me.load(Ordering::SeqCst) {
        backend.release_me.notified().await;
    }
    backend.authorized(&headers)?;
    Ok(Json(json!({ "success": true, "user": user_json(), "profile": profile_json() })))
}

async fn list_actions(State(backend): State<Arc<Backend>>) -> Json<Value> {
    let actions = backend.actions.lock().unwrap();
    let mut ids: Vec<_> = actions.keys().copied().collect();
    ids.sort();
    let list: Vec<Value> = ids.iter().map(|id| action_json(*id, actions[id])).collect();
    Json(json!({ "success": true, "count": list.len(), "actions": list }))
}

async fn my_actions(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> ApiResult {
    backend.authorized(&headers)?;
    let actions = backend.actions.lock().unwrap();
    let members = backend.members.lock().unwrap();
    let list: Vec<Value> = members
        .iter()
        .filter_map(|id| actions.get(id).map(|count| action_json(*id, *count)))
        .collect();
    Ok(Json(json!({ "success": true, "actions": list })))
}

async fn gate(backend: &Backend) -> Result<(), (StatusCode, Json<Value>)> {
    if backend.hold_mutations.load(Ordering::SeqCst) {
        backend.release.notified().await;
    }
    if backend.fail_mutations.load(Ordering::SeqCst) {
        return Err(failure(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable"));
    }
    Ok(())
}

async fn join(State(backend): State<Arc<Backend>>, Path(id): Path<i64>, headers: HeaderMap) -> ApiResult {
    backend.authorized(&headers)?;
    gate(&backend).await?;
    if !backend.members.lock().unwrap().insert(id) {
        return Err(failure(StatusCode::BAD_REQUEST, "Already joined this action"));
    }
    let mut actions = backend.actions.lock().unwrap();
    let count = actions.entry(id).or_insert(0);
    *count += 1;
    Ok(Json(json!({ "success": true, "message": "Successfully joined action" })))
}

async fn leave(State(backend): State<Arc<Backend>>, Path(id): Path<i64>, headers: HeaderMap) -> ApiResult {
    backend.authorized(&headers)?;
    gate(&backend).await?;
    if !backend.members.lock().unwrap().remove(&id) {
        return Err(failure(StatusCode::BAD_REQUEST, "Not a participant of this action"));
    }
    let mut actions = backend.actions.lock().unwrap();
    let count = actions.entry(id).or_insert(0);
    *count = count.saturating_sub(1);
    Ok(Json(json!({ "success": true, "message": "Successfully left action" })))
}

async fn stats(State(backend): State<Arc<Backend>>) -> Json<Value> {
    let actions = backend.actions.lock().unwrap();
    let total: u64 = actions.values().map(|c| *c as u64).sum();
    Json(json!({
        "success": true,
        "stats": { "active_actions": actions.len(), "total_participants": total }
    }))
}

async fn upload(State(backend): State<Arc<Backend>>, headers: HeaderMap, mut multipart: Multipart) -> ApiResult {
    backend.authorized(&headers)?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| failure(StatusCode::BAD_REQUEST, "Malformed upload"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| failure(StatusCode::BAD_REQUEST, "Malformed upload"))?;
        let ext = original.rsplit('.').next().unwrap_or("png");
        let filename = format!("{}.{}", uuid::Uuid::new_v4().simple(), ext);
        backend
            .uploads
            .lock()
            .unwrap()
            .push((original, content_type, bytes.len()));
        return Ok(Json(json!({
            "success": true,
            "image_url": format!("/uploads/{}", filename),
            "filename": filename
        })));
    }
    Err(failure(StatusCode::BAD_REQUEST, "No file provided"))
}

async fn delete_upload(
    State(backend): State<Arc<Backend>>,
    Path(_filename): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    backend.authorized(&headers)?;
    Ok(Json(json!({ "success": true, "message": "Image deleted successfully" })))
}

async fn alerts() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [{
            "id": 3,
            "type": "Flood Warning",
            "location": "Kisumu",
            "severity": "High",
            "description": "Heavy rainfall expected",
            "recommendation": "Move to higher ground",
            "county": "Kisumu County",
            "is_active": true,
            "created_at": "2025-10-01T06:00:00"
        }]
    }))
}

#[derive(Deserialize)]
struct ChatBody {
    message: String,
}

async fn chat(Json(body): Json<ChatBody>) -> Json<Value> {
    let reply = if body.message.to_lowercase().contains("tree") {
        "Join a nearby tree planting event in Community Actions.".to_string()
    } else {
        format!("Thanks for your message: '{}'.", body.message)
    };
    Json(json!({ "reply": reply }))
}

async fn get_profile(State(backend): State<Arc<Backend>>, Path(id): Path<i64>, headers: HeaderMap) -> ApiResult {
    backend.authorized(&headers)?;
    if id != USER_ID {
        return Err(failure(StatusCode::NOT_FOUND, "Profile not found"));
    }
    let mut profile = profile_json();
    profile["email"] = json!(EMAIL);
    Ok(Json(profile))
}

/// Serves both the profile PUT and the stats PATCH: known fields in the body
/// overwrite the stored profile, nothing is persisted.
async fn update_profile(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    backend.authorized(&headers)?;
    if id != USER_ID {
        return Err(failure(StatusCode::NOT_FOUND, "Profile not found"));
    }
    let mut profile = profile_json();
    if let (Some(target), Some(changes)) = (profile.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
    Ok(Json(profile))
}

async fn contact(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let user_id = backend.authorized(&headers).ok().map(|_| USER_ID);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Your message has been sent successfully.",
            "contact_message": {
                "id": 1,
                "email": body["email"],
                "category": body["category"],
                "subject": body["subject"],
                "message": body["message"],
                "status": "pending",
                "user_id": user_id,
                "created_at": "2025-10-02 12:00:00"
            }
        })),
    ))
}

fn not_found(what: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": format!("{} not found", what) })))
}

/// Mirrors the ORM serialisation: spaced timestamps, computed labels.
async fn create_report(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    for field in ["user_id", "title", "description", "issue_type", "location", "county"] {
        if body.get(field).is_none() {
            let error = format!("Missing required field: {}", field);
            return Err((StatusCode::BAD_REQUEST, Json(json!({ "error": error }))));
        }
    }
    let mut reports = backend.reports.lock().unwrap();
    let report = json!({
        "id": reports.len() + 1,
        "user_id": body["user_id"],
        "title": body["title"],
        "description": body["description"],
        "issue_type": body["issue_type"],
        "location": body["location"],
        "county": body["county"],
        "status": "pending",
        "severity": body.get("severity").cloned().unwrap_or(json!("medium")),
        "priority": body.get("priority").cloned().unwrap_or(json!("normal")),
        "latitude": body.get("latitude").cloned().unwrap_or(Value::Null),
        "longitude": body.get("longitude").cloned().unwrap_or(Value::Null),
        "image_urls": [],
        "ai_analysis": format!("AI analysis initiated for {} issue.", body["issue_type"].as_str().unwrap_or("")),
        "ai_confidence": 0.85,
        "suggested_actions": ["Document the issue thoroughly", "Notify relevant authorities"],
        "created_at": "2025-10-03 07:15:00",
        "updated_at": "2025-10-03 07:15:00",
        "resolved_at": null,
        "time_ago": "0m ago",
        "status_label": "Pending Review",
        "severity_color": "yellow",
        "comments": []
    });
    reports.push(report.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Report created successfully",
            "ai_analysis": {
                "analysis": report["ai_analysis"],
                "confidence": 0.85,
                "suggested_actions": report["suggested_actions"]
            },
            "report": report
        })),
    ))
}

async fn get_report(State(backend): State<Arc<Backend>>, Path(id): Path<usize>) -> ApiResult {
    let reports = backend.reports.lock().unwrap();
    let report = id
        .checked_sub(1)
        .and_then(|i| reports.get(i))
        .ok_or_else(|| not_found("Report"))?;
    Ok(Json(json!({ "report": report })))
}

async fn update_report(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<usize>,
    Json(body): Json<Value>,
) -> ApiResult {
    let mut reports = backend.reports.lock().unwrap();
    let report = id
        .checked_sub(1)
        .and_then(|i| reports.get_mut(i))
        .ok_or_else(|| not_found("Report"))?;
    for field in ["status", "severity", "priority"] {
        if let Some(value) = body.get(field) {
            report[field] = value.clone();
        }
    }
    if body["status"] == "resolved" {
        report["resolved_at"] = json!("2025-10-04 10:00:00");
    }
    Ok(Json(json!({ "message": "Report updated successfully", "report": report })))
}

async fn add_comment(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<usize>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let mut reports = backend.reports.lock().unwrap();
    let report = id
        .checked_sub(1)
        .and_then(|i| reports.get_mut(i))
        .ok_or_else(|| not_found("Report"))?;
    let comments = report["comments"].as_array().map(Vec::len).unwrap_or(0);
    let comment = json!({
        "id": comments + 1,
        "content": body["content"],
        "is_ai_generated": body["is_ai_generated"],
        "created_at": "2025-10-03T08:00:00.123456",
        "user_name": "amina"
    });
    if let Some(list) = report["comments"].as_array_mut() {
        list.push(comment.clone());
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added successfully", "comment": comment })),
    ))
}

async fn user_reports(
    State(backend): State<Arc<Backend>>,
    Path(user_id): Path<i64>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let reports = backend.reports.lock().unwrap();
    let list: Vec<Value> = reports
        .iter()
        .rev()
        .filter(|r| r["user_id"] == user_id)
        .filter(|r| params.get("status").is_none_or(|s| r["status"] == s.as_str()))
        .cloned()
        .collect();
    let per_page: usize = params.get("per_page").and_then(|p| p.parse().ok()).unwrap_or(10);
    Json(json!({
        "reports": list.iter().take(per_page).collect::<Vec<_>>(),
        "pagination": {
            "page": params.get("page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(1),
            "per_page": per_page,
            "total": list.len(),
            "pages": list.len().div_ceil(per_page)
        }
    }))
}

async fn recent_reports(State(backend): State<Arc<Backend>>, Path(county): Path<String>) -> Json<Value> {
    let reports = backend.reports.lock().unwrap();
    let recent: Vec<Value> = reports
        .iter()
        .rev()
        .filter(|r| r["county"] == county.as_str())
        .map(|r| {
            json!({
                "id": r["id"],
                "type": r["issue_type"],
                "location": r["location"],
                "time_ago": r["time_ago"],
                "status": r["status"],
                "severity": r["severity"]
            })
        })
        .collect();
    Json(json!({ "recent_reports": recent }))
}

async fn report_stats(State(backend): State<Arc<Backend>>, Path(user_id): Path<i64>) -> Json<Value> {
    let reports = backend.reports.lock().unwrap();
    let mut by_status: HashMap<String, u32> = HashMap::new();
    let mut total = 0;
    for report in reports.iter().filter(|r| r["user_id"] == user_id) {
        total += 1;
        *by_status
            .entry(report["status"].as_str().unwrap_or_default().to_string())
            .or_default() += 1;
    }
    Json(json!({
        "stats": { "total_reports": total, "monthly_reports": total, "by_status": by_status }
    }))
}

async fn dashboard(Path(user_id): Path<i64>) -> ApiResult {
    if user_id != USER_ID {
        return Err(not_found("Profile"));
    }
    Ok(Json(json!({
        "user": {
            "name": "Amina Otieno",
            "stats": {
                "issuesReported": 3,
                "actionsJoined": 8,
                "communityImpact": 40,
                "treesPlanted": 4,
                "monthlyIssuesIncrease": 1,
                "monthlyActionsIncrease": 2
            }
        },
        "aiInsights": [{
            "id": 1,
            "title": "Flood Risk Increasing",
            "description": "Heavy rainfall predicted for this week.",
            "icon": "Droplets",
            "type": "flood",
            "color": "orange",
            "buttonText": "View Details"
        }],
        "recentActivities": [{
            "id": 1,
            "type": "report",
            "title": "Sarah M. reported a flooding issue",
            "description": "Downtown area near 5th Street",
            "time": "0m ago"
        }]
    })))
}
