//! HTTP API: JSON endpoints over a shared AllocationEngine, behind a login cookie.

use crate::config::AppConfig;
use crate::export::stats_csv;
use crate::logic::{shared_equipment_amount, AllocationEngine, Operation, Outcome};
use crate::models::{CourtId, ErrorKind, PlayerId, ReleaseMode, RotationError, SessionSnapshot};
use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::{time::Duration, Key, SameSite};
use actix_web::{
    delete, get, post,
    web::{Bytes, Data, Json, Path, ServiceConfig},
    HttpResponse, Responder,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::RwLock;

/// Shared engine. Writers for operations, readers for snapshots.
pub type EngineState = Data<RwLock<AllocationEngine>>;

/// Session key set after a successful login.
const AUTH_KEY: &str = "authenticated";

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Serialize)]
struct OperationResponse {
    outcome: Outcome,
    session: SessionSnapshot,
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct EnqueueBody {
    name: String,
}

#[derive(Default, Deserialize)]
struct AssignBody {
    #[serde(default)]
    player_ids: Vec<PlayerId>,
}

#[derive(Deserialize)]
struct ReleaseBody {
    mode: ReleaseMode,
}

#[derive(Default, Deserialize)]
struct EquipmentBody {
    /// Defaults to one shuttlecock shared by the occupants.
    amount: Option<f64>,
}

/// Path segment: player id (e.g. /api/queue/{player_id})
#[derive(Deserialize)]
struct PlayerPath {
    player_id: PlayerId,
}

/// Path segment: court id (e.g. /api/courts/{court_id}/release)
#[derive(Deserialize)]
struct CourtPath {
    court_id: CourtId,
}

/// Path segments: court id and occupant position.
#[derive(Deserialize)]
struct CourtPositionPath {
    court_id: CourtId,
    position: usize,
}

/// Cookie session for the login gate, expiring after the configured TTL.
pub fn session_middleware(config: &AppConfig, key: Key) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("court_rotation".to_string())
        .cookie_secure(config.cookie_secure)
        .cookie_same_site(SameSite::Strict)
        .session_lifecycle(
            PersistentSession::default()
                .session_ttl(Duration::minutes(i64::from(config.session_ttl_minutes))),
        )
        .build()
}

/// Register every API route. Needs `EngineState` and `Data<AppConfig>` as app data
/// and the session middleware wrapped around the app.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(api_health)
        .service(api_login)
        .service(api_logout)
        .service(api_get_session)
        .service(api_get_player)
        .service(api_enqueue)
        .service(api_remove_from_queue)
        .service(api_toggle_mark)
        .service(api_assign)
        .service(api_release)
        .service(api_equipment)
        .service(api_stats_csv);
}

fn is_authenticated(session: &Session) -> bool {
    matches!(session.get::<bool>(AUTH_KEY), Ok(Some(true)))
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({ "error": "Login required" }))
}

fn lock_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("lock error")
}

fn error_response(e: &RotationError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string(), "kind": e.kind() });
    match e.kind() {
        ErrorKind::Validation => HttpResponse::BadRequest().json(body),
        ErrorKind::Capacity | ErrorKind::State => HttpResponse::Conflict().json(body),
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
    }
}

/// Body that may be omitted. An empty body gives the default; anything else must parse.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, HttpResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Invalid request body: {}", e),
            "kind": ErrorKind::Validation,
        }))
    })
}

/// Run one operation under the write lock and answer with the outcome and new snapshot.
fn run_operation(state: &EngineState, session: &Session, op: Operation) -> HttpResponse {
    if !is_authenticated(session) {
        return unauthorized();
    }
    let mut engine = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match engine.execute(op) {
        Ok(outcome) => HttpResponse::Ok().json(OperationResponse {
            outcome,
            session: engine.snapshot(),
        }),
        Err(e) => error_response(&e),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "court-rotation",
    })
}

/// Check credentials and open a session.
#[post("/api/login")]
async fn api_login(config: Data<AppConfig>, session: Session, body: Json<LoginBody>) -> HttpResponse {
    if body.username != config.access_username || body.password != config.access_password {
        log::info!("Rejected login for {:?}", body.username);
        return HttpResponse::Unauthorized().json(serde_json::json!({ "success": false }));
    }
    session.renew();
    if let Err(e) = session.insert(AUTH_KEY, true) {
        log::error!("Could not store session: {}", e);
        return HttpResponse::InternalServerError().json(serde_json::json!({ "success": false }));
    }
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

#[post("/api/logout")]
async fn api_logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::Ok().json(serde_json::json!({ "success": true }))
}

/// Current players, queue order and courts.
#[get("/api/session")]
async fn api_get_session(state: EngineState, session: Session) -> HttpResponse {
    if !is_authenticated(&session) {
        return unauthorized();
    }
    match state.read() {
        Ok(engine) => HttpResponse::Ok().json(engine.snapshot()),
        Err(_) => lock_error(),
    }
}

#[get("/api/players/{player_id}")]
async fn api_get_player(state: EngineState, session: Session, path: Path<PlayerPath>) -> HttpResponse {
    if !is_authenticated(&session) {
        return unauthorized();
    }
    let engine = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match engine.state().player_summary(path.player_id) {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => error_response(&e),
    }
}

/// Add a new player to the back of the fairness order.
#[post("/api/queue")]
async fn api_enqueue(state: EngineState, session: Session, body: Json<EnqueueBody>) -> HttpResponse {
    let op = Operation::EnqueueNewPlayer {
        name: body.into_inner().name,
    };
    run_operation(&state, &session, op)
}

/// Remove a queued player from the session.
#[delete("/api/queue/{player_id}")]
async fn api_remove_from_queue(state: EngineState, session: Session, path: Path<PlayerPath>) -> HttpResponse {
    let op = Operation::RemoveFromQueue {
        player_id: path.player_id,
    };
    run_operation(&state, &session, op)
}

/// Toggle the release mark on an occupant position.
#[post("/api/courts/{court_id}/marks/{position}")]
async fn api_toggle_mark(state: EngineState, session: Session, path: Path<CourtPositionPath>) -> HttpResponse {
    let op = Operation::ToggleSelection {
        court_id: path.court_id,
        position: path.position,
    };
    run_operation(&state, &session, op)
}

/// Fill a court from the queue front, or from the given queued players.
#[post("/api/courts/{court_id}/assign")]
async fn api_assign(
    state: EngineState,
    session: Session,
    path: Path<CourtPath>,
    body: Bytes,
) -> HttpResponse {
    if !is_authenticated(&session) {
        return unauthorized();
    }
    let body: AssignBody = match optional_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let op = Operation::AssignToCourt {
        court_id: path.court_id,
        player_ids: body.player_ids,
    };
    run_operation(&state, &session, op)
}

/// Release the two marked occupants, or everyone.
#[post("/api/courts/{court_id}/release")]
async fn api_release(
    state: EngineState,
    session: Session,
    path: Path<CourtPath>,
    body: Json<ReleaseBody>,
) -> HttpResponse {
    let op = Operation::ReleaseFromCourt {
        court_id: path.court_id,
        mode: body.mode,
    };
    run_operation(&state, &session, op)
}

/// Charge a shuttlecock to everyone on the court.
#[post("/api/courts/{court_id}/equipment")]
async fn api_equipment(
    state: EngineState,
    session: Session,
    path: Path<CourtPath>,
    body: Bytes,
) -> HttpResponse {
    if !is_authenticated(&session) {
        return unauthorized();
    }
    let body: EquipmentBody = match optional_body(&body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let mut engine = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let amount = match body.amount {
        Some(amount) => amount,
        None => match shared_equipment_amount(engine.state(), path.court_id) {
            Ok(shared) => shared.unwrap_or(0.0),
            Err(e) => return error_response(&e),
        },
    };
    let op = Operation::IncrementEquipmentUsage {
        court_id: path.court_id,
        amount,
    };
    match engine.execute(op) {
        Ok(outcome) => HttpResponse::Ok().json(OperationResponse {
            outcome,
            session: engine.snapshot(),
        }),
        Err(e) => error_response(&e),
    }
}

/// Download per-player stats as CSV.
#[get("/api/stats.csv")]
async fn api_stats_csv(state: EngineState, session: Session) -> HttpResponse {
    if !is_authenticated(&session) {
        return unauthorized();
    }
    let snapshot = match state.read() {
        Ok(engine) => engine.snapshot(),
        Err(_) => return lock_error(),
    };
    match stats_csv(&snapshot) {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .body(csv),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
