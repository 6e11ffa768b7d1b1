use std::collections::HashSet;

use actix_web::{web, HttpRequest, HttpResponse, Resource, Scope};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use validator::{Validate, ValidationErrors};

use crate::ai::{ContentAssistant, ContentKind};
use crate::auth::{self, AdminSession, AuthKeys};
use crate::error::{ApiError, StoreError};
use crate::models::{
    Article, ContactRequest, DashboardStats, GalleryItem, Inquiry, Lang, ListQuery, Product,
    Record, Review, SiteConfig,
};
use crate::seed;
use crate::store::{CollectionKind, CollectionStore, Placement, SharedStore, Upsert};

pub struct AppState {
    pub store: SharedStore,
    pub auth: AuthKeys,
    pub assistant: ContentAssistant,
}

fn decode_records<T: Record>(values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed {} record: {}", T::KIND.as_str(), e);
                None
            }
        })
        .collect()
}

fn encode<T: Serialize>(record: &T) -> Result<Value, ApiError> {
    serde_json::to_value(record).map_err(|e| ApiError::Store(StoreError::Json(e)))
}

fn validation_failed(errors: ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({
        "error": "Validation failed",
        "fields": errors,
    }))
}

async fn count(store: &dyn CollectionStore, kind: CollectionKind) -> Result<usize, ApiError> {
    Ok(store.load(kind).await?.len())
}

pub async fn list_records<T: Record>(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    debug!("Fetching {} with {:?}", T::KIND.as_str(), query);

    let records: Vec<T> = decode_records::<T>(state.store.load(T::KIND).await?)
        .into_iter()
        .filter(|record| record.matches(&query))
        .collect();

    info!("Retrieved {} {}", records.len(), T::KIND.as_str());
    Ok(HttpResponse::Ok().json(records))
}

pub async fn get_record<T: Record>(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    debug!("Fetching {} record {}", T::KIND.as_str(), id);

    match state.store.find(T::KIND, &id).await? {
        Some(value) => {
            let record: T = serde_json::from_value(value).map_err(StoreError::from)?;
            Ok(HttpResponse::Ok().json(record))
        }
        None => Err(ApiError::NotFound(format!("{} record {}", T::KIND.as_str(), id))),
    }
}

/// Full-replace write of a whole collection.
pub async fn replace_records<T: Record>(
    _admin: AdminSession,
    state: web::Data<AppState>,
    records: web::Json<Vec<T>>,
) -> Result<HttpResponse, ApiError> {
    let records = records.into_inner();
    debug!("Replacing {} with {} records", T::KIND.as_str(), records.len());

    let mut seen = HashSet::new();
    for record in &records {
        if record.id().is_empty() {
            return Err(ApiError::BadRequest("Every record needs an id".into()));
        }
        if !seen.insert(record.id()) {
            return Err(ApiError::BadRequest(format!("Duplicate id '{}'", record.id())));
        }
    }

    let values = records.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
    state.store.replace(T::KIND, values).await.map_err(|e| {
        error!("Failed to replace {}: {}", T::KIND.as_str(), e);
        e
    })?;

    info!("Replaced {} ({} records)", T::KIND.as_str(), records.len());
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn create_record<T: Record>(
    _admin: AdminSession,
    state: web::Data<AppState>,
    record: web::Json<T>,
) -> Result<HttpResponse, ApiError> {
    let mut record = record.into_inner();
    record.fill_defaults();
    if let Err(errors) = record.validate() {
        return Ok(validation_failed(errors));
    }

    let stored = state
        .store
        .insert(T::KIND, encode(&record)?, Placement::Back)
        .await
        .map_err(|e| {
            error!("Failed to create {} record: {}", T::KIND.as_str(), e);
            e
        })?;

    info!(
        "Created {} record {}",
        T::KIND.as_str(),
        crate::store::record_id(&stored).unwrap_or_default()
    );
    Ok(HttpResponse::Created().json(stored))
}

pub async fn upsert_record<T: Record>(
    _admin: AdminSession,
    state: web::Data<AppState>,
    id: web::Path<String>,
    record: web::Json<T>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let mut record = record.into_inner();
    record.set_id(id.clone());
    record.fill_defaults();
    if let Err(errors) = record.validate() {
        return Ok(validation_failed(errors));
    }

    let outcome = state.store.upsert(T::KIND, encode(&record)?).await.map_err(|e| {
        error!("Failed to save {} record {}: {}", T::KIND.as_str(), id, e);
        e
    })?;

    info!("Saved {} record {} ({:?})", T::KIND.as_str(), id, outcome);
    Ok(match outcome {
        Upsert::Inserted => HttpResponse::Created().json(record),
        Upsert::Updated => HttpResponse::Ok().json(record),
    })
}

pub async fn delete_record<T: Record>(
    admin: AdminSession,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    debug!("{} deleting {} record {}", admin.claims.sub, T::KIND.as_str(), id);

    if state.store.delete(T::KIND, &id).await? {
        info!("Deleted {} record {}", T::KIND.as_str(), id);
        Ok(HttpResponse::Ok().json(json!({ "success": true })))
    } else {
        debug!("{} record not found for deletion: {}", T::KIND.as_str(), id);
        Err(ApiError::NotFound(format!("{} record {}", T::KIND.as_str(), id)))
    }
}

/// Inquiries carry visitor emails, so even a single one needs the admin token.
pub async fn get_inquiry(
    _admin: AdminSession,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    get_record::<Inquiry>(state, id).await
}

pub async fn list_inquiries(
    _admin: AdminSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let inquiries = decode_records::<Inquiry>(state.store.load(CollectionKind::Inquiries).await?);
    info!("Retrieved {} inquiries", inquiries.len());
    Ok(HttpResponse::Ok().json(inquiries))
}

/// Public contact form: the newest inquiry goes first.
pub async fn submit_inquiry(
    state: web::Data<AppState>,
    form: web::Json<ContactRequest>,
) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    if let Err(errors) = form.validate() {
        return Ok(validation_failed(errors));
    }

    let mut inquiry = Inquiry::from(form);
    inquiry.fill_defaults();
    let stored = state
        .store
        .insert(CollectionKind::Inquiries, encode(&inquiry)?, Placement::Front)
        .await
        .map_err(|e| {
            error!("Failed to store inquiry: {}", e);
            e
        })?;

    info!("New inquiry from {}", inquiry.email);
    Ok(HttpResponse::Created().json(stored))
}

pub async fn get_settings(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let settings = match state.store.load_settings().await? {
        Some(settings) => settings,
        None => {
            debug!("No settings stored, serving defaults");
            seed::settings()
        }
    };
    Ok(HttpResponse::Ok().json(settings))
}

pub async fn save_settings(
    _admin: AdminSession,
    state: web::Data<AppState>,
    config: web::Json<SiteConfig>,
) -> Result<HttpResponse, ApiError> {
    state.store.save_settings(encode(&config.into_inner())?).await.map_err(|e| {
        error!("Failed to save settings: {}", e);
        e
    })?;

    info!("Site settings updated");
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

pub async fn dashboard_stats(
    _admin: AdminSession,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let store = state.store.as_ref();
    let stats = DashboardStats {
        products: count(store, CollectionKind::Products).await?,
        articles: count(store, CollectionKind::Articles).await?,
        inquiries: count(store, CollectionKind::Inquiries).await?,
        gallery: count(store, CollectionKind::Gallery).await?,
        reviews: count(store, CollectionKind::Reviews).await?,
    };
    Ok(HttpResponse::Ok().json(stats))
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub kind: ContentKind,
    pub content: String,
    #[serde(default)]
    pub lang: Lang,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub title: String,
    #[serde(default)]
    pub lang: Lang,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub lang: Lang,
}

#[derive(Debug, Deserialize)]
pub struct SloganRequest {
    pub category: String,
}

pub async fn optimize_content(
    _admin: AdminSession,
    state: web::Data<AppState>,
    req: web::Json<OptimizeRequest>,
) -> HttpResponse {
    let content = state
        .assistant
        .optimize_for_seo(req.kind, &req.content, req.lang)
        .await;
    HttpResponse::Ok().json(json!({ "content": content }))
}

pub async fn draft_article(
    _admin: AdminSession,
    state: web::Data<AppState>,
    req: web::Json<DraftRequest>,
) -> HttpResponse {
    let draft = state.assistant.draft_article(&req.title, req.lang).await;
    HttpResponse::Ok().json(json!({ "draft": draft }))
}

pub async fn expert_chat(state: web::Data<AppState>, req: web::Json<ChatRequest>) -> HttpResponse {
    let reply = state.assistant.expert_advice(&req.query, req.lang).await;
    HttpResponse::Ok().json(json!({ "reply": reply }))
}

pub async fn product_slogans(
    _admin: AdminSession,
    state: web::Data<AppState>,
    req: web::Json<SloganRequest>,
) -> HttpResponse {
    let slogans = state.assistant.slogans(&req.category).await;
    HttpResponse::Ok().json(json!({ "slogans": slogans }))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound(format!("Route {}", req.path())))
}

pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    debug!("No {} handler for {}", req.method(), req.path());
    Err(ApiError::MethodNotAllowed(format!("{} on {}", req.method(), req.path())))
}

/// A resource that answers unsupported methods with a JSON 405.
fn resource(path: &str) -> Resource {
    web::resource(path).default_service(web::to(method_not_allowed))
}

/// `/api/<kind>` routes shared by every editable collection.
fn record_scope<T: Record>() -> Scope {
    web::scope(&format!("/{}", T::KIND.as_str()))
        .service(
            resource("")
                .route(web::get().to(list_records::<T>))
                .route(web::post().to(replace_records::<T>)),
        )
        .service(resource("/items").route(web::post().to(create_record::<T>)))
        .service(
            resource("/items/{id}")
                .route(web::get().to(get_record::<T>))
                .route(web::put().to(upsert_record::<T>))
                .route(web::delete().to(delete_record::<T>)),
        )
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(4 * 1024 * 1024).error_handler(
        |err, _req| ApiError::BadRequest(format!("Invalid JSON body: {err}")).into(),
    ))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid query string: {err}")).into()
    }))
    .service(resource("/health").route(web::get().to(health)))
    .service(
        web::scope("/api")
            .service(
                web::scope("/auth")
                    .service(resource("/login").route(web::post().to(auth::login)))
                    .service(resource("/refresh").route(web::post().to(auth::refresh_token))),
            )
            .service(
                web::scope("/ai")
                    .service(resource("/optimize").route(web::post().to(optimize_content)))
                    .service(resource("/draft").route(web::post().to(draft_article)))
                    .service(resource("/chat").route(web::post().to(expert_chat)))
                    .service(resource("/slogans").route(web::post().to(product_slogans))),
            )
            .service(resource("/contact").route(web::post().to(submit_inquiry)))
            .service(resource("/stats").route(web::get().to(dashboard_stats)))
            .service(
                resource("/settings")
                    .route(web::get().to(get_settings))
                    .route(web::post().to(save_settings)),
            )
            .service(
                web::scope("/inquiries")
                    .service(
                        resource("")
                            .route(web::get().to(list_inquiries))
                            .route(web::post().to(replace_records::<Inquiry>)),
                    )
                    .service(
                        resource("/items/{id}")
                            .route(web::get().to(get_inquiry))
                            .route(web::delete().to(delete_record::<Inquiry>)),
                    ),
            )
            .service(record_scope::<Product>())
            .service(record_scope::<Article>())
            .service(record_scope::<GalleryItem>())
            .service(record_scope::<Review>()),
    );
}
