//! HTTP routes for the EMR API
//!
//! - `/d/{patients,medicines,appointments,prescriptions}` CRUD over the in-memory store
//! - `/test-db` and `/map-db` against the configured PostgreSQL database

use crate::libs::catalog::CatalogConnector;
use crate::libs::error::{EmrError, error_body};
use crate::libs::mapper;
use crate::libs::models::{Appointment, Medicine, Patient, Prescription};
use crate::libs::store::{MemoryStore, Stored};
use actix_web::error::InternalError;
use actix_web::{HttpResponse, web};
use std::sync::Arc;
use uuid::Uuid;

/// State shared by all workers.
pub struct AppState {
    pub store: MemoryStore,
    pub catalog: Option<Arc<dyn CatalogConnector>>,
}

impl AppState {
    pub fn new(store: MemoryStore, catalog: Option<Arc<dyn CatalogConnector>>) -> Self {
        Self { store, catalog }
    }

    fn catalog(&self) -> Result<&dyn CatalogConnector, EmrError> {
        self.catalog.as_deref().ok_or(EmrError::DatabaseNotConfigured)
    }
}

/// Register every route. The caller provides `web::Data<AppState>`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .route("/", web::get().to(read_root))
        .route("/test-db", web::get().to(test_db))
        .route("/map-db", web::get().to(map_db))
        .service(
            web::scope("/d")
                .configure(entity_routes::<Patient>)
                .configure(entity_routes::<Medicine>)
                .configure(entity_routes::<Appointment>)
                .configure(entity_routes::<Prescription>),
        );
}

fn entity_routes<T: Stored>(cfg: &mut web::ServiceConfig) {
    let base = format!("/{}", T::KIND.collection_name());
    cfg.service(
        web::resource(vec![format!("{base}/"), base.clone()])
            .route(web::post().to(create_entity::<T>))
            .route(web::get().to(list_entities::<T>)),
    )
    .service(
        web::resource(format!("{base}/{{id}}"))
            .route(web::get().to(read_entity::<T>))
            .route(web::put().to(update_entity::<T>)),
    );
}

fn bad_request(code: &str, message: String) -> HttpResponse {
    HttpResponse::BadRequest()
        .content_type("application/json")
        .json(error_body(code, &message))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = bad_request("INVALID_BODY", err.to_string());
        InternalError::from_response(err, response).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let response = bad_request("INVALID_ID", err.to_string());
        InternalError::from_response(err, response).into()
    })
}

// -------- Service endpoints --------

async fn read_root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "msg": "EMR API is live" }))
}

async fn test_db(state: web::Data<AppState>) -> Result<HttpResponse, EmrError> {
    let db_time = mapper::check_connection(state.catalog()?).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "db_time": db_time
    })))
}

async fn map_db(state: web::Data<AppState>) -> Result<HttpResponse, EmrError> {
    let schema = mapper::map_schema(state.catalog()?).await?;
    Ok(HttpResponse::Ok().json(schema))
}

// -------- Entity endpoints --------

async fn create_entity<T: Stored>(
    state: web::Data<AppState>,
    body: web::Json<T::Draft>,
) -> Result<HttpResponse, EmrError> {
    let entity = state.store.create::<T>(body.into_inner())?;
    Ok(HttpResponse::Created().json(entity))
}

async fn list_entities<T: Stored>(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.store.list::<T>())
}

async fn read_entity<T: Stored>(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EmrError> {
    let entity = state.store.get::<T>(path.into_inner())?;
    Ok(HttpResponse::Ok().json(entity))
}

async fn update_entity<T: Stored>(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<T::Patch>,
) -> Result<HttpResponse, EmrError> {
    let entity = state.store.update::<T>(path.into_inner(), body.into_inner())?;
    Ok(HttpResponse::Ok().json(entity))
}
