//! HTTP handler functions for the geoprobe API.

use actix_web::{HttpResponse, web};
use geoprobe_engine::{LayerManager as _, ProbeError};
use geoprobe_server_models::{ApiHealth, ApiOutcome, ApiSource, IdentifyParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/sources`
///
/// Lists every configured source with its visibility.
pub async fn sources(state: web::Data<AppState>) -> HttpResponse {
    let sources: Vec<ApiSource> = state
        .layers
        .sources()
        .iter()
        .map(|(descriptor, visible)| ApiSource::new(descriptor, *visible))
        .collect();
    HttpResponse::Ok().json(sources)
}

/// `GET /api/identify`
///
/// Finds the nearest feature of every visible source (optionally
/// restricted by `sources`) around the click and returns them ranked by
/// distance.
pub async fn identify(
    state: web::Data<AppState>,
    params: web::Query<IdentifyParams>,
) -> HttpResponse {
    let click = match params.click() {
        Ok(click) => click,
        Err(message) => return bad_request(&message),
    };
    let resolution = params.resolution.unwrap_or(state.viewport.resolution);

    let mut request = state.engine.request_for(click, resolution);
    if let Some(filter) = params.source_filter() {
        request.sources.retain(|s| filter.contains(&s.id));
    }

    let generation = state.next_request();
    match state.engine.execute(&request, generation).await {
        Ok(outcome) => {
            log::info!("identify #{generation}: {}", outcome.summary());
            HttpResponse::Ok().json(ApiOutcome::new(&outcome, |id| {
                state.layers.display_name(id)
            }))
        }
        Err(ProbeError::InvalidRequest { message }) => bad_request(&message),
        Err(e) => {
            log::error!("identify #{generation} failed: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to run query"
            }))
        }
    }
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test};
    use geoprobe_config::{EngineSettings, ViewportSettings};
    use geoprobe_engine::{InMemoryLayerManager, QueryEngine};
    use geoprobe_feature_models::{Feature, SourceDescriptor};

    use super::*;
    use crate::configure;

    fn state() -> web::Data<AppState> {
        let layers = Arc::new(InMemoryLayerManager::new());
        layers.add_local(
            SourceDescriptor::local("fountains", "Fountains"),
            vec![
                Feature::new("cibeles", geo::Point::new(-411_800.0, 4_926_800.0), "fountains")
                    .with_attribute("name", serde_json::json!("Cibeles")),
                Feature::new("neptuno", geo::Point::new(-410_900.0, 4_926_400.0), "fountains"),
            ],
            true,
        );
        layers.add_local(
            SourceDescriptor::local("hidden", "Hidden"),
            vec![Feature::new("h1", geo::Point::new(-412_305.0, 4_926_696.0), "hidden")],
            false,
        );
        let engine = QueryEngine::from_settings(layers.clone(), &EngineSettings::default()).unwrap();
        web::Data::new(AppState::new(
            Arc::new(engine),
            layers,
            ViewportSettings::default(),
        ))
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn lists_sources_with_visibility() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/api/sources").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body[0]["id"], "fountains");
        assert_eq!(body[0]["locality"], "local");
        assert_eq!(body[0]["visible"], true);
        assert_eq!(body[1]["visible"], false);
    }

    #[actix_web::test]
    async fn identify_ranks_visible_sources() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/identify?x=-412305.13&y=4926696.67&resolution=150")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ranked");
        assert_eq!(body["matches"].as_array().unwrap().len(), 1);
        assert_eq!(body["matches"][0]["featureId"], "cibeles");
        assert_eq!(body["matches"][0]["sourceName"], "Fountains");
        assert!(body["sources"].get("hidden").is_none());
    }

    #[actix_web::test]
    async fn identify_accepts_lon_lat() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/identify?lon=-3.7038&lat=40.4168")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["matches"][0]["featureId"], "cibeles");
    }

    #[actix_web::test]
    async fn identify_filter_can_exclude_everything() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/identify?x=-412305.13&y=4926696.67&sources=roads")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "no_visible_sources");
        assert_eq!(body["summary"], "No visible layers to query");
    }

    #[actix_web::test]
    async fn identify_rejects_bad_input() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/api/identify?x=1.0")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/identify?x=0&y=0&resolution=0")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
