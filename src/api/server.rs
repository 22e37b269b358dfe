use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::schema::{BusinessDomain, Department, HumanAgentPair, Person, Role};
use crate::storage::{OrgRecord, Storage};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

/// Collection and item routes for one organization record kind.
fn record_routes<R: OrgRecord>(router: Router<Arc<dyn Storage>>, path: &str) -> Router<Arc<dyn Storage>> {
    router
        .route(
            path,
            post(handlers::create_record::<R>).get(handlers::list_records::<R>),
        )
        .route(
            &format!("{}/:id", path),
            get(handlers::get_record::<R>)
                .patch(handlers::patch_record::<R>)
                .delete(handlers::delete_record::<R>),
        )
}

pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/validate/story", post(handlers::validate_story_handler))
        .route(
            "/validate/story/partial",
            post(handlers::validate_partial_story_handler),
        )
        .route("/validate/skill", post(handlers::validate_skill_handler))
        .route(
            "/stories",
            post(handlers::create_story).get(handlers::list_stories),
        )
        .route(
            "/stories/:id",
            get(handlers::get_story)
                .patch(handlers::patch_story)
                .delete(handlers::delete_story),
        )
        .route(
            "/stories/:id/export/:format",
            get(handlers::export_story_handler),
        );

    let router = record_routes::<BusinessDomain>(router, "/domains");
    let router = record_routes::<Department>(router, "/departments");
    let router = record_routes::<Role>(router, "/roles");
    let router = record_routes::<Person>(router, "/people");
    let router = record_routes::<HumanAgentPair>(router, "/pairs");

    router
        .layer(CorsLayer::permissive())
        .with_state(state.storage)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("agent story API listening on port {}", port);
    println!("Agent Story API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::storage::InMemoryStore;

    fn create_test_app() -> (Router, Arc<InMemoryStore>) {
        let storage = Arc::new(InMemoryStore::new());
        let state = AppState {
            storage: storage.clone() as Arc<dyn Storage>,
        };
        (create_router(state), storage)
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn support_bot() -> Value {
        json!({
            "name": "Support Bot",
            "autonomyLevel": "directed",
            "skills": [{
                "name": "Triage",
                "domain": "NLP",
                "description": "x",
                "acquired": "built_in",
                "triggers": [{ "type": "schedule", "description": "daily" }],
                "acceptance": { "successConditions": ["done"] }
            }]
        })
    }

    async fn create_story(app: &Router) -> Value {
        let response = app
            .clone()
            .oneshot(request("POST", "/stories", Some(support_bot())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _) = create_test_app();

        let response = app.oneshot(request("GET", "/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_validate_story_reports_errors() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(request("POST", "/validate/story", Some(json!({ "skills": [] }))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0]["path"], "name");
        assert_eq!(json["errors"][0]["code"], "missing_required_field");
    }

    #[tokio::test]
    async fn test_validate_partial_story() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(request(
                "POST",
                "/validate/story/partial",
                Some(json!({ "name": "Draft" })),
            ))
            .await
            .unwrap();

        assert_eq!(body_json(response).await["valid"], true);
    }

    #[tokio::test]
    async fn test_validate_skill() {
        let (app, _) = create_test_app();
        let skill = support_bot()["skills"][0].clone();

        let response = app
            .oneshot(request("POST", "/validate/skill", Some(skill)))
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["valid"], true);
        assert_eq!(json["warnings"][0]["path"], "acceptance.timeout");
    }

    #[tokio::test]
    async fn test_create_story_returns_warnings() {
        let (app, storage) = create_test_app();

        let json = create_story(&app).await;
        assert!(json["story"]["id"].is_string());
        assert!(json["story"]["createdAt"].is_string());
        assert_eq!(json["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(json["warnings"][0]["path"], "skills[0].acceptance.timeout");

        assert_eq!(storage.list_stories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_invalid_story_is_422() {
        let (app, storage) = create_test_app();

        let response = app
            .oneshot(request(
                "POST",
                "/stories",
                Some(json!({ "name": "", "autonomyLevel": "total" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"].as_array().unwrap().len(), 2);
        assert!(storage.list_stories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_story_not_found() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(request(
                "GET",
                "/stories/00000000-0000-0000-0000-000000000000",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_story_merges_and_revalidates() {
        let (app, _) = create_test_app();
        let created = create_story(&app).await;
        let id = created["story"]["id"].as_str().unwrap().to_string();
        let uri = format!("/stories/{}", id);

        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                &uri,
                Some(json!({ "purpose": "Resolve tickets", "id": "ignored" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["story"]["purpose"], "Resolve tickets");
        assert_eq!(json["story"]["id"], id.as_str());
        assert_eq!(json["story"]["createdAt"], created["story"]["createdAt"]);

        let response = app
            .clone()
            .oneshot(request("PATCH", &uri, Some(json!({ "name": null }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app.oneshot(request("GET", &uri, None)).await.unwrap();
        assert_eq!(body_json(response).await["name"], "Support Bot");
    }

    #[tokio::test]
    async fn test_delete_story() {
        let (app, storage) = create_test_app();
        let created = create_story(&app).await;
        let uri = format!("/stories/{}", created["story"]["id"].as_str().unwrap());

        let response = app.clone().oneshot(request("DELETE", &uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(storage.list_stories().await.unwrap().is_empty());

        let response = app.oneshot(request("DELETE", &uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_story() {
        let (app, _) = create_test_app();
        let created = create_story(&app).await;
        let id = created["story"]["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(request("GET", &format!("/stories/{}/export/crewai", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["format"], "crewai");
        assert_eq!(json["files"][0]["path"], "config/agents.yaml");

        let response = app
            .oneshot(request("GET", &format!("/stories/{}/export/autogen", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_organization_chart_routes() {
        let (app, _) = create_test_app();

        let response = app
            .clone()
            .oneshot(request("POST", "/domains", Some(json!({ "name": "Operations" }))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let domain = body_json(response).await;

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/departments",
                Some(json!({ "name": "Support", "domainId": domain["id"] })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let department = body_json(response).await;

        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/departments/{}", department["id"].as_str().unwrap()),
                Some(json!({ "description": "Front line" })),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["description"], "Front line");

        let response = app
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/domains/{}", domain["id"].as_str().unwrap()),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app.oneshot(request("GET", "/departments", None)).await.unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_dangling_reference_is_422() {
        let (app, _) = create_test_app();

        let response = app
            .oneshot(request(
                "POST",
                "/roles",
                Some(json!({
                    "title": "Lead",
                    "departmentId": "00000000-0000-0000-0000-000000000000"
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("department"));
    }

    #[tokio::test]
    async fn test_pair_requires_story() {
        let (app, storage) = create_test_app();
        let created = create_story(&app).await;

        let domain = BusinessDomain::new("Operations");
        storage.create_domain(&domain).await.unwrap();
        let department = Department::new(domain.id, "Support");
        storage.create_department(&department).await.unwrap();
        let role = Role::new(department.id, "Lead");
        storage.create_role(&role).await.unwrap();
        let person = Person::new("Ama", vec![role.id]);
        storage.create_person(&person).await.unwrap();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/pairs",
                Some(json!({
                    "personId": person.id,
                    "roleId": role.id,
                    "agentStoryId": created["story"]["id"],
                    "tasks": [{ "task": "Answer tickets", "phases": {
                        "manage": "human", "define": "human", "perform": "agent", "review": "human"
                    }}]
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let pair = body_json(response).await;
        assert_eq!(pair["tasks"][0]["phases"]["perform"], "agent");

        let response = app
            .oneshot(request(
                "DELETE",
                &format!("/stories/{}", created["story"]["id"].as_str().unwrap()),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
