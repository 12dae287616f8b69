use crate::data::dbconnector::SQLConnector;
use crate::family::tree::TreeNode;
use crate::family::{FamilyError, Person, PersonWithRelationships, Relationship};
pub(crate) mod types;
use anyhow::Context;
use axum::extract::Path;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use log::{debug, info, warn};
use std::sync::Arc;
use types::{CreatePersonRequest, CreateRelationshipRequest, DeleteResponse, UpdatePersonRequest};

type Failure = (StatusCode, String);

#[derive(Clone)]
pub struct ServerConfig {
    pub database_connection: Arc<SQLConnector>,
}

pub fn router(database_connection: Arc<SQLConnector>) -> Router {
    Router::new()
        .route("/people", get(list_people).post(create_person))
        .route(
            "/people/{id}",
            get(get_person).patch(update_person).delete(delete_person),
        )
        .route(
            "/relationships",
            get(list_relationships).post(create_relationship),
        )
        .route(
            "/relationships/{parent_id}/{child_id}",
            delete(delete_relationship),
        )
        .route("/tree", get(family_tree))
        .route("/tree/forest", get(family_forest))
        .with_state(ServerConfig {
            database_connection,
        })
}

pub async fn run(database_connection: SQLConnector, port: u16) -> anyhow::Result<()> {
    debug!("Starting server on port {}", port);

    let app = router(Arc::new(database_connection));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .await
        .context("server stopped unexpectedly")
}

fn failure(err: FamilyError) -> Failure {
    let status = err.status();
    if status.is_server_error() {
        warn!("{err}");
    } else {
        debug!("{err}");
    }
    (status, err.to_string())
}

async fn list_people(State(state): State<ServerConfig>) -> Result<Json<Vec<Person>>, Failure> {
    let people = state
        .database_connection
        .list_people()
        .await
        .map_err(failure)?;
    Ok(Json(people))
}

async fn create_person(
    State(state): State<ServerConfig>,
    Json(payload): Json<CreatePersonRequest>,
) -> Result<(StatusCode, Json<Person>), Failure> {
    let person = state
        .database_connection
        .create_person(&payload)
        .await
        .map_err(failure)?;
    Ok((StatusCode::CREATED, Json(person)))
}

async fn get_person(
    State(state): State<ServerConfig>,
    Path(id): Path<i32>,
) -> Result<Json<PersonWithRelationships>, Failure> {
    let person = state
        .database_connection
        .get_person(id)
        .await
        .map_err(failure)?;

    match person {
        Some(p) => Ok(Json(p)),
        None => Err(failure(FamilyError::PersonNotFound(id))),
    }
}

async fn update_person(
    State(state): State<ServerConfig>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePersonRequest>,
) -> Result<Json<Person>, Failure> {
    let person = state
        .database_connection
        .update_person(id, &payload)
        .await
        .map_err(failure)?;
    Ok(Json(person))
}

async fn delete_person(
    State(state): State<ServerConfig>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteResponse>, Failure> {
    let deleted = state
        .database_connection
        .delete_person(id)
        .await
        .map_err(failure)?;
    Ok(Json(deleted))
}

async fn list_relationships(
    State(state): State<ServerConfig>,
) -> Result<Json<Vec<Relationship>>, Failure> {
    let edges = state
        .database_connection
        .list_relationships()
        .await
        .map_err(failure)?;
    Ok(Json(edges))
}

async fn create_relationship(
    State(state): State<ServerConfig>,
    Json(payload): Json<CreateRelationshipRequest>,
) -> Result<(StatusCode, Json<Relationship>), Failure> {
    let edge = state
        .database_connection
        .create_relationship(payload.parent_id, payload.child_id)
        .await
        .map_err(failure)?;
    Ok((StatusCode::CREATED, Json(edge)))
}

async fn delete_relationship(
    State(state): State<ServerConfig>,
    Path((parent_id, child_id)): Path<(i32, i32)>,
) -> Result<Json<DeleteResponse>, Failure> {
    let deleted = state
        .database_connection
        .delete_relationship(parent_id, child_id)
        .await
        .map_err(failure)?;
    Ok(Json(deleted))
}

async fn family_tree(
    State(state): State<ServerConfig>,
) -> Result<Json<Vec<PersonWithRelationships>>, Failure> {
    let tree = state
        .database_connection
        .get_family_tree()
        .await
        .map_err(failure)?;
    Ok(Json(tree))
}

async fn family_forest(State(state): State<ServerConfig>) -> Result<Json<Vec<TreeNode>>, Failure> {
    let forest = state
        .database_connection
        .get_family_forest()
        .await
        .map_err(failure)?;
    Ok(Json(forest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::configuration::Configuration;
    use crate::data::dbconnector::KinDBConnection;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn app() -> Router {
        let mut store = SQLConnector::in_memory();
        store.connect().await.unwrap();
        store.initialize(&Configuration::default()).await.unwrap();
        router(Arc::new(store))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    #[tokio::test]
    async fn create_then_fetch_person() {
        let app = app().await;
        let (status, created) = send(
            &app,
            "POST",
            "/people",
            Some(json!({"full_name": "Ada Lovelace", "birth_date": "1815-12-10"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();

        let (status, fetched) = send(&app, "GET", &format!("/people/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["full_name"], "Ada Lovelace");
        assert_eq!(fetched["birth_date"], "1815-12-10");
        assert_eq!(fetched["death_date"], Value::Null);
        assert_eq!(fetched["parents"], json!([]));
        assert_eq!(fetched["children"], json!([]));
    }

    #[tokio::test]
    async fn unknown_person_is_404() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/people/41", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "person 41 not found");
    }

    #[tokio::test]
    async fn bad_photo_url_is_422() {
        let app = app().await;
        let (status, _) = send(
            &app,
            "POST",
            "/people",
            Some(json!({"full_name": "Ada", "photo_url": "not a url"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn relationship_lifecycle() {
        let app = app().await;
        let (_, mum) = send(&app, "POST", "/people", Some(json!({"full_name": "Mum"}))).await;
        let (_, kid) = send(&app, "POST", "/people", Some(json!({"full_name": "Kid"}))).await;
        let (mum, kid) = (mum["id"].as_i64().unwrap(), kid["id"].as_i64().unwrap());

        let (status, body) = send(
            &app,
            "POST",
            "/relationships",
            Some(json!({"parent_id": mum, "child_id": mum})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, format!("person {mum} cannot be their own parent"));

        let (status, edge) = send(
            &app,
            "POST",
            "/relationships",
            Some(json!({"parent_id": mum, "child_id": kid})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(edge["parent_id"], mum);

        let (status, forest) = send(&app, "GET", "/tree/forest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(forest[0]["person"]["full_name"], "Mum");
        assert_eq!(forest[0]["children"][0]["person"]["full_name"], "Kid");
        assert_eq!(forest[0]["children"][0]["level"], 1);

        let uri = format!("/relationships/{mum}/{kid}");
        let (_, first) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(first, json!({"success": true}));
        let (status, second) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second, json!({"success": false}));
    }

    #[tokio::test]
    async fn patch_and_delete_person() {
        let app = app().await;
        let (_, ann) = send(
            &app,
            "POST",
            "/people",
            Some(json!({"full_name": "Ann", "death_date": "1990-01-01"})),
        )
        .await;
        let uri = format!("/people/{}", ann["id"]);

        let (status, patched) = send(&app, "PATCH", &uri, Some(json!({"death_date": null}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["full_name"], "Ann");
        assert_eq!(patched["death_date"], Value::Null);

        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tree_lists_everyone_with_relations() {
        let app = app().await;
        let (_, m) = send(&app, "POST", "/people", Some(json!({"full_name": "M"}))).await;
        let (_, d) = send(&app, "POST", "/people", Some(json!({"full_name": "D"}))).await;
        send(
            &app,
            "POST",
            "/relationships",
            Some(json!({"parent_id": m["id"], "child_id": d["id"]})),
        )
        .await;

        let (_, tree) = send(&app, "GET", "/tree", None).await;
        assert_eq!(tree[0]["full_name"], "M");
        assert_eq!(tree[0]["children"][0]["full_name"], "D");
        assert_eq!(tree[1]["parents"][0]["full_name"], "M");
    }
}
