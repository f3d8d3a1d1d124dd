use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chanmap_core::ResolveError;
use tokio::net::TcpListener;
use tracing::{error, info};
use utoipa::OpenApi;

use crate::workspace::{Workspace, WorkspaceError};

#[derive(OpenApi)]
#[openapi(
    info(description = "chanmap API"),
    paths(
        get_mappings,
        get_channels,
        add_channel,
        update_channel,
        delete_channel,
        select_provider,
        resolve_channel,
        switch_channel,
        handle_intent,
    )
)]
pub struct ApiDoc;

pub fn router(state: Arc<Workspace>) -> Router {
    let router = Router::new()
        .route("/mappings", get(get_mappings))
        .route(
            "/mappings/{id}/channels",
            get(get_channels).post(add_channel),
        )
        .route(
            "/mappings/{id}/channels/{channel_id}",
            patch(update_channel).delete(delete_channel),
        )
        .route("/mappings/{id}/provider", put(select_provider))
        .route("/mappings/{id}/resolve", post(resolve_channel))
        .route("/switch", post(switch_channel))
        .route("/intents/switch", post(handle_intent))
        .route("/openapi.json", get(async || Json(ApiDoc::openapi())))
        .with_state(state);

    Router::new().nest("/api", router)
}

pub async fn serve(addr: SocketAddr, state: Arc<Workspace>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on http://{}", &addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

impl IntoResponse for WorkspaceError {
    fn into_response(self) -> Response {
        let status = match &self {
            WorkspaceError::MappingNotFound(_)
            | WorkspaceError::ChannelNotFound(_)
            | WorkspaceError::PlayerNotFound(_)
            | WorkspaceError::ProviderUnavailable(_) => StatusCode::NOT_FOUND,
            WorkspaceError::EmptyName | WorkspaceError::Resolve(ResolveError::EmptyInput) => {
                StatusCode::BAD_REQUEST
            }
            WorkspaceError::Resolve(_) => StatusCode::NOT_FOUND,
            WorkspaceError::PlayerFailed { .. } => StatusCode::BAD_GATEWAY,
            WorkspaceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("{self}");
        }

        let body = model::Error {
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

mod model {
    use chanmap_core::{ChannelNumber, Resolved};
    use serde::{Deserialize, Serialize};
    use utoipa::ToSchema;

    use crate::workspace;

    #[derive(Serialize, ToSchema)]
    pub struct Mapping {
        pub id: String,
        pub provider: String,
        pub player: String,
        pub channels: usize,
    }

    impl From<&workspace::MappingSummary> for Mapping {
        fn from(value: &workspace::MappingSummary) -> Self {
            Self {
                id: value.id.to_string(),
                provider: value.provider.to_string(),
                player: value.player.to_string(),
                channels: value.channels,
            }
        }
    }

    #[derive(Serialize, ToSchema)]
    pub struct Channel {
        pub id: String,
        pub name: String,
        pub number: String,

        /// `base` for lineup channels, `custom` for user-added ones.
        pub source: String,
    }

    impl From<&workspace::ChannelEntry> for Channel {
        fn from(value: &workspace::ChannelEntry) -> Self {
            Self {
                id: value.id.to_string(),
                name: value.name.to_string(),
                number: value.number.to_string(),
                source: value.source.to_string(),
            }
        }
    }

    #[derive(Deserialize, ToSchema)]
    pub struct NewChannel {
        pub name: String,

        /// A string or an integer.
        #[schema(value_type = String)]
        pub number: ChannelNumber,
    }

    #[derive(Serialize, ToSchema)]
    pub struct CreatedChannel {
        pub id: String,
    }

    #[derive(Deserialize, ToSchema)]
    pub struct ChannelUpdate {
        pub name: String,
    }

    #[derive(Deserialize, ToSchema)]
    pub struct ProviderSelection {
        pub provider: String,
        pub player: Option<String>,
    }

    #[derive(Deserialize, ToSchema)]
    pub struct ResolveRequest {
        pub channel_name: String,
    }

    #[derive(Serialize, ToSchema)]
    pub struct Resolution {
        pub id: String,
        pub name: String,
        pub number: String,

        /// One of `exact`, `word`, `prefix`, `fuzzy`.
        pub stage: String,
    }

    impl From<&Resolved> for Resolution {
        fn from(value: &Resolved) -> Self {
            Self {
                id: value.id.to_string(),
                name: value.name.to_string(),
                number: value.number.to_string(),
                stage: value.stage.to_string(),
            }
        }
    }

    #[derive(Deserialize, ToSchema)]
    pub struct SwitchRequest {
        pub channel_name: String,

        /// Restricts the search to one mapping. All mappings are tried in order otherwise.
        pub mapping: Option<String>,
    }

    #[derive(Serialize, ToSchema)]
    pub struct SwitchResult {
        pub mapping: String,
        pub player: String,
        pub channel: Resolution,
    }

    impl From<&workspace::Switched> for SwitchResult {
        fn from(value: &workspace::Switched) -> Self {
            Self {
                mapping: value.mapping.to_string(),
                player: value.player.to_string(),
                channel: Resolution::from(&value.channel),
            }
        }
    }

    #[derive(Deserialize, ToSchema)]
    pub struct IntentRequest {
        /// The channel name as recognized from speech.
        pub channel_name: String,
    }

    #[derive(Serialize, ToSchema)]
    pub struct IntentResponse {
        pub speech: String,
        pub result: SwitchResult,
    }

    #[derive(Serialize, ToSchema)]
    pub struct Error {
        pub message: String,
    }
}

/// Runs a workspace call that may write the options file or wait on a player off the async
/// workers.
async fn blocking<T, F>(workspace: Arc<Workspace>, f: F) -> Result<T, WorkspaceError>
where
    T: Send + 'static,
    F: FnOnce(&Workspace) -> Result<T, WorkspaceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&workspace))
        .await
        .map_err(|err| WorkspaceError::Internal(err.into()))?
}

#[utoipa::path(
    get,
    path = "/mappings",
    responses((status = 200, body = Vec<model::Mapping>)),
)]
async fn get_mappings(State(workspace): State<Arc<Workspace>>) -> Json<Vec<model::Mapping>> {
    let mappings = workspace
        .mappings()
        .iter()
        .map(model::Mapping::from)
        .collect();

    Json(mappings)
}

#[utoipa::path(
    get,
    path = "/mappings/{id}/channels",
    params(("id" = String, Path)),
    responses(
        (status = 200, body = Vec<model::Channel>),
        (status = NOT_FOUND, body = model::Error),
    ),
)]
async fn get_channels(
    State(workspace): State<Arc<Workspace>>,
    Path(mapping_id): Path<String>,
) -> Result<Json<Vec<model::Channel>>, WorkspaceError> {
    let channels = workspace
        .channels(&mapping_id)?
        .iter()
        .map(model::Channel::from)
        .collect();

    Ok(Json(channels))
}

#[utoipa::path(
    post,
    path = "/mappings/{id}/channels",
    params(("id" = String, Path)),
    request_body = model::NewChannel,
    responses(
        (status = CREATED, body = model::CreatedChannel),
        (status = BAD_REQUEST, body = model::Error),
        (status = NOT_FOUND, body = model::Error),
    ),
)]
async fn add_channel(
    State(workspace): State<Arc<Workspace>>,
    Path(mapping_id): Path<String>,
    Json(request): Json<model::NewChannel>,
) -> Result<(StatusCode, Json<model::CreatedChannel>), WorkspaceError> {
    let id = blocking(workspace, move |workspace| {
        workspace.add_channel(&mapping_id, &request.name, request.number)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(model::CreatedChannel { id })))
}

#[utoipa::path(
    patch,
    path = "/mappings/{id}/channels/{channel_id}",
    params(("id" = String, Path), ("channel_id" = String, Path)),
    request_body = model::ChannelUpdate,
    responses(
        (status = NO_CONTENT),
        (status = BAD_REQUEST, body = model::Error),
        (status = NOT_FOUND, body = model::Error),
    ),
)]
async fn update_channel(
    State(workspace): State<Arc<Workspace>>,
    Path((mapping_id, channel_id)): Path<(String, String)>,
    Json(request): Json<model::ChannelUpdate>,
) -> Result<StatusCode, WorkspaceError> {
    blocking(workspace, move |workspace| {
        workspace.rename_channel(&mapping_id, &channel_id, &request.name)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/mappings/{id}/channels/{channel_id}",
    params(("id" = String, Path), ("channel_id" = String, Path)),
    responses((status = NO_CONTENT), (status = NOT_FOUND, body = model::Error)),
)]
async fn delete_channel(
    State(workspace): State<Arc<Workspace>>,
    Path((mapping_id, channel_id)): Path<(String, String)>,
) -> Result<StatusCode, WorkspaceError> {
    blocking(workspace, move |workspace| {
        workspace.delete_channel(&mapping_id, &channel_id)
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/mappings/{id}/provider",
    params(("id" = String, Path)),
    request_body = model::ProviderSelection,
    responses((status = NO_CONTENT), (status = NOT_FOUND, body = model::Error)),
)]
async fn select_provider(
    State(workspace): State<Arc<Workspace>>,
    Path(mapping_id): Path<String>,
    Json(request): Json<model::ProviderSelection>,
) -> Result<StatusCode, WorkspaceError> {
    blocking(workspace, move |workspace| {
        workspace.select_provider(&mapping_id, &request.provider, request.player.as_deref())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/mappings/{id}/resolve",
    params(("id" = String, Path)),
    request_body = model::ResolveRequest,
    responses(
        (status = 200, body = model::Resolution),
        (status = BAD_REQUEST, body = model::Error),
        (status = NOT_FOUND, body = model::Error),
    ),
)]
async fn resolve_channel(
    State(workspace): State<Arc<Workspace>>,
    Path(mapping_id): Path<String>,
    Json(request): Json<model::ResolveRequest>,
) -> Result<Json<model::Resolution>, WorkspaceError> {
    let resolved = workspace.resolve(&mapping_id, &request.channel_name)?;

    Ok(Json(model::Resolution::from(&resolved)))
}

#[utoipa::path(
    post,
    path = "/switch",
    request_body = model::SwitchRequest,
    responses(
        (status = 200, body = model::SwitchResult),
        (status = BAD_REQUEST, body = model::Error),
        (status = NOT_FOUND, body = model::Error),
        (status = BAD_GATEWAY, body = model::Error),
    ),
)]
async fn switch_channel(
    State(workspace): State<Arc<Workspace>>,
    Json(request): Json<model::SwitchRequest>,
) -> Result<Json<model::SwitchResult>, WorkspaceError> {
    let switched = blocking(workspace, move |workspace| {
        workspace.switch_channel(&request.channel_name, request.mapping.as_deref())
    })
    .await?;

    Ok(Json(model::SwitchResult::from(&switched)))
}

#[utoipa::path(
    post,
    path = "/intents/switch",
    request_body = model::IntentRequest,
    responses(
        (status = 200, body = model::IntentResponse),
        (status = BAD_REQUEST, body = model::Error),
        (status = NOT_FOUND, body = model::Error),
        (status = BAD_GATEWAY, body = model::Error),
    ),
)]
async fn handle_intent(
    State(workspace): State<Arc<Workspace>>,
    Json(request): Json<model::IntentRequest>,
) -> Result<Json<model::IntentResponse>, WorkspaceError> {
    let switched = blocking(workspace, move |workspace| {
        workspace.handle_voice(&request.channel_name)
    })
    .await?;

    Ok(Json(model::IntentResponse {
        speech: format!("Switched to {}", switched.channel.name),
        result: model::SwitchResult::from(&switched),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, mpsc};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use chanmap_core::ChannelNumber;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::player::{Player, Players};

    #[derive(Default)]
    struct RecordingPlayer {
        calls: Mutex<Vec<String>>,
    }

    impl Player for Arc<RecordingPlayer> {
        fn play_channel(&self, number: &ChannelNumber) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(number.to_string());
            Ok(())
        }
    }

    /// Holds every tune request until the test lets it through.
    struct GatedPlayer {
        started: Mutex<mpsc::Sender<()>>,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl Player for GatedPlayer {
        fn play_channel(&self, _number: &ChannelNumber) -> anyhow::Result<()> {
            self.started.lock().unwrap().send(())?;
            self.gate
                .lock()
                .unwrap()
                .recv_timeout(Duration::from_secs(5))?;
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        player: Arc<RecordingPlayer>,
        router: Router,
    }

    impl Fixture {
        fn new() -> Self {
            let player = Arc::new(RecordingPlayer::default());

            Self {
                player: player.clone(),
                ..Self::with_player(player)
            }
        }

        fn with_player(player: impl Player + 'static) -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(
                dir.path().join("hu_one.json"),
                r#"{"channels": [
                    {"id": "rtl", "name": "RTL HD", "number": 3},
                    {"id": "hbo", "name": "HBO", "number": 5},
                    {"id": "discovery", "name": "Discovery Channel", "number": 45}
                ]}"#,
            )
            .unwrap();

            let config = Config::parse(&format!(
                r#"
                providers_dir = "{}"

                [[mappings]]
                id = "tv"
                provider = "HU One"
                player = "tv"
                "#,
                dir.path().display(),
            ))
            .unwrap();

            let mut players = Players::default();
            players.add_player("tv", player);

            let workspace = Workspace::new(&config, players).unwrap();

            Self {
                _dir: dir,
                player: Arc::default(),
                router: router(Arc::new(workspace)),
            }
        }

        async fn request(
            &self,
            method: &str,
            uri: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json");

            let request = match body {
                Some(body) => request.body(Body::from(body.to_string())).unwrap(),
                None => request.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };

            (status, body)
        }
    }

    #[tokio::test]
    async fn test_list_mappings_and_channels() {
        let fixture = Fixture::new();

        let (status, body) = fixture.request("GET", "/api/mappings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"id": "tv", "provider": "HU One", "player": "tv", "channels": 3}]),
        );

        let (status, body) = fixture.request("GET", "/api/mappings/tv/channels", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body[0],
            json!({"id": "rtl", "name": "RTL HD", "number": "3", "source": "base"}),
        );

        let (status, _) = fixture.request("GET", "/api/mappings/kitchen/channels", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_edit_channels() {
        let fixture = Fixture::new();

        let (status, body) = fixture
            .request(
                "POST",
                "/api/mappings/tv/channels",
                Some(json!({"name": "Local TV", "number": 99})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_str().unwrap().to_string();

        let (status, _) = fixture
            .request(
                "PATCH",
                &format!("/api/mappings/tv/channels/{id}"),
                Some(json!({"name": "Városi TV"})),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = fixture
            .request("DELETE", "/api/mappings/tv/channels/hbo", None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = fixture.request("GET", "/api/mappings/tv/channels", None).await;
        let names = body
            .as_array()
            .unwrap()
            .iter()
            .map(|channel| channel["name"].as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, ["RTL HD", "Discovery Channel", "Városi TV"]);
        assert_eq!(body[2]["source"], "custom");

        let (status, body) = fixture
            .request(
                "PATCH",
                "/api/mappings/tv/channels/rtl",
                Some(json!({"name": ""})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Channel name is empty.");
    }

    #[tokio::test]
    async fn test_resolve_without_switching() {
        let fixture = Fixture::new();

        let (status, body) = fixture
            .request(
                "POST",
                "/api/mappings/tv/resolve",
                Some(json!({"channel_name": "diskovery"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["number"], "45");
        assert_eq!(body["stage"], "fuzzy");
        assert!(fixture.player.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_switch() {
        let fixture = Fixture::new();

        let (status, body) = fixture
            .request("POST", "/api/switch", Some(json!({"channel_name": "rtl"})))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["player"], "tv");
        assert_eq!(body["channel"]["name"], "RTL HD");
        assert_eq!(body["channel"]["stage"], "word");
        assert_eq!(*fixture.player.calls.lock().unwrap(), ["3"]);

        let (status, _) = fixture
            .request("POST", "/api/switch", Some(json!({"channel_name": " "})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_voice_intent() {
        let fixture = Fixture::new();

        let (status, body) = fixture
            .request(
                "POST",
                "/api/intents/switch",
                Some(json!({"channel_name": "HBO-ra"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["speech"], "Switched to HBO");
        assert_eq!(body["result"]["channel"]["number"], "5");

        let (status, body) = fixture
            .request(
                "POST",
                "/api/intents/switch",
                Some(json!({"channel_name": "qqqqqqqq-re"})),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Channel 'qqqqqqqq' not found.");
    }

    #[tokio::test]
    async fn test_select_provider() {
        let fixture = Fixture::new();

        let (status, _) = fixture
            .request(
                "PUT",
                "/api/mappings/tv/provider",
                Some(json!({"provider": "HU Cable"})),
            )
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_openapi() {
        let fixture = Fixture::new();

        let (status, body) = fixture.request("GET", "/api/openapi.json", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/switch"].is_object());
    }

    #[tokio::test]
    async fn test_slow_player_does_not_stall_other_requests() {
        let (started_tx, started) = mpsc::channel();
        let (release, gate) = mpsc::channel();
        let fixture = Fixture::with_player(GatedPlayer {
            started: Mutex::new(started_tx),
            gate: Mutex::new(gate),
        });

        let router = fixture.router.clone();
        let switching = tokio::spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri("/api/switch")
                .header("content-type", "application/json")
                .body(Body::from(json!({"channel_name": "hbo"}).to_string()))
                .unwrap();

            router.oneshot(request).await.unwrap().status()
        });

        while started.try_recv().is_err() {
            tokio::task::yield_now().await;
        }

        let (status, _) = fixture.request("GET", "/api/mappings", None).await;
        assert_eq!(status, StatusCode::OK);

        release.send(()).unwrap();
        assert_eq!(switching.await.unwrap(), StatusCode::OK);
    }
}
