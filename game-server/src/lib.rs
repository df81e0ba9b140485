use std::convert::Infallible;
use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use warp::Filter;
use warp::http::StatusCode;
use warp::sse::Event;

use crate::registry::SessionRegistry;
use game_types::{
    CreateGameRequest, CreateGameResponse, ErrorKind, ErrorResponse, GameError, JoinGameRequest,
    JoinGameResponse, MoveRequest, OffersResponse, StreamEvent,
};

pub mod broadcaster;
pub mod config;
pub mod registry;
pub mod websocket;

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsQuery {
    game_id: String,
    player_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OffersQuery {
    player_id: String,
}

pub fn create_routes(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let registry_filter = warp::any().map(move || registry.clone());

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(registry_filter.clone())
        .map(|ws: warp::ws::Ws, registry| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, registry))
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let create = warp::path!("api" / "game" / "create")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_create_request);

    let join = warp::path!("api" / "game" / "join")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_join_request);

    let submit_move = warp::path!("api" / "game" / "move")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_move_request);

    // Server-sent event stream of snapshots
    let events = warp::path!("api" / "game" / "events")
        .and(warp::get())
        .and(warp::query::<EventsQuery>())
        .and(registry_filter.clone())
        .and_then(handle_events_request);

    let game_state = warp::path!("api" / "game" / String / "state")
        .and(warp::get())
        .and(registry_filter.clone())
        .and_then(handle_game_state_request);

    let offers = warp::path!("api" / "game" / String / "offers")
        .and(warp::get())
        .and(warp::query::<OffersQuery>())
        .and(registry_filter)
        .and_then(handle_offers_request);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "cache-control"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(health)
        .or(create)
        .or(join)
        .or(submit_move)
        .or(events)
        .or(game_state)
        .or(offers)
        .with(cors)
        .with(warp::log("stamp_arena"))
}

pub fn status_for(error: &GameError) -> StatusCode {
    match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_reply<T: Serialize>(result: Result<T, GameError>) -> warp::reply::WithStatus<warp::reply::Json> {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::OK),
        Err(error) => warp::reply::with_status(
            warp::reply::json(&ErrorResponse {
                error: error.to_string(),
            }),
            status_for(&error),
        ),
    }
}

async fn handle_create_request(
    request: CreateGameRequest,
    registry: Arc<SessionRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = registry
        .create_game(request.colors)
        .await
        .map(|game_code| CreateGameResponse {
            success: true,
            game_code,
        });
    Ok(json_reply(result))
}

async fn handle_join_request(
    request: JoinGameRequest,
    registry: Arc<SessionRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = registry
        .join_game(&request.game_id, request.preferred_color)
        .await
        .map(|player| JoinGameResponse {
            success: true,
            player_id: player.id,
            assigned_color: player.color,
        });
    Ok(json_reply(result))
}

async fn handle_move_request(
    request: MoveRequest,
    registry: Arc<SessionRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = registry
        .submit_move(
            &request.game_id,
            &request.player_id,
            request.anchor,
            request.mask,
            request.polarity,
        )
        .await;
    Ok(json_reply(result))
}

async fn handle_events_request(
    query: EventsQuery,
    registry: Arc<SessionRegistry>,
) -> Result<Box<dyn warp::Reply>, warp::Rejection> {
    match registry.subscribe(&query.game_id, &query.player_id).await {
        Ok(subscription) => {
            let stream = subscription.map(sse_event);
            Ok(Box::new(warp::sse::reply(stream)))
        }
        Err(error) => Ok(Box::new(json_reply::<()>(Err(error)))),
    }
}

fn sse_event(event: StreamEvent) -> Result<Event, Infallible> {
    let sse = match event {
        StreamEvent::Keepalive => Event::default().comment("keepalive"),
        event => match Event::default().json_data(&event) {
            Ok(sse) => sse,
            Err(e) => {
                tracing::error!("Failed to encode stream event: {}", e);
                Event::default().comment("skipped")
            }
        },
    };
    Ok(sse)
}

async fn handle_game_state_request(
    game_id: String,
    registry: Arc<SessionRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(json_reply(registry.snapshot(&game_id).await))
}

async fn handle_offers_request(
    game_id: String,
    query: OffersQuery,
    registry: Arc<SessionRegistry>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = registry
        .offers(&game_id, &query.player_id)
        .await
        .map(|offers| OffersResponse { offers });
    Ok(json_reply(result))
}
