use axum::{
    extract::{rejection::JsonRejection, Path, State as AxumState},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use minestake_execution::{Error, SessionManager, State};
use minestake_types::{
    api::{
        AddPoints, CashOut, CashedOut, CellClicked, ClickCell, Failure, GameStarted, PointsAdded,
        StartGame, WalletOperation, WalletUpdated,
    },
    mines::{Cents, GameId, GameView, RevealResult, User, UserId},
};
use std::{str::FromStr, sync::Arc};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, warn};

mod config;
pub use config::{Config, ConfigError, GameConfig, RateLimitConfig, RetryConfig, ValidatedConfig};

/// Error returned by a handler, rendered as a [Failure] body.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::InvalidParameter(rejection.body_text()))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            Error::UserNotFound | Error::SessionNotFound => StatusCode::NOT_FOUND,
            Error::SessionAlreadyActive(_) => StatusCode::CONFLICT,
            Error::LedgerConflict | Error::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidParameter(_)
            | Error::InsufficientPoints { .. }
            | Error::InsufficientBalance { .. }
            | Error::NoFreeTrialsRemaining
            | Error::SessionNotActive
            | Error::CellAlreadyRevealed(_)
            | Error::NoSafeClicksYet => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        } else {
            debug!(error = %self.0, "request rejected");
        }
        let failure = Failure {
            detail: self.0.to_string(),
            code: self.0.code(),
        };
        (status, Json(failure)).into_response()
    }
}

type Manager<S> = AxumState<Arc<SessionManager<S>>>;

/// A JSON body whose rejection is rendered as a [Failure] like any other error.
type Body<T> = Result<Json<T>, JsonRejection>;

pub struct Api<S: State> {
    manager: Arc<SessionManager<S>>,
    rate_limit: Option<RateLimitConfig>,
}

impl<S: State + 'static> Api<S> {
    pub fn new(manager: Arc<SessionManager<S>>, rate_limit: Option<RateLimitConfig>) -> Self {
        Self {
            manager,
            rate_limit,
        }
    }

    pub fn router(&self) -> Result<Router, ConfigError> {
        // Configure CORS
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        let mut router = Router::new()
            .route("/api/health", get(health))
            .route("/api/create-user", post(create_user::<S>))
            .route("/api/user/:user_id", get(user::<S>))
            .route("/api/user/:user_id/active-game", get(active_game::<S>))
            .route("/api/start-game", post(start_game::<S>))
            .route("/api/click-cell", post(click_cell::<S>))
            .route("/api/cash-out", post(cash_out::<S>))
            .route("/api/wallet/deposit", post(deposit::<S>))
            .route("/api/wallet/withdraw", post(withdraw::<S>))
            .route("/api/add-points", post(add_points::<S>))
            .route("/api/game/:game_id", get(game::<S>))
            .layer(cors);

        // Configure rate limiting
        if let Some(rate_limit) = self.rate_limit {
            let governor_conf = GovernorConfigBuilder::default()
                .per_millisecond(rate_limit.replenish_ms)
                .burst_size(rate_limit.burst_size)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or(ConfigError::RateLimit {
                    replenish_ms: rate_limit.replenish_ms,
                    burst_size: rate_limit.burst_size,
                })?;
            router = router.layer(GovernorLayer {
                config: Arc::new(governor_conf),
            });
        }

        Ok(router.with_state(self.manager.clone()))
    }
}

fn parse_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(Error::InvalidParameter(format!("invalid {kind} id: {raw}"))))
}

/// Convert a wallet amount to cents. The minimum is checked on the raw decimal so that
/// rounding cannot lift an amount over it.
fn wallet_amount<S: State>(
    manager: &SessionManager<S>,
    amount: f64,
    operation: &str,
) -> Result<Cents, ApiError> {
    let cents = Cents::from_decimal(amount)
        .map_err(|err| ApiError(Error::InvalidParameter(err.to_string())))?;
    let minimum = manager.ledger().policy().min_wallet_operation;
    if amount > 0.0 && amount < minimum.as_decimal() {
        return Err(ApiError(Error::InvalidParameter(format!(
            "minimum {operation} is {minimum}"
        ))));
    }
    Ok(cents)
}

async fn health() -> &'static str {
    "ok"
}

async fn create_user<S: State + 'static>(
    AxumState(manager): Manager<S>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(manager.ledger().create_user().await?))
}

async fn user<S: State + 'static>(
    AxumState(manager): Manager<S>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    Ok(Json(manager.ledger().user(user_id).await?))
}

async fn active_game<S: State + 'static>(
    AxumState(manager): Manager<S>,
    Path(user_id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    let user_id: UserId = parse_id("user", &user_id)?;
    match manager.active_session(user_id).await? {
        Some(view) => Ok(Json(view)),
        None => Err(ApiError(Error::SessionNotFound)),
    }
}

async fn start_game<S: State + 'static>(
    AxumState(manager): Manager<S>,
    body: Body<StartGame>,
) -> Result<Json<GameStarted>, ApiError> {
    let Json(request) = body?;
    let started = manager
        .start_session(request.user_id, request.bet_amount, request.mine_count)
        .await?;
    let game = started.game;
    Ok(Json(GameStarted {
        game_id: game.game_id,
        is_free_trial: game.is_free_trial,
        bet_amount: game.bet_amount,
        mine_count: game.mine_count,
        multiplier_per_click: started.bonus_percent,
        current_multiplier: game.current_multiplier,
        current_winnings: game.current_winnings,
        safe_clicks: game.safe_clicks,
        grid_size: game.grid_size,
        user_data: started.user,
    }))
}

async fn click_cell<S: State + 'static>(
    AxumState(manager): Manager<S>,
    body: Body<ClickCell>,
) -> Result<Json<CellClicked>, ApiError> {
    let Json(request) = body?;
    let reveal = manager.reveal_cell(request.game_id, request.cell()).await?;
    let message = match reveal.result {
        RevealResult::MineHit => "You hit a mine! Game over!".to_string(),
        RevealResult::Safe => format!("Safe! +{}% bonus!", reveal.bonus_percent),
    };
    Ok(Json(CellClicked {
        result: reveal.result,
        game_over: reveal.game_over,
        message,
        current_winnings: reveal.current_winnings,
        current_multiplier: reveal.current_multiplier,
        safe_clicks: reveal.safe_clicks,
        multiplier_increase: reveal.bonus_percent,
        mines: reveal.mines,
        user_data: reveal.user,
    }))
}

async fn cash_out<S: State + 'static>(
    AxumState(manager): Manager<S>,
    body: Body<CashOut>,
) -> Result<Json<CashedOut>, ApiError> {
    let Json(request) = body?;
    let cashed = manager.cash_out(request.game_id).await?;
    Ok(Json(CashedOut {
        result: "cashed_out".to_string(),
        winnings: cashed.winnings,
        message: format!("Successfully cashed out ₹{}!", cashed.winnings),
        mines: cashed.mines,
        user_data: cashed.user,
    }))
}

async fn deposit<S: State + 'static>(
    AxumState(manager): Manager<S>,
    body: Body<WalletOperation>,
) -> Result<Json<WalletUpdated>, ApiError> {
    let Json(request) = body?;
    let amount = wallet_amount(&manager, request.amount, "deposit")?;
    let user = manager.ledger().deposit(request.user_id, amount).await?;
    Ok(Json(WalletUpdated {
        message: format!("Added ₹{amount} to wallet"),
        wallet_balance: user.wallet_balance,
        user_data: user,
    }))
}

async fn withdraw<S: State + 'static>(
    AxumState(manager): Manager<S>,
    body: Body<WalletOperation>,
) -> Result<Json<WalletUpdated>, ApiError> {
    let Json(request) = body?;
    let amount = wallet_amount(&manager, request.amount, "withdrawal")?;
    let user = manager.ledger().withdraw(request.user_id, amount).await?;
    Ok(Json(WalletUpdated {
        message: format!("Withdrawn ₹{amount} from wallet"),
        wallet_balance: user.wallet_balance,
        user_data: user,
    }))
}

async fn add_points<S: State + 'static>(
    AxumState(manager): Manager<S>,
    body: Body<AddPoints>,
) -> Result<Json<PointsAdded>, ApiError> {
    let Json(request) = body?;
    let user = manager
        .ledger()
        .add_points(request.user_id, request.points)
        .await?;
    Ok(Json(PointsAdded {
        message: format!("Added {} points successfully", request.points),
        total_points: user.points,
        user_data: user,
    }))
}

async fn game<S: State + 'static>(
    AxumState(manager): Manager<S>,
    Path(game_id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    let game_id: GameId = parse_id("game", &game_id)?;
    Ok(Json(manager.session(game_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body as HttpBody, http::Request};
    use minestake_execution::{
        mocks::{create_config, mines_of, safe_cells, Flaky},
        Memory,
    };
    use minestake_types::mines::{
        ERROR_CELL_REVEALED, ERROR_INSUFFICIENT_BALANCE, ERROR_INVALID_PARAMETER,
        ERROR_NO_SAFE_CLICKS, ERROR_SESSION_ACTIVE, ERROR_SESSION_NOT_FOUND, ERROR_STORAGE,
        ERROR_USER_NOT_FOUND,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app<S: State + 'static>(state: S) -> (Arc<SessionManager<S>>, Router) {
        let manager = Arc::new(SessionManager::new(Arc::new(state), create_config(1_000)));
        let router = Api::new(manager.clone(), None).router().unwrap();
        (manager, router)
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(HttpBody::from(body.to_string()))
                .unwrap(),
            None => request.body(HttpBody::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    async fn create_user(router: &Router) -> String {
        let (status, body) = call(router, Method::POST, "/api/create-user", None).await;
        assert_eq!(status, StatusCode::OK);
        body["user_id"].as_str().unwrap().to_string()
    }

    async fn start(router: &Router, user_id: &str, bet_amount: u64) -> GameId {
        let (status, body) = call(
            router,
            Method::POST,
            "/api/start-game",
            Some(json!({ "user_id": user_id, "bet_amount": bet_amount, "mine_count": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["game_id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_, router) = app(Memory::default());
        let (status, body) = call(&router, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let (_, router) = app(Memory::default());
        let user_id = create_user(&router).await;

        let (status, body) =
            call(&router, Method::GET, &format!("/api/user/{user_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points"], 1_000);
        assert_eq!(body["wallet_balance"], 100.0);
        assert_eq!(body["free_trials_left"], 3);
        assert_eq!(body["total_games"], 0);
        assert_eq!(body["total_winnings"], 0);

        let (status, body) = call(
            &router,
            Method::GET,
            &format!("/api/user/{}", UserId::random()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], ERROR_USER_NOT_FOUND);

        let (status, body) = call(&router, Method::GET, "/api/user/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn test_full_game_over_http() {
        let (manager, router) = app(Memory::default());
        let user_id = create_user(&router).await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/start-game",
            Some(json!({ "user_id": user_id, "bet_amount": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mine_count"], 3);
        assert_eq!(body["multiplier_per_click"], 12.0);
        assert_eq!(body["current_multiplier"], 1.0);
        assert_eq!(body["current_winnings"], 0);
        assert_eq!(body["safe_clicks"], 0);
        assert_eq!(body["grid_size"], 5);
        assert_eq!(body["is_free_trial"], false);
        assert!(body.get("mines").is_none());
        let game_id: GameId = body["game_id"].as_str().unwrap().parse().unwrap();

        // Cash-out before any safe click is refused
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/cash-out",
            Some(json!({ "game_id": game_id })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_NO_SAFE_CLICKS);

        let cells = safe_cells(&manager, game_id).await;
        for (clicks, cell) in cells.iter().take(2).enumerate() {
            let (status, body) = call(
                &router,
                Method::POST,
                "/api/click-cell",
                Some(json!({ "game_id": game_id, "row": cell.row, "col": cell.col })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["result"], "safe");
            assert_eq!(body["game_over"], false);
            assert_eq!(body["message"], "Safe! +12% bonus!");
            assert_eq!(body["safe_clicks"], clicks + 1);
            assert!(body.get("mines").is_none());
            assert!(body.get("user_data").is_none());
        }

        // The view hides the mines while the game runs
        let (status, body) =
            call(&router, Method::GET, &format!("/api/game/{game_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "in_progress");
        assert_eq!(body["revealed"].as_array().unwrap().len(), 2);
        assert!(body.get("mines").is_none());

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/cash-out",
            Some(json!({ "game_id": game_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "cashed_out");
        assert_eq!(body["winnings"], 12);
        assert_eq!(body["message"], "Successfully cashed out ₹12!");
        assert_eq!(body["mines"].as_array().unwrap().len(), 3);
        assert_eq!(body["user_data"]["points"], 1_002);
        assert_eq!(body["user_data"]["wallet_balance"], 112.0);

        let (_, body) = call(&router, Method::GET, &format!("/api/game/{game_id}"), None).await;
        assert_eq!(body["state"], "cashed_out");
        assert_eq!(body["mines"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_mine_hit_over_http() {
        let (manager, router) = app(Memory::default());
        let user_id = create_user(&router).await;
        let game_id = start(&router, &user_id, 100).await;
        let mine = *mines_of(&manager, game_id).await.iter().next().unwrap();

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/click-cell",
            Some(json!({ "game_id": game_id, "row": mine.row, "col": mine.col })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "mine_hit");
        assert_eq!(body["game_over"], true);
        assert_eq!(body["message"], "You hit a mine! Game over!");
        assert_eq!(body["current_winnings"], 0);
        assert_eq!(body["mines"].as_array().unwrap().len(), 3);
        assert_eq!(body["user_data"]["points"], 900);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/click-cell",
            Some(json!({ "game_id": game_id, "row": mine.row, "col": mine.col })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "game is not active");
    }

    #[tokio::test]
    async fn test_session_rules_map_to_statuses() {
        let (manager, router) = app(Memory::default());
        let user_id = create_user(&router).await;
        let game_id = start(&router, &user_id, 10).await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/start-game",
            Some(json!({ "user_id": user_id, "bet_amount": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], ERROR_SESSION_ACTIVE);

        let (status, body) = call(
            &router,
            Method::GET,
            &format!("/api/user/{user_id}/active-game"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["game_id"], game_id.to_string());

        let cell = safe_cells(&manager, game_id).await[0];
        let click = json!({ "game_id": game_id, "row": cell.row, "col": cell.col });
        call(&router, Method::POST, "/api/click-cell", Some(click.clone())).await;
        let (status, body) = call(&router, Method::POST, "/api/click-cell", Some(click)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_CELL_REVEALED);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/click-cell",
            Some(json!({ "game_id": GameId::random(), "row": 0, "col": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], ERROR_SESSION_NOT_FOUND);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/click-cell",
            Some(json!({ "game_id": game_id, "row": -1, "col": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_failures() {
        let (_, router) = app(Memory::default());
        let user_id = create_user(&router).await;
        let game_id = start(&router, &user_id, 10).await;

        // Missing field
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/click-cell",
            Some(json!({ "game_id": game_id, "row": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);
        assert!(body["detail"].as_str().unwrap().contains("col"), "{body}");

        // Mine count outside u8
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/start-game",
            Some(json!({ "user_id": user_id, "bet_amount": 10, "mine_count": 300 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);

        // Wrong type
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/wallet/deposit",
            Some(json!({ "user_id": user_id, "amount": "lots" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);

        // Not JSON at all
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/cash-out")
            .header(header::CONTENT_TYPE, "application/json")
            .body(HttpBody::from("{"))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let failure: Failure = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(failure.code, ERROR_INVALID_PARAMETER);

        // Missing content type
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/cash-out")
            .body(HttpBody::from(json!({ "game_id": game_id }).to_string()))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wallet_minimum_is_not_rounded_past() {
        let (_, router) = app(Memory::default());
        let user_id = create_user(&router).await;

        for (uri, detail) in [
            ("/api/wallet/deposit", "minimum deposit is 10.00"),
            ("/api/wallet/withdraw", "minimum withdrawal is 10.00"),
        ] {
            let (status, body) = call(
                &router,
                Method::POST,
                uri,
                Some(json!({ "user_id": user_id, "amount": 9.995 })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], ERROR_INVALID_PARAMETER);
            assert_eq!(body["detail"], detail);
        }

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/wallet/deposit",
            Some(json!({ "user_id": user_id, "amount": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wallet_balance"], 110.0);
    }

    #[test]
    fn test_unbuildable_rate_limit() {
        let manager = Arc::new(SessionManager::new(
            Arc::new(Memory::default()),
            create_config(1_000),
        ));
        let rate_limit = RateLimitConfig {
            replenish_ms: 0,
            burst_size: 0,
        };
        let err = Api::new(manager.clone(), Some(rate_limit))
            .router()
            .unwrap_err();
        assert!(matches!(err, ConfigError::RateLimit { .. }), "{err}");

        let rate_limit = RateLimitConfig {
            replenish_ms: 500,
            burst_size: 10,
        };
        assert!(Api::new(manager, Some(rate_limit)).router().is_ok());
    }

    #[tokio::test]
    async fn test_mine_count_out_of_range() {
        let (_, router) = app(Memory::default());
        let user_id = create_user(&router).await;
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/start-game",
            Some(json!({ "user_id": user_id, "bet_amount": 10, "mine_count": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);
    }

    #[tokio::test]
    async fn test_wallet_and_points() {
        let (_, router) = app(Memory::default());
        let user_id = create_user(&router).await;

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/wallet/deposit",
            Some(json!({ "user_id": user_id, "amount": 25.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Added ₹25.50 to wallet");
        assert_eq!(body["wallet_balance"], 125.5);
        assert_eq!(body["user_data"]["wallet_balance"], 125.5);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/wallet/withdraw",
            Some(json!({ "user_id": user_id, "amount": 500 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INSUFFICIENT_BALANCE);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/wallet/withdraw",
            Some(json!({ "user_id": user_id, "amount": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/wallet/deposit",
            Some(json!({ "user_id": user_id, "amount": -20 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ERROR_INVALID_PARAMETER);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/add-points",
            Some(json!({ "user_id": user_id, "points": 250 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Added 250 points successfully");
        assert_eq!(body["total_points"], 1_250);
    }

    #[tokio::test]
    async fn test_outage_is_unavailable() {
        let (manager, router) = app(Flaky::new(Memory::default()));
        let user_id = create_user(&router).await;

        manager.state().set_outage(true);
        let (status, body) = call(
            &router,
            Method::POST,
            "/api/start-game",
            Some(json!({ "user_id": user_id, "bet_amount": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], ERROR_STORAGE);

        manager.state().set_outage(false);
        start(&router, &user_id, 10).await;
    }
}
