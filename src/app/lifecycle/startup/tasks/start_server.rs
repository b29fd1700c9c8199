use crate::app::context::StartupContext;
use crate::app::pipeline::bid::{BidContext, BidOutcome, decide};
use crate::core::events::WinNotice;
use crate::core::models::ortb::BidRequest;
use crate::core::pipeline::{AsyncTask, Pipeline};
use crate::core::snapshot::publisher::RuntimePublisher;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use anyhow::{Error, anyhow};
use async_trait::async_trait;
use opentelemetry::metrics::Counter;
use opentelemetry::{KeyValue, global};
use serde_json::json;
use std::sync::{Arc, LazyLock};
use strum::AsRefStr;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

static BID_REQUESTS: LazyLock<Counter<u64>> = LazyLock::new(|| {
    global::meter("rdsp")
        .u64_counter("bid_requests")
        .with_description("Auction requests by outcome")
        .with_unit("1")
        .build()
});

/// Metric label for how an auction request was answered
#[derive(Debug, Clone, Copy, PartialEq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
enum BidLabel {
    Malformed,
    Bid,
    NoBid,
    Failed,
}

fn record_bid_outcome(label: BidLabel, desc: Option<&'static str>) {
    BID_REQUESTS.add(
        1,
        &[
            KeyValue::new("outcome", label.as_ref().to_string()),
            KeyValue::new("no_bid_desc", desc.unwrap_or("none")),
        ],
    );
}

/// Shared handler state, cloned into every worker
#[derive(Clone)]
pub struct ServerState {
    pub pipeline: Arc<Pipeline<BidContext, Error>>,
    pub publisher: Arc<RuntimePublisher>,
    pub win_queue: mpsc::Sender<WinNotice>,
}

async fn bid_handler(state: web::Data<ServerState>, body: web::Bytes) -> HttpResponse {
    let req: BidRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(e) => {
            debug!("Malformed bid request: {}", e);
            record_bid_outcome(BidLabel::Malformed, None);
            return HttpResponse::NoContent().finish();
        }
    };

    // one snapshot for the whole request
    let snapshot = state.publisher.snapshot();

    match decide(&state.pipeline, snapshot, req).await {
        BidOutcome::Bid(res) => {
            record_bid_outcome(BidLabel::Bid, None);
            HttpResponse::Ok().json(res)
        }
        BidOutcome::NoBid(desc) => {
            record_bid_outcome(BidLabel::NoBid, desc);
            HttpResponse::NoContent().finish()
        }
        BidOutcome::Failed(_) => {
            record_bid_outcome(BidLabel::Failed, None);
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Accepts win notices on any method, fields come from the query
async fn win_handler(state: web::Data<ServerState>, req: HttpRequest) -> HttpResponse {
    let notice = match web::Query::<WinNotice>::from_query(req.query_string()) {
        Ok(query) => query.into_inner(),
        Err(e) => {
            debug!("Malformed win notice '{}': {}", req.query_string(), e);
            return HttpResponse::InternalServerError().finish();
        }
    };

    if !notice.is_valid() {
        debug!("Win notice without key");
        return HttpResponse::InternalServerError().finish();
    }

    match state.win_queue.send(notice).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(_) => {
            warn!("Win queue closed, dropping notice");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn health_handler(state: web::Data<ServerState>) -> HttpResponse {
    let snapshot = state.publisher.snapshot();

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "snapshot_version": snapshot.version(),
        "snapshot_loaded_at": snapshot.loaded_at().to_rfc3339(),
    }))
}

/// Registers every route on an app, shared by the server and tests
pub fn configure_routes(cfg: &mut web::ServiceConfig, win_path: &str) {
    cfg.route("/bid", web::post().to(bid_handler))
        .route(win_path, web::route().to(win_handler))
        .route("/health", web::get().to(health_handler));
}

pub struct StartServerTask;

#[async_trait]
impl AsyncTask<StartupContext, Error> for StartServerTask {
    #[instrument(skip_all, name = "start_server_task")]
    async fn run(&self, context: &StartupContext) -> Result<(), Error> {
        let config = context.config()?;

        let state = ServerState {
            pipeline: context
                .bid_pipeline
                .get()
                .ok_or_else(|| anyhow!("Bid pipeline not built"))?
                .clone(),
            publisher: context
                .publisher
                .get()
                .ok_or_else(|| anyhow!("Snapshot publisher not started"))?
                .clone(),
            win_queue: context
                .win_queue
                .get()
                .ok_or_else(|| anyhow!("Win queue not started"))?
                .clone(),
        };

        let win_path = config.notifications.win_path.clone();
        let mut server = HttpServer::new(move || {
            let win_path = win_path.clone();

            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(move |cfg| configure_routes(cfg, &win_path))
        });

        if let Some(workers) = config.server.workers {
            server = server.workers(workers);
        }

        let server = server
            .bind(("0.0.0.0", config.server.http_port))
            .map_err(|e| anyhow!("Failed binding port {}: {}", config.server.http_port, e))?
            .run();

        context
            .server
            .set(server.handle())
            .map_err(|_| anyhow!("Could not set server"))?;

        actix_web::rt::spawn(server);

        info!(
            "Started http server on port {}, ready for requests",
            config.server.http_port
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::BiddingConfigBuilder;
    use crate::app::pipeline::bid::testing;
    use crate::core::providers::StaticSnapshotLoader;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;

    async fn state() -> (ServerState, mpsc::Receiver<WinNotice>) {
        let fixture = testing::Fixture::new(BiddingConfigBuilder::default().build().unwrap());
        let publisher = RuntimePublisher::start(Arc::new(StaticSnapshotLoader::new(testing::source())))
            .await
            .unwrap();
        let (tx, rx) = mpsc::channel(4);

        let state = ServerState {
            pipeline: Arc::new(fixture.pipeline),
            publisher,
            win_queue: tx,
        };

        (state, rx)
    }

    macro_rules! app {
        ($state:expr) => {
            actix_test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(|cfg| configure_routes(cfg, "/win")),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_bid_endpoint_answers_with_bid() {
        let (state, _rx) = state().await;
        let app = app!(state);

        let body = serde_json::to_vec(&testing::request(false)).unwrap();
        let req = actix_test::TestRequest::post().uri("/bid").set_payload(body).to_request();
        let res: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(res["seatbid"][0]["bid"][0]["price"], 98.0);
    }

    #[actix_web::test]
    async fn test_bid_endpoint_status_codes() {
        let (state, _rx) = state().await;
        let app = app!(state);

        let req = actix_test::TestRequest::post().uri("/bid").set_payload("{not json").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let mut unmatched = testing::request(false);
        unmatched.site.network = "net-b".into();
        let req = actix_test::TestRequest::post()
            .uri("/bid")
            .set_payload(serde_json::to_vec(&unmatched).unwrap())
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[actix_web::test]
    async fn test_win_endpoint_enqueues_on_any_method() {
        let (state, mut rx) = state().await;
        let app = app!(state);

        let req = actix_test::TestRequest::get()
            .uri("/win?key=123&price=90&imp=5")
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = actix_test::TestRequest::post()
            .uri("/win?key=abc-_.&price=1&imp=2")
            .to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::OK);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.key, "123");
        assert_eq!(first.price, "90");
        assert_eq!(first.imp, "5");
        assert_eq!(rx.recv().await.unwrap().key, "abc-_.");
    }

    #[actix_web::test]
    async fn test_win_endpoint_rejects_bad_notices() {
        let (state, rx) = state().await;
        let app = app!(state);

        let req = actix_test::TestRequest::get().uri("/win?price=90&imp=5").to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let req = actix_test::TestRequest::get().uri("/win?key=&price=90").to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        drop(rx);
        let req = actix_test::TestRequest::get().uri("/win?key=1&price=90&imp=5").to_request();
        assert_eq!(
            actix_test::call_service(&app, req).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn test_health_reports_snapshot_version() {
        let (state, _rx) = state().await;
        let app = app!(state);

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let res: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(res["snapshot_version"], 1);
    }

    #[test]
    fn test_bid_labels_are_snake_case() {
        assert_eq!(BidLabel::NoBid.as_ref(), "no_bid");
        assert_eq!(BidLabel::Malformed.as_ref(), "malformed");
    }
}
