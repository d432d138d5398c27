use std::collections::HashSet;

use actix_cors::Cors;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use validator::Validate;

use crate::application::{BallotUseCase, FreshStreamUseCase, IngestUseCase, ShortlistUseCase};
use crate::domain::error::AppError;
use crate::domain::member::Member;

pub struct AppState {
    pub ingest: IngestUseCase,
    pub ballot: BallotUseCase,
    pub shortlist: ShortlistUseCase,
    pub fresh_stream: FreshStreamUseCase,
    pub members: Vec<Member>,
}

#[derive(Deserialize)]
pub struct FetchRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Serialize)]
struct FetchResponse {
    added: usize,
}

#[derive(Deserialize, Validate)]
pub struct BallotRequest {
    #[validate(length(min = 1, message = "user is required"))]
    pub user: String,
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub trashed: Vec<String>,
    #[serde(default)]
    pub visible: Vec<String>,
}

#[derive(Serialize)]
struct BallotResponse {
    changes: usize,
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user: String,
}

#[derive(Deserialize)]
pub struct FreshQuery {
    pub user: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn error_response(err: &AppError) -> HttpResponse {
    match err {
        AppError::ValidationError(_) => HttpResponse::BadRequest().body(err.to_string()),
        AppError::NotFound(_) => HttpResponse::NotFound().body(err.to_string()),
        _ => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/members")]
async fn members(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(&data.members)
}

#[post("/fetch")]
async fn fetch(data: web::Data<AppState>, req: web::Json<FetchRequest>) -> impl Responder {
    if req.start > req.end {
        return HttpResponse::BadRequest().body(format!(
            "Invalid date range: {} > {}",
            req.start, req.end
        ));
    }

    info!(start = %req.start, end = %req.end, "Fetching papers");
    match data.ingest.fetch_range(req.start, req.end).await {
        Ok(added) => HttpResponse::Ok().json(FetchResponse { added }),
        Err(e) => {
            error!(error = %e, "Ingest failed");
            error_response(&e)
        }
    }
}

#[get("/shortlist")]
async fn shortlist(data: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    match data.shortlist.view(&query.user).await {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => {
            error!(error = %e, user = %query.user, "Shortlist query failed");
            error_response(&e)
        }
    }
}

#[get("/fresh")]
async fn fresh(data: web::Data<AppState>, query: web::Query<FreshQuery>) -> impl Responder {
    match data
        .fresh_stream
        .view(&query.user, query.start, query.end)
        .await
    {
        Ok(stream) => HttpResponse::Ok().json(stream),
        Err(e) => {
            error!(error = %e, user = %query.user, "Fresh stream query failed");
            error_response(&e)
        }
    }
}

#[post("/ballot")]
async fn ballot(data: web::Data<AppState>, req: web::Json<BallotRequest>) -> impl Responder {
    if let Err(e) = req.validate() {
        return HttpResponse::BadRequest().body(e.to_string());
    }

    let selected: HashSet<String> = req.selected.iter().cloned().collect();
    let trashed: HashSet<String> = req.trashed.iter().cloned().collect();
    let visible: HashSet<String> = req.visible.iter().cloned().collect();

    match data.ballot.submit(&req.user, selected, trashed, visible).await {
        Ok(changes) => HttpResponse::Ok().json(BallotResponse { changes }),
        Err(e) => {
            error!(error = %e, user = %req.user, "Ballot failed");
            error_response(&e)
        }
    }
}

pub fn start_server(state: AppState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // UI is served from a different origin

        App::new().wrap(cors).app_data(state.clone()).service(
            web::scope("/api")
                .service(health)
                .service(members)
                .service(fetch)
                .service(shortlist)
                .service(fresh)
                .service(ballot),
        )
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
