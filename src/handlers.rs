use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::NaiveDateTime;
use jsonwebtoken::{decode, DecodingKey, Validation};
use log::error;
use serde_json::json;
use std::collections::HashMap;
use std::env;

use crate::models::{
    BrowseResponse, Claims, ManualLogEntry, ManualLogView, OffPlatformDeleteRequest,
    OffPlatformTimeRequest, RefKind, VideoSummary, WatchLogEntry, WatchtimeUpdateRequest,
};
use crate::{calendar, filters, query, AppState};

type QueryPairs = web::Query<Vec<(String, String)>>;

fn user_id_from_request(req: &HttpRequest) -> Option<i32> {
    let auth_header = req.headers().get(actix_web::http::header::AUTHORIZATION);
    let token = auth_header
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))?;

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "secure_jwt_secret_key_12345".to_string());
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .ok()
    .map(|decoded| decoded.claims.user_id)
}

#[get("/api/status")]
async fn status() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "running"
    }))
}

#[get("/api/videos")]
async fn browse_videos(
    params: QueryPairs,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let user_id = user_id_from_request(&http_req);

    let mut spec =
        match filters::parse_filters(&params, state.catalog.as_ref(), &state.reference_cache).await
        {
            Ok(spec) => spec,
            Err(e) => {
                error!("Error parsing browse filters: {:?}", e);
                return HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }));
            }
        };
    spec.page = Some(filters::parse_page(&params));

    let videos = match state.catalog.query(&spec, user_id).await {
        Ok(videos) => videos,
        Err(e) => {
            error!("Error querying videos: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    };

    let channel_names: HashMap<i32, String> = match state
        .reference_cache
        .entries(state.catalog.as_ref(), RefKind::Channel)
        .await
    {
        Ok(entries) => entries.into_iter().map(|r| (r.id, r.name)).collect(),
        Err(e) => {
            error!("Error loading channel names: {:?}", e);
            HashMap::new()
        }
    };

    let has_more = videos.len() == query::PAGE_SIZE;
    let videos = videos
        .into_iter()
        .map(|v| VideoSummary {
            url: format!("/watch/{}", v.id),
            thumbnail_url: format!("/assets/thumbnail/{}.webp", v.id),
            channel_name: channel_names.get(&v.channel_id).cloned(),
            id: v.id,
            title: v.title,
            description: v.description,
            channel_id: v.channel_id,
            duration: v.duration,
            level: v.level,
            premium: v.premium,
            upload_date: v.upload_date,
        })
        .collect();

    HttpResponse::Ok().json(BrowseResponse { videos, has_more })
}

#[get("/api/videos/statistics")]
async fn browse_statistics(
    params: QueryPairs,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let user_id = user_id_from_request(&http_req);

    let spec =
        match filters::parse_filters(&params, state.catalog.as_ref(), &state.reference_cache).await
        {
            Ok(spec) => spec,
            Err(e) => {
                error!("Error parsing statistics filters: {:?}", e);
                return HttpResponse::InternalServerError().json(json!({
                    "error": "Internal server error"
                }));
            }
        };

    match query::collect_statistics(state.catalog.as_ref(), &state.reference_cache, &spec, user_id)
        .await
    {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            error!("Error collecting statistics: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/progress/consistency/calendar")]
async fn consistency_calendar(state: web::Data<AppState>, http_req: HttpRequest) -> HttpResponse {
    let user_id = match user_id_from_request(&http_req) {
        Some(user_id) => user_id,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized"
            }));
        }
    };

    let watch = state.watch_logs.for_user(user_id).await;
    let manual = state.manual_logs.for_user(user_id).await;
    let (watch, manual) = match (watch, manual) {
        (Ok(watch), Ok(manual)) => (watch, manual),
        (Err(e), _) | (_, Err(e)) => {
            error!("Error loading activity logs: {:?}", e);
            return HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }));
        }
    };

    let days: Vec<(String, crate::models::DayActivity)> = calendar::aggregate(&watch, &manual)
        .into_iter()
        .map(|(date, activity)| (date.format("%Y-%m-%d").to_string(), activity))
        .collect();

    HttpResponse::Ok().json(days)
}

#[get("/api/user/overall")]
async fn user_overall(state: web::Data<AppState>, http_req: HttpRequest) -> HttpResponse {
    let user_id = match user_id_from_request(&http_req) {
        Some(user_id) => user_id,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized"
            }));
        }
    };

    let watch = state.watch_logs.for_user(user_id).await;
    let manual = state.manual_logs.for_user(user_id).await;
    match (watch, manual) {
        (Ok(watch), Ok(manual)) => {
            let (on, off) = calendar::total_seconds(&watch, &manual);
            HttpResponse::Ok().json(json!({
                "hours": (on + off) as f64 / 3600.0
            }))
        }
        (Err(e), _) | (_, Err(e)) => {
            error!("Error loading activity totals: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[post("/api/watchtime/update")]
async fn watchtime_update(
    body: web::Json<WatchtimeUpdateRequest>,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let video_id = match body.video_id {
        Some(video_id) => video_id,
        None => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Missing videoId"
            }));
        }
    };
    let last_video_time = body.last_video_time.unwrap_or(0.0);
    let elapsed = body.elapsed_time.unwrap_or(0.0);
    if elapsed <= 0.0 || !elapsed.is_finite() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid time payload"
        }));
    }

    // Anonymous watch time is not an error, just not recorded.
    let user_id = match user_id_from_request(&http_req) {
        Some(user_id) => user_id,
        None => return HttpResponse::Ok().json(json!({})),
    };

    let entry = WatchLogEntry {
        user_id,
        video_id: Some(video_id),
        watched_at: chrono::Utc::now().naive_utc(),
        watched_seconds: elapsed as i32,
        video_time_start: last_video_time - elapsed,
        video_time_end: last_video_time,
    };

    match state.watch_logs.insert(entry).await {
        Ok(()) => HttpResponse::Ok().json(json!({})),
        Err(e) => {
            error!("Error recording watch time: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[post("/api/off-platform-time")]
async fn off_platform_time(
    body: web::Json<OffPlatformTimeRequest>,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let (start_date, end_date, minutes) = match (&body.start_date, &body.end_date, body.minutes) {
        (Some(start_date), Some(end_date), Some(minutes)) => (start_date, end_date, minutes),
        _ => {
            return HttpResponse::BadRequest().json(json!({
                "error": "No data provided"
            }));
        }
    };

    let user_id = match user_id_from_request(&http_req) {
        Some(user_id) => user_id,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized"
            }));
        }
    };

    let start_time = body
        .start_time
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("03:01");
    let default_end_time = if start_date == end_date { "03:02" } else { "02:59" };
    let end_time = body
        .end_time
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(default_end_time);

    let started_at =
        NaiveDateTime::parse_from_str(&format!("{} {}", start_date, start_time), "%Y-%m-%d %H:%M");
    let ended_at =
        NaiveDateTime::parse_from_str(&format!("{} {}", end_date, end_time), "%Y-%m-%d %H:%M");
    let (started_at, ended_at) = match (started_at, ended_at) {
        (Ok(started_at), Ok(ended_at)) => (started_at, ended_at),
        _ => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Invalid data provided"
            }));
        }
    };

    // Never create a truncated record: reject non-positive durations and
    // end-before-start ranges outright.
    if minutes <= 0.0
        || !minutes.is_finite()
        || (ended_at - started_at).num_seconds() <= 0
        || start_date > end_date
    {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid data provided"
        }));
    }

    let entry = ManualLogEntry {
        user_id,
        started_at,
        ended_at,
        duration_seconds: (minutes * 60.0) as i32,
        comment: body.comment.clone().unwrap_or_default(),
    };

    match state.manual_logs.insert(entry).await {
        Ok(()) => HttpResponse::Ok().json(json!({})),
        Err(e) => {
            error!("Error recording off-platform time: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[get("/api/off-platform-logs")]
async fn off_platform_logs(state: web::Data<AppState>, http_req: HttpRequest) -> HttpResponse {
    let user_id = match user_id_from_request(&http_req) {
        Some(user_id) => user_id,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized"
            }));
        }
    };

    match state.manual_logs.for_user(user_id).await {
        Ok(mut entries) => {
            entries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            let logs: Vec<ManualLogView> = entries
                .into_iter()
                .map(|e| ManualLogView {
                    minutes: e.duration_seconds as f64 / 60.0,
                    start_date: e.started_at.format("%Y-%m-%d").to_string(),
                    start_time: e.started_at.format("%H:%M:%S").to_string(),
                    comment: e.comment,
                })
                .collect();
            HttpResponse::Ok().json(json!({ "logs": logs }))
        }
        Err(e) => {
            error!("Error listing off-platform logs: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

#[post("/api/off-platform-log/delete")]
async fn off_platform_log_delete(
    body: web::Json<OffPlatformDeleteRequest>,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    let (start_date, start_time, minutes) = match (&body.start_date, &body.start_time, body.minutes)
    {
        (Some(start_date), Some(start_time), Some(minutes)) => (start_date, start_time, minutes),
        _ => {
            return HttpResponse::BadRequest().json(json!({
                "error": "No data provided"
            }));
        }
    };

    let user_id = match user_id_from_request(&http_req) {
        Some(user_id) => user_id,
        None => {
            return HttpResponse::Unauthorized().json(json!({
                "error": "Unauthorized"
            }));
        }
    };

    let started_at = match NaiveDateTime::parse_from_str(
        &format!("{} {}", start_date, start_time),
        "%Y-%m-%d %H:%M:%S",
    ) {
        Ok(started_at) => started_at,
        Err(_) => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Invalid data provided"
            }));
        }
    };

    match state
        .manual_logs
        .delete_matching(user_id, started_at, (minutes * 60.0) as i32)
        .await
    {
        Ok(_) => HttpResponse::Ok().json("ok"),
        Err(e) => {
            error!("Error deleting off-platform log: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Internal server error"
            }))
        }
    }
}

/// Catalogue imports happen out of process and carry no invalidation signal,
/// so the importer calls this after a write. Importers authenticate like any
/// other writer; an anonymous flush would be a free cache-bust loop.
#[post("/api/catalog/cache/invalidate")]
async fn invalidate_reference_cache(
    params: QueryPairs,
    state: web::Data<AppState>,
    http_req: HttpRequest,
) -> HttpResponse {
    if user_id_from_request(&http_req).is_none() {
        return HttpResponse::Unauthorized().json(json!({
            "error": "Unauthorized"
        }));
    }

    let kind = params
        .iter()
        .rev()
        .find(|(k, _)| k == "kind")
        .map(|(_, v)| v.to_lowercase());
    match kind.as_deref() {
        Some("channel") => state.reference_cache.invalidate(RefKind::Channel).await,
        Some("tag") | Some("topic") => state.reference_cache.invalidate(RefKind::Tag).await,
        Some("speaker") => state.reference_cache.invalidate(RefKind::Speaker).await,
        _ => state.reference_cache.invalidate_all().await,
    }
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(status)
        .service(browse_videos)
        .service(browse_statistics)
        .service(consistency_calendar)
        .service(user_overall)
        .service(watchtime_update)
        .service(off_platform_time)
        .service(off_platform_logs)
        .service(off_platform_log_delete)
        .service(invalidate_reference_cache);
}
