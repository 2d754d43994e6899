use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use utoipa::ToSchema;

use crate::attendance::error::AttendanceError;
use crate::attendance::lock;
use crate::attendance::rules::{self, CamperDay};
use crate::config::Config;
use crate::model::attendance::NewRecord;
use crate::model::checkpoint::Checkpoint;
use crate::model::status::Status;
use crate::schedule;
use crate::store::{AttendanceStore, BulkWrite, SqliteStore};
use crate::utils::roster_cache;

#[derive(Deserialize, ToSchema)]
pub struct RecordRequest {
    #[schema(example = "12345")]
    pub person_id: String,
    #[schema(example = "Trailblazers")]
    pub program_name: String,
    #[schema(example = 1)]
    pub checkpoint_id: i64,
    #[schema(example = "present")]
    pub status: String,
    #[schema(example = "2026-06-16", format = "date", value_type = String)]
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct BatchRequest {
    #[schema(example = "Trailblazers")]
    pub program_name: String,
    #[schema(example = 1)]
    pub checkpoint_id: i64,
    #[schema(example = "present")]
    pub status: String,
    pub person_ids: Vec<String>,
    #[schema(example = "2026-06-16", format = "date", value_type = String)]
    pub date: Option<NaiveDate>,
    pub recorded_by: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetRequest {
    #[schema(example = "Trailblazers")]
    pub program_name: String,
    #[schema(example = "2026-06-16", format = "date", value_type = String)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

fn target_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

fn parse_checkpoint(id: i64) -> Result<Checkpoint, AttendanceError> {
    Checkpoint::from_id(id)
        .ok_or_else(|| AttendanceError::validation(format!("Unknown checkpoint {}", id)))
}

fn parse_status(status: &str) -> Result<Status, AttendanceError> {
    Status::from_str(status)
        .map_err(|_| AttendanceError::validation(format!("Invalid status '{}'", status)))
}

fn checkpoints_json() -> serde_json::Value {
    json!(
        Checkpoint::all()
            .iter()
            .map(|cp| json!({
                "id": cp.id(),
                "name": cp.name(),
                "time_label": cp.time_label(),
            }))
            .collect::<Vec<_>>()
    )
}

/// Save a single attendance record (debounced from the UI)
#[utoipa::path(
    post,
    path = "/api/attendance/record",
    request_body = RecordRequest,
    responses(
        (status = 200, description = "Record saved", body = Object, example = json!({
            "success": true, "status": "present"
        })),
        (status = 400, description = "Invalid status or checkpoint"),
        (status = 403, description = "Day is locked"),
        (status = 409, description = "Early pickup requires a present/late daily status"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn record(
    store: web::Data<SqliteStore>,
    config: web::Data<Config>,
    payload: web::Json<RecordRequest>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    if req.person_id.is_empty() || req.program_name.is_empty() {
        return Err(AttendanceError::validation("Missing required fields").into());
    }
    let checkpoint = parse_checkpoint(req.checkpoint_id)?;
    let status = parse_status(&req.status)?;
    let date = target_date(req.date);
    lock::ensure_unlocked(date, Local::now().naive_local(), config.lock_hour)?;

    // The client computed the toggle semantics; the server re-checks the
    // dependent toggle and cascades before persisting.
    let statuses = store
        .day(&req.person_id, &req.program_name, date)
        .await
        .map_err(AttendanceError::Store)?;
    let day = CamperDay::from_statuses(&statuses);
    let writes = rules::server_writes(day, checkpoint, status)?;

    let week = schedule::record_week(date);
    let recorded_by = req.recorded_by.unwrap_or_else(|| "staff".to_string());
    for write in &writes {
        let record = NewRecord {
            person_id: req.person_id.clone(),
            program_name: req.program_name.clone(),
            week,
            date,
            checkpoint: write.checkpoint,
            status: write.status,
            recorded_by: recorded_by.clone(),
            notes: if write.checkpoint == checkpoint {
                req.notes.clone()
            } else {
                None
            },
        };
        store.put(&record).await.map_err(AttendanceError::Store)?;
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "status": status.to_string()
    })))
}

/// Batch save attendance records (Mark All Present / Unmark All)
#[utoipa::path(
    post,
    path = "/api/attendance/record-batch",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch applied", body = Object, example = json!({
            "success": true, "count": 3
        })),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Day is locked"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn record_batch(
    store: web::Data<SqliteStore>,
    config: web::Data<Config>,
    payload: web::Json<BatchRequest>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    if req.program_name.is_empty() || req.person_ids.is_empty() {
        return Err(AttendanceError::validation("Missing required fields").into());
    }
    let checkpoint = parse_checkpoint(req.checkpoint_id)?;
    let status = parse_status(&req.status)?;
    let date = target_date(req.date);
    lock::ensure_unlocked(date, Local::now().naive_local(), config.lock_hour)?;

    let current = store
        .program_day(&req.program_name, date)
        .await
        .map_err(AttendanceError::Store)?;

    // Campers already at the target status are excluded; unmarking targets
    // only campers holding a record for the checkpoint.
    let targets: Vec<String> = req
        .person_ids
        .iter()
        .filter(|pid| {
            let existing = current.get(pid.as_str()).and_then(|m| m.get(&checkpoint));
            if status == Status::Unmarked {
                existing.is_some()
            } else {
                existing != Some(&status)
            }
        })
        .cloned()
        .collect();

    let count = if targets.is_empty() {
        0
    } else {
        let write = BulkWrite {
            program_name: req.program_name.clone(),
            week: schedule::record_week(date),
            date,
            checkpoint,
            status,
            recorded_by: req.recorded_by.unwrap_or_else(|| "staff".to_string()),
        };
        store
            .bulk_put(&targets, &write)
            .await
            .map_err(AttendanceError::Store)?
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": count
    })))
}

/// Clear all attendance for a program/date
#[utoipa::path(
    post,
    path = "/api/attendance/reset",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Records cleared", body = Object, example = json!({
            "success": true, "deleted_count": 12
        })),
        (status = 403, description = "Day is locked"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn reset(
    store: web::Data<SqliteStore>,
    config: web::Data<Config>,
    payload: web::Json<ResetRequest>,
) -> actix_web::Result<impl Responder> {
    let req = payload.into_inner();
    let date = target_date(req.date);
    lock::ensure_unlocked(date, Local::now().naive_local(), config.lock_hour)?;

    let deleted = store
        .reset(&req.program_name, date)
        .await
        .map_err(AttendanceError::Store)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "deleted_count": deleted
    })))
}

/// Camper list for a program/week with attendance for a date
#[utoipa::path(
    get,
    path = "/api/attendance/campers/{program}/{week}",
    params(
        ("program", Path, description = "Program name"),
        ("week", Path, description = "Camp week number"),
        ("date", Query, description = "Target date, defaults to today")
    ),
    responses(
        (status = 200, description = "Roster with attendance"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn campers(
    store: web::Data<SqliteStore>,
    config: web::Data<Config>,
    path: web::Path<(String, u32)>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    let (program, week) = path.into_inner();
    let date = target_date(query.date);

    let roster = roster_cache::roster_for(&config.roster_path, &program, week)
        .await
        .map_err(|e| {
            error!(error = %e, program = %program, week, "Failed to load roster");
            actix_web::error::ErrorInternalServerError("Roster unavailable")
        })?;

    let attendance = store
        .program_day(&program, date)
        .await
        .map_err(AttendanceError::Store)?;

    let campers: Vec<_> = roster
        .iter()
        .map(|entry| {
            let att: serde_json::Map<String, serde_json::Value> = attendance
                .get(&entry.person_id)
                .map(|statuses| {
                    statuses
                        .iter()
                        .map(|(cp, status)| {
                            (cp.id().to_string(), json!({ "status": status.to_string() }))
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({
                "person_id": entry.person_id,
                "name": entry.name,
                "has_kc": entry.has_kc,
                "attendance": att
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "program": program,
        "week": week,
        "date": date,
        "locked": lock::is_locked(date, Local::now().naive_local(), config.lock_hour),
        "campers": campers,
        "checkpoints": checkpoints_json()
    })))
}

/// Admin: aggregated attendance stats for all programs on a date
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(
        ("date", Query, description = "Target date, defaults to today")
    ),
    responses(
        (status = 200, description = "Per-program per-checkpoint aggregates"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn summary(
    store: web::Data<SqliteStore>,
    config: web::Data<Config>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    use std::collections::HashMap;

    let date = target_date(query.date);
    let week = schedule::camp_week(date);

    let counts = store
        .counts_for_date(date)
        .await
        .map_err(AttendanceError::Store)?;

    let programs = match week {
        Some(week) => roster_cache::programs_for_week(&config.roster_path, week)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to load roster for summary");
                Vec::new()
            }),
        None => Vec::new(),
    };

    // (program, checkpoint) -> status -> count
    let mut grouped: HashMap<(String, i64), HashMap<String, i64>> = HashMap::new();
    let mut totals: HashMap<&str, i64> =
        HashMap::from([("present", 0), ("absent", 0), ("late", 0), ("early_pickup", 0)]);
    for row in counts {
        *grouped
            .entry((row.program_name.clone(), row.checkpoint_id))
            .or_default()
            .entry(row.status.clone())
            .or_default() += row.count;
        // KPI totals: daily checkpoint only, to avoid double-counting KC;
        // early pickup is the checkpoint-6 on-count.
        if row.checkpoint_id == Checkpoint::Daily.id() {
            if let Some(total) = totals.get_mut(row.status.as_str()) {
                *total += row.count;
            }
        } else if row.checkpoint_id == Checkpoint::EarlyPickup.id() && row.status == "present" {
            if let Some(total) = totals.get_mut("early_pickup") {
                *total += row.count;
            }
        }
    }

    let programs_data: Vec<_> = programs
        .iter()
        .map(|(program, total_campers)| {
            let checkpoints: Vec<_> = Checkpoint::all()
                .iter()
                .map(|cp| {
                    let stats = grouped
                        .get(&(program.clone(), cp.id()))
                        .cloned()
                        .unwrap_or_default();
                    let marked: i64 = stats.values().sum();
                    let completion = if *total_campers > 0 {
                        (marked as f64 / *total_campers as f64 * 100.0).round() as i64
                    } else {
                        0
                    };
                    json!({
                        "checkpoint_id": cp.id(),
                        "checkpoint_name": cp.name(),
                        "present": stats.get("present").copied().unwrap_or(0),
                        "absent": stats.get("absent").copied().unwrap_or(0),
                        "late": stats.get("late").copied().unwrap_or(0),
                        "marked": marked,
                        "total": total_campers,
                        "completion": completion
                    })
                })
                .collect();
            json!({
                "program": program,
                "total_campers": total_campers,
                "checkpoints": checkpoints
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "date": date,
        "week": week,
        "totals": totals,
        "total_campers": programs.iter().map(|(_, n)| n).sum::<usize>(),
        "programs": programs_data,
        "checkpoints": checkpoints_json()
    })))
}

/// Admin: individual camper attendance for a program on a date
#[utoipa::path(
    get,
    path = "/api/attendance/detail/{program}",
    params(
        ("program", Path, description = "Program name"),
        ("date", Query, description = "Target date, defaults to today")
    ),
    responses(
        (status = 200, description = "Per-camper records"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn detail(
    store: web::Data<SqliteStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
    query: web::Query<DateQuery>,
) -> actix_web::Result<impl Responder> {
    use std::collections::HashMap;

    let program = path.into_inner();
    let date = target_date(query.date);
    let week = schedule::camp_week(date);

    let roster = match week {
        Some(week) => roster_cache::roster_for(&config.roster_path, &program, week)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, program = %program, "Failed to load roster for detail");
                Vec::new()
            }),
        None => Vec::new(),
    };

    let records = store
        .records_for(&program, date)
        .await
        .map_err(AttendanceError::Store)?;

    let mut att_map: HashMap<String, serde_json::Map<String, serde_json::Value>> = HashMap::new();
    for r in records {
        att_map.entry(r.person_id.clone()).or_default().insert(
            r.checkpoint_id.to_string(),
            json!({
                "status": r.status,
                "notes": r.notes,
                "recorded_by": r.recorded_by,
                "recorded_at": r.recorded_at
            }),
        );
    }

    let campers: Vec<_> = roster
        .iter()
        .map(|entry| {
            json!({
                "person_id": entry.person_id,
                "name": entry.name,
                "has_kc": entry.has_kc,
                "attendance": att_map.remove(&entry.person_id).unwrap_or_default()
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "program": program,
        "date": date,
        "week": week,
        "campers": campers,
        "checkpoints": checkpoints_json()
    })))
}

/// List of active attendance checkpoints
#[utoipa::path(
    get,
    path = "/api/attendance/checkpoints",
    responses((status = 200, description = "Checkpoint list")),
    tag = "Attendance"
)]
pub async fn checkpoints() -> impl Responder {
    HttpResponse::Ok().json(json!({ "checkpoints": checkpoints_json() }))
}

/// Current camp week info and all week date ranges
#[utoipa::path(
    get,
    path = "/api/attendance/week-info",
    responses((status = 200, description = "Week calendar")),
    tag = "Attendance"
)]
pub async fn week_info() -> impl Responder {
    let today = Local::now().date_naive();
    let weeks: serde_json::Map<String, serde_json::Value> = schedule::CAMP_WEEK_DATES
        .iter()
        .map(|(week, start, end)| {
            (week.to_string(), json!({ "start": start, "end": end }))
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "today": today,
        "current_week": schedule::camp_week(today),
        "is_camp_day": schedule::is_camp_day(today),
        "weeks": weeks
    }))
}
