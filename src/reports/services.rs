use time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::CreateReportRequest,
    guard::{self, Candidate},
    repo_types::{ConfirmOutcome, NewReport, Report, ReportKind},
};
use crate::{
    auth::repo_types::User,
    error::{AppError, AppResult},
    state::AppState,
};

/// Age after which a report is invisible and eligible for the sweep.
pub const REPORT_TTL: Duration = Duration::minutes(60);
pub const DEFAULT_WINDOW_MINUTES: i64 = 30;
const SUPPORTED_WINDOWS: [i64; 2] = [30, 60];

/// Only 30 and 60 are honoured; anything else falls back to 30.
pub fn clamp_window(requested: Option<i64>) -> i64 {
    match requested {
        Some(m) if SUPPORTED_WINDOWS.contains(&m) => m,
        _ => DEFAULT_WINDOW_MINUTES,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validated form of a create request.
#[derive(Debug)]
struct ReportInput {
    kind: ReportKind,
    location: String,
    bus_number: Option<String>,
    direction: Option<String>,
    lat: f64,
    lng: f64,
}

impl TryFrom<CreateReportRequest> for ReportInput {
    type Error = AppError;

    fn try_from(req: CreateReportRequest) -> Result<Self, Self::Error> {
        let kind = req
            .kind
            .as_deref()
            .and_then(|k| k.parse::<ReportKind>().ok())
            .ok_or_else(|| AppError::validation("invalid report type"))?;
        let location = non_empty(req.location)
            .ok_or_else(|| AppError::validation("street or stop is required"))?;
        let (lat, lng) = match (req.lat, req.lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => (lat, lng),
            _ => return Err(AppError::validation("a valid map location is required")),
        };
        Ok(Self {
            kind,
            location,
            bus_number: non_empty(req.bus_number),
            direction: non_empty(req.direction),
            lat,
            lng,
        })
    }
}

/// Creates a report in the caller's city after the duplicate check.
#[instrument(skip(state, caller, req), fields(user_id = %caller.id, city = %caller.city))]
pub async fn create_report(
    state: &AppState,
    caller: &User,
    req: CreateReportRequest,
) -> AppResult<Report> {
    if caller.banned {
        return Err(AppError::Forbidden("account banned"));
    }
    if !caller.has_city() {
        return Err(AppError::validation("select a city first"));
    }
    let input = ReportInput::try_from(req)?;

    let now = state.clock.now();
    let candidate = Candidate {
        kind: input.kind,
        lat: input.lat,
        lng: input.lng,
    };
    if guard::should_reject(state.store.as_ref(), now, candidate, &caller.city).await? {
        warn!(kind = ?input.kind, "duplicate report rejected");
        return Err(AppError::DuplicateReport);
    }

    let report = state
        .store
        .insert_report(NewReport {
            id: Uuid::new_v4(),
            city: caller.city.clone(),
            kind: input.kind,
            location: input.location,
            bus_number: input.bus_number,
            direction: input.direction,
            lat: input.lat,
            lng: input.lng,
            created_at: now,
            author_id: caller.id,
        })
        .await?;

    info!(report_id = %report.id, kind = ?report.kind, "report created");
    Ok(report)
}

/// Reports of `city` younger than the clamped window, newest first.
#[instrument(skip(state))]
pub async fn list_reports(
    state: &AppState,
    city: &str,
    window_minutes: Option<i64>,
) -> AppResult<Vec<Report>> {
    let city = city.trim();
    if city.is_empty() {
        return Err(AppError::validation("city is required"));
    }
    let window = Duration::minutes(clamp_window(window_minutes));
    let since = state.clock.now() - window;
    Ok(state.store.list_reports(city, since).await?)
}

/// Records one confirmation per (caller, report) and credits the author.
#[instrument(skip(state, caller), fields(user_id = %caller.id))]
pub async fn confirm_report(state: &AppState, caller: &User, report_id: Uuid) -> AppResult<()> {
    if caller.banned {
        return Err(AppError::Forbidden("account banned"));
    }
    match state
        .store
        .confirm(caller.id, report_id, state.clock.now())
        .await?
    {
        ConfirmOutcome::Confirmed { author_id } => {
            info!(%report_id, author_id = ?author_id, "report confirmed");
            Ok(())
        }
        ConfirmOutcome::AlreadyConfirmed => Err(AppError::AlreadyConfirmed),
        ConfirmOutcome::ReportMissing => Err(AppError::NotFound("report")),
    }
}
