use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::session::{DashboardSnapshot, FetchOutcome};

/// Current dashboard snapshot
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Current dashboard snapshot", body = DashboardSnapshot),
    ),
    tag = "dashboard"
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.session.snapshot())
}

/// Server-sent events: one `snapshot` event per render, starting with the current one.
#[utoipa::path(
    get,
    path = "/api/dashboard/stream",
    responses(
        (status = 200, description = "Stream of `snapshot` events", body = DashboardSnapshot, content_type = "text/event-stream"),
    ),
    tag = "dashboard"
)]
pub async fn stream_dashboard(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.session.subscribe_views()).map(|snapshot| {
        let event = Event::default()
            .event("snapshot")
            .data(serde_json::to_string(&snapshot).unwrap_or_default());
        Ok::<_, Infallible>(event)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub applied: bool,
    pub count: usize,
    pub snapshot: DashboardSnapshot,
}

/// Manual bulk refetch of the live window
#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "Bulk fetch attempted", body = RefreshResponse),
        (status = 503, description = "No active session"),
    ),
    tag = "dashboard"
)]
pub async fn refresh(State(state): State<AppState>) -> AppResult<Json<RefreshResponse>> {
    let outcome = state.session.refresh().await;

    let (applied, count) = match outcome {
        FetchOutcome::Applied { count } => (true, count),
        FetchOutcome::Failed | FetchOutcome::Stale => (false, 0),
        FetchOutcome::NoSession => {
            return Err(AppError::ServiceUnavailable(
                "No active session".to_string(),
            ));
        }
    };

    Ok(Json(RefreshResponse {
        applied,
        count,
        snapshot: state.session.snapshot(),
    }))
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Live dashboard page", body = String, content_type = "text/html"),
    ),
    tag = "dashboard"
)]
pub async fn dashboard_page() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Html(DASHBOARD_HTML),
    )
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Water Quality Monitor</title>
    <style>
        body { font-family: system-ui, sans-serif; margin: 0; padding: 1.5rem; }
        .status { display: inline-block; padding: 0.25rem 0.75rem; border: 1px solid; border-radius: 0.25rem; font-size: 0.75rem; text-transform: uppercase; }
        .status.connected { color: #16a34a; }
        .status.connecting { color: #ca8a04; }
        .status.error { color: #dc2626; }
        .readouts { display: flex; gap: 2rem; margin: 1.5rem 0; }
        .readout .value { font-size: 2rem; font-weight: 600; }
        .safe { color: #16a34a; }
        .unsafe { color: #dc2626; }
        table { border-collapse: collapse; font-size: 0.85rem; }
        td, th { padding: 0.25rem 0.75rem; border-bottom: 1px solid #e2e8f0; text-align: right; }
    </style>
</head>
<body>
    <span id="status" class="status connecting">connecting</span>
    <h2 id="banner">Waiting for readings…</h2>
    <div class="readouts" id="readouts"></div>
    <table>
        <thead><tr><th>Time</th><th>pH</th><th>TDS</th><th>Turbidity</th></tr></thead>
        <tbody id="history"></tbody>
    </table>
    <script>
        const statusEl = document.getElementById('status');
        const bannerEl = document.getElementById('banner');
        const readoutsEl = document.getElementById('readouts');
        const historyEl = document.getElementById('history');

        function draw(snapshot) {
            statusEl.className = 'status ' + snapshot.status;
            statusEl.textContent = snapshot.status;

            const view = snapshot.view;
            if (!view) return;

            bannerEl.textContent = view.potability === 'potable' ? 'POTABLE' : 'NOT POTABLE';
            bannerEl.className = view.potability === 'potable' ? 'safe' : 'unsafe';

            readoutsEl.innerHTML = view.readouts.map(r =>
                `<div class="readout"><div>${r.metric.toUpperCase()}</div>` +
                `<div class="value ${r.state}">${r.display}</div></div>`
            ).join('');

            const [ph, tds, turb] = view.series;
            historyEl.innerHTML = view.labels.map((label, i) =>
                `<tr><td>${label}</td><td>${ph.values[i].toFixed(1)}</td>` +
                `<td>${Math.round(tds.values[i])}</td><td>${turb.values[i].toFixed(1)}</td></tr>`
            ).reverse().join('');
        }

        const source = new EventSource('/api/dashboard/stream');
        source.addEventListener('snapshot', e => draw(JSON.parse(e.data)));
        source.onerror = () => { statusEl.className = 'status error'; statusEl.textContent = 'error'; };
    </script>
</body>
</html>
"##;
