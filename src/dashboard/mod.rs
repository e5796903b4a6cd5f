use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::engine::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/matches", get(matches_handler))
        .route("/api/matches/:id", get(match_detail_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/model-info", get(model_info_handler))
        .route("/api/line-movements", get(line_movements_handler))
        .route(
            "/api/line-movements/significant",
            get(significant_movements_handler),
        )
        .route("/api/feed-status", get(feed_status_handler))
        .route("/api/refresh", post(refresh_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn index_handler() -> impl IntoResponse {
    Html(DASHBOARD_HTML)
}

/// GET /api/matches
async fn matches_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let matches = state.engine.matches().await;
    let last_refresh = state.engine.last_refresh().await;
    Json(serde_json::json!({
        "matches": matches,
        "count": matches.len(),
        "last_refresh": last_refresh,
    }))
}

/// GET /api/matches/:id — one match plus its projections
async fn match_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.engine.match_detail(&id).await {
        Some((m, projections)) => Ok(Json(serde_json::json!({
            "match": m,
            "projections": projections,
        }))),
        None => Err((StatusCode::NOT_FOUND, format!("no match with id {}", id))),
    }
}

/// GET /api/stats
async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .engine
        .db()
        .get_stats()
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/model-info
async fn model_info_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.model_info().await)
}

/// GET /api/line-movements
async fn line_movements_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let movements = state.engine.tracker().get_all_movements().await;
    let stats = state.engine.tracker().get_tracker_stats().await;
    Json(serde_json::json!({
        "movements": movements,
        "tracker_stats": stats,
    }))
}

/// GET /api/line-movements/significant
async fn significant_movements_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let movements = state.engine.tracker().get_significant_movements().await;
    Json(serde_json::json!({
        "movements": movements,
        "count": movements.len(),
    }))
}

/// GET /api/feed-status
async fn feed_status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.feed_status().await)
}

/// POST /api/refresh — run a refresh pass inline and report counts
async fn refresh_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    info!("Manual refresh requested");
    state
        .engine
        .refresh()
        .await
        .map(|summary| Json(serde_json::json!({ "status": "ok", "summary": summary })))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>PropSight — CS2 Projections</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #6c63ff;
    --green: #00c896;
    --red: #ff4f6a;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  .status-dot { width: 10px; height: 10px; border-radius: 50%; background: var(--green); display: inline-block; animation: pulse 1.5s infinite; }
  @keyframes pulse { 0%,100% { opacity: 1; } 50% { opacity: .3; } }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .stats-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }
  .stat-card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1.2rem; }
  .stat-card .label { color: var(--muted); font-size: .8rem; text-transform: uppercase; letter-spacing: .06em; margin-bottom: .4rem; }
  .stat-card .value { font-size: 1.7rem; font-weight: 700; }
  .pos { color: var(--green); }
  .neg { color: var(--red); }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; display: flex; justify-content: space-between; align-items: center; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .65rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  tr:last-child td { border-bottom: none; }
  .pill { display: inline-block; padding: .15rem .55rem; border-radius: 20px; font-size: .75rem; font-weight: 600; }
  .pill.value { background: rgba(0,200,150,.15); color: var(--green); }
  .pill.up { background: rgba(0,200,150,.15); color: var(--green); }
  .pill.down { background: rgba(255,79,106,.15); color: var(--red); }
  .pill.stable { background: rgba(136,136,170,.15); color: var(--muted); }
  .two-col { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }
  @media (max-width: 768px) { .two-col { grid-template-columns: 1fr; } }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .refresh-btn { background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  .refresh-btn:hover { border-color: var(--accent); color: var(--accent); }
</style>
</head>
<body>
<header>
  <span class="status-dot"></span>
  <h1>🎯 PropSight</h1>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="last-updated"></span>
</header>

<main>
  <div class="stats-grid">
    <div class="stat-card"><div class="label">Matches</div><div class="value" id="s-matches">–</div></div>
    <div class="stat-card"><div class="label">Projections</div><div class="value" id="s-projections">–</div></div>
    <div class="stat-card"><div class="label">Value Plays</div><div class="value pos" id="s-value">–</div></div>
    <div class="stat-card"><div class="label">Avg Confidence</div><div class="value" id="s-confidence">–</div></div>
  </div>

  <div class="panel">
    <div class="panel-header">Upcoming Matches
      <button class="refresh-btn" onclick="triggerRefresh()">↻ Refresh Data</button>
    </div>
    <table>
      <thead><tr><th>Matchup</th><th>Tournament</th><th>Starts</th><th>Projections</th></tr></thead>
      <tbody id="matches-tbody"><tr><td colspan="4" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>

  <div class="panel">
    <div class="panel-header">Projections <span id="match-title" style="color:var(--muted);font-weight:400;"></span></div>
    <table>
      <thead><tr><th>Player</th><th>Team</th><th>Stat</th><th>Lines</th><th>Projection</th><th>Diff</th><th>Conf</th></tr></thead>
      <tbody id="proj-tbody"><tr><td colspan="7" class="empty">Pick a match above</td></tr></tbody>
    </table>
  </div>

  <div class="panel">
    <div class="panel-header">Significant Line Movements</div>
    <table>
      <thead><tr><th>Player</th><th>Stat</th><th>Platform</th><th>Line</th><th>Move</th></tr></thead>
      <tbody id="moves-tbody"><tr><td colspan="5" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>
</main>

<script>
async function getJSON(url, opts) {
  const r = await fetch(url, opts);
  if (!r.ok) throw new Error(url + ' -> ' + r.status);
  return r.json();
}

function fmtLines(lines) {
  return lines.map(l => l.platform + ' ' + l.line.toFixed(1)).join(' / ');
}

async function showMatch(id, title) {
  document.getElementById('match-title').textContent = '— ' + title;
  const body = document.getElementById('proj-tbody');
  try {
    const data = await getJSON('/api/matches/' + id);
    if (!data.projections.length) {
      body.innerHTML = '<tr><td colspan="7" class="empty">No projections</td></tr>';
      return;
    }
    body.innerHTML = data.projections.map(p => `<tr>
      <td>${p.player_name}${p.value_opportunity ? ' <span class="pill value">value</span>' : ''}</td>
      <td>${p.team}</td><td>${p.stat_type}</td>
      <td>${fmtLines(p.dfs_lines)}</td>
      <td>${p.projected_value.toFixed(1)}</td>
      <td class="${p.difference >= 0 ? 'pos' : 'neg'}">${p.difference >= 0 ? '+' : ''}${p.difference.toFixed(1)}</td>
      <td>${p.confidence.toFixed(0)}%</td>
    </tr>`).join('');
  } catch (e) {
    body.innerHTML = '<tr><td colspan="7" class="empty">' + e.message + '</td></tr>';
  }
}

async function loadAll() {
  try {
    const stats = await getJSON('/api/stats');
    document.getElementById('s-matches').textContent = stats.total_matches;
    document.getElementById('s-projections').textContent = stats.total_projections;
    document.getElementById('s-value').textContent = stats.value_opportunities;
    document.getElementById('s-confidence').textContent =
      stats.avg_confidence != null ? stats.avg_confidence.toFixed(1) + '%' : '–';
    if (stats.last_refresh) {
      document.getElementById('last-updated').textContent =
        'updated ' + new Date(stats.last_refresh).toLocaleTimeString();
    }

    const data = await getJSON('/api/matches');
    const body = document.getElementById('matches-tbody');
    if (!data.matches.length) {
      body.innerHTML = '<tr><td colspan="4" class="empty">No upcoming matches</td></tr>';
    } else {
      body.innerHTML = data.matches.map(m => `<tr style="cursor:pointer"
        onclick="showMatch('${m.id}', '${m.team1} vs ${m.team2}')">
        <td><strong>${m.team1}</strong> vs <strong>${m.team2}</strong></td>
        <td>${m.tournament}</td>
        <td>${new Date(m.start_time).toLocaleString()}</td>
        <td>→</td>
      </tr>`).join('');
    }

    const moves = await getJSON('/api/line-movements/significant');
    const mbody = document.getElementById('moves-tbody');
    if (!moves.movements.length) {
      mbody.innerHTML = '<tr><td colspan="5" class="empty">No significant movement yet</td></tr>';
    } else {
      mbody.innerHTML = moves.movements.map(m => `<tr>
        <td>${m.player_name}</td><td>${m.stat_type}</td><td>${m.platform}</td>
        <td>${m.current_line.toFixed(1)}</td>
        <td><span class="pill ${m.direction}">${m.movement >= 0 ? '+' : ''}${m.movement.toFixed(1)}</span></td>
      </tr>`).join('');
    }
  } catch (e) {
    console.error(e);
  }
}

async function triggerRefresh() {
  try {
    await getJSON('/api/refresh', { method: 'POST' });
    await loadAll();
  } catch (e) {
    console.error(e);
  }
}

loadAll();
setInterval(loadAll, 30000);
</script>
</body>
</html>
"#;
