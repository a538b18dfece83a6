//! Dashboard JavaScript
//!
//! - Subscribes to `/api/v1/ws` for pushed snapshots
//! - Falls back to polling `/api/v1/dashboard` while the socket is down
//! - Hands figures to `Plotly.react` unchanged and swaps the table markup

pub const SCRIPT: &str = r#"
let socket = null;
let pollTimer = null;
let lastVersion = 0;

function applySnapshot(snap) {
    if (!snap || snap.state_version === lastVersion) return;
    lastVersion = snap.state_version;

    const view = snap.view;
    Plotly.react('bar_graph', view.bar_chart.data, view.bar_chart.layout);
    Plotly.react('ratio_graph', view.ratio_chart.data, view.ratio_chart.layout);

    const table = document.getElementById('table');
    if (view.table.kind === 'markup') {
        table.innerHTML = view.table.html;
    } else {
        table.textContent = view.table.text;
    }

    const banner = document.getElementById('stale_banner');
    if (snap.last_error) {
        banner.textContent = 'Last refresh failed (' + snap.last_error.at + '): ' +
            snap.last_error.message + (snap.stale ? ' — showing previous data.' : '');
        banner.classList.remove('hidden');
    } else {
        banner.classList.add('hidden');
    }

    const status = document.getElementById('status');
    status.textContent = snap.published_at
        ? 'tick ' + snap.published_tick + ' · ' + snap.rows + ' rows · ' + snap.published_at
        : 'waiting for first refresh';
}

async function poll() {
    try {
        const res = await fetch('/api/v1/dashboard');
        applySnapshot(await res.json());
    } catch (e) {
        console.error('Dashboard poll failed:', e);
    }
}

function startPolling() {
    if (pollTimer) return;
    poll();
    pollTimer = setInterval(poll, REFRESH_INTERVAL_MS);
}

function stopPolling() {
    if (!pollTimer) return;
    clearInterval(pollTimer);
    pollTimer = null;
}

function connect() {
    const proto = location.protocol === 'https:' ? 'wss:' : 'ws:';
    socket = new WebSocket(proto + '//' + location.host + '/api/v1/ws');
    socket.onopen = () => stopPolling();
    socket.onmessage = (ev) => {
        try {
            applySnapshot(JSON.parse(ev.data));
        } catch (e) {
            console.error('Bad snapshot:', e);
        }
    };
    socket.onclose = () => {
        startPolling();
        setTimeout(connect, REFRESH_INTERVAL_MS);
    };
}

startPolling();
connect();
"#;
