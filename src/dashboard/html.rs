//! Dashboard HTML template
//!
//! Three regions refreshed wholesale on every published tick, plus a banner
//! shown while the last tick failed and the previous view is being kept.

pub const TEMPLATE: &str = r#"
    <div id="stale_banner" class="banner hidden"></div>

    <div id="bar_graph" class="graph"></div>
    <div id="ratio_graph" class="graph"></div>

    <h3>Raw Table</h3>
    <div id="table">Loading...</div>

    <footer>
        <span id="status">connecting</span>
    </footer>
"#;
