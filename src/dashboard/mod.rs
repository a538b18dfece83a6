//! Dashboard module - single-page view of the aggregate store
//!
//! Separated into HTML, CSS, and JS submodules for maintainability.
//!
//! # Architecture
//! - `html.rs`: Page structure (bar chart, ratio chart, raw table)
//! - `css.rs`: Styling
//! - `js.rs`: WebSocket subscription with polling fallback, Plotly rendering
//!
//! The page never asks for a refresh; it only displays what the refresh
//! driver last published.

mod css;
mod html;
mod js;

use crate::render::escape_html;

/// Generate the complete dashboard HTML page.
pub fn dashboard_html(title: &str, refresh_interval_ms: u64) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js" charset="utf-8"></script>
    <style>
{css}
    </style>
</head>
<body>
    <h1>{title}</h1>
{html}
    <script>
const REFRESH_INTERVAL_MS = {refresh_interval_ms};
{js}
    </script>
</body>
</html>"#,
        css = css::STYLES,
        html = html::TEMPLATE,
        js = js::SCRIPT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_escaped() {
        let page = dashboard_html("Buy <&> Sell", 5000);
        assert!(page.contains("<h1>Buy &lt;&amp;&gt; Sell</h1>"));
    }

    #[test]
    fn refresh_interval_is_injected() {
        let page = dashboard_html("x", 2500);
        assert!(page.contains("const REFRESH_INTERVAL_MS = 2500;"));
    }
}
