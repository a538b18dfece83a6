// =============================================================================
// Render Pipeline — loaded buckets → two charts + raw table
// =============================================================================
//
// Charts are emitted as Plotly figure JSON (`{"data": [...], "layout": {...}}`)
// so the page can hand them to `Plotly.react` untouched. The table is rendered
// server-side as HTML markup with every cell stringified verbatim.
//
// `render` is a pure function of its input: no clock, no state, and serde
// field order is fixed, so identical input serialises byte-identically.
// =============================================================================

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::types::{AggregateBatch, LoadOutcome};

/// Text shown in the table region while the store has no buckets.
pub const NO_DATA_TEXT: &str = "No Data Yet...";

pub const BAR_CHART_TITLE: &str = "Buy vs Sell";
pub const RATIO_CHART_TITLE: &str = "Buy/Sell Ratio";

// ── Figure model ────────────────────────────────────────────────────────────

/// One Plotly trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'static str,
    pub x: Vec<NaiveDateTime>,
    pub y: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
}

/// A chart specification in Plotly's figure shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    /// The idle placeholder: no traces, default layout.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What the table region displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableView {
    Placeholder { text: String },
    Markup { html: String },
}

/// The three outputs of one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    pub bar_chart: Figure,
    pub ratio_chart: Figure,
    pub table: TableView,
}

impl RenderedView {
    /// Two empty charts and the "no data" text.
    pub fn idle() -> Self {
        Self {
            bar_chart: Figure::empty(),
            ratio_chart: Figure::empty(),
            table: TableView::Placeholder {
                text: NO_DATA_TEXT.to_string(),
            },
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────────────

/// Build the bar chart, ratio chart and table for one load.
pub fn render(outcome: &LoadOutcome) -> RenderedView {
    match outcome {
        LoadOutcome::Empty => RenderedView::idle(),
        LoadOutcome::Rows(batch) => RenderedView {
            bar_chart: bar_chart(batch),
            ratio_chart: ratio_chart(batch),
            table: TableView::Markup {
                html: table_markup(batch),
            },
        },
    }
}

fn timestamps(batch: &AggregateBatch) -> Vec<NaiveDateTime> {
    batch.rows.iter().map(|r| r.ts_min).collect()
}

fn bar_chart(batch: &AggregateBatch) -> Figure {
    let x = timestamps(batch);
    Figure {
        data: vec![
            Trace {
                kind: "bar",
                name: "Buy Qty",
                x: x.clone(),
                y: batch.rows.iter().map(|r| r.buy_qty).collect(),
                mode: None,
            },
            Trace {
                kind: "bar",
                name: "Sell Qty",
                x,
                y: batch.rows.iter().map(|r| r.sell_qty).collect(),
                mode: None,
            },
        ],
        layout: Layout {
            title: Some(Title {
                text: BAR_CHART_TITLE,
            }),
            barmode: Some("group"),
        },
    }
}

fn ratio_chart(batch: &AggregateBatch) -> Figure {
    Figure {
        data: vec![Trace {
            kind: "scatter",
            name: "Buy/Sell Ratio",
            x: timestamps(batch),
            y: batch.rows.iter().map(|r| r.ratio()).collect(),
            mode: Some("lines+markers"),
        }],
        layout: Layout {
            title: Some(Title {
                text: RATIO_CHART_TITLE,
            }),
            barmode: None,
        },
    }
}

/// Header row of every loaded column, then one body row per bucket.
fn table_markup(batch: &AggregateBatch) -> String {
    let mut html = String::from("<table><thead><tr>");
    for col in &batch.columns {
        html.push_str("<th>");
        push_escaped(&mut html, col);
        html.push_str("</th>");
    }
    html.push_str("</tr></thead><tbody>");
    for row in &batch.rows {
        html.push_str("<tr>");
        for cell in &row.cells {
            html.push_str("<td>");
            push_escaped(&mut html, &cell.to_string());
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregateRow, CellValue};
    use chrono::NaiveDate;

    fn ts(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, m, 0)
            .unwrap()
    }

    fn row(m: u32, buy: f64, sell: f64) -> AggregateRow {
        AggregateRow {
            ts_min: ts(m),
            buy_qty: buy,
            sell_qty: sell,
            cells: vec![
                CellValue::Timestamp(ts(m)),
                CellValue::Real(buy),
                CellValue::Real(sell),
            ],
        }
    }

    fn two_row_batch() -> LoadOutcome {
        LoadOutcome::Rows(AggregateBatch {
            columns: vec!["ts_min".into(), "buy_qty".into(), "sell_qty".into()],
            rows: vec![row(0, 10.0, 5.0), row(1, 3.0, 0.0)],
        })
    }

    #[test]
    fn empty_renders_idle_placeholders() {
        let view = render(&LoadOutcome::Empty);
        assert!(view.bar_chart.is_empty());
        assert!(view.ratio_chart.is_empty());
        assert_eq!(
            view.table,
            TableView::Placeholder {
                text: "No Data Yet...".into()
            }
        );
        let json = serde_json::to_string(&view.bar_chart).unwrap();
        assert_eq!(json, r#"{"data":[],"layout":{}}"#);
    }

    #[test]
    fn bar_chart_has_grouped_buy_and_sell_series() {
        let view = render(&two_row_batch());
        let fig = &view.bar_chart;
        assert_eq!(fig.data.len(), 2);
        assert_eq!(fig.data[0].name, "Buy Qty");
        assert_eq!(fig.data[1].name, "Sell Qty");
        assert!(fig.data.iter().all(|t| t.kind == "bar" && t.x.len() == 2));
        assert_eq!(fig.data[0].y, vec![10.0, 3.0]);
        assert_eq!(fig.data[1].y, vec![5.0, 0.0]);
        assert_eq!(fig.layout.barmode, Some("group"));
        assert_eq!(fig.layout.title.as_ref().unwrap().text, "Buy vs Sell");
    }

    #[test]
    fn ratio_chart_uses_plus_one_guard() {
        let view = render(&two_row_batch());
        let trace = &view.ratio_chart.data[0];
        assert_eq!(trace.kind, "scatter");
        assert_eq!(trace.mode, Some("lines+markers"));
        assert!((trace.y[0] - 10.0 / 6.0).abs() < 1e-12);
        assert!((trace.y[1] - 3.0).abs() < f64::EPSILON);
        assert_eq!(
            view.ratio_chart.layout.title.as_ref().unwrap().text,
            "Buy/Sell Ratio"
        );
    }

    #[test]
    fn table_has_header_per_column_and_row_per_bucket() {
        let view = render(&two_row_batch());
        let TableView::Markup { html } = view.table else {
            panic!("expected markup");
        };
        assert_eq!(html.matches("<th>").count(), 3);
        assert_eq!(html.matches("<tbody><tr>").count(), 1);
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains("<td>2024-03-01 10:00:00</td><td>10.0</td><td>5.0</td>"));
        assert!(html.contains("<td>2024-03-01 10:01:00</td><td>3.0</td><td>0.0</td>"));
    }

    #[test]
    fn table_cells_keep_full_precision_and_are_escaped() {
        let mut r = row(0, 0.1 + 0.2, 1.0);
        r.cells.push(CellValue::Text("<b>&".into()));
        let outcome = LoadOutcome::Rows(AggregateBatch {
            columns: vec![
                "ts_min".into(),
                "buy_qty".into(),
                "sell_qty".into(),
                "note".into(),
            ],
            rows: vec![r],
        });
        let TableView::Markup { html } = render(&outcome).table else {
            panic!("expected markup");
        };
        assert!(html.contains("<td>0.30000000000000004</td>"));
        assert!(html.contains("<td>&lt;b&gt;&amp;</td>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let input = two_row_batch();
        let a = serde_json::to_string(&render(&input)).unwrap();
        let b = serde_json::to_string(&render(&input)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn figure_json_matches_plotly_shape() {
        let view = render(&two_row_batch());
        let json: serde_json::Value = serde_json::to_value(&view.ratio_chart).unwrap();
        assert_eq!(json["data"][0]["type"], "scatter");
        assert_eq!(json["data"][0]["x"][0], "2024-03-01T10:00:00");
        assert_eq!(json["layout"]["title"]["text"], "Buy/Sell Ratio");
        assert!(json["layout"].get("barmode").is_none());
    }
}
