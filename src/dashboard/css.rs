//! Dashboard styles

pub const STYLES: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            margin: 0 auto;
            max-width: 1200px;
            padding: 16px;
            color: #222;
        }
        .graph {
            min-height: 420px;
        }
        .banner {
            background: #fff4e5;
            border: 1px solid #f0a030;
            border-radius: 4px;
            padding: 8px 12px;
            margin-bottom: 12px;
        }
        .hidden {
            display: none;
        }
        #table table {
            border-collapse: collapse;
            font-size: 13px;
            width: 100%;
        }
        #table th,
        #table td {
            border: 1px solid #ddd;
            padding: 4px 8px;
            text-align: right;
        }
        #table th {
            background: #f5f5f5;
        }
        footer {
            color: #888;
            font-size: 12px;
            margin-top: 16px;
        }
"#;
