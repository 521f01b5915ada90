use maud::{html, Markup, PreEscaped};

use crate::{
    templates::{
        error_notice, history_table,
        layouts::{base, CurrentPage, PageConfig},
    },
    HistoryChart,
};

/// History page: the count table plus the matrix as embedded JSON for a chart script
pub fn history_page(chart: Result<&HistoryChart, &str>) -> Markup {
    let config = PageConfig {
        title: "Weather Station Registry - History",
        current_page: CurrentPage::History,
    };

    let content = html! {
        @match chart {
            Ok(chart) => {
                div class="box" {
                    h2 class="title is-5 mb-4" { "Active stations over time" }
                    (history_table(chart))
                }
                script type="application/json" id="history-data" {
                    (PreEscaped(embedded_json(chart)))
                }
            }
            Err(message) => {
                (error_notice(message))
            }
        }
    };

    base(&config, content)
}

/// JSON that is safe to place inside a script element
fn embedded_json(chart: &HistoryChart) -> String {
    serde_json::to_string(chart)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}
