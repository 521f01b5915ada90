use maud::{html, Markup};

use crate::{templates::format_timestamp, HistoryChart};

/// The dense history matrix as a table: one row per run, one column per type
pub fn history_table(chart: &HistoryChart) -> Markup {
    html! {
        @if chart.timestamps.is_empty() {
            div class="has-text-centered has-text-grey py-4" {
                p { "No history has been recorded yet." }
            }
        } @else {
            div class="table-container" {
                table class="table is-fullwidth is-striped is-narrow" {
                    thead {
                        tr {
                            th { "Recorded" }
                            @for series in &chart.series {
                                th class="has-text-right" { (series.station_type) }
                            }
                        }
                    }
                    tbody {
                        @for (index, timestamp) in chart.timestamps.iter().enumerate() {
                            tr {
                                td class="is-size-7" { (format_timestamp(*timestamp)) }
                                @for series in &chart.series {
                                    td class="has-text-right" {
                                        (series.active.get(index).copied().unwrap_or(0))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
