use maud::{html, Markup};

use crate::{templates::format_timestamp, StationRecord};

/// Table of active stations, in the order given
pub fn station_table(stations: &[StationRecord]) -> Markup {
    html! {
        @if stations.is_empty() {
            div class="has-text-centered has-text-grey py-4" {
                p { "No stations have registered recently." }
            }
        } @else {
            div class="table-container" {
                table class="table is-fullwidth is-striped is-hoverable" {
                    thead {
                        tr {
                            th { "Station" }
                            th class="has-text-right" { "Latitude" }
                            th class="has-text-right" { "Longitude" }
                            th { "Hardware" }
                            th { "Software" }
                            th { "Last seen" }
                        }
                    }
                    tbody {
                        @for station in stations {
                            tr {
                                td {
                                    a href=(station.station_url) rel="nofollow" {
                                        @if station.description.is_empty() {
                                            (station.station_url)
                                        } @else {
                                            (station.description)
                                        }
                                    }
                                }
                                td class="has-text-right" { (format!("{:.3}", station.latitude)) }
                                td class="has-text-right" { (format!("{:.3}", station.longitude)) }
                                td {
                                    (station.station_type)
                                    @if !station.station_model.is_empty() {
                                        br;
                                        span class="is-size-7 has-text-grey" { (station.station_model) }
                                    }
                                }
                                td class="is-size-7" {
                                    @if !station.weewx_info.is_empty() {
                                        "weewx " (station.weewx_info)
                                    }
                                }
                                td {
                                    span class="is-size-7" { (format_timestamp(station.last_seen)) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
