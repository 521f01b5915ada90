use maud::{html, Markup};

use crate::{
    templates::{
        error_notice, format_timestamp,
        layouts::{base, CurrentPage, PageConfig},
        station_table,
    },
    Listing,
};

/// The published station listing (`index.html`)
pub fn station_listing_page(listing: &Listing) -> Markup {
    let config = PageConfig {
        title: "Weather Station Registry - Active Stations",
        current_page: CurrentPage::Stations,
    };

    base(&config, station_listing_content(listing))
}

pub fn station_listing_content(listing: &Listing) -> Markup {
    html! {
        @if let Some(error) = &listing.error {
            (error_notice(error))
        }

        div class="box" {
            div class="is-flex is-justify-content-space-between is-align-items-center mb-4 is-flex-wrap-wrap" {
                h2 class="title is-5 mb-0" {
                    (listing.stations.len()) " active stations"
                }
                p class="is-size-7 has-text-grey" {
                    "Last updated " (format_timestamp(listing.generated_at))
                }
            }
            p class="mb-4" {
                "Stations that have not checked in during the last "
                (listing.retention)
                " are not shown."
            }

            (station_table(&listing.stations))
        }
    }
}
