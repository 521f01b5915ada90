use maud::{html, Markup};

use crate::templates::layouts::CurrentPage;

pub fn navbar(current_page: CurrentPage) -> Markup {
    html! {
        nav class="navbar mb-4" role="navigation" aria-label="main navigation" {
            div class="navbar-menu is-active" {
                div class="navbar-start" {
                    a href="/" class=(nav_item_class(current_page, CurrentPage::Stations)) {
                        span class="icon-text" {
                            span class="icon" { (station_icon()) }
                            span { "Stations" }
                        }
                    }

                    a href="/history/table" class=(nav_item_class(current_page, CurrentPage::History)) {
                        span class="icon-text" {
                            span class="icon" { (chart_icon()) }
                            span { "History" }
                        }
                    }
                }
            }
        }
    }
}

fn nav_item_class(current: CurrentPage, page: CurrentPage) -> &'static str {
    if current == page {
        "navbar-item is-active"
    } else {
        "navbar-item"
    }
}

fn station_icon() -> Markup {
    html! {
        svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24"
            fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" {
            path d="M12 22s-8-4.5-8-11.8A8 8 0 0 1 12 2a8 8 0 0 1 8 8.2c0 7.3-8 11.8-8 11.8z" {}
            circle cx="12" cy="10" r="3" {}
        }
    }
}

fn chart_icon() -> Markup {
    html! {
        svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24"
            fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" {
            line x1="18" y1="20" x2="18" y2="10" {}
            line x1="12" y1="20" x2="12" y2="4" {}
            line x1="6" y1="20" x2="6" y2="14" {}
        }
    }
}
