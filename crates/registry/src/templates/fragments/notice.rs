use maud::{html, Markup};

/// Visible error banner for pages rendered without their data
pub fn error_notice(message: &str) -> Markup {
    html! {
        div class="notification is-danger is-light" role="alert" {
            strong { "Station data unavailable: " }
            (message)
        }
    }
}
