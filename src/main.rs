mod app;
mod config;
mod conversation;
mod error;
mod export;
mod gateway;
mod interpreter;
mod loading;
mod message;
mod nav;
mod session;
mod state;
mod store;
mod suggestions;
mod toast;

use app::*;
use leptos::*;

fn main() {
    console_error_panic_hook::set_once();
    mount_to_body(|| {
        view! { <App /> }
    })
}
