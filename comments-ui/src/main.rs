use dioxus::launch;
use dioxus::prelude::*;
use dioxus_logger::tracing::Level;

use comments_ui::{read_bootstrap, CommentsRoot};

fn main() {
    // Initialize logging for WASM
    wasm_logger::init(wasm_logger::Config::default());
    dioxus_logger::init(Level::INFO).ok();
    launch(App);
}

#[component]
fn App() -> Element {
    let bootstrap = use_hook(|| match read_bootstrap() {
        Ok(bootstrap) => Some(bootstrap),
        Err(e) => {
            log::error!("Comments disabled: {}", e);
            None
        }
    });

    rsx! {
        CommentsRoot { bootstrap }
    }
}
