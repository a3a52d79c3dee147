//! Leptos client-side app wiring and routes.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
mod client;
mod components;
mod config;
mod directives;
mod error;
mod events;
mod pages;
mod push;
mod selection;
mod webclient;

// Top-Level pages
use crate::pages::not_found::NotFound;
use crate::pages::topicmap::TopicmapPage;

// Pulled in for its `js` feature, which lets `rand` seed from the browser.
#[cfg(target_arch = "wasm32")]
use getrandom as _;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Entry point run by wasm-bindgen once the module is instantiated.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
	init_logging();
	leptos::mount::mount_to_body(App);
}

/// An app router which renders the topicmap pages and handles 404's
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		// sets the document title
		<Title text="Topicmap" />

		// injects metadata in the <head> of the page
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				// one page instance for `/` and every topicmap URL;
				// the page reads topicmap and selection from the path itself
				<ParentRoute path=path!("") view=TopicmapPage>
					<Route path=path!("") view=|| () />
					<Route path=path!("topicmap/*rest") view=|| () />
				</ParentRoute>
			</Routes>
		</Router>
	}
}
