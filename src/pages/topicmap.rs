use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::components::Outlet;
use leptos_router::hooks::{use_location, use_navigate};
use log::{error, warn};

use crate::client::{RestClient, TopicmapService};
use crate::components::topicmap::{Id, Point, TopicmapCanvas, TopicmapHandle};
use crate::config::Settings;
use crate::selection::HistoryState;

const TOPICMAP_TYPE_URI: &str = "dm4.topicmaps.topicmap";
const NOTE_TYPE_URI: &str = "dm4.notes.note";

/// Topicmaps the selector offers: the ones assigned to the configured
/// workspace, or all of them.
fn load_topicmap_list(service: Rc<dyn TopicmapService>, workspace_id: Option<Id>, into: RwSignal<Vec<(Id, String)>>) {
	spawn_local(async move {
		let topics = match workspace_id {
			Some(ws) => service.fetch_assigned_topics(ws, TOPICMAP_TYPE_URI).await,
			None => service.fetch_topics_by_type(TOPICMAP_TYPE_URI).await,
		};
		match topics {
			Ok(topics) => into.set(topics.into_iter().map(|t| (t.id, t.label())).collect()),
			Err(e) => warn!("topicmap list not loaded: {e}"),
		}
	});
}

/// The topicmap canvas with a toolbar and a page panel showing the
/// selected object.
#[component]
pub fn TopicmapPage() -> impl IntoView {
	let settings = Rc::new(Settings::load().unwrap_or_else(|e| {
		error!("{e}, using defaults");
		Settings::default()
	}));
	let service: Rc<dyn TopicmapService> = Rc::new(RestClient::new(settings.server_url.clone()));
	let handle = TopicmapHandle::new(settings.clone(), service.clone());

	let location = use_location();
	let route = Memo::new(move |_| location.pathname.with(|path| HistoryState::from_url(path)));
	let topicmap_id = Signal::derive(move || route.get().map(|r| r.topicmap_id));
	let selection = Signal::derive(move || route.get().and_then(|r| r.selection()));

	let topicmaps = RwSignal::new(Vec::new());
	load_topicmap_list(service, settings.workspace_id, topicmaps);

	let navigate = use_navigate();
	let on_select = move |ev| {
		let id = event_target_value(&ev);
		navigate(&format!("/topicmap/{id}"), Default::default());
	};
	let displayed = handle.displayed;
	let selected_value = move || displayed.get().map(|id| id.to_string()).unwrap_or_default();
	let options = move || {
		topicmaps
			.get()
			.into_iter()
			.map(|(id, name)| view! { <option value=id.to_string()>{name}</option> })
			.collect_view()
	};

	let handle_create = handle.clone();
	let on_create = move |_| {
		handle_create.gesture(|wc| {
			let state = wc.state();
			let center = state.to_topicmap(Point::new(state.width / 2.0, state.height / 2.0));
			wc.create_topic(NOTE_TYPE_URI, center.floor())
		});
	};

	let handle_reveal = handle.clone();
	let on_reveal_notes = move |_| handle_reveal.reveal_all_of_type(NOTE_TYPE_URI);

	let selected = handle.selected;
	let page_panel = move || match selected.get() {
		Some(object) => view! {
			<h2>{object.label()}</h2>
			<p class="type-uri">{object.type_uri().to_string()}</p>
		}
		.into_any(),
		None => view! { <p class="empty">"Nothing selected"</p> }.into_any(),
	};

	view! {
		<div class="webclient">
			<header class="toolbar">
				<select on:change=on_select prop:value=selected_value>
					{options}
				</select>
				<button on:click=on_create>"New Note"</button>
				<button on:click=on_reveal_notes>"Reveal All Notes"</button>
			</header>
			<main class="topicmap-panel">
				<TopicmapCanvas handle=handle topicmap_id=topicmap_id selection=selection />
			</main>
			<aside class="page-panel">{page_panel}</aside>
			<Outlet />
		</div>
	}
}
