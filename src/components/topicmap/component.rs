//! The Leptos side of the topicmap: a canvas with a topic layer on top,
//! DOM event wiring, the animation loop and the push socket.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, DragEvent, Element, HtmlCanvasElement, MessageEvent, MouseEvent,
	TouchEvent, WebSocket,
};

use super::customizer::Modifiers;
use super::state::{Cursor, TopicmapState};
use super::surface::CanvasSurface;
use super::types::{Id, Point};
use super::viewmodel::ObjectRef;
use crate::client::{Command, TopicmapService};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::push::PushMessage;
use crate::selection::{HistorySink, HistoryState, SelectedObject};
use crate::webclient::{Task, Webclient};

/// Markup a `Dom` customizer produced for a topic, placed centred on it.
#[derive(Clone, Debug, PartialEq)]
pub struct TopicOverlay {
	pub id: Id,
	/// Canvas coordinates.
	pub pos: Point,
	pub html: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuItem {
	Associate,
	Hide,
	Delete,
}

impl MenuItem {
	pub fn label(self) -> &'static str {
		match self {
			MenuItem::Associate => "Associate",
			MenuItem::Hide => "Hide",
			MenuItem::Delete => "Delete",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContextMenu {
	pub object: ObjectRef,
	pub canvas: Point,
	/// Known once the permission request came back.
	pub deletable: bool,
}

impl ContextMenu {
	pub fn items(&self) -> Vec<MenuItem> {
		let mut items = match self.object {
			ObjectRef::Topic(_) => vec![MenuItem::Associate, MenuItem::Hide],
			ObjectRef::Assoc(_) => vec![MenuItem::Hide],
		};
		if self.deletable {
			items.push(MenuItem::Delete);
		}
		items
	}
}

/// Shared between the canvas, its event handlers and the page around it.
#[derive(Clone)]
pub struct TopicmapHandle {
	webclient: Rc<RefCell<Option<Webclient>>>,
	service: Rc<dyn TopicmapService>,
	settings: Rc<Settings>,
	pub cursor: RwSignal<Cursor>,
	pub selected: RwSignal<Option<SelectedObject>>,
	/// The topicmap currently displayed.
	pub displayed: RwSignal<Option<Id>>,
	pub topic_layer: RwSignal<Vec<TopicOverlay>>,
	pub menu: RwSignal<Option<ContextMenu>>,
}

impl TopicmapHandle {
	pub fn new(settings: Rc<Settings>, service: Rc<dyn TopicmapService>) -> Self {
		Self {
			webclient: Rc::new(RefCell::new(None)),
			service,
			settings,
			cursor: RwSignal::new(Cursor::Default),
			selected: RwSignal::new(None),
			displayed: RwSignal::new(None),
			topic_layer: RwSignal::new(Vec::new()),
			menu: RwSignal::new(None),
		}
	}

	/// Runs `f` on the webclient. `None` until the canvas is mounted.
	pub fn with<R>(&self, f: impl FnOnce(&mut Webclient) -> R) -> Option<R> {
		self.webclient.borrow_mut().as_mut().map(f)
	}

	fn attach(&self, mut webclient: Webclient) {
		let (selected, displayed) = (self.selected, self.displayed);
		webclient.events_mut().subscribe(move |event| match event {
			Event::ObjectSelected(object) | Event::ObjectRefreshed(object) => {
				selected.set(Some(object.clone()))
			}
			Event::SelectionReset => selected.set(None),
			Event::TopicmapDisplayed(id) => displayed.set(Some(*id)),
			Event::TopicDoubleClicked(id) => debug!("topic {id} double clicked"),
			Event::AssocDoubleClicked(id) => debug!("association {id} double clicked"),
			_ => {}
		});
		*self.webclient.borrow_mut() = Some(webclient);
	}

	/// Carries out what a webclient call asked for.
	pub fn run(&self, tasks: Vec<Task>) {
		for task in tasks {
			match task {
				Task::SetCursor(cursor) => self.cursor.set(cursor),
				Task::Persist(command) => self.execute(command),
			}
		}
		self.sync_topic_layer();
	}

	/// Like [`Self::run`] for calls that can fail. Failures are reported.
	pub fn apply(&self, f: impl FnOnce(&mut Webclient) -> Result<Vec<Task>>) {
		match self.with(f) {
			Some(Ok(tasks)) => self.run(tasks),
			Some(Err(e)) => report(&e),
			None => warn!("topicmap canvas not mounted yet"),
		}
	}

	pub fn gesture(&self, f: impl FnOnce(&mut Webclient) -> Vec<Task>) {
		if let Some(tasks) = self.with(f) {
			self.run(tasks);
		}
	}

	fn execute(&self, command: Command) {
		let this = self.clone();
		spawn_local(async move {
			let outcome = this.service.execute(command.clone()).await;
			this.apply(|wc| wc.on_response(&command, outcome?));
		});
	}

	/// Fetches and displays a topicmap, then selects `selection` on it.
	pub fn load_topicmap(&self, id: Id, selection: Option<ObjectRef>) {
		let this = self.clone();
		spawn_local(async move {
			let loaded = futures::try_join!(
				this.service.fetch_topicmap(id),
				this.service.has_write_permission(id)
			);
			match loaded {
				Ok((data, writable)) => {
					info!("topicmap {id} loaded (writable: {writable})");
					this.with(|wc| wc.display_topicmap(data, writable, selection));
					this.sync_topic_layer();
				}
				Err(e) => report(&e),
			}
		});
	}

	/// Restores a history entry, loading its topicmap first if another one
	/// is displayed.
	pub fn navigate(&self, id: Id, selection: Option<ObjectRef>) {
		let entry = HistoryState::new(id, selection);
		match self.with(|wc| wc.pop_history(&entry)) {
			Some(Ok(true)) => self.sync_topic_layer(),
			Some(Ok(false)) => self.load_topicmap(id, selection),
			Some(Err(e)) => report(&e),
			None => {}
		}
	}

	/// Fetches a topic and reveals it at a canvas position, selected.
	pub fn reveal_topic_at(&self, id: Id, canvas: Point) {
		let this = self.clone();
		spawn_local(async move {
			match this.service.fetch_topic(id).await {
				Ok(topic) => this.apply(|wc| {
					let pos = wc.state().to_topicmap(canvas);
					wc.reveal_topic(topic, Some(pos), true)
				}),
				Err(e) => report(&e),
			}
		});
	}

	/// Fetches the topics of a type, from the configured workspace if there
	/// is one, and reveals them in a grid.
	pub fn reveal_all_of_type(&self, type_uri: &str) {
		let this = self.clone();
		let fetch = match self.settings.workspace_id {
			Some(ws) => self.service.fetch_assigned_topics(ws, type_uri),
			None => self.service.fetch_topics_by_type(type_uri),
		};
		spawn_local(async move {
			match fetch.await {
				Ok(topics) => {
					info!("revealing {} topics in a grid", topics.len());
					this.apply(|wc| wc.reveal_topics_in_grid(topics));
				}
				Err(e) => report(&e),
			}
		});
	}

	fn open_menu(&self, object: ObjectRef, canvas: Point) {
		self.menu.set(Some(ContextMenu {
			object,
			canvas,
			deletable: false,
		}));
		let this = self.clone();
		let id = object.id();
		spawn_local(async move {
			match this.service.has_write_permission(id).await {
				Ok(writable) => {
					this.with(|wc| wc.permissions_mut().insert(id, writable));
					this.menu.update(|menu| {
						if let Some(menu) = menu.as_mut().filter(|m| m.object == object) {
							menu.deletable = writable;
						}
					});
				}
				Err(e) => warn!("permission of {id} unknown: {e}"),
			}
		});
	}

	pub fn menu_command(&self, menu: ContextMenu, item: MenuItem) {
		self.menu.set(None);
		match (item, menu.object) {
			(MenuItem::Associate, ObjectRef::Topic(id)) => {
				self.gesture(|wc| wc.begin_association(id, menu.canvas))
			}
			(MenuItem::Associate, ObjectRef::Assoc(_)) => {}
			(MenuItem::Hide, ObjectRef::Topic(id)) => self.apply(|wc| wc.hide_topic(id)),
			(MenuItem::Hide, ObjectRef::Assoc(id)) => self.apply(|wc| wc.hide_assoc(id)),
			(MenuItem::Delete, ObjectRef::Topic(id)) => self.apply(|wc| wc.delete_topic(id)),
			(MenuItem::Delete, ObjectRef::Assoc(id)) => self.apply(|wc| wc.delete_assoc(id)),
		}
	}

	fn sync_topic_layer(&self) {
		let Some(overlays) = self.with(|wc| {
			let state = wc.state();
			let trans = state.translation();
			state
				.view()
				.topics()
				.filter_map(|tv| {
					tv.dom.clone().map(|html| TopicOverlay {
						id: tv.id,
						pos: tv.pos.offset(trans.x, trans.y),
						html,
					})
				})
				.collect::<Vec<_>>()
		}) else {
			return;
		};
		if self.topic_layer.with_untracked(|current| *current != overlays) {
			self.topic_layer.set(overlays);
		}
	}
}

/// Logs an error and shows it in a blocking notification.
fn report(e: &Error) {
	error!("{e}");
	if let Some(window) = web_sys::window() {
		let _ = window.alert_with_message(&e.to_string());
	}
}

/// Records selection changes as router navigations, so the route the page
/// reads always matches the address bar.
struct BrowserHistory {
	navigate: Box<dyn Fn(&str, NavigateOptions)>,
}

impl HistorySink for BrowserHistory {
	fn push(&mut self, state: &HistoryState) {
		let options = NavigateOptions {
			scroll: false,
			..Default::default()
		};
		(self.navigate)(&state.url(), options);
	}
}

/// Topic id carried by a drop: a topic URL (`.../topic/<id>`) or a bare id.
/// `text/uri-list` wins over `text/plain`.
pub fn parse_drop(uri_list: Option<&str>, text: Option<&str>) -> Result<Id> {
	let payload = uri_list
		.and_then(|list| {
			list.lines()
				.map(str::trim)
				.find(|line| !line.is_empty() && !line.starts_with('#'))
		})
		.or_else(|| text.map(str::trim).filter(|t| !t.is_empty()))
		.ok_or_else(|| Error::UnsupportedDrop("neither text/uri-list nor text/plain data".into()))?;
	let id = match payload.rfind("/topic/") {
		Some(i) => payload[i + "/topic/".len()..]
			.split(['/', '?', '#'])
			.next()
			.unwrap_or_default(),
		None => payload,
	};
	id.parse().map_err(|_| Error::MalformedDrop(payload.to_string()))
}

/// Hands whatever `slot` holds to `release` when the current reactive owner
/// is cleaned up. Window listeners must be detached before their closure drops.
fn release_on_cleanup<T: 'static>(slot: Rc<RefCell<Option<T>>>, release: impl FnOnce(T) + 'static) {
	let release: Box<dyn FnOnce(T)> = Box::new(release);
	let pending = StoredValue::new_local(Some((slot, release)));
	on_cleanup(move || {
		if let Some((slot, release)) = pending.try_update_value(Option::take).flatten() {
			if let Some(value) = slot.borrow_mut().take() {
				release(value);
			}
		}
	});
}

fn container_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|&(w, h)| w > 0.0 && h > 0.0)
		.unwrap_or((800.0, 600.0))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}

/// Client coordinates to canvas coordinates, floored.
fn canvas_pos(canvas_ref: NodeRef<leptos::html::Canvas>, client_x: i32, client_y: i32) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(client_x as f64 - rect.left(), client_y as f64 - rect.top()).floor())
}

fn modifiers(ev: &MouseEvent) -> Modifiers {
	Modifiers {
		shift: ev.shift_key(),
		ctrl: ev.ctrl_key(),
		alt: ev.alt_key(),
	}
}

fn first_touch(ev: &TouchEvent) -> Option<(i32, i32)> {
	let touch = ev.touches().get(0).or_else(|| ev.changed_touches().get(0))?;
	Some((touch.client_x(), touch.client_y()))
}

#[component]
pub fn TopicmapCanvas(
	handle: TopicmapHandle,
	/// Topicmap named by the route; falls back to the configured one.
	#[prop(into)]
	topicmap_id: Signal<Option<Id>>,
	/// Object named by the route.
	#[prop(into)]
	selection: Signal<Option<ObjectRef>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let ready = RwSignal::new(false);
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let socket: Rc<RefCell<Option<(WebSocket, Closure<dyn FnMut(MessageEvent)>)>>> =
		Rc::new(RefCell::new(None));
	let navigate = use_navigate();
	// cleared on unmount; the frame loop and listeners check it
	let alive = Arc::new(AtomicBool::new(true));
	let alive_cleanup = alive.clone();
	on_cleanup(move || alive_cleanup.store(false, Ordering::Relaxed));
	release_on_cleanup(resize_cb.clone(), |cb: Closure<dyn FnMut()>| {
		if let Some(window) = web_sys::window() {
			let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			debug!("resize listener removed");
		}
	});
	let (handle_init, animate_init, resize_cb_init, socket_init) =
		(handle.clone(), animate.clone(), resize_cb.clone(), socket.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if handle_init.with(|_| ()).is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = container_size(&canvas);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		let Some(ctx) = context_2d(&canvas) else {
			error!("canvas has no 2d context");
			return;
		};
		let state = TopicmapState::new(
			handle_init.settings.clone(),
			Box::new(CanvasSurface::new(ctx)),
			w,
			h,
		);
		let history = BrowserHistory {
			navigate: Box::new(navigate.clone()),
		};
		handle_init.attach(Webclient::new(state, Box::new(history)));

		let (handle_resize, canvas_resize, alive_resize) =
			(handle_init.clone(), canvas.clone(), alive.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			if !alive_resize.load(Ordering::Relaxed) {
				return;
			}
			let (nw, nh) = container_size(&canvas_resize);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			handle_resize.with(|wc| wc.state_mut().resize(nw, nh));
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		if let Some(url) = handle_init.settings.websocket_url.clone() {
			match WebSocket::new(&url) {
				Ok(ws) => {
					let handle_ws = handle_init.clone();
					let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
						let Some(text) = ev.data().as_string() else {
							return;
						};
						match PushMessage::from_json(&text) {
							Ok(message) => handle_ws.apply(|wc| wc.handle_push(message).map(|()| Vec::new())),
							Err(e) => warn!("unreadable push message: {e}"),
						}
					});
					ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
					info!("listening for topicmap changes on {url}");
					*socket_init.borrow_mut() = Some((ws, on_message));
				}
				Err(e) => warn!("no push connection to {url}: {e:?}"),
			}
		}

		let (handle_anim, animate_inner, socket_anim, alive_anim) = (
			handle_init.clone(),
			animate_init.clone(),
			socket_init.clone(),
			alive.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if !alive_anim.load(Ordering::Relaxed) {
				if let Some((ws, _)) = socket_anim.borrow().as_ref() {
					let _ = ws.close();
				}
				return;
			}
			if let Some(tasks) = handle_anim.with(Webclient::tick) {
				handle_anim.run(tasks);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(window) = web_sys::window() {
					let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}

		ready.set(true);
	});

	let handle_route = handle.clone();
	Effect::new(move |_| {
		let (id, selection) = (topicmap_id.get(), selection.get());
		if !ready.get() {
			return;
		}
		if let Some(id) = id.or(handle_route.settings.topicmap_id) {
			handle_route.navigate(id, selection);
		}
	});

	let handle_md = handle.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(pos) = canvas_pos(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		handle_md.menu.set(None);
		handle_md.gesture(|wc| wc.pointer_down(pos, ev.button(), modifiers(&ev)));
	};

	let handle_mm = handle.clone();
	let on_mousemove = move |ev: MouseEvent| {
		if let Some(pos) = canvas_pos(canvas_ref, ev.client_x(), ev.client_y()) {
			handle_mm.gesture(|wc| wc.pointer_move(pos));
		}
	};

	let handle_mu = handle.clone();
	let on_mouseup = move |ev: MouseEvent| {
		if let Some(pos) = canvas_pos(canvas_ref, ev.client_x(), ev.client_y()) {
			handle_mu.gesture(|wc| wc.pointer_up(pos));
		}
	};

	// on the canvas itself, so moving onto a topic overlay counts as leaving
	let handle_ml = handle.clone();
	let on_mouseleave = move |ev: MouseEvent| {
		let over_topic = ev
			.related_target()
			.and_then(|target| target.dyn_into::<Element>().ok())
			.and_then(|el| el.closest(".topic").ok().flatten())
			.is_some();
		handle_ml.gesture(|wc| wc.pointer_leave(over_topic));
	};

	let handle_dc = handle.clone();
	let on_dblclick = move |ev: MouseEvent| {
		if let Some(pos) = canvas_pos(canvas_ref, ev.client_x(), ev.client_y()) {
			handle_dc.with(|wc| wc.double_click(pos));
		}
	};

	let handle_cm = handle.clone();
	let on_contextmenu = move |ev: MouseEvent| {
		ev.prevent_default();
		let Some(pos) = canvas_pos(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		match handle_cm.with(|wc| wc.state().object_at(pos)).flatten() {
			Some(object) => handle_cm.open_menu(object, pos),
			None => handle_cm.menu.set(None),
		}
	};

	let handle_ts = handle.clone();
	let on_touchstart = move |ev: TouchEvent| {
		let Some(pos) = first_touch(&ev).and_then(|(x, y)| canvas_pos(canvas_ref, x, y)) else {
			return;
		};
		handle_ts.menu.set(None);
		handle_ts.gesture(|wc| wc.pointer_down(pos, 0, Modifiers::default()));
	};

	let handle_tm = handle.clone();
	let on_touchmove = move |ev: TouchEvent| {
		ev.prevent_default();
		if let Some(pos) = first_touch(&ev).and_then(|(x, y)| canvas_pos(canvas_ref, x, y)) {
			handle_tm.gesture(|wc| wc.pointer_move(pos));
		}
	};

	let handle_te = handle.clone();
	let on_touchend = move |ev: TouchEvent| {
		if let Some(pos) = first_touch(&ev).and_then(|(x, y)| canvas_pos(canvas_ref, x, y)) {
			handle_te.gesture(|wc| wc.pointer_up(pos));
		}
	};

	let on_dragover = move |ev: DragEvent| ev.prevent_default();

	let handle_drop = handle.clone();
	let on_drop = move |ev: DragEvent| {
		ev.prevent_default();
		let Some(pos) = canvas_pos(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		let (uri_list, text) = match ev.data_transfer() {
			Some(data) => (data.get_data("text/uri-list").ok(), data.get_data("text/plain").ok()),
			None => (None, None),
		};
		match parse_drop(uri_list.as_deref(), text.as_deref()) {
			Ok(id) => handle_drop.reveal_topic_at(id, pos),
			Err(e) => report(&e),
		}
	};

	let cursor = handle.cursor;
	let class = move || match cursor.get().class() {
		Some(extra) => format!("topicmap {extra}"),
		None => "topicmap".to_string(),
	};

	let topic_layer = handle.topic_layer;
	let overlays = move || {
		topic_layer
			.get()
			.into_iter()
			.map(|o| {
				view! {
					<div
						class="topic"
						data-id=o.id.to_string()
						style=format!(
							"position: absolute; left: {}px; top: {}px; transform: translate(-50%, -50%);",
							o.pos.x,
							o.pos.y,
						)
						inner_html=o.html
					></div>
				}
			})
			.collect_view()
	};

	let menu = handle.menu;
	let handle_menu = StoredValue::new_local(handle.clone());
	let context_menu = move || {
		menu.get().map(|m| {
			view! {
				<ul
					class="context-menu"
					style=format!("position: absolute; left: {}px; top: {}px;", m.canvas.x, m.canvas.y)
					on:mousedown=|ev: MouseEvent| ev.stop_propagation()
				>
					{m
						.items()
						.into_iter()
						.map(|item| {
							view! {
								<li on:click=move |_| {
									handle_menu.with_value(|h| h.menu_command(m, item))
								}>{item.label()}</li>
							}
						})
						.collect_view()}
				</ul>
			}
		})
	};

	view! {
		<div
			class=class
			style="position: relative; width: 100%; height: 100%; overflow: hidden;"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:dblclick=on_dblclick
			on:contextmenu=on_contextmenu
			on:touchstart=on_touchstart
			on:touchmove=on_touchmove
			on:touchend=on_touchend
			on:dragover=on_dragover
			on:drop=on_drop
		>
			<canvas
				node_ref=canvas_ref
				class="topicmap-canvas"
				style="display: block;"
				on:mouseleave=on_mouseleave
			/>
			<div class="topic-layer" style="position: absolute; left: 0; top: 0;">
				{overlays}
			</div>
			{context_menu}
		</div>
	}
}
