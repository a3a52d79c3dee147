use super::*;
use crate::components::topicmap::surface::RecordingSurface;

const NO_MODIFIERS: Modifiers = Modifiers {
	shift: false,
	ctrl: false,
	alt: false,
};
const SHIFT: Modifiers = Modifiers {
	shift: true,
	ctrl: false,
	alt: false,
};

fn topic(id: Id) -> Topic {
	Topic::new(id, "dm4.notes.note", format!("Note {id}"))
}

fn assoc(id: Id, t1: Id, t2: Id) -> Association {
	Association::new(
		id,
		"dm4.core.association",
		Role::topic(t1, "dm4.core.default"),
		Role::topic(t2, "dm4.core.default"),
	)
}

fn new_state() -> TopicmapState {
	TopicmapState::with_rng(
		Rc::new(Settings::default()),
		Box::new(RecordingSurface::default()),
		800.0,
		600.0,
		StdRng::seed_from_u64(7),
	)
}

fn state_with(topics: &[(Id, f64, f64)], assocs: &[(Id, Id, Id)], writable: bool) -> TopicmapState {
	let mut tm = Topicmap::new(1, "map", writable);
	for &(id, x, y) in topics {
		tm.add_topic(ViewTopic::new(topic(id), Point::new(x, y), true));
	}
	for &(id, t1, t2) in assocs {
		tm.add_assoc(assoc(id, t1, t2));
	}
	let mut state = new_state();
	state.display(tm);
	state
}

fn persisted(actions: &[Action]) -> Vec<&Command> {
	actions
		.iter()
		.filter_map(|a| match a {
			Action::Persist(cmd) => Some(cmd),
			_ => None,
		})
		.collect()
}

#[test]
fn reveal_on_empty_map_adds_within_visible_canvas() {
	let mut state = state_with(&[], &[], true);
	let op = state.reveal_topic(topic(5), None, false).unwrap();
	assert_eq!(op.kind, RevealKind::Add);
	let pos = state.topicmap().unwrap().topic(5).unwrap().pos;
	assert!((0.0..800.0).contains(&pos.x) && (0.0..600.0).contains(&pos.y), "{pos:?}");
	assert_eq!(pos, pos.floor());
	assert!(state.view().has_topic(5));
}

#[test]
fn reveal_without_topicmap_fails() {
	let mut state = new_state();
	assert!(matches!(
		state.reveal_topic(topic(5), None, false),
		Err(Error::NoTopicmap)
	));
}

#[test]
fn grid_positions_follow_each_other() {
	let mut state = state_with(&[], &[], true);
	state.start_grid_positioning().unwrap();
	for id in 1..=3 {
		state.reveal_topic(topic(id), None, false).unwrap();
	}
	state.stop_grid_positioning();
	let tm = state.topicmap().unwrap();
	let xs: Vec<f64> = (1..=3).map(|id| tm.topic(id).unwrap().pos.x).collect();
	assert_eq!(xs, vec![50.0, 270.0, 490.0]);
}

#[test]
fn topic_drag_commits_one_position_update() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	let mut actions = state.pointer_down(Point::new(100.0, 100.0), 0, NO_MODIFIERS);
	actions.extend(state.pointer_move(Point::new(105.0, 98.0)));
	actions.extend(state.pointer_move(Point::new(110.0, 95.0)));
	// dragging touches the view only
	assert_eq!(state.topicmap().unwrap().topic(1).unwrap().pos, Point::new(100.0, 100.0));
	actions.extend(state.pointer_up(Point::new(110.0, 95.0)));

	let expected = Point::new(110.0, 95.0);
	assert_eq!(
		persisted(&actions),
		vec![&Command::SetTopicPosition {
			topicmap_id: 1,
			topic_id: 1,
			pos: expected,
		}]
	);
	assert!(actions.contains(&Action::TopicMoved { id: 1, pos: expected }));
	assert_eq!(
		actions
			.iter()
			.filter(|a| matches!(a, Action::SetCursor(_)))
			.collect::<Vec<_>>(),
		vec![&Action::SetCursor(Cursor::Moving), &Action::SetCursor(Cursor::Default)]
	);
	assert_eq!(state.topicmap().unwrap().topic(1).unwrap().pos, expected);
	assert_eq!(state.view().topic(1).unwrap().pos, expected);
	assert!(!actions.iter().any(|a| matches!(a, Action::SelectTopic(_))));
}

#[test]
fn click_selects_and_canvas_click_resets() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	state.pointer_down(Point::new(100.0, 100.0), 0, NO_MODIFIERS);
	assert_eq!(state.pointer_up(Point::new(100.0, 100.0)), vec![Action::SelectTopic(1)]);
	state.pointer_down(Point::new(400.0, 400.0), 0, NO_MODIFIERS);
	assert_eq!(state.pointer_up(Point::new(400.0, 400.0)), vec![Action::ResetSelection]);
}

#[test]
fn secondary_button_and_ctrl_click_are_ignored() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	assert!(state.pointer_down(Point::new(100.0, 100.0), 2, NO_MODIFIERS).is_empty());
	let ctrl = Modifiers {
		ctrl: true,
		..NO_MODIFIERS
	};
	assert!(state.pointer_down(Point::new(100.0, 100.0), 0, ctrl).is_empty());
	assert!(state.pointer_up(Point::new(100.0, 100.0)).is_empty());
}

#[test]
fn read_only_map_turns_drag_into_click() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], false);
	state.pointer_down(Point::new(100.0, 100.0), 0, NO_MODIFIERS);
	assert!(state.pointer_move(Point::new(130.0, 130.0)).is_empty());
	assert_eq!(state.view().topic(1).unwrap().pos, Point::new(100.0, 100.0));
	assert_eq!(state.pointer_up(Point::new(130.0, 130.0)), vec![Action::SelectTopic(1)]);
}

#[test]
fn association_onto_same_topic_is_discarded() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	let actions = state.pointer_down(Point::new(100.0, 100.0), 0, SHIFT);
	assert_eq!(
		actions,
		vec![Action::SelectTopic(1), Action::SetCursor(Cursor::Drawing)]
	);
	state.pointer_move(Point::new(140.0, 100.0));
	state.pointer_move(Point::new(101.0, 101.0));
	let actions = state.pointer_up(Point::new(101.0, 101.0));
	assert!(persisted(&actions).is_empty());
	assert_eq!(state.cursor(), Cursor::Default);
}

#[test]
fn association_between_two_topics_is_created() {
	let mut state = state_with(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[], true);
	state.pointer_down(Point::new(100.0, 100.0), 0, SHIFT);
	state.pointer_move(Point::new(300.0, 100.0));
	let actions = state.pointer_up(Point::new(300.0, 100.0));
	let settings = Settings::default();
	assert_eq!(
		persisted(&actions),
		vec![&Command::CreateAssociation(AssociationModel {
			type_uri: settings.default_assoc_type_uri.clone(),
			role_1: Role::topic(1, settings.default_role_type_uri.clone()),
			role_2: Role::topic(2, settings.default_role_type_uri.clone()),
		})]
	);
}

#[test]
fn leaving_onto_a_topic_overlay_still_ends_a_topic_move() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	state.pointer_down(Point::new(100.0, 100.0), 0, NO_MODIFIERS);
	state.pointer_move(Point::new(120.0, 100.0));
	let actions = state.pointer_leave(true);
	assert_eq!(
		persisted(&actions),
		vec![&Command::SetTopicPosition {
			topicmap_id: 1,
			topic_id: 1,
			pos: Point::new(120.0, 100.0),
		}]
	);
	assert_eq!(state.cursor(), Cursor::Default);
	// the release afterwards is not a click
	assert!(state.pointer_up(Point::new(120.0, 100.0)).is_empty());
}

#[test]
fn leaving_the_canvas_cancels_association_draw() {
	let mut state = state_with(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[], true);
	state.begin_association(1, Point::new(100.0, 100.0));

	// onto a topic overlay: still drawing
	assert!(state.pointer_leave(true).is_empty());
	assert_eq!(state.cursor(), Cursor::Drawing);

	let actions = state.pointer_leave(false);
	assert_eq!(actions, vec![Action::SetCursor(Cursor::Default)]);
	// the later release over topic 2 creates nothing
	assert!(state.pointer_up(Point::new(300.0, 100.0)).is_empty());
}

#[test]
fn association_draw_needs_write_permission() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], false);
	let actions = state.pointer_down(Point::new(100.0, 100.0), 0, SHIFT);
	assert_eq!(actions, vec![Action::SelectTopic(1)]);
	assert_eq!(state.cursor(), Cursor::Default);
}

#[test]
fn dragging_an_association_moves_its_cluster() {
	let mut state = state_with(
		&[(1, 0.0, 0.0), (2, 200.0, 0.0), (3, 200.0, 200.0), (4, 600.0, 600.0)],
		&[(10, 1, 2), (11, 2, 3)],
		true,
	);
	state.pointer_down(Point::new(100.0, 0.0), 0, NO_MODIFIERS);
	state.pointer_move(Point::new(110.0, 20.0));
	state.pointer_move(Point::new(120.0, 30.0));
	let actions = state.pointer_up(Point::new(120.0, 30.0));

	let positions = vec![
		(1, Point::new(20.0, 30.0)),
		(2, Point::new(220.0, 30.0)),
		(3, Point::new(220.0, 230.0)),
	];
	assert_eq!(
		persisted(&actions),
		vec![&Command::SetClusterPosition {
			topicmap_id: 1,
			positions: positions.clone(),
		}]
	);
	assert!(actions.contains(&Action::ClusterMoved(vec![1, 2, 3])));
	let tm = state.topicmap().unwrap();
	for (id, pos) in positions {
		assert_eq!(tm.topic(id).unwrap().pos, pos);
	}
	assert_eq!(tm.topic(4).unwrap().pos, Point::new(600.0, 600.0));
}

#[test]
fn canvas_pan_commits_floored_translation() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	state.pointer_down(Point::new(500.0, 500.0), 0, NO_MODIFIERS);
	state.pointer_move(Point::new(510.0, 505.0));
	state.pointer_move(Point::new(520.5, 510.5));
	let actions = state.pointer_up(Point::new(520.5, 510.5));

	let trans = Point::new(20.0, 10.0);
	assert_eq!(
		persisted(&actions),
		vec![&Command::SetTranslation {
			topicmap_id: 1,
			trans,
		}]
	);
	assert!(actions.contains(&Action::CanvasMoved(trans)));
	assert_eq!(state.topicmap().unwrap().translation(), trans);
	assert_eq!(state.to_topicmap(Point::new(120.0, 110.0)), Point::new(100.0, 100.0));
}

#[test]
fn read_only_pan_is_local() {
	let mut state = state_with(&[], &[], false);
	state.pointer_down(Point::new(500.0, 500.0), 0, NO_MODIFIERS);
	state.pointer_move(Point::new(450.0, 500.0));
	let actions = state.pointer_leave(false);
	assert!(persisted(&actions).is_empty());
	assert!(actions.contains(&Action::CanvasMoved(Point::new(-50.0, 0.0))));
}

#[test]
fn removing_the_dragged_topic_drops_the_gesture() {
	let mut state = state_with(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[(10, 1, 2)], true);
	state.pointer_down(Point::new(100.0, 100.0), 0, NO_MODIFIERS);
	state.pointer_move(Point::new(120.0, 100.0));
	assert_eq!(state.remove_topic(1).unwrap(), vec![10]);
	assert!(state.pointer_up(Point::new(120.0, 100.0)).is_empty());
	assert_eq!(state.cursor(), Cursor::Default);
	assert!(state.view().assoc(10).is_none());
}

#[test]
fn hide_topic_removes_its_associations() {
	let mut state = state_with(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[(10, 1, 2)], true);
	assert_eq!(state.hide_topic(1).unwrap(), vec![10]);
	let tm = state.topicmap().unwrap();
	assert!(!tm.topic(1).unwrap().visibility);
	assert!(tm.assoc(10).is_none());
	assert!(!state.view().has_topic(1));
	assert!(matches!(state.hide_topic(9), Err(Error::TopicNotFound(9))));
}

#[test]
fn add_assoc_rejects_missing_player() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	assert!(matches!(
		state.add_assoc(assoc(10, 1, 2)),
		Err(Error::DanglingAssociation {
			assoc: 10,
			player: Player::Topic(2)
		})
	));
	assert!(state.topicmap().unwrap().assoc(10).is_none());
}

#[test]
fn scroll_to_center_ends_with_translation_commit() {
	let mut state = state_with(&[(1, 1000.0, 300.0)], &[], true);
	state.scroll_topic_to_center(1).unwrap();
	assert!(state.is_animating());
	let mut actions = Vec::new();
	for _ in 0..Settings::default().scroll_animation_steps {
		actions.extend(state.tick());
	}
	assert!(!state.is_animating());
	let trans = Point::new(-600.0, 0.0);
	assert_eq!(
		persisted(&actions),
		vec![&Command::SetTranslation {
			topicmap_id: 1,
			trans,
		}]
	);
}

#[test]
fn visible_topic_needs_no_scrolling() {
	let mut state = state_with(&[(1, 100.0, 100.0)], &[], true);
	state.scroll_topic_to_center(1).unwrap();
	assert!(!state.is_animating());
	assert!(state.tick().is_empty());
}
