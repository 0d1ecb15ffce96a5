mod common;

use common::{canvas, init_tracing, members, settle};
use roster_engine::{BrowsingContext, CanvasAction, Modifiers, PointerEvent};

fn navigations(actions: &[CanvasAction]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            CanvasAction::Navigate { url, target } => {
                assert_eq!(*target, BrowsingContext::NewTab);
                Some(url.clone())
            }
            _ => None,
        })
        .collect()
}

#[test]
fn click_navigates_to_member_url() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);

    // card occupies (32, 32)..(272, 132)
    assert!(canvas.pointer_down(PointerEvent::new(100.0, 80.0)).is_empty());
    let actions = canvas.pointer_up(PointerEvent::new(100.0, 80.0));
    assert_eq!(navigations(&actions), vec!["https://github.com/octocat"]);
}

#[test]
fn drag_moves_card_without_navigating() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);
    let node = canvas.scene().find_card("octocat").unwrap();
    let refreshes = canvas.surface().stats().cache_refreshes;

    canvas.pointer_down(PointerEvent::new(100.0, 80.0));
    canvas.pointer_move(PointerEvent::new(400.0, 300.0));
    assert!(canvas.scene().card(node).unwrap().is_dragged());

    canvas.advance(16.0);
    assert!(canvas.surface().stats().cache_refreshes > refreshes);

    let actions = canvas.pointer_up(PointerEvent::new(400.0, 300.0));
    assert!(navigations(&actions).is_empty());
    let card = canvas.scene().card(node).unwrap();
    assert!(!card.is_dragged());
    assert!(!card.is_mousedown());

    settle(&mut canvas);
    let placement = canvas.scene().get_node(node).unwrap().placement;
    assert_eq!((placement.left, placement.top), (400.0, 300.0));
}

#[test]
fn zero_displacement_move_still_clicks() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);

    canvas.pointer_down(PointerEvent::new(100.0, 80.0));
    canvas.pointer_move(PointerEvent::new(100.0, 80.0));
    let actions = canvas.pointer_up(PointerEvent::new(100.0, 80.0));
    assert_eq!(navigations(&actions).len(), 1);
}

#[test]
fn hover_draws_border_and_leave_clears_it() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);
    let node = canvas.scene().find_card("octocat").unwrap();

    canvas.pointer_move(PointerEvent::new(100.0, 80.0));
    assert_eq!(canvas.hovered(), Some(node));
    assert!(canvas.scene().card(node).unwrap().container().has_stroke());

    canvas.advance(16.0);
    let frame = canvas.surface().last_frame().unwrap();
    assert!(frame.contains(r#"stroke="rgb(132,163,140)""#));

    canvas.pointer_move(PointerEvent::new(600.0, 600.0));
    assert_eq!(canvas.hovered(), None);
    assert!(!canvas.scene().card(node).unwrap().container().has_stroke());
}

#[test]
fn pan_modifier_suppresses_card_interaction() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);
    let node = canvas.scene().find_card("octocat").unwrap();
    let alt = Modifiers::alt();

    canvas.pointer_move(PointerEvent::new(100.0, 80.0).with_modifiers(alt));
    assert!(!canvas.scene().card(node).unwrap().is_hovered());

    canvas.pointer_down(PointerEvent::new(100.0, 80.0).with_modifiers(alt));
    assert!(canvas.is_panning());
    assert!(!canvas.scene().card(node).unwrap().is_mousedown());

    canvas.pointer_move(PointerEvent::new(150.0, 80.0).with_modifiers(alt));
    let actions = canvas.pointer_up(PointerEvent::new(150.0, 80.0).with_modifiers(alt));
    assert!(actions.is_empty());
    assert_eq!(canvas.viewport().translation.x, 50.0);

    // the card moved with the viewport, not with the pointer
    let placement = canvas.scene().get_node(node).unwrap().placement;
    assert_eq!((placement.left, placement.top), (32.0, 32.0));
}

#[test]
fn hit_testing_follows_the_viewport() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);

    canvas.zoom_to(0.0, 0.0, 2.0);
    // scene (100, 80) is now at screen (200, 160)
    canvas.pointer_down(PointerEvent::new(200.0, 160.0));
    let actions = canvas.pointer_up(PointerEvent::new(200.0, 160.0));
    assert_eq!(navigations(&actions).len(), 1);

    // scene (300, 80) is outside the card
    canvas.pointer_down(PointerEvent::new(600.0, 160.0));
    assert!(canvas.pointer_up(PointerEvent::new(600.0, 160.0)).is_empty());
}

#[test]
fn exiting_cards_stop_receiving_events_once_detached() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);

    canvas.pointer_move(PointerEvent::new(100.0, 80.0));
    canvas.render_members(&[]);
    settle(&mut canvas);

    assert_eq!(canvas.hovered(), None);
    canvas.pointer_down(PointerEvent::new(100.0, 80.0));
    assert!(canvas.pointer_up(PointerEvent::new(100.0, 80.0)).is_empty());
}

#[test]
fn release_over_card_after_press_on_empty_space_navigates() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["octocat"]));
    settle(&mut canvas);

    canvas.pointer_down(PointerEvent::new(600.0, 600.0));
    let actions = canvas.pointer_up(PointerEvent::new(100.0, 80.0));
    assert_eq!(navigations(&actions), vec!["https://github.com/octocat"]);
}
