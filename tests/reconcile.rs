mod common;

use common::{canvas, canvas_with_loader, init_tracing, layout, members, settle, square_png};
use crossbeam_channel::{Receiver, Sender};
use roster_engine::node::image::AvatarContent;
use roster_engine::node::TextNode;
use roster_engine::surface::SvgSurface;
use roster_engine::{AvatarLoader, CanvasConfig, LoadMode, Member, NodeId, RosterCanvas};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Holds "slow" URLs until released; everything else loads at once.
struct GatedLoader {
    started: Sender<()>,
    release: Receiver<()>,
    finished: Sender<()>,
}

impl AvatarLoader for GatedLoader {
    fn load_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        if !url.contains("slow") {
            return square_png(5);
        }
        self.started.send(())?;
        self.release.recv_timeout(Duration::from_secs(10))?;
        let bytes = square_png(3);
        self.finished.send(())?;
        bytes
    }
}

fn avatar_side(canvas: &RosterCanvas<SvgSurface>, node: NodeId) -> Option<u32> {
    match &canvas.scene().card(node)?.avatar()?.content {
        AvatarContent::Image(image) => Some(image.width),
        AvatarContent::Placeholder { .. } => None,
    }
}

#[test]
fn empty_scene_gets_cards_in_username_order() {
    init_tracing();
    let (mut canvas, _) = canvas();

    let added = canvas.render_members(&members(&["b", "a"]));
    assert_eq!(added.len(), 2);
    settle(&mut canvas);

    assert_eq!(
        layout(&canvas),
        vec![
            ("a".to_string(), 32.0, 32.0, 1.0),
            ("b".to_string(), 32.0, 148.0, 1.0),
        ]
    );
}

#[test]
fn new_cards_start_hidden_and_wait_for_avatar() {
    init_tracing();
    let (mut canvas, _) = canvas();
    let added = canvas.render_members(&members(&["octocat"]));

    let node = canvas.scene().get_node(added[0]).unwrap();
    assert_eq!(node.placement.opacity, 0.0);
    assert_eq!(node.placement.left, 0.0);
    assert_eq!(node.placement.top, 32.0);
    assert!(canvas.scene().card(added[0]).unwrap().avatar().is_none());

    canvas.advance(16.0);
    assert!(canvas.scene().card(added[0]).unwrap().avatar().is_some());
}

#[test]
fn shrinking_list_exits_and_resorts() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["a", "b", "c"]));
    settle(&mut canvas);
    let b = canvas.scene().find_card("b").unwrap();

    let added = canvas.render_members(&members(&["a", "c"]));
    assert!(added.is_empty());

    canvas.advance(16.0);
    let exiting = canvas.scene().get_node(b).unwrap().placement;
    assert!(exiting.opacity < 1.0);
    assert!(exiting.left < 32.0);

    settle(&mut canvas);
    assert!(canvas.scene().find_card("b").is_none());
    assert_eq!(
        layout(&canvas),
        vec![
            ("a".to_string(), 32.0, 32.0, 1.0),
            ("c".to_string(), 32.0, 148.0, 1.0),
        ]
    );
}

#[test]
fn reconcile_is_idempotent() {
    init_tracing();
    let (mut canvas, _) = canvas();
    let list = members(&["zed", "Amy", "bob"]);
    canvas.render_members(&list);
    settle(&mut canvas);
    let before = layout(&canvas);

    let added = canvas.render_members(&list);
    assert!(added.is_empty());
    settle(&mut canvas);

    assert_eq!(layout(&canvas), before);
    assert_eq!(canvas.scene().len(), 3);
}

#[test]
fn rendered_set_matches_desired_set() {
    init_tracing();
    let (mut canvas, _) = canvas();
    let lists = [
        vec!["a", "b", "c", "d"],
        vec!["d", "e"],
        vec![],
        vec!["x", "a", "e"],
    ];
    for list in lists {
        canvas.render_members(&members(&list));
        settle(&mut canvas);

        let mut shown: Vec<String> = layout(&canvas).into_iter().map(|c| c.0).collect();
        shown.sort();
        let mut expected: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(shown, expected);
    }
}

#[test]
fn stable_layout_is_rank_based() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["delta", "Alpha", "charlie", "bravo", "_echo", "9lives"]));
    settle(&mut canvas);

    let cards = layout(&canvas);
    let names: Vec<&str> = cards.iter().map(|c| c.0.as_str()).collect();
    assert_eq!(names, vec!["_echo", "9lives", "Alpha", "bravo", "charlie", "delta"]);
    for (rank, (_, left, top, _)) in cards.iter().enumerate() {
        assert_eq!(*left, 32.0);
        assert_eq!(*top, rank as f32 * 116.0 + 32.0);
    }
}

#[test]
fn failed_avatar_falls_back_to_placeholder() {
    init_tracing();
    let (mut canvas, _) = canvas();
    let member = Member::new("ghost").with_avatar("missing.png");
    let added = canvas.render_members(&[member]);
    settle(&mut canvas);

    let card = canvas.scene().card(added[0]).unwrap();
    assert!(card.avatar().unwrap().content.is_placeholder());
    assert_eq!(canvas.scene().get_node(added[0]).unwrap().placement.opacity, 1.0);
}

#[test]
fn removing_a_loading_card_runs_hook_once() {
    init_tracing();
    let (mut canvas, _) = canvas();
    let added = canvas.render_members(&members(&["fleeting"]));
    let done = Rc::new(RefCell::new(Vec::new()));
    let log = done.clone();

    assert!(canvas.remove_with_animation(added[0], Some(Box::new(move |id| log.borrow_mut().push(id)))));
    assert!(!canvas.remove_with_animation(added[0], None));
    settle(&mut canvas);

    assert_eq!(*done.borrow(), vec![added[0]]);
    assert!(canvas.scene().is_empty());
    assert_eq!(canvas.pending_avatars(), 0);
}

#[test]
fn exiting_card_wanted_again_is_revived() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["a", "b"]));
    settle(&mut canvas);
    let b = canvas.scene().find_card("b").unwrap();

    canvas.render_members(&members(&["a"]));
    for _ in 0..5 {
        canvas.advance(16.0);
    }
    let added = canvas.render_members(&members(&["a", "b"]));
    assert!(added.is_empty());
    settle(&mut canvas);

    assert_eq!(canvas.scene().find_card("b"), Some(b));
    assert_eq!(
        layout(&canvas),
        vec![
            ("a".to_string(), 32.0, 32.0, 1.0),
            ("b".to_string(), 32.0, 148.0, 1.0),
        ]
    );
}

#[test]
fn decorations_are_not_reconciled() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.add_decoration(Box::new(TextNode::new("Members", 0.0, 0.0)), 32.0, 8.0);
    canvas.render_members(&members(&["a"]));
    settle(&mut canvas);
    canvas.render_members(&[]);
    settle(&mut canvas);

    assert_eq!(canvas.scene().len(), 1);
    assert!(canvas.scene().cards().next().is_none());
}

#[test]
fn late_avatar_never_lands_on_a_card_reusing_the_slot() {
    init_tracing();
    let (started_tx, started_rx) = crossbeam_channel::unbounded();
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    let (finished_tx, finished_rx) = crossbeam_channel::unbounded();
    let loader = Arc::new(GatedLoader {
        started: started_tx,
        release: release_rx,
        finished: finished_tx,
    });
    let (mut canvas, _) = canvas_with_loader(
        CanvasConfig {
            load_mode: LoadMode::Background,
            ..CanvasConfig::default()
        },
        loader,
    );

    let first = canvas.render_members(&[Member::new("alpha").with_avatar("slow.png")])[0];
    assert_eq!(canvas.pending_avatars(), 1);
    // the load is in flight, blocked inside the loader
    started_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(canvas.remove_with_animation(first, None));
    for _ in 0..200 {
        if canvas.scene().get_node(first).is_none() {
            break;
        }
        canvas.advance(16.0);
    }
    assert!(canvas.scene().is_empty());
    assert_eq!(canvas.pending_avatars(), 0);

    let second = canvas.render_members(&[Member::new("bravo").with_avatar("fast.png")])[0];
    assert_eq!(second, first, "arena slot should be reused");

    release_tx.send(()).unwrap();
    finished_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    settle(&mut canvas);
    for _ in 0..5 {
        canvas.advance(16.0);
    }

    assert_eq!(canvas.scene().card(second).unwrap().username(), "bravo");
    assert_eq!(avatar_side(&canvas, second), Some(5));
}

#[test]
fn accented_and_punctuated_names_follow_collation_rank() {
    init_tracing();
    let (mut canvas, _) = canvas();
    canvas.render_members(&members(&["frank", "-dash", "émile", "_under", "Zoë"]));
    settle(&mut canvas);

    let names: Vec<String> = layout(&canvas).into_iter().map(|c| c.0).collect();
    assert_eq!(names, vec!["_under", "-dash", "émile", "frank", "Zoë"]);
}
