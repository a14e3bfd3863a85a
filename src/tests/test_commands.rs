use super::Fixture;
use crate::config::BORDER_WIDTH;
use crate::control::{Error, command::Command};
use crate::shell::ClientId;
use crate::shell::tree::{Direction, Select};
use smithay::utils::{Logical, Rectangle};

fn rect(x: i32, y: i32, w: i32, h: i32) -> Rectangle<i32, Logical> {
    Rectangle::new((x, y).into(), (w, h).into())
}

fn open_window(f: &mut Fixture, c: usize) -> ClientId {
    let w = f.client_mut(c).create_window();
    f.client_mut(c).commit(w);
    f.roundtrip(c);
    f.client_mut(c).ack_and_commit(w);
    f.roundtrip(c);
    f.tb.state.find_focus().expect("mapped window takes focus")
}

fn boxes(f: &Fixture, ids: &[ClientId]) -> Vec<Rectangle<i32, Logical>> {
    ids.iter().map(|&id| f.tb.state.clients[id].rect).collect()
}

#[test]
fn client_focus_walks_siblings() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);
    let c2 = open_window(&mut f, c);
    let c3 = open_window(&mut f, c);

    f.execute(Command::ClientFocus(Select::Prev)).unwrap();
    assert_eq!(f.tb.state.find_focus(), Some(c2));
    f.execute(Command::ClientFocus(Select::Prev)).unwrap();
    assert_eq!(f.tb.state.find_focus(), Some(c1));
    assert_eq!(
        f.execute(Command::ClientFocus(Select::Prev)),
        Err(Error::NotFound),
        "the walk escapes the root at the first leaf"
    );
    f.execute(Command::ClientFocus(Select::Next)).unwrap();
    f.execute(Command::ClientFocus(Select::Next)).unwrap();
    assert_eq!(f.tb.state.find_focus(), Some(c3));
    f.tb.state.verify();
}

#[test]
fn resize_east_moves_the_divider_east() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);
    let c2 = open_window(&mut f, c);

    f.execute(Command::ClientResize(Direction::East, 10)).unwrap();
    assert_eq!(
        boxes(&f, &[c1, c2]),
        vec![rect(0, 0, 600, 1000), rect(600, 0, 400, 1000)],
    );
    f.tb.state.verify();
}

#[test]
fn resize_east_then_west_restores_the_boxes() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);
    let c2 = open_window(&mut f, c);
    let before = boxes(&f, &[c1, c2]);

    // focus stays on c2 for both calls
    f.execute(Command::ClientResize(Direction::East, 10)).unwrap();
    f.execute(Command::ClientResize(Direction::West, 10)).unwrap();
    assert_eq!(f.tb.state.find_focus(), Some(c2));
    assert_eq!(boxes(&f, &[c1, c2]), before);
}

#[test]
fn resize_out_of_range_changes_nothing() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);
    let c2 = open_window(&mut f, c);
    let before = boxes(&f, &[c1, c2]);

    assert_eq!(
        f.execute(Command::ClientResize(Direction::East, 50)),
        Err(Error::InvalidParam),
    );
    assert_eq!(boxes(&f, &[c1, c2]), before);
}

#[test]
fn rotate_turns_the_split_horizontal() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);
    let c2 = open_window(&mut f, c);

    f.execute(Command::TreeRotate).unwrap();
    assert_eq!(
        boxes(&f, &[c1, c2]),
        vec![rect(0, 0, 1000, 500), rect(0, 500, 1000, 500)],
    );

    for _ in 0..3 {
        f.execute(Command::TreeRotate).unwrap();
    }
    assert_eq!(
        boxes(&f, &[c1, c2]),
        vec![rect(0, 0, 500, 1000), rect(500, 0, 500, 1000)],
        "four rotations must cycle back"
    );
    f.tb.state.verify();
}

#[test]
fn swap_exchanges_the_leaves_and_keeps_focus() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);
    let c2 = open_window(&mut f, c);

    f.execute(Command::ClientSwap(Select::Prev)).unwrap();
    assert_eq!(
        boxes(&f, &[c2, c1]),
        vec![rect(0, 0, 500, 1000), rect(500, 0, 500, 1000)],
    );
    assert_eq!(f.tb.state.find_focus(), Some(c2), "focus follows the client");
    f.tb.state.verify();
}

#[test]
fn move_client_to_sibling_desktop() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);
    let c2 = open_window(&mut f, c);
    let c3 = open_window(&mut f, c);

    let first = f.tb.state.focused_desktop();
    f.execute(Command::DesktopNew).unwrap();
    let second = f.tb.state.focused_desktop();
    assert_ne!(first, second);
    f.execute(Command::DesktopFocus(Select::Prev)).unwrap();
    assert_eq!(f.tb.state.focused_desktop(), first);
    assert_eq!(f.tb.state.find_focus(), Some(c3));

    f.execute(Command::ClientFocus(Select::Prev)).unwrap();
    assert_eq!(f.tb.state.find_focus(), Some(c2));

    f.execute(Command::ClientToDesktop(Select::Next)).unwrap();

    let d1 = &f.tb.state.desktops[first];
    assert_eq!(d1.tree.clients().collect::<Vec<_>>(), vec![c1, c3]);
    let d2 = &f.tb.state.desktops[second];
    assert_eq!(d2.tree.clients().collect::<Vec<_>>(), vec![c2]);
    assert_eq!(d2.focus, Some(c2));
    // the nearest sibling of the removed focus inherits input focus
    assert_eq!(f.tb.state.find_focus(), Some(c3));
    f.tb.state.verify();
}

#[test]
fn desktop_new_then_kill_is_a_no_op() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);

    let before = f.tb.state.screen().desktops.clone();
    f.execute(Command::DesktopNew).unwrap();
    assert_eq!(f.tb.state.screen().desktops.len(), 2);
    assert_eq!(f.tb.state.find_focus(), None, "new desktops start empty");

    f.execute(Command::DesktopKill).unwrap();
    assert_eq!(f.tb.state.screen().desktops, before);
    assert_eq!(f.tb.state.find_focus(), Some(c1));
    f.tb.state.verify();
}

#[test]
fn desktop_kill_needs_a_sibling_and_an_empty_tree() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let _ = open_window(&mut f, c);

    assert_eq!(
        f.execute(Command::DesktopKill),
        Err(Error::NotFound),
        "the last desktop of a screen cannot be killed"
    );

    f.execute(Command::DesktopNew).unwrap();
    f.execute(Command::DesktopFocus(Select::Prev)).unwrap();
    assert_eq!(
        f.execute(Command::DesktopKill),
        Err(Error::NotEmpty),
        "a desktop with clients cannot be killed"
    );
    f.tb.state.verify();
}

#[test]
fn desktop_swap_reorders_the_list() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);

    let first = f.tb.state.focused_desktop();
    f.execute(Command::DesktopNew).unwrap();
    let second = f.tb.state.focused_desktop();
    f.execute(Command::DesktopFocus(Select::Prev)).unwrap();

    f.execute(Command::DesktopSwap(Select::Next)).unwrap();
    assert_eq!(f.tb.state.screen().desktops, vec![second, first]);
    assert_eq!(f.tb.state.focused_desktop(), first, "focus follows the desktop");
    assert_eq!(f.tb.state.find_focus(), Some(c1));
    f.tb.state.verify();
}

#[test]
fn focus_change_leaves_fullscreen() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let _ = open_window(&mut f, c);
    let _ = open_window(&mut f, c);

    f.execute(Command::ClientFullscreen).unwrap();
    let desktop = f.tb.state.focused_desktop();
    assert!(f.tb.state.desktops[desktop].fullscreen);

    f.execute(Command::ClientFocus(Select::Prev)).unwrap();
    assert!(
        !f.tb.state.desktops[desktop].fullscreen,
        "a focus switch drops fullscreen"
    );
    f.tb.state.verify();
}

#[test]
fn new_client_leaves_fullscreen() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let _ = open_window(&mut f, c);

    f.execute(Command::ClientFullscreen).unwrap();
    let desktop = f.tb.state.focused_desktop();
    assert!(f.tb.state.desktops[desktop].fullscreen);

    let _ = open_window(&mut f, c);
    assert!(!f.tb.state.desktops[desktop].fullscreen);
    f.tb.state.verify();
}

#[test]
fn fullscreen_requires_a_focus() {
    let mut f = Fixture::new();
    assert_eq!(f.execute(Command::ClientFullscreen), Err(Error::NotFound));
}

#[test]
fn commands_without_clients_fail_cleanly() {
    let mut f = Fixture::new();
    for command in [
        Command::ClientFocus(Select::Next),
        Command::ClientKill,
        Command::ClientResize(Direction::East, 10),
        Command::ClientSwap(Select::Next),
        Command::ClientToDesktop(Select::Next),
        Command::ClientToScreen(Select::Next),
        Command::TreeRotate,
    ] {
        assert_eq!(f.execute(command), Err(Error::NotFound));
    }
    f.tb.state.verify();
}

#[test]
fn move_client_to_sibling_screen() {
    let mut f = Fixture::new();
    f.add_output("test-1", 800, 600);
    let c = f.add_client();
    let c1 = open_window(&mut f, c);

    f.execute(Command::ClientToScreen(Select::Next)).unwrap();
    f.roundtrip(c);

    assert_eq!(f.tb.state.find_focus(), None, "origin desktop is empty now");
    let target = f.tb.state.screens[1].active_desktop();
    assert_eq!(
        f.tb.state.desktops[target].tree.clients().collect::<Vec<_>>(),
        vec![c1]
    );
    assert_eq!(
        f.tb.state.clients[c1].rect,
        rect(0, 0, 800, 600),
        "the client fills the new screen"
    );
    assert_eq!(f.tb.state.clients[c1].border, BORDER_WIDTH);

    f.execute(Command::ScreenFocus(Select::Next)).unwrap();
    assert_eq!(f.tb.state.active_screen, 1);
    assert_eq!(f.tb.state.find_focus(), Some(c1));
    f.tb.state.verify();
}

#[test]
fn screen_focus_without_sibling_fails() {
    let mut f = Fixture::new();
    assert_eq!(
        f.execute(Command::ScreenFocus(Select::Next)),
        Err(Error::NotFound)
    );
}

#[test]
fn screen_scale_shrinks_the_logical_size() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let c1 = open_window(&mut f, c);

    f.execute(Command::ScreenScale {
        screen: "test-0".into(),
        scale: 200,
    })
    .unwrap();

    assert_eq!(f.tb.state.screen().size, (500, 500).into());
    assert_eq!(f.tb.state.clients[c1].rect, rect(0, 0, 500, 500));

    for scale in [0, 10_000] {
        assert_eq!(
            f.execute(Command::ScreenScale {
                screen: "test-0".into(),
                scale,
            }),
            Err(Error::InvalidParam)
        );
    }
    f.tb.state.verify();
}

#[test]
fn screen_mode_must_match_an_advertised_mode() {
    let mut f = Fixture::new();
    assert_eq!(
        f.execute(Command::ScreenMode {
            screen: "test-0".into(),
            width: 640,
            height: 480,
            refresh: 60_000,
        }),
        Err(Error::InvalidParam)
    );
    assert_eq!(
        f.execute(Command::ScreenMode {
            screen: "nope".into(),
            width: 1000,
            height: 1000,
            refresh: 60_000,
        }),
        Err(Error::NotFound)
    );
    f.execute(Command::ScreenMode {
        screen: "test-0".into(),
        width: 1000,
        height: 1000,
        refresh: 60_000,
    })
    .unwrap();
    assert_eq!(f.tb.state.screen().size, (1000, 1000).into());
}

#[test]
fn binding_add_replaces_duplicates() {
    use crate::input::{Binding, Mods};

    let mut f = Fixture::new();
    let binding = Binding {
        mods: Mods {
            logo: true,
            ..Default::default()
        },
        keysym: 0xff0d, // Return
    };
    f.execute(Command::BindingAdd {
        binding,
        command: "foot".into(),
    })
    .unwrap();
    f.execute(Command::BindingAdd {
        binding,
        command: "alacritty".into(),
    })
    .unwrap();

    assert_eq!(f.tb.state.bindings.len(), 1);
    assert_eq!(f.tb.state.bindings[&binding], "alacritty");
}

#[test]
fn state_query_describes_the_layout() {
    let mut f = Fixture::new();
    let c = f.add_client();
    let _ = open_window(&mut f, c);
    let _ = open_window(&mut f, c);

    let lines = f.execute(Command::StateQuery).unwrap();
    assert_eq!(lines[0], "screens:");
    assert!(lines.iter().any(|l| l == "- name: test-0"));
    assert!(lines.iter().any(|l| l == "  selected: true"));
    assert!(
        lines
            .iter()
            .any(|l| l == "      geom: {x: 500, y: 0, width: 500, height: 1000}")
    );
}

#[test]
fn screen_destroy_migrates_desktops() {
    let mut f = Fixture::new();
    f.add_output("test-1", 800, 600);
    let c = f.add_client();
    let c1 = open_window(&mut f, c);

    let migrated = f.tb.state.screens[0].desktops.clone();
    assert!(f.tb.state.remove_screen(0), "a sibling screen remains");
    assert_eq!(f.tb.state.screens.len(), 1);
    let desktops = &f.tb.state.screens[0].desktops;
    assert!(migrated.iter().all(|d| desktops.contains(d)));
    assert_eq!(
        f.tb.state.clients[c1].rect,
        rect(0, 0, 800, 600),
        "migrated desktops are laid out for the new screen"
    );
    f.tb.state.verify();

    assert!(!f.tb.state.remove_screen(0), "the last screen requests a stop");
    assert!(f.tb.state.clients.is_empty());
}
