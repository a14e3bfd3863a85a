use slotmap::SlotMap;
use smithay::utils::{Logical, Rectangle};

use crate::control::Error;
use crate::shell::ClientId;
use crate::shell::tree::{Direction, Select, Split, Tree};

fn ids<const N: usize>() -> [ClientId; N] {
    let mut map: SlotMap<ClientId, ()> = SlotMap::with_key();
    [(); N].map(|_| map.insert(()))
}

fn area(w: i32, h: i32) -> Rectangle<i32, Logical> {
    Rectangle::from_size((w, h).into())
}

fn rect(x: i32, y: i32, w: i32, h: i32) -> Rectangle<i32, Logical> {
    Rectangle::new((x, y).into(), (w, h).into())
}

/// root{ c1 | c2 }, both under one vertical split
fn pair() -> (Tree, [ClientId; 2]) {
    let [c1, c2] = ids();
    let mut tree = Tree::default();
    tree.insert(c1, None, Split::Vertical);
    tree.insert(c2, Some(c1), Split::Vertical);
    tree.verify();
    (tree, [c1, c2])
}

/// root{ c1 | { c2 | c3 } }, all vertical splits
fn triple() -> (Tree, [ClientId; 3]) {
    let [c1, c2, c3] = ids();
    let mut tree = Tree::default();
    tree.insert(c1, None, Split::Vertical);
    tree.insert(c2, Some(c1), Split::Vertical);
    tree.insert(c3, Some(c2), Split::Vertical);
    tree.verify();
    (tree, [c1, c2, c3])
}

#[test]
fn first_client_fills_area() {
    let [c1] = ids();
    let mut tree = Tree::default();
    assert!(tree.is_empty());
    tree.insert(c1, None, Split::Vertical);
    tree.verify();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.layout(area(1000, 1000)), vec![(c1, area(1000, 1000))]);
}

#[test]
fn second_client_splits_in_half() {
    let (tree, [c1, c2]) = pair();
    assert_eq!(
        tree.layout(area(1000, 1000)),
        vec![(c1, rect(0, 0, 500, 1000)), (c2, rect(500, 0, 500, 1000))],
    );
}

#[test]
fn horizontal_split_divides_height() {
    let [c1, c2] = ids();
    let mut tree = Tree::default();
    tree.insert(c1, None, Split::Vertical);
    tree.insert(c2, Some(c1), Split::Horizontal);
    assert_eq!(
        tree.layout(area(1000, 1000)),
        vec![(c1, rect(0, 0, 1000, 500)), (c2, rect(0, 500, 1000, 500))],
    );
}

#[test]
fn odd_sizes_never_leave_gaps() {
    let (tree, _) = pair();
    for w in [999, 1001, 333] {
        let rects = tree.layout(area(w, 800));
        assert_eq!(
            rects[0].1.size.w + rects[1].1.size.w,
            w,
            "split must cover the width"
        );
        assert_eq!(rects[1].1.loc.x, rects[0].1.size.w);
    }
}

#[test]
fn clients_iterate_left_to_right() {
    let (tree, [c1, c2, c3]) = triple();
    assert_eq!(tree.clients().collect::<Vec<_>>(), vec![c1, c2, c3]);
}

#[test]
fn sibling_chain_matches_leaf_order() {
    let (tree, [c1, c2, c3]) = triple();
    assert_eq!(tree.sibling_client(c1, Select::Next), Some(c2));
    assert_eq!(tree.sibling_client(c2, Select::Next), Some(c3));
    assert_eq!(tree.sibling_client(c3, Select::Next), None, "walk escapes the root");
    assert_eq!(tree.sibling_client(c3, Select::Prev), Some(c2));
    assert_eq!(tree.sibling_client(c2, Select::Prev), Some(c1));
    assert_eq!(tree.sibling_client(c1, Select::Prev), None);
}

#[test]
fn next_then_prev_returns_to_start() {
    let (tree, clients) = triple();
    for &c in &clients {
        if let Some(next) = tree.sibling_client(c, Select::Next) {
            assert_eq!(tree.sibling_client(next, Select::Prev), Some(c));
        }
    }
}

#[test]
fn nearest_picks_next_for_left_children() {
    let (tree, [c1, c2, c3]) = triple();
    // c1 and c2 sit on the left of their splits, c3 on the right
    assert_eq!(tree.sibling_client(c1, Select::Nearest), Some(c2));
    assert_eq!(tree.sibling_client(c2, Select::Nearest), Some(c3));
    assert_eq!(tree.sibling_client(c3, Select::Nearest), Some(c2));
}

#[test]
fn sibling_of_sole_leaf_is_empty() {
    let [c1] = ids();
    let mut tree = Tree::default();
    tree.insert(c1, None, Split::Vertical);
    for sel in [Select::Prev, Select::Next, Select::Nearest] {
        assert_eq!(tree.sibling_client(c1, sel), None);
    }
}

#[test]
fn remove_last_clears_root() {
    let [c1] = ids();
    let mut tree = Tree::default();
    tree.insert(c1, None, Split::Vertical);
    tree.remove(c1);
    tree.verify();
    assert!(tree.is_empty());
    assert!(tree.layout(area(100, 100)).is_empty());
}

#[test]
fn remove_uplifts_the_sibling() {
    let (mut tree, [c1, c2, c3]) = triple();
    tree.remove(c1);
    tree.verify();
    assert_eq!(
        tree.layout(area(1000, 1000)),
        vec![(c2, rect(0, 0, 500, 1000)), (c3, rect(500, 0, 500, 1000))],
        "the inner split must take the root's place"
    );
}

#[test]
fn remove_middle_leaf_keeps_outer_split() {
    let (mut tree, [c1, c2, c3]) = triple();
    tree.remove(c2);
    tree.verify();
    assert_eq!(
        tree.layout(area(1000, 1000)),
        vec![(c1, rect(0, 0, 500, 1000)), (c3, rect(500, 0, 500, 1000))],
    );
}

#[test]
fn swap_exchanges_leaf_positions() {
    let (mut tree, [c1, c2, c3]) = triple();
    let a = tree.leaf(c1).unwrap();
    let b = tree.leaf(c3).unwrap();
    tree.swap(a, b);
    tree.verify();
    assert_eq!(tree.clients().collect::<Vec<_>>(), vec![c3, c2, c1]);
}

#[test]
fn rotate_toggles_the_axis() {
    let (mut tree, [c1, c2]) = pair();
    tree.rotate(c2).unwrap();
    tree.verify();
    // vertical -> horizontal without swapping children
    assert_eq!(
        tree.layout(area(1000, 1000)),
        vec![(c1, rect(0, 0, 1000, 500)), (c2, rect(0, 500, 1000, 500))],
    );
}

#[test]
fn four_rotations_restore_the_layout() {
    let (mut tree, [c1, c2, c3]) = triple();
    tree.resize(c2, Direction::East, 20).unwrap();
    let before = tree.layout(area(1000, 800));
    for _ in 0..4 {
        tree.rotate(c3).unwrap();
        tree.verify();
    }
    assert_eq!(tree.layout(area(1000, 800)), before);
}

#[test]
fn rotate_without_parent_fails() {
    let [c1] = ids();
    let mut tree = Tree::default();
    tree.insert(c1, None, Split::Vertical);
    assert_eq!(tree.rotate(c1), Err(Error::NotFound));
}

#[test]
fn resize_east_widens_the_left_side() {
    let (mut tree, [c1, c2]) = pair();
    // the divider of the root split borders c2 on its west side
    tree.resize(c2, Direction::East, 10).unwrap();
    tree.verify();
    assert_eq!(
        tree.layout(area(1000, 1000)),
        vec![(c1, rect(0, 0, 600, 1000)), (c2, rect(600, 0, 400, 1000))],
    );
}

#[test]
fn resize_west_narrows_the_left_side() {
    let (mut tree, [c1, c2]) = pair();
    tree.resize(c1, Direction::West, 10).unwrap();
    assert_eq!(
        tree.layout(area(1000, 1000)),
        vec![(c1, rect(0, 0, 400, 1000)), (c2, rect(400, 0, 600, 1000))],
    );
}

#[test]
fn resize_east_then_west_restores_ratios() {
    // the same focus for both calls; the two deltas hit the same split
    let (mut tree, [_, c2]) = pair();
    let before = tree.layout(area(1000, 1000));
    tree.resize(c2, Direction::East, 10).unwrap();
    tree.resize(c2, Direction::West, 10).unwrap();
    assert_eq!(tree.layout(area(1000, 1000)), before);
}

#[test]
fn resize_round_trip_holds_for_every_leaf() {
    let (mut tree, clients) = triple();
    tree.rotate(clients[2]).unwrap(); // mix in a horizontal split
    let before = tree.layout(area(1000, 800));
    for &c in &clients {
        for (fwd, back) in [
            (Direction::East, Direction::West),
            (Direction::South, Direction::North),
        ] {
            if tree.resize(c, fwd, 7).is_ok() {
                tree.resize(c, back, 7).unwrap();
            }
            assert_eq!(tree.layout(area(1000, 800)), before, "{c:?} {fwd:?}");
        }
    }
}

#[test]
fn resize_without_matching_axis_fails() {
    // a vertical pair has no horizontal split to adjust
    let (mut tree, [c1, c2]) = pair();
    for c in [c1, c2] {
        assert_eq!(tree.resize(c, Direction::North, 10), Err(Error::NotFound));
        assert_eq!(tree.resize(c, Direction::South, 10), Err(Error::NotFound));
    }
}

#[test]
fn resize_rejects_ratios_out_of_range() {
    let (mut tree, [_, c2]) = pair();
    assert_eq!(tree.resize(c2, Direction::East, 50), Err(Error::InvalidParam));
    assert_eq!(tree.resize(c2, Direction::East, 99), Err(Error::InvalidParam));
    // the failed attempts must not have moved the ratio
    tree.resize(c2, Direction::East, 49).unwrap();
    tree.verify();
}

#[test]
fn resize_targets_the_nearest_matching_split() {
    let (mut tree, [c1, _, c3]) = triple();
    // c3's divider belongs to the inner split, not the root
    tree.resize(c3, Direction::East, 10).unwrap();
    let rects = tree.layout(area(1000, 1000));
    assert_eq!(rects[0].1.size.w, 500, "root ratio untouched");
    assert_eq!(rects[1].1.size.w, 300);
    assert_eq!(rects[2].1.size.w, 200);

    // c1 sits directly under the root, so its divider is the root's
    tree.resize(c1, Direction::East, 10).unwrap();
    let rects = tree.layout(area(1000, 1000));
    assert_eq!(rects[0].1.size.w, 600);
}
