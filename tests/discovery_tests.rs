//! Integration tests for replay discovery
//!
//! These tests verify:
//! - Recursive scanning of real directory trees
//! - Filtering of merged replays, audio tracks and unrelated files
//! - Ordering by file name and stable ids

mod common;

use common::{temp_root, write_file};
use proptest::prelude::*;
use replay_merger::ReplayId;
use replay_merger::services::{discover, is_unprocessed_replay};

#[test]
fn test_discovers_nested_replays_sorted_by_name() {
    let (_temp_dir, root) = temp_root();

    write_file(&root.join("zeta_replay_1.mp4"), b"z");
    write_file(&root.join("Apex/alpha_replay_2.mp4"), b"a");
    write_file(&root.join("Apex/Season 3/mid_replay_3.mp4"), b"m");

    let replays = discover(&root);
    let names: Vec<&str> = replays.iter().map(|r| r.file_name()).collect();

    assert_eq!(
        names,
        vec!["alpha_replay_2.mp4", "mid_replay_3.mp4", "zeta_replay_1.mp4"]
    );
    assert_eq!(replays[0].parent_name(), Some("Apex"));
    assert_eq!(replays[1].parent_name(), Some("Season 3"));
}

#[test]
fn test_skips_processed_and_unrelated_files() {
    let (_temp_dir, root) = temp_root();

    write_file(&root.join("game_replay_1.mp4"), b"v");
    write_file(&root.join("game_replay_1.m4a"), b"a");
    write_file(&root.join("game_replay_1_merged.mp4"), b"done");
    write_file(&root.join("replays_merged/game_replay_0_merged.mp4"), b"done");
    write_file(&root.join("gameplay.mp4"), b"no marker");
    write_file(&root.join("notes_replay_.txt"), b"text");
    write_file(&root.join("LOUD_REPLAY_1.MP4"), b"wrong case");

    let replays = discover(&root);

    assert_eq!(replays.len(), 1);
    assert_eq!(replays[0].file_name(), "game_replay_1.mp4");
}

#[test]
fn test_directories_named_like_replays_are_ignored() {
    let (_temp_dir, root) = temp_root();

    std::fs::create_dir_all(root.join("odd_replay_dir.mp4")).unwrap();
    write_file(&root.join("odd_replay_dir.mp4/inner_replay_1.mp4"), b"v");

    let replays = discover(&root);

    assert_eq!(replays.len(), 1);
    assert_eq!(replays[0].file_name(), "inner_replay_1.mp4");
}

#[test]
fn test_ids_follow_sorted_order_and_duplicates_are_kept() {
    let (_temp_dir, root) = temp_root();

    write_file(&root.join("A/same_replay_1.mp4"), b"a");
    write_file(&root.join("B/same_replay_1.mp4"), b"b");
    write_file(&root.join("first_replay_0.mp4"), b"f");

    let replays = discover(&root);

    assert_eq!(replays.len(), 3);
    for (index, replay) in replays.iter().enumerate() {
        assert_eq!(replay.id, ReplayId(index));
    }
    assert_eq!(replays[0].file_name(), "first_replay_0.mp4");
    assert_ne!(replays[1].path, replays[2].path);
}

#[test]
fn test_rescan_is_deterministic() {
    let (_temp_dir, root) = temp_root();

    for name in ["c_replay_3.mp4", "a_replay_1.mp4", "Sub/b_replay_2.mp4"] {
        write_file(&root.join(name), b"x");
    }

    let first = discover(&root);
    let second = discover(&root);
    assert_eq!(first, second);

    // Nothing is cached: new files show up on the next scan
    write_file(&root.join("d_replay_4.mp4"), b"x");
    assert_eq!(discover(&root).len(), 4);
}

#[test]
fn test_empty_or_missing_root_yields_nothing() {
    let (_temp_dir, root) = temp_root();

    assert!(discover(&root).is_empty());
    assert!(discover(&root.join("does-not-exist")).is_empty());
}

proptest! {
    #[test]
    fn test_merged_names_never_match(stem in "[a-z_]{0,12}", tail in "[a-z0-9_]{0,12}") {
        let name = format!("{}_replay_{}_merged.mp4", stem, tail);
        prop_assert!(!is_unprocessed_replay(&name));
    }

    #[test]
    fn test_replay_names_match(stem in "[a-z]{1,12}", tail in "[0-9]{1,8}") {
        let name = format!("{}_replay_{}.mp4", stem, tail);
        prop_assert!(is_unprocessed_replay(&name));
    }

    #[test]
    fn test_other_extensions_never_match(
        stem in "[a-z_]{0,12}",
        ext in "(m4a|mkv|mov|txt|mp4\\.bak)",
    ) {
        let name = format!("{}_replay_1.{}", stem, ext);
        prop_assert!(!is_unprocessed_replay(&name));
    }
}
