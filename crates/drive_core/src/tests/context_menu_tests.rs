use super::*;

use shared::domain::{DirectoryId, FileId, TempId};

fn file(id: &str) -> ItemRef {
    ItemRef::File(FileId::new(id))
}

fn dir(id: &str) -> ItemRef {
    ItemRef::Directory(DirectoryId::new(id))
}

#[test]
fn opening_second_menu_leaves_exactly_one_open() {
    let mut menu = ContextMenuController::new();
    menu.open(file("x"));
    menu.open(file("y"));

    assert_eq!(menu.open_item(), Some(&file("y")));
    assert!(!menu.is_open(&file("x")));
}

#[test]
fn toggle_closes_same_item_and_switches_between_items() {
    let mut menu = ContextMenuController::new();
    assert!(menu.toggle(dir("a")).is_some());
    assert!(menu.toggle(file("b")).is_some());
    assert_eq!(menu.open_item(), Some(&file("b")));

    assert!(menu.toggle(file("b")).is_none());
    assert_eq!(menu.open_item(), None);
}

#[test]
fn outside_pointer_dismisses_but_menu_region_does_not() {
    let mut menu = ContextMenuController::new();
    menu.open(file("x"));

    assert!(!menu.pointer_down(&PointerTarget::Menu(file("x"))));
    assert!(!menu.pointer_down(&PointerTarget::Trigger(file("y"))));
    assert!(menu.is_open(&file("x")));

    assert!(menu.pointer_down(&PointerTarget::Outside));
    assert_eq!(menu.open_item(), None);
    assert!(!menu.pointer_down(&PointerTarget::Outside));
}

#[test]
fn stale_token_cannot_close_newer_menu() {
    let mut menu = ContextMenuController::new();
    let first = menu.open(file("x"));
    let second = menu.open(file("y"));

    assert!(!menu.clear_token(first));
    assert!(menu.is_open(&file("y")));
    assert!(menu.clear_token(second));
    assert_eq!(menu.active_token(), None);
}

#[test]
fn close_reports_the_dismissed_item() {
    let mut menu = ContextMenuController::new();
    menu.open(dir("a"));
    assert_eq!(menu.close(DismissReason::Navigation), Some(dir("a")));
    assert_eq!(menu.close(DismissReason::Navigation), None);
}

#[test]
fn entries_are_filtered_by_item_kind() {
    let upload = ItemRef::Upload(TempId::generate());
    assert_eq!(menu_entries(&upload), vec![MenuAction::CancelUpload]);

    let directory_entries = menu_entries(&dir("a"));
    assert!(!directory_entries.contains(&MenuAction::Download));
    assert!(!directory_entries.contains(&MenuAction::CancelUpload));
    assert!(directory_entries.contains(&MenuAction::Rename));

    let file_entries = menu_entries(&file("f"));
    assert_eq!(file_entries.first(), Some(&MenuAction::Download));
    assert_eq!(file_entries.last(), Some(&MenuAction::Delete));
    assert!(!file_entries.contains(&MenuAction::CancelUpload));
}

#[test]
fn labels_match_presentation_text() {
    assert_eq!(MenuAction::CancelUpload.label(), "Cancel Upload");
    assert_eq!(MenuAction::Download.label(), "Download");
}
