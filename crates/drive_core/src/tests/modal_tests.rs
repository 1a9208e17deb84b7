use super::*;

use shared::domain::{FileRef, TempId};

#[test]
fn create_folder_starts_with_default_name_and_is_editable() {
    let mut modals = ModalController::new();
    modals.open_create_folder();
    assert_eq!(
        modals.current().map(|m| &m.modal),
        Some(&Modal::CreateFolder {
            name: DEFAULT_FOLDER_NAME.to_string()
        })
    );

    assert!(modals.set_input("Photos"));
    let (_, submission) = modals.begin_submit().expect("submittable");
    assert_eq!(
        submission,
        Submission::CreateDirectory {
            name: "Photos".into()
        }
    );
}

#[test]
fn failed_submit_keeps_modal_open_with_inline_error() {
    let mut modals = ModalController::new();
    modals.open_rename(ItemRef::Directory(DirectoryId::new("d1")), "Old");
    let (ticket, submission) = modals.begin_submit().expect("submittable");
    assert_eq!(submission.kind(), ItemKind::Directory);
    assert!(modals.begin_submit().is_none(), "second submit while in flight");

    modals.finish_submit(ticket, Err("Name already taken".into()));

    let active = modals.current().expect("still open");
    assert_eq!(active.error.as_deref(), Some("Name already taken"));
    assert!(!active.submitting);
    assert!(modals.begin_submit().is_some(), "retry allowed after failure");
}

#[test]
fn successful_create_closes_and_resets_draft() {
    let mut modals = ModalController::new();
    modals.open_create_folder();
    modals.set_input("Taxes");
    modals.dismiss();

    modals.open_create_folder();
    assert_eq!(
        modals.current().map(|m| &m.modal),
        Some(&Modal::CreateFolder {
            name: "Taxes".into()
        }),
        "unsubmitted draft survives a dismiss"
    );

    let (ticket, _) = modals.begin_submit().expect("submittable");
    modals.finish_submit(ticket, Ok(()));
    assert!(!modals.is_open());

    modals.open_create_folder();
    assert_eq!(
        modals.current().map(|m| &m.modal),
        Some(&Modal::CreateFolder {
            name: DEFAULT_FOLDER_NAME.into()
        })
    );
}

#[test]
fn only_one_modal_is_active_and_stale_results_are_ignored() {
    let mut modals = ModalController::new();
    modals.open_delete(ItemRef::File(FileId::new("f1")), "a.txt");
    let (ticket, submission) = modals.begin_submit().expect("submittable");
    assert_eq!(
        submission,
        Submission::DeleteFile {
            id: FileId::new("f1")
        }
    );

    modals.open_rename(ItemRef::File(FileId::new("f2")), "b.txt");
    modals.finish_submit(ticket, Ok(()));

    let active = modals.current().expect("rename modal survives");
    assert!(matches!(active.modal, Modal::Rename { .. }));
    assert_eq!(active.modal.title(), "Rename File");
}

#[test]
fn placeholders_cannot_be_renamed_or_deleted() {
    let mut modals = ModalController::new();
    let upload = ItemRef::Upload(TempId::generate());
    assert!(!modals.open_rename(upload.clone(), "a.txt"));
    assert!(!modals.open_delete(upload, "a.txt"));
    assert!(!modals.is_open());
}

#[test]
fn details_modal_is_read_only() {
    let mut modals = ModalController::new();
    modals.open_details(ListEntry::File(FileRef {
        id: FileId::new("f1"),
        name: "a.txt".into(),
        size: 10,
        created_at: None,
        parent_dir_id: None,
    }));
    assert!(!modals.set_input("b.txt"));
    assert!(modals.begin_submit().is_none());
    assert!(modals.dismiss());
}
