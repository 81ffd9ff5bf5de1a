mod common;

use std::sync::Arc;

use profile_shared::config::EditorConfig;
use profile_shared::event::{IdentityField, LocationField, TextField};
use profile_shared::model::{ImageSelection, SpecialService, UnixTimeMs};
use profile_shared::shell::{InMemoryProfileStore, JsonFileProfileStore, ProfileStore, StaticPrompt};
use profile_shared::validation::{EMAIL_FORMAT_MESSAGE, PHONE_FORMAT_MESSAGE};
use profile_shared::view::NoticeKind;
use profile_shared::{
    ConfigError, Event, FieldEdit, FieldKey, MultiSelectField, SimulatedShell, RESET_CONFIRMATION_MESSAGE,
};

use common::{open, png, png_selection, test_services, valid_snapshot, GatedDecoder, GatedStore};

fn text(field: impl Into<TextField>, value: &str) -> Event {
    Event::FieldEdited(FieldEdit::text(field, value))
}

#[tokio::test]
async fn open_shows_the_stored_profile() {
    let shell = open(test_services(valid_snapshot())).await;

    let view = shell.view();
    assert_eq!(view.snapshot, valid_snapshot());
    assert!(!view.has_changes);
    assert_eq!(view.last_saved_text, "Never");
}

#[tokio::test]
async fn open_with_unreadable_store_leaves_an_error_notice() {
    let store = Arc::new(InMemoryProfileStore::new(valid_snapshot()));
    store.set_fail_loads(true);
    let shell = open(test_services(valid_snapshot()).with_store(store)).await;

    let view = shell.view();
    assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Error));
    assert_eq!(view.snapshot.identity.name, "");
}

#[tokio::test]
async fn open_rejects_invalid_config() {
    let mut config = EditorConfig::default();
    config.image.preview_size = 0;

    let result = SimulatedShell::open(test_services(valid_snapshot()), &config).await;
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[tokio::test]
async fn bad_email_and_phone_block_save() {
    let store = Arc::new(InMemoryProfileStore::new(valid_snapshot()));
    let shell = open(test_services(valid_snapshot()).with_store(store.clone())).await;

    // 1. Break both formatted fields
    shell.dispatch(text(IdentityField::Email, "bad")).await;
    shell.dispatch(text(IdentityField::Phone, "555-1234")).await;

    // 2. Save is refused with both messages
    shell.dispatch(Event::Save).await;
    let view = shell.view();
    assert_eq!(view.errors.get(FieldKey::Email), Some(EMAIL_FORMAT_MESSAGE));
    assert_eq!(view.errors.get(FieldKey::Phone), Some(PHONE_FORMAT_MESSAGE));

    // 3. Nothing else moved
    assert!(view.has_changes);
    assert_eq!(view.last_saved, None);
    assert_eq!(store.save_calls(), 0);
}

#[tokio::test]
async fn padded_phone_is_not_saved() {
    let store = Arc::new(InMemoryProfileStore::new(valid_snapshot()));
    let shell = open(test_services(valid_snapshot()).with_store(store.clone())).await;

    shell.dispatch(text(IdentityField::Phone, " (555) 123-4567\n")).await;
    shell.dispatch(Event::Save).await;

    assert_eq!(shell.view().errors.get(FieldKey::Phone), Some(PHONE_FORMAT_MESSAGE));
    assert_eq!(store.save_calls(), 0);
}

#[tokio::test]
async fn valid_profile_saves_at_call_time() {
    let store = Arc::new(InMemoryProfileStore::new(valid_snapshot()));
    let shell = open(test_services(valid_snapshot()).with_store(store.clone())).await;

    shell.dispatch(text(IdentityField::Website, "https://mainstreet.example")).await;

    let before = UnixTimeMs::now();
    shell.dispatch(Event::Save).await;
    let after = UnixTimeMs::now();

    let view = shell.view();
    let saved_at = view.last_saved.expect("save time recorded");
    assert!(before <= saved_at && saved_at <= after);
    assert!(!view.has_changes);
    assert_eq!(view.last_saved_text, "Just now");
    assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Success));
    assert_eq!(store.published().await.identity.website, "https://mainstreet.example");
}

#[tokio::test]
async fn draft_saves_invalid_profile() {
    let store = Arc::new(InMemoryProfileStore::new(valid_snapshot()));
    let shell = open(test_services(valid_snapshot()).with_store(store.clone())).await;

    shell.dispatch(text(IdentityField::Name, "   ")).await;
    shell.dispatch(Event::SaveDraft).await;

    let view = shell.view();
    assert!(!view.has_changes);
    assert!(view.errors.is_empty());
    assert_eq!(store.draft().await.unwrap().identity.name, "   ");
    assert_eq!(store.published().await.identity.name, "Main Street Pharmacy");
}

#[tokio::test]
async fn failed_save_keeps_edits_for_retry() {
    let store = Arc::new(InMemoryProfileStore::new(valid_snapshot()));
    store.set_fail_saves(true);
    let shell = open(test_services(valid_snapshot()).with_store(store.clone())).await;

    shell.dispatch(text(IdentityField::Description, "Open late")).await;
    shell.dispatch(Event::Save).await;
    let view = shell.view();
    assert!(view.has_changes);
    assert_eq!(view.snapshot.identity.description, "Open late");
    assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Error));

    // Retry once the backend is back
    store.set_fail_saves(false);
    shell.dispatch(Event::Save).await;
    assert!(!shell.view().has_changes);
    assert_eq!(store.save_calls(), 2);
}

#[tokio::test]
async fn second_save_is_busy_while_edits_keep_flowing() {
    let store = GatedStore::new(valid_snapshot());
    let prompt = Arc::new(StaticPrompt::accepting());
    let services = test_services(valid_snapshot())
        .with_store(store.clone())
        .with_prompt(prompt.clone());
    let shell = open(services).await;

    // 1. First save parks inside the store
    let first = tokio::spawn({
        let shell = shell.clone();
        async move { shell.dispatch(Event::Save).await }
    });
    store.started.notified().await;
    assert!(shell.view().is_saving);
    assert!(!shell.view().can_save);

    // 2. Concurrent save, draft and reset are refused, typing is not
    shell.dispatch(Event::Save).await;
    assert_eq!(shell.view().notice.map(|n| n.kind), Some(NoticeKind::Warning));
    shell.dispatch(Event::SaveDraft).await;
    shell.dispatch(Event::Reset).await;
    assert_eq!(prompt.times_asked(), 0);
    shell.dispatch(text(LocationField::Country, "United States")).await;

    // 3. Let the save finish
    store.release_one();
    first.await.unwrap();

    // The edit made mid-flight was not part of the saved copy
    assert_eq!(store.saves(), 1);
    assert_eq!(store.stored().await.location.country, "USA");
    let view = shell.view();
    assert!(view.has_changes);
    assert!(view.last_saved.is_some());
    assert!(!view.is_saving);
}

#[tokio::test]
async fn reset_restores_loaded_profile() {
    let prompt = Arc::new(StaticPrompt::accepting());
    let shell = open(test_services(valid_snapshot()).with_prompt(prompt.clone())).await;
    let original = shell.view().snapshot;

    // 1. A mix of edits across sections
    shell.dispatch(text(IdentityField::Email, "nope")).await;
    shell
        .dispatch(Event::MultiSelectToggled {
            field: MultiSelectField::AcceptedInsurance,
            id: "humana".into(),
            included: true,
        })
        .await;
    shell.dispatch(Event::MapClicked { x: 0.9, y: 0.1 }).await;
    shell.dispatch(Event::image_selected(Some(png_selection("logo.png")))).await;
    shell.dispatch(Event::Save).await;
    assert!(!shell.view().errors.is_empty());
    assert!(shell.view().preview.is_some());

    // 2. Confirmed reset
    shell.dispatch(Event::Reset).await;
    assert_eq!(prompt.times_asked(), 1);
    assert_eq!(prompt.last_message().as_deref(), Some(RESET_CONFIRMATION_MESSAGE));

    let view = shell.view();
    assert_eq!(view.snapshot, original);
    assert!(!view.has_changes);
    assert!(view.errors.is_empty());
    assert!(view.preview.is_none());
}

#[tokio::test]
async fn declined_reset_keeps_edits() {
    let prompt = Arc::new(StaticPrompt::declining());
    let shell = open(test_services(valid_snapshot()).with_prompt(prompt.clone())).await;

    shell.dispatch(text(IdentityField::Name, "Edited")).await;
    shell.dispatch(Event::Reset).await;

    let view = shell.view();
    assert_eq!(view.snapshot.identity.name, "Edited");
    assert!(view.has_changes);
    assert_eq!(prompt.times_asked(), 1);
}

#[tokio::test]
async fn reset_load_failure_keeps_edits() {
    let store = Arc::new(InMemoryProfileStore::new(valid_snapshot()));
    let shell = open(test_services(valid_snapshot()).with_store(store.clone())).await;

    shell.dispatch(text(IdentityField::Name, "Renamed")).await;
    store.set_fail_loads(true);
    shell.dispatch(Event::Reset).await;

    let view = shell.view();
    assert_eq!(view.snapshot.identity.name, "Renamed");
    assert!(view.has_changes);
    assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Error));
}

#[tokio::test]
async fn multi_select_round_trip() {
    let shell = open(test_services(valid_snapshot())).await;
    let before = shell.view().snapshot.credentials.special_services;

    for included in [true, false] {
        shell
            .dispatch(Event::MultiSelectToggled {
                field: MultiSelectField::SpecialServices,
                id: SpecialService::Delivery.to_string(),
                included,
            })
            .await;
    }

    assert_eq!(shell.view().snapshot.credentials.special_services, before);
}

#[tokio::test]
async fn image_selection_feeds_preview() {
    let shell = open(test_services(valid_snapshot())).await;

    // 1. Non-image is rejected without touching the editor
    let pdf = ImageSelection::new("license.pdf", "application/pdf", b"%PDF-1.7".to_vec());
    shell.dispatch(Event::image_selected(Some(pdf))).await;
    let view = shell.view();
    assert!(!view.has_changes);
    assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Error));

    // 2. Real image produces a preview
    let selection = ImageSelection::new("storefront.png", "image/png", png(40, 20));
    shell.dispatch(Event::image_selected(Some(selection))).await;
    let preview = shell.view().preview.expect("preview present");
    assert_eq!((preview.width, preview.height), (40, 20));
    assert_eq!(preview.media_type, "image/webp");
    assert!(shell.view().has_changes);

    // 3. Removal clears it
    shell.dispatch(Event::image_selected(None)).await;
    assert!(shell.view().preview.is_none());
}

#[tokio::test]
async fn slow_decode_finishing_after_reset_is_dropped() {
    let decoder = GatedDecoder::new();
    let shell = open(test_services(valid_snapshot()).with_decoder(decoder.clone())).await;

    // 1. Selection parks inside the decoder
    let selecting = tokio::spawn({
        let shell = shell.clone();
        async move { shell.dispatch(Event::image_selected(Some(png_selection("late.png")))).await }
    });
    decoder.started.notified().await;
    assert!(shell.view().is_decoding_image);

    // 2. Reset completes while the decode is still running
    shell.dispatch(Event::Reset).await;
    assert!(!shell.view().has_changes);

    // 3. The late preview is thrown away
    decoder.release_one();
    selecting.await.unwrap();

    let view = shell.view();
    assert!(view.preview.is_none());
    assert!(!view.has_changes);
    assert!(!view.is_decoding_image);
}

#[tokio::test]
async fn slow_decode_finishing_after_removal_is_dropped() {
    let decoder = GatedDecoder::new();
    let shell = open(test_services(valid_snapshot()).with_decoder(decoder.clone())).await;

    let selecting = tokio::spawn({
        let shell = shell.clone();
        async move { shell.dispatch(Event::image_selected(Some(png_selection("late.png")))).await }
    });
    decoder.started.notified().await;

    shell.dispatch(Event::image_selected(None)).await;

    decoder.release_one();
    selecting.await.unwrap();

    assert!(shell.view().preview.is_none());
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileProfileStore::in_dir(dir.path()));

    store.save(&valid_snapshot()).await.unwrap();

    let shell = open(test_services(Default::default()).with_store(store.clone())).await;
    shell.dispatch(text(IdentityField::OperatingHours, "Mon-Fri 9-7")).await;
    shell.dispatch(Event::Save).await;
    assert!(!shell.view().has_changes);

    let reopened = open(test_services(Default::default()).with_store(store)).await;
    let view = reopened.view();
    assert_eq!(view.snapshot.identity.operating_hours, "Mon-Fri 9-7");
    assert_eq!(view.snapshot.location.coordinates, Some(common::nyc()));
}
