use chrono::{Duration, Utc};
use tempfile::TempDir;

use lifecache_lib::analysis::{AnalysisResult, Emotion, EmotionProfile, EmotionWeights};
use lifecache_lib::db::models::{
    CapsuleInput, DeliveryChannel, DeliveryInput, DeliveryStatus, NewFragment,
};
use lifecache_lib::db::Database;
use lifecache_lib::producers::FragmentKind;

fn open(dir: &TempDir) -> Database {
    Database::new(dir.path().join("lifecache.sqlite3")).unwrap()
}

async fn capsule_id(db: &Database, title: &str) -> String {
    db.create_capsule(CapsuleInput {
        title: title.into(),
        tags: vec!["family".into()],
        ..CapsuleInput::default()
    })
    .await
    .unwrap()
    .id
}

fn result(summary: &str, emotion: Emotion) -> AnalysisResult {
    let weights: EmotionWeights = [(emotion, 1.0)].into_iter().collect();
    AnalysisResult {
        summary: summary.into(),
        emotion_profile: EmotionProfile::from(weights),
        themes: vec!["cluster_0".into()],
    }
}

#[tokio::test]
async fn test_capsule_round_trip_and_listing_order() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let first = capsule_id(&db, "first").await;
    let second = capsule_id(&db, "second").await;

    let stored = db.get_capsule(&first).await.unwrap().unwrap();
    assert_eq!(stored.title, "first");
    assert_eq!(stored.tags, vec!["family"]);
    assert!(db.get_capsule("missing").await.unwrap().is_none());

    let ids: Vec<String> = db.list_capsules().await.unwrap().into_iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![second, first]);
}

#[tokio::test]
async fn test_fragments_come_back_in_insertion_order() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let id = capsule_id(&db, "notes").await;

    for (kind, text) in [
        (FragmentKind::Typed, Some("one")),
        (FragmentKind::FileDerived, None),
        (FragmentKind::Transcribed, Some("three")),
    ] {
        db.insert_fragment(NewFragment {
            capsule_id: id.clone(),
            kind,
            filename: None,
            content_text: text.map(str::to_string),
        })
        .await
        .unwrap();
    }

    let fragments = db.get_fragments_for_capsule(&id).await.unwrap();
    let kinds: Vec<FragmentKind> = fragments.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![FragmentKind::Typed, FragmentKind::FileDerived, FragmentKind::Transcribed]
    );
    assert_eq!(fragments[1].content_text, None);
}

#[tokio::test]
async fn test_analysis_upsert_is_last_write_wins() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let id = capsule_id(&db, "twice").await;

    assert!(db.get_analysis(&id).await.unwrap().is_none());
    db.upsert_analysis(&id, &result("old", Emotion::Joy)).await.unwrap();
    db.upsert_analysis(&id, &result("new", Emotion::Fear)).await.unwrap();

    let stored = db.get_analysis(&id).await.unwrap().unwrap();
    assert_eq!(stored.result, result("new", Emotion::Fear));
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let id = {
        let db = open(&dir);
        let id = capsule_id(&db, "persisted").await;
        db.upsert_analysis(&id, &result("kept", Emotion::Love)).await.unwrap();
        id
    };

    let db = open(&dir);
    let stored = db.get_analysis(&id).await.unwrap().unwrap();
    assert_eq!(stored.result.summary, "kept");
}

#[tokio::test]
async fn test_due_deliveries_exclude_future_and_finished() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir);
    let id = capsule_id(&db, "mail").await;
    let now = Utc::now();

    let schedule = |offset: Duration| DeliveryInput {
        capsule_id: id.clone(),
        scheduled_for: now + offset,
        channel: DeliveryChannel::Log,
        recipient_email: None,
        message: None,
    };
    let older = db.schedule_delivery(schedule(-Duration::hours(2))).await.unwrap();
    let newer = db.schedule_delivery(schedule(-Duration::hours(1))).await.unwrap();
    db.schedule_delivery(schedule(Duration::hours(1))).await.unwrap();
    assert_ne!(older.token, newer.token);

    let due: Vec<String> = db.get_due_deliveries(now).await.unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(due, vec![older.id.clone(), newer.id.clone()]);

    db.update_delivery_status(&older.id, DeliveryStatus::Delivered, now).await.unwrap();
    let due = db.get_due_deliveries(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, newer.id);

    assert!(db
        .update_delivery_status("missing", DeliveryStatus::Failed, now)
        .await
        .is_err());
}
