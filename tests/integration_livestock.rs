#![allow(clippy::unwrap_used, clippy::panic, clippy::missing_panics_doc, unreachable_pub)]
use herdbook::api::schemas::animals::{NewAnimal, NewHealthRecord};
use herdbook::client::{ApiClient, ClientError};
use herdbook::domain::animal::AnimalStatus;
use reqwest::StatusCode;
use time::OffsetDateTime;
use time::macros::date;

mod common;

fn goat(tag: &str) -> NewAnimal {
    NewAnimal {
        tag: tag.to_string(),
        name: None,
        species: "goat".to_string(),
        breed: Some("Saanen".to_string()),
        sex: Some("female".to_string()),
        birth_date: Some(date!(2022 - 03 - 14)),
        status: AnimalStatus::Active,
    }
}

async fn signed_in(app: &common::TestApp, prefix: &str) -> ApiClient {
    let client = app.api_client();
    client.register(&common::unique_name(prefix), "password123").await.unwrap();
    client
}

#[tokio::test]
async fn test_animal_crud() {
    let app = common::TestApp::spawn().await;
    let client = signed_in(&app, "farmer").await;

    let created = client.create_animal(&goat("G-001")).await.unwrap();
    assert_eq!(created.tag, "G-001");
    assert_eq!(created.birth_date, Some(date!(2022 - 03 - 14)));
    assert_eq!(created.status, AnimalStatus::Active);

    let fetched = client.get_animal(created.id).await.unwrap();
    assert_eq!(fetched, created);

    let mut update = goat("G-001");
    update.name = Some("Clover".to_string());
    update.status = AnimalStatus::Sold;
    let updated = client.update_animal(created.id, &update).await.unwrap();
    assert_eq!(updated.name.as_deref(), Some("Clover"));
    assert_eq!(updated.status, AnimalStatus::Sold);
    assert!(updated.updated_at >= created.updated_at);

    client.delete_animal(created.id).await.unwrap();
    let err = client.get_animal(created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_duplicate_tag_conflicts() {
    let app = common::TestApp::spawn().await;
    let client = signed_in(&app, "dup_tag").await;

    client.create_animal(&goat("T-7")).await.unwrap();
    let err = client.create_animal(&goat("T-7")).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    assert!(!err.should_logout());
}

#[tokio::test]
async fn test_blank_tag_is_rejected() {
    let app = common::TestApp::spawn().await;
    let client = signed_in(&app, "blank_tag").await;

    let err = client.create_animal(&goat("   ")).await.unwrap_err();
    assert!(matches!(err, ClientError::Http { status: StatusCode::BAD_REQUEST, .. }), "{err:?}");
}

#[tokio::test]
async fn test_animals_are_scoped_to_owner() {
    let app = common::TestApp::spawn().await;
    let alice = signed_in(&app, "alice").await;
    let bob = signed_in(&app, "bob").await;

    let animal = alice.create_animal(&goat("A-1")).await.unwrap();

    // Owners may reuse each other's tags.
    bob.create_animal(&goat("A-1")).await.unwrap();

    assert_eq!(bob.get_animal(animal.id).await.unwrap_err().status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(bob.delete_animal(animal.id).await.unwrap_err().status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(bob.list_health_records(animal.id).await.unwrap_err().status(), Some(StatusCode::NOT_FOUND));

    let bobs = bob.list_animals(None).await.unwrap();
    assert_eq!(bobs.len(), 1);
    assert_ne!(bobs[0].id, animal.id);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = common::TestApp::spawn().await;
    let client = signed_in(&app, "filter").await;

    client.create_animal(&goat("S-1")).await.unwrap();
    let mut sold = goat("S-2");
    sold.status = AnimalStatus::Sold;
    client.create_animal(&sold).await.unwrap();

    assert_eq!(client.list_animals(None).await.unwrap().len(), 2);

    let only_sold = client.list_animals(Some(AnimalStatus::Sold)).await.unwrap();
    assert_eq!(only_sold.len(), 1);
    assert_eq!(only_sold[0].tag, "S-2");

    assert!(client.list_animals(Some(AnimalStatus::Deceased)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health_records_and_dashboard() {
    let app = common::TestApp::spawn().await;
    let client = signed_in(&app, "vet").await;

    let ewe = client
        .create_animal(&NewAnimal { species: "sheep".to_string(), ..goat("E-1") })
        .await
        .unwrap();
    client.create_animal(&goat("G-1")).await.unwrap();

    let today = OffsetDateTime::now_utc().date();
    let record = client
        .add_health_record(
            ewe.id,
            &NewHealthRecord {
                kind: "vaccination".to_string(),
                description: "Clostridial booster".to_string(),
                recorded_on: today,
            },
        )
        .await
        .unwrap();
    assert_eq!(record.animal_id, ewe.id);

    client
        .add_health_record(
            ewe.id,
            &NewHealthRecord { kind: "checkup".to_string(), description: String::new(), recorded_on: date!(2001 - 01 - 01) },
        )
        .await
        .unwrap();

    let records = client.list_health_records(ewe.id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r.id == record.id));

    let summary = client.dashboard().await.unwrap();
    assert_eq!(summary.total_animals, 2);
    assert_eq!(summary.by_species.iter().map(|s| s.count).sum::<i64>(), 2);
    assert!(summary.by_species.iter().any(|s| s.species == "sheep" && s.count == 1));
    assert_eq!(summary.health_records_last_30_days, 1);
    assert_eq!(summary.recent_health_records.len(), 2);
    assert_eq!(summary.recent_health_records[0].id, record.id);
}

#[tokio::test]
async fn test_deleting_animal_removes_its_records() {
    let app = common::TestApp::spawn().await;
    let client = signed_in(&app, "cascade").await;

    let animal = client.create_animal(&goat("C-1")).await.unwrap();
    client
        .add_health_record(
            animal.id,
            &NewHealthRecord { kind: "deworming".to_string(), description: String::new(), recorded_on: date!(2024 - 05 - 01) },
        )
        .await
        .unwrap();

    client.delete_animal(animal.id).await.unwrap();

    let summary = client.dashboard().await.unwrap();
    assert_eq!(summary.total_animals, 0);
    assert!(summary.recent_health_records.is_empty());
}
