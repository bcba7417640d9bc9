//! Cattle fattening tests
//!
//! Tests for the fattening service including:
//! - Daily gain and completion projection on update
//! - Duplicate tag rejection among active records
//! - Lifecycle transitions and analytics

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use farm_backend::error::AppError;
use farm_backend::repository::{FatteningRepository, InMemoryFatteningRepository};
use farm_backend::services::fattening::{
    CompleteFatteningInput, CreateFatteningInput, IntakeOutcome, UpdateFatteningInput,
};
use farm_backend::services::{ChangeFeed, ChangeTable, FatteningService};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{AnalyticsThresholds, FatteningRecord, FatteningStatus};
use uuid::Uuid;

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn service() -> (FatteningService, Arc<InMemoryFatteningRepository>, ChangeFeed) {
    let repo = Arc::new(InMemoryFatteningRepository::new());
    let feed = ChangeFeed::new(64);
    let service = FatteningService::new(repo.clone(), feed.clone(), AnalyticsThresholds::default());
    (service, repo, feed)
}

fn intake(tag: &str, breed: &str, entry: &str, target: &str, entry_date: NaiveDate) -> CreateFatteningInput {
    CreateFatteningInput {
        tag_number: tag.to_string(),
        breed: Some(breed.to_string()),
        entry_date: Some(entry_date),
        entry_weight: Some(dec(entry)),
        current_weight: None,
        target_weight: Some(dec(target)),
        notes: None,
    }
}

async fn create_ok(service: &FatteningService, farm: Uuid, input: CreateFatteningInput, today: NaiveDate) -> FatteningRecord {
    match service.create(farm, input, today).await.unwrap() {
        IntakeOutcome::Created { record } => record,
        other => panic!("expected created, got {:?}", other),
    }
}

// ============================================================================
// Intake
// ============================================================================

#[tokio::test]
async fn test_create_on_intake_day_has_no_gain() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);

    let record = create_ok(&service, farm, intake("TH-001", "Brahman", "280", "480", today), today).await;

    assert_eq!(record.status, FatteningStatus::Active);
    assert_eq!(record.current_weight, dec("280"));
    assert_eq!(record.daily_gain, None);
    assert_eq!(record.expected_completion_date, None);
}

#[tokio::test]
async fn test_create_rejects_duplicate_active_tag() {
    let (service, repo, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);

    create_ok(&service, farm, intake("TH-001", "Brahman", "280", "480", today), today).await;
    let outcome = service
        .create(farm, intake("TH-001", "Angus", "300", "500", today), today)
        .await
        .unwrap();

    match outcome {
        IntakeOutcome::DuplicateTag { tag_number } => assert_eq!(tag_number, "TH-001"),
        other => panic!("expected duplicate, got {:?}", other),
    }
    assert_eq!(repo.list(farm).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_tag_is_trimmed_before_duplicate_check() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);

    create_ok(&service, farm, intake("TH-7", "Brahman", "280", "480", today), today).await;
    let outcome = service
        .create(farm, intake("  TH-7 ", "Brahman", "280", "480", today), today)
        .await
        .unwrap();
    assert!(matches!(outcome, IntakeOutcome::DuplicateTag { .. }));
}

#[tokio::test]
async fn test_same_tag_allowed_on_other_farm_and_after_sale() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let other_farm = Uuid::new_v4();
    let today = date(2024, 3, 1);

    let first = create_ok(&service, farm, intake("TH-001", "Brahman", "280", "480", today), today).await;
    create_ok(&service, other_farm, intake("TH-001", "Brahman", "280", "480", today), today).await;

    service
        .complete(
            farm,
            first.id,
            CompleteFatteningInput {
                status: FatteningStatus::Sold,
                exit_date: Some(today),
                exit_weight: Some(dec("290")),
                sale_price: Some(dec("1500")),
                notes: None,
            },
            today,
        )
        .await
        .unwrap();

    create_ok(&service, farm, intake("TH-001", "Angus", "300", "500", today), today).await;
}

#[tokio::test]
async fn test_create_validation_happens_before_insert() {
    let (service, repo, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);

    let cases = vec![
        intake("", "Brahman", "280", "480", today),
        intake("TH-1", "Brahman", "0", "480", today),
        intake("TH-1", "Brahman", "280", "-5", today),
        CreateFatteningInput {
            target_weight: None,
            ..intake("TH-1", "Brahman", "280", "480", today)
        },
        CreateFatteningInput {
            current_weight: Some(Decimal::ZERO),
            ..intake("TH-1", "Brahman", "280", "480", today)
        },
    ];

    for input in cases {
        let err = service.create(farm, input, today).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }), "got {:?}", err);
    }
    assert!(repo.list(farm).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_defaults_breed() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);
    let input = CreateFatteningInput {
        breed: Some("   ".to_string()),
        ..intake("TH-2", "", "280", "480", today)
    };
    let record = create_ok(&service, farm, input, today).await;
    assert_eq!(record.breed, "Unknown");
}

// ============================================================================
// Weight updates
// ============================================================================

#[tokio::test]
async fn test_update_recomputes_from_intake_values() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let entry_date = date(2024, 1, 1);

    let record = create_ok(&service, farm, intake("TH-10", "Angus", "300", "450", entry_date), entry_date).await;

    // First weighing: 40 kg in 50 days
    let weighed = date(2024, 2, 20);
    let updated = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                current_weight: Some(dec("340")),
                weighed_on: Some(weighed),
                ..Default::default()
            },
            weighed,
        )
        .await
        .unwrap();
    assert_eq!(updated.daily_gain, Some(dec("0.8")));
    // 110 kg to go at 0.8 = 137.5 -> 138 days
    assert_eq!(updated.expected_completion_date, Some(weighed + Duration::days(138)));

    // Second weighing uses the intake weight, not the previous weighing
    let weighed = date(2024, 3, 11);
    let updated = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                current_weight: Some(dec("370")),
                weighed_on: Some(weighed),
                ..Default::default()
            },
            weighed,
        )
        .await
        .unwrap();
    // 70 kg in 70 days
    assert_eq!(updated.daily_gain, Some(dec("1")));
    assert_eq!(updated.expected_completion_date, Some(weighed + Duration::days(80)));
}

#[tokio::test]
async fn test_update_weight_loss_has_no_projection() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let entry_date = date(2024, 1, 1);
    let record = create_ok(&service, farm, intake("TH-11", "Angus", "300", "450", entry_date), entry_date).await;

    let weighed = date(2024, 1, 11);
    let updated = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                current_weight: Some(dec("290")),
                ..Default::default()
            },
            weighed,
        )
        .await
        .unwrap();

    assert_eq!(updated.daily_gain, Some(dec("-1")));
    assert_eq!(updated.expected_completion_date, None);
}

#[tokio::test]
async fn test_update_notes_only_keeps_projection() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let entry_date = date(2024, 1, 1);
    let record = create_ok(&service, farm, intake("TH-12", "Angus", "300", "450", entry_date), entry_date).await;

    let updated = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                notes: Some("moved to pen 4".to_string()),
                ..Default::default()
            },
            date(2024, 2, 1),
        )
        .await
        .unwrap();

    assert_eq!(updated.notes.as_deref(), Some("moved to pen 4"));
    assert_eq!(updated.daily_gain, None);
}

#[tokio::test]
async fn test_update_rejects_future_weighing() {
    let (service, repo, _) = service();
    let farm = Uuid::new_v4();
    let entry_date = date(2024, 1, 1);
    let record = create_ok(&service, farm, intake("TH-13", "Angus", "300", "450", entry_date), entry_date).await;

    let today = date(2024, 2, 1);
    let err = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                current_weight: Some(dec("340")),
                weighed_on: Some(today + Duration::days(1)),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Validation { ref field, .. } if field == "weighed_on"),
        "got {:?}",
        err
    );

    let stored = repo.get(farm, record.id).await.unwrap().unwrap();
    assert_eq!(stored.current_weight, dec("300"));

    let updated = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                current_weight: Some(dec("340")),
                weighed_on: Some(today),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap();
    assert_eq!(updated.current_weight, dec("340"));
}

#[tokio::test]
async fn test_unstorable_weights_are_rejected() {
    let (service, repo, _) = service();
    let farm = Uuid::new_v4();
    let entry_date = date(2024, 1, 1);
    let record = create_ok(&service, farm, intake("TH-14", "Angus", "300", "500", entry_date), entry_date).await;

    // A sub-gram gain a day after intake would project millions of years out
    let err = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                current_weight: Some(dec("300.0000000000001")),
                ..Default::default()
            },
            date(2024, 1, 2),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Validation { ref field, .. } if field == "current_weight"),
        "got {:?}",
        err
    );

    let huge = CreateFatteningInput {
        entry_weight: Some(Decimal::MAX),
        ..intake("TH-15", "Angus", "1", "500", entry_date)
    };
    let err = service.create(farm, huge, entry_date).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }), "got {:?}", err);

    assert_eq!(repo.list(farm).await.unwrap().len(), 1);
    let analytics = service.analytics(farm).await.unwrap();
    assert_eq!(analytics.total_active, 1);
}

#[tokio::test]
async fn test_update_unknown_record() {
    let (service, _, _) = service();
    let err = service
        .update(Uuid::new_v4(), Uuid::new_v4(), UpdateFatteningInput::default(), date(2024, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// ============================================================================
// Completion and deletion
// ============================================================================

#[tokio::test]
async fn test_complete_is_terminal() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);
    let record = create_ok(&service, farm, intake("TH-20", "Angus", "300", "450", today), today).await;

    let done = service
        .complete(
            farm,
            record.id,
            CompleteFatteningInput {
                status: FatteningStatus::Transferred,
                exit_date: None,
                exit_weight: None,
                sale_price: None,
                notes: None,
            },
            today,
        )
        .await
        .unwrap();
    assert_eq!(done.status, FatteningStatus::Transferred);
    assert_eq!(done.exit_date, Some(today));

    let again = service
        .complete(
            farm,
            record.id,
            CompleteFatteningInput {
                status: FatteningStatus::Sold,
                exit_date: None,
                exit_weight: None,
                sale_price: None,
                notes: None,
            },
            today,
        )
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::InvalidStateTransition(_)));

    let update = service
        .update(
            farm,
            record.id,
            UpdateFatteningInput {
                current_weight: Some(dec("320")),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap_err();
    assert!(matches!(update, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_complete_to_active_is_rejected() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);
    let record = create_ok(&service, farm, intake("TH-21", "Angus", "300", "450", today), today).await;

    let err = service
        .complete(
            farm,
            record.id,
            CompleteFatteningInput {
                status: FatteningStatus::Active,
                exit_date: None,
                exit_weight: None,
                sale_price: None,
                notes: None,
            },
            today,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidStateTransition(_)));
}

#[tokio::test]
async fn test_delete_record() {
    let (service, repo, _) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);
    let record = create_ok(&service, farm, intake("TH-30", "Angus", "300", "450", today), today).await;

    service.delete(farm, record.id).await.unwrap();
    assert!(repo.list(farm).await.unwrap().is_empty());

    let err = service.delete(farm, record.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_writes_publish_changes() {
    let (service, _, feed) = service();
    let farm = Uuid::new_v4();
    let today = date(2024, 3, 1);
    let mut subscription = feed.subscribe(farm, Some(ChangeTable::CattleFattening));

    create_ok(&service, farm, intake("TH-40", "Angus", "300", "450", today), today).await;

    let event = subscription.next().await.unwrap();
    assert_eq!(event.farm_id, farm);
    assert_eq!(event.table, ChangeTable::CattleFattening);
}

// ============================================================================
// Analytics
// ============================================================================

#[tokio::test]
async fn test_analytics_empty_farm() {
    let (service, _, _) = service();
    let analytics = service.analytics(Uuid::new_v4()).await.unwrap();
    assert_eq!(analytics.total_active, 0);
    assert_eq!(analytics.average_daily_gain, Decimal::ZERO);
    assert_eq!(analytics.average_progress, Decimal::ZERO);
}

#[tokio::test]
async fn test_analytics_over_active_herd() {
    let (service, _, _) = service();
    let farm = Uuid::new_v4();
    let entry_date = date(2024, 1, 1);
    let weighed = date(2024, 1, 21);

    let a = create_ok(&service, farm, intake("A-1", "Angus", "300", "500", entry_date), entry_date).await;
    let b = create_ok(&service, farm, intake("B-1", "Brahman", "250", "500", entry_date), entry_date).await;
    create_ok(&service, farm, intake("B-2", "Brahman", "260", "520", entry_date), entry_date).await;

    for (id, weight) in [(a.id, "320"), (b.id, "300")] {
        service
            .update(
                farm,
                id,
                UpdateFatteningInput {
                    current_weight: Some(dec(weight)),
                    ..Default::default()
                },
                weighed,
            )
            .await
            .unwrap();
    }

    let analytics = service.analytics(farm).await.unwrap();
    assert_eq!(analytics.total_active, 3);
    // (20/20 + 50/20) / 2; B-2 has no gain yet and is left out
    assert_eq!(analytics.average_daily_gain, dec("1.75"));
    // (64 + 60 + 50) / 3
    assert_eq!(analytics.average_progress, dec("58"));
    assert_eq!(analytics.breed_distribution[1].breed, "Brahman");
    assert_eq!(analytics.breed_distribution[1].count, 2);
    assert_eq!(analytics.weight_gain_by_breed[1].average_gain, dec("25"));
}

// ============================================================================
// Properties
// ============================================================================

fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (100u32..900).prop_map(Decimal::from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// However many intakes reuse a tag, only one active record holds it
    #[test]
    fn prop_one_active_record_per_tag(
        attempts in 1usize..6,
        entry in weight_strategy(),
    ) {
        let (service, repo, _) = service();
        let farm = Uuid::new_v4();
        let today = date(2024, 3, 1);

        let created = tokio_test::block_on(async {
            let mut created = 0;
            for _ in 0..attempts {
                let input = CreateFatteningInput {
                    entry_weight: Some(entry),
                    target_weight: Some(entry + Decimal::from(200)),
                    ..intake("DUP", "Angus", "1", "1", today)
                };
                if let IntakeOutcome::Created { .. } = service.create(farm, input, today).await.unwrap() {
                    created += 1;
                }
            }
            created
        });

        prop_assert_eq!(created, 1);
        let stored = tokio_test::block_on(repo.list(farm)).unwrap();
        prop_assert_eq!(stored.len(), 1);
    }

    /// Daily gain after an update is exactly (current - entry) / days
    #[test]
    fn prop_update_gain_matches_formula(
        entry in weight_strategy(),
        delta in -50i64..200,
        days in 1i64..365,
    ) {
        let (service, _, _) = service();
        let farm = Uuid::new_v4();
        let entry_date = date(2024, 1, 1);
        let weighed = entry_date + Duration::days(days);
        let current = entry + Decimal::from(delta);
        prop_assume!(current > Decimal::ZERO);

        let updated = tokio_test::block_on(async {
            let input = CreateFatteningInput {
                entry_weight: Some(entry),
                target_weight: Some(entry + Decimal::from(400)),
                ..intake("P-1", "Angus", "1", "1", entry_date)
            };
            let record = match service.create(farm, input, entry_date).await.unwrap() {
                IntakeOutcome::Created { record } => record,
                other => panic!("expected created, got {:?}", other),
            };
            service
                .update(
                    farm,
                    record.id,
                    UpdateFatteningInput {
                        current_weight: Some(current),
                        ..Default::default()
                    },
                    weighed,
                )
                .await
                .unwrap()
        });

        let expected = Decimal::from(delta) / Decimal::from(days);
        prop_assert_eq!(updated.daily_gain, Some(expected));
        if delta <= 0 {
            prop_assert_eq!(updated.expected_completion_date, None);
        } else {
            prop_assert!(updated.expected_completion_date.unwrap() >= weighed);
        }
    }
}
