//! Integration tests for the import pipeline and personal-best consolidation

mod helpers;

use helpers::*;
use rgsc_common::db::ComposedFromEntry;
use rgsc_common::game::Closer;
use rgsc_common::{Error, ErrorKind, Game, Playtype};
use rgsc_import::{ChartLookup, ImportOutcome, RawTimestamp, ScoreValidator};

#[tokio::test]
async fn test_first_import_creates_personal_best() {
    let env = setup().await;

    let outcome = env
        .importer
        .import_score(USER, None, &sdvx(9_000_000.0, "CLEAR", 1_000))
        .await
        .unwrap();
    let (score, session_info, pb) = imported(outcome);

    assert!(session_info.is_none());
    assert_eq!(score.grade, "A+");
    assert!(approx(score.percent, 90.0));

    let pb = pb.unwrap();
    assert_eq!(pb.score, 9_000_000.0);
    assert_eq!(pb.lamp, "CLEAR");
    assert_eq!(pb.composed_from.score_pb, score.score_id);
    assert_eq!(pb.composed_from.lamp_pb, score.score_id);
    assert!(approx(pb.calculated["VF6"], 0.294));

    let stored = env.importer.personal_best(USER, SDVX_CHART).await.unwrap();
    assert_eq!(stored, Some(pb));
}

#[tokio::test]
async fn test_score_and_lamp_merge_across_imports() {
    let env = setup().await;

    let (a, _, _) = imported(
        env.importer
            .import_score(USER, None, &sdvx(9_000_000.0, "CLEAR", 1_000))
            .await
            .unwrap(),
    );
    let (b, _, pb) = imported(
        env.importer
            .import_score(USER, None, &sdvx(8_000_000.0, "ULTIMATE CHAIN", 2_000))
            .await
            .unwrap(),
    );

    let pb = pb.unwrap();
    assert_eq!(pb.score, 9_000_000.0);
    assert_eq!(pb.grade, a.grade);
    assert_eq!(pb.lamp, "ULTIMATE CHAIN");
    assert_eq!(pb.composed_from.score_pb, a.score_id);
    assert_eq!(pb.composed_from.lamp_pb, b.score_id);
    assert_eq!(pb.time_achieved, Some(2_000));

    // 18 * 2 * 0.9 * 0.91 * 1.05 / 100, floored to 3 places
    assert!(approx(pb.calculated["VF6"], 0.309));
    assert!(pb.calculated["VF6"] > a.calculated["VF6"]);
}

#[tokio::test]
async fn test_aux_field_borrowed_from_third_record() {
    let env = setup().await;

    for raw in [
        sdvx_ex(9_500_000.0, "CLEAR", 100.0, 1),
        sdvx_ex(9_000_000.0, "ULTIMATE CHAIN", 150.0, 2),
    ] {
        env.importer.import_score(USER, None, &raw).await.unwrap();
    }
    let (c, _, pb) = imported(
        env.importer
            .import_score(USER, None, &sdvx_ex(8_000_000.0, "FAILED", 200.0, 3))
            .await
            .unwrap(),
    );

    let pb = pb.unwrap();
    assert_eq!(pb.score, 9_500_000.0);
    assert_eq!(pb.lamp, "ULTIMATE CHAIN");
    assert_eq!(pb.optional["exScore"], 200.0);
    assert_eq!(
        pb.composed_from.other,
        vec![ComposedFromEntry {
            name: "exScorePB".to_string(),
            score_id: c.score_id
        }]
    );
}

#[tokio::test]
async fn test_iidx_best_bp_and_grade() {
    let env = setup().await;

    // 1179 / 1572 = 75%
    let (first, _, _) = imported(
        env.importer
            .import_score(USER, None, &iidx(1179.0, "HARD CLEAR", Some(30.0), 1))
            .await
            .unwrap(),
    );
    assert_eq!(first.grade, "A");
    assert!(approx(first.percent, 75.0));
    assert_eq!(first.calculated["ktLampRating"], 10.0);

    let (_, _, pb) = imported(
        env.importer
            .import_score(USER, None, &iidx(1300.0, "FAILED", Some(12.0), 2))
            .await
            .unwrap(),
    );
    let pb = pb.unwrap();
    assert_eq!(pb.score, 1300.0);
    assert_eq!(pb.lamp, "HARD CLEAR");
    assert_eq!(pb.optional["bp"], 12.0);
    // bp came from the score-best record, so nothing extra is listed
    assert!(pb.composed_from.other.is_empty());
    assert_eq!(pb.calculated["ktLampRating"], 10.0);
}

#[tokio::test]
async fn test_maimai_percent_primary() {
    let env = setup().await;

    let (score, _, pb) = imported(
        env.importer
            .import_score(USER, None, &maimai(100.7, "ALL PERFECT", 1))
            .await
            .unwrap(),
    );
    assert_eq!(score.grade, "SSS+");
    assert_eq!(score.calculated["rate"], 308.0);

    let pb = pb.unwrap();
    assert_eq!(pb.percent, 100.7);
    assert_eq!(pb.calculated["rate"], 308.0);
}

#[tokio::test]
async fn test_bms_sieglinde_follows_merged_lamp() {
    let env = setup().await;

    env.importer
        .import_score(USER, None, &bms(1800.0, "EASY CLEAR", 1))
        .await
        .unwrap();
    let (_, _, pb) = imported(
        env.importer
            .import_score(USER, None, &bms(1200.0, "HARD CLEAR", 2))
            .await
            .unwrap(),
    );

    let pb = pb.unwrap();
    assert_eq!(pb.score, 1800.0);
    assert_eq!(pb.calculated["sieglinde"], 12.25);
}

#[tokio::test]
async fn test_duplicate_import_changes_nothing() {
    let env = setup().await;
    let raw = sdvx(9_000_000.0, "CLEAR", 1_000);

    let (score, _, pb) = imported(env.importer.import_score(USER, None, &raw).await.unwrap());
    let second = env.importer.import_score(USER, None, &raw).await.unwrap();

    assert_eq!(
        second,
        ImportOutcome::Duplicate {
            score_id: score.score_id.clone()
        }
    );
    assert_eq!(score_count(&env.pool).await, 1);
    assert_eq!(env.importer.personal_best(USER, SDVX_CHART).await.unwrap(), pb);
}

#[tokio::test]
async fn test_rejected_submissions_store_nothing() {
    let env = setup().await;

    let mut missing_chart = sdvx(9_000_000.0, "CLEAR", 1);
    missing_chart.identifier = ChartLookup::ChartId {
        chart_id: "no-such-chart".to_string(),
    };
    let err = env
        .importer
        .import_score(USER, None, &missing_chart)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChartNotFound(_)));
    assert!(err.to_string().contains("Could not find chart"));

    let mut desync = iidx(500.0, "CLEAR", None, 1);
    desync.identifier = ChartLookup::InGameId {
        in_game_id: 999,
        difficulty: "HYPER".to_string(),
    };
    let err = env.importer.import_score(USER, None, &desync).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(
        err.to_string(),
        "Song-Chart Desync on songID 999 (chartID iidx-desync)"
    );

    let mut bad_time = sdvx(9_000_000.0, "CLEAR", 1);
    bad_time.time_achieved = Some(RawTimestamp::Text("INVALID".to_string()));
    let err = env.importer.import_score(USER, None, &bad_time).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid/Unparsable score timestamp of INVALID");

    let too_high = sdvx(10_000_001.0, "CLEAR", 1);
    let err = env.importer.import_score(USER, None, &too_high).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRangeMetric { .. }));

    let unknown_lamp = sdvx(9_000_000.0, "HYPER CLEAR", 1);
    let err = env
        .importer
        .import_score(USER, None, &unknown_lamp)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownOrdinalValue { .. }));

    let mut undeclared = sdvx(9_000_000.0, "CLEAR", 1);
    undeclared.optional.insert("bp".to_string(), 4.0);
    let err = env.importer.import_score(USER, None, &undeclared).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(score_count(&env.pool).await, 0);
    assert!(env.importer.personal_best(USER, SDVX_CHART).await.unwrap().is_none());
    assert!(env.importer.personal_best(USER, DESYNC_CHART).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_reconsolidates() {
    let env = setup().await;

    let (best, _, _) = imported(
        env.importer
            .import_score(USER, None, &sdvx(9_500_000.0, "CLEAR", 1))
            .await
            .unwrap(),
    );
    let (next, _, _) = imported(
        env.importer
            .import_score(USER, None, &sdvx(9_100_000.0, "EXCESSIVE CLEAR", 2))
            .await
            .unwrap(),
    );

    let pb = env.importer.delete_score(&best.score_id).await.unwrap().unwrap();
    assert_eq!(pb.score, 9_100_000.0);
    assert_eq!(pb.composed_from.score_pb, next.score_id);
    assert_eq!(pb.composed_from.lamp_pb, next.score_id);

    let pb = env.importer.delete_score(&next.score_id).await.unwrap();
    assert!(pb.is_none());
    assert!(env.importer.personal_best(USER, SDVX_CHART).await.unwrap().is_none());

    let err = env.importer.delete_score(&next.score_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_missing_chart_keeps_previous_personal_best() {
    let env = setup().await;

    let (_, _, pb) = imported(
        env.importer
            .import_score(USER, None, &sdvx(9_000_000.0, "CLEAR", 1))
            .await
            .unwrap(),
    );

    rgsc_import::db::charts::delete_chart(&env.pool, SDVX_CHART)
        .await
        .unwrap();

    let err = env.importer.consolidate(USER, SDVX_CHART).await.unwrap_err();
    assert!(matches!(err, Error::ChartMetadataMissing(_)));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(env.importer.personal_best(USER, SDVX_CHART).await.unwrap(), pb);
}

#[tokio::test]
async fn test_recalculate_chart_refreshes_ratings() {
    let env = setup().await;

    env.importer
        .import_score(USER, None, &sdvx(9_000_000.0, "CLEAR", 1))
        .await
        .unwrap();
    env.importer
        .import_score(2, None, &sdvx(9_000_000.0, "CLEAR", 1))
        .await
        .unwrap();

    env.importer.catalog().add_chart(&sdvx_chart(19.0)).await.unwrap();
    let report = env.importer.recalculate_chart(SDVX_CHART).await.unwrap();
    assert_eq!(report.recalculated, vec![USER, 2]);
    assert!(report.failed.is_empty());

    let pb = env.importer.personal_best(USER, SDVX_CHART).await.unwrap().unwrap();
    // 19 * 2 * 0.9 * 0.91 / 100 = 0.31122
    assert!(approx(pb.calculated["VF6"], 0.311));

    let records = env.importer.scores_for(USER, SDVX_CHART).await.unwrap();
    assert!(records.iter().all(|r| approx(r.calculated["VF6"], 0.311)));
}

#[tokio::test]
async fn test_recalculate_chart_continues_past_failed_pair() {
    let env = setup().await;

    for user_id in [USER, 2, 3] {
        env.importer
            .import_score(user_id, None, &sdvx(9_000_000.0, "CLEAR", 1))
            .await
            .unwrap();
    }
    let stale = env.importer.personal_best(2, SDVX_CHART).await.unwrap();

    sqlx::query("UPDATE scores SET optional = 'not json' WHERE user_id = 2")
        .execute(&env.pool)
        .await
        .unwrap();
    env.importer.catalog().add_chart(&sdvx_chart(19.0)).await.unwrap();

    let report = env.importer.recalculate_chart(SDVX_CHART).await.unwrap();
    assert_eq!(report.recalculated, vec![USER, 3]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 2);
    assert_eq!(report.failed[0].1.kind, "other");

    for user_id in [USER, 3] {
        let pb = env.importer.personal_best(user_id, SDVX_CHART).await.unwrap().unwrap();
        assert!(approx(pb.calculated["VF6"], 0.311));
    }
    assert_eq!(env.importer.personal_best(2, SDVX_CHART).await.unwrap(), stale);
}

#[tokio::test]
async fn test_reimport_folds_in_unconsolidated_record() {
    let env = setup().await;
    env.importer
        .import_score(USER, None, &sdvx(9_000_000.0, "CLEAR", 1))
        .await
        .unwrap();

    // A record stored by an import that stopped before consolidating
    let better = sdvx(9_500_000.0, "CLEAR", 2);
    let validator = ScoreValidator::new(env.importer.catalog().clone());
    let record = validator.validate(USER, &better).await.unwrap().record;
    assert!(rgsc_import::db::scores::insert_score(&env.pool, &record)
        .await
        .unwrap());
    let pb = env.importer.personal_best(USER, SDVX_CHART).await.unwrap().unwrap();
    assert_eq!(pb.score, 9_000_000.0);

    let outcome = env.importer.import_score(USER, None, &better).await.unwrap();
    assert_eq!(
        outcome,
        ImportOutcome::Duplicate {
            score_id: record.score_id.clone()
        }
    );

    let pb = env.importer.personal_best(USER, SDVX_CHART).await.unwrap().unwrap();
    assert_eq!(pb.score, 9_500_000.0);
    assert_eq!(pb.composed_from.score_pb, record.score_id);
}

#[tokio::test]
async fn test_graded_personal_bests() {
    let env = setup().await;
    env.importer
        .import_score(USER, None, &iidx(1300.0, "CLEAR", None, 1))
        .await
        .unwrap();
    env.importer
        .import_score(USER, None, &maimai(99.2, "CLEAR", 1))
        .await
        .unwrap();

    let graded = env
        .importer
        .graded_personal_bests(USER, Game::Iidx, Playtype::SP)
        .await
        .unwrap();
    assert_eq!(graded.len(), 1);
    assert_eq!(graded[0].personal_best.grade, "AA");

    // max 1572: AA needs 1223, AAA needs 1398
    let delta = graded[0].grade_delta.as_ref().unwrap();
    assert_eq!(delta.lower, "AA+77");
    assert_eq!(delta.upper.as_deref(), Some("AAA-98"));
    assert_eq!(delta.closer, Closer::Lower);

    let graded = env
        .importer
        .graded_personal_bests(USER, Game::MaimaiDx, Playtype::Single)
        .await
        .unwrap();
    assert_eq!(graded.len(), 1);
    assert!(graded[0].grade_delta.is_none());
}

#[tokio::test]
async fn test_batch_reports_in_submission_order() {
    let env = setup().await;

    let batch = vec![
        sdvx(9_000_000.0, "CLEAR", 1),
        sdvx(9_000_000.0, "NOT A LAMP", 2),
        iidx(1000.0, "CLEAR", None, 3),
        sdvx(9_000_000.0, "CLEAR", 1),
    ];

    let report = env.importer.import_batch(USER, None, &batch).await;
    assert_eq!(report.results.len(), 4);
    assert_eq!(report.imported(), 2);
    assert_eq!(report.duplicates(), 1);
    assert_eq!(report.failed(), 1);

    let failure = report.results[1].as_ref().unwrap_err();
    assert_eq!(failure.kind, "validation");
    assert!(matches!(
        report.results[2],
        Ok(ImportOutcome::Imported { .. })
    ));
    assert_eq!(
        report.results[0].as_ref().unwrap().score_id(),
        report.results[3].as_ref().unwrap().score_id()
    );
    assert_eq!(score_count(&env.pool).await, 2);
}

#[tokio::test]
async fn test_personal_bests_listing() {
    let env = setup().await;

    env.importer
        .import_score(USER, None, &iidx(1000.0, "CLEAR", None, 1))
        .await
        .unwrap();
    env.importer
        .import_score(USER, None, &sdvx(9_000_000.0, "CLEAR", 1))
        .await
        .unwrap();

    let iidx_pbs = env
        .importer
        .personal_bests(USER, rgsc_common::Game::Iidx, rgsc_common::Playtype::SP)
        .await
        .unwrap();
    assert_eq!(iidx_pbs.len(), 1);
    assert_eq!(iidx_pbs[0].chart_id, IIDX_CHART);
}
