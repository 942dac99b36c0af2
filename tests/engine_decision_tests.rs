use dumpsync::config::{ReconcilerConfig, RelationEndpoint};
use dumpsync::reconciler::{Decision, ReconcileStatus, Trigger, decide};

fn desired(url: &str) -> ReconcilerConfig {
    ReconcilerConfig {
        sql_dump_url: url.to_string(),
        refresh_period_minutes: 0,
        db_name: "seed".to_string(),
        db_user: "owner".to_string(),
    }
}

fn endpoint() -> RelationEndpoint {
    RelationEndpoint {
        host: "db.internal".to_string(),
        port: 5432,
        admin_user: "postgres".to_string(),
        admin_password: "secret".to_string(),
        database: "seed".to_string(),
    }
}

#[test]
fn no_relation_waits_even_with_a_url() {
    let decision = decide(
        &desired("https://example.test/dump.tar.gz"),
        None,
        Trigger::ConfigChanged,
    );
    assert_eq!(
        decision,
        Decision::Skip(ReconcileStatus::WaitingForRelation)
    );
}

#[test]
fn relation_without_url_waits_for_config() {
    let ep = endpoint();
    for url in ["", "   "] {
        let decision = decide(&desired(url), Some(&ep), Trigger::ConfigChanged);
        assert_eq!(decision, Decision::Skip(ReconcileStatus::WaitingForConfig));
    }
}

#[test]
fn relation_loss_wins_over_missing_config() {
    // Both preconditions missing: relation takes precedence in the status.
    let decision = decide(&desired(""), None, Trigger::ConfigChanged);
    assert_eq!(
        decision,
        Decision::Skip(ReconcileStatus::WaitingForRelation)
    );
}

#[test]
fn config_and_relation_triggers_run_unforced() {
    let ep = endpoint();
    let cfg = desired("https://example.test/dump.tar");

    for trigger in [Trigger::ConfigChanged, Trigger::RelationEstablished] {
        assert_eq!(
            decide(&cfg, Some(&ep), trigger),
            Decision::Run { forced: false }
        );
    }
}

#[test]
fn scheduled_and_manual_triggers_force_the_apply() {
    let ep = endpoint();
    let cfg = desired("https://example.test/dump.tar");

    for trigger in [Trigger::ScheduledTick, Trigger::Manual] {
        assert_eq!(
            decide(&cfg, Some(&ep), trigger),
            Decision::Run { forced: true }
        );
    }
}

#[test]
fn scheduled_tick_without_relation_still_waits() {
    let decision = decide(
        &desired("https://example.test/dump.tar"),
        None,
        Trigger::ScheduledTick,
    );
    assert_eq!(
        decision,
        Decision::Skip(ReconcileStatus::WaitingForRelation)
    );
}
