use sqlx::migrate::Migrator;
use std::path::Path;

#[tokio::test]
async fn migrations_load_and_versions_are_strictly_increasing() {
    let migrator = Migrator::new(Path::new("./migrations")).await.expect("load migrations");

    let versions: Vec<i64> = migrator.iter().map(|migration| migration.version).collect();
    assert!(!versions.is_empty(), "no migrations found");

    for pair in versions.windows(2) {
        assert!(pair[0] < pair[1], "migration versions out of order: {pair:?}");
    }
}

#[tokio::test]
async fn initial_migration_creates_core_tables() {
    let migrator = Migrator::new(Path::new("./migrations")).await.expect("load migrations");
    let initial = migrator.iter().next().expect("initial migration");

    for table in [
        "users",
        "schools",
        "school_enrollments",
        "teaching_slots",
        "slot_enrollments",
        "teaching_sessions",
        "objective_exams",
        "objective_questions",
        "objective_submissions",
        "answer_sheets",
        "answer_grades",
    ] {
        assert!(
            initial.sql.contains(&format!("CREATE TABLE {table}")),
            "initial migration missing table {table}"
        );
    }
}
