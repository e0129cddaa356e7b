use sqlx::{PgPool, Postgres, Transaction};

use crate::db::models::ObjectiveQuestion;

const COLUMNS: &str = "\
    id, exam_id, question_number, question_text, max_marks, answer_key_text, \
    created_at, updated_at";

pub(crate) async fn list_by_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<ObjectiveQuestion>, sqlx::Error> {
    sqlx::query_as::<_, ObjectiveQuestion>(&format!(
        "SELECT {COLUMNS} FROM objective_questions WHERE exam_id = $1 ORDER BY question_number"
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateQuestion<'a> {
    pub id: &'a str,
    pub exam_id: &'a str,
    pub question_text: &'a str,
    pub max_marks: f64,
    pub answer_key_text: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

/// Appends the question with the next contiguous number. Runs inside a
/// transaction so two concurrent appends cannot claim the same number.
pub(crate) async fn append(
    tx: &mut Transaction<'_, Postgres>,
    params: CreateQuestion<'_>,
) -> Result<ObjectiveQuestion, sqlx::Error> {
    let next_number: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(question_number), 0) + 1 FROM objective_questions
         WHERE exam_id = $1",
    )
    .bind(params.exam_id)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query_as::<_, ObjectiveQuestion>(&format!(
        "INSERT INTO objective_questions (
            id, exam_id, question_number, question_text, max_marks, answer_key_text,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(next_number)
    .bind(params.question_text)
    .bind(params.max_marks)
    .bind(params.answer_key_text)
    .bind(params.created_at)
    .fetch_one(&mut **tx)
    .await
}

/// Deletes a question and closes the numbering gap in the same transaction:
/// every question with a higher number is shifted down by one, keeping the
/// sequence contiguous from 1.
pub(crate) async fn delete_and_renumber(
    tx: &mut Transaction<'_, Postgres>,
    exam_id: &str,
    question_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<i32>, sqlx::Error> {
    let deleted_number: Option<i32> = sqlx::query_scalar(
        "DELETE FROM objective_questions WHERE exam_id = $1 AND id = $2
         RETURNING question_number",
    )
    .bind(exam_id)
    .bind(question_id)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(deleted_number) = deleted_number else {
        return Ok(None);
    };

    sqlx::query(
        "UPDATE objective_questions
         SET question_number = question_number - 1, updated_at = $1
         WHERE exam_id = $2 AND question_number > $3",
    )
    .bind(now)
    .bind(exam_id)
    .bind(deleted_number)
    .execute(&mut **tx)
    .await?;

    Ok(Some(deleted_number))
}
