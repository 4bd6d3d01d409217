//! End-to-end CRUD pipeline tests over in-memory SQLite
//!
//! Introspect a real table, then drive submissions through the whole
//! sanitize → validate → hooks → transaction pipeline.

#![cfg(feature = "sqlite")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dyncrud::crud::{CrudHandler, FormData, Submission, SubmissionOutcome};
use dyncrud::db::ListQuery;
use dyncrud::error::DynCrudError;
use dyncrud::forms::render::CSRF_FIELD;
use dyncrud::forms::VirtualField;
use dyncrud::schema::ColumnKind;
use dyncrud::testing::sqlite_pool_with_schema;

const DDL: &str = "
CREATE TABLE contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email VARCHAR(190),
    age INTEGER,
    subscribed BOOLEAN NOT NULL DEFAULT 0,
    created_at DATETIME
)";

async fn handler() -> CrudHandler {
    let pool = sqlite_pool_with_schema(DDL).await.expect("schema setup");
    CrudHandler::new(pool, "contacts").await.expect("introspection")
}

fn submission(handler: &CrudHandler, pairs: &[(&str, &str)]) -> Submission {
    let mut fields: FormData = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    fields.insert(CSRF_FIELD.into(), handler.csrf().generate());
    Submission::from_fields(fields)
}

#[tokio::test]
async fn introspects_schema() {
    let handler = handler().await;
    let schema = handler.schema();
    assert_eq!(schema.primary_key, "id");
    assert_eq!(schema.columns.len(), 6);
    assert_eq!(schema.column("age").unwrap().kind, ColumnKind::Integer);
    assert_eq!(schema.column("subscribed").unwrap().kind, ColumnKind::Boolean);
    assert_eq!(schema.column("created_at").unwrap().kind, ColumnKind::DateTime);
    assert!(!schema.column("name").unwrap().nullable);
}

#[tokio::test]
async fn create_update_delete_roundtrip() {
    let handler = handler().await;

    let outcome = handler
        .handle_submission(submission(
            &handler,
            &[("name", "Ada"), ("email", "ada@example.com"), ("age", "36")],
        ))
        .await
        .unwrap();
    let id = outcome.id().expect("created");
    assert!(matches!(outcome, SubmissionOutcome::Created { .. }));

    let record = handler.find(id).await.unwrap().expect("row exists");
    assert_eq!(record["name"].as_deref(), Some("Ada"));
    assert_eq!(record["age"].as_deref(), Some("36"));
    // Unchecked checkbox persisted as explicit false.
    assert_eq!(record["subscribed"].as_deref(), Some("0"));

    // Updates key off the primary key field in the submission.
    let id_text = id.to_string();
    let outcome = handler
        .handle_submission(submission(
            &handler,
            &[("id", id_text.as_str()), ("name", "Ada Lovelace"), ("subscribed", "on")],
        ))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Updated { id: u } if u == id));

    let record = handler.find(id).await.unwrap().expect("row exists");
    assert_eq!(record["name"].as_deref(), Some("Ada Lovelace"));
    assert_eq!(record["subscribed"].as_deref(), Some("1"));

    assert!(handler.delete(id).await.unwrap());
    assert!(handler.find(id).await.unwrap().is_none());
    assert!(!handler.delete(id).await.unwrap());
}

#[tokio::test]
async fn rejects_invalid_submission_without_writing() {
    let handler = handler().await;

    let outcome = handler
        .handle_submission(submission(&handler, &[("age", "forty"), ("created_at", "nope")]))
        .await
        .unwrap();

    let SubmissionOutcome::Rejected(errors) = outcome else {
        panic!("expected rejection");
    };
    assert!(!errors.field("name").is_empty()); // required
    assert!(!errors.field("age").is_empty()); // not a number
    assert!(!errors.field("created_at").is_empty()); // not a timestamp

    let page = handler.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn missing_or_forged_csrf_token_is_refused() {
    let handler = handler().await;

    let mut fields = FormData::new();
    fields.insert("name".into(), "Ada".into());
    let err = handler
        .handle_submission(Submission::from_fields(fields.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, DynCrudError::CsrfMismatch));

    fields.insert(CSRF_FIELD.into(), "deadbeef.badsignature".into());
    let err = handler
        .handle_submission(Submission::from_fields(fields))
        .await
        .unwrap_err();
    assert!(matches!(err, DynCrudError::CsrfMismatch));
}

#[tokio::test]
async fn hooks_mutate_and_veto_inside_transaction() {
    let mut handler = handler().await;
    let after_save_calls = Arc::new(AtomicUsize::new(0));

    handler.before_save(|ctx| {
        if let Some(name) = ctx.data.get_mut("name") {
            *name = name.to_uppercase();
        }
        Ok(())
    });
    {
        let calls = after_save_calls.clone();
        handler.after_save(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let outcome = handler
        .handle_submission(submission(&handler, &[("name", "ada")]))
        .await
        .unwrap();
    let id = outcome.id().unwrap();
    let record = handler.find(id).await.unwrap().unwrap();
    assert_eq!(record["name"].as_deref(), Some("ADA"));
    assert_eq!(after_save_calls.load(Ordering::SeqCst), 1);

    // A veto after the INSERT must roll the row back.
    handler.after_create(|_| Err("audit trail offline".into()));
    let err = handler
        .handle_submission(submission(&handler, &[("name", "grace")]))
        .await
        .unwrap_err();
    assert!(matches!(err, DynCrudError::HookVeto { .. }));

    let page = handler.list(&ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 1, "vetoed insert must not persist");
}

#[tokio::test]
async fn delete_veto_keeps_row() {
    let mut handler = handler().await;
    let outcome = handler
        .handle_submission(submission(&handler, &[("name", "Ada")]))
        .await
        .unwrap();
    let id = outcome.id().unwrap();

    handler.before_delete(|_| Err("rows are forever".into()));
    let err = handler.delete(id).await.unwrap_err();
    assert!(matches!(err, DynCrudError::HookVeto { .. }));
    assert!(handler.find(id).await.unwrap().is_some());
}

#[tokio::test]
async fn virtual_fields_validate_but_never_persist() {
    let mut handler = handler().await;
    handler.add_virtual_field(
        VirtualField::checkbox("terms")
            .label("Accept the terms")
            .required()
            .error_message("You must accept the terms"),
    );

    let outcome = handler
        .handle_submission(submission(&handler, &[("name", "Ada")]))
        .await
        .unwrap();
    let SubmissionOutcome::Rejected(errors) = outcome else {
        panic!("expected rejection");
    };
    assert_eq!(errors.first("terms"), Some("You must accept the terms"));

    let outcome = handler
        .handle_submission(submission(&handler, &[("name", "Ada"), ("terms", "1")]))
        .await
        .unwrap();
    assert!(outcome.is_success());

    let record = handler.find(outcome.id().unwrap()).await.unwrap().unwrap();
    assert!(!record.contains_key("terms"));
}

#[tokio::test]
async fn unknown_fields_are_dropped_by_sanitizing() {
    let handler = handler().await;
    let outcome = handler
        .handle_submission(submission(
            &handler,
            &[("name", "Ada"), ("role", "admin"), ("id2", "1")],
        ))
        .await
        .unwrap();
    // Unknown columns never reach SQL, so this succeeds.
    assert!(outcome.is_success());
}

#[tokio::test]
async fn list_paginates_orders_and_searches() {
    let handler = handler().await;
    for name in ["Ada", "Grace", "Adele"] {
        handler
            .handle_submission(submission(&handler, &[("name", name)]))
            .await
            .unwrap();
    }

    let page = handler
        .list(&ListQuery {
            per_page: 2,
            ..ListQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages(), 2);

    let page = handler
        .list(&ListQuery {
            search: Some("ad".into()),
            ..ListQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2, "LIKE search over text columns");

    let err = handler
        .list(&ListQuery {
            order_by: Some("nope".into()),
            ..ListQuery::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DynCrudError::UnknownColumn(_)));
}

#[tokio::test]
async fn edit_form_prefills_values() {
    let handler = handler().await;
    let outcome = handler
        .handle_submission(submission(
            &handler,
            &[("name", "Ada"), ("email", "ada@example.com")],
        ))
        .await
        .unwrap();
    let id = outcome.id().unwrap();

    let html = handler.render_form(Some(id)).await.unwrap();
    assert!(html.contains(&format!("name=\"id\" value=\"{id}\"")));
    assert!(html.contains("value=\"ada@example.com\""));
    assert!(html.contains(&format!("name=\"{CSRF_FIELD}\"")));

    let html = handler.render_form(None).await.unwrap();
    assert!(!html.contains("name=\"id\""));
    assert!(html.contains("<textarea id=\"name\""));
}

#[tokio::test]
async fn nullable_columns_accept_empty_values() {
    let handler = handler().await;
    let outcome = handler
        .handle_submission(submission(
            &handler,
            &[("name", "Ada"), ("email", ""), ("age", "")],
        ))
        .await
        .unwrap();
    let record = handler.find(outcome.id().unwrap()).await.unwrap().unwrap();
    assert!(record["email"].is_none());
    assert!(record["age"].is_none());
}
