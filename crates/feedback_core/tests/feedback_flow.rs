mod support;

use std::sync::atomic::Ordering;

use feedback_core::{FeedbackDraft, Listing, RepositoryError, ValidationError};
use support::{client, Client};

async fn signed_in(email: &str) -> Client {
    let c = client();
    c.session.sign_up(email, "pass1234").await.unwrap();
    c
}

#[tokio::test]
async fn submitted_feedback_is_listed_for_its_author_only() {
    let c = signed_in("a@test.io").await;
    let a = c.session.identity().unwrap();

    c.repo
        .submit(FeedbackDraft::new(5, "Great service!"))
        .await
        .unwrap();

    let mine = c.repo.list_by_author(&a.id).await.unwrap().into_records().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].rating(), 5);
    assert_eq!(mine[0].author_id(), a.id);
    assert_eq!(mine[0].author_label(), "a@test.io");

    let theirs = c.repo.list_by_author("someone-else").await.unwrap();
    assert_eq!(theirs.into_records(), Some(Vec::new()));
}

#[tokio::test]
async fn listing_another_author_never_contacts_the_store() {
    let c = signed_in("a@test.io").await;

    c.repo.list_by_author("b-id").await.unwrap();

    assert_eq!(c.store.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn listing_is_newest_first() {
    let c = signed_in("a@test.io").await;
    for comment in ["first comment", "second comment", "third comment"] {
        c.repo.submit(FeedbackDraft::new(4, comment)).await.unwrap();
    }

    let records = c.repo.list_mine().await.unwrap().into_records().unwrap();
    let comments: Vec<&str> = records.iter().map(|r| r.comment()).collect();

    assert_eq!(comments, vec!["third comment", "second comment", "first comment"]);
    assert!(records.windows(2).all(|w| w[0].created_at() > w[1].created_at()));
}

#[tokio::test]
async fn empty_listing_is_not_an_error() {
    let c = signed_in("a@test.io").await;

    let listing = c.repo.list_mine().await.unwrap();

    assert!(matches!(listing, Listing::Current { ref records, .. } if records.is_empty()));
}

#[tokio::test]
async fn invalid_input_issues_zero_store_calls() {
    let c = signed_in("a@test.io").await;

    let missing = c.repo.submit(FeedbackDraft::new(0, "ok")).await;
    let short = c.repo.submit(FeedbackDraft::new(3, "too short")).await;

    assert_eq!(missing, Err(RepositoryError::Invalid(ValidationError::MissingRating)));
    assert_eq!(short, Err(RepositoryError::Invalid(ValidationError::CommentTooShort)));
    assert_eq!(c.store.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn operations_without_a_session_are_unauthorized() {
    let c = client();

    assert_eq!(
        c.repo.submit(FeedbackDraft::new(5, "Great service!")).await,
        Err(RepositoryError::Unauthorized)
    );
    assert_eq!(c.repo.list_mine().await, Err(RepositoryError::Unauthorized));
    assert_eq!(
        c.repo.list_by_author("anyone").await,
        Err(RepositoryError::Unauthorized)
    );
    assert_eq!(c.store.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_submit_is_rejected_locally() {
    let c = signed_in("a@test.io").await;
    let gate = c.store.hold_next_create();

    let repo = c.repo.clone();
    let first = tokio::spawn(async move {
        repo.submit(FeedbackDraft::new(5, "Great service!")).await
    });
    gate.entered.notified().await;
    assert!(c.repo.is_submitting());

    let second = c.repo.submit(FeedbackDraft::new(4, "Also quite good")).await;
    assert_eq!(second, Err(RepositoryError::SubmitInProgress));
    assert_eq!(c.store.create_calls.load(Ordering::SeqCst), 1);

    gate.release.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(c.store.len(), 1);
    assert!(!c.repo.is_submitting());
}

#[tokio::test]
async fn failed_write_is_classified_and_frees_the_flag() {
    let c = signed_in("a@test.io").await;
    c.store.fail_writes.store(true, Ordering::SeqCst);

    let result = c.repo.submit(FeedbackDraft::new(5, "Great service!")).await;
    assert!(matches!(result, Err(RepositoryError::WriteFailed(_))));
    assert!(!c.repo.is_submitting());

    c.store.fail_writes.store(false, Ordering::SeqCst);
    c.repo
        .submit(FeedbackDraft::new(5, "Great service!"))
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_read_is_classified() {
    let c = signed_in("a@test.io").await;
    c.store.fail_reads.store(true, Ordering::SeqCst);

    let result = c.repo.list_mine().await;

    assert!(matches!(result, Err(RepositoryError::ReadFailed(_))));
}

#[tokio::test]
async fn stale_listing_is_discarded_when_a_later_one_finished_first() {
    let c = signed_in("a@test.io").await;
    c.repo
        .submit(FeedbackDraft::new(5, "Great service!"))
        .await
        .unwrap();
    let gate = c.store.hold_next_query();

    let repo = c.repo.clone();
    let slow = tokio::spawn(async move { repo.list_mine().await });
    gate.entered.notified().await;

    let fast = c.repo.list_mine().await.unwrap();
    assert_eq!(fast.seq(), 2);
    assert!(matches!(fast, Listing::Current { .. }));

    gate.release.notify_one();
    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow, Listing::Superseded { seq: 1 });
}

#[tokio::test]
async fn listings_completing_in_order_are_all_current() {
    let c = signed_in("a@test.io").await;

    let first = c.repo.list_mine().await.unwrap();
    let second = c.repo.list_mine().await.unwrap();

    assert!(matches!(first, Listing::Current { seq: 1, .. }));
    assert!(matches!(second, Listing::Current { seq: 2, .. }));
}

#[tokio::test]
async fn records_of_other_authors_from_the_store_are_dropped() {
    let c = signed_in("a@test.io").await;
    let intruder = feedback_core::Identity::new("b-id", "b@test.io");
    c.store.insert_raw(&intruder, 1, "not yours to see");
    c.repo
        .submit(FeedbackDraft::new(5, "Great service!"))
        .await
        .unwrap();
    c.store.ignore_filter.store(true, Ordering::SeqCst);

    let records = c.repo.list_mine().await.unwrap().into_records().unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].comment(), "Great service!");
}

#[tokio::test]
async fn comment_is_stored_trimmed_with_author_attached() {
    let c = signed_in("a@test.io").await;
    let me = c.session.identity().unwrap();

    let id = c
        .repo
        .submit(FeedbackDraft::new(3, "   decent enough   "))
        .await
        .unwrap();

    let records = c.repo.list_mine().await.unwrap().into_records().unwrap();
    assert_eq!(records[0].id(), id);
    assert_eq!(records[0].comment(), "decent enough");
    assert_eq!(records[0].author_id(), me.id);
}

#[tokio::test]
async fn signing_out_cuts_off_access() {
    let c = signed_in("a@test.io").await;
    c.repo
        .submit(FeedbackDraft::new(5, "Great service!"))
        .await
        .unwrap();

    c.session.sign_out().await.unwrap();

    assert_eq!(c.repo.list_mine().await, Err(RepositoryError::Unauthorized));
}
