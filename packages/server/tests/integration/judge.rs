use serde_json::json;

use crate::common::{TestApp, case_event, code, end_event};

mod judge_token {
    use super::*;

    #[tokio::test]
    async fn missing_judge_token_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .post_event_with_judge_token(&end_event("sub1", code::ACCEPTED, 120, 2048), None)
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn wrong_judge_token_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .post_event_with_judge_token(
                &end_event("sub1", code::ACCEPTED, 120, 2048),
                Some("not-the-token"),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
        assert!(app.store.is_empty());
    }
}

mod event_validation {
    use super::*;

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let res = app.post_event(&json!({"kind": "end"})).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn blank_submission_id_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let res = app.post_event(&end_event("", code::ACCEPTED, 1, 1)).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.store.is_empty());
    }
}

mod terminal_results {
    use super::*;

    #[tokio::test]
    async fn accepted_result_is_recorded() {
        let app = TestApp::spawn().await;
        let res = app
            .post_event(&end_event("sub1", code::ACCEPTED, 120, 2048))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["outcome"], "recorded");
        assert_eq!(res.body["status"], "accepted");
        assert_eq!(app.store.len(), 1);
    }

    #[tokio::test]
    async fn second_terminal_event_does_not_overwrite() {
        let app = TestApp::spawn().await;
        app.post_event(&end_event("sub1", code::ACCEPTED, 120, 2048))
            .await;

        let res = app
            .post_event(&end_event("sub1", code::WRONG_ANSWER, 90, 1024))
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["outcome"], "duplicate");
        assert_eq!(res.body["status"], "accepted");

        let token = app.token_for(1, "alice");
        let stored = app
            .get_with_token(&crate::common::routes::submission_result("sub1"), &token)
            .await;
        assert_eq!(stored.body["status"], "accepted");
        assert_eq!(stored.body["time"], 120);
    }

    #[tokio::test]
    async fn progress_events_are_not_persisted() {
        let app = TestApp::spawn().await;
        let res = app
            .post_event(&case_event("sub1", 1, code::ACCEPTED, 10, 256))
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["outcome"], "progress");
        assert_eq!(res.body["status"], "judging");
        assert!(app.store.is_empty());
    }

    #[tokio::test]
    async fn unknown_status_code_records_system_error() {
        let app = TestApp::spawn().await;
        let res = app.post_event(&end_event("sub1", 999, 10, 10)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "system_error");
    }
}
