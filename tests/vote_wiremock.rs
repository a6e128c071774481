use serde_json::{json, Value};
use sorter_client::{
    Attribute, AttributeId, Item, ItemId, OptionsUpdate, Session, SorterError, Tag, VoteArgs,
    VoteMagnitude,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn start() -> (MockServer, Session) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "2.1.0" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/vote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 100,
            "left_item_id": 1,
            "right_item_id": 2,
            "magnitude": 75,
            "attribute": 0,
            "created_at": "2024-03-27T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let session = Session::connect("test-api-key", server.uri(), OptionsUpdate::new())
        .await
        .unwrap();
    (server, session)
}

fn fixtures() -> (Tag, Item, Item) {
    let tag = serde_json::from_value(json!({ "id": 1, "title": "test_tag" })).unwrap();
    let a = serde_json::from_value(json!({ "id": 1, "title": "A", "tag_id": 1 })).unwrap();
    let b = serde_json::from_value(json!({ "id": 2, "title": "B", "tag_id": 1 })).unwrap();
    (tag, a, b)
}

async fn vote_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/api/vote")
        .collect()
}

fn body(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn both_orderings_send_identical_bodies() {
    let (server, session) = start().await;
    let (tag, a, b) = fixtures();

    let vote = session.vote(&tag, &a, &b, 25, None).await.unwrap();
    session.vote(&tag, &a, 25, &b, None).await.unwrap();

    let sent = vote_requests(&server).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].body, sent[1].body);
    assert_eq!(
        body(&sent[0]),
        json!({ "tag_id": 1, "left_item_id": 1, "right_item_id": 2, "magnitude": 75 })
    );

    assert_eq!(vote.magnitude, 25);
    assert_eq!(vote.attribute, None);
    assert_eq!(vote.magnitude_on(VoteMagnitude::Positive), 75);
}

#[tokio::test]
async fn positive_scale_reaches_the_same_wire_value() {
    let (server, mut session) = start().await;
    let (tag, a, b) = fixtures();

    session.update_options(&OptionsUpdate::new().vote_magnitude(VoteMagnitude::Positive));
    session.vote(&tag, &a, &b, 75, None).await.unwrap();

    session.update_options(&OptionsUpdate::new().vote_magnitude(VoteMagnitude::Equal));
    session.vote(&tag, &a, &b, 25, None).await.unwrap();

    let sent = vote_requests(&server).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(body(&sent[0])["magnitude"], json!(75));
    assert_eq!(sent[0].body, sent[1].body);
}

#[tokio::test]
async fn out_of_range_magnitudes_never_reach_the_service() {
    let (server, mut session) = start().await;
    let (tag, a, b) = fixtures();

    for m in [-51, 51, 100] {
        let err = session.vote(&tag, &a, &b, m, None).await.unwrap_err();
        assert!(matches!(err, SorterError::Validation(_)), "{m}: {err:?}");
    }

    session.update_options(&OptionsUpdate::new().vote_magnitude(VoteMagnitude::Positive));
    for m in [-1, 101] {
        let err = session.vote(&tag, &a, &b, m, None).await.unwrap_err();
        assert!(matches!(err, SorterError::Validation(_)), "{m}: {err:?}");
    }

    assert!(vote_requests(&server).await.is_empty());
}

#[tokio::test]
async fn ambiguous_arguments_are_rejected_locally() {
    let (server, session) = start().await;
    let (tag, a, b) = fixtures();

    let err = session.vote(&tag, 25, &a, &b, None).await.unwrap_err();
    assert!(matches!(err, SorterError::Validation(_)));

    let err = session.vote(&tag, &a, 10, 20, None).await.unwrap_err();
    assert!(matches!(err, SorterError::Validation(_)));

    assert!(vote_requests(&server).await.is_empty());
}

#[tokio::test]
async fn attribute_is_carried_in_the_payload() {
    let (server, session) = start().await;
    let (tag, _, _) = fixtures();
    let quality: Attribute =
        serde_json::from_value(json!({ "id": 5, "title": "quality" })).unwrap();

    let args = VoteArgs::MagnitudeLast {
        left: ItemId(2),
        right: ItemId(1),
        magnitude: -50,
    };
    session.submit_vote(&tag, args, Some(&quality)).await.unwrap();

    let sent = vote_requests(&server).await;
    assert_eq!(
        body(&sent[0]),
        json!({
            "tag_id": 1,
            "left_item_id": 2,
            "right_item_id": 1,
            "magnitude": 0,
            "attribute": 5
        })
    );
    assert_eq!(quality.id, AttributeId(5));
}

#[tokio::test]
async fn failed_vote_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "2.1.0" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/vote"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "busy" })))
        .expect(1)
        .mount(&server)
        .await;

    let session = Session::connect("test-api-key", server.uri(), OptionsUpdate::new())
        .await
        .unwrap();
    let (tag, a, b) = fixtures();

    let err = session.vote(&tag, &a, &b, 0, None).await.unwrap_err();
    match err {
        SorterError::Api {
            status, message, ..
        } => {
            assert_eq!(status, 503);
            assert_eq!(message, "busy");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}
