use serde_json::{json, Value};
use sorter_client::{Attribute, AttributeId, ItemId, OptionsUpdate, Session, SorterError, Tag};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start() -> (MockServer, Session) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "2.1.0" })))
        .mount(&server)
        .await;

    let session = Session::connect("test-api-key", server.uri(), OptionsUpdate::new())
        .await
        .unwrap();
    (server, session)
}

fn tag() -> Tag {
    serde_json::from_value(json!({ "id": 1, "title": "alphabet", "slug": "alphabet" })).unwrap()
}

fn letter(id: i64, title: &str) -> Value {
    json!({ "id": id, "title": title })
}

async fn page_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/tag/page")
        .count()
}

#[tokio::test]
async fn rankings_are_fetched_fresh_each_time() {
    let (server, session) = start().await;
    Mock::given(method("GET"))
        .and(path("/api/tag/page"))
        .and(query_param("id", "1"))
        .and(query_param("elo", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": 1, "title": "alphabet" },
            "sorted": [letter(1, "A"), letter(2, "B")],
            "unsorted": [letter(3, "C")],
            "pair": [letter(3, "C"), letter(1, "A")],
            "votes": [
                { "left_item_id": 1, "right_item_id": 2, "magnitude": 80, "attribute": 0 }
            ],
            "users_who_voted": ["alice", { "username": "bob" }, 7]
        })))
        .mount(&server)
        .await;

    let tag = tag();
    let rankings = session.rankings(&tag, None).await.unwrap();
    let _ = session.rankings(&tag, None).await.unwrap();
    assert_eq!(page_requests(&server).await, 2);

    let sorted: Vec<_> = rankings.sorted().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(sorted, ["A", "B"]);
    assert_eq!(rankings.unsorted()[0].id, ItemId(3));
    assert_eq!(rankings.item_count(), 3);
    assert!(rankings.sorted().iter().all(|i| i.tag_id == Some(1)));

    let (left, right) = rankings.pair().unwrap();
    assert_eq!((left.id, right.id), (ItemId(3), ItemId(1)));

    assert_eq!(rankings.votes()[0].magnitude, 30);
    assert_eq!(rankings.voters(), ["alice", "bob", "7"]);
    assert!(rankings.selected_attribute().is_none());
}

#[tokio::test]
async fn rankings_can_be_scoped_to_an_attribute() {
    let (server, session) = start().await;
    let quality: Attribute =
        serde_json::from_value(json!({ "id": 5, "title": "quality" })).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/tag/page"))
        .and(query_param("id", "1"))
        .and(query_param("attribute", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": 1, "title": "alphabet" },
            "sorted": [letter(2, "B"), letter(1, "A")],
            "attributes": [{ "id": 5, "title": "quality" }],
            "selected_attribute": { "id": 5, "title": "quality" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rankings = session.rankings(&tag(), Some(&quality)).await.unwrap();
    assert_eq!(rankings.sorted()[0].name, "B");
    assert_eq!(
        rankings.selected_attribute().map(|a| a.id),
        Some(AttributeId(5))
    );
}

#[tokio::test]
async fn single_item_tag_has_no_pair() {
    let (server, session) = start().await;
    Mock::given(method("GET"))
        .and(path("/api/tag/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": 1, "title": "alphabet" },
            "unsorted": [letter(1, "A")]
        })))
        .mount(&server)
        .await;

    let err = session.pair(&tag()).await.unwrap_err();
    assert!(matches!(err, SorterError::NotFound { .. }), "{err:?}");
}

#[tokio::test]
async fn convenience_views_read_the_snapshot() {
    let (server, session) = start().await;
    Mock::given(method("GET"))
        .and(path("/api/tag/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": 1, "title": "alphabet" },
            "sorted": [letter(1, "A")],
            "unsorted": [letter(2, "B"), letter(3, "C")],
            "pair": [letter(2, "B"), letter(3, "C")]
        })))
        .mount(&server)
        .await;

    let tag = tag();
    assert_eq!(session.sorted(&tag).await.unwrap().len(), 1);
    assert_eq!(session.unsorted(&tag).await.unwrap().len(), 2);
    let (left, right) = session.pair(&tag).await.unwrap();
    assert_eq!((left.name.as_str(), right.name.as_str()), ("B", "C"));
    assert_eq!(page_requests(&server).await, 3);
}

#[tokio::test]
async fn missing_tag_page_is_not_found() {
    let (server, session) = start().await;
    Mock::given(method("GET"))
        .and(path("/api/tag/page"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Tag not found" })))
        .mount(&server)
        .await;

    let err = session.rankings(&tag(), None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(matches!(err, SorterError::NotFound { .. }));
}

#[tokio::test]
async fn malformed_vote_magnitude_is_an_api_error() {
    let (server, session) = start().await;
    Mock::given(method("GET"))
        .and(path("/api/tag/page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tag": { "id": 1, "title": "alphabet" },
            "sorted": [letter(1, "A"), letter(2, "B")],
            "votes": [{ "left_item_id": 1, "right_item_id": 2, "magnitude": -1e12 }]
        })))
        .mount(&server)
        .await;

    let err = session.rankings(&tag(), None).await.unwrap_err();
    assert!(matches!(err, SorterError::Api { status: 200, .. }), "{err:?}");
}
