use sorter_client::{OptionsUpdate, Session, SorterError, TransportError};

// Kept in its own test binary: it mutates the process environment.
#[tokio::test]
async fn missing_api_key_is_a_transport_configuration_error() {
    std::env::remove_var("SORTER_API_KEY");

    let err = Session::from_env(OptionsUpdate::new()).await.unwrap_err();
    assert_eq!(err.code(), "config_error");
    assert!(
        matches!(err, SorterError::Transport(TransportError::Config(ref msg)) if msg.contains("SORTER_API_KEY")),
        "{err:?}"
    );
}
