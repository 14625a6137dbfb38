mod common;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use common::mock_services::{MockServices, MockServicesConfig};
use common::{free_port, multipart_body, service_config};
use speech_relay_rs::app_state::AppState;
use speech_relay_rs::client_pool::PoolError;
use speech_relay_rs::server::{configure, run};
use std::time::Duration;

#[actix_web::test]
async fn test_end_to_end_through_http_adapters() {
    let mock = MockServices::start(MockServicesConfig::default()).await.unwrap();
    let config = service_config(&mock.url, free_port());
    let state = AppState::new(&config).unwrap();
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

    let (content_type, body) = multipart_body(Some(&b"RIFF....WAVEfmt "[..]), Some("fr-FR"));
    let req = test::TestRequest::post()
        .uri("/translate")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let audio = test::read_body(resp).await;
    assert!(audio.starts_with(b"RIFF"));

    let paths: Vec<String> = mock.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec![
            "/speech/recognition/conversation/cognitiveservices/v1".to_string(),
            "/translate".to_string(),
            "/cognitiveservices/v1".to_string(),
        ]
    );
    let translate = &mock.requests_to("/translate")[0];
    assert!(translate.query.split('&').any(|pair| pair == "to=fr"));
    let ssml = mock.requests_to("/cognitiveservices/v1")[0].body.clone();
    let ssml = String::from_utf8(ssml.to_vec()).unwrap();
    assert!(ssml.contains("HELLO"));
    assert!(ssml.contains("xml:lang='fr-FR'"));
    assert!(ssml.contains("name='en-US-JennyMultilingualNeural'"));

    mock.stop().await;
}

#[actix_web::test]
async fn test_empty_translation_list_surfaces_as_translation_failure() {
    let mock = MockServices::start(MockServicesConfig {
        translations: Some(Vec::new()),
        ..Default::default()
    })
    .await
    .unwrap();
    let config = service_config(&mock.url, free_port());
    let state = AppState::new(&config).unwrap();
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

    let (content_type, body) = multipart_body(Some(&b"RIFF"[..]), Some("de-DE"));
    let req = test::TestRequest::post()
        .uri("/translate")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("translation failed"));
    assert!(mock.requests_to("/cognitiveservices/v1").is_empty());

    mock.stop().await;
}

#[actix_web::test]
async fn test_pool_construction_failure_aborts_state() {
    let mut config = service_config("http://127.0.0.1:9", free_port());
    config.synthesis_voice = String::new();

    let err = AppState::new(&config).unwrap_err();
    let pool_err = err.downcast_ref::<PoolError>().expect("pool error");
    assert!(matches!(pool_err, PoolError::Construct { index: 0, .. }));
}

#[actix_web::test]
async fn test_startup_fails_fast_without_binding() {
    let port = free_port();
    let mut config = service_config("http://127.0.0.1:9", port);
    config.synthesis_voice = " ".to_string();

    let result = tokio::time::timeout(Duration::from_secs(5), run(config))
        .await
        .expect("startup should not hang");
    assert!(result.is_err());

    // nothing was left listening on the configured port
    std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
}

#[actix_web::test]
async fn test_invalid_config_fails_fast() {
    let mut config = service_config("http://127.0.0.1:9", free_port());
    config.queue_concurrency = 0;
    assert!(AppState::new(&config).is_err());
}
