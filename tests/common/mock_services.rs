use actix_web::dev::ServerHandle;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use bytes::Bytes;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

/// Configuration for mock speech/translation behavior
#[derive(Clone, Debug)]
pub struct MockServicesConfig {
    pub recognition_status: String,
    pub display_text: String,
    /// `None` uppercases the input text; `Some` returns exactly these translations
    pub translations: Option<Vec<String>>,
    pub synthesis_audio: Vec<u8>,
    /// When set, every endpoint answers with this status and an error body
    pub fail_status: Option<u16>,
}

impl Default for MockServicesConfig {
    fn default() -> Self {
        Self {
            recognition_status: "Success".to_string(),
            display_text: "hello".to_string(),
            translations: None,
            synthesis_audio: b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec(),
            fail_status: None,
        }
    }
}

#[derive(Clone, Debug)]
#[allow(dead_code)]
pub struct RecordedRequest {
    pub path: String,
    pub query: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

pub struct MockState {
    config: Mutex<MockServicesConfig>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockState {
    fn record(&self, req: &HttpRequest, body: &Bytes) {
        let headers = req
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        self.requests.lock().unwrap().push(RecordedRequest {
            path: req.path().to_string(),
            query: req.query_string().to_string(),
            headers,
            body: body.clone(),
        });
    }

    fn config(&self) -> MockServicesConfig {
        self.config.lock().unwrap().clone()
    }
}

/// In-process stand-in for the recognition, translation and synthesis services
pub struct MockServices {
    pub url: String,
    state: web::Data<MockState>,
    handle: ServerHandle,
}

#[allow(dead_code)]
impl MockServices {
    pub async fn start(config: MockServicesConfig) -> std::io::Result<Self> {
        let state = web::Data::new(MockState {
            config: Mutex::new(config),
            requests: Mutex::new(Vec::new()),
        });
        let data = state.clone();

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route(
                    "/speech/recognition/conversation/cognitiveservices/v1",
                    web::post().to(recognition_handler),
                )
                .route("/translate", web::post().to(translation_handler))
                .route("/cognitiveservices/v1", web::post().to(synthesis_handler))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Ok(Self {
            url: format!("http://{}", addr),
            state,
            handle,
        })
    }

    pub fn set_config(&self, config: MockServicesConfig) {
        *self.state.config.lock().unwrap() = config;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub async fn stop(&self) {
        self.handle.stop(true).await;
    }
}

fn failure(status: u16) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(status)
        .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).body("mock failure")
}

async fn recognition_handler(
    req: HttpRequest,
    body: Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    state.record(&req, &body);
    let config = state.config();
    if let Some(status) = config.fail_status {
        return failure(status);
    }
    if config.recognition_status == "Success" {
        HttpResponse::Ok().json(json!({
            "RecognitionStatus": "Success",
            "DisplayText": config.display_text,
            "Offset": 0,
            "Duration": 10000000,
        }))
    } else {
        HttpResponse::Ok().json(json!({ "RecognitionStatus": config.recognition_status }))
    }
}

async fn translation_handler(
    req: HttpRequest,
    body: Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    state.record(&req, &body);
    let config = state.config();
    if let Some(status) = config.fail_status {
        return failure(status);
    }
    let inputs: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return HttpResponse::BadRequest().body("invalid json"),
    };
    let text = inputs[0]["Text"].as_str().unwrap_or_default().to_string();
    let translations = config
        .translations
        .unwrap_or_else(|| vec![text.to_uppercase()]);
    let translations: Vec<_> = translations
        .into_iter()
        .map(|t| json!({ "text": t, "to": "xx" }))
        .collect();
    HttpResponse::Ok().json(json!([{ "translations": translations }]))
}

async fn synthesis_handler(
    req: HttpRequest,
    body: Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    state.record(&req, &body);
    let config = state.config();
    if let Some(status) = config.fail_status {
        return failure(status);
    }
    HttpResponse::Ok()
        .content_type("audio/x-wav")
        .body(config.synthesis_audio)
}
