use crate::app_state::AppState;
use crate::config::ServiceConfig;
use crate::error::PipelineError;
use crate::pipeline::TranslationJob;
use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, HttpServer, get, post, web};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::io::Write;

pub const AUDIO_FIELD: &str = "audio";
pub const LANGUAGE_FIELD: &str = "language";

#[get("/health")]
pub async fn health(_req: HttpRequest, _: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[get("/get_loads")]
pub async fn get_loads(_req: HttpRequest, app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(app_state.loads())
}

#[post("/translate")]
pub async fn translate(
    mut payload: Multipart,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, PipelineError> {
    let (audio, language) = read_upload(&mut payload, app_state.max_upload_bytes).await?;
    let job = TranslationJob::new(audio, language);
    let audio = app_state.translate(job).await?;
    Ok(HttpResponse::Ok().content_type("audio/wav").body(audio))
}

/// Collects the audio file and the optional target language from the form
async fn read_upload(
    payload: &mut Multipart,
    limit: usize,
) -> Result<(Bytes, Option<String>), PipelineError> {
    let mut audio = None;
    let mut language = None;

    while let Some(field) = payload.next().await {
        let mut field = field
            .map_err(|e| PipelineError::Validation(format!("malformed multipart body: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| PipelineError::Validation(format!("failed to read upload: {}", e)))?;
            if data.len() + chunk.len() > limit {
                return Err(PipelineError::Validation(format!(
                    "upload exceeds {} bytes",
                    limit
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            AUDIO_FIELD => audio = Some(data.freeze()),
            LANGUAGE_FIELD => {
                let value = String::from_utf8(data.to_vec()).map_err(|_| {
                    PipelineError::Validation("language must be valid UTF-8".to_string())
                })?;
                language = Some(value.trim().to_string());
            }
            other => log::debug!("Ignoring unexpected form field {:?}", other),
        }
    }

    let audio = audio.ok_or_else(|| {
        PipelineError::Validation(format!("missing '{}' file field", AUDIO_FIELD))
    })?;
    Ok((audio, language))
}

/// Registers every route; shared by the server and the integration tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(get_loads).service(translate);
}

pub async fn periodic_logging(app_state: AppState) {
    if app_state.log_interval == 0 {
        return std::future::pending().await;
    }
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(app_state.log_interval)).await;
        let stats = app_state.queue.stats();
        let pool = app_state.pipeline.synthesizers();
        log::info!(
            "Queue load: executing={}/{}, waiting={}",
            stats.executing,
            stats.limit,
            stats.waiting
        );
        log::info!(
            "Synthesis pool: size={}, policy={}, leased={}",
            pool.size(),
            pool.policy().as_str(),
            pool.leased()
        );
    }
}

pub fn init_logging(level: log::LevelFilter) {
    let _ = env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .try_init();
}

pub async fn startup(config: &ServiceConfig, app_state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);

    log::info!("Starting server at {}:{}", config.host, config.port);

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}

/// Builds all shared state, then serves until the server stops or Ctrl+C.
/// State construction happens before binding, so a bad configuration or a
/// failing pool entry never leaves a listener open.
pub async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let app_state = AppState::new(&config)?;

    tokio::select! {
        _ = periodic_logging(app_state.clone()) => {
            unreachable!()
        }
        res = startup(&config, app_state) => {
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("Received Ctrl+C, shutting down");
        }
    }
    Ok(())
}
