use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use dadpars::config::Config;
use dadpars::openapi::ApiDoc;
use dadpars::rate_limit::{InMemoryRateLimiter, RateLimiterFacade};
use dadpars::repo;
use dadpars::{config, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = Config::from_env()?;
    info!("Bootstrapping dadpars server");
    info!(frontend = cfg.frontend_url.as_deref().unwrap_or("-"), hsts = cfg.enable_hsts, "configuration loaded");

    let repo = repo::from_config(&cfg).await?;
    let rate_limiter = RateLimiterFacade::new(InMemoryRateLimiter::new(cfg.rate_limit_enabled), cfg.rate_limit.clone());
    let state = web::Data::new(AppState {
        repo,
        jwt_secret: cfg.jwt_secret.clone(),
        rate_limiter: Some(rate_limiter),
    });

    let openapi = ApiDoc::openapi();
    let frontend_url = cfg.frontend_url.clone();
    let security = SecurityHeaders::from_env().with_hsts(cfg.enable_hsts);

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .allow_any_header()
            .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
            .max_age(3600);
        if let Some(front) = &frontend_url {
            cors = cors.allowed_origin(front);
        }

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(state.clone())
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&cfg.bind_addr)?;

    info!("Listening on http://{}", cfg.bind_addr);
    server.run().await?;
    Ok(())
}
