use std::{future::IntoFuture, io::Write, process, sync::Arc};

use boardcache::{
    application::{error::AppError, markup::MarkupRenderer, repos::ThreadsRepo},
    cache::{CacheConfig, CachedView, Frontends, Key, ViewCache},
    config,
    domain::board::BoardScope,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    presentation::views::TemplateRenderer,
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repo = init_repository(&settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let renderer: Arc<dyn MarkupRenderer> = Arc::new(TemplateRenderer);

    let state = HttpState {
        cache: ViewCache::new(&cache_config),
        frontends: Frontends::new(Arc::clone(&repo), Some(renderer), &cache_config),
        repo,
    };

    serve_http(&settings, state).await
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let repo = init_repository(&settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let renderer = args
        .html
        .then(|| Arc::new(TemplateRenderer) as Arc<dyn MarkupRenderer>);

    let cache = ViewCache::new(&cache_config);
    let frontends = Frontends::new(repo, renderer, &cache_config);

    let view = match (args.thread, args.board.as_deref()) {
        (Some(id), _) => {
            cache
                .fetch_or_build(Key::thread(id, args.last), frontends.thread.clone())
                .await?
        }
        (None, Some(board)) => {
            let scope: BoardScope = board.parse()?;
            if args.catalog {
                cache
                    .fetch_or_build(Key::catalog(scope), frontends.catalog.clone())
                    .await?
            } else {
                cache
                    .fetch_or_build(
                        Key::board_page(scope, args.page),
                        frontends.board_page.clone(),
                    )
                    .await?
            }
        }
        (None, None) => return Err(AppError::validation("either --thread or --board is required")),
    };

    write_view(&view, args.html)
}

fn write_view(view: &CachedView, html: bool) -> Result<(), AppError> {
    let body = if html {
        view.markup()
            .ok_or_else(|| AppError::unexpected("view was built without markup"))?
    } else {
        view.encoded()
    };

    write_stdout(body).map_err(|err| AppError::from(InfraError::from(err)))
}

fn write_stdout(body: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(body)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

async fn init_repository(settings: &config::Settings) -> Result<Arc<dyn ThreadsRepo>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        if stop_rx.wait_for(|stopped| *stopped).await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(grace_secs = grace.as_secs(), "connections still open after grace period");
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
