use std::{error::Error as _, process, sync::Arc};

use jobdesk::{
    application::{
        error::AppError,
        listings::ListingService,
        resume::{PdfLatexCompiler, ResumeService},
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        notion::NotionClient,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    // Missing .env is not an error.
    let _ = dotenvy::dotenv();

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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Compile(args) => run_compile(settings, args).await,
    }
}

fn build_resume_service(compiler: &config::CompilerSettings) -> Result<ResumeService, AppError> {
    ResumeService::new(
        Arc::new(PdfLatexCompiler::new(compiler.program.clone())),
        compiler.work_dir.clone(),
        compiler.timeout,
    )
    .map_err(|err| AppError::from(InfraError::work_dir(&compiler.work_dir, err)))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let notion = settings
        .notion
        .as_ref()
        .ok_or_else(|| InfraError::configuration("notion settings are not configured"))?;

    let store = Arc::new(NotionClient::new(notion)?);
    let state = HttpState {
        listings: Arc::new(ListingService::new(store)),
        resume: Arc::new(build_resume_service(&settings.compiler)?),
    };
    let router = http::build_router(state, settings.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "jobdesk::serve",
        addr = %settings.server.addr,
        work_dir = %settings.compiler.work_dir.display(),
        compiler = %settings.compiler.program.display(),
        "Server is running"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "jobdesk::serve", "Server stopped");
    Ok(())
}

async fn run_compile(
    settings: config::Settings,
    args: config::CompileArgs,
) -> Result<(), AppError> {
    let resume = build_resume_service(&settings.compiler)?;

    let markup = tokio::fs::read_to_string(&args.input)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let artifact = resume.compile(&markup).await.map_err(|err| {
        let mut message = format!("compilation failed at stage `{}`: {err}", err.stage().as_str());
        let mut source = err.source();
        while let Some(inner) = source {
            message.push_str(&format!(": {inner}"));
            source = inner.source();
        }
        AppError::unexpected(message)
    })?;

    tokio::fs::write(&args.output, &artifact.bytes)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "jobdesk::compile",
        input = %args.input.display(),
        output = %args.output.display(),
        bytes = artifact.bytes.len(),
        "PDF written"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "jobdesk::serve",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "jobdesk::serve", "Shutdown signal received");
}
