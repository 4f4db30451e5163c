use anyhow::{Context, Result};
use discovery_core::{find, Backend, Discovery, DiscoveryContext, DiscoveryError, MessageCatalog};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod metadata;

use config::{LogFormat, LookupTarget, Settings};
use metadata::ServiceMetadata;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    init_tracing(settings.log_format);

    let metadata = ServiceMetadata::from_package().with_service(settings.service_name.clone());
    info!(
        version = %metadata.version,
        description = %metadata.description,
        authors = %metadata.authors,
        service = metadata.service(),
        "Starting {}",
        metadata.name
    );

    let ctx = DiscoveryContext::new(MessageCatalog::default())
        .with_request_timeout(settings.http_timeout)
        .with_span(info_span!("discovery", backend = %settings.backend.kind));
    let backend = find(&settings.backend, ctx).context("failed to configure discovery backend")?;
    info!("Using discovery backend {}", backend.describe());

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, exiting...");
            signal.cancel();
        }
    });

    match backend.wait_with_cancel(&settings.wait, &shutdown).await {
        Ok(_) => info!("Discovery backend {} is ready", backend.describe()),
        Err(DiscoveryError::Cancelled) => return Ok(()),
        Err(e) => return Err(e.into()),
    }

    if let Some(registration) = &settings.registration {
        backend
            .register(
                metadata.service(),
                &registration.address,
                registration.port,
                registration.options.clone(),
            )
            .await
            .context("failed to register service")?;
        info!(
            "Registered {} at {}:{}",
            metadata.service(),
            registration.address,
            registration.port
        );
    }

    if settings.lookups.is_empty() {
        debug!("No services to look up, exiting");
        return Ok(());
    }

    // Periodic lookup loop
    loop {
        let count = discover_services(&backend, &settings.lookups).await;
        info!("Resolved {} of {} services", count, settings.lookups.len());

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn discover_services(backend: &Backend, targets: &[LookupTarget]) -> usize {
    let mut count = 0;

    for target in targets {
        match backend.lookup(&target.name, target.port).await {
            Ok(endpoints) => {
                let rendered: Vec<String> = endpoints.iter().map(ToString::to_string).collect();
                info!("{} -> [{}]", target.name, rendered.join(", "));
                count += 1;
            }
            Err(e) if e.is_not_found() => warn!("{}", e),
            Err(e) => error!("Error looking up {}: {}", target.name, e),
        }
    }

    count
}
