use std::time::Duration;

use poem::{
    EndpointExt, Route, Server as PoemServer, get, listener::TcpListener, middleware::Tracing,
};
use poem_openapi::OpenApiService;

use crate::api::product::live::live_catalog;
use crate::{config::app_config::AppConfig, setup::dependency_injection::DependencyContainer};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub struct Server;

impl Server {
    pub async fn run(config: AppConfig, container: DependencyContainer) -> anyhow::Result<()> {
        let addr = config.server.bind_address();
        let api_service = OpenApiService::new(
            (container.health_api, container.product_api),
            "Product Catalog Admin API",
            env!("CARGO_PKG_VERSION"),
        )
        .server(format!("http://{}", addr));
        let ui = api_service.swagger_ui();
        let spec = api_service.spec_endpoint();
        let app = Route::new()
            .at("/products/live", get(live_catalog))
            .nest("/", api_service)
            .nest("/docs", ui)
            .nest("/openapi.json", spec)
            .data(container.verifier)
            .data(container.live)
            .with(config.cors)
            .with(Tracing);

        tracing::info!("Server running at http://{}", addr);
        tracing::info!("Swagger UI at http://{}/docs", addr);
        tracing::info!("OpenAPI JSON at http://{}/openapi.json", addr);

        let result = PoemServer::new(TcpListener::bind(&addr))
            .run_with_graceful_shutdown(
                app,
                async {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        tracing::error!("Could not listen for shutdown signal: {err}");
                    }
                    tracing::info!("Shutdown requested");
                },
                Some(SHUTDOWN_GRACE),
            )
            .await;

        container.synchronizer.deactivate();
        result?;
        Ok(())
    }
}
