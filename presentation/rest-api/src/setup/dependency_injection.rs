use std::sync::Arc;

use anyhow::Context;

use logger::TracingLogger;

use firebase::client::FirebaseClient;
use firebase::realtime::repository::ProductRepositoryFirebase;
use firebase::storage::ImageStorageFirebase;
use imaging::compressor::RasterImageCompressor;
use memory::image_storage::InMemoryImageStorage;
use memory::product_store::InMemoryProductStore;

use business::application::product::create::CreateProductUseCaseImpl;
use business::application::product::delete::DeleteProductUseCaseImpl;
use business::application::product::form::ProductFormController;
use business::application::product::get_by_id::GetProductByIdUseCaseImpl;
use business::application::product::image_upload::ImageUploader;
use business::application::product::synchronizer::{ProductSynchronizer, SyncOptions};
use business::application::product::update::UpdateProductUseCaseImpl;
use business::domain::logger::Logger;
use business::domain::product::filter::ProductFilter;
use business::domain::product::repository::ProductRepository;
use business::domain::product::services::{CompressionOptions, ImageStorage};

use crate::api::product::live::LiveCatalog;
use crate::api::security::FirebaseTokenVerifier;
use crate::config::app_config::AppConfig;
use crate::config::catalog_config::CatalogBackend;

pub struct DependencyContainer {
    pub health_api: crate::api::health::routes::Api,
    pub product_api: crate::api::product::routes::ProductApi,
    pub synchronizer: Arc<ProductSynchronizer>,
    pub verifier: Arc<FirebaseTokenVerifier>,
    pub live: Arc<LiveCatalog>,
}

fn component_logger(component: &'static str) -> Arc<dyn Logger> {
    Arc::new(TracingLogger::for_component(component))
}

impl DependencyContainer {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        // Infrastructure adapters
        let repository: Arc<dyn ProductRepository>;
        let storage: Arc<dyn ImageStorage>;
        match config.catalog.backend {
            CatalogBackend::Firebase => {
                let (database_url, bucket) = config.firebase.backend_endpoints()?;
                let client = Arc::new(
                    FirebaseClient::new(
                        database_url,
                        bucket,
                        config.firebase.auth_token.clone(),
                        config.firebase.request_timeout,
                    )
                    .context("Failed to build Firebase HTTP client")?,
                );
                repository = Arc::new(ProductRepositoryFirebase::new(
                    client.clone(),
                    component_logger("firebase_database"),
                ));
                storage = Arc::new(ImageStorageFirebase::new(
                    client,
                    component_logger("firebase_storage"),
                ));
            }
            CatalogBackend::Memory => {
                tracing::warn!("Using the in-memory catalog backend; data is lost on restart");
                repository = Arc::new(InMemoryProductStore::new());
                storage = Arc::new(InMemoryImageStorage::new());
            }
        }

        let uploader = Arc::new(ImageUploader {
            compressor: Arc::new(RasterImageCompressor),
            storage,
            options: CompressionOptions {
                max_size_bytes: config.catalog.max_image_bytes,
                ..CompressionOptions::default()
            },
            logger: component_logger("image_upload"),
        });

        // Product use cases
        let create_use_case = Arc::new(CreateProductUseCaseImpl {
            repository: repository.clone(),
            uploader: uploader.clone(),
            logger: component_logger("create_product"),
        });
        let update_use_case = Arc::new(UpdateProductUseCaseImpl {
            repository: repository.clone(),
            uploader: uploader.clone(),
            logger: component_logger("update_product"),
        });
        let get_by_id_use_case = Arc::new(GetProductByIdUseCaseImpl {
            repository: repository.clone(),
            logger: component_logger("get_product"),
        });
        let delete_use_case = Arc::new(DeleteProductUseCaseImpl {
            repository: repository.clone(),
            uploader,
            logger: component_logger("delete_product"),
        });
        let form = Arc::new(ProductFormController::new(
            create_use_case,
            update_use_case,
            component_logger("product_form"),
        ));

        // Catalog synchronization
        let synchronizer = Arc::new(ProductSynchronizer::new(
            repository,
            component_logger("synchronizer"),
            SyncOptions {
                resubscribe_delay: config.catalog.resubscribe_delay,
            },
        ));
        synchronizer.activate().await?;

        let filter = ProductFilter::new(config.catalog.filter_fields.clone());
        let verifier = Arc::new(
            FirebaseTokenVerifier::new(&config.firebase.project_id, config.firebase.request_timeout)
                .context("Failed to build token verifier HTTP client")?,
        );
        let live = Arc::new(LiveCatalog {
            catalog: synchronizer.clone(),
            form: form.clone(),
            filter: filter.clone(),
            debounce_window: config.catalog.filter_debounce,
        });

        let health_api = crate::api::health::routes::Api::new(synchronizer.clone());
        let product_api = crate::api::product::routes::ProductApi::new(
            synchronizer.clone(),
            filter,
            form,
            get_by_id_use_case,
            delete_use_case,
        );

        Ok(Self {
            health_api,
            product_api,
            synchronizer,
            verifier,
            live,
        })
    }
}
