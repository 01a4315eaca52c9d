use std::sync::Arc;

use poem_openapi::{
    OpenApi,
    param::{Path, Query},
    payload::Json,
};

use business::application::product::form::ProductFormController;
use business::application::product::synchronizer::ProductSynchronizer;
use business::domain::product::filter::ProductFilter;
use business::domain::product::use_cases::create::CreateProductParams;
use business::domain::product::use_cases::delete::{DeleteProductParams, DeleteProductUseCase};
use business::domain::product::use_cases::get_by_id::{
    GetProductByIdParams, GetProductByIdUseCase,
};
use business::domain::product::use_cases::update::UpdateProductParams;
use business::domain::product::value_objects::{ImageFile, ProductId};

use crate::api::error::{ErrorResponse, IntoErrorResponse};
use crate::api::product::dto::{
    CreateProductRequest, CreatedProductResponse, DeletedProductResponse, ImageUploadRequest,
    ProductResponse, UpdateProductRequest,
};
use crate::api::security::FirebaseBearer;
use crate::api::tags::ApiTags;

pub struct ProductApi {
    catalog: Arc<ProductSynchronizer>,
    filter: ProductFilter,
    form: Arc<ProductFormController>,
    get_by_id_use_case: Arc<dyn GetProductByIdUseCase>,
    delete_use_case: Arc<dyn DeleteProductUseCase>,
}

impl ProductApi {
    pub fn new(
        catalog: Arc<ProductSynchronizer>,
        filter: ProductFilter,
        form: Arc<ProductFormController>,
        get_by_id_use_case: Arc<dyn GetProductByIdUseCase>,
        delete_use_case: Arc<dyn DeleteProductUseCase>,
    ) -> Self {
        Self {
            catalog,
            filter,
            form,
            get_by_id_use_case,
            delete_use_case,
        }
    }
}

fn parse_id(raw: &str) -> Result<ProductId, Json<ErrorResponse>> {
    ProductId::parse(raw).map_err(|err| ErrorResponse::validation(&err.to_string()))
}

fn decode_image(image: Option<ImageUploadRequest>) -> Result<Option<ImageFile>, Json<ErrorResponse>> {
    image
        .map(|image| image.into_image().map_err(ErrorResponse::validation))
        .transpose()
}

/// Product catalog API
///
/// Reads are served from the synchronized catalog; writes go to the remote
/// store and show up in the catalog once the store echoes them back.
#[OpenApi]
impl ProductApi {
    /// List products
    ///
    /// Returns the synchronized catalog in store order, filtered by `q`
    /// (case-insensitive substring of the configured name fields).
    #[oai(path = "/products", method = "get", tag = "ApiTags::Products")]
    async fn list_products(
        &self,
        /// Search text; empty or absent returns every product
        q: Query<Option<String>>,
    ) -> Json<Vec<ProductResponse>> {
        let products = self.catalog.products();
        let query = q.0.unwrap_or_default();
        Json(
            self.filter
                .project(&products, &query)
                .into_iter()
                .map(ProductResponse::from)
                .collect(),
        )
    }

    /// Get a product by ID
    ///
    /// Reads the record straight from the store.
    #[oai(path = "/products/:id", method = "get", tag = "ApiTags::Products")]
    async fn get_product_by_id(&self, id: Path<String>) -> GetProductByIdResponse {
        let id = match parse_id(&id.0) {
            Ok(id) => id,
            Err(json) => return GetProductByIdResponse::BadRequest(json),
        };

        match self
            .get_by_id_use_case
            .execute(GetProductByIdParams { id })
            .await
        {
            Ok(product) => GetProductByIdResponse::Ok(Json(product.into())),
            Err(err) => {
                let (status, json) = err.into_error_response();
                match status.as_u16() {
                    404 => GetProductByIdResponse::NotFound(json),
                    _ => GetProductByIdResponse::InternalError(json),
                }
            }
        }
    }

    /// Create a product
    ///
    /// Uploads the image, then writes the record. The store assigns the id.
    #[oai(path = "/products", method = "post", tag = "ApiTags::Products")]
    async fn create_product(
        &self,
        auth: FirebaseBearer,
        body: Json<CreateProductRequest>,
    ) -> CreateProductResponse {
        let body = body.0;
        let image = match decode_image(body.image) {
            Ok(image) => image,
            Err(json) => return CreateProductResponse::BadRequest(json),
        };
        tracing::info!("User {} creating product {}", auth.0, body.name_th);

        let params = CreateProductParams {
            name_th: body.name_th,
            name_en: body.name_en,
            name_mm: body.name_mm,
            name_cn: body.name_cn,
            price: body.price,
            image,
        };

        match self.form.submit_create(&auth.0, params).await {
            Ok(id) => CreateProductResponse::Created(Json(CreatedProductResponse {
                id: id.to_string(),
            })),
            Err(err) => {
                let (status, json) = err.into_error_response();
                match status.as_u16() {
                    400 => CreateProductResponse::BadRequest(json),
                    409 => CreateProductResponse::Conflict(json),
                    502 => CreateProductResponse::BadGateway(json),
                    _ => CreateProductResponse::InternalError(json),
                }
            }
        }
    }

    /// Update a product
    ///
    /// Replaces the editable fields. A new image replaces the stored one.
    #[oai(path = "/products/:id", method = "put", tag = "ApiTags::Products")]
    async fn update_product(
        &self,
        auth: FirebaseBearer,
        id: Path<String>,
        body: Json<UpdateProductRequest>,
    ) -> UpdateProductResponse {
        let id = match parse_id(&id.0) {
            Ok(id) => id,
            Err(json) => return UpdateProductResponse::BadRequest(json),
        };
        let body = body.0;
        let image = match decode_image(body.image) {
            Ok(image) => image,
            Err(json) => return UpdateProductResponse::BadRequest(json),
        };
        tracing::info!("User {} updating product {}", auth.0, id);

        let params = UpdateProductParams {
            id,
            name_th: body.name_th,
            name_en: body.name_en,
            name_mm: body.name_mm,
            name_cn: body.name_cn,
            price: body.price,
            image,
        };

        match self.form.submit_update(&auth.0, params).await {
            Ok(product) => UpdateProductResponse::Ok(Json(product.into())),
            Err(err) => {
                let (status, json) = err.into_error_response();
                match status.as_u16() {
                    400 => UpdateProductResponse::BadRequest(json),
                    404 => UpdateProductResponse::NotFound(json),
                    409 => UpdateProductResponse::Conflict(json),
                    502 => UpdateProductResponse::BadGateway(json),
                    _ => UpdateProductResponse::InternalError(json),
                }
            }
        }
    }

    /// Delete a product
    ///
    /// Removes the record, then its image.
    #[oai(path = "/products/:id", method = "delete", tag = "ApiTags::Products")]
    async fn delete_product(&self, auth: FirebaseBearer, id: Path<String>) -> DeleteProductResponse {
        let id = match parse_id(&id.0) {
            Ok(id) => id,
            Err(json) => return DeleteProductResponse::BadRequest(json),
        };
        tracing::info!("User {} deleting product {}", auth.0, id);

        match self
            .delete_use_case
            .execute(DeleteProductParams { id: id.clone() })
            .await
        {
            Ok(outcome) => DeleteProductResponse::Ok(Json(DeletedProductResponse {
                id: id.to_string(),
                image_removed: outcome.image_removed,
            })),
            Err(err) => {
                let (status, json) = err.into_error_response();
                match status.as_u16() {
                    404 => DeleteProductResponse::NotFound(json),
                    _ => DeleteProductResponse::InternalError(json),
                }
            }
        }
    }
}

#[derive(poem_openapi::ApiResponse)]
pub enum GetProductByIdResponse {
    #[oai(status = 200)]
    Ok(Json<ProductResponse>),
    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),
    #[oai(status = 404)]
    NotFound(Json<ErrorResponse>),
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
}

#[derive(poem_openapi::ApiResponse)]
pub enum CreateProductResponse {
    #[oai(status = 201)]
    Created(Json<CreatedProductResponse>),
    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),
    #[oai(status = 409)]
    Conflict(Json<ErrorResponse>),
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
    #[oai(status = 502)]
    BadGateway(Json<ErrorResponse>),
}

#[derive(poem_openapi::ApiResponse)]
pub enum UpdateProductResponse {
    #[oai(status = 200)]
    Ok(Json<ProductResponse>),
    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),
    #[oai(status = 404)]
    NotFound(Json<ErrorResponse>),
    #[oai(status = 409)]
    Conflict(Json<ErrorResponse>),
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
    #[oai(status = 502)]
    BadGateway(Json<ErrorResponse>),
}

#[derive(poem_openapi::ApiResponse)]
pub enum DeleteProductResponse {
    #[oai(status = 200)]
    Ok(Json<DeletedProductResponse>),
    #[oai(status = 400)]
    BadRequest(Json<ErrorResponse>),
    #[oai(status = 404)]
    NotFound(Json<ErrorResponse>),
    #[oai(status = 500)]
    InternalError(Json<ErrorResponse>),
}
