//! Product catalog management.
//!
//! Create and update forms are multipart so photos upload with the rest of
//! the fields. Every image is checked before the first upload starts, and
//! nothing is written to the store unless all uploads succeed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use knotwork_core::ProductId;
use knotwork_core::rating::RatingAggregate;
use knotwork_storefront::db::ProductRepository;
use knotwork_storefront::models::Product;
use knotwork_storefront::models::catalog::{MAX_PRODUCT_IMAGES, MIN_PRODUCT_IMAGES};
use knotwork_storefront::services::image_host::ImageUpload;

use super::{AdminPage, MessageQuery, money, parse_price};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// A product row in the listing.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub original_price: Option<String>,
    pub in_stock: bool,
    pub image_url: Option<String>,
    pub image_count: usize,
    pub rating: String,
}

impl ProductRow {
    fn new(product: &Product, state: &AppState) -> Self {
        let currency = state.config().currency;
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.clone().unwrap_or_default(),
            price: money(product.price, currency),
            original_price: product
                .original_price
                .filter(|_| product.on_sale())
                .map(|p| money(p, currency)),
            in_stock: product.in_stock,
            image_url: product.cover_image().map(str::to_owned),
            image_count: product.images.len(),
            rating: format!(
                "{:.1} ({})",
                product.rating.average_rating, product.rating.ratings_count
            ),
        }
    }
}

/// Products listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: AdminPage,
    pub products: Vec<ProductRow>,
}

/// Values shown in the product form.
#[derive(Debug, Clone)]
pub struct ProductFormView {
    pub name: String,
    pub description: String,
    pub price: String,
    pub original_price: String,
    pub category: String,
    pub in_stock: bool,
    /// Images currently on the product (edit only).
    pub images: Vec<String>,
}

impl Default for ProductFormView {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            price: String::new(),
            original_price: String::new(),
            category: String::new(),
            in_stock: true,
            images: Vec::new(),
        }
    }
}

impl From<&Product> for ProductFormView {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            original_price: product
                .original_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            category: product.category.clone().unwrap_or_default(),
            in_stock: product.in_stock,
            images: product.images.clone(),
        }
    }
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: AdminPage,
    pub heading: &'static str,
    pub action: String,
    /// Whether at least one image must be chosen.
    pub images_required: bool,
    pub form: ProductFormView,
    pub min_images: usize,
    pub max_images: usize,
}

impl ProductFormTemplate {
    fn create(admin: CurrentAdmin, form: ProductFormView) -> Self {
        Self {
            page: AdminPage::new(admin, "/products"),
            heading: "New product",
            action: "/products".to_owned(),
            images_required: true,
            form,
            min_images: MIN_PRODUCT_IMAGES,
            max_images: MAX_PRODUCT_IMAGES,
        }
    }

    fn edit(admin: CurrentAdmin, id: &ProductId, form: ProductFormView) -> Self {
        Self {
            page: AdminPage::new(admin, "/products"),
            heading: "Edit product",
            action: format!("/products/{id}"),
            images_required: false,
            form,
            min_images: MIN_PRODUCT_IMAGES,
            max_images: MAX_PRODUCT_IMAGES,
        }
    }

    fn with_error(mut self, message: impl Into<String>) -> Self {
        self.page = self.page.with_error(message);
        self
    }
}

/// Submitted product fields, before validation.
#[derive(Debug, Default)]
pub struct ProductSubmission {
    pub name: String,
    pub description: String,
    pub price: String,
    pub original_price: String,
    pub category: String,
    pub in_stock: bool,
    pub images: Vec<ImageUpload>,
}

/// Validated product fields.
#[derive(Debug)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category: Option<String>,
    pub in_stock: bool,
}

impl ProductSubmission {
    /// Read the multipart body. Empty file inputs are skipped.
    async fn read(mut multipart: Multipart) -> std::result::Result<Self, MultipartError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            if name == "images" {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                submission.images.push(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "name" => submission.name = value,
                "description" => submission.description = value,
                "price" => submission.price = value,
                "original_price" => submission.original_price = value,
                "category" => submission.category = value,
                "in_stock" => submission.in_stock = true,
                _ => {}
            }
        }

        Ok(submission)
    }

    /// Check the fields and image count.
    ///
    /// With `editing` set, an empty image selection keeps the current images.
    fn validate(&self, editing: bool) -> std::result::Result<ProductInput, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Name is required.".to_owned());
        }

        let price = parse_price(&self.price).ok_or("Price must be a positive number.")?;

        let original_price = if self.original_price.trim().is_empty() {
            None
        } else {
            Some(
                parse_price(&self.original_price)
                    .ok_or("Original price must be a positive number.")?,
            )
        };

        let keeps_existing = editing && self.images.is_empty();
        if !keeps_existing
            && !(MIN_PRODUCT_IMAGES..=MAX_PRODUCT_IMAGES).contains(&self.images.len())
        {
            return Err(format!(
                "Choose between {MIN_PRODUCT_IMAGES} and {MAX_PRODUCT_IMAGES} images."
            ));
        }
        for image in &self.images {
            image.validate().map_err(|e| format!("Image rejected: {e}."))?;
        }

        let category = self.category.trim();
        Ok(ProductInput {
            name: name.to_owned(),
            description: self.description.trim().to_owned(),
            price,
            original_price,
            category: (!category.is_empty()).then(|| category.to_owned()),
            in_stock: self.in_stock,
        })
    }

    fn to_view(&self, images: Vec<String>) -> ProductFormView {
        ProductFormView {
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price.clone(),
            original_price: self.original_price.clone(),
            category: self.category.clone(),
            in_stock: self.in_stock,
            images,
        }
    }
}

/// Upload every image, stopping at the first failure.
async fn upload_all(
    state: &AppState,
    images: Vec<ImageUpload>,
) -> std::result::Result<Vec<String>, String> {
    let Some(client) = state.images() else {
        return Err("Image uploads are not configured.".to_owned());
    };

    let mut urls = Vec::with_capacity(images.len());
    for image in images {
        let file_name = image.file_name.clone();
        match client.upload(image).await {
            Ok(url) => urls.push(url),
            Err(e) => {
                tracing::error!(error = %e, file = %file_name, "Image upload failed");
                return Err(format!("Uploading {file_name} failed. Nothing was saved."));
            }
        }
    }
    Ok(urls)
}

fn bad_multipart(e: &MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid form data: {e}"))
}

/// List every product.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<ProductsIndexTemplate> {
    let products = ProductRepository::new(state.store()).list().await?;

    Ok(ProductsIndexTemplate {
        page: AdminPage::new(admin, "/products").with_messages(&query),
        products: products.iter().map(|p| ProductRow::new(p, &state)).collect(),
    })
}

/// Empty create form.
#[instrument(skip(admin))]
pub async fn new_form(RequireAdminAuth(admin): RequireAdminAuth) -> ProductFormTemplate {
    ProductFormTemplate::create(admin, ProductFormView::default())
}

/// Create a product.
#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response> {
    let submission = ProductSubmission::read(multipart)
        .await
        .map_err(|e| bad_multipart(&e))?;

    let input = match submission.validate(false) {
        Ok(input) => input,
        Err(message) => {
            let view = submission.to_view(Vec::new());
            return Ok(ProductFormTemplate::create(admin, view)
                .with_error(message)
                .into_response());
        }
    };

    let view = submission.to_view(Vec::new());
    let images = match upload_all(&state, submission.images).await {
        Ok(urls) => urls,
        Err(message) => {
            return Ok(ProductFormTemplate::create(admin, view)
                .with_error(message)
                .into_response());
        }
    };

    let product = Product {
        id: ProductId::generate(),
        name: input.name,
        description: input.description,
        price: input.price,
        original_price: input.original_price,
        images,
        category: input.category,
        in_stock: input.in_stock,
        rating: RatingAggregate::default(),
        created_at: Utc::now(),
    };
    ProductRepository::new(state.store()).save(&product).await?;
    tracing::info!(product_id = %product.id, "Product created");

    Ok(Redirect::to("/products?success=product_saved").into_response())
}

/// Edit form for an existing product.
#[instrument(skip(admin, state))]
pub async fn edit_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ProductFormTemplate> {
    let id = ProductId::new(id);
    let product = ProductRepository::new(state.store())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductFormTemplate::edit(admin, &id, ProductFormView::from(&product)))
}

/// Update a product. New images replace the whole set; none keeps it.
#[instrument(skip_all, fields(admin = %admin.email, product_id = %id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response> {
    let id = ProductId::new(id);
    let repo = ProductRepository::new(state.store());
    let Some(existing) = repo.get(&id).await? else {
        return Ok(Redirect::to("/products?error=not_found").into_response());
    };

    let submission = ProductSubmission::read(multipart)
        .await
        .map_err(|e| bad_multipart(&e))?;

    let view = submission.to_view(existing.images.clone());
    let input = match submission.validate(true) {
        Ok(input) => input,
        Err(message) => {
            return Ok(ProductFormTemplate::edit(admin, &id, view)
                .with_error(message)
                .into_response());
        }
    };

    let images = if submission.images.is_empty() {
        existing.images.clone()
    } else {
        match upload_all(&state, submission.images).await {
            Ok(urls) => urls,
            Err(message) => {
                return Ok(ProductFormTemplate::edit(admin, &id, view)
                    .with_error(message)
                    .into_response());
            }
        }
    };

    let product = Product {
        name: input.name,
        description: input.description,
        price: input.price,
        original_price: input.original_price,
        images,
        category: input.category,
        in_stock: input.in_stock,
        ..existing
    };
    repo.save(&product).await?;
    tracing::info!(product_id = %product.id, "Product updated");

    Ok(Redirect::to("/products?success=product_saved").into_response())
}

/// Delete a product.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    if ProductRepository::new(state.store()).delete(&id).await? {
        tracing::info!(product_id = %id, "Product deleted");
        Ok(Redirect::to("/products?success=product_deleted"))
    } else {
        Ok(Redirect::to("/products?error=not_found"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn image(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: name.to_owned(),
            content_type: "image/jpeg".to_owned(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    fn submission(images: usize) -> ProductSubmission {
        ProductSubmission {
            name: " Macrame cord ".to_owned(),
            description: "3mm cotton".to_owned(),
            price: "450".to_owned(),
            original_price: String::new(),
            category: "Cord".to_owned(),
            in_stock: true,
            images: (0..images).map(|i| image(&format!("{i}.jpg"))).collect(),
        }
    }

    #[test]
    fn test_create_needs_at_least_one_image() {
        let err = submission(0).validate(false).unwrap_err();
        assert!(err.contains("between 1 and 5"));
    }

    #[test]
    fn test_create_rejects_six_images() {
        assert!(submission(6).validate(false).is_err());
    }

    #[test]
    fn test_edit_without_images_keeps_existing() {
        let input = submission(0).validate(true);
        assert!(input.is_ok());
    }

    #[test]
    fn test_validate_trims_and_parses() {
        let Ok(input) = submission(2).validate(false) else {
            panic!("expected valid submission");
        };
        assert_eq!(input.name, "Macrame cord");
        assert_eq!(input.price, Decimal::new(450, 0));
        assert_eq!(input.original_price, None);
        assert_eq!(input.category.as_deref(), Some("Cord"));
    }

    #[test]
    fn test_rejects_non_image_upload() {
        let mut form = submission(1);
        form.images[0].content_type = "application/pdf".to_owned();
        let err = form.validate(false).unwrap_err();
        assert!(err.starts_with("Image rejected"));
    }

    #[test]
    fn test_rejects_bad_original_price() {
        let mut form = submission(1);
        form.original_price = "free".to_owned();
        assert!(form.validate(false).is_err());
    }
}
