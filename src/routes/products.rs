//! HTTP routes for the product catalog, cart and wishlist
//!
//! - GET    /product                 - list with filters (minPrice, maxPrice,
//!                                     minRating, name, page, perPage)
//! - GET    /product/:id             - fetch one product
//! - POST   /product/create          - create (seller only)
//! - PUT    /product/edit/:id        - update (owning seller only)
//! - DELETE /product/delete/:id      - delete (owning seller only)
//! - GET/POST/DELETE /product/cart[/:id]     - buyer cart
//! - GET/POST/DELETE /product/wishlist[/:id] - buyer wishlist
//!
//! The plural prefix /products/* is accepted as an alias.

use bson::{doc, DateTime, Document};
use hyper::{Method, Request, Response, StatusCode};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::schemas::{
    BuyerDoc, CartEntry, ProductDoc, BUYER_COLLECTION, PRODUCT_COLLECTION,
};
use crate::routes::{
    authenticate, cors_preflight, data_response, error_response, message_response,
    parse_json_body, parse_oid, path_segments, query_param, require_mongo, require_seller,
    BoxBody,
};
use crate::server::AppState;
use crate::types::{ApiError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub product_name: String,
    pub product_desc: String,
    pub product_price: f64,
    pub stock: i64,
    pub product_category: String,
    #[serde(default)]
    pub product_images: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProductRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_desc: Option<String>,
    #[serde(default)]
    pub product_price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub product_images: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub product_name: String,
    pub product_desc: String,
    pub product_price: f64,
    pub stock: i64,
    pub product_category: String,
    pub product_images: Vec<String>,
    pub avg_rating: f64,
    pub reviews: Vec<String>,
    pub seller_id: String,
}

impl From<ProductDoc> for ProductResponse {
    fn from(doc: ProductDoc) -> Self {
        Self {
            id: doc._id.map(|o| o.to_hex()).unwrap_or_default(),
            product_name: doc.product_name,
            product_desc: doc.product_desc,
            product_price: doc.product_price,
            stock: doc.stock,
            product_category: doc.product_category,
            product_images: doc.product_images,
            avg_rating: doc.avg_rating,
            reviews: doc.reviews,
            seller_id: doc.seller_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntryResponse {
    pub product_id: String,
    pub added_at: String,
}

impl From<CartEntry> for CartEntryResponse {
    fn from(entry: CartEntry) -> Self {
        Self {
            product_id: entry.product_id,
            added_at: entry.added_at.to_chrono().to_rfc3339(),
        }
    }
}

pub async fn handle_product_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path().to_string();
    let segments = path_segments(&path);

    if segments.first() != Some(&"product") && segments.first() != Some(&"products") {
        return None;
    }

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let method = req.method().clone();
    let rest: Vec<String> = segments[1..].iter().map(|s| s.to_string()).collect();
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    let response = match (&method, rest.as_slice()) {
        (&Method::GET, []) => handle_list(req, state).await,
        (&Method::POST, ["create"]) => handle_create(req, state).await,
        (&Method::PUT, ["edit", id]) => handle_edit(req, state, id).await,
        (&Method::DELETE, ["delete", id]) => handle_delete(req, state, id).await,

        (&Method::GET, ["cart"]) => handle_list_cart(req, state).await,
        (&Method::POST, ["cart", id]) => handle_cart_add(req, state, id).await,
        (&Method::DELETE, ["cart", id]) => handle_cart_remove(req, state, id).await,
        (&Method::DELETE, ["cart"]) => handle_cart_clear(req, state).await,

        (&Method::GET, ["wishlist"]) => handle_list_wishlist(req, state).await,
        (&Method::POST, ["wishlist", id]) => handle_wishlist_add(req, state, id).await,
        (&Method::DELETE, ["wishlist", id]) => handle_wishlist_remove(req, state, id).await,
        (&Method::DELETE, ["wishlist"]) => handle_wishlist_clear(req, state).await,

        (&Method::GET, [id]) => handle_get(req, state, id).await,

        _ => message_response(StatusCode::NOT_FOUND, "Product endpoint not found"),
    };

    Some(response)
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| ApiError::Validation(format!("Invalid {}: {}", name, value)))
}

async fn handle_list(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let result: Result<Vec<ProductResponse>> = async {
        let mut filter = Document::new();

        let mut price = Document::new();
        if let Some(v) = query_param(&req, "minPrice") {
            price.insert("$gte", parse_number::<f64>(v, "minPrice")?);
        }
        if let Some(v) = query_param(&req, "maxPrice") {
            price.insert("$lte", parse_number::<f64>(v, "maxPrice")?);
        }
        if !price.is_empty() {
            filter.insert("product_price", price);
        }

        if let Some(v) = query_param(&req, "minRating") {
            filter.insert("avg_rating", doc! { "$gte": parse_number::<f64>(v, "minRating")? });
        }

        if let Some(v) = query_param(&req, "name") {
            let name = urlencoding::decode(v)
                .map_err(|_| ApiError::Validation("Invalid name filter".into()))?;
            filter.insert("product_name", doc! { "$regex": name.as_ref(), "$options": "i" });
        }

        let page: u64 = match query_param(&req, "page") {
            Some(v) => parse_number(v, "page")?,
            None => 1,
        };
        let per_page: i64 = match query_param(&req, "perPage") {
            Some(v) => parse_number(v, "perPage")?,
            None => 20,
        };
        if page == 0 || per_page <= 0 {
            return Err(ApiError::Validation("page and perPage must be positive".into()));
        }

        let options = FindOptions::builder()
            .skip((page - 1) * per_page as u64)
            .limit(per_page)
            .build();

        let mongo = require_mongo(&state)?;
        let products = mongo
            .collection::<ProductDoc>(PRODUCT_COLLECTION)
            .await?;

        let found = products.find_many_with_options(filter, Some(options)).await?;
        if found.is_empty() {
            return Err(ApiError::NotFound("No items found".into()));
        }
        Ok(found.into_iter().map(ProductResponse::from).collect())
    }
    .await;

    match result {
        Ok(list) => data_response(
            StatusCode::OK,
            "Products found",
            serde_json::to_value(&list).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_get(
    _req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let result: Result<ProductResponse> = async {
        let mongo = require_mongo(&state)?;
        let products = mongo
            .collection::<ProductDoc>(PRODUCT_COLLECTION)
            .await?;
        let oid = parse_oid(id)?;
        products
            .find_one(doc! { "_id": oid })
            .await?
            .map(ProductResponse::from)
            .ok_or_else(|| ApiError::NotFound("Product not found".into()))
    }
    .await;

    match result {
        Ok(product) => data_response(
            StatusCode::OK,
            "Product found",
            serde_json::to_value(&product).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require_seller(&claims) {
        return error_response(&e);
    }

    let body: CreateProductRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<ProductResponse> = async {
        if body.product_name.trim().is_empty()
            || body.product_desc.trim().is_empty()
            || body.product_category.trim().is_empty()
        {
            return Err(ApiError::Validation(
                "Product name, description and category are required".into(),
            ));
        }
        if body.product_price <= 0.0 {
            return Err(ApiError::Validation("Product price must be positive".into()));
        }
        if body.stock < 0 {
            return Err(ApiError::Validation("Stock cannot be negative".into()));
        }

        let mongo = require_mongo(&state)?;
        let products = mongo
            .collection::<ProductDoc>(PRODUCT_COLLECTION)
            .await?;

        let mut product = ProductDoc {
            product_name: body.product_name.trim().to_string(),
            product_desc: body.product_desc.trim().to_string(),
            product_price: body.product_price,
            stock: body.stock,
            product_category: body.product_category.trim().to_string(),
            product_images: body.product_images,
            seller_id: claims.sub.clone(),
            ..Default::default()
        };
        let oid = products.insert_one(product.clone()).await?;
        product._id = Some(oid);

        Ok(ProductResponse::from(product))
    }
    .await;

    match result {
        Ok(product) => data_response(
            StatusCode::CREATED,
            "Product created",
            serde_json::to_value(&product).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_edit(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require_seller(&claims) {
        return error_response(&e);
    }

    let body: EditProductRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let products = mongo
            .collection::<ProductDoc>(PRODUCT_COLLECTION)
            .await?;
        let oid = parse_oid(id)?;

        let product = products
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
        if product.seller_id != claims.sub {
            return Err(ApiError::Forbidden(
                "You can only edit your own products".into(),
            ));
        }

        let mut set = doc! { "metadata.updated_at": DateTime::now() };
        if let Some(name) = &body.product_name {
            if name.trim().is_empty() {
                return Err(ApiError::Validation("Product name cannot be empty".into()));
            }
            set.insert("product_name", name.trim());
        }
        if let Some(desc) = &body.product_desc {
            set.insert("product_desc", desc.trim());
        }
        if let Some(price) = body.product_price {
            if price <= 0.0 {
                return Err(ApiError::Validation("Product price must be positive".into()));
            }
            set.insert("product_price", price);
        }
        if let Some(stock) = body.stock {
            if stock < 0 {
                return Err(ApiError::Validation("Stock cannot be negative".into()));
            }
            set.insert("stock", stock);
        }
        if let Some(category) = &body.product_category {
            set.insert("product_category", category.trim());
        }
        if let Some(images) = &body.product_images {
            set.insert("product_images", images.clone());
        }

        products
            .update_one(doc! { "_id": oid }, doc! { "$set": set })
            .await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Product updated"),
        Err(e) => error_response(&e),
    }
}

async fn handle_delete(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = require_seller(&claims) {
        return error_response(&e);
    }

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let products = mongo
            .collection::<ProductDoc>(PRODUCT_COLLECTION)
            .await?;
        let oid = parse_oid(id)?;

        let product = products
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
        if product.seller_id != claims.sub {
            return Err(ApiError::Forbidden(
                "You can only delete your own products".into(),
            ));
        }

        products.soft_delete(doc! { "_id": oid }).await?;
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Product deleted"),
        Err(e) => error_response(&e),
    }
}

// === Cart ===

async fn fetch_buyer(state: &AppState, buyer_id: &str) -> Result<BuyerDoc> {
    let mongo = require_mongo(state)?;
    let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
    let oid = parse_oid(buyer_id)?;
    buyers
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

async fn ensure_product_exists(state: &AppState, product_id: &str) -> Result<()> {
    let mongo = require_mongo(state)?;
    let products = mongo
        .collection::<ProductDoc>(PRODUCT_COLLECTION)
        .await?;
    let oid = parse_oid(product_id)?;
    products
        .find_one(doc! { "_id": oid })
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}

async fn handle_list_cart(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match fetch_buyer(&state, &claims.sub).await {
        Ok(buyer) => {
            let cart: Vec<CartEntryResponse> =
                buyer.cart.into_iter().map(CartEntryResponse::from).collect();
            data_response(
                StatusCode::OK,
                "Cart found",
                serde_json::to_value(&cart).unwrap_or_default(),
            )
        }
        Err(e) => error_response(&e),
    }
}

async fn handle_cart_add(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    product_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        ensure_product_exists(&state, product_id).await?;

        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let buyer_oid = parse_oid(&claims.sub)?;

        // Absence precondition keeps duplicate adds out atomically
        let filter = doc! { "_id": buyer_oid, "cart.product_id": { "$ne": product_id } };
        let update = doc! {
            "$push": { "cart": { "product_id": product_id, "added_at": DateTime::now() } },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        let updated = buyers.update_one(filter, update).await?;
        if updated.matched_count == 0 {
            fetch_buyer(&state, &claims.sub).await?;
            return Err(ApiError::Conflict("Product already in cart".into()));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Product added to cart"),
        Err(e) => error_response(&e),
    }
}

async fn handle_cart_remove(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    product_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let buyer_oid = parse_oid(&claims.sub)?;

        let filter = doc! { "_id": buyer_oid, "cart.product_id": product_id };
        let update = doc! {
            "$pull": { "cart": { "product_id": product_id } },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        let updated = buyers.update_one(filter, update).await?;
        if updated.matched_count == 0 {
            fetch_buyer(&state, &claims.sub).await?;
            return Err(ApiError::NotFound("Product not found in cart".into()));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Product removed from cart"),
        Err(e) => error_response(&e),
    }
}

async fn handle_cart_clear(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let buyer_oid = parse_oid(&claims.sub)?;

        let update = doc! {
            "$set": { "cart": [], "metadata.updated_at": DateTime::now() },
        };
        let updated = buyers.update_one(doc! { "_id": buyer_oid }, update).await?;
        if updated.matched_count == 0 {
            return Err(ApiError::NotFound("User not found".into()));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Cart cleared"),
        Err(e) => error_response(&e),
    }
}

// === Wishlist ===

async fn handle_list_wishlist(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match fetch_buyer(&state, &claims.sub).await {
        Ok(buyer) => data_response(
            StatusCode::OK,
            "Wishlist found",
            serde_json::to_value(&buyer.wishlist).unwrap_or_default(),
        ),
        Err(e) => error_response(&e),
    }
}

async fn handle_wishlist_add(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    product_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        ensure_product_exists(&state, product_id).await?;

        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let buyer_oid = parse_oid(&claims.sub)?;

        let filter = doc! { "_id": buyer_oid, "wishlist": { "$ne": product_id } };
        let update = doc! {
            "$addToSet": { "wishlist": product_id },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        let updated = buyers.update_one(filter, update).await?;
        if updated.matched_count == 0 {
            fetch_buyer(&state, &claims.sub).await?;
            return Err(ApiError::Conflict("Product already in wishlist".into()));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Product added to wishlist"),
        Err(e) => error_response(&e),
    }
}

async fn handle_wishlist_remove(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    product_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let buyer_oid = parse_oid(&claims.sub)?;

        let filter = doc! { "_id": buyer_oid, "wishlist": product_id };
        let update = doc! {
            "$pull": { "wishlist": product_id },
            "$set": { "metadata.updated_at": DateTime::now() },
        };
        let updated = buyers.update_one(filter, update).await?;
        if updated.matched_count == 0 {
            fetch_buyer(&state, &claims.sub).await?;
            return Err(ApiError::NotFound("Product not found in wishlist".into()));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Product removed from wishlist"),
        Err(e) => error_response(&e),
    }
}

async fn handle_wishlist_clear(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let result: Result<()> = async {
        let mongo = require_mongo(&state)?;
        let buyers = mongo.collection::<BuyerDoc>(BUYER_COLLECTION).await?;
        let buyer_oid = parse_oid(&claims.sub)?;

        let update = doc! {
            "$set": { "wishlist": [], "metadata.updated_at": DateTime::now() },
        };
        let updated = buyers.update_one(doc! { "_id": buyer_oid }, update).await?;
        if updated.matched_count == 0 {
            return Err(ApiError::NotFound("User not found".into()));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => message_response(StatusCode::OK, "Wishlist cleared"),
        Err(e) => error_response(&e),
    }
}
