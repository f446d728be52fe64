use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::ProductVariant;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddWishlistRequest {
    pub product_variant_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WishlistVariantList {
    pub items: Vec<ProductVariant>,
}
