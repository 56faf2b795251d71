use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    items::repo::{Item, ItemFields},
};

/// Body of `POST /items` and `PUT /items/:id`; every field is required.
#[derive(Debug, Default, Deserialize)]
pub struct ItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl ItemRequest {
    pub fn validate(self) -> Result<ItemFields, AppError> {
        let mut missing = Vec::new();
        let name = self.name.filter(|v| !v.trim().is_empty());
        let description = self.description.filter(|v| !v.trim().is_empty());
        let price = self.price.filter(|p| p.is_finite());
        if name.is_none() {
            missing.push("name");
        }
        if description.is_none() {
            missing.push("description");
        }
        if price.is_none() {
            missing.push("price");
        }
        match (name, description, price) {
            (Some(name), Some(description), Some(price)) => Ok(ItemFields {
                name,
                description,
                price,
            }),
            _ => Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

impl Pagination {
    /// `limit` and `offset` must be non-negative.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.limit.is_some_and(|l| l < 0) || self.offset < 0 {
            return Err(AppError::Validation(
                "limit and offset must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ItemMessageResponse {
    pub message: &'static str,
    pub item: Item,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub item: Item,
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<Item>,
}
