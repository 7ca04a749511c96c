use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    #[serde(default)]
    pub stock: i32,
    pub image_url: Option<String>,
    pub image_id: Option<String>,
    pub duration_from_days: i32,
    pub duration_to_days: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    pub image_url: Option<String>,
    pub image_id: Option<String>,
    pub duration_from_days: Option<i32>,
    pub duration_to_days: Option<i32>,
}
