//! Response shapes of the admin dashboard.
//!
//! Every figure is a [`Metric`], so one failed query shows up as `ok: false` next to
//! the figures that did compute.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// The outcome of one dashboard query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metric<T> {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Metric<T> {
    pub fn value(value: T) -> Self {
        Self {
            ok: true,
            value: Some(value),
            error: None,
        }
    }

    /// Wraps a query result. Failures are logged in full and reported to the client
    /// under `name` only.
    pub fn from_result(name: &str, result: Result<T, AppError>) -> Self {
        match result {
            Ok(value) => Self::value(value),
            Err(err) => {
                tracing::warn!("Dashboard metric '{}' failed: {}", name, err);

                Self {
                    ok: false,
                    value: None,
                    error: Some(format!("Failed to compute {name}")),
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserStatsDto {
    pub total: Metric<u64>,
    pub active: Metric<u64>,
    pub inactive: Metric<u64>,
    pub new_today: Metric<u64>,
    pub new_this_week: Metric<u64>,
    pub new_this_month: Metric<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OrderStatsDto {
    pub total: Metric<u64>,
    pub pending: Metric<u64>,
    pub confirmed: Metric<u64>,
    pub shipped: Metric<u64>,
    pub delivered: Metric<u64>,
    pub cancelled: Metric<u64>,
    pub today: Metric<u64>,
    pub this_week: Metric<u64>,
    pub this_month: Metric<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProductStatsDto {
    pub total: Metric<u64>,
    pub discounted: Metric<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReviewStatsDto {
    pub total: Metric<u64>,
    pub this_month: Metric<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatsDto {
    pub users: UserStatsDto,
    pub orders: OrderStatsDto,
    pub products: ProductStatsDto,
    pub reviews: ReviewStatsDto,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SalesBucketDto {
    pub period: String,
    pub revenue: f64,
    pub orders: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserGrowthBucketDto {
    pub period: String,
    pub new_users: u64,
}

/// A time series over one bucket size (`day`, `week`, `month` or `year`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeriesDto<T> {
    pub period: String,
    pub data: Metric<Vec<T>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TopProductDto {
    pub product_id: String,
    /// `None` once the product has been deleted
    pub name: Option<String>,
    pub total_sold: i64,
    pub total_orders: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TopProductsDto {
    pub top_products: Metric<Vec<TopProductDto>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActivityDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub timestamp: String,
    pub data: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecentActivityDto {
    pub activities: Metric<Vec<ActivityDto>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AlertDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AlertChecksDto {
    pub old_pending_orders: Metric<u64>,
    pub inactive_users_recent_login: Metric<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AlertsDto {
    pub alerts: Vec<AlertDto>,
    pub total: usize,
    pub checks: AlertChecksDto,
    pub timestamp: String,
}
