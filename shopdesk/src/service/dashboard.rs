//! Read-only reporting over orders, users, products and reviews.
//!
//! Counts are delegated to the store; time series and rankings are grouped in process
//! so that both backends produce identical numbers.

use std::collections::{BTreeMap, HashMap};

use bson::{Bson, Document as BsonDocument, Uuid};
use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, SecondsFormat, Utc};
use serde_json::Value;
use shopdesk_store::{
    document::{Document, DocumentExt, uuid_from_bson},
    error::DocumentStoreError,
    flex::FlexFloat,
    query::{Expr, Filter, Query, SortDirection},
    store::DynDocumentStore,
};

use crate::{
    error::AppError,
    model::{
        account::User,
        dashboard::{
            ActivityDto, AlertChecksDto, AlertDto, AlertsDto, Metric, OrderStatsDto, ProductStatsDto,
            RecentActivityDto, ReviewStatsDto, SalesBucketDto, SeriesDto, StatsDto, TopProductDto,
            TopProductsDto, UserGrowthBucketDto, UserStatsDto,
        },
    },
    resource::catalogue::{ORDERS, PRODUCTS, REVIEWS},
    state::AppState,
};

/// Largest `limit` accepted by the ranking and activity endpoints.
pub const MAX_DASHBOARD_LIMIT: usize = 100;

/// Orders pending longer than this raise an alert.
const STALE_PENDING_DAYS: i64 = 7;

/// Inactive users who logged in within this many days raise an alert.
const RECENT_LOGIN_DAYS: i64 = 30;

fn bson_time(value: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_chrono(value)
}

fn rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a `limit` query value, defaulting to `default` and clamping to
/// [`MAX_DASHBOARD_LIMIT`].
pub fn clamp_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
        .min(MAX_DASHBOARD_LIMIT)
}

/// Start of the reporting windows containing `now`, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    pub today: DateTime<Utc>,
    /// Weeks start on Sunday.
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
}

impl Windows {
    pub fn containing(now: DateTime<Utc>) -> Self {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();

        Self {
            today,
            week: today - Duration::days(i64::from(now.weekday().num_days_from_sunday())),
            month: today - Duration::days(i64::from(now.day0())),
        }
    }
}

/// Bucket size of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    /// Reads `?period=`; anything unrecognized means [`Period::Month`].
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("day") => Period::Day,
            Some("week") => Period::Week,
            Some("year") => Period::Year,
            _ => Period::Month,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    /// `strftime` pattern naming the bucket a timestamp falls in.
    pub fn bucket_format(self) -> &'static str {
        match self {
            Period::Day => "%Y-%m-%d",
            Period::Week => "%Y-%U",
            Period::Month => "%Y-%m",
            Period::Year => "%Y",
        }
    }

    /// Start of the reported window: 30 days, 12 weeks, 12 months or 3 years back.
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months_back = |months: u32, days: i64| {
            now.checked_sub_months(Months::new(months))
                .unwrap_or(now - Duration::days(days))
        };

        match self {
            Period::Day => now - Duration::days(30),
            Period::Week => now - Duration::weeks(12),
            Period::Month => months_back(12, 365),
            Period::Year => months_back(36, 3 * 365),
        }
    }

    pub fn bucket(self, at: DateTime<Utc>) -> String {
        at.format(self.bucket_format()).to_string()
    }
}

fn created_at(document: &BsonDocument) -> Option<DateTime<Utc>> {
    match document.get("created_at") {
        Some(Bson::DateTime(value)) => Some(value.to_chrono()),
        _ => None,
    }
}

fn documents(items: Vec<Bson>) -> impl Iterator<Item = BsonDocument> {
    items.into_iter().filter_map(|item| match item {
        Bson::Document(document) => Some(document),
        _ => None,
    })
}

/// Groups orders into buckets of `period`, summing `total_amount` through the numeric codec.
pub fn sales_buckets(period: Period, orders: impl IntoIterator<Item = BsonDocument>) -> Result<Vec<SalesBucketDto>, AppError> {
    let mut buckets: BTreeMap<String, (f64, u64)> = BTreeMap::new();

    for order in orders {
        let Some(at) = created_at(&order) else {
            continue;
        };

        let revenue = FlexFloat::from_field(order.get("total_amount"))
            .map_err(DocumentStoreError::from)?
            .value();

        let bucket = buckets.entry(period.bucket(at)).or_default();
        bucket.0 += revenue;
        bucket.1 += 1;
    }

    Ok(buckets
        .into_iter()
        .map(|(period, (revenue, orders))| SalesBucketDto { period, revenue, orders })
        .collect())
}

/// Counts registrations per bucket of `period`.
pub fn growth_buckets(period: Period, users: impl IntoIterator<Item = BsonDocument>) -> Vec<UserGrowthBucketDto> {
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();

    for user in users {
        if let Some(at) = created_at(&user) {
            *buckets.entry(period.bucket(at)).or_default() += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period, new_users)| UserGrowthBucketDto { period, new_users })
        .collect()
}

/// Sums the quantity sold per product over every order line.
///
/// # Returns
/// `(product id, total sold, orders containing it)`, best seller first
pub fn rank_products(orders: impl IntoIterator<Item = BsonDocument>) -> Result<Vec<(Uuid, i64, u64)>, AppError> {
    let mut totals: HashMap<Uuid, (i64, u64)> = HashMap::new();

    for order in orders {
        let Ok(lines) = order.get_array("products") else {
            continue;
        };

        for line in lines.iter().filter_map(Bson::as_document) {
            let Some(product_id) = line.get("product_id").and_then(uuid_from_bson) else {
                continue;
            };

            let count = FlexFloat::from_field(line.get("count"))
                .map_err(DocumentStoreError::from)?
                .value() as i64;

            let entry = totals.entry(product_id).or_default();
            entry.0 += count;
            entry.1 += 1;
        }
    }

    let mut ranked = totals
        .into_iter()
        .map(|(id, (sold, orders))| (id, sold, orders))
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));

    Ok(ranked)
}

pub struct DashboardService<'a> {
    store: &'a DynDocumentStore,
}

impl<'a> DashboardService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { store: &state.store }
    }

    async fn count(&self, name: &str, collection: &str, filter: Option<Expr>) -> Metric<u64> {
        let result = self
            .store
            .collection(collection)
            .count(filter)
            .await
            .map_err(AppError::from);

        Metric::from_result(name, result)
    }

    async fn fetch(&self, collection: &str, query: Query) -> Result<Vec<BsonDocument>, AppError> {
        let items = self
            .store
            .collection(collection)
            .query(query)
            .await?;

        Ok(documents(items).collect())
    }

    /// Headline counts for users, orders, products and reviews.
    pub async fn stats(&self, now: DateTime<Utc>) -> StatsDto {
        let windows = Windows::containing(now);
        let since = |start: DateTime<Utc>| Some(Filter::gte("created_at", bson_time(start)));

        let collection = User::collection_name();
        let users = UserStatsDto {
            total: self.count("users.total", collection, None).await,
            active: self
                .count("users.active", collection, Some(Filter::eq("is_active", true)))
                .await,
            inactive: self
                .count("users.inactive", collection, Some(Filter::ne("is_active", true)))
                .await,
            new_today: self.count("users.new_today", collection, since(windows.today)).await,
            new_this_week: self.count("users.new_this_week", collection, since(windows.week)).await,
            new_this_month: self.count("users.new_this_month", collection, since(windows.month)).await,
        };

        let collection = ORDERS.spec.collection;
        let status = |value: &str| Some(Filter::eq("status", value));
        let orders = OrderStatsDto {
            total: self.count("orders.total", collection, None).await,
            pending: self.count("orders.pending", collection, status("pending")).await,
            confirmed: self.count("orders.confirmed", collection, status("confirmed")).await,
            shipped: self.count("orders.shipped", collection, status("shipped")).await,
            delivered: self.count("orders.delivered", collection, status("delivered")).await,
            cancelled: self.count("orders.cancelled", collection, status("cancelled")).await,
            today: self.count("orders.today", collection, since(windows.today)).await,
            this_week: self.count("orders.this_week", collection, since(windows.week)).await,
            this_month: self.count("orders.this_month", collection, since(windows.month)).await,
        };

        let collection = PRODUCTS.spec.collection;
        let products = ProductStatsDto {
            total: self.count("products.total", collection, None).await,
            discounted: self
                .count("products.discounted", collection, Some(Filter::gt("discount", 0.0)))
                .await,
        };

        let collection = REVIEWS.spec.collection;
        let reviews = ReviewStatsDto {
            total: self.count("reviews.total", collection, None).await,
            this_month: self
                .count("reviews.this_month", collection, since(windows.month))
                .await,
        };

        StatsDto {
            users,
            orders,
            products,
            reviews,
            timestamp: rfc3339(now),
        }
    }

    /// Revenue and order count per bucket, cancelled orders excluded.
    pub async fn sales_analytics(&self, period: Period, now: DateTime<Utc>) -> SeriesDto<SalesBucketDto> {
        let filter = Filter::and([
            Filter::gte("created_at", bson_time(period.window_start(now))),
            Filter::ne("status", "cancelled"),
        ]);

        let result = self
            .fetch(ORDERS.spec.collection, Query::filtered(Some(filter)))
            .await
            .and_then(|orders| sales_buckets(period, orders));

        SeriesDto {
            period: period.name().to_string(),
            data: Metric::from_result("sales analytics", result),
        }
    }

    /// New registrations per bucket.
    pub async fn user_growth(&self, period: Period, now: DateTime<Utc>) -> SeriesDto<UserGrowthBucketDto> {
        let filter = Filter::gte("created_at", bson_time(period.window_start(now)));

        let result = self
            .fetch(User::collection_name(), Query::filtered(Some(filter)))
            .await
            .map(|users| growth_buckets(period, users));

        SeriesDto {
            period: period.name().to_string(),
            data: Metric::from_result("user growth", result),
        }
    }

    async fn ranked_products(&self, limit: usize) -> Result<Vec<TopProductDto>, AppError> {
        let orders = self.fetch(ORDERS.spec.collection, Query::new()).await?;
        let products = self.store.collection(PRODUCTS.spec.collection);

        let mut top = Vec::with_capacity(limit);
        for (id, total_sold, total_orders) in rank_products(orders)?.into_iter().take(limit) {
            let name = products
                .get_one(id)
                .await?
                .and_then(|product| product.get_str("name").ok().map(str::to_string));

            top.push(TopProductDto {
                product_id: id.to_string(),
                name,
                total_sold,
                total_orders,
            });
        }

        Ok(top)
    }

    /// Best sellers by quantity over all orders.
    pub async fn top_products(&self, limit: usize) -> TopProductsDto {
        TopProductsDto {
            top_products: Metric::from_result("top products", self.ranked_products(limit).await),
        }
    }

    async fn latest(&self, collection: &str, limit: usize) -> Result<Vec<BsonDocument>, AppError> {
        let query = Query::builder()
            .sort("created_at", SortDirection::Desc)
            .sort("id", SortDirection::Desc)
            .limit(limit.max(1))
            .build();

        self.fetch(collection, query).await
    }

    async fn activities(&self, limit: usize) -> Result<Vec<ActivityDto>, AppError> {
        let mut activities = Vec::new();
        let stamp = |document: &BsonDocument| created_at(document).map(rfc3339).unwrap_or_default();

        for document in self.latest(User::collection_name(), limit / 4).await? {
            let timestamp = stamp(&document);
            let user = User::from_bson(Bson::Document(document))?.into_dto();

            activities.push(ActivityDto {
                kind: "user_registration".to_string(),
                description: format!("New user registered: {}", user.name),
                timestamp,
                data: serde_json::to_value(user).map_err(AppError::internal)?,
            });
        }

        for document in self.latest(ORDERS.spec.collection, limit / 2).await? {
            activities.push(ActivityDto {
                kind: "new_order".to_string(),
                description: "New order placed".to_string(),
                timestamp: stamp(&document),
                data: Value::Object(ORDERS.spec.present(&document)?),
            });
        }

        for document in self.latest(REVIEWS.spec.collection, limit / 4).await? {
            let name = document.get_str("name").unwrap_or_default().to_string();

            activities.push(ActivityDto {
                kind: "new_review".to_string(),
                description: format!("New review from: {name}"),
                timestamp: stamp(&document),
                data: Value::Object(REVIEWS.spec.present(&document)?),
            });
        }

        // RFC 3339 strings in one format sort chronologically.
        activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        activities.truncate(limit);

        Ok(activities)
    }

    /// Latest registrations, orders and reviews, newest first.
    pub async fn recent_activity(&self, limit: usize) -> RecentActivityDto {
        RecentActivityDto {
            activities: Metric::from_result("recent activity", self.activities(limit).await),
        }
    }

    /// Conditions an operator should look at.
    pub async fn alerts(&self, now: DateTime<Utc>) -> AlertsDto {
        let stale_before = bson_time(now - Duration::days(STALE_PENDING_DAYS));
        let recent_since = bson_time(now - Duration::days(RECENT_LOGIN_DAYS));

        let checks = AlertChecksDto {
            old_pending_orders: self
                .count(
                    "old pending orders",
                    ORDERS.spec.collection,
                    Some(Filter::and([
                        Filter::eq("status", "pending"),
                        Filter::lt("created_at", stale_before),
                    ])),
                )
                .await,
            inactive_users_recent_login: self
                .count(
                    "inactive users with recent logins",
                    User::collection_name(),
                    Some(Filter::and([
                        Filter::eq("is_active", false),
                        Filter::gte("last_login", recent_since),
                    ])),
                )
                .await,
        };

        let mut alerts = Vec::new();

        if let Some(count) = checks.old_pending_orders.value.filter(|count| *count > 0) {
            alerts.push(AlertDto {
                kind: "warning".to_string(),
                title: "Old Pending Orders".to_string(),
                description: format!(
                    "{count} orders have been pending for more than {STALE_PENDING_DAYS} days"
                ),
                count,
            });
        }

        if let Some(count) = checks.inactive_users_recent_login.value.filter(|count| *count > 0) {
            alerts.push(AlertDto {
                kind: "info".to_string(),
                title: "Inactive Users with Recent Activity".to_string(),
                description: format!("{count} inactive users have logged in recently"),
                count,
            });
        }

        AlertsDto {
            total: alerts.len(),
            alerts,
            checks,
            timestamp: rfc3339(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn windows_start_at_midnight_sunday_and_the_first() {
        // A Wednesday.
        let windows = Windows::containing(at(2025, 3, 12, 15));

        assert_eq!(windows.today, at(2025, 3, 12, 0));
        assert_eq!(windows.week, at(2025, 3, 9, 0));
        assert_eq!(windows.month, at(2025, 3, 1, 0));
    }

    #[test]
    fn unknown_period_means_month() {
        assert_eq!(Period::parse(Some("week")), Period::Week);
        assert_eq!(Period::parse(Some("decade")), Period::Month);
        assert_eq!(Period::parse(None), Period::Month);
        assert_eq!(Period::Month.bucket(at(2025, 3, 12, 15)), "2025-03");
        assert_eq!(Period::Day.bucket(at(2025, 3, 12, 15)), "2025-03-12");
    }

    #[test]
    fn sales_buckets_decode_legacy_amounts() {
        let orders = vec![
            doc! { "created_at": bson_time(at(2025, 1, 5, 9)), "total_amount": "100.50" },
            doc! { "created_at": bson_time(at(2025, 1, 20, 9)), "total_amount": 50.0 },
            doc! { "created_at": bson_time(at(2025, 2, 1, 9)), "total_amount": Bson::Null },
        ];

        let buckets = sales_buckets(Period::Month, orders).unwrap();

        assert_eq!(
            buckets,
            vec![
                SalesBucketDto { period: "2025-01".to_string(), revenue: 150.5, orders: 2 },
                SalesBucketDto { period: "2025-02".to_string(), revenue: 0.0, orders: 1 },
            ]
        );
    }

    #[test]
    fn ranks_products_by_quantity() {
        let (a, b) = (Uuid::new(), Uuid::new());
        let orders = vec![
            doc! { "products": [ { "product_id": a, "count": 2_i64 }, { "product_id": b, "count": 5_i64 } ] },
            doc! { "products": [ { "product_id": a, "count": 1_i64 } ] },
            doc! { "status": "pending" },
        ];

        let ranked = rank_products(orders).unwrap();

        assert_eq!(ranked, vec![(b, 5, 1), (a, 3, 2)]);
    }

    #[test]
    fn clamps_limit() {
        assert_eq!(clamp_limit(None, 10), 10);
        assert_eq!(clamp_limit(Some("0"), 10), 10);
        assert_eq!(clamp_limit(Some("5000"), 10), MAX_DASHBOARD_LIMIT);
        assert_eq!(clamp_limit(Some("7"), 10), 7);
    }
}
