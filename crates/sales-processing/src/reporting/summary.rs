//! Descriptive statistics over the cleaned order table.
//!
//! These are the aggregates the downstream charts are drawn from: category
//! mix, cancellation rates, regional demand, amount distributions and
//! per-item sales with top-seller flags.

use crate::config::CleaningConfig;
use crate::error::Result;
use crate::utils::{has_column, require_column, text_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns whose values get a cancellation rate, when present.
pub const CANCELLATION_DIMENSIONS: [&str; 7] = [
    "category",
    "size",
    "sales_channel",
    "ship_service_level",
    "fulfillment",
    "b2b",
    "ship_state_or_territory",
];

/// Percentile used to flag top sellers.
pub const TOP_SELLER_PERCENTILE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub orders: usize,
    pub share_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationRate {
    pub value: String,
    pub orders: usize,
    pub cancelled: usize,
    pub cancelled_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDemand {
    pub region: String,
    pub orders: usize,
    pub quantity: i64,
}

/// Distribution of the order amount for one status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountStats {
    pub status: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Sales of one catalog item (ASIN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSales {
    pub asin: String,
    pub category: String,
    pub total_orders: usize,
    pub revenue: f64,
    pub orders_at_discount: usize,
    /// Median of amount / quantity over rows with a positive quantity.
    pub median_unit_price: Option<f64>,
    pub top_seller: bool,
}

impl ItemSales {
    pub fn discount_percent(&self) -> f64 {
        percent(self.orders_at_discount, self.total_orders)
    }
}

/// Aggregates computed from the cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_orders: usize,
    pub total_revenue: f64,
    pub category_mix: Vec<CategoryShare>,
    /// Cancellation rates keyed by column name.
    pub cancellation_rates: BTreeMap<String, Vec<CancellationRate>>,
    pub regional_demand: Vec<RegionDemand>,
    pub amount_by_status: Vec<AmountStats>,
    pub items: Vec<ItemSales>,
}

/// Percentage of `part` in `total`, 0 for an empty total.
fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn float_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = require_column(df, column)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

/// Row counts and other non-negative integer aggregates.
fn count_values(df: &DataFrame, column: &str) -> Result<Vec<usize>> {
    let series = require_column(df, column)?.cast(&DataType::Int64)?;
    Ok(series
        .i64()?
        .into_iter()
        .map(|v| v.unwrap_or(0).max(0) as usize)
        .collect())
}

fn flag_values(df: &DataFrame, column: &str) -> Result<Vec<bool>> {
    let series = require_column(df, column)?.cast(&DataType::Boolean)?;
    Ok(series.bool()?.into_iter().map(|v| v.unwrap_or(false)).collect())
}

/// Text values with nulls replaced by an empty label.
fn labels(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    Ok(text_values(df, column)?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// Sort descending on `count`, then ascending on `label`.
fn by_count_then_label(count: &str, label: &str) -> (Vec<PlSmallStr>, SortMultipleOptions) {
    (
        vec![count.into(), label.into()],
        SortMultipleOptions::default().with_order_descending_multi([true, false]),
    )
}

/// Whether `column` lies above its category's top-seller percentile.
fn above_category_percentile(column: &str) -> Expr {
    let value = col(column).cast(DataType::Float64);
    value.clone().gt(value
        .quantile(lit(TOP_SELLER_PERCENTILE), QuantileMethod::Linear)
        .over([col("category")]))
}

impl SalesSummary {
    /// Compute every aggregate from a table produced by the pipeline.
    pub fn from_frame(df: &DataFrame, config: &CleaningConfig) -> Result<Self> {
        let total_revenue = require_column(df, "amount")?
            .cast(&DataType::Float64)?
            .f64()?
            .sum()
            .unwrap_or(0.0);

        Ok(Self {
            total_orders: df.height(),
            total_revenue,
            category_mix: Self::category_mix(df, config)?,
            cancellation_rates: Self::cancellation_rates(df, config)?,
            regional_demand: Self::regional_demand(df, config)?,
            amount_by_status: Self::amount_by_status(df, config)?,
            items: Self::item_sales(df, config)?,
        })
    }

    /// Items flagged as top sellers.
    pub fn top_sellers(&self) -> impl Iterator<Item = &ItemSales> {
        self.items.iter().filter(|item| item.top_seller)
    }

    fn category_mix(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<CategoryShare>> {
        let column = config.category_column.as_str();
        let (by, order) = by_count_then_label("orders", column);
        let mix = df
            .clone()
            .lazy()
            .group_by([col(column)])
            .agg([len().alias("orders")])
            .sort(by, order)
            .collect()?;

        let orders = count_values(&mix, "orders")?;
        Ok(labels(&mix, column)?
            .into_iter()
            .zip(orders)
            .map(|(category, orders)| CategoryShare {
                category,
                orders,
                share_percent: percent(orders, df.height()),
            })
            .collect())
    }

    fn cancellation_rates(
        df: &DataFrame,
        config: &CleaningConfig,
    ) -> Result<BTreeMap<String, Vec<CancellationRate>>> {
        let status = config.status_rules.status_column.as_str();
        let terminal = config.status_rules.terminal_label.as_str();
        let mut rates = BTreeMap::new();

        for column in CANCELLATION_DIMENSIONS {
            if !has_column(df, column) {
                continue;
            }
            let tallies = df
                .clone()
                .lazy()
                .group_by([col(column)])
                .agg([
                    len().alias("orders"),
                    col(status).eq(lit(terminal)).sum().alias("cancelled"),
                ])
                .sort([column], SortMultipleOptions::default())
                .collect()?;

            let orders = count_values(&tallies, "orders")?;
            let cancelled = count_values(&tallies, "cancelled")?;
            let column_rates = labels(&tallies, column)?
                .into_iter()
                .zip(orders.into_iter().zip(cancelled))
                .map(|(value, (orders, cancelled))| CancellationRate {
                    value,
                    orders,
                    cancelled,
                    cancelled_percent: percent(cancelled, orders),
                })
                .collect();
            rates.insert(column.to_string(), column_rates);
        }

        Ok(rates)
    }

    fn regional_demand(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<RegionDemand>> {
        let column = config.regions.column.as_str();
        let (by, order) = by_count_then_label("orders", column);
        let demand = df
            .clone()
            .lazy()
            .group_by([col(column)])
            .agg([
                len().alias("orders"),
                col("quantity").cast(DataType::Int64).sum().alias("quantity"),
            ])
            .sort(by, order)
            .collect()?;

        let orders = count_values(&demand, "orders")?;
        let quantities = count_values(&demand, "quantity")?;
        Ok(labels(&demand, column)?
            .into_iter()
            .zip(orders.into_iter().zip(quantities))
            .map(|(region, (orders, quantity))| RegionDemand {
                region,
                orders,
                quantity: quantity as i64,
            })
            .collect())
    }

    fn amount_by_status(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<AmountStats>> {
        let status = config.status_rules.status_column.as_str();
        let amount = || col("amount").cast(DataType::Float64);
        let stats = df
            .clone()
            .lazy()
            .filter(col("amount").is_not_null())
            .group_by([col(status)])
            .agg([
                len().alias("count"),
                amount().mean().alias("mean"),
                amount().median().alias("median"),
                amount().min().alias("min"),
                amount().max().alias("max"),
            ])
            .sort([status], SortMultipleOptions::default())
            .collect()?;

        let counts = count_values(&stats, "count")?;
        let mean = float_values(&stats, "mean")?;
        let median = float_values(&stats, "median")?;
        let min = float_values(&stats, "min")?;
        let max = float_values(&stats, "max")?;
        Ok(labels(&stats, status)?
            .into_iter()
            .enumerate()
            .map(|(row, status)| AmountStats {
                status,
                count: counts[row],
                mean: mean[row].unwrap_or_default(),
                median: median[row].unwrap_or_default(),
                min: min[row].unwrap_or_default(),
                max: max[row].unwrap_or_default(),
            })
            .collect())
    }

    /// Per-item totals. An item is a top seller when its order count or its
    /// revenue is above the category's 80th percentile.
    fn item_sales(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<ItemSales>> {
        let promotion = config.promotion_column.as_str();
        let mut frame = df.clone().lazy();
        if !has_column(df, promotion) {
            frame = frame.with_column(lit(false).alias(promotion));
        }

        let quantity = col("quantity").cast(DataType::Float64);
        let amount = col("amount").cast(DataType::Float64);
        let (by, order) = by_count_then_label("revenue", "asin");
        let items = frame
            .group_by([col("asin")])
            .agg([
                col(config.category_column.as_str()).first().alias("category"),
                len().alias("total_orders"),
                amount.clone().sum().alias("revenue"),
                col(promotion).cast(DataType::Boolean).sum().alias("orders_at_discount"),
                (amount / quantity.clone())
                    .filter(quantity.gt(lit(0.0)))
                    .median()
                    .alias("median_unit_price"),
            ])
            .with_column(
                above_category_percentile("total_orders")
                    .or(above_category_percentile("revenue"))
                    .alias("top_seller"),
            )
            .sort(by, order)
            .collect()?;

        let categories = labels(&items, "category")?;
        let orders = count_values(&items, "total_orders")?;
        let revenue = float_values(&items, "revenue")?;
        let discounted = count_values(&items, "orders_at_discount")?;
        let unit_prices = float_values(&items, "median_unit_price")?;
        let top_seller = flag_values(&items, "top_seller")?;
        Ok(labels(&items, "asin")?
            .into_iter()
            .enumerate()
            .map(|(row, asin)| ItemSales {
                asin,
                category: categories[row].clone(),
                total_orders: orders[row],
                revenue: revenue[row].unwrap_or_default(),
                orders_at_discount: discounted[row],
                median_unit_price: unit_prices[row],
                top_seller: top_seller[row],
            })
            .collect())
    }
}
