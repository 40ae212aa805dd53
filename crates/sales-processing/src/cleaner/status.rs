//! Stage 7: order status reconciliation.
//!
//! The courier sub-status is more current than the primary status, so it
//! takes precedence. Rules are applied per row in this order:
//!
//! 1. courier status in the cancel set forces the cancelled label;
//! 2. courier `shipped` promotes a pending order to shipped;
//! 3. return, rejection, loss and damage sub-statuses fold into cancelled;
//! 4. cancelled becomes the terminal label.
//!
//! Rows whose final status is on the drop list are then removed and the
//! courier column is dropped.

use super::{CleaningStep, StepContext};
use crate::config::StatusRules;
use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::{ActionType, CleaningAction};
use crate::utils::{drop_column, filter_rows, put_text_column, text_values};
use polars::prelude::*;

#[derive(Debug, Default, PartialEq, Eq)]
struct StatusCounts {
    forced_cancelled: usize,
    promoted_shipped: usize,
    merged: usize,
    relabeled: usize,
}

/// Final status of one row.
fn reconcile(
    rules: &StatusRules,
    status: Option<&str>,
    courier: Option<&str>,
    counts: &mut StatusCounts,
) -> Option<String> {
    let mut current = status.map(str::to_string);

    if let Some(courier) = courier {
        if rules.courier_cancelled.iter().any(|c| c == courier) {
            if current.as_deref() != Some(rules.cancelled_status.as_str()) {
                counts.forced_cancelled += 1;
            }
            current = Some(rules.cancelled_status.clone());
        } else if courier == rules.courier_shipped
            && current.as_deref() == Some(rules.pending_status.as_str())
        {
            counts.promoted_shipped += 1;
            current = Some(rules.shipped_status.clone());
        }
    }

    if let Some(target) = current.as_deref().and_then(|s| rules.status_merges.get(s)) {
        counts.merged += 1;
        current = Some(target.clone());
    }

    if current.as_deref() == Some(rules.cancelled_status.as_str()) {
        counts.relabeled += 1;
        current = Some(rules.terminal_label.clone());
    }

    current
}

/// Reconciles the primary status with the courier status and removes
/// statuses on the drop list.
pub struct StatusReconciler;

impl CleaningStep for StatusReconciler {
    fn name(&self) -> &'static str {
        "status_reconciler"
    }

    fn stage(&self) -> CleaningStage {
        CleaningStage::StatusReconciliation
    }

    fn apply(&self, mut df: DataFrame, ctx: &mut StepContext<'_>) -> Result<DataFrame> {
        let config = ctx.config;
        let rules = &config.status_rules;
        let statuses = text_values(&df, &rules.status_column)?;
        let couriers = text_values(&df, &rules.courier_column)?;

        let mut counts = StatusCounts::default();
        let reconciled: Vec<Option<String>> = statuses
            .iter()
            .zip(&couriers)
            .map(|(status, courier)| {
                reconcile(rules, status.as_deref(), courier.as_deref(), &mut counts)
            })
            .collect();

        let keep: Vec<bool> = reconciled
            .iter()
            .map(|status| {
                status
                    .as_deref()
                    .is_none_or(|s| !rules.drop_list.iter().any(|d| d == s))
            })
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();

        put_text_column(&mut df, &rules.status_column, reconciled)?;
        drop_column(&mut df, &rules.courier_column)?;
        if removed > 0 {
            df = filter_rows(&df, keep)?;
        }

        let column = rules.status_column.as_str();
        for (affected, description) in [
            (counts.forced_cancelled, "Cancelled by courier status"),
            (counts.promoted_shipped, "Promoted pending orders shipped by courier"),
            (counts.merged, "Folded return and loss sub-statuses into cancelled"),
            (counts.relabeled, "Relabeled cancelled to terminal label"),
        ] {
            ctx.record(CleaningAction::new(
                ActionType::ValueRelabeled,
                column,
                description,
                affected,
            ));
        }
        ctx.record(CleaningAction::new(
            ActionType::RowsRemoved,
            column,
            format!("Removed statuses on drop list ({})", rules.drop_list.join(", ")),
            removed,
        ));
        ctx.record(CleaningAction::new(
            ActionType::ColumnRemoved,
            rules.courier_column.as_str(),
            "Dropped reconciled courier status",
            1,
        ));

        Ok(df)
    }
}
