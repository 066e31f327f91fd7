//! Merges internal stays, synced external blocks, manual blocks, and
//! seasonal rule overlays into a per-date availability projection.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veranda_core::{PropertyDirectory, WorkflowError, WorkflowResult};
use veranda_shared::StayRange;

use crate::models::{BlockKind, CalendarBlock, RateAdjustment, SeasonalRule};
use crate::repository::{BlockRepository, RuleRepository};

/// Display status of one calendar date. Internal stays win over
/// external blocks which win over manual blocks, but all three make
/// the date unavailable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    Available,
    Booked,
    ExternalBlock,
    ManualBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayProjection {
    pub date: NaiveDate,
    pub available: bool,
    pub status: DayStatus,
    pub price: i64,
    pub min_stay: u32,
    /// A new stay may start on this date.
    pub check_in_allowed: bool,
    /// A stay may end on this date: the previous night is not occupied
    /// by someone else (turnover days are shared).
    pub check_out_allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeSummary {
    pub total_days: usize,
    pub available_days: usize,
    pub booked_days: usize,
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarProjection {
    pub property_id: Uuid,
    pub days: Vec<DayProjection>,
    pub summary: RangeSummary,
}

impl CalendarProjection {
    pub fn all_available(&self) -> bool {
        self.days.iter().all(|d| d.available)
    }

    /// The minimum-stay requirement governing a stay that starts at
    /// the first projected date.
    pub fn min_stay_at_start(&self) -> u32 {
        self.days.first().map(|d| d.min_stay).unwrap_or(1)
    }

    pub fn nightly_subtotal(&self) -> i64 {
        self.days.iter().map(|d| d.price).sum()
    }
}

/// Availability reconciler over one property's calendar sources.
pub struct Reconciler {
    blocks: Arc<dyn BlockRepository>,
    rules: Arc<dyn RuleRepository>,
    directory: Arc<dyn PropertyDirectory>,
}

impl Reconciler {
    pub fn new(
        blocks: Arc<dyn BlockRepository>,
        rules: Arc<dyn RuleRepository>,
        directory: Arc<dyn PropertyDirectory>,
    ) -> Self {
        Self { blocks, rules, directory }
    }

    /// Project availability, price, and min-stay for every date in the
    /// half-open range. `exclude_ref` ignores one internal block (a
    /// booking re-validating its own dates).
    pub async fn project(
        &self,
        property_id: Uuid,
        range: StayRange,
        exclude_ref: Option<&str>,
    ) -> WorkflowResult<CalendarProjection> {
        if !range.is_valid() {
            return Err(WorkflowError::ValidationFailed(format!(
                "range end must be after start: {range}"
            )));
        }

        let property = self
            .directory
            .get_property(property_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("property {property_id}")))?;

        // One day earlier than requested so the first date's
        // check-out flag can see the previous night.
        let fetch_range = StayRange::new(range.check_in - Duration::days(1), range.check_out);
        let blocks = self.relevant_blocks(property_id, &fetch_range, exclude_ref).await?;

        let mut rules = self.rules.for_property(property_id, &range).await?;
        // The documented deterministic stacking order: creation time,
        // rule id as tiebreak.
        rules.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        let mut days = Vec::with_capacity(range.nights().max(0) as usize);
        for date in range.nights_iter() {
            let status = occupancy_status(&blocks, date);
            let available = status == DayStatus::Available;
            let previous_occupied = occupancy_status(&blocks, date - Duration::days(1)) != DayStatus::Available;

            days.push(DayProjection {
                date,
                available,
                status,
                price: price_for_date(property.base_price, &rules, date),
                min_stay: min_stay_for_date(&rules, date),
                check_in_allowed: available,
                check_out_allowed: !previous_occupied,
            });
        }

        let total_days = days.len();
        let available_days = days.iter().filter(|d| d.available).count();
        let booked_days = days.iter().filter(|d| d.status == DayStatus::Booked).count();
        let occupancy_rate = if total_days == 0 {
            0.0
        } else {
            booked_days as f64 / total_days as f64
        };

        Ok(CalendarProjection {
            property_id,
            days,
            summary: RangeSummary { total_days, available_days, booked_days, occupancy_rate },
        })
    }

    /// Boolean form used by the lock manager and validation paths:
    /// true when no active block occupies any night of the range.
    pub async fn is_range_free(
        &self,
        property_id: Uuid,
        range: StayRange,
        exclude_ref: Option<&str>,
    ) -> WorkflowResult<bool> {
        let blocks = self.relevant_blocks(property_id, &range, exclude_ref).await?;
        Ok(!blocks.iter().any(|b| b.range.overlaps(&range)))
    }

    async fn relevant_blocks(
        &self,
        property_id: Uuid,
        range: &StayRange,
        exclude_ref: Option<&str>,
    ) -> WorkflowResult<Vec<CalendarBlock>> {
        let blocks = self.blocks.active_for_property(property_id, range).await?;
        Ok(blocks
            .into_iter()
            .filter(|b| match (exclude_ref, b.external_ref.as_deref()) {
                (Some(excluded), Some(r)) => r != excluded,
                _ => true,
            })
            .collect())
    }
}

fn occupancy_status(blocks: &[CalendarBlock], date: NaiveDate) -> DayStatus {
    let mut status = DayStatus::Available;
    for block in blocks.iter().filter(|b| b.blocks_date(date)) {
        let candidate = match block.kind {
            BlockKind::Booking => DayStatus::Booked,
            BlockKind::External => DayStatus::ExternalBlock,
            BlockKind::Manual => DayStatus::ManualBlock,
        };
        // Booked > ExternalBlock > ManualBlock for display
        status = match (status, candidate) {
            (DayStatus::Booked, _) | (_, DayStatus::Booked) => DayStatus::Booked,
            (DayStatus::ExternalBlock, _) | (_, DayStatus::ExternalBlock) => DayStatus::ExternalBlock,
            _ => DayStatus::ManualBlock,
        };
    }
    status
}

/// Nightly price: base rate plus fixed adjustments (additive), then
/// percentage adjustments (multiplicative, cumulative), both in the
/// rules' creation order. Floored at one minor unit.
fn price_for_date(base_price: i64, rules: &[SeasonalRule], date: NaiveDate) -> i64 {
    let mut price = base_price as f64;
    for rule in rules.iter().filter(|r| r.covers(date)) {
        if let Some(RateAdjustment::Fixed(amount)) = rule.adjustment {
            price += amount as f64;
        }
    }
    for rule in rules.iter().filter(|r| r.covers(date)) {
        if let Some(RateAdjustment::Percentage(percent)) = rule.adjustment {
            price *= 1.0 + percent / 100.0;
        }
    }
    (price.round() as i64).max(1)
}

fn min_stay_for_date(rules: &[SeasonalRule], date: NaiveDate) -> u32 {
    rules
        .iter()
        .filter(|r| r.covers(date))
        .filter_map(|r| r.min_stay)
        .max()
        .unwrap_or(1)
        .max(1)
}
