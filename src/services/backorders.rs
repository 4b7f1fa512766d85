use crate::{
    db::DbPool,
    entities::{
        backorder_request::{self, BackorderStatus},
        order_line, product_variant, BackorderRequest, Order, OrderLine, ProductVariant,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Tracks warehouse-reported shortages through a simulated supplier flow.
///
/// One request per (order, variant), created in `pending`, advanced in
/// bulk by logistics to `in_process` and `received`. Pending and
/// in-process requests hold the order in `preparing`.
#[derive(Clone)]
pub struct BackorderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl BackorderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records shortages for an order. Entries that already have a request
    /// for the same (order, variant) are silently skipped, so warehouse
    /// staff can re-submit the same report without creating duplicates.
    #[instrument(skip(self, entries), fields(order_id = %order_id, count = entries.len()))]
    pub async fn report_shortages(
        &self,
        order_id: Uuid,
        entries: Vec<ShortageInput>,
    ) -> Result<Vec<backorder_request::Model>, ServiceError> {
        let txn = self.db.begin().await?;

        Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let line_variants: HashSet<i32> = OrderLine::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|line| line.variant_id)
            .collect();

        let mut created = Vec::new();
        for entry in entries {
            if entry.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Shortage quantity for variant {} must be at least 1",
                    entry.variant_id
                )));
            }
            if !line_variants.contains(&entry.variant_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Variant {} is not part of order {}",
                    entry.variant_id, order_id
                )));
            }

            let existing = BackorderRequest::find()
                .filter(backorder_request::Column::OrderId.eq(order_id))
                .filter(backorder_request::Column::VariantId.eq(entry.variant_id))
                .one(&txn)
                .await?;
            if existing.is_some() {
                continue;
            }

            let request = backorder_request::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                variant_id: Set(entry.variant_id),
                quantity_requested: Set(entry.quantity),
                status: Set(BackorderStatus::Pending),
                requested_at: Set(Utc::now()),
                received_at: Set(None),
            };
            created.push(request.insert(&txn).await?);
        }

        txn.commit().await?;

        for request in &created {
            self.event_sender
                .send_or_log(Event::BackorderReported {
                    order_id,
                    variant_id: request.variant_id,
                })
                .await;
        }

        info!(
            "Recorded {} new shortages for order {}",
            created.len(),
            order_id
        );
        Ok(created)
    }

    /// Aggregates unresolved shortages for the logistics overview:
    /// grouped per (variant, status), pending groups first, oldest
    /// request first within equal status.
    #[instrument(skip(self))]
    pub async fn list_grouped(&self) -> Result<Vec<GroupedBackorder>, ServiceError> {
        let rows = BackorderRequest::find()
            .filter(
                backorder_request::Column::Status
                    .is_in([BackorderStatus::Pending, BackorderStatus::InProcess]),
            )
            .order_by_asc(backorder_request::Column::RequestedAt)
            .all(&*self.db)
            .await?;

        let mut grouped = group_requests(rows);

        // Join in variant names for the overview.
        let variant_ids: Vec<i32> = grouped.iter().map(|g| g.variant_id).collect();
        let names: HashMap<i32, String> = ProductVariant::find()
            .filter(product_variant::Column::Id.is_in(variant_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();
        for group in &mut grouped {
            if let Some(name) = names.get(&group.variant_id) {
                group.variant_name = name.clone();
            }
        }

        Ok(grouped)
    }

    /// Per-line availability of an order, used by the warehouse to decide
    /// whether it can progress. A line with no request, or whose request
    /// is `received`, counts as available.
    #[instrument(skip(self))]
    pub async fn list_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<LineAvailability>, ServiceError> {
        Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let lines = OrderLine::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .order_by_asc(order_line::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let requests: HashMap<i32, BackorderStatus> = BackorderRequest::find()
            .filter(backorder_request::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|r| (r.variant_id, r.status))
            .collect();

        Ok(lines
            .into_iter()
            .map(|line| {
                let status = requests.get(&line.variant_id).copied();
                let available = !matches!(
                    status,
                    Some(BackorderStatus::Pending) | Some(BackorderStatus::InProcess)
                );
                LineAvailability {
                    line_id: line.id,
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                    backorder_status: status,
                    available,
                }
            })
            .collect())
    }

    /// Bulk status update over a batch of request ids.
    ///
    /// The batch is atomic: one unknown id aborts the whole update.
    /// Moving to `received` records the reception timestamp normalized to
    /// midnight UTC; leaving `received` clears it again.
    #[instrument(skip(self, ids), fields(count = ids.len(), new_status = %new_status))]
    pub async fn advance_status(
        &self,
        ids: Vec<Uuid>,
        new_status: BackorderStatus,
        received_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<backorder_request::Model>, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "No backorder request ids supplied".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let rows = BackorderRequest::find()
            .filter(backorder_request::Column::Id.is_in(ids.clone()))
            .all(&txn)
            .await?;

        if rows.len() != ids.len() {
            let found: HashSet<Uuid> = rows.iter().map(|r| r.id).collect();
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(ServiceError::NotFound(format!(
                "Backorder requests not found: {}",
                missing.join(", ")
            )));
        }

        let received_stamp = match new_status {
            BackorderStatus::Received => {
                Some(normalize_received_at(received_at.unwrap_or_else(Utc::now)))
            }
            BackorderStatus::Pending | BackorderStatus::InProcess => None,
        };

        let mut updated = Vec::with_capacity(rows.len());
        for row in rows {
            let mut active: backorder_request::ActiveModel = row.into();
            active.status = Set(new_status);
            active.received_at = Set(received_stamp);
            updated.push(active.update(&txn).await?);
        }

        txn.commit().await?;

        for request in &updated {
            self.event_sender
                .send_or_log(Event::BackorderStatusChanged {
                    request_id: request.id,
                    new_status,
                })
                .await;
        }

        info!("Advanced {} backorders to {}", updated.len(), new_status);
        Ok(updated)
    }
}

/// Fixes a reception timestamp to midnight UTC of its calendar date, so
/// the recorded moment does not shift with the reporter's wall clock.
pub fn normalize_received_at(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(ts.date_naive().and_time(NaiveTime::MIN), Utc)
}

/// Groups raw requests per (variant, status). Rows must arrive ordered by
/// `requested_at` ascending; the first row of a group therefore carries
/// the earliest request time.
fn group_requests(rows: Vec<backorder_request::Model>) -> Vec<GroupedBackorder> {
    let mut groups: Vec<GroupedBackorder> = Vec::new();
    let mut orders_per_group: Vec<HashSet<Uuid>> = Vec::new();

    for row in rows {
        let position = groups
            .iter()
            .position(|g| g.variant_id == row.variant_id && g.status == row.status);

        match position {
            Some(idx) => {
                groups[idx].total_quantity += row.quantity_requested;
                if orders_per_group[idx].insert(row.order_id) {
                    groups[idx].order_count += 1;
                }
            }
            None => {
                groups.push(GroupedBackorder {
                    variant_id: row.variant_id,
                    variant_name: String::new(),
                    status: row.status,
                    total_quantity: row.quantity_requested,
                    order_count: 1,
                    earliest_requested_at: row.requested_at,
                });
                let mut orders = HashSet::new();
                orders.insert(row.order_id);
                orders_per_group.push(orders);
            }
        }
    }

    groups.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then(a.earliest_requested_at.cmp(&b.earliest_requested_at))
    });
    groups
}

/// One reported shortage line
#[derive(Debug, Clone, Deserialize)]
pub struct ShortageInput {
    pub variant_id: i32,
    pub quantity: i32,
}

/// Aggregated shortage of one variant in one status
#[derive(Debug, Clone, Serialize)]
pub struct GroupedBackorder {
    pub variant_id: i32,
    pub variant_name: String,
    pub status: BackorderStatus,
    pub total_quantity: i32,
    pub order_count: usize,
    pub earliest_requested_at: DateTime<Utc>,
}

/// Availability of one order line from the warehouse point of view
#[derive(Debug, Clone, Serialize)]
pub struct LineAvailability {
    pub line_id: Uuid,
    pub product_id: i32,
    pub variant_id: i32,
    pub quantity: i32,
    pub backorder_status: Option<BackorderStatus>,
    pub available: bool,
}
