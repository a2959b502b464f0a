use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::sea_query::NullOrdering;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::entities::form_entries::{self, Column};
use crate::database::entities::{form_schemas, users};
use crate::errors::{FilterError, FilterResult};
use crate::services::SequenceService;
use crate::tat::{self, CaseStatus};

/// Hard cap on rows pulled into the in-memory filter stages.
pub const SCAN_LIMIT: usize = 10_000;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 200;

/// Schema-driven case query. Everything is optional; an empty filter lists
/// the whole organization, newest numbers last.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaseFilter {
    pub schema_id: Option<Uuid>,
    /// "pending" | "completed" | "verified"
    pub status: Option<String>,
    /// "today" | "week" | "month" | "quarter" | "year"
    pub date_bucket: Option<String>,
    /// ISO date or RFC 3339 timestamp; with `created_to` this overrides
    /// the bucket
    pub created_from: Option<String>,
    pub created_to: Option<String>,
    /// Calendar month (1-12), combined with `year`
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub submitter_id: Option<i32>,
    pub case_number: Option<i64>,
    pub out_of_tat: Option<bool>,
    /// Case-insensitive free text over payload values, submitter name and
    /// email, schema name, verification notes, and the case number
    pub search: Option<String>,
    /// Per-field substring filters over payload values
    pub fields: HashMap<String, String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Case enriched with derived status and TAT data for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct CaseView {
    pub id: Uuid,
    pub case_number: Option<i64>,
    pub organization_id: i32,
    pub schema_id: Uuid,
    pub submitter_id: i32,
    pub payload: Value,
    pub status: String,
    pub is_completed: bool,
    pub is_verified: bool,
    pub verification_notes: Option<String>,
    pub verifier_id: Option<i32>,
    pub verified_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub tat_hours_limit: i32,
    pub tat_duration_hours: Option<f64>,
    pub out_of_tat: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity_warning: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaseView {
    pub fn build(case: &form_entries::Model, tat_hours_limit: i32, now: DateTime<Utc>) -> Self {
        let payload = serde_json::from_str(&case.payload).unwrap_or(Value::Null);
        CaseView {
            id: case.id,
            case_number: case.case_number,
            organization_id: case.organization_id,
            schema_id: case.schema_id,
            submitter_id: case.submitter_id,
            payload,
            status: CaseStatus::derive(case.is_completed, case.is_verified)
                .as_str()
                .to_string(),
            is_completed: case.is_completed,
            is_verified: case.is_verified,
            verification_notes: case.verification_notes.clone(),
            verifier_id: case.verifier_id,
            verified_at: case.verified_at,
            started_at: case.started_at,
            completed_at: case.completed_at,
            tat_hours_limit,
            tat_duration_hours: tat::duration_hours(case.started_at, case.completed_at),
            out_of_tat: tat::is_out_of_tat(
                case.started_at,
                case.completed_at,
                now,
                tat_hours_limit,
            ),
            integrity_warning: tat::integrity_warning(case.started_at, case.completed_at),
            created_at: case.created_at,
            updated_at: case.updated_at,
        }
    }
}

/// One page of filtered results plus the advisory warnings collected while
/// evaluating the filter.
#[derive(Debug, Clone, Serialize)]
pub struct CasePage {
    pub count: usize,
    pub page: u64,
    pub page_size: u64,
    pub results: Vec<CaseView>,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct FilterService {
    db: DatabaseConnection,
}

impl FilterService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Run the filter pipeline. SQL-translatable predicates always apply in
    /// the database; the in-memory stages (payload fields, free text, TAT)
    /// materialize a candidate set capped at [`SCAN_LIMIT`]. A request with
    /// no in-memory stage counts and pages entirely in SQL, so a plain
    /// listing works at any organization size.
    pub async fn search(
        &self,
        organization_id: i32,
        filter: &CaseFilter,
    ) -> FilterResult<CasePage> {
        let mut warnings = Vec::new();
        let now = Utc::now();

        let mut query = form_entries::Entity::find()
            .filter(Column::OrganizationId.eq(organization_id));

        if let Some(schema_id) = filter.schema_id {
            query = query.filter(Column::SchemaId.eq(schema_id));
        }
        if let Some(submitter_id) = filter.submitter_id {
            query = query.filter(Column::SubmitterId.eq(submitter_id));
        }
        if let Some(case_number) = filter.case_number {
            query = query.filter(Column::CaseNumber.eq(case_number));
        }

        if let Some(status) = &filter.status {
            query = match status.to_lowercase().as_str() {
                "pending" => query.filter(Column::IsCompleted.eq(false)),
                "completed" => query.filter(Column::IsCompleted.eq(true)),
                "verified" => query.filter(Column::IsVerified.eq(true)),
                other => {
                    return Err(FilterError::InvalidFilterValue {
                        field: "status".to_string(),
                        value: other.to_string(),
                    })
                }
            };
        }

        if let Some((from, to)) = self.resolve_date_range(filter, now, &mut warnings)? {
            query = query
                .filter(Column::CreatedAt.gte(from))
                .filter(Column::CreatedAt.lt(to));
        }

        let schemas = form_schemas::Entity::find()
            .filter(form_schemas::Column::OrganizationId.eq(organization_id))
            .all(&self.db)
            .await?;
        let limits: HashMap<Uuid, i32> =
            schemas.iter().map(|s| (s.id, s.tat_hours_limit)).collect();

        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let search_term = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        // Payload-field, free-text, and TAT predicates cannot be pushed
        // into SQL; everything else pages in the database.
        let needs_scan =
            filter.out_of_tat.is_some() || search_term.is_some() || !filter.fields.is_empty();
        if !needs_scan {
            let count = query.clone().count(&self.db).await? as usize;
            let mut rows = query
                .order_by_with_nulls(Column::CaseNumber, Order::Asc, NullOrdering::Last)
                .order_by_asc(Column::CreatedAt)
                .offset((page - 1) * page_size)
                .limit(page_size)
                .all(&self.db)
                .await?;
            self.backfill_case_numbers(organization_id, &mut rows).await?;
            let results = rows
                .into_iter()
                .map(|case| {
                    let limit = limits.get(&case.schema_id).copied().unwrap_or(0);
                    CaseView::build(&case, limit, now)
                })
                .collect();
            return Ok(CasePage {
                count,
                page,
                page_size,
                results,
                warnings,
            });
        }

        let mut candidates = query
            .order_by_with_nulls(Column::CaseNumber, Order::Asc, NullOrdering::Last)
            .order_by_asc(Column::CreatedAt)
            .limit(SCAN_LIMIT as u64 + 1)
            .all(&self.db)
            .await?;

        if candidates.len() > SCAN_LIMIT {
            return Err(FilterError::ScanLimitExceeded {
                candidates: candidates.len(),
                limit: SCAN_LIMIT,
            });
        }
        debug!(candidates = candidates.len(), "filter candidate set loaded");

        self.backfill_case_numbers(organization_id, &mut candidates)
            .await?;

        let mut visible_fields = std::collections::HashSet::new();
        for schema in schemas.iter().filter(|s| s.is_active) {
            visible_fields.extend(crate::fields::field_name_set(&schema.fields()?));
        }

        // Payload field filters. Keys no visible schema declares cannot
        // match anything; they draw a warning and are skipped.
        for (key, expected) in &filter.fields {
            if !visible_fields.contains(&key.to_lowercase()) {
                warnings.push(format!(
                    "filter field '{}' is not declared by any active schema",
                    key
                ));
                continue;
            }
            let needle = expected.to_lowercase();
            candidates.retain(|case| {
                payload_value(case, key)
                    .map(|v| v.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            });
        }

        if let Some(search) = search_term {
            let needle = search.to_lowercase();
            let schema_names: HashMap<Uuid, String> = schemas
                .iter()
                .map(|s| (s.id, s.name.to_lowercase()))
                .collect();
            let submitters: HashMap<i32, String> = users::Entity::find()
                .filter(users::Column::OrganizationId.eq(organization_id))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|u| {
                    let haystack =
                        format!("{} {} {}", u.first_name, u.last_name, u.email).to_lowercase();
                    (u.id, haystack)
                })
                .collect();

            candidates.retain(|case| {
                case.payload.to_lowercase().contains(&needle)
                    || case
                        .case_number
                        .map(|n| n.to_string().contains(&needle))
                        .unwrap_or(false)
                    || case
                        .verification_notes
                        .as_deref()
                        .map(|n| n.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                    || schema_names
                        .get(&case.schema_id)
                        .map(|name| name.contains(&needle))
                        .unwrap_or(false)
                    || submitters
                        .get(&case.submitter_id)
                        .map(|who| who.contains(&needle))
                        .unwrap_or(false)
            });
        }

        if let Some(wanted) = filter.out_of_tat {
            if filter.status.as_deref() == Some("pending") && !wanted {
                warnings.push(
                    "in-TAT pending cases may flip out of TAT as time passes".to_string(),
                );
            }
            // A case whose schema row is not in scope has no limit to
            // judge against; skip it, as the statistics rollup does.
            candidates.retain(|case| match limits.get(&case.schema_id) {
                Some(limit) => {
                    tat::is_out_of_tat(case.started_at, case.completed_at, now, *limit) == wanted
                }
                None => false,
            });
        }

        candidates.sort_by_key(|case| (case.case_number.unwrap_or(i64::MAX), case.created_at));

        let count = candidates.len();
        let offset = ((page - 1) * page_size) as usize;

        let results = candidates
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .map(|case| {
                let limit = limits.get(&case.schema_id).copied().unwrap_or(0);
                CaseView::build(&case, limit, now)
            })
            .collect();

        Ok(CasePage {
            count,
            page,
            page_size,
            results,
            warnings,
        })
    }

    /// Resolve the date predicates to one half-open range, if any.
    /// Explicit bounds beat the bucket; the bucket beats month/year.
    fn resolve_date_range(
        &self,
        filter: &CaseFilter,
        now: DateTime<Utc>,
        warnings: &mut Vec<String>,
    ) -> FilterResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        if filter.created_from.is_some() || filter.created_to.is_some() {
            if filter.date_bucket.is_some() {
                warnings.push(
                    "explicit created_from/created_to override the date bucket".to_string(),
                );
            }
            let from = match &filter.created_from {
                Some(raw) => parse_date_bound(raw, false)?,
                None => Utc.timestamp_opt(0, 0).single().unwrap_or(now),
            };
            let to = match &filter.created_to {
                Some(raw) => parse_date_bound(raw, true)?,
                None => now,
            };
            return Ok(Some((from, to)));
        }

        if let Some(bucket) = &filter.date_bucket {
            let today = now.date_naive();
            let start_of = |date: NaiveDate| -> DateTime<Utc> {
                Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
            };
            let from = match bucket.to_lowercase().as_str() {
                "today" => start_of(today),
                "week" => start_of(today - Duration::days(7)),
                "month" => start_of(today - Duration::days(30)),
                "quarter" => start_of(today - Duration::days(90)),
                "year" => start_of(today - Duration::days(365)),
                other => {
                    return Err(FilterError::InvalidFilterValue {
                        field: "date_bucket".to_string(),
                        value: other.to_string(),
                    })
                }
            };
            return Ok(Some((from, now)));
        }

        if filter.month.is_some() || filter.year.is_some() {
            let year = filter.year.unwrap_or_else(|| now.year());
            let (from, to) = match filter.month {
                Some(month @ 1..=12) => {
                    let from = first_of_month(year, month)?;
                    let (next_year, next_month) = if month == 12 {
                        (year + 1, 1)
                    } else {
                        (year, month + 1)
                    };
                    (from, first_of_month(next_year, next_month)?)
                }
                Some(month) => {
                    return Err(FilterError::InvalidFilterValue {
                        field: "month".to_string(),
                        value: month.to_string(),
                    })
                }
                None => (first_of_month(year, 1)?, first_of_month(year + 1, 1)?),
            };
            return Ok(Some((from, to)));
        }

        Ok(None)
    }

    /// Cases written before the allocator existed carry a null number;
    /// give them real ones the first time a query sees them.
    async fn backfill_case_numbers(
        &self,
        organization_id: i32,
        candidates: &mut [form_entries::Model],
    ) -> FilterResult<()> {
        if candidates.iter().all(|c| c.case_number.is_some()) {
            return Ok(());
        }

        let txn = self.db.begin().await?;
        let mut next = SequenceService::next_case_number(&txn, organization_id).await?;
        for case in candidates.iter_mut().filter(|c| c.case_number.is_none()) {
            let mut active: form_entries::ActiveModel = case.clone().into();
            active.case_number = Set(Some(next));
            *case = active.update(&txn).await?;
            next += 1;
        }
        txn.commit().await?;

        warn!(organization_id, "backfilled missing case numbers during search");
        Ok(())
    }
}

fn payload_value(case: &form_entries::Model, key: &str) -> Option<String> {
    let map = case.payload_map().ok()?;
    map.get(key).map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn first_of_month(year: i32, month: u32) -> FilterResult<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(|| FilterError::InvalidFilterValue {
            field: "year".to_string(),
            value: year.to_string(),
        })
}

/// Parse a filter date as RFC 3339 or a bare ISO date. Bare end dates are
/// exclusive of the following midnight so "2026-01-31" covers the whole day.
fn parse_date_bound(raw: &str, end_of_day: bool) -> FilterResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let date = if end_of_day {
            date + Duration::days(1)
        } else {
            date
        };
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }
    Err(FilterError::InvalidFilterValue {
        field: "date".to_string(),
        value: raw.to_string(),
    })
}
