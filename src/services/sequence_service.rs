use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use crate::database::entities::form_entries;

/// Per-organization case number allocation.
///
/// Numbers are dense positive integers scoped to one organization. The
/// allocator reads max+1 inside the caller's transaction; the unique index
/// on (organization_id, case_number) turns concurrent allocations into a
/// commit conflict the caller retries.
pub struct SequenceService;

/// Outcome of a bulk renumbering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignSummary {
    pub organization_id: i32,
    pub reassigned: u64,
}

impl SequenceService {
    /// Next case number for an organization: highest existing number plus
    /// one, or 1 for the first case. Must run inside the transaction that
    /// inserts the case.
    pub async fn next_case_number<C: ConnectionTrait>(
        conn: &C,
        organization_id: i32,
    ) -> Result<i64, DbErr> {
        let max: Option<Option<i64>> = form_entries::Entity::find()
            .select_only()
            .column_as(form_entries::Column::CaseNumber.max(), "max_number")
            .filter(form_entries::Column::OrganizationId.eq(organization_id))
            .into_tuple()
            .one(conn)
            .await?;

        Ok(max.flatten().unwrap_or(0) + 1)
    }

    /// Renumber every case in the organization to a dense 1..N sequence in
    /// creation order. Also backfills rows whose number is still null.
    ///
    /// The unique index would reject most in-place renumberings, so all
    /// numbers are cleared first and the pass runs in one transaction.
    pub async fn reassign_for_organization(
        db: &DatabaseConnection,
        organization_id: i32,
    ) -> Result<ReassignSummary, DbErr> {
        let txn = db.begin().await?;

        let entries = form_entries::Entity::find()
            .filter(form_entries::Column::OrganizationId.eq(organization_id))
            .order_by_asc(form_entries::Column::CreatedAt)
            .order_by_asc(form_entries::Column::Id)
            .all(&txn)
            .await?;

        form_entries::Entity::update_many()
            .col_expr(
                form_entries::Column::CaseNumber,
                sea_orm::sea_query::Expr::value(sea_orm::Value::BigInt(None)),
            )
            .filter(form_entries::Column::OrganizationId.eq(organization_id))
            .exec(&txn)
            .await?;

        let mut reassigned = 0u64;
        for (index, entry) in entries.iter().enumerate() {
            let mut active: form_entries::ActiveModel = entry.clone().into();
            active.case_number = Set(Some(index as i64 + 1));
            active.update(&txn).await?;
            reassigned += 1;
        }

        txn.commit().await?;

        info!(
            organization_id,
            reassigned, "reassigned case numbers to a dense sequence"
        );

        Ok(ReassignSummary {
            organization_id,
            reassigned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use chrono::Utc;
    use sea_orm::Set;
    use uuid::Uuid;

    use crate::database::entities::{form_schemas, organizations, users};

    async fn seed_org(db: &DatabaseConnection) -> (i32, i32, Uuid) {
        let org = organizations::ActiveModel {
            name: Set("acme".to_string()),
            display_name: Set("Acme".to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let user = users::ActiveModel {
            email: Set(format!("user-{}@acme.test", Uuid::new_v4())),
            first_name: Set("Test".to_string()),
            last_name: Set("User".to_string()),
            role: Set("EMPLOYEE".to_string()),
            organization_id: Set(Some(org.id)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let schema = form_schemas::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(org.id),
            name: Set("KYC".to_string()),
            description: Set(None),
            fields_definition: Set("[]".to_string()),
            tat_hours_limit: Set(24),
            max_fields: Set(120),
            is_active: Set(true),
            created_by: Set(Some(user.id)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();

        (org.id, user.id, schema.id)
    }

    async fn insert_case(
        db: &DatabaseConnection,
        org_id: i32,
        user_id: i32,
        schema_id: Uuid,
        number: Option<i64>,
    ) -> form_entries::Model {
        form_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            case_number: Set(number),
            organization_id: Set(org_id),
            schema_id: Set(schema_id),
            submitter_id: Set(user_id),
            payload: Set("{}".to_string()),
            is_completed: Set(false),
            is_verified: Set(false),
            verification_notes: Set(None),
            verifier_id: Set(None),
            verified_at: Set(None),
            started_at: Set(Utc::now()),
            completed_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_number_is_one() {
        let db = setup_test_db().await.unwrap();
        let (org_id, _, _) = seed_org(&db).await;

        let number = SequenceService::next_case_number(&db, org_id)
            .await
            .unwrap();
        assert_eq!(number, 1);
    }

    #[tokio::test]
    async fn test_numbers_are_scoped_per_organization() {
        let db = setup_test_db().await.unwrap();
        let (org_a, user_a, schema_a) = seed_org(&db).await;
        let (org_b, _, _) = seed_org(&db).await;

        insert_case(&db, org_a, user_a, schema_a, Some(7)).await;

        assert_eq!(
            SequenceService::next_case_number(&db, org_a).await.unwrap(),
            8
        );
        assert_eq!(
            SequenceService::next_case_number(&db, org_b).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_reassign_backfills_nulls_and_closes_gaps() {
        let db = setup_test_db().await.unwrap();
        let (org_id, user_id, schema_id) = seed_org(&db).await;

        insert_case(&db, org_id, user_id, schema_id, Some(5)).await;
        insert_case(&db, org_id, user_id, schema_id, None).await;
        insert_case(&db, org_id, user_id, schema_id, Some(9)).await;

        let summary = SequenceService::reassign_for_organization(&db, org_id)
            .await
            .unwrap();
        assert_eq!(summary.reassigned, 3);

        let numbers: Vec<Option<i64>> = form_entries::Entity::find()
            .filter(form_entries::Column::OrganizationId.eq(org_id))
            .order_by_asc(form_entries::Column::CaseNumber)
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.case_number)
            .collect();
        assert_eq!(numbers, vec![Some(1), Some(2), Some(3)]);
    }
}
