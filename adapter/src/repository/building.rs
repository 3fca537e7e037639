use async_trait::async_trait;
use derive_new::new;

use kernel::model::{
    building::{
        event::{CreateBuilding, UpdateBuilding},
        Building,
    },
    id::BuildingId,
    list::{ListOptions, PaginatedList},
};
use kernel::repository::building::BuildingRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::building::{BuildingRow, PaginatedBuildingRow},
    ConnectionPool,
};

#[derive(new)]
pub struct BuildingRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl BuildingRepository for BuildingRepositoryImpl {
    async fn create(&self, event: CreateBuilding) -> AppResult<BuildingId> {
        let building_id = BuildingId::new();
        let managers = serde_json::to_value(&event.managers).map_err(|e| {
            AppError::ConversionEntityError(format!("managers をシリアライズできません: {e}"))
        })?;
        sqlx::query(
            r#"
                INSERT INTO buildings
                (building_id, building_name, building_type, capacity,
                rental_price, location, facilities, managers)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(building_id.raw())
        .bind(&event.building_name)
        .bind(&event.building_type)
        .bind(event.capacity)
        .bind(event.rental_price)
        .bind(&event.location)
        .bind(&event.facilities)
        .bind(managers)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(building_id)
    }

    async fn find_all(&self, options: ListOptions) -> AppResult<PaginatedList<Building>> {
        let rows = sqlx::query_as::<_, PaginatedBuildingRow>(
            r#"
                SELECT COUNT(*) OVER() AS total,
                       building_id, building_name, building_type, capacity,
                       rental_price, location, facilities, managers
                FROM buildings
                ORDER BY created_at DESC
                LIMIT $1 OFFSET $2
            "#,
        )
        .bind(options.limit)
        .bind(options.offset())
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let total = rows.first().map(|r| r.total).unwrap_or(0);
        let items = rows
            .into_iter()
            .map(|r| Building::try_from(r.row))
            .collect::<AppResult<Vec<Building>>>()?;

        Ok(PaginatedList {
            total,
            page: options.page,
            limit: options.limit,
            items,
        })
    }

    async fn find_by_id(&self, building_id: BuildingId) -> AppResult<Option<Building>> {
        let row = sqlx::query_as::<_, BuildingRow>(
            r#"
                SELECT building_id, building_name, building_type, capacity,
                       rental_price, location, facilities, managers
                FROM buildings
                WHERE building_id = $1
            "#,
        )
        .bind(building_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(Building::try_from).transpose()
    }

    async fn update(&self, event: UpdateBuilding) -> AppResult<()> {
        let managers = event
            .managers
            .map(|m| serde_json::to_value(&m))
            .transpose()
            .map_err(|e| {
                AppError::ConversionEntityError(format!("managers をシリアライズできません: {e}"))
            })?;

        // 指定のなかったフィールドは現状維持
        let res = sqlx::query(
            r#"
                UPDATE buildings
                SET building_name = COALESCE($1::varchar, building_name),
                    building_type = COALESCE($2::varchar, building_type),
                    capacity = COALESCE($3::integer, capacity),
                    rental_price = COALESCE($4::bigint, rental_price),
                    location = COALESCE($5::text, location),
                    facilities = COALESCE($6::text[], facilities),
                    managers = COALESCE($7::jsonb, managers),
                    updated_at = now()
                WHERE building_id = $8
            "#,
        )
        .bind(event.building_name)
        .bind(event.building_type)
        .bind(event.capacity)
        .bind(event.rental_price)
        .bind(event.location)
        .bind(event.facilities)
        .bind(managers)
        .bind(event.building_id.raw())
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "建物（{}）が見つかりませんでした。",
                event.building_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::model::building::BuildingManager;

    #[sqlx::test(migrations = "../migrations")]
    async fn register_and_fetch_building(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BuildingRepositoryImpl::new(ConnectionPool::new(pool));

        let building_id = repo
            .create(CreateBuilding {
                building_name: "第二体育館".into(),
                building_type: "gym".into(),
                capacity: 300,
                rental_price: 80_000,
                location: "Shinjuku 4-5-6".into(),
                facilities: vec!["shower".into(), "parking".into()],
                managers: vec![BuildingManager {
                    name: "施設 花子".into(),
                    phone: "03-1111-2222".into(),
                }],
            })
            .await?;

        let found = repo.find_by_id(building_id).await?;
        let building = found.expect("building should exist");
        assert_eq!(building.building_name, "第二体育館");
        assert_eq!(building.capacity, 300);
        assert_eq!(building.managers.len(), 1);

        let page = repo.find_all(ListOptions::default()).await?;
        assert_eq!(page.total, 1);
        Ok(())
    }
}
