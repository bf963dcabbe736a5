//! Master data: buildings, rooms and facilities.
//!
//! Every role may list. Only roles holding `ManageMasterData` may change
//! anything, so a Teknisi gets a read-only catalog.

use sqlx::SqlitePool;
use tracing::info;

use crate::access::Capability;
use crate::error::{FastciliError, Result};
use crate::store;
use crate::store::catalog::{self, Building, CatalogFilter, Condition, Facility, Room};
use crate::store::users::User;

pub struct CatalogService {
    pool: SqlitePool,
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FastciliError::validation(field, "must not be empty"));
    }
    Ok(value)
}

impl CatalogService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn buildings(&self, filter: &CatalogFilter) -> Result<Vec<Building>> {
        catalog::list_buildings(&self.pool, filter).await
    }

    pub async fn rooms(&self, filter: &CatalogFilter) -> Result<Vec<Room>> {
        catalog::list_rooms(&self.pool, filter).await
    }

    /// Facilities narrowed by building → room cascade, condition and search.
    /// A room outside the chosen building yields an empty list.
    pub async fn facilities(&self, filter: &CatalogFilter) -> Result<Vec<Facility>> {
        catalog::list_facilities(&self.pool, filter).await
    }

    pub async fn facility(&self, id: i64) -> Result<Facility> {
        catalog::find_facility(&self.pool, id)
            .await?
            .ok_or_else(|| FastciliError::not_found("facility", id))
    }

    // --- buildings ---

    pub async fn add_building(
        &self,
        actor: &User,
        code: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Building> {
        actor.role.require(Capability::ManageMasterData)?;
        let code = required("kode_gedung", code)?;
        let name = required("nama_gedung", name)?;
        if catalog::find_building_by_code(&self.pool, code).await?.is_some() {
            return Err(FastciliError::validation("kode_gedung", "already in use"));
        }

        let id = catalog::insert_building(&self.pool, code, name, description).await?;
        info!(building_id = id, code, actor = actor.id, "building added");
        catalog::find_building(&self.pool, id)
            .await?
            .ok_or_else(|| FastciliError::not_found("building", id))
    }

    pub async fn update_building(
        &self,
        actor: &User,
        id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Building> {
        actor.role.require(Capability::ManageMasterData)?;
        let name = required("nama_gedung", name)?;
        if !catalog::update_building(&self.pool, id, name, description).await? {
            return Err(FastciliError::not_found("building", id));
        }
        catalog::find_building(&self.pool, id)
            .await?
            .ok_or_else(|| FastciliError::not_found("building", id))
    }

    /// Delete an empty building.
    pub async fn remove_building(&self, actor: &User, id: i64) -> Result<()> {
        actor.role.require(Capability::ManageMasterData)?;
        let mut tx = store::begin_write(&self.pool).await?;
        if catalog::count_rooms_in_building(&mut *tx, id).await? > 0 {
            return Err(FastciliError::validation("id_gedung", "building still has rooms"));
        }
        if !catalog::delete_building(&mut *tx, id).await? {
            return Err(FastciliError::not_found("building", id));
        }
        tx.commit().await?;
        info!(building_id = id, actor = actor.id, "building removed");
        Ok(())
    }

    // --- rooms ---

    pub async fn add_room(
        &self,
        actor: &User,
        building_id: i64,
        code: &str,
        name: &str,
    ) -> Result<Room> {
        actor.role.require(Capability::ManageMasterData)?;
        let code = required("kode_ruangan", code)?;
        let name = required("nama_ruangan", name)?;
        if catalog::find_building(&self.pool, building_id).await?.is_none() {
            return Err(FastciliError::validation(
                "id_gedung",
                format!("building {building_id} does not exist"),
            ));
        }
        if catalog::find_room_by_code(&self.pool, code).await?.is_some() {
            return Err(FastciliError::validation("kode_ruangan", "already in use"));
        }

        let id = catalog::insert_room(&self.pool, building_id, code, name).await?;
        info!(room_id = id, building_id, actor = actor.id, "room added");
        catalog::find_room(&self.pool, id)
            .await?
            .ok_or_else(|| FastciliError::not_found("room", id))
    }

    pub async fn update_room(&self, actor: &User, id: i64, name: &str) -> Result<Room> {
        actor.role.require(Capability::ManageMasterData)?;
        let name = required("nama_ruangan", name)?;
        if !catalog::update_room(&self.pool, id, name).await? {
            return Err(FastciliError::not_found("room", id));
        }
        catalog::find_room(&self.pool, id)
            .await?
            .ok_or_else(|| FastciliError::not_found("room", id))
    }

    /// Delete a room with no facilities.
    pub async fn remove_room(&self, actor: &User, id: i64) -> Result<()> {
        actor.role.require(Capability::ManageMasterData)?;
        let mut tx = store::begin_write(&self.pool).await?;
        if catalog::count_facilities_in_room(&mut *tx, id).await? > 0 {
            return Err(FastciliError::validation("id_ruangan", "room still has facilities"));
        }
        if !catalog::delete_room(&mut *tx, id).await? {
            return Err(FastciliError::not_found("room", id));
        }
        tx.commit().await?;
        info!(room_id = id, actor = actor.id, "room removed");
        Ok(())
    }

    // --- facilities ---

    pub async fn add_facility(
        &self,
        actor: &User,
        room_id: i64,
        name: &str,
        quantity: i64,
        condition: Condition,
    ) -> Result<Facility> {
        actor.role.require(Capability::ManageMasterData)?;
        let name = required("nama_fasilitas", name)?;
        if quantity < 1 {
            return Err(FastciliError::validation("jumlah", "must be at least 1"));
        }
        if catalog::find_room(&self.pool, room_id).await?.is_none() {
            return Err(FastciliError::validation(
                "id_ruangan",
                format!("room {room_id} does not exist"),
            ));
        }

        let id = catalog::insert_facility(&self.pool, room_id, name, quantity, condition).await?;
        info!(facility_id = id, room_id, actor = actor.id, "facility added");
        self.facility(id).await
    }

    pub async fn update_facility(
        &self,
        actor: &User,
        id: i64,
        name: &str,
        quantity: i64,
        condition: Condition,
    ) -> Result<Facility> {
        actor.role.require(Capability::ManageMasterData)?;
        let name = required("nama_fasilitas", name)?;
        if quantity < 1 {
            return Err(FastciliError::validation("jumlah", "must be at least 1"));
        }
        if !catalog::update_facility(&self.pool, id, name, quantity, condition).await? {
            return Err(FastciliError::not_found("facility", id));
        }
        self.facility(id).await
    }

    /// Mark a facility good or broken.
    pub async fn set_condition(&self, actor: &User, id: i64, condition: Condition) -> Result<Facility> {
        actor.role.require(Capability::ManageMasterData)?;
        let facility = self.facility(id).await?;
        catalog::set_facility_condition(&self.pool, facility.id, condition).await?;
        info!(facility_id = id, %condition, actor = actor.id, "facility condition changed");
        self.facility(id).await
    }

    /// Delete a facility no report refers to.
    pub async fn remove_facility(&self, actor: &User, id: i64) -> Result<()> {
        actor.role.require(Capability::ManageMasterData)?;
        let mut tx = store::begin_write(&self.pool).await?;
        if catalog::count_reports_for_facility(&mut *tx, id).await? > 0 {
            return Err(FastciliError::validation(
                "id_fasilitas",
                "facility has damage reports",
            ));
        }
        if !catalog::delete_facility(&mut *tx, id).await? {
            return Err(FastciliError::not_found("facility", id));
        }
        tx.commit().await?;
        info!(facility_id = id, actor = actor.id, "facility removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::fixtures;
    use crate::service::workflow::TicketService;
    use crate::ticket::NewReport;

    async fn service() -> (CatalogService, SqlitePool) {
        let pool = fixtures::seeded_pool().await;
        (CatalogService::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn technician_lists_but_cannot_change_anything() {
        let (svc, pool) = service().await;
        let tech = fixtures::user(&pool, "rendi.saputra@jti.com").await;

        assert_eq!(svc.buildings(&CatalogFilter::default()).await.unwrap().len(), 2);
        assert_eq!(svc.rooms(&CatalogFilter::default()).await.unwrap().len(), 3);
        assert_eq!(svc.facilities(&CatalogFilter::default()).await.unwrap().len(), 5);

        let building = svc.buildings(&CatalogFilter::default()).await.unwrap()[0].clone();
        let room = svc.rooms(&CatalogFilter::default()).await.unwrap()[0].clone();
        let facility = svc.facilities(&CatalogFilter::default()).await.unwrap()[0].clone();

        let results = [
            svc.add_building(&tech, "GD-X", "Gedung X", None).await.err(),
            svc.update_building(&tech, building.id, "Baru", None).await.err(),
            svc.remove_building(&tech, building.id).await.err(),
            svc.add_room(&tech, building.id, "R-X", "Ruang X").await.err(),
            svc.update_room(&tech, room.id, "Baru").await.err(),
            svc.remove_room(&tech, room.id).await.err(),
            svc.add_facility(&tech, room.id, "Meja", 1, Condition::Baik).await.err(),
            svc.update_facility(&tech, facility.id, "Meja", 1, Condition::Baik).await.err(),
            svc.set_condition(&tech, facility.id, Condition::Rusak).await.err(),
            svc.remove_facility(&tech, facility.id).await.err(),
        ];
        for err in results {
            assert!(matches!(err, Some(FastciliError::Forbidden { .. })), "{err:?}");
        }
        assert_eq!(svc.facilities(&CatalogFilter::default()).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let (svc, _) = service().await;
        let filter = CatalogFilter {
            search: Some("proyek".into()),
            ..Default::default()
        };
        let found = svc.facilities(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Proyektor");

        let filter = CatalogFilter {
            search: Some("SIPIL".into()),
            ..Default::default()
        };
        assert_eq!(svc.buildings(&filter).await.unwrap().len(), 1);

        let filter = CatalogFilter {
            search: Some("tidak-ada".into()),
            ..Default::default()
        };
        assert!(svc.rooms(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cascading_filters() {
        let (svc, pool) = service().await;
        let ti = catalog::find_building_by_code(&pool, "GD-TI").await.unwrap().unwrap();
        let aud = catalog::find_room_by_code(&pool, "AUD").await.unwrap().unwrap();
        let lab = catalog::find_room_by_code(&pool, "LPR-1").await.unwrap().unwrap();

        let in_ti = CatalogFilter {
            building_id: Some(ti.id),
            ..Default::default()
        };
        assert_eq!(svc.rooms(&in_ti).await.unwrap().len(), 2);
        assert_eq!(svc.facilities(&in_ti).await.unwrap().len(), 4);

        let lab_only = CatalogFilter {
            building_id: Some(ti.id),
            room_id: Some(lab.id),
            ..Default::default()
        };
        assert_eq!(svc.facilities(&lab_only).await.unwrap().len(), 2);

        // Auditorium is not in GD-TI.
        let mismatch = CatalogFilter {
            building_id: Some(ti.id),
            room_id: Some(aud.id),
            ..Default::default()
        };
        assert!(svc.facilities(&mismatch).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn room_filter_works_without_building() {
        let (svc, pool) = service().await;
        let theory = catalog::find_room_by_code(&pool, "RT-5").await.unwrap().unwrap();

        let room_only = CatalogFilter {
            room_id: Some(theory.id),
            ..Default::default()
        };
        let mut names: Vec<String> = svc
            .facilities(&room_only)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        names.sort();
        assert_eq!(names, ["Kursi", "Proyektor"]);
    }

    #[tokio::test]
    async fn wildcards_in_search_match_literally() {
        let (svc, pool) = service().await;
        let admin = fixtures::user(&pool, "admin@jti.com").await;

        for text in ["%", "_", "\\"] {
            let filter = CatalogFilter {
                search: Some(text.into()),
                ..Default::default()
            };
            assert!(svc.buildings(&filter).await.unwrap().is_empty(), "{text}");
            assert!(svc.rooms(&filter).await.unwrap().is_empty(), "{text}");
            assert!(svc.facilities(&filter).await.unwrap().is_empty(), "{text}");
        }

        let room = catalog::find_room_by_code(&pool, "AUD").await.unwrap().unwrap();
        svc.add_facility(&admin, room.id, "Kabel_HDMI", 3, Condition::Baik)
            .await
            .unwrap();
        let filter = CatalogFilter {
            search: Some("_".into()),
            ..Default::default()
        };
        let found = svc.facilities(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Kabel_HDMI");
    }

    #[tokio::test]
    async fn condition_filter() {
        let (svc, pool) = service().await;
        let admin = fixtures::user(&pool, "admin@jti.com").await;
        let projector = fixtures::facility_id(&pool, "RT-5", "Proyektor").await;

        let broken = CatalogFilter {
            condition: Some(Condition::Rusak),
            ..Default::default()
        };
        assert!(svc.facilities(&broken).await.unwrap().is_empty());

        svc.set_condition(&admin, projector, Condition::Rusak).await.unwrap();
        let found = svc.facilities(&broken).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, projector);
    }

    #[tokio::test]
    async fn sarpras_manages_master_data() {
        let (svc, pool) = service().await;
        let staff = fixtures::user(&pool, "sarpras@jti.com").await;

        let building = svc
            .add_building(&staff, "GD-AH", "Gedung AH", Some("Gedung baru"))
            .await
            .unwrap();
        let room = svc.add_room(&staff, building.id, "AH-1", "Ruang AH 1").await.unwrap();
        assert_eq!(room.building_name, "Gedung AH");
        let facility = svc
            .add_facility(&staff, room.id, "Papan Tulis", 1, Condition::Baik)
            .await
            .unwrap();
        assert_eq!(facility.building_id, building.id);

        let renamed = svc.update_room(&staff, room.id, "Ruang Rapat").await.unwrap();
        assert_eq!(renamed.name, "Ruang Rapat");

        let err = svc.remove_room(&staff, room.id).await.unwrap_err();
        assert_eq!(err.field(), Some("id_ruangan"));

        svc.remove_facility(&staff, facility.id).await.unwrap();
        svc.remove_room(&staff, room.id).await.unwrap();
        svc.remove_building(&staff, building.id).await.unwrap();
        assert!(catalog::find_building(&pool, building.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_codes_and_blank_names_are_rejected() {
        let (svc, pool) = service().await;
        let admin = fixtures::user(&pool, "admin@jti.com").await;

        let err = svc.add_building(&admin, "GD-TI", "Lagi", None).await.unwrap_err();
        assert_eq!(err.field(), Some("kode_gedung"));

        let err = svc.add_building(&admin, "GD-NEW", "  ", None).await.unwrap_err();
        assert_eq!(err.field(), Some("nama_gedung"));

        let err = svc.add_room(&admin, 9999, "R-1", "Ruang").await.unwrap_err();
        assert_eq!(err.field(), Some("id_gedung"));
    }

    #[tokio::test]
    async fn reported_facility_cannot_be_removed() {
        let (svc, pool) = service().await;
        let admin = fixtures::user(&pool, "admin@jti.com").await;
        let reporter = fixtures::user(&pool, "yefta.octa@jti.com").await;
        let ac = fixtures::facility_id(&pool, "LPR-1", "AC").await;

        TicketService::new(pool.clone())
            .submit(
                &reporter,
                NewReport {
                    facility_id: ac,
                    damage_quantity: 1,
                    description: "Remote hilang".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = svc.remove_facility(&admin, ac).await.unwrap_err();
        assert_eq!(err.field(), Some("id_fasilitas"));
    }
}
