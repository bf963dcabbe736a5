//! Dashboard figures per role.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::access::{Capability, Role};
use crate::error::Result;
use crate::store::reports::{self, TaskRow};
use crate::store::users::User;
use crate::ticket::{Report, Status};

/// The four technician cards plus the chart series.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TechnicianStats {
    pub total: usize,
    pub assigned: usize,
    pub in_progress: usize,
    /// Completed or already rated.
    pub completed: usize,
    /// Assignments keyed by `YYYY-MM` of the assignment date.
    pub per_month: BTreeMap<String, usize>,
    pub per_building: BTreeMap<String, usize>,
}

impl TechnicianStats {
    fn from_tasks(tasks: &[TaskRow]) -> Self {
        let mut stats = TechnicianStats {
            total: tasks.len(),
            ..Default::default()
        };
        for task in tasks {
            match task.report.status {
                Status::Assigned => stats.assigned += 1,
                Status::InProgress => stats.in_progress += 1,
                s if s.is_finished() => stats.completed += 1,
                _ => {}
            }
            let month = task.assignment.assigned_at.format("%Y-%m").to_string();
            *stats.per_month.entry(month).or_default() += 1;
            *stats
                .per_building
                .entry(task.building_name.clone())
                .or_default() += 1;
        }
        stats
    }
}

/// Report totals per status. Every status is present, zero or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusOverview {
    pub total: i64,
    pub by_status: Vec<(Status, i64)>,
}

impl StatusOverview {
    fn from_counts(counts: &[(Status, i64)]) -> Self {
        let by_status: Vec<(Status, i64)> = Status::ALL
            .iter()
            .map(|&status| {
                let n = counts
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map_or(0, |&(_, n)| n);
                (status, n)
            })
            .collect();
        StatusOverview {
            total: by_status.iter().map(|(_, n)| n).sum(),
            by_status,
        }
    }

    fn from_reports(reports: &[Report]) -> Self {
        let mut counts: Vec<(Status, i64)> = Vec::new();
        for report in reports {
            match counts.iter_mut().find(|(s, _)| *s == report.status) {
                Some((_, n)) => *n += 1,
                None => counts.push((report.status, 1)),
            }
        }
        Self::from_counts(&counts)
    }

    #[cfg(test)]
    pub fn count(&self, status: Status) -> i64 {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |&(_, n)| n)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dashboard {
    Technician(TechnicianStats),
    /// All reports, for Admin and Sarpras.
    Staff(StatusOverview),
    /// The caller's own reports.
    Reporter(StatusOverview),
}

pub struct DashboardService {
    pool: SqlitePool,
}

impl DashboardService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn for_user(&self, actor: &User) -> Result<Dashboard> {
        match actor.role {
            Role::Teknisi => Ok(Dashboard::Technician(self.technician(actor).await?)),
            Role::Admin | Role::Sarpras => Ok(Dashboard::Staff(self.staff(actor).await?)),
            Role::Pelapor => {
                let own = reports::list_reports_by_reporter(&self.pool, actor.id).await?;
                Ok(Dashboard::Reporter(StatusOverview::from_reports(&own)))
            }
        }
    }

    pub async fn technician(&self, actor: &User) -> Result<TechnicianStats> {
        actor.role.require(Capability::WorkRepair)?;
        let tasks = reports::list_tasks_for_technician(&self.pool, actor.id).await?;
        Ok(TechnicianStats::from_tasks(&tasks))
    }

    pub async fn staff(&self, actor: &User) -> Result<StatusOverview> {
        actor.role.require(Capability::ViewAllReports)?;
        let counts = reports::status_counts(&self.pool).await?;
        Ok(StatusOverview::from_counts(&counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FastciliError;
    use crate::seed::fixtures;
    use crate::service::workflow::TicketService;
    use crate::ticket::{NewReport, RepairDocumentation};

    async fn report(svc: &TicketService, reporter: &User, facility_id: i64) -> i64 {
        svc.submit(
            reporter,
            NewReport {
                facility_id,
                damage_quantity: 1,
                description: "Rusak".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn technician_cards_and_series() {
        let pool = fixtures::seeded_pool().await;
        let tickets = TicketService::new(pool.clone());
        let dashboards = DashboardService::new(pool.clone());
        let admin = fixtures::user(&pool, "admin@jti.com").await;
        let reporter = fixtures::user(&pool, "yefta.octa@jti.com").await;
        let tech = fixtures::user(&pool, "rendi.saputra@jti.com").await;

        let ac = fixtures::facility_id(&pool, "LPR-1", "AC").await;
        let sound = fixtures::facility_id(&pool, "AUD", "Sound System").await;

        let waiting = report(&tickets, &reporter, ac).await;
        let working = report(&tickets, &reporter, ac).await;
        let done = report(&tickets, &reporter, sound).await;
        report(&tickets, &reporter, sound).await;
        for id in [waiting, working, done] {
            tickets.assign(&admin, id, tech.id).await.unwrap();
        }
        tickets.start(&tech, working).await.unwrap();
        tickets.start(&tech, done).await.unwrap();
        tickets
            .complete(&tech, done, RepairDocumentation::new("Kabel diganti", "foto.jpg"))
            .await
            .unwrap();

        let stats = dashboards.technician(&tech).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.assigned, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.per_month.values().sum::<usize>(), 3);
        assert_eq!(stats.per_building.get("Gedung Teknologi Informasi"), Some(&2));
        assert_eq!(stats.per_building.get("Gedung Sipil"), Some(&1));

        let overview = dashboards.staff(&admin).await.unwrap();
        assert_eq!(overview.total, 4);
        assert_eq!(overview.count(Status::Submitted), 1);
        assert_eq!(overview.count(Status::Rated), 0);
        assert_eq!(overview.by_status.len(), Status::ALL.len());
    }

    #[tokio::test]
    async fn rated_counts_as_completed() {
        let pool = fixtures::seeded_pool().await;
        let tickets = TicketService::new(pool.clone());
        let admin = fixtures::user(&pool, "admin@jti.com").await;
        let reporter = fixtures::user(&pool, "yefta.octa@jti.com").await;
        let tech = fixtures::user(&pool, "teknisi@jti.com").await;
        let projector = fixtures::facility_id(&pool, "RT-5", "Proyektor").await;

        let id = report(&tickets, &reporter, projector).await;
        tickets.assign(&admin, id, tech.id).await.unwrap();
        tickets.start(&tech, id).await.unwrap();
        tickets
            .complete(&tech, id, RepairDocumentation::new("Lampu diganti", "bukti.png"))
            .await
            .unwrap();
        tickets.rate(&reporter, id, 5, "Cepat").await.unwrap();

        let stats = DashboardService::new(pool.clone())
            .technician(&tech)
            .await
            .unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.in_progress, 0);
    }

    #[tokio::test]
    async fn dashboard_follows_role() {
        let pool = fixtures::seeded_pool().await;
        let tickets = TicketService::new(pool.clone());
        let dashboards = DashboardService::new(pool.clone());
        let reporter = fixtures::user(&pool, "yefta.octa@jti.com").await;
        let other = fixtures::user(&pool, "pelapor@jti.com").await;
        let kursi = fixtures::facility_id(&pool, "RT-5", "Kursi").await;
        report(&tickets, &reporter, kursi).await;
        report(&tickets, &other, kursi).await;

        match dashboards.for_user(&reporter).await.unwrap() {
            Dashboard::Reporter(own) => {
                assert_eq!(own.total, 1);
                assert_eq!(own.count(Status::Submitted), 1);
            }
            other => panic!("expected reporter dashboard, got {other:?}"),
        }

        let staff = fixtures::user(&pool, "sarpras@jti.com").await;
        assert!(matches!(
            dashboards.for_user(&staff).await.unwrap(),
            Dashboard::Staff(StatusOverview { total: 2, .. })
        ));

        let tech = fixtures::user(&pool, "teknisi@jti.com").await;
        assert!(matches!(
            dashboards.for_user(&tech).await.unwrap(),
            Dashboard::Technician(TechnicianStats { total: 0, .. })
        ));
    }

    #[tokio::test]
    async fn reporter_cannot_see_staff_overview() {
        let pool = fixtures::seeded_pool().await;
        let reporter = fixtures::user(&pool, "pelapor@jti.com").await;
        let err = DashboardService::new(pool).staff(&reporter).await.unwrap_err();
        assert!(matches!(err, FastciliError::Forbidden { .. }));
    }
}
