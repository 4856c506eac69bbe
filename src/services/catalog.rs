use std::collections::{BTreeSet, HashSet};

use serde::Deserialize;

use crate::models::{Service, ServiceId, Staff, StaffId};

/// Reference data: what is offered and who can perform it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    services: Vec<Service>,
    staff: Vec<Staff>,
}

impl Catalog {
    pub fn new(services: Vec<Service>, staff: Vec<Staff>) -> anyhow::Result<Self> {
        let catalog = Self { services, staff };
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_json::from_str(s)?;
        catalog.check()?;
        Ok(catalog)
    }

    /// The stock catalog the product ships with.
    pub fn demo() -> Self {
        let services = [
            (1, "Haircut & Styling", 60, 80.0),
            (2, "Massage Therapy", 90, 120.0),
            (3, "Dental Checkup", 45, 150.0),
            (4, "Car Maintenance", 120, 200.0),
            (5, "Yoga Class", 60, 40.0),
        ]
        .into_iter()
        .map(|(id, name, duration_minutes, price)| Service {
            id,
            name: name.to_string(),
            duration_minutes,
            price,
        })
        .collect();

        let staff = [
            (1, "John Davis"),
            (2, "Sarah Wilson"),
            (3, "Dr. Robert Brown"),
            (4, "Tony Garcia"),
            (5, "Maya Patel"),
        ]
        .into_iter()
        .map(|(id, name)| Staff {
            id,
            name: name.to_string(),
            specialty_service_ids: BTreeSet::from([id]),
        })
        .collect();

        Self { services, staff }
    }

    fn check(&self) -> anyhow::Result<()> {
        let mut service_ids = HashSet::new();
        for service in &self.services {
            anyhow::ensure!(
                service_ids.insert(service.id),
                "duplicate service id: {}",
                service.id
            );
            anyhow::ensure!(
                service.duration_minutes > 0,
                "service {} must have a positive duration",
                service.id
            );
            anyhow::ensure!(
                service.price.is_finite() && service.price >= 0.0,
                "service {} has an invalid price: {}",
                service.id,
                service.price
            );
        }

        let mut staff_ids = HashSet::new();
        for member in &self.staff {
            anyhow::ensure!(staff_ids.insert(member.id), "duplicate staff id: {}", member.id);
            if let Some(unknown) = member
                .specialty_service_ids
                .iter()
                .find(|id| !service_ids.contains(*id))
            {
                anyhow::bail!("staff {} lists unknown service {unknown}", member.id);
            }
        }

        Ok(())
    }

    pub fn list_services(&self) -> Vec<Service> {
        self.services.clone()
    }

    /// All staff, or only those who perform `service_id` when given.
    pub fn list_staff(&self, service_id: Option<ServiceId>) -> Vec<Staff> {
        self.staff
            .iter()
            .filter(|s| service_id.map_or(true, |id| s.performs(id)))
            .cloned()
            .collect()
    }

    pub fn service(&self, id: ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn staff(&self, id: StaffId) -> Option<&Staff> {
        self.staff.iter().find(|s| s.id == id)
    }

    pub fn staff_can_perform(&self, staff_id: StaffId, service_id: ServiceId) -> bool {
        self.staff(staff_id).is_some_and(|s| s.performs(service_id))
    }
}
