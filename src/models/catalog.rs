use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type ServiceId = u64;
pub type StaffId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub duration_minutes: u32,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    pub specialty_service_ids: BTreeSet<ServiceId>,
}

impl Staff {
    pub fn performs(&self, service_id: ServiceId) -> bool {
        self.specialty_service_ids.contains(&service_id)
    }
}
