// src/model/topology.rs

use crate::model::facility::{ChcState, Facility, FacilityId, FacilityKind, FacilityRole};
use crate::model::medicine::{MedicineClass, MedicineLot};
use crate::model::queues::ShipmentRecord;
use crate::simulation::config::SimulationConfig;
use crate::simulation::error::SimulationError;
use std::ops::{Index, IndexMut};

/// The static facility graph: 2 manufacturers -> central store -> hospitals -> CHCs.
///
/// The network owns every facility exactly once. Roles only hold ids, so the
/// hospital <-> CHC relation is a pair of index lookups rather than references.
#[derive(Debug, Clone)]
pub struct Network {
    facilities: Vec<Facility>,
    manufacturers: Vec<FacilityId>,
    central_stores: Vec<FacilityId>,
    hospitals: Vec<FacilityId>,
    chcs: Vec<FacilityId>,
}

impl Network {
    /// Builds the hierarchy and stocks every facility with its initial lots.
    ///
    /// CHCs are assigned to hospitals round-robin by index.
    /// `populations` holds one entry per CHC.
    pub fn build(config: &SimulationConfig, populations: &[u32]) -> Result<Self, SimulationError> {
        if populations.len() != config.n_chcs {
            return Err(SimulationError::InvalidConfig(format!(
                "expected {} CHC populations, got {}",
                config.n_chcs,
                populations.len()
            )));
        }
        if config.n_hospitals == 0 && config.n_chcs > 0 {
            return Err(SimulationError::InvalidTopology(
                "CHCs present but no hospital to serve them".to_string(),
            ));
        }

        let mut network = Network {
            facilities: Vec::new(),
            manufacturers: Vec::new(),
            central_stores: Vec::new(),
            hospitals: Vec::new(),
            chcs: Vec::new(),
        };

        for i in 0..config.n_manufacturers {
            let id = network.add(format!("MFR_{}", i), config.manufacturer_capacity, FacilityRole::manufacturer());
            network.manufacturers.push(id);
        }
        for i in 0..config.n_central_stores {
            let id = network.add(format!("CMS_{}", i), config.central_store_capacity, FacilityRole::CentralStore);
            network.central_stores.push(id);
        }
        for i in 0..config.n_hospitals {
            let id = network.add(format!("HOSP_{}", i), config.hospital_capacity, FacilityRole::hospital());
            network.hospitals.push(id);
        }
        for (idx, population) in populations.iter().enumerate() {
            let hospital = network.hospitals[idx % config.n_hospitals];
            let role = FacilityRole::Chc(ChcState::new(*population, hospital));
            let id = network.add(format!("CHC_{:03}", idx + 1), config.chc_capacity, role);
            network.chcs.push(id);
            if let FacilityRole::Hospital(state) = &mut network.facilities[hospital.0].role {
                state.served_chcs.push(id);
            }
        }

        network.validate()?;
        network.stock_initial_inventory(config);
        Ok(network)
    }

    fn add(&mut self, name: String, capacity: u32, role: FacilityRole) -> FacilityId {
        let id = FacilityId(self.facilities.len());
        self.facilities.push(Facility::new(id, name, capacity, role));
        id
    }

    /// One lot per class of capacity * initial_stock_pct / 3, made in month 0.
    fn stock_initial_inventory(&mut self, config: &SimulationConfig) {
        for facility in &mut self.facilities {
            let quantity = (facility.capacity as f64 * config.initial_stock_pct / 3.0) as u32;
            for class in MedicineClass::ALL {
                facility.receive(MedicineLot::new(class, quantity, 0, config.medicine_shelf_life));
            }
        }
    }

    /// Checks the hospital <-> CHC relation is consistent in both directions.
    pub fn validate(&self) -> Result<(), SimulationError> {
        for &chc_id in &self.chcs {
            let chc = self[chc_id].chc().ok_or_else(|| {
                SimulationError::InvalidTopology(format!("{} is not a CHC", self[chc_id].name))
            })?;
            let hospital = self.facilities.get(chc.hospital.0).ok_or_else(|| {
                SimulationError::InvalidTopology(format!(
                    "{} assigned to missing hospital {}",
                    self[chc_id].name, chc.hospital
                ))
            })?;
            if hospital.kind() != FacilityKind::Hospital || !hospital.served_chcs().contains(&chc_id) {
                return Err(SimulationError::InvalidTopology(format!(
                    "{} is not served by its hospital {}",
                    self[chc_id].name, hospital.name
                )));
            }
        }
        for &hospital_id in &self.hospitals {
            if self[hospital_id].served_chcs().is_empty() {
                return Err(SimulationError::InvalidTopology(format!(
                    "{} serves no CHCs",
                    self[hospital_id].name
                )));
            }
        }
        Ok(())
    }

    // =====================================================================
    // Lookups
    // =====================================================================

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn facilities_mut(&mut self) -> &mut [Facility] {
        &mut self.facilities
    }

    pub fn manufacturers(&self) -> &[FacilityId] {
        &self.manufacturers
    }

    pub fn central_stores(&self) -> &[FacilityId] {
        &self.central_stores
    }

    pub fn hospitals(&self) -> &[FacilityId] {
        &self.hospitals
    }

    pub fn chcs(&self) -> &[FacilityId] {
        &self.chcs
    }

    pub fn served_chcs(&self, hospital: FacilityId) -> &[FacilityId] {
        self[hospital].served_chcs()
    }

    pub fn find(&self, name: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.name == name)
    }

    /// Two distinct facilities borrowed mutably at once.
    fn pair_mut(&mut self, a: FacilityId, b: FacilityId) -> Option<(&mut Facility, &mut Facility)> {
        if a == b || a.0 >= self.facilities.len() || b.0 >= self.facilities.len() {
            return None;
        }
        if a.0 < b.0 {
            let (left, right) = self.facilities.split_at_mut(b.0);
            Some((&mut left[a.0], &mut right[0]))
        } else {
            let (left, right) = self.facilities.split_at_mut(a.0);
            Some((&mut right[0], &mut left[b.0]))
        }
    }

    /// Ships between two facilities of this network. See [`Facility::ship_to`].
    pub fn ship(
        &mut self,
        from: FacilityId,
        to: FacilityId,
        class: MedicineClass,
        quantity: u32,
        transit_time: usize,
        current_month: usize,
        log: &mut Vec<ShipmentRecord>,
    ) -> u32 {
        match self.pair_mut(from, to) {
            Some((source, destination)) => {
                source.ship_to(destination, class, quantity, transit_time, current_month, log)
            }
            None => 0,
        }
    }
}

impl Index<FacilityId> for Network {
    type Output = Facility;

    fn index(&self, id: FacilityId) -> &Facility {
        &self.facilities[id.0]
    }
}

impl IndexMut<FacilityId> for Network {
    fn index_mut(&mut self, id: FacilityId) -> &mut Facility {
        &mut self.facilities[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            n_chcs: 7,
            ..Default::default()
        }
    }

    #[test]
    fn test_round_robin_assignment() {
        let config = small_config();
        let network = Network::build(&config, &[10_000; 7]).unwrap();

        let served: Vec<Vec<&str>> = network
            .hospitals()
            .iter()
            .map(|h| {
                network
                    .served_chcs(*h)
                    .iter()
                    .map(|c| network[*c].name.as_str())
                    .collect()
            })
            .collect();

        assert_eq!(served[0], vec!["CHC_001", "CHC_004", "CHC_007"]);
        assert_eq!(served[1], vec!["CHC_002", "CHC_005"]);
        assert_eq!(served[2], vec!["CHC_003", "CHC_006"]);
    }

    #[test]
    fn test_initial_inventory() {
        let network = Network::build(&small_config(), &[10_000; 7]).unwrap();

        let mfr = network.find("MFR_0").unwrap();
        assert_eq!(mfr.stock_level(MedicineClass::Penicillins), 8_333);
        let cms = network.find("CMS_0").unwrap();
        assert_eq!(cms.stock_level(MedicineClass::Macrolides), 16_666);
        let chc = network.find("CHC_003").unwrap();
        assert_eq!(chc.total_stock(), 999);
        assert_eq!(chc.lots(MedicineClass::Penicillins)[0].expiry_month, 12);
    }

    #[test]
    fn test_hospital_without_chcs_is_rejected() {
        let config = SimulationConfig {
            n_hospitals: 3,
            n_chcs: 2,
            ..Default::default()
        };
        assert!(matches!(
            Network::build(&config, &[10_000; 2]),
            Err(SimulationError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_population_count_mismatch_is_rejected() {
        assert!(Network::build(&small_config(), &[10_000; 3]).is_err());
    }

    #[test]
    fn test_ship_between_facilities() {
        let mut network = Network::build(&small_config(), &[10_000; 7]).unwrap();
        let cms = network.central_stores()[0];
        let hosp = network.hospitals()[1];
        let mut log = Vec::new();

        let shipped = network.ship(cms, hosp, MedicineClass::Penicillins, 1_000, 1, 1, &mut log);

        assert_eq!(shipped, 1_000);
        assert_eq!(network[cms].stock_level(MedicineClass::Penicillins), 15_666);
        assert_eq!(network[hosp].incoming().len(), 1);
        assert_eq!(log[0].to, "HOSP_1");

        assert_eq!(network.ship(hosp, hosp, MedicineClass::Penicillins, 10, 1, 1, &mut log), 0);
    }
}
