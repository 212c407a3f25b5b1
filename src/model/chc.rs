// src/model/chc.rs

use crate::io::demand::DemandModel;
use crate::model::facility::Facility;
use crate::model::medicine::{per_age, per_class, AgeGroup, ByAge, ByClass, MedicineClass};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

/// Inputs for one CHC's demand resolution in one month.
#[derive(Debug, Clone, Copy)]
pub struct DemandContext<'a> {
    pub month: usize,
    pub demand: &'a DemandModel,
    pub outbreak_multiplier: f64,
    /// Share of Penicillin demand that is resistant, while AMR is active.
    pub resistance_rate: Option<f64>,
    pub private_sector_diversion: f64,
    pub death_rates: &'a ByAge<f64>,
}

/// What happened at one CHC in one month.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandOutcome {
    pub attended: bool,
    pub treated: ByAge<u32>,
    pub untreated: ByAge<u32>,
    pub deaths: ByAge<u32>,
    pub shortages: ByClass<u32>,
}

impl DemandOutcome {
    fn new(attended: bool) -> Self {
        Self {
            attended,
            treated: per_age(),
            untreated: per_age(),
            deaths: per_age(),
            shortages: per_class(),
        }
    }

    /// Records unmet demand for `class` in `age`, returning the deaths it causes.
    fn record_unmet(&mut self, class: MedicineClass, age: AgeGroup, unmet: u32, death_rate: f64) -> u32 {
        let deaths = (unmet as f64 * death_rate) as u32;
        *self.untreated.entry(age).or_default() += unmet;
        *self.shortages.entry(class).or_default() += unmet;
        *self.deaths.entry(age).or_default() += deaths;
        deaths
    }
}

impl Facility {
    /// Rolls this month's health-worker attendance. No-op for non-CHCs.
    pub fn roll_attendance<R: Rng + ?Sized>(&mut self, absenteeism: &Bernoulli, rng: &mut R) {
        if let Some(chc) = self.chc_mut() {
            chc.health_worker_present = !absenteeism.sample(rng);
        }
    }

    /// Serves this month's patients from stock.
    ///
    /// Per class, in fixed class order:
    /// 1. while AMR is active, resistant Penicillin cases are served from
    ///    Macrolides instead (unmet ones count as Macrolide shortages);
    /// 2. a private-sector share leaves the public system untouched;
    /// 3. remaining demand draws FEFO from stock, child -> adult -> elderly;
    /// 4. unmet demand is a shortage and kills floor(unmet * death_rate).
    ///
    /// When the health worker is absent nothing happens at all.
    pub fn resolve_demand(&mut self, ctx: &DemandContext<'_>) -> DemandOutcome {
        let Some(chc) = self.chc() else {
            return DemandOutcome::new(false);
        };
        if !chc.health_worker_present {
            return DemandOutcome::new(false);
        }
        let population = chc.population_served;

        let mut outcome = DemandOutcome::new(true);
        let death_rate = |age: &AgeGroup| ctx.death_rates.get(age).copied().unwrap_or(0.0);

        for class in MedicineClass::ALL {
            let forecast = ctx
                .demand
                .forecast(population, ctx.month, class, ctx.outbreak_multiplier);
            let mut demands = ctx.demand.split_by_age(forecast);
            let mut available = self.stock_level(class);

            if class == MedicineClass::Penicillins {
                if let Some(resistance_rate) = ctx.resistance_rate {
                    for (age, demand) in demands.iter_mut() {
                        let resistant = (*demand as f64 * resistance_rate) as u32;
                        if resistant == 0 {
                            continue;
                        }
                        let substitute = self.stock_level(MedicineClass::Macrolides);
                        let served = resistant.min(substitute);
                        self.consume(MedicineClass::Macrolides, served);
                        *outcome.treated.entry(*age).or_default() += served;
                        if resistant > served {
                            outcome.record_unmet(
                                MedicineClass::Macrolides,
                                *age,
                                resistant - served,
                                death_rate(age),
                            );
                        }
                        *demand -= resistant;
                    }
                }
            }

            for (age, demand) in demands.iter() {
                let mut demand = *demand;
                if ctx.private_sector_diversion > 0.0 {
                    demand -= (demand as f64 * ctx.private_sector_diversion) as u32;
                }

                let served = demand.min(available);
                available -= served;
                *outcome.treated.entry(*age).or_default() += served;
                if demand > served {
                    outcome.record_unmet(class, *age, demand - served, death_rate(age));
                }
                self.consume(class, served);
            }
        }

        if let Some(chc) = self.chc_mut() {
            for (age, n) in &outcome.treated {
                *chc.patients_treated.entry(*age).or_default() += *n as u64;
            }
            for (age, n) in &outcome.untreated {
                *chc.patients_untreated.entry(*age).or_default() += *n as u64;
            }
            for (age, n) in &outcome.deaths {
                *chc.deaths.entry(*age).or_default() += *n as u64;
            }
            for (class, n) in &outcome.shortages {
                *chc.shortages.entry(*class).or_default() += *n as u64;
            }
        }
        outcome
    }
}
