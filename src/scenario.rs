//! Scenario generator: one randomized perturbation of the baseline per trial
//!
//! Each trial independently perturbs every uncertain quantity around its
//! nominal value using the sampling primitives from [`crate::uncertainty`].
//! The generator has no side effects beyond advancing the injected sampler.

use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::types::{BaseScenario, SimulationScenario};
use crate::uncertainty::{UncertaintyParameters, UncertaintySampler};

/// Generates per-trial [`SimulationScenario`] values from a baseline
#[derive(Debug, Clone)]
pub struct ScenarioGenerator<'a> {
    base: &'a BaseScenario,
    params: &'a UncertaintyParameters,
}

impl<'a> ScenarioGenerator<'a> {
    /// Create a generator over a baseline and validated parameters
    pub fn new(base: &'a BaseScenario, params: &'a UncertaintyParameters) -> Self {
        Self { base, params }
    }

    /// Generate the trial at `trial_index`
    ///
    /// Perturbed availabilities, quantities and delays are clamped to >= 0.
    /// The draw order is fixed (materials, orders, routes, equipment, global
    /// factors) so a given sampler state always yields the same scenario.
    pub fn generate(
        &self,
        run_id: Uuid,
        trial_index: u64,
        sampler: &mut UncertaintySampler,
    ) -> SimulationScenario {
        let mut material_availability = BTreeMap::new();
        for material in &self.base.materials {
            let perturbed = sampler
                .sample_pct(
                    material.available_tonnes,
                    self.params.material_availability_pct,
                )
                .max(0.0);
            material_availability.insert(material.id.clone(), perturbed);
        }

        let mut order_quantities = BTreeMap::new();
        let mut order_arrival_offsets = BTreeMap::new();
        for order in &self.base.orders {
            let quantity = sampler
                .sample_pct(order.quantity_tonnes, self.params.demand_variability_pct)
                .max(0.0);
            order_quantities.insert(order.id.clone(), quantity);

            // Arrival jitter is drawn around zero, scaled to the order's SLA
            // window; a positive offset eats into the delivery window.
            let offset_std = order.sla_hours * self.params.order_arrival_pct / 100.0;
            let offset = sampler.sample_normal(0.0, offset_std);
            order_arrival_offsets.insert(order.id.clone(), offset);
        }

        let mut transport_delays = BTreeMap::new();
        for route in &self.base.routes {
            let delay = sampler
                .sample_normal(
                    route.nominal_delay_hours,
                    self.params.transport_delay_std_hours,
                )
                .max(0.0);
            transport_delays.insert(route.destination.clone(), delay);
        }

        let mut operational_equipment = 0u32;
        for _ in 0..self.base.equipment_units {
            if !sampler.sample_bernoulli(self.params.equipment_failure_probability) {
                operational_equipment += 1;
            }
        }

        let cost_factor = sampler
            .sample_normal(1.0, self.params.cost_variation_pct / 100.0)
            .max(0.0);
        let demand_factor = sampler
            .sample_normal(1.0, self.params.demand_variability_pct / 100.0)
            .max(0.0);

        SimulationScenario {
            run_id,
            trial_index,
            material_availability,
            order_quantities,
            order_arrival_offsets,
            transport_delays,
            cost_factor,
            operational_equipment,
            demand_factor,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Material, Order, TransportRoute};

    fn base() -> BaseScenario {
        BaseScenario::new("gen-test")
            .with_material(Material::new("HR-COIL", 1_200.0))
            .with_material(Material::new("PIG-IRON", 400.0))
            .with_order(Order::new("O1", "HR-COIL", 500.0, "Bhilai", 48.0))
            .with_order(Order::new("O2", "PIG-IRON", 200.0, "Durgapur", 72.0))
            .with_route(TransportRoute::new("Bhilai", 36.0, 110.0))
            .with_route(TransportRoute::new("Durgapur", 60.0, 95.0))
            .with_equipment(4, 500.0)
    }

    #[test]
    fn test_same_seed_same_scenario() {
        let base = base();
        let params = UncertaintyParameters::default();
        let generator = ScenarioGenerator::new(&base, &params);
        let run_id = Uuid::nil();

        let a = generator.generate(run_id, 3, &mut UncertaintySampler::new(99));
        let b = generator.generate(run_id, 3, &mut UncertaintySampler::new(99));

        assert_eq!(a.material_availability, b.material_availability);
        assert_eq!(a.order_quantities, b.order_quantities);
        assert_eq!(a.transport_delays, b.transport_delays);
        assert_eq!(a.cost_factor, b.cost_factor);
        assert_eq!(a.operational_equipment, b.operational_equipment);
    }

    #[test]
    fn test_different_seeds_differ() {
        let base = base();
        let params = UncertaintyParameters::default();
        let generator = ScenarioGenerator::new(&base, &params);
        let run_id = Uuid::nil();

        let a = generator.generate(run_id, 0, &mut UncertaintySampler::new(1));
        let b = generator.generate(run_id, 1, &mut UncertaintySampler::new(2));
        assert_ne!(a.cost_factor, b.cost_factor);
    }

    #[test]
    fn test_perturbations_clamped_non_negative() {
        let base = base();
        // Huge variances force draws below zero before clamping
        let params = UncertaintyParameters::default()
            .with_material_availability(300.0)
            .with_transport_delay(200.0)
            .with_demand_variability(300.0);
        let generator = ScenarioGenerator::new(&base, &params);

        for seed in 0..200 {
            let trial =
                generator.generate(Uuid::nil(), seed, &mut UncertaintySampler::new(seed));
            assert!(trial.material_availability.values().all(|v| *v >= 0.0));
            assert!(trial.order_quantities.values().all(|v| *v >= 0.0));
            assert!(trial.transport_delays.values().all(|v| *v >= 0.0));
            assert!(trial.cost_factor >= 0.0);
            assert!(trial.demand_factor >= 0.0);
        }
    }

    #[test]
    fn test_equipment_never_exceeds_fleet() {
        let base = base();
        let params = UncertaintyParameters::default().with_equipment_failure(0.5);
        let generator = ScenarioGenerator::new(&base, &params);

        for seed in 0..100 {
            let trial =
                generator.generate(Uuid::nil(), seed, &mut UncertaintySampler::new(seed));
            assert!(trial.operational_equipment <= base.equipment_units);
        }
    }
}
