//! Fixes to existing machine data before a breaker duty study.
//!
//! The engine decrements machine contributions using each machine's source
//! impedance, and divides by the positive sequence resistance when computing
//! X/R. Machines with missing resistance, or with a source impedance that
//! disagrees with the sequence data, are corrected in place.

use g74_core::{Diagnostics, Machine, NetworkModel};
use tracing::{error, info, warn};

use crate::config::MachineDataConfig;

/// Counts of machines changed by [`prepare_machines`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineDataFixes {
    pub resistance_filled: usize,
    pub source_aligned: usize,
    pub failed: usize,
}

/// Fill missing positive sequence R and align source impedance with
/// (R, X'') for every machine in the model.
pub fn prepare_machines<M: NetworkModel + ?Sized>(
    model: &mut M,
    config: &MachineDataConfig,
    diag: &mut Diagnostics,
) -> MachineDataFixes {
    let mut fixes = MachineDataFixes::default();

    for mut machine in model.machine_snapshot() {
        let mut changed = false;

        if machine.r_positive <= config.min_positive_r {
            let r = machine.x_subtransient / config.assumed_x_over_r;
            warn!(
                "{} has a positive sequence resistance <= {}; set to {:.5} assuming X/R of {}",
                machine.label(),
                config.min_positive_r,
                r,
                config.assumed_x_over_r
            );
            diag.add_warning_with_entity(
                "machines",
                &format!(
                    "Positive sequence R missing, set to {:.5} (X/R {})",
                    r, config.assumed_x_over_r
                ),
                &machine.label(),
            );
            machine.r_positive = r;
            fixes.resistance_filled += 1;
            changed = true;
        }

        if needs_source_alignment(&machine) {
            machine.r_source = machine.r_positive;
            machine.x_source = machine.x_subtransient;
            info!(
                "{} source impedance set to R {:.5} and X {:.5} from its sequence data",
                machine.label(),
                machine.r_source,
                machine.x_source
            );
            fixes.source_aligned += 1;
            changed = true;
        }

        if !changed {
            continue;
        }
        if let Err(status) = model.write_machine(&machine) {
            error!(
                "Unable to update the data of {}: {}; results may not be reliable",
                machine.label(),
                status
            );
            diag.add_error_with_entity("machines", &status.to_string(), &machine.label());
            fixes.failed += 1;
        }
    }

    fixes
}

fn needs_source_alignment(machine: &Machine) -> bool {
    machine.r_source != machine.r_positive || machine.x_source != machine.x_subtransient
}

#[cfg(test)]
mod tests {
    use super::*;
    use g74_core::{Bus, BusId, Network};

    fn network_with(machines: Vec<Machine>) -> Network {
        let mut network = Network::new();
        network.add_bus(Bus {
            id: BusId::new(5),
            ..Bus::default()
        });
        for machine in machines {
            network.add_machine(machine);
        }
        network
    }

    fn machine(id: &str, r: f64, x: f64) -> Machine {
        let mut machine = Machine::new(BusId::new(5), id);
        machine.r_positive = r;
        machine.x_subtransient = x;
        machine
    }

    #[test]
    fn test_missing_resistance_filled() {
        let mut network = network_with(vec![machine("1", 0.0, 0.2)]);
        let mut diag = Diagnostics::new();
        let fixes = prepare_machines(&mut network, &MachineDataConfig::default(), &mut diag);

        assert_eq!(fixes.resistance_filled, 1);
        assert_eq!(fixes.source_aligned, 1);
        assert_eq!(diag.warning_count(), 1);

        let updated = &network.machine_snapshot()[0];
        assert!((updated.r_positive - 0.005).abs() < 1e-12);
        assert_eq!(updated.r_source, updated.r_positive);
        assert_eq!(updated.x_source, 0.2);
    }

    #[test]
    fn test_consistent_machine_untouched() {
        let mut ok = machine("G1", 0.01, 0.25);
        ok.r_source = 0.01;
        ok.x_source = 0.25;
        let mut network = network_with(vec![ok.clone()]);
        let mut diag = Diagnostics::new();
        let fixes = prepare_machines(&mut network, &MachineDataConfig::default(), &mut diag);

        assert_eq!(fixes, MachineDataFixes::default());
        assert!(!diag.has_issues());
        assert_eq!(network.machine_snapshot()[0], ok);
    }

    #[test]
    fn test_source_only_alignment() {
        let mut network = network_with(vec![machine("G2", 0.02, 0.3)]);
        let mut diag = Diagnostics::new();
        let fixes = prepare_machines(&mut network, &MachineDataConfig::default(), &mut diag);

        assert_eq!(fixes.resistance_filled, 0);
        assert_eq!(fixes.source_aligned, 1);
        assert!(!diag.has_issues());
        assert_eq!(network.machine_snapshot()[0].r_source, 0.02);
    }
}
