//! Flow-balancing policy for the rotating pump group
//!
//! `NUM_FORWARD` plungers deliver at any instant while the rest of the
//! `NUM_PUMPING` group draw their chambers full again. Each tick, before any
//! plunger advances, delivering plungers that are nearly spent hand delivery
//! over to the next plunger in rotation order and go back to refilling.
//!
//! Plungers count up from 0 (full chamber) toward `Xmax` (empty chamber)
//! while delivering. Comparisons only; no division on the hot path except
//! the per-plunger flow share.

use super::mask::StepMask;
use crate::fixed::Fixed32;
use crate::motion::FixedPointMotor;

/// Rotation group layout (`NUM_PUMPING`, `NUM_FORWARD`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PumpGroup {
    pumps: usize,
    forward: usize,
}

impl PumpGroup {
    /// `forward` is kept within `[1, pumps - 1]` when the group allows it
    pub fn new(pumps: u8, forward: u8) -> Self {
        let pumps = pumps as usize;
        let forward = (forward as usize).clamp(1, pumps.saturating_sub(1).max(1));
        Self { pumps, forward }
    }

    pub fn pumps(&self) -> usize {
        self.pumps
    }

    pub fn forward(&self) -> usize {
        self.forward
    }

    /// Flow share of the `nth` delivering plunger
    ///
    /// Shares of all `NUM_FORWARD` plungers add up to `flux` exactly; the
    /// division remainder goes to the first ones in index order.
    pub fn share(&self, flux: i32, nth: usize) -> Fixed32 {
        let forward = self.forward as i32;
        let base = flux / forward;
        let remainder = (flux % forward) as usize;
        Fixed32(base + i32::from(nth < remainder))
    }

    /// Number of group members among `registered` actuators
    pub fn active(&self, registered: usize) -> usize {
        self.pumps.min(registered)
    }
}

/// Would the plunger ahead finish its stroke no later than `motor`?
///
/// Strict comparison so rounding never produces back-to-back reversals.
pub fn longer_to_fill(motor: &FixedPointMotor, ahead: &FixedPointMotor) -> bool {
    let x_max = motor.limits().x_max as i64;
    11 * (motor.position() as i64 + ahead.position() as i64) > 10 * x_max
}

/// Pass 1: delivering plungers that must hand over this tick
pub fn plan_reversals(group: &PumpGroup, motors: &[FixedPointMotor]) -> StepMask {
    let n = group.active(motors.len());
    let mut marked = StepMask::empty();
    for m in 0..n {
        let motor = &motors[m];
        if !motor.is_delivering() {
            continue;
        }
        let ahead_index = (m + n - 1) % n;
        let ahead = &motors[ahead_index];
        let handover =
            ahead_index != m && ahead.is_delivering() && longer_to_fill(motor, ahead);
        if motor.will_crash() || handover {
            marked.set(m);
        }
    }
    marked
}

/// Pass 2: hand every marked plunger's delivery to a successor
///
/// The successor is the next plunger in rotation order that is neither
/// delivering nor itself marked. A marked plunger only reverses once its
/// successor is assigned; without one it keeps delivering and is marked
/// again on the next tick. Returns the plungers actually reversed.
pub fn apply_reversals(
    group: &PumpGroup,
    motors: &mut [FixedPointMotor],
    marked: StepMask,
    flux: i32,
) -> StepMask {
    let n = group.active(motors.len());
    let mut reversed = StepMask::empty();
    for m in marked.iter() {
        let successor = (1..n)
            .map(|offset| (m + offset) % n)
            .find(|&j| !marked.contains(j) && !motors[j].is_delivering());
        let Some(j) = successor else {
            continue;
        };

        let v_max = motors[m].limits().v_max;
        motors[m].set_velocity(-v_max);
        motors[j].set_velocity(group.share(flux, 0));
        reversed.set(m);
    }
    reversed
}

/// Pass 3: halve the target of any refilling plunger about to bottom out
pub fn brake_crashing(group: &PumpGroup, motors: &mut [FixedPointMotor]) {
    let n = group.active(motors.len());
    for motor in motors[..n].iter_mut() {
        if motor.is_refilling() && motor.will_crash() {
            let halved = motor.target().div_int(2);
            motor.set_velocity(halved);
        }
    }
}

/// Give exactly `NUM_FORWARD` plungers their share of `flux`
///
/// Short of deliverers, the fullest refilling plungers are promoted; any
/// deliverer beyond `NUM_FORWARD` goes back to refilling.
pub fn distribute_flux(group: &PumpGroup, motors: &mut [FixedPointMotor], flux: i32) {
    let n = group.active(motors.len());
    let mut delivering = motors[..n].iter().filter(|m| m.is_delivering()).count();
    while delivering < group.forward() {
        let fullest = motors[..n]
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_delivering())
            .min_by_key(|(_, m)| m.position())
            .map(|(j, _)| j);
        let Some(j) = fullest else {
            break;
        };
        motors[j].set_velocity(group.share(flux, 0));
        delivering += 1;
    }

    let mut nth = 0;
    for motor in motors[..n].iter_mut() {
        if !motor.is_delivering() {
            continue;
        }
        if nth < group.forward() {
            let share = group.share(flux, nth);
            if motor.target() != share {
                motor.set_velocity(share);
            }
        } else {
            let v_max = motor.limits().v_max;
            motor.set_velocity(-v_max);
        }
        nth += 1;
    }
}

/// Roles for a group that starts pumping: the first `NUM_FORWARD` deliver,
/// the others refill at full speed
pub fn assign_initial_roles(group: &PumpGroup, motors: &mut [FixedPointMotor], flux: i32) {
    let n = group.active(motors.len());
    for (m, motor) in motors[..n].iter_mut().enumerate() {
        if m < group.forward() {
            motor.set_velocity(group.share(flux, m));
        } else {
            let v_max = motor.limits().v_max;
            motor.set_velocity(-v_max);
        }
    }
}

/// One full balancing pass; returns the plungers that were reversed
pub fn rebalance(group: &PumpGroup, motors: &mut [FixedPointMotor], flux: i32) -> StepMask {
    let marked = plan_reversals(group, motors);
    let reversed = apply_reversals(group, motors, marked, flux);
    brake_crashing(group, motors);
    distribute_flux(group, motors, flux);
    reversed
}

/// Sum of the delivering plungers' targets
pub fn delivered_flux(group: &PumpGroup, motors: &[FixedPointMotor]) -> i64 {
    let n = group.active(motors.len());
    motors[..n]
        .iter()
        .filter(|m| m.is_delivering())
        .map(|m| m.target().raw() as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionLimits;

    fn limits(x_max: i32) -> MotionLimits {
        MotionLimits {
            v_max: Fixed32(1 << 15),
            a_max: Fixed32(1 << 15),
            x_max,
        }
    }

    fn motor_at(position: i32, x_max: i32) -> FixedPointMotor {
        let mut motor = FixedPointMotor::new(limits(x_max));
        motor.set_velocity(Fixed32::ONE);
        while motor.position() < position {
            motor.advance();
        }
        motor.set_velocity(Fixed32::ZERO);
        motor
    }

    #[test]
    fn test_share_sums_exactly() {
        let group = PumpGroup::new(5, 3);
        let flux = 1001;
        let total: i32 = (0..3).map(|k| group.share(flux, k).raw()).sum();
        assert_eq!(total, flux);
        assert_eq!(group.share(flux, 0).raw(), 334);
        assert_eq!(group.share(flux, 2).raw(), 333);
    }

    #[test]
    fn test_forward_count_kept_below_pumps() {
        assert_eq!(PumpGroup::new(3, 3).forward(), 2);
        assert_eq!(PumpGroup::new(3, 0).forward(), 1);
    }

    #[test]
    fn test_longer_to_fill_is_strict() {
        // 11 * (50 + 50) = 1100 is not greater than 10 * 110
        let a = motor_at(50, 110);
        let b = motor_at(50, 110);
        assert!(!longer_to_fill(&a, &b));
        let c = motor_at(51, 110);
        assert!(longer_to_fill(&c, &b));
    }

    #[test]
    fn test_single_reversal() {
        let x_max = 10;
        let group = PumpGroup::new(2, 1);
        let flux = 1 << 14;
        let mut motors = [motor_at(x_max - 1, x_max), FixedPointMotor::new(limits(x_max))];
        motors[0].set_velocity(Fixed32(flux));

        let reversed = rebalance(&group, &mut motors, flux);

        assert!(reversed.contains(0));
        assert_eq!(reversed.len(), 1);
        assert_eq!(motors[0].target(), -limits(x_max).v_max);
        assert_eq!(motors[1].target(), Fixed32(flux));
    }

    #[test]
    fn test_no_reversal_mid_stroke() {
        let group = PumpGroup::new(3, 1);
        let flux = 1 << 14;
        let mut motors = [
            motor_at(100, 3200),
            motor_at(0, 3200),
            motor_at(0, 3200),
        ];
        assign_initial_roles(&group, &mut motors, flux);
        assert!(rebalance(&group, &mut motors, flux).is_empty());
        assert_eq!(delivered_flux(&group, &motors), flux as i64);
    }

    #[test]
    fn test_successors_skip_marked_and_delivering_plungers() {
        let x_max = 100;
        let group = PumpGroup::new(4, 2);
        let flux = 3000;
        let mut motors = [
            motor_at(0, x_max),
            motor_at(0, x_max),
            motor_at(x_max - 1, x_max),
            motor_at(10, x_max),
        ];
        motors[2].set_velocity(Fixed32(1500));
        motors[3].set_velocity(Fixed32(1500));

        // 2 is about to crash and drags 3 (nearly spent as a pair) with it
        let reversed = rebalance(&group, &mut motors, flux);

        assert!(reversed.contains(2));
        assert!(reversed.contains(3));
        assert!(motors[0].is_delivering());
        assert!(motors[1].is_delivering());
        assert!(motors[2].is_refilling());
        assert!(motors[3].is_refilling());
        assert_eq!(delivered_flux(&group, &motors), flux as i64);
    }

    #[test]
    fn test_handover_when_pair_nearly_spent() {
        let x_max = 100;
        let group = PumpGroup::new(3, 2);
        let flux = 2000;
        // 11 * (50 + 42) = 1012 > 1000
        let mut motors = [
            motor_at(42, x_max),
            motor_at(50, x_max),
            motor_at(0, x_max),
        ];
        motors[0].set_velocity(Fixed32(1000));
        motors[1].set_velocity(Fixed32(1000));

        let marked = plan_reversals(&group, &motors);
        // Plunger 1 sees plunger 0 ahead of it; plunger 0 sees plunger 2,
        // which is not delivering
        assert!(marked.contains(1));
        assert!(!marked.contains(0));

        rebalance(&group, &mut motors, flux);
        assert!(motors[1].is_refilling());
        assert!(motors[2].is_delivering());
        assert_eq!(delivered_flux(&group, &motors), flux as i64);
    }

    #[test]
    fn test_marked_plunger_waits_for_a_free_successor() {
        let x_max = 100;
        let group = PumpGroup::new(3, 2);
        let flux = 2000;
        // Both deliverers are spent but only plunger 2 can take over
        let mut motors = [
            motor_at(x_max - 1, x_max),
            motor_at(x_max - 1, x_max),
            motor_at(0, x_max),
        ];
        motors[0].set_velocity(Fixed32(1000));
        motors[1].set_velocity(Fixed32(1000));

        let reversed = rebalance(&group, &mut motors, flux);

        assert_eq!(reversed.len(), 1);
        assert!(reversed.contains(0));
        assert!(motors[0].is_refilling());
        assert!(motors[1].is_delivering());
        assert!(motors[2].is_delivering());
        assert_eq!(delivered_flux(&group, &motors), flux as i64);
    }

    #[test]
    fn test_distribute_promotes_fullest_refiller() {
        let group = PumpGroup::new(4, 2);
        let flux = 3001;
        let mut motors = [
            motor_at(30, 100),
            motor_at(20, 100),
            motor_at(5, 100),
            motor_at(60, 100),
        ];
        motors[0].set_velocity(Fixed32(-1000));
        motors[1].set_velocity(Fixed32(-1000));
        motors[2].set_velocity(Fixed32(-1000));
        motors[3].set_velocity(Fixed32(1000));

        distribute_flux(&group, &mut motors, flux);

        assert!(motors[2].is_delivering());
        assert!(motors[3].is_delivering());
        assert!(motors[0].is_refilling());
        assert!(motors[1].is_refilling());
        assert_eq!(delivered_flux(&group, &motors), flux as i64);
    }

    #[test]
    fn test_distribute_sends_extra_deliverers_back() {
        let group = PumpGroup::new(3, 1);
        let v_max = limits(100).v_max;
        let mut motors = [motor_at(10, 100), motor_at(20, 100), motor_at(0, 100)];
        motors[0].set_velocity(Fixed32(1000));
        motors[1].set_velocity(Fixed32(1000));

        distribute_flux(&group, &mut motors, 1500);

        assert_eq!(motors[0].target(), Fixed32(1500));
        assert_eq!(motors[1].target(), -v_max);
        assert_eq!(delivered_flux(&group, &motors), 1500);
    }

    #[test]
    fn test_brake_halves_refilling_at_bottom() {
        let group = PumpGroup::new(2, 1);
        let mut motors = [motor_at(0, 100), motor_at(5, 100)];
        motors[0].set_velocity(Fixed32(-1000));
        motors[1].set_velocity(Fixed32(-1000));

        brake_crashing(&group, &mut motors);

        assert_eq!(motors[0].target(), Fixed32(-500));
        // Not at the bottom yet
        assert_eq!(motors[1].target(), Fixed32(-1000));
    }

    #[test]
    fn test_initial_roles() {
        let group = PumpGroup::new(3, 1);
        let mut motors = [
            FixedPointMotor::new(limits(100)),
            FixedPointMotor::new(limits(100)),
            FixedPointMotor::new(limits(100)),
        ];
        assign_initial_roles(&group, &mut motors, 1234);
        assert_eq!(motors[0].target(), Fixed32(1234));
        assert_eq!(motors[1].target(), -limits(100).v_max);
        assert_eq!(motors[2].target(), -limits(100).v_max);
    }
}
