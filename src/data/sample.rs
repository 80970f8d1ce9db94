//! Synthetic semi-leptonic top-pair events.
//!
//! Each event is generated at parton level and then "detected":
//!
//! - `t tbar -> (b l nu) (b q q')` with isotropic two-body decays
//! - partons become jets with a random jet mass and Gaussian pT smearing drawn from the
//!   resolution model
//! - extra light jets are added (Poisson multiplicity)
//! - b-tag scores are drawn from flavour-dependent mixtures
//! - the missing momentum is the neutrino plus the jet mismeasurement plus noise
//!
//! Jets outside the acceptance are dropped, so not every event keeps a complete
//! truth assignment. Generation is fully determined by the seed.

use nalgebra::Vector3;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal, Poisson};

use crate::domain::{
    BTAG_MEDIUM, Event, EventId, MissingEnergy, PDG_TOP_MASS, PDG_W_MASS, SimConfig,
};
use crate::error::AppError;
use crate::math::lorentz::{FourMomentum, two_body_decay};
use crate::models::resolution::ResolutionModel;

const B_QUARK_MASS: f64 = 4.8;
/// Jets below this pT or beyond this |eta| are not reconstructed.
const JET_PT_MIN: f64 = 20.0;
const JET_ETA_MAX: f64 = 2.5;
/// Probability that a b jet passes the medium working point.
const B_TAG_EFFICIENCY: f64 = 0.7;
/// Probability that a light jet passes the medium working point.
const MISTAG_RATE: f64 = 0.02;
/// Per-component noise on the missing momentum (GeV).
const MET_NOISE: f64 = 10.0;
const EVENTS_PER_LUMI: usize = 100;

/// Parton-level content of one generated jet.
#[derive(Debug, Clone, Copy)]
struct Parton {
    p4: FourMomentum,
    label: i32,
}

struct Distributions {
    unit: Normal<f64>,
    top_pt: Exp<f64>,
    extra_pt: Exp<f64>,
    extra_jets: Option<Poisson<f64>>,
}

impl Distributions {
    fn new(extra_jets_mean: f64) -> Result<Self, AppError> {
        let unit = Normal::new(0.0, 1.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
        let top_pt = Exp::new(1.0 / 70.0).map_err(|e| AppError::new(4, format!("Top pT distribution error: {e}")))?;
        let extra_pt = Exp::new(1.0 / 25.0).map_err(|e| AppError::new(4, format!("Jet pT distribution error: {e}")))?;
        let extra_jets = if extra_jets_mean > 0.0 {
            Some(
                Poisson::new(extra_jets_mean)
                    .map_err(|e| AppError::new(4, format!("Jet multiplicity distribution error: {e}")))?,
            )
        } else {
            None
        };
        Ok(Self {
            unit,
            top_pt,
            extra_pt,
            extra_jets,
        })
    }
}

pub fn simulate_events(config: &SimConfig, resolution: &dyn ResolutionModel) -> Result<Vec<Event>, AppError> {
    if config.events == 0 {
        return Err(AppError::input("Event count must be > 0."));
    }
    if !(config.extra_jets_mean.is_finite() && config.extra_jets_mean >= 0.0) {
        return Err(AppError::input("Extra jet multiplicity must be a non-negative number."));
    }
    if !(0.0..=1.0).contains(&config.data_fraction) {
        return Err(AppError::input("Data fraction must lie in [0, 1]."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let dist = Distributions::new(config.extra_jets_mean)?;

    let mut events = Vec::with_capacity(config.events);
    for k in 0..config.events {
        let id = EventId {
            run: 1,
            lumi: (k / EVENTS_PER_LUMI) as u32 + 1,
            event: k as u64 + 1,
        };
        let is_data = rng.r#gen::<f64>() < config.data_fraction;
        events.push(simulate_event(&mut rng, &dist, resolution, id, is_data)?);
    }
    Ok(events)
}

fn random_direction(rng: &mut StdRng, normal: &Normal<f64>) -> Vector3<f64> {
    loop {
        let v = Vector3::new(normal.sample(rng), normal.sample(rng), normal.sample(rng));
        if v.norm() > 1e-6 {
            return v;
        }
    }
}

fn random_top(rng: &mut StdRng, dist: &Distributions, phi: f64) -> FourMomentum {
    let pt = dist.top_pt.sample(rng);
    let eta = 1.2 * dist.unit.sample(rng);
    FourMomentum::from_pt_eta_phi_m(pt, eta, phi, PDG_TOP_MASS)
}

fn decay(rng: &mut StdRng, dist: &Distributions, parent: &FourMomentum, m1: f64, m2: f64) -> Result<(FourMomentum, FourMomentum), AppError> {
    let dir = random_direction(rng, &dist.unit);
    two_body_decay(parent, m1, m2, dir)
        .ok_or_else(|| AppError::new(4, "Two-body decay below threshold in event generation."))
}

fn btag_score(rng: &mut StdRng, label: i32) -> f64 {
    let efficiency = if label.abs() == 1 { B_TAG_EFFICIENCY } else { MISTAG_RATE };
    if rng.r#gen::<f64>() < efficiency {
        rng.gen_range(BTAG_MEDIUM..1.0)
    } else {
        rng.gen_range(0.0..BTAG_MEDIUM)
    }
}

fn simulate_event(
    rng: &mut StdRng,
    dist: &Distributions,
    resolution: &dyn ResolutionModel,
    id: EventId,
    is_data: bool,
) -> Result<Event, AppError> {
    let phi = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
    let t_had = random_top(rng, dist, phi);
    let jitter = 0.5 * dist.unit.sample(rng);
    let t_lep = random_top(rng, dist, phi + std::f64::consts::PI + jitter);
    // Charge of the hadronically decaying top.
    let sign = if rng.r#gen::<bool>() { 1 } else { -1 };

    let (b_had, w_had) = decay(rng, dist, &t_had, B_QUARK_MASS, PDG_W_MASS)?;
    let (q1, q2) = decay(rng, dist, &w_had, 0.0, 0.0)?;
    let (b_lep, w_lep) = decay(rng, dist, &t_lep, B_QUARK_MASS, PDG_W_MASS)?;
    let (lepton, nu) = decay(rng, dist, &w_lep, 0.0, 0.0)?;

    let mut partons = vec![
        Parton { p4: b_had, label: sign },
        Parton { p4: q1, label: 2 * sign },
        Parton { p4: q2, label: 2 * sign },
        Parton { p4: b_lep, label: -sign },
    ];
    let n_extra = dist.extra_jets.as_ref().map(|p| p.sample(rng) as usize).unwrap_or(0);
    for _ in 0..n_extra {
        let pt = JET_PT_MIN + dist.extra_pt.sample(rng);
        let eta = 1.5 * dist.unit.sample(rng);
        let phi = rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
        partons.push(Parton {
            p4: FourMomentum::from_pt_eta_phi_m(pt, eta, phi, 0.0),
            label: 0,
        });
    }

    // Detector response.
    let mut mismeasured = nu.pt_vec();
    let mut jets: Vec<(FourMomentum, f64, i32)> = Vec::with_capacity(partons.len());
    for parton in &partons {
        let sigma = resolution.relative_resolution(&parton.p4);
        let scale = (1.0 + sigma * dist.unit.sample(rng)).max(0.1);
        let mass = rng.gen_range(2.0..10.0);
        let jet = FourMomentum::from_pt_eta_phi_m(parton.p4.pt() * scale, parton.p4.eta(), parton.p4.phi(), mass);
        if jet.pt() < JET_PT_MIN || jet.eta().abs() > JET_ETA_MAX {
            // Unreconstructed jets show up entirely as missing momentum.
            mismeasured += parton.p4.pt_vec();
            continue;
        }
        mismeasured += parton.p4.pt_vec() - jet.pt_vec();
        jets.push((jet, btag_score(rng, parton.label), parton.label));
    }
    jets.sort_by(|a, b| b.0.pt().total_cmp(&a.0.pt()));

    let met_vec = mismeasured
        + nalgebra::Vector2::new(MET_NOISE * dist.unit.sample(rng), MET_NOISE * dist.unit.sample(rng));

    Ok(Event {
        id,
        is_data,
        weight: 1.0,
        jets: jets.iter().map(|j| j.0).collect(),
        btag: jets.iter().map(|j| j.1).collect(),
        parton: (!is_data).then(|| jets.iter().map(|j| j.2).collect()),
        lepton,
        met: MissingEnergy::from_vector(met_vec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::truth::find_truth_assignment;
    use crate::models::resolution::ParametrizedResolution;

    fn config(seed: u64) -> SimConfig {
        SimConfig {
            output: std::path::PathBuf::from("unused.jsonl"),
            events: 50,
            seed,
            extra_jets_mean: 1.0,
            data_fraction: 0.0,
        }
    }

    #[test]
    fn same_seed_same_events() {
        let res = ParametrizedResolution::default();
        let a = simulate_events(&config(7), &res).unwrap();
        let b = simulate_events(&config(7), &res).unwrap();
        assert_eq!(a, b);
        let c = simulate_events(&config(8), &res).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn events_are_well_formed() {
        let res = ParametrizedResolution::default();
        let events = simulate_events(&config(11), &res).unwrap();
        assert_eq!(events.len(), 50);
        let mut complete = 0;
        for ev in &events {
            assert_eq!(ev.jets.len(), ev.btag.len());
            let parton = ev.parton.as_ref().unwrap();
            assert_eq!(parton.len(), ev.jets.len());
            assert!(ev.jets.windows(2).all(|w| w[0].pt() >= w[1].pt()));
            assert!(ev.jets.iter().all(|j| j.pt() >= JET_PT_MIN && j.eta().abs() <= JET_ETA_MAX));
            assert!(ev.btag.iter().all(|s| (0.0..1.0).contains(s)));
            if find_truth_assignment(parton).is_some() {
                complete += 1;
            }
        }
        assert!(complete > 0);
    }

    #[test]
    fn data_events_carry_no_truth() {
        let res = ParametrizedResolution::default();
        let mut cfg = config(3);
        cfg.data_fraction = 1.0;
        let events = simulate_events(&cfg, &res).unwrap();
        assert!(events.iter().all(|e| e.is_data && e.parton.is_none()));
    }

    #[test]
    fn rejects_bad_settings() {
        let res = ParametrizedResolution::default();
        let mut cfg = config(1);
        cfg.events = 0;
        assert_eq!(simulate_events(&cfg, &res).unwrap_err().exit_code(), 2);
        let mut cfg = config(1);
        cfg.data_fraction = 1.5;
        assert!(simulate_events(&cfg, &res).is_err());
    }
}
