//! Shared reconstruction pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow between the CLI and
//! the tests:
//! events -> filter -> event selection -> per-event reconstruction (parallel) -> rows
//!
//! The filter is consulted sequentially in file order, so duplicate handling does not
//! depend on thread scheduling. Reconstruction itself is per event and shares nothing
//! but the immutable resolution model and configuration.

use rayon::prelude::*;

use crate::data::filter::{EventFilter, Rejection};
use crate::domain::{Candidate, Event, EventSummary, JetSet, RecoConfig, RunConfig};
use crate::error::AppError;
use crate::fit::generator::{CandidateGenerator, retain_btagged};
use crate::fit::selection::select_event;
use crate::fit::truth::truth_rank;
use crate::io::json::EventCandidates;
use crate::models::resolution::{ParametrizedResolution, ResolutionModel, jet_resolutions};

/// Event counts collected along the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub events_read: usize,
    pub rows_rejected: usize,
    pub duplicates: usize,
    pub bad_calibration: usize,
    pub failed_selection: usize,
    /// Events dropped because their per-jet collections were inconsistent.
    pub malformed: usize,
    pub reconstructed: usize,
}

/// All computed outputs of a single `topreco run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub summaries: Vec<EventSummary>,
    /// Full candidate lists, when requested.
    pub candidates: Vec<EventCandidates>,
    pub stats: RunStats,
}

/// Reconstruction of one event.
#[derive(Debug, Clone)]
pub struct EventReco {
    pub summary: EventSummary,
    pub candidates: Vec<Candidate>,
}

/// Execute the full pipeline described by `config` and return the computed outputs.
pub fn run_reco(config: &RunConfig) -> Result<RunOutput, AppError> {
    config.reco.validate()?;
    let resolution = match &config.resolution {
        Some(path) => ParametrizedResolution::from_json_file(path)?,
        None => ParametrizedResolution::default(),
    };
    let mut filter = match &config.bad_events {
        Some(path) => {
            let filter = EventFilter::from_bad_event_file(path)?;
            log::info!("loaded {} bad-calibration events from {}", filter.bad_event_count(), path.display());
            filter
        }
        None => EventFilter::new(),
    };

    let ingest = crate::io::ingest::load_events(&config.input)?;
    log::info!(
        "read {} events from {} ({} rows rejected)",
        ingest.events.len(),
        config.input.display(),
        ingest.row_errors.len()
    );

    let keep_candidates = config.candidates_out.is_some();
    let mut output = if config.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| AppError::input(format!("Failed to build worker pool: {e}")))?;
        pool.install(|| process_events(&ingest.events, &config.reco, &resolution, &mut filter, keep_candidates))
    } else {
        process_events(&ingest.events, &config.reco, &resolution, &mut filter, keep_candidates)
    };
    output.stats.rows_rejected = ingest.row_errors.len();
    Ok(output)
}

/// Event-level selection: enough hard jets and enough missing energy.
pub fn passes_selection(event: &Event, config: &RecoConfig) -> bool {
    event.count_jets(config.jet_count_pt) >= config.min_jets && event.met.met >= config.min_met
}

/// Filter, select and reconstruct `events`, keeping input order in the output.
pub fn process_events(
    events: &[Event],
    config: &RecoConfig,
    resolution: &dyn ResolutionModel,
    filter: &mut EventFilter,
    keep_candidates: bool,
) -> RunOutput {
    let mut stats = RunStats {
        events_read: events.len(),
        ..RunStats::default()
    };

    let mut selected = Vec::with_capacity(events.len());
    for ev in events {
        match filter.check(ev) {
            Err(Rejection::Duplicate) => {
                log::debug!("duplicate event {:?}", ev.id);
                stats.duplicates += 1;
                continue;
            }
            Err(Rejection::BadCalibration) => {
                log::debug!("bad-calibration event {:?}", ev.id);
                stats.bad_calibration += 1;
                continue;
            }
            Ok(()) => {}
        }
        if !passes_selection(ev, config) {
            stats.failed_selection += 1;
            continue;
        }
        selected.push(ev);
    }

    let generator = CandidateGenerator::new(config);
    let results: Vec<Result<EventReco, AppError>> = selected
        .par_iter()
        .map(|ev| reconstruct_event(ev, &generator, resolution))
        .collect();

    let mut summaries = Vec::with_capacity(results.len());
    let mut candidates = Vec::new();
    for (ev, result) in selected.iter().zip(results) {
        match result {
            Ok(reco) => {
                if keep_candidates {
                    candidates.push(EventCandidates {
                        id: ev.id,
                        candidates: reco.candidates,
                    });
                }
                summaries.push(reco.summary);
            }
            Err(err) => {
                log::warn!("dropping event {:?}: {err}", ev.id);
                stats.malformed += 1;
            }
        }
    }
    stats.reconstructed = summaries.len();

    RunOutput {
        summaries,
        candidates,
        stats,
    }
}

/// Run the reconstruction core on one event.
pub fn reconstruct_event(
    event: &Event,
    generator: &CandidateGenerator,
    resolution: &dyn ResolutionModel,
) -> Result<EventReco, AppError> {
    let config = generator.config();
    let ordered;
    let event = if event.is_pt_ordered() {
        event
    } else {
        let mut sorted = event.clone();
        sorted.sort_jets_by_pt();
        ordered = sorted;
        &ordered
    };
    let jets = JetSet {
        p4: event.jets.clone(),
        btag: event.btag.clone(),
        sigma: jet_resolutions(resolution, &event.jets, event.is_data),
        parton: if event.is_data { None } else { event.parton.clone() },
    };

    let mut candidates = generator.generate(&jets, &event.lepton, &event.met, config.btag_required)?;
    if config.btagged_candidates_only {
        candidates = retain_btagged(&candidates, &event.btag, config.btag_min);
    }
    let best = select_event(&candidates, &event.btag, config.selection_btag_wp)?;

    let summary = EventSummary {
        id: event.id,
        is_data: event.is_data,
        weight: event.weight,
        met: event.met.met,
        mt: event.lepton_mt(),
        best,
        njets: event.count_jets(config.jet_count_pt),
        nb: event.count_btagged(config.jet_count_pt, config.selection_btag_wp),
        lep1_pt: event.lepton.pt(),
        lep1_eta: event.lepton.eta(),
        n_candidates: candidates.len(),
        truth_rank: truth_rank(&candidates),
    };
    log::trace!("event {:?}: {} candidates, best {:?}", event.id, candidates.len(), best);
    Ok(EventReco { summary, candidates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventId, MissingEnergy, SimConfig};
    use crate::math::lorentz::FourMomentum;
    use crate::models::resolution::ConstantResolution;

    fn four_jet_event(n: u64, is_data: bool) -> Event {
        Event {
            id: EventId { run: 1, lumi: 1, event: n },
            is_data,
            weight: 1.0,
            jets: vec![
                FourMomentum::from_pt_eta_phi_m(95.0, 0.3, 0.1, 9.0),
                FourMomentum::from_pt_eta_phi_m(72.0, -0.8, 2.2, 7.5),
                FourMomentum::from_pt_eta_phi_m(55.0, 1.1, -1.9, 6.0),
                FourMomentum::from_pt_eta_phi_m(41.0, -0.2, -0.7, 5.0),
            ],
            btag: vec![0.9, 0.1, 0.95, 0.2],
            parton: Some(vec![1, -1, 2, 2]),
            lepton: FourMomentum::from_pt_eta_phi_m(48.0, 0.5, 1.2, 0.0),
            met: MissingEnergy::new(85.0, -2.5),
        }
    }

    #[test]
    fn selection_requires_jets_and_met() {
        let cfg = RecoConfig::default();
        let mut ev = four_jet_event(1, false);
        assert!(passes_selection(&ev, &cfg));
        ev.met.met = 49.0;
        assert!(!passes_selection(&ev, &cfg));
        let mut ev = four_jet_event(1, false);
        ev.jets[3] = FourMomentum::from_pt_eta_phi_m(25.0, -0.2, -0.7, 5.0);
        assert!(!passes_selection(&ev, &cfg));
    }

    #[test]
    fn two_tag_event_reports_tagged_b_pair() {
        let generator = CandidateGenerator::new(&RecoConfig::default());
        let reco = reconstruct_event(&four_jet_event(1, false), &generator, &ConstantResolution(0.1)).unwrap();
        assert_eq!(reco.candidates.len(), 12);
        assert_eq!(reco.summary.nb, 2);
        let tagged: Vec<&Candidate> = reco
            .candidates
            .iter()
            .filter(|c| [c.b, c.o] == [0, 2] || [c.b, c.o] == [2, 0])
            .collect();
        let min_chi2 = tagged.iter().map(|c| c.chi2).fold(f64::INFINITY, f64::min);
        assert!(min_chi2.is_finite());
        let expected = if min_chi2 > 9000.0 { crate::domain::SENTINEL } else { min_chi2 };
        assert_eq!(reco.summary.best.chi2, expected);
        // The truth assignment (o=1, b=0) is not a tagged pair but is still ranked.
        assert!(reco.summary.truth_rank.is_some());
    }

    #[test]
    fn jet_order_in_the_input_does_not_change_the_result() {
        let mut sorted = four_jet_event(1, false);
        sorted.jets.push(FourMomentum::from_pt_eta_phi_m(33.0, 1.9, 0.6, 4.0));
        sorted.btag.push(0.05);
        sorted.parton = Some(vec![1, -1, 2, 2, 0]);

        // Hardest (tagged) jet moved to the end.
        let mut shuffled = sorted.clone();
        shuffled.jets.rotate_left(1);
        shuffled.btag.rotate_left(1);
        if let Some(p) = shuffled.parton.as_mut() {
            p.rotate_left(1);
        }
        assert!(!shuffled.is_pt_ordered());

        let generator = CandidateGenerator::new(&RecoConfig::default());
        let res = ConstantResolution(0.1);
        let a = reconstruct_event(&sorted, &generator, &res).unwrap();
        let b = reconstruct_event(&shuffled, &generator, &res).unwrap();
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.candidates, b.candidates);
    }

    #[test]
    fn btagged_only_keeps_tagged_b_roles() {
        let config = RecoConfig {
            btagged_candidates_only: true,
            ..RecoConfig::default()
        };
        let mut ev = four_jet_event(1, false);
        ev.btag = vec![0.1, 0.1, 0.95, 0.2];
        let reco = reconstruct_event(&ev, &CandidateGenerator::new(&config), &ConstantResolution(0.1)).unwrap();
        assert!(!reco.candidates.is_empty());
        assert!(reco.candidates.len() < 12);
        assert!(reco.candidates.iter().all(|c| c.b == 2 || c.o == 2));
        assert_eq!(reco.summary.n_candidates, reco.candidates.len());
    }

    #[test]
    fn data_events_drop_truth_and_duplicates() {
        let mut filter = EventFilter::new();
        let events = vec![four_jet_event(1, true), four_jet_event(1, true), four_jet_event(2, true)];
        let out = process_events(&events, &RecoConfig::default(), &ConstantResolution(0.1), &mut filter, true);
        assert_eq!(out.stats.duplicates, 1);
        assert_eq!(out.stats.reconstructed, 2);
        assert!(out.summaries.iter().all(|s| s.truth_rank.is_none()));
        assert_eq!(out.candidates.len(), 2);
    }

    #[test]
    fn malformed_event_is_dropped_not_fatal() {
        let mut filter = EventFilter::new();
        let mut bad = four_jet_event(2, false);
        bad.parton = Some(vec![1, 2]);
        let events = vec![four_jet_event(1, false), bad];
        let out = process_events(&events, &RecoConfig::default(), &ConstantResolution(0.1), &mut filter, false);
        assert_eq!(out.stats.malformed, 1);
        assert_eq!(out.summaries.len(), 1);
        assert!(out.candidates.is_empty());
    }

    #[test]
    fn simulated_events_reconstruct_deterministically() {
        let res = ParametrizedResolution::default();
        let sim = SimConfig {
            output: std::path::PathBuf::from("unused.jsonl"),
            events: 20,
            seed: 5,
            extra_jets_mean: 0.5,
            data_fraction: 0.0,
        };
        let events = crate::data::sample::simulate_events(&sim, &res).unwrap();
        let a = process_events(&events, &RecoConfig::default(), &res, &mut EventFilter::new(), false);
        let b = process_events(&events, &RecoConfig::default(), &res, &mut EventFilter::new(), false);
        assert_eq!(a.summaries, b.summaries);
        assert_eq!(a.stats.events_read, 20);
        assert_eq!(
            a.stats.reconstructed + a.stats.failed_selection + a.stats.malformed,
            20
        );
    }
}
