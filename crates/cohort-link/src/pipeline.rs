//! End-to-end cohort linkage.

use tracing::{info, info_span};

use cohort_model::{LinkOptions, RegionCatalog, RunReport, ScanState, StageReport, fields};

use crate::align::{ModalityAligner, ModalitySources, StageLog};
use crate::columns::JoinSuffixes;
use crate::derive::{rename_column, scan_gap_days};
use crate::error::Result;
use crate::frame::SourceFrame;
use crate::gate::tolerance_gate;
use crate::nearest::{NearestJoin, match_nearest};
use crate::regions::{RegionSelection, select_regions};

/// Every input table of a run.
#[derive(Debug, Clone)]
pub struct CohortSources {
    pub primary: ModalitySources,
    pub secondary: ModalitySources,
    /// Visit registry (`VISCODE`, `VISCODE2`, `EXAMDATE`).
    pub registry: SourceFrame,
    /// Clinical assessments (`EXAMDATE`, `EXAMDATE_BL`, `AGE`, `DX`).
    pub assessments: SourceFrame,
    pub genotypes: SourceFrame,
}

/// The linked cohort and how it was produced.
#[derive(Debug, Clone)]
pub struct CohortOutput {
    pub frame: SourceFrame,
    pub selection: RegionSelection,
    pub stages: Vec<StageReport>,
}

impl CohortOutput {
    /// `(rows, columns)` of the final table.
    pub fn shape(&self) -> (usize, usize) {
        (self.frame.height(), self.frame.width())
    }

    /// Folds this output into a run report.
    pub fn run_report(&self) -> RunReport {
        RunReport {
            stages: self.stages.clone(),
            catalog_mismatches: self.selection.mismatches.clone(),
            output_rows: self.frame.height(),
            output_columns: self.frame.width(),
            ..RunReport::default()
        }
    }
}

/// Links primary scans to visits, assessments, genotypes and the nearest
/// secondary scan, then lays out the region columns.
///
/// Either the whole cohort is produced or the first schema problem aborts
/// the run.
pub fn link_cohort(
    sources: &CohortSources,
    catalog: &RegionCatalog,
    options: &LinkOptions,
) -> Result<CohortOutput> {
    options.validate()?;
    let mut log = StageLog::default();

    let (primary, secondary) = {
        let mut aligner = ModalityAligner::new(options, &sources.registry, &mut log);
        let primary_scans = aligner.align_scans(&options.primary, &sources.primary)?;
        let primary = aligner.annotate_subjects(
            &options.primary,
            &primary_scans,
            &sources.assessments,
            &sources.genotypes,
        )?;
        let secondary = aligner.align_scans(&options.secondary, &sources.secondary)?;
        (primary, secondary)
    };

    let linked = {
        let span = info_span!("cross_modality");
        let _guard = span.enter();

        let primary_date = options.primary.scan_date_column();
        let secondary_date = options.secondary.scan_date_column();
        let primary = rename_column(&primary, fields::SCANDATE, &primary_date)?;
        let secondary = rename_column(&secondary, fields::SCANDATE, &secondary_date)?;

        let join = NearestJoin::new("cross-modality", &primary_date, &secondary_date)
            .direction(options.direction)
            .suffixes(JoinSuffixes::both(&options.primary.tag, &options.secondary.tag))
            .state(ScanState::CrossModalityMatched);
        let paired = log.record(match_nearest(&primary, &secondary, &join)?);
        let with_gap = scan_gap_days(
            &paired,
            &primary_date,
            &secondary_date,
            fields::AMY_TAU_SCANDIFF_DAYS,
        )?;
        log.record(tolerance_gate(
            &with_gap,
            fields::AMY_TAU_SCANDIFF_DAYS,
            options.tolerance_days,
        )?)
    };

    let (frame, selection) = select_regions(&linked, catalog, &options.modality_tags())?;
    let output = CohortOutput {
        frame: SourceFrame::new("cohort", frame.data),
        selection,
        stages: log.into_reports(),
    };
    let (rows, columns) = output.shape();
    info!(
        rows,
        columns,
        mismatches = output.selection.mismatches.len(),
        "cohort linked"
    );
    Ok(output)
}
