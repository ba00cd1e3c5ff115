//! Per-modality alignment: scan metadata, registry visit, PET values and
//! clinical assessment, in the order the cohort pipeline needs them.

use tracing::{debug, info_span};

use cohort_model::{
    DropReason, JoinKind, KeepPolicy, LinkOptions, ModalityOptions, PetAnchor, ScanState,
    StageReport, fields,
};

use crate::columns::JoinSuffixes;
use crate::dedupe::dedupe;
use crate::derive::{age_at_scan, coalesce_suffixed};
use crate::error::Result;
use crate::frame::{SourceFrame, StageOutput};
use crate::gate::drop_incomplete;
use crate::genotype::apoe4_table;
use crate::merge::{KeyedMerge, merge_on_keys};
use crate::nearest::{NearestJoin, match_nearest};
use crate::qc::filter_qc;

const META_SUFFIX: &str = "_META";
const QC_SUFFIX: &str = "_QC";

/// The three source tables of one imaging modality.
#[derive(Debug, Clone)]
pub struct ModalitySources {
    /// Scan metadata (one row per acquisition).
    pub metadata: SourceFrame,
    /// QC sheet carrying visit codes and scan dates.
    pub qc: SourceFrame,
    /// Regional PET values.
    pub pet: SourceFrame,
}

/// Stage reports in the order the stages ran.
#[derive(Debug, Clone, Default)]
pub struct StageLog {
    reports: Vec<StageReport>,
}

impl StageLog {
    /// Records the report and hands back the stage's frame.
    pub fn record(&mut self, output: StageOutput) -> SourceFrame {
        debug!(
            stage = %output.report.stage,
            input = output.report.input_rows,
            output = output.report.output_rows,
            dropped = output.report.total_dropped(),
            "stage finished"
        );
        self.reports.push(output.report);
        output.frame
    }

    pub fn reports(&self) -> &[StageReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<StageReport> {
        self.reports
    }
}

/// Runs the per-modality stages against the shared registry and assessments.
pub struct ModalityAligner<'a> {
    options: &'a LinkOptions,
    registry: &'a SourceFrame,
    log: &'a mut StageLog,
}

impl<'a> ModalityAligner<'a> {
    pub fn new(options: &'a LinkOptions, registry: &'a SourceFrame, log: &'a mut StageLog) -> Self {
        Self {
            options,
            registry,
            log,
        }
    }

    /// Metadata, nearest registry visit and PET values for one modality.
    pub fn align_scans(
        &mut self,
        modality: &ModalityOptions,
        sources: &ModalitySources,
    ) -> Result<SourceFrame> {
        let span = info_span!("modality", name = %modality.name);
        let _guard = span.enter();

        let metadata = self.scan_metadata(modality, sources)?;
        let with_visit = self.attach_visit(modality, &metadata)?;
        self.merge_pet(modality, &sources.pet, &with_visit)
    }

    /// Scan metadata joined to its QC sheet, with one scan date per row.
    fn scan_metadata(
        &mut self,
        modality: &ModalityOptions,
        sources: &ModalitySources,
    ) -> Result<SourceFrame> {
        sources.qc.require(&modality.qc_columns)?;
        let qc = sources
            .qc
            .with_data(sources.qc.data.select(modality.qc_columns.iter().map(String::as_str))?);

        let merge = KeyedMerge::new(format!("metadata:{}", modality.name), &modality.metadata_keys)
            .suffixes(JoinSuffixes::both(META_SUFFIX, QC_SUFFIX));
        let merged = self.log.record(merge_on_keys(&sources.metadata, &qc, &merge)?);
        let metadata = coalesce_suffixed(&merged, fields::SCANDATE, META_SUFFIX, QC_SUFFIX)?;

        if !modality.dedupe_metadata {
            return Ok(metadata);
        }
        let complete = self.log.record(drop_incomplete(
            &metadata,
            &[fields::RID, fields::SCANDATE],
            DropReason::MissingRequiredField,
            &format!("metadata-complete:{}", modality.name),
        )?);
        Ok(self.log.record(dedupe(
            &complete,
            &[fields::RID, fields::SCANDATE],
            KeepPolicy::First,
            &format!("metadata-dedupe:{}", modality.name),
        )?))
    }

    fn attach_visit(&mut self, modality: &ModalityOptions, scans: &SourceFrame) -> Result<SourceFrame> {
        let join = NearestJoin::new(format!("visit:{}", modality.name), fields::SCANDATE, fields::EXAMDATE)
            .keep(&self.options.registry_fields)
            .direction(self.options.direction)
            .suffixes(JoinSuffixes::right(&self.options.registry_suffix))
            .state(ScanState::VisitMatched);
        Ok(self.log.record(match_nearest(scans, self.registry, &join)?))
    }

    /// QC-filtered PET values merged with the visit-annotated metadata.
    fn merge_pet(
        &mut self,
        modality: &ModalityOptions,
        pet: &SourceFrame,
        with_visit: &SourceFrame,
    ) -> Result<SourceFrame> {
        let mut pet = self.log.record(filter_qc(pet, &modality.qc)?);
        if !modality.pet_required.is_empty() {
            pet = self.log.record(drop_incomplete(
                &pet,
                &modality.pet_required,
                DropReason::MissingRequiredField,
                &format!("pet-complete:{}", modality.name),
            )?);
        }

        let merge = KeyedMerge::new(format!("pet:{}", modality.name), &modality.pet_keys)
            .kind(modality.pet_join)
            .suffixes(JoinSuffixes::right(&modality.pet_suffix));
        let merged = match modality.pet_anchor {
            PetAnchor::Scan => merge_on_keys(&pet, with_visit, &merge)?,
            PetAnchor::Metadata => merge_on_keys(with_visit, &pet, &merge)?,
        };
        Ok(self.log.record(merged))
    }

    /// Nearest clinical assessment, genotype risk, age at scan and the
    /// covariate gate: everything the primary modality needs on top of
    /// [`Self::align_scans`].
    pub fn annotate_subjects(
        &mut self,
        modality: &ModalityOptions,
        scans: &SourceFrame,
        assessments: &SourceFrame,
        genotypes: &SourceFrame,
    ) -> Result<SourceFrame> {
        let span = info_span!("subjects", name = %modality.name);
        let _guard = span.enter();

        assessments.require(&[fields::RID, fields::EXAMDATE])?;
        let available: Vec<&str> = self
            .options
            .assessment_fields
            .iter()
            .map(String::as_str)
            .filter(|field| assessments.has_column(field))
            .collect();
        let join = NearestJoin::new(
            format!("assessment:{}", modality.name),
            fields::SCANDATE,
            fields::EXAMDATE,
        )
        .keep(&available)
        .direction(self.options.direction)
        .suffixes(JoinSuffixes::right(&self.options.assessment_suffix))
        .state(ScanState::AssessmentMatched);
        let assessed = self.log.record(match_nearest(scans, assessments, &join)?);

        let apoe4 = self.log.record(apoe4_table(genotypes)?);
        let merge = KeyedMerge::new(format!("genotype:{}", modality.name), &[fields::RID])
            .kind(JoinKind::Left)
            .suffixes(JoinSuffixes::right("_APOE"));
        let with_risk = self.log.record(merge_on_keys(&assessed, &apoe4, &merge)?);

        let aged = age_at_scan(
            &with_risk,
            fields::AGE,
            fields::SCANDATE,
            fields::EXAMDATE_BL,
            fields::AGE_AT_SCAN,
        )?;
        Ok(self.log.record(drop_incomplete(
            &aged,
            &self.options.required_covariates,
            DropReason::MissingCovariate,
            &format!("covariates:{}", modality.name),
        )?))
    }
}
