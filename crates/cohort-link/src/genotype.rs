//! APOE genotype to ε4 allele count.

use polars::prelude::{AnyValue, DataFrame, Float64Chunked, IntoColumn, NewChunkedArray};

use cohort_common::any_to_key_text;
use cohort_model::{KeepPolicy, fields};

use crate::dedupe::dedupe;
use crate::error::Result;
use crate::frame::{SourceFrame, StageOutput};

/// Number of ε4 alleles per genotype. Anything else has no score.
pub const GENOTYPE_RISK: [(&str, u8); 6] = [
    ("2/2", 0),
    ("2/3", 0),
    ("3/3", 0),
    ("2/4", 1),
    ("3/4", 1),
    ("4/4", 2),
];

/// Risk score for one genotype string, `None` when unrecognised.
pub fn genotype_risk(genotype: &str) -> Option<u8> {
    let genotype = genotype.trim();
    GENOTYPE_RISK
        .iter()
        .find(|(known, _)| *known == genotype)
        .map(|(_, score)| *score)
}

/// One `(RID, APOE4)` row per subject, the last genotype row winning.
///
/// Scores are floats so that unknown genotypes stay null after a left merge.
pub fn apoe4_table(genotypes: &SourceFrame) -> Result<StageOutput> {
    genotypes.require(&[fields::RID, fields::GENOTYPE])?;
    let deduped = dedupe(genotypes, &[fields::RID], KeepPolicy::Last, "genotype")?;

    let frame = &deduped.frame;
    let genotype = frame.column(fields::GENOTYPE)?;
    let scores = (0..frame.height()).map(|idx| {
        any_to_key_text(genotype.get(idx).unwrap_or(AnyValue::Null))
            .and_then(|text| genotype_risk(&text))
            .map(f64::from)
    });
    let apoe4 = Float64Chunked::from_iter_options(fields::APOE4.into(), scores).into_column();
    let data = DataFrame::new(vec![frame.column(fields::RID)?.clone(), apoe4])?;

    Ok(StageOutput {
        frame: frame.with_data(data),
        report: deduped.report,
    })
}
